//! Pinch distance to volume percent mapping

use serde::{Deserialize, Serialize};

/// Operator-adjustable bounds of the pinch distance, in pixels
///
/// Ordering is not enforced: an operator can set `min_distance` above
/// `max_distance`, which inverts the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRange {
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for CalibrationRange {
    fn default() -> Self {
        Self {
            min_distance: 30.0,
            max_distance: 300.0,
        }
    }
}

/// Maps pinch distances to percents using a mutable calibration range
#[derive(Debug, Clone)]
pub struct DistanceCalibrator {
    range: CalibrationRange,
    defaults: CalibrationRange,
}

impl DistanceCalibrator {
    pub fn new(defaults: CalibrationRange) -> Self {
        Self {
            range: defaults,
            defaults,
        }
    }

    pub fn range(&self) -> CalibrationRange {
        self.range
    }

    /// Linear map of `distance` from the calibrated range onto 0..=100
    ///
    /// A zero-width range yields 0 for every input.
    pub fn distance_to_percent(&self, distance: f64) -> u8 {
        let CalibrationRange {
            min_distance,
            max_distance,
        } = self.range;

        let span = max_distance - min_distance;
        if span == 0.0 {
            return 0;
        }

        let percent = (distance - min_distance) / span * 100.0;
        if percent.is_nan() {
            return 0;
        }
        percent.clamp(0.0, 100.0) as u8
    }

    pub fn set_min_from_measurement(&mut self, distance: f64) {
        self.range.min_distance = distance;
    }

    pub fn set_max_from_measurement(&mut self, distance: f64) {
        self.range.max_distance = distance;
    }

    /// Restore the built-in bounds
    pub fn reset(&mut self) {
        self.range = self.defaults;
    }
}

impl Default for DistanceCalibrator {
    fn default() -> Self {
        Self::new(CalibrationRange::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_map_to_zero_and_hundred() {
        let cal = DistanceCalibrator::default();
        assert_eq!(cal.distance_to_percent(30.0), 0);
        assert_eq!(cal.distance_to_percent(300.0), 100);
        assert_eq!(cal.distance_to_percent(165.0), 50);
    }

    #[test]
    fn test_monotonic_inside_range() {
        let cal = DistanceCalibrator::default();
        let mut previous = 0;
        for d in 30..=300 {
            let percent = cal.distance_to_percent(f64::from(d));
            assert!(percent >= previous, "dropped at distance {d}");
            previous = percent;
        }
    }

    #[test]
    fn test_clamps_outside_range() {
        let cal = DistanceCalibrator::default();
        assert_eq!(cal.distance_to_percent(0.0), 0);
        assert_eq!(cal.distance_to_percent(-50.0), 0);
        assert_eq!(cal.distance_to_percent(301.0), 100);
        assert_eq!(cal.distance_to_percent(10_000.0), 100);
    }

    #[test]
    fn test_zero_width_range_is_always_zero() {
        let mut cal = DistanceCalibrator::default();
        cal.set_min_from_measurement(120.0);
        cal.set_max_from_measurement(120.0);
        for d in [0.0, 119.0, 120.0, 121.0, 1_000.0] {
            assert_eq!(cal.distance_to_percent(d), 0);
        }
    }

    #[test]
    fn test_inverted_range_does_not_panic() {
        let mut cal = DistanceCalibrator::default();
        cal.set_min_from_measurement(300.0);
        cal.set_max_from_measurement(30.0);
        assert_eq!(cal.distance_to_percent(300.0), 0);
        assert_eq!(cal.distance_to_percent(30.0), 100);
        assert_eq!(cal.distance_to_percent(500.0), 0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut cal = DistanceCalibrator::default();
        cal.set_min_from_measurement(50.0);
        cal.set_max_from_measurement(90.0);
        assert_eq!(cal.range().min_distance, 50.0);
        cal.reset();
        assert_eq!(cal.range(), CalibrationRange::default());
    }
}
