//! Gesture interpretation
//!
//! Turns raw landmark measurements into control signals:
//! - DistanceCalibrator: pinch distance to volume percent
//! - Smoother: moving average with a minimum-change gate
//! - classifier: extended finger count for fist detection

mod calibrator;
mod classifier;
mod smoother;

pub use calibrator::{CalibrationRange, DistanceCalibrator};
pub use classifier::fingers_up;
pub use smoother::Smoother;
