//! Mute debounce state machine
//!
//! Converts a continuously held fist into a single mute toggle. A toggle
//! needs the fist held for the hold threshold and the same interval
//! elapsed since the previous toggle.

use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Whether a fist is currently being held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldState {
    /// No fist observed on the last classified frame
    Released,
    /// Fist held since the recorded start time
    Holding,
}

impl Default for HoldState {
    fn default() -> Self {
        Self::Released
    }
}

impl std::fmt::Display for HoldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoldState::Released => write!(f, "Released"),
            HoldState::Holding => write!(f, "Holding"),
        }
    }
}

/// What a running hold does when frames arrive without a hand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentHandPolicy {
    /// Keep the hold start untouched until the hand returns
    Freeze,
    /// Drop the hold on the first frame without a hand
    Reset,
    /// Drop the hold once the hand has been missing this long
    ResetAfter(Duration),
}

impl Default for AbsentHandPolicy {
    fn default() -> Self {
        Self::Freeze
    }
}

/// Debounced fist-to-mute toggle
pub struct MuteDebouncer {
    muted: bool,
    hold_start: Option<Instant>,
    /// `None` until the first toggle, so the first toggle is never blocked
    last_toggle: Option<Instant>,
    hold_threshold: Duration,
    absent_policy: AbsentHandPolicy,
    /// Require a release between toggles instead of re-toggling on a long hold
    require_release: bool,
    armed: bool,
    absent_since: Option<Instant>,
}

impl MuteDebouncer {
    /// Create a debouncer, unmuted and released
    pub fn new(hold_threshold: Duration) -> Self {
        Self {
            muted: false,
            hold_start: None,
            last_toggle: None,
            hold_threshold,
            absent_policy: AbsentHandPolicy::Freeze,
            require_release: false,
            armed: true,
            absent_since: None,
        }
    }

    pub fn with_absent_policy(mut self, policy: AbsentHandPolicy) -> Self {
        self.absent_policy = policy;
        self
    }

    pub fn with_require_release(mut self, require_release: bool) -> Self {
        self.require_release = require_release;
        self
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn state(&self) -> HoldState {
        if self.hold_start.is_some() {
            HoldState::Holding
        } else {
            HoldState::Released
        }
    }

    /// Feed the finger count of a classified frame
    ///
    /// Returns the new mute state when this frame toggled it.
    pub fn observe(&mut self, fingers_up: u8, now: Instant) -> Option<bool> {
        self.absent_since = None;

        if fingers_up > 0 {
            if self.hold_start.take().is_some() {
                debug!(fingers_up, "fist released");
            }
            self.armed = true;
            return None;
        }

        let Some(start) = self.hold_start else {
            debug!("fist hold started");
            self.hold_start = Some(now);
            return None;
        };

        let held = now.saturating_duration_since(start);
        let cooled_down = self
            .last_toggle
            .map_or(true, |t| now.saturating_duration_since(t) > self.hold_threshold);

        if held >= self.hold_threshold && cooled_down && self.armed {
            self.toggle(now, held);
            Some(self.muted)
        } else {
            None
        }
    }

    /// Note a frame in which no hand could be classified
    pub fn observe_absent(&mut self, now: Instant) {
        if self.hold_start.is_none() {
            return;
        }

        match self.absent_policy {
            AbsentHandPolicy::Freeze => {}
            AbsentHandPolicy::Reset => {
                debug!("hand lost, dropping fist hold");
                self.hold_start = None;
            }
            AbsentHandPolicy::ResetAfter(grace) => {
                let since = *self.absent_since.get_or_insert(now);
                if now.saturating_duration_since(since) >= grace {
                    debug!(grace_ms = grace.as_millis() as u64, "hand missing past grace, dropping fist hold");
                    self.hold_start = None;
                    self.absent_since = None;
                }
            }
        }
    }

    fn toggle(&mut self, now: Instant, held: Duration) {
        self.muted = !self.muted;
        self.last_toggle = Some(now);
        if self.require_release {
            self.armed = false;
        }

        info!(
            muted = self.muted,
            held_ms = held.as_millis() as u64,
            "mute toggled"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD: Duration = Duration::from_millis(800);
    /// ~30 fps
    const FRAME: Duration = Duration::from_millis(33);

    /// Feed `frames` consecutive observations, returning every toggle
    fn feed(
        debouncer: &mut MuteDebouncer,
        t0: Instant,
        frames: std::ops::Range<u32>,
        fingers: u8,
    ) -> Vec<bool> {
        frames
            .filter_map(|k| debouncer.observe(fingers, t0 + FRAME * k))
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let debouncer = MuteDebouncer::new(HOLD);
        assert!(!debouncer.is_muted());
        assert_eq!(debouncer.state(), HoldState::Released);
    }

    #[test]
    fn test_first_fist_frame_starts_hold() {
        let mut debouncer = MuteDebouncer::new(HOLD);
        assert_eq!(debouncer.observe(0, Instant::now()), None);
        assert_eq!(debouncer.state(), HoldState::Holding);
    }

    #[test]
    fn test_hold_past_threshold_toggles_once() {
        let mut debouncer = MuteDebouncer::new(HOLD);
        let t0 = Instant::now();

        // 0..=1.0s of fist at 30 fps
        let toggles = feed(&mut debouncer, t0, 0..31, 0);
        assert_eq!(toggles, vec![true]);
        assert!(debouncer.is_muted());
    }

    #[test]
    fn test_early_release_does_not_toggle() {
        let mut debouncer = MuteDebouncer::new(HOLD);
        let t0 = Instant::now();

        let toggles = feed(&mut debouncer, t0, 0..20, 0);
        assert!(toggles.is_empty());

        assert_eq!(debouncer.observe(3, t0 + FRAME * 20), None);
        assert_eq!(debouncer.state(), HoldState::Released);

        // The hold restarts from scratch after the release
        let toggles = feed(&mut debouncer, t0, 21..40, 0);
        assert!(toggles.is_empty());
        assert!(!debouncer.is_muted());
    }

    #[test]
    fn test_prolonged_hold_toggles_again_after_cooldown() {
        let mut debouncer = MuteDebouncer::new(HOLD);
        let t0 = Instant::now();

        // 0..=1.65s of continuous fist
        let toggles = feed(&mut debouncer, t0, 0..51, 0);
        assert_eq!(toggles, vec![true, false]);
        assert!(!debouncer.is_muted());
    }

    #[test]
    fn test_cooldown_blocks_quick_second_toggle() {
        let mut debouncer = MuteDebouncer::new(HOLD);
        let t0 = Instant::now();

        assert_eq!(debouncer.observe(0, t0), None);
        assert_eq!(debouncer.observe(0, t0 + HOLD), Some(true));

        // Hold is long enough, but the cooldown must be strictly exceeded
        assert_eq!(debouncer.observe(0, t0 + HOLD * 2), None);
        assert_eq!(
            debouncer.observe(0, t0 + HOLD * 2 + Duration::from_millis(1)),
            Some(false)
        );
    }

    #[test]
    fn test_require_release_blocks_repeat_on_long_hold() {
        let mut debouncer = MuteDebouncer::new(HOLD).with_require_release(true);
        let t0 = Instant::now();

        let toggles = feed(&mut debouncer, t0, 0..100, 0);
        assert_eq!(toggles, vec![true]);

        debouncer.observe(2, t0 + FRAME * 100);
        let toggles = feed(&mut debouncer, t0, 101..130, 0);
        assert_eq!(toggles, vec![false]);
    }

    #[test]
    fn test_freeze_keeps_hold_across_missing_hand() {
        let mut debouncer = MuteDebouncer::new(HOLD);
        let t0 = Instant::now();

        debouncer.observe(0, t0);
        debouncer.observe_absent(t0 + Duration::from_millis(400));
        assert_eq!(debouncer.state(), HoldState::Holding);

        // Hold time counts from the original start
        assert_eq!(debouncer.observe(0, t0 + HOLD), Some(true));
    }

    #[test]
    fn test_reset_policy_drops_hold() {
        let mut debouncer = MuteDebouncer::new(HOLD).with_absent_policy(AbsentHandPolicy::Reset);
        let t0 = Instant::now();

        debouncer.observe(0, t0);
        debouncer.observe_absent(t0 + FRAME);
        assert_eq!(debouncer.state(), HoldState::Released);
        assert_eq!(debouncer.observe(0, t0 + HOLD), None);
    }

    #[test]
    fn test_grace_policy_resets_only_after_grace() {
        let grace = Duration::from_millis(200);
        let mut debouncer =
            MuteDebouncer::new(HOLD).with_absent_policy(AbsentHandPolicy::ResetAfter(grace));
        let t0 = Instant::now();

        debouncer.observe(0, t0);
        debouncer.observe_absent(t0 + FRAME);
        debouncer.observe_absent(t0 + FRAME * 4);
        assert_eq!(debouncer.state(), HoldState::Holding);

        debouncer.observe_absent(t0 + FRAME + grace);
        assert_eq!(debouncer.state(), HoldState::Released);
    }

    #[test]
    fn test_grace_window_restarts_when_hand_returns() {
        let grace = Duration::from_millis(200);
        let mut debouncer =
            MuteDebouncer::new(HOLD).with_absent_policy(AbsentHandPolicy::ResetAfter(grace));
        let t0 = Instant::now();

        debouncer.observe(0, t0);
        debouncer.observe_absent(t0 + FRAME);
        debouncer.observe(0, t0 + FRAME * 2);
        debouncer.observe_absent(t0 + FRAME * 7);
        assert_eq!(debouncer.state(), HoldState::Holding);
    }
}
