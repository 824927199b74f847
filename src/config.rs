//! Configuration loading and management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::state::AbsentHandPolicy;

const ENV_PREFIX: &str = "GESTURE_VOLUME_";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for operator commands
    pub socket_path: PathBuf,

    /// Landmark frame stream; `None` reads stdin
    pub landmark_source: Option<PathBuf>,

    /// Number of recent percents averaged by the smoother
    pub smoothing_window: usize,

    /// Minimum smoothed change before a new volume is sent
    pub change_threshold: u8,

    /// Fist hold duration, also used as the toggle cooldown
    pub hold_threshold: Duration,

    /// Pinch distance mapped to 0% after a reset
    pub default_min_distance: f64,

    /// Pinch distance mapped to 100% after a reset
    pub default_max_distance: f64,

    /// What happens to a running fist hold when the hand disappears
    pub absent_hand_policy: AbsentHandPolicy,

    /// Require an open hand between two mute toggles
    pub require_release: bool,

    /// Log audio commands instead of applying them
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            landmark_source: None,
            smoothing_window: 5,
            change_threshold: 1,
            hold_threshold: Duration::from_millis(800),
            default_min_distance: 30.0,
            default_max_distance: 300.0,
            absent_hand_policy: AbsentHandPolicy::Freeze,
            require_release: false,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let absent_hand_policy = match parse_var::<u64>("ABSENT_GRACE_MS")? {
            None => AbsentHandPolicy::Freeze,
            Some(0) => AbsentHandPolicy::Reset,
            Some(ms) => AbsentHandPolicy::ResetAfter(Duration::from_millis(ms)),
        };

        let config = Self {
            socket_path: env_var("SOCKET").map(PathBuf::from).unwrap_or(defaults.socket_path),
            landmark_source: env_var("SOURCE").map(PathBuf::from),
            smoothing_window: parse_var("SMOOTHING_WINDOW")?.unwrap_or(defaults.smoothing_window),
            change_threshold: parse_var("CHANGE_THRESHOLD")?.unwrap_or(defaults.change_threshold),
            hold_threshold: parse_var::<u64>("HOLD_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.hold_threshold),
            default_min_distance: parse_var("MIN_DISTANCE")?
                .unwrap_or(defaults.default_min_distance),
            default_max_distance: parse_var("MAX_DISTANCE")?
                .unwrap_or(defaults.default_max_distance),
            absent_hand_policy,
            require_release: parse_var("REQUIRE_RELEASE")?.unwrap_or(defaults.require_release),
            dry_run: parse_var("DRY_RUN")?.unwrap_or(defaults.dry_run),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.smoothing_window == 0 {
            bail!("{ENV_PREFIX}SMOOTHING_WINDOW must be at least 1");
        }
        if self.default_min_distance <= 0.0 || self.default_max_distance <= 0.0 {
            bail!("default calibration distances must be positive");
        }
        Ok(())
    }
}

/// `$HOME/.local/share/gesture-volume/daemon.sock`, under the temp dir without a home
fn default_socket_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(".local")
        .join("share")
        .join("gesture-volume")
        .join("daemon.sock")
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {ENV_PREFIX}{name}: {raw:?}"))
        })
        .transpose()
}
