//! Arena client configuration.
use std::env;
use std::path::PathBuf;

use combat_core::{LocationId, TimingCurve};
use combat_runtime::RuntimeConfig;

/// Configuration for one arena client process.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Location used by `start` when none is given
    pub location_id: LocationId,
    pub recommended_level: u32,
    /// Minimum timing score; `0.0` keeps the full curve
    pub timing_floor: f64,
    /// Directory for daily rolling log files
    pub log_dir: Option<PathBuf>,
    pub runtime: RuntimeConfig,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            location_id: LocationId::new("training-grounds"),
            recommended_level: 1,
            timing_floor: TimingCurve::DEFAULT_FLOOR,
            log_dir: None,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl ArenaConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `ARENA_LOCATION_ID` - Default battle location (default: training-grounds)
    /// - `ARENA_RECOMMENDED_LEVEL` - Level sent with `start` (default: 1)
    /// - `ARENA_TIMING_FLOOR` - Minimum timing score in `[0, 1]` (default: 0)
    /// - `ARENA_LOG_DIR` - Also write logs to daily files in this directory
    /// - `COMBAT_*` - Runtime settings, see [`RuntimeConfig::from_env`]
    pub fn from_env() -> Self {
        let mut config = Self {
            runtime: RuntimeConfig::from_env(),
            ..Self::default()
        };

        if let Ok(location) = env::var("ARENA_LOCATION_ID")
            && !location.trim().is_empty()
        {
            config.location_id = LocationId::new(location.trim());
        }

        if let Some(level) = read_env::<u32>("ARENA_RECOMMENDED_LEVEL") {
            config.recommended_level = level.max(1);
        }

        if let Some(floor) = read_env::<f64>("ARENA_TIMING_FLOOR") {
            config.timing_floor = floor;
        }

        config.log_dir = env::var_os("ARENA_LOG_DIR").map(PathBuf::from);

        config
    }

    pub fn timing_curve(&self) -> TimingCurve {
        TimingCurve::new().with_floor(self.timing_floor)
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
