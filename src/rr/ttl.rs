use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time-to-live stamped on every synthesized answer record, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeToLive(u32);

impl TimeToLive {
    pub const MAX: TimeToLive = TimeToLive(u32::MAX);
    pub const MIN: TimeToLive = TimeToLive(u32::MIN);
    pub const ZERO: TimeToLive = TimeToLive(0u32);

    pub const fn from_secs(secs: u32) -> Self {
        TimeToLive(secs)
    }

    pub const fn as_secs(&self) -> u32 {
        self.0
    }
}

impl Default for TimeToLive {
    fn default() -> Self {
        TimeToLive::from_secs(600)
    }
}

impl fmt::Display for TimeToLive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TimeToLive {
    fn from(value: u32) -> Self {
        TimeToLive(value)
    }
}

impl From<TimeToLive> for u32 {
    fn from(value: TimeToLive) -> Self {
        value.0
    }
}

impl From<Duration> for TimeToLive {
    /// Saturates at `u32::MAX` seconds.
    fn from(value: Duration) -> Self {
        TimeToLive(value.as_secs().try_into().unwrap_or(u32::MAX))
    }
}

impl From<TimeToLive> for Duration {
    fn from(value: TimeToLive) -> Self {
        Duration::from_secs(value.0 as u64)
    }
}
