//! Wall-clock intervals as stored in the cache, and their expanded form.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, with sub-second precision.
pub fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// A start/stop pair, stored compactly as `{"d": [start, stop]}`.
///
/// Both bounds share a unit (epoch seconds for wall time, CPU seconds for
/// rusage counters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    #[serde(rename = "d")]
    bounds: [f64; 2],
}

impl Interval {
    pub fn new(start: f64, stop: f64) -> Self {
        Self { bounds: [start, stop] }
    }

    pub fn start(&self) -> f64 {
        self.bounds[0]
    }

    pub fn stop(&self) -> f64 {
        self.bounds[1]
    }

    /// Length in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        (self.stop() - self.start()) * 1000.0
    }

    pub fn expand(&self) -> Timing {
        Timing {
            start: self.start(),
            end: self.stop(),
            duration: self.duration_ms(),
        }
    }
}

/// Display form of an [`Interval`]; `duration` is in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}
