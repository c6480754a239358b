//! Translation of the encoder's progress stream into consumer-facing updates.
//!
//! ffmpeg's `-progress` output is a stream of `key=value` lines terminated by
//! a `progress=continue`/`progress=end` marker per reporting interval. The
//! [`ProgressSnapshot`] accumulates those fields and derives a percentage and
//! a human-readable status line from them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single progress report emitted during an encode run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Percent complete, 0-100.
    pub percent: u8,
    /// Human-readable status.
    pub message: String,
}

/// Accumulated `key=value` state from an ffmpeg progress stream.
#[derive(Debug, Default)]
pub struct ProgressSnapshot {
    fields: HashMap<String, String>,
}

impl ProgressSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a progress field, overwriting any previous value for the key.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.fields
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    /// Percent complete derived from output time over total duration.
    ///
    /// Returns 0 when the output time is missing or unparsable; the result is
    /// clamped to 0-100 so a late final interval never overshoots.
    pub fn percent(&self, duration_secs: f64) -> u8 {
        if duration_secs <= 0.0 {
            return 0;
        }
        match self.out_time_secs() {
            Some(secs) => (secs / duration_secs * 100.0).clamp(0.0, 100.0) as u8,
            None => 0,
        }
    }

    /// Builds the status line from whichever fields are present and parse.
    ///
    /// Fields that are blank, `N/A`, or fail to parse are dropped rather than
    /// aborting the update. An ETA is included only when both a positive speed
    /// multiplier and an output time are available.
    pub fn status_line(&self, duration_secs: f64) -> String {
        let mut parts = Vec::new();

        if let Some(raw) = self.field("speed") {
            if parse_speed_multiplier(raw).is_some() {
                parts.push(format!("Speed {}", raw));
            }
        }

        if let Some(raw) = self.field("fps") {
            if raw.parse::<f64>().is_ok() {
                parts.push(format!("FPS {}", raw));
            }
        }

        if let Some(raw) = self.field("bitrate") {
            if leading_number(raw).is_some() {
                parts.push(format!("BR {}", raw));
            }
        }

        if let Some(eta) = self.eta_secs(duration_secs) {
            parts.push(format!("ETA {}", format_duration(eta)));
        }

        parts.join(", ")
    }

    /// Seconds remaining at the current encode speed.
    fn eta_secs(&self, duration_secs: f64) -> Option<f64> {
        let speed = self
            .field("speed")
            .and_then(parse_speed_multiplier)?;
        let out_secs = self.out_time_secs()?;
        Some(((duration_secs - out_secs) / speed).max(0.0))
    }

    /// Output time in seconds.
    ///
    /// ffmpeg reports `out_time_ms` in microseconds despite the name (it
    /// mirrors `out_time_us`), and emits large negative values before the
    /// first timestamped frame.
    fn out_time_secs(&self) -> Option<f64> {
        let raw = self.field("out_time_ms").or_else(|| self.field("out_time_us"))?;
        let micros = raw.parse::<i64>().ok()?;
        Some(micros as f64 / 1_000_000.0)
    }

    fn field(&self, key: &str) -> Option<&str> {
        let value = self.fields.get(key)?.as_str();
        if value.is_empty() || value.eq_ignore_ascii_case("n/a") {
            None
        } else {
            Some(value)
        }
    }
}

/// Parses a speed field like `1.53x`, returning the multiplier when positive.
fn parse_speed_multiplier(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_end_matches(['x', 'X']).trim();
    match trimmed.parse::<f64>() {
        Ok(speed) if speed > 0.0 => Some(speed),
        _ => None,
    }
}

/// Parses the leading decimal number of a value like `843.2kbits/s`.
fn leading_number(raw: &str) -> Option<f64> {
    let end = raw
        .find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')
        .unwrap_or(raw.len());
    raw[..end].parse::<f64>().ok()
}

/// Formats a duration in seconds as `2h 05m 09s`, `4m 07s`, or `52s`.
pub fn format_duration(secs: f64) -> String {
    let total = secs.round().max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Formats a byte count with binary units, e.g. `9.84MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{}B", bytes)
    } else {
        format!("{:.2}{}", size, UNITS[unit])
    }
}
