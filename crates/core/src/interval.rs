use std::time::Duration;

use crate::error::{DumpError, Result};

/// Parses a dump interval such as `"12h"`, `"30m"` or `"5s"`.
///
/// The last character selects the unit: `h` hours, `m` minutes, `s` seconds.
/// Any other trailing letter, or no unit at all (`"90"`), means seconds.
pub fn parse_interval(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let Some(last) = raw.chars().last() else {
        return Err(DumpError::Config("interval is empty".into()));
    };

    let (magnitude, scale) = if last.is_ascii_digit() {
        (raw, 1)
    } else {
        let head = &raw[..raw.len() - last.len_utf8()];
        let scale = match last {
            'h' => 60 * 60,
            'm' => 60,
            _ => 1,
        };
        (head, scale)
    };

    let n: u64 = magnitude
        .parse()
        .map_err(|e| DumpError::Config(format!("interval '{raw}': bad magnitude: {e}")))?;
    if n == 0 {
        return Err(DumpError::Config(format!("interval '{raw}' must be positive")));
    }

    n.checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or_else(|| DumpError::Config(format!("interval '{raw}' is too large")))
}
