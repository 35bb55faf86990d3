//! Timestamp parsing utilities.
//!
//! The AI resolver returns trim points as clock strings (`MM:SS`,
//! sometimes `HH:MM:SS` or bare seconds); everything downstream works
//! in fractional seconds.

/// Parse a timestamp string to total seconds.
///
/// Supports `HH:MM:SS(.mmm)`, `MM:SS(.mmm)` and `SS(.mmm)`.
///
/// # Examples
/// ```
/// use liveedit_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        let v: f64 = part
            .trim()
            .parse()
            .map_err(|_| TimestampError::InvalidValue(part.trim().to_string()))?;
        if v < 0.0 {
            return Err(TimestampError::Negative);
        }
        values.push(v);
    }

    match values.as_slice() {
        [secs] => Ok(*secs),
        [mins, secs] => Ok(mins * 60.0 + secs),
        [hours, mins, secs] => Ok(hours * 3600.0 + mins * 60.0 + secs),
        _ => Err(TimestampError::InvalidFormat(ts.to_string())),
    }
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimestampError {
    #[error("timestamp cannot be empty")]
    Empty,
    #[error("timestamp cannot be negative")]
    Negative,
    #[error("invalid timestamp component: {0}")]
    InvalidValue(String),
    #[error("invalid timestamp format '{0}', use HH:MM:SS, MM:SS or SS")]
    InvalidFormat(String),
}
