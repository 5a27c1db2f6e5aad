//! Parser for `stats` / `stats_noreset` responses.
//!
//! Each response line has the form `key=value`, e.g.:
//!
//! ```text
//! thread0.num.queries=152
//! total.recursion.time.avg=0.013874
//! time.up=3802.123466
//! ```
//!
//! The parser is schema-agnostic: every numeric key is kept under its raw
//! name.

use std::fmt;

use tracing::debug;

use crate::snapshot::Snapshot;

/// Error type for response parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The response held no usable `key=value` pair.
    NoData { lines: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NoData { lines } => {
                write!(f, "no usable key=value pairs in {} response lines", lines)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Builds a snapshot from response lines.
///
/// Lines without `=` or with a non-numeric value are skipped. Fails only if
/// nothing usable remains.
pub fn parse<I, S>(lines: I) -> Result<Snapshot, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut snapshot = Snapshot::new();
    let mut total = 0;

    for line in lines {
        total += 1;
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            debug!(line, "skipping line without '='");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            debug!(line, "skipping line with empty key");
            continue;
        }

        match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => snapshot.insert(key, v),
            _ => debug!(key, value, "skipping non-numeric value"),
        }
    }

    if snapshot.is_empty() {
        return Err(ParseError::NoData { lines: total });
    }
    Ok(snapshot)
}
