//! Fixed-width zone identifiers.

use serde::Serialize;
use std::fmt;

/// Width of a census block group GEOID.
pub const DEFAULT_ZONE_WIDTH: usize = 12;

/// A normalized zone identifier.
///
/// Only constructed through [`ZoneId::normalize`], so two ids compare equal
/// exactly when they name the same zone regardless of how the source file
/// typed the column (integer, float, zero-padded string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Normalizes a raw id to `width` characters.
    ///
    /// All-digit ids lose a trailing `.0` and are left-padded with zeros.
    /// Returns `None` for empty ids and ids wider than `width`.
    pub fn normalize(raw: &str, width: usize) -> Option<Self> {
        let mut id = raw.trim();
        if let Some(stripped) = id.strip_suffix(".0") {
            if is_digits(stripped) {
                id = stripped;
            }
        }
        if id.is_empty() || id.len() > width {
            return None;
        }
        if is_digits(id) {
            Some(ZoneId(format!("{:0>width$}", id, width = width)))
        } else {
            Some(ZoneId(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
