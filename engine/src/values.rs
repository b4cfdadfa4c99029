//! Typed capacity values.
//!
//! The tree stores raw strings; validation and serialization interpret them
//! through [`CapacityValue`] at the point of use. Three modes exist on the
//! wire: percentage (`50`, `50%`), weight (`2w`), and absolute resource
//! vectors (`[memory=1024,vcores=4]`).

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static ABSOLUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\s*[\w.\-]+\s*=\s*[^,\[\]=]+(\s*,\s*[\w.\-]+\s*=\s*[^,\[\]=]+)*\s*\]$")
        .expect("absolute resource pattern")
});

#[derive(Debug, Clone, PartialEq)]
pub enum CapacityValue {
    Percentage(f64),
    Weight(f64),
    /// Bracketed resource vector, kept verbatim; the remote system parses it.
    Absolute(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityParseError {
    #[error("Capacity value is not a number: {raw}")]
    NotANumber { raw: String },

    #[error("Malformed absolute resource value: {raw}")]
    MalformedAbsolute { raw: String },
}

impl CapacityValue {
    pub fn parse(raw: &str) -> Result<Self, CapacityParseError> {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            if ABSOLUTE_RE.is_match(trimmed) {
                return Ok(Self::Absolute(trimmed.to_string()));
            }
            return Err(CapacityParseError::MalformedAbsolute {
                raw: raw.to_string(),
            });
        }
        if let Some(number) = trimmed.strip_suffix('w') {
            return number
                .trim()
                .parse::<f64>()
                .map(Self::Weight)
                .map_err(|_| CapacityParseError::NotANumber {
                    raw: raw.to_string(),
                });
        }
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
        number
            .trim()
            .parse::<f64>()
            .map(Self::Percentage)
            .map_err(|_| CapacityParseError::NotANumber {
                raw: raw.to_string(),
            })
    }

    pub fn is_percentage(&self) -> bool {
        matches!(self, Self::Percentage(_))
    }

    /// Short mode label used in messages and sibling-mix checks.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Percentage(_) => "percentage",
            Self::Weight(_) => "weight",
            Self::Absolute(_) => "absolute",
        }
    }
}

/// Wire form of a staged property value.
///
/// The remote endpoint expects percentage capacities as bare numbers, so a
/// numeric value carrying a `%` suffix is stripped; weight and absolute
/// forms pass through unchanged, as does anything non-numeric.
pub fn wire_value(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(number) = trimmed.strip_suffix('%') {
        if number.trim().parse::<f64>().is_ok() {
            return number.trim().to_string();
        }
    }
    raw.to_string()
}
