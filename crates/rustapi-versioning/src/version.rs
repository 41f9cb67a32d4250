//! API version type and parsing
//!
//! An API version is a version number (`1.0`, `2`), a group version date
//! (`2017-01-01`), or both (`2017-01-01.1.0`), optionally followed by a
//! status label (`1.0-beta`, `2017-01-01-rc1`).

use crate::format;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// An immutable, totally ordered API version
///
/// Ordering compares the group version first (versions without a group
/// version sort first), then the major and minor numbers (a missing number
/// is treated as `0`), then the status. A version without a status is a
/// release and sorts *after* any pre-release of the same number, so
/// `1.0-beta < 1.0 < 1.1-alpha`. Status labels compare ordinally,
/// ignoring ASCII case.
///
/// Equality follows the ordering: `1` and `1.0` are the same version, as are
/// `1.0-Beta` and `1.0-beta`.
#[derive(Debug, Clone, Eq)]
pub struct ApiVersion {
    group_version: Option<NaiveDate>,
    major: Option<u32>,
    minor: Option<u32>,
    status: Option<String>,
}

impl ApiVersion {
    /// Create a `major.minor` version
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            group_version: None,
            major: Some(major),
            minor: Some(minor),
            status: None,
        }
    }

    /// Create a version with only a major number (the minor number is implied `0`)
    pub fn major(major: u32) -> Self {
        Self {
            group_version: None,
            major: Some(major),
            minor: None,
            status: None,
        }
    }

    /// Create a date-based version
    pub fn from_group(group_version: NaiveDate) -> Self {
        Self {
            group_version: Some(group_version),
            major: None,
            minor: None,
            status: None,
        }
    }

    /// Parse a version from its canonical text form
    pub fn parse(text: &str) -> Result<Self, ApiVersionParseError> {
        text.parse()
    }

    /// Attach a group version date
    pub fn with_group(mut self, group_version: NaiveDate) -> Self {
        self.group_version = Some(group_version);
        self
    }

    /// Attach a status label
    ///
    /// Status labels must be non-empty and ASCII alphanumeric.
    pub fn with_status(mut self, status: impl Into<String>) -> Result<Self, ApiVersionParseError> {
        let status = status.into();
        if !is_valid_status(&status) {
            return Err(ApiVersionParseError::InvalidStatus(status));
        }
        self.status = Some(status);
        Ok(self)
    }

    /// The group version date, if any
    pub fn group_version(&self) -> Option<NaiveDate> {
        self.group_version
    }

    /// The major version number, if any
    pub fn major_version(&self) -> Option<u32> {
        self.major
    }

    /// The minor version number, if any
    pub fn minor_version(&self) -> Option<u32> {
        self.minor
    }

    /// The major version number, or `0` when absent
    pub fn implied_major(&self) -> u32 {
        self.major.unwrap_or(0)
    }

    /// The minor version number, or `0` when absent
    pub fn implied_minor(&self) -> u32 {
        self.minor.unwrap_or(0)
    }

    /// The status label, if any
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Whether this version carries a status label
    pub fn is_prerelease(&self) -> bool {
        self.status.is_some()
    }

    /// Format this version with a format pattern
    ///
    /// See [`crate::format`] for the supported tokens.
    pub fn format(&self, pattern: &str) -> String {
        format::format_version(self, pattern)
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format::full(self))
    }
}

impl FromStr for ApiVersion {
    type Err = ApiVersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ApiVersionParseError::Empty);
        }

        let (group_version, rest) = split_group_version(text)?;

        let (number, status) = match rest.find('-') {
            Some(index) => (&rest[..index], Some(&rest[index + 1..])),
            None => (rest, None),
        };

        let (major, minor) = if number.is_empty() {
            if group_version.is_none() {
                return Err(ApiVersionParseError::InvalidFormat(text.to_string()));
            }
            (None, None)
        } else {
            let mut parts = number.split('.');
            let major = parts.next().map(parse_number).transpose()?;
            let minor = parts.next().map(parse_number).transpose()?;
            if parts.next().is_some() {
                return Err(ApiVersionParseError::InvalidFormat(text.to_string()));
            }
            (major, minor)
        };

        let status = match status {
            Some(status) if is_valid_status(status) => Some(status.to_string()),
            Some(status) => return Err(ApiVersionParseError::InvalidStatus(status.to_string())),
            None => None,
        };

        Ok(Self {
            group_version,
            major,
            minor,
            status,
        })
    }
}

/// Split a leading `yyyy-MM-dd` group version from the rest of the text.
fn split_group_version(text: &str) -> Result<(Option<NaiveDate>, &str), ApiVersionParseError> {
    let bytes = text.as_bytes();
    let looks_like_date = bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit);

    if !looks_like_date {
        return Ok((None, text));
    }

    let date = NaiveDate::parse_from_str(&text[..10], "%Y-%m-%d")
        .map_err(|_| ApiVersionParseError::InvalidGroupVersion(text[..10].to_string()))?;

    let rest = &text[10..];
    match rest.as_bytes().first() {
        None | Some(b'-') => Ok((Some(date), rest)),
        Some(b'.') if rest.len() > 1 => Ok((Some(date), &rest[1..])),
        _ => Err(ApiVersionParseError::InvalidFormat(text.to_string())),
    }
}

fn parse_number(part: &str) -> Result<u32, ApiVersionParseError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiVersionParseError::InvalidNumber(part.to_string()));
    }
    part.parse()
        .map_err(|_| ApiVersionParseError::InvalidNumber(part.to_string()))
}

fn is_valid_status(status: &str) -> bool {
    !status.is_empty() && status.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn compare_status(left: Option<&str>, right: Option<&str>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => left
            .bytes()
            .map(|b| b.to_ascii_lowercase())
            .cmp(right.bytes().map(|b| b.to_ascii_lowercase())),
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Hash for ApiVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_version.hash(state);
        self.implied_major().hash(state);
        self.implied_minor().hash(state);
        self.status
            .as_deref()
            .map(str::to_ascii_lowercase)
            .hash(state);
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.group_version
            .cmp(&other.group_version)
            .then_with(|| self.implied_major().cmp(&other.implied_major()))
            .then_with(|| self.implied_minor().cmp(&other.implied_minor()))
            .then_with(|| compare_status(self.status(), other.status()))
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for API version parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiVersionParseError {
    /// Empty version string
    #[error("empty API version")]
    Empty,
    /// The `yyyy-MM-dd` group version is not a valid date
    #[error("invalid group version '{0}'")]
    InvalidGroupVersion(String),
    /// A major or minor version component is not a number
    #[error("invalid version number '{0}'")]
    InvalidNumber(String),
    /// The status label is empty or not alphanumeric
    #[error("invalid version status '{0}'")]
    InvalidStatus(String),
    /// The text does not follow the version grammar
    #[error("invalid API version format '{0}'")]
    InvalidFormat(String),
}
