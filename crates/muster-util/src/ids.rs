//! Strongly-typed identifiers for muster

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a member as used to join roster rows with scan records.
///
/// Always trimmed and upper-cased, so `" a01 "` and `"A01"` name the same
/// member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<MemberId> for String {
    fn from(id: MemberId) -> Self {
        id.0
    }
}

/// How roster ids are turned into [`MemberId`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberIdStyle {
    /// Ids are text: trim and upper-case only.
    #[default]
    Text,
    /// Ids were stored as numbers (e.g. `"1024.0"` in a spreadsheet export)
    /// and are rendered as integers.
    Numeric,
}

/// Roster id that cannot be normalized under the configured style
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("member id is empty")]
    Empty,

    #[error("member id '{0}' is not numeric")]
    NotNumeric(String),
}

impl MemberIdStyle {
    /// Normalize a roster id under this style
    pub fn normalize(self, raw: &str) -> Result<MemberId, IdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }

        match self {
            MemberIdStyle::Text => Ok(MemberId::new(trimmed)),
            MemberIdStyle::Numeric => {
                // 2^63; `as i64` would saturate beyond it
                const LIMIT: f64 = 9_223_372_036_854_775_808.0;
                let value = f64::from_str(trimmed)
                    .ok()
                    .map(f64::trunc)
                    .filter(|v| (-LIMIT..LIMIT).contains(v))
                    .ok_or_else(|| IdError::NotNumeric(trimmed.to_string()))?;
                Ok(MemberId::new(format!("{}", value as i64)))
            }
        }
    }
}

impl FromStr for MemberIdStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(MemberIdStyle::Text),
            "numeric" | "number" => Ok(MemberIdStyle::Numeric),
            other => Err(format!("Unknown member id style: {}", other)),
        }
    }
}

/// Unique name of an attendance policy in the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyName(String);

impl PolicyName {
    /// Create a policy name; `None` if it is blank
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            None
        } else {
            Some(Self(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for PolicyName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.trim()
    }
}
