use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Server-assigned repository identifier.
///
/// The backend may hand out numeric or string ids; both are accepted as-is and
/// compared strictly, so `1` and `"1"` never match each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepositoryId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryId::Number(n) => write!(f, "{}", n),
            RepositoryId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RepositoryId {
    fn from(value: u64) -> Self {
        RepositoryId::Number(value)
    }
}

impl From<&str> for RepositoryId {
    fn from(value: &str) -> Self {
        RepositoryId::Text(value.to_string())
    }
}

impl From<String> for RepositoryId {
    fn from(value: String) -> Self {
        RepositoryId::Text(value)
    }
}

impl RepositoryId {
    /// Parse an id typed on the command line. All-digit input becomes a numeric id.
    pub fn parse_cli(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<u64>() {
            Ok(n) => RepositoryId::Number(n),
            Err(_) => RepositoryId::Text(trimmed.to_string()),
        }
    }
}

/// One repository entry as served by `GET /repositories`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: RepositoryId,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default)]
    pub techs: Vec<String>,
    #[serde(default)]
    pub likes: u64,
}

/// Failure branch of a like round-trip
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to like repository {id}: {reason}")]
pub struct LikeFailure {
    pub id: RepositoryId,
    pub reason: String,
}

pub type LikeOutcome = std::result::Result<RepositoryRecord, LikeFailure>;
