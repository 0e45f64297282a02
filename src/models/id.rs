use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ValidationError;

/// Opaque identifier for users and holdings.
///
/// For file-backed storage, ids should be safe path segments (no slashes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create an ID from an arbitrary string.
    /// Note: The string must be a valid path segment (no slashes).
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Create an ID from an arbitrary string, validating that it is a safe path segment.
    pub fn from_string_checked(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if Self::is_path_safe(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidId(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the string is safe to use as a single path segment.
    pub fn is_path_safe(value: &str) -> bool {
        if value.is_empty() || value == "." || value == ".." {
            return false;
        }
        !value.chars().any(|c| c == '/' || c == '\\' || c == '\0')
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
