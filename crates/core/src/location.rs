//! Location codes (warehouse/site identifiers).

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Max stored length, matching the persisted column width.
const MAX_LEN: usize = 100;

/// Validated warehouse/site code, e.g. `"WH-MAIN"`.
///
/// Compared by value; balances are keyed by `(ProductId, LocationCode)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationCode(String);

impl LocationCode {
    pub fn new(code: impl Into<String>) -> DomainResult<Self> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("location code cannot be empty"));
        }
        if trimmed.len() > MAX_LEN {
            return Err(DomainError::validation(format!(
                "location code exceeds {MAX_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for LocationCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocationCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts_plain_codes() {
        let loc = LocationCode::new("  WH-MAIN ").unwrap();
        assert_eq!(loc.as_str(), "WH-MAIN");
    }

    #[test]
    fn rejects_empty_codes() {
        assert!(LocationCode::new("   ").is_err());
    }

    #[test]
    fn rejects_oversized_codes() {
        assert!(LocationCode::new("x".repeat(101)).is_err());
    }
}
