//! Optimistic concurrency primitives.

use crate::error::{DomainError, DomainResult};

/// Anything carrying a monotonically increasing state revision.
///
/// The revision bumps by one per committed mutation. Stores use it to detect
/// lost updates: a writer that read revision `n` may only commit against
/// revision `n`.
pub trait Revisioned {
    fn revision(&self) -> u64;
}

/// Revision expectation checked by stores at commit time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Skip the check (migrations, idempotent writes).
    Any,
    /// Require the stored row to be at an exact revision.
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_everything() {
        assert!(ExpectedRevision::Any.matches(0));
        assert!(ExpectedRevision::Any.matches(42));
    }

    #[test]
    fn exact_matches_only_its_revision() {
        assert!(ExpectedRevision::Exact(3).matches(3));
        assert!(!ExpectedRevision::Exact(3).matches(4));
        assert!(ExpectedRevision::Exact(3).check(4).is_err());
    }
}
