//! Newtype wrappers for enhanced type safety

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Identifier of the user a dataset belongs to.
///
/// Wrapped so a user id cannot be confused with a version counter or any
/// other numeric parameter in the persistence APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(u64);

impl UserId {
    /// Create a new UserId
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric id
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display_is_raw_number() {
        assert_eq!(UserId::new(42).to_string(), "42");
    }

    #[test]
    fn test_user_id_from_u64() {
        let id: UserId = 7u64.into();
        assert_eq!(id.as_u64(), 7);
    }
}
