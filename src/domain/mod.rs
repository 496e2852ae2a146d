//! Domain types for accounts and their inboxes.

pub mod verification;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use verification::{CodeRejection, VerifyCode};

/// Database identifier of an account.
///
/// Keeps account ids from being confused with other integers (ports, counts)
/// at service boundaries.
///
/// # Examples
///
/// ```rust
/// use echobox::domain::UserId;
///
/// let id = UserId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i32);

impl UserId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Identity carried by a signed-in session.
///
/// Read once per request at the HTTP boundary and passed explicitly to the
/// services from there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
}
