//! Verification code issuance and checking.
//!
//! Pure functions over explicit timestamps so the expiry policy can be tested
//! without a clock.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::fmt;

/// Number of digits in a verification code.
pub const CODE_LENGTH: usize = 6;

const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

/// A six digit one-time code proving ownership of an email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyCode(String);

impl VerifyCode {
    /// Draws a code uniformly from `100000..=999999`.
    #[must_use]
    pub fn generate() -> Self {
        let n: u32 = rand::rng().random_range(CODE_MIN..=CODE_MAX);
        Self(n.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerifyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a submitted code was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRejection {
    Expired,
    Mismatch,
}

#[must_use]
pub fn expiry_from(issued_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    issued_at + ttl
}

/// Checks a submitted code against the stored one.
///
/// Expiry wins over a match: a correct code is still refused once `now`
/// reaches `expires_at`.
pub fn check_code(
    stored: &str,
    expires_at: DateTime<Utc>,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), CodeRejection> {
    if now >= expires_at {
        return Err(CodeRejection::Expired);
    }
    if stored != submitted {
        return Err(CodeRejection::Mismatch);
    }
    Ok(())
}
