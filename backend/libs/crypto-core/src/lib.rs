//! Shared cryptographic helpers for blog backend services.
//!
//! Currently this is the RS256 JWT module used by every service that issues
//! or validates tokens. Keys are loaded once at startup.

pub mod jwt;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_keys;
