//! Auth types shared across FinanceHUB services.
//!
//! Provides the `BearerToken` extractor and third-party JWT decoding/verification.

pub mod bearer;
pub mod token;
