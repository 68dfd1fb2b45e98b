//! Test utilities for FinanceHUB services.
//!
//! Provides bearer-header helpers and identity-provider token minting.
//! Import from `[dev-dependencies]` only, never in production code.

pub mod auth;
