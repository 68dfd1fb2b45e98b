//! Domain types shared across all FinanceHUB services.
//!
//! Pure types and helpers with no framework dependencies.

pub mod email;
pub mod user;
