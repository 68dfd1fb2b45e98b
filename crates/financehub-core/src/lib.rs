//! Service plumbing shared by FinanceHUB services: tracing setup, health
//! endpoints, request-id propagation, and small sea-orm/serde helpers.

pub mod health;
pub mod middleware;
pub mod sea_ext;
pub mod serde;
pub mod tracing;
