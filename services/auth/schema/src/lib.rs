//! sea-orm entities for the auth service tables.

pub mod auth_codes;
pub mod pending_emails;
pub mod sessions;
pub mod users;
