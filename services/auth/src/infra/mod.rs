pub mod db;
pub mod idp;
pub mod jwks;
