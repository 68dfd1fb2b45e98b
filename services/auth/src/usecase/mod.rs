pub mod authcode;
pub mod cleanup;
pub mod code;
pub mod external_token;
pub mod profile;
pub mod session;
pub mod verify;
