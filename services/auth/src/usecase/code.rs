use rand::RngExt;

use crate::domain::types::{AUTHCODE_LEN, SESSION_TOKEN_LEN};

/// Uniform 6-digit decimal code in `100000..=999999`.
pub fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    let code = code.to_string();
    debug_assert_eq!(code.len(), AUTHCODE_LEN);
    code
}

/// 32 bytes from the thread-local CSPRNG, hex encoded.
pub fn generate_token() -> String {
    let bytes: [u8; SESSION_TOKEN_LEN / 2] = rand::rng().random();
    hex::encode(bytes)
}
