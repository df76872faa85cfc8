//! Driver invitation tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::environment::Entropy;

const TOKEN_BYTES: usize = 32;

/// 32 random bytes, URL-safe base64 without padding (43 chars)
pub fn generate_token(entropy: &dyn Entropy) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    entropy.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn invitation_url(token: &str) -> String {
    format!("invite/{token}")
}
