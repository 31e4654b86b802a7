use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes per token. 32 bytes = 256 bits of entropy,
/// well above the 128-bit minimum needed to make guessing infeasible.
const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically secure, URL-safe random token.
///
/// Used for password-reset and email-verification links. Tokens are
/// stored in plaintext because they are high-entropy, single-use, and
/// short-lived; refresh tokens, which are longer-lived bearer
/// credentials, are hashed before storage instead.
///
/// # Returns
/// URL-safe Base64 string (43 characters, no padding)
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_token_is_url_safe() {
        let token = generate_secure_token();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_token_length() {
        // 32 bytes -> ceil(32 * 4 / 3) = 43 characters without padding
        assert_eq!(generate_secure_token().len(), 43);
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_secure_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
