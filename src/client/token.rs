//! Local token inspection helpers.
//!
//! The client decodes the expiry claim without verifying the signature; the
//! server remains the authority on validity.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::Value;

/// Strip any `Bearer ` label from a stored token value.
///
/// Tokens arrive both prefixed (login/registration) and bare (refresh); the
/// session manager stores one canonical form and adds the label back at the
/// wire boundary.
#[must_use]
pub fn normalize_token(token: &str) -> String {
    let trimmed = token.trim();
    trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .map_or(trimmed, str::trim)
        .to_string()
}

/// Decode the `exp` claim from a token, tolerating a `Bearer ` prefix.
/// Returns `None` for anything that does not look like a signed token.
#[must_use]
pub fn decode_expiry(token: &str) -> Option<i64> {
    let normalized = normalize_token(token);
    let claims_b64 = normalized.split('.').nth(1)?;
    let bytes = Base64UrlUnpadded::decode_vec(claims_b64).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64ct::{Base64UrlUnpadded, Encoding};

    fn fake_token(exp: i64) -> String {
        let claims = serde_json::json!({ "userId": "u", "iat": 0, "exp": exp });
        let claims_b64 = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
        format!("head.{claims_b64}.sig")
    }

    #[test]
    fn normalize_strips_prefix_once() {
        assert_eq!(normalize_token("Bearer abc"), "abc");
        assert_eq!(normalize_token("bearer abc"), "abc");
        assert_eq!(normalize_token("abc"), "abc");
        assert_eq!(normalize_token("  Bearer abc  "), "abc");
    }

    #[test]
    fn decode_expiry_reads_claim() {
        let token = fake_token(1_700_000_900);
        assert_eq!(decode_expiry(&token), Some(1_700_000_900));
        assert_eq!(
            decode_expiry(&format!("Bearer {token}")),
            Some(1_700_000_900)
        );
    }

    #[test]
    fn decode_expiry_rejects_garbage() {
        assert_eq!(decode_expiry("not-a-token"), None);
        assert_eq!(decode_expiry(""), None);
        assert_eq!(decode_expiry("a.!!!.c"), None);
    }
}
