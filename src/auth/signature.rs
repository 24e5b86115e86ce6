//! HMAC-SHA256 request signature computation and verification.
//!
//! The signed message is `"{METHOD}:{URI}:placeholder:"`. The third field is
//! a fixed literal kept for compatibility with existing clients; it carries no
//! timestamp or nonce, so a captured signature can be replayed against the
//! same method and URI for as long as the key stays valid.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use http::{Method, Uri};
use sha2::Sha256;

use crate::auth::key_store::Key;

type HmacSha256 = Hmac<Sha256>;

/// Literal third field of the canonical signing string.
pub const SIGNATURE_PLACEHOLDER: &str = "placeholder";

/// Strategy for checking a claimed signature against a key.
pub trait SignatureValidator: Send + Sync {
    fn is_valid(&self, key: &Key, signature: &str, method: &Method, uri: &Uri) -> bool;
}

/// Default validator: HMAC-SHA256 over the canonical string, hex-encoded.
///
/// Hex decoding accepts either case. The digest comparison runs in constant
/// time via [`Mac::verify_slice`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha256Validator;

impl SignatureValidator for HmacSha256Validator {
    fn is_valid(&self, key: &Key, signature: &str, method: &Method, uri: &Uri) -> bool {
        let Ok(claimed) = hex::decode(signature) else {
            return false;
        };
        keyed_mac(key.secret().expose_secret(), method.as_str(), &uri.to_string())
            .verify_slice(&claimed)
            .is_ok()
    }
}

/// Canonical string both sides feed into the HMAC.
pub fn canonical_string(method: &str, uri: &str) -> String {
    format!("{}:{}:{}:", method, uri, SIGNATURE_PLACEHOLDER)
}

/// Compute the lowercase hex signature a client sends for `method` and `uri`.
pub fn sign_request(secret: &[u8], method: &str, uri: &str) -> String {
    hex::encode(keyed_mac(secret, method, uri).finalize().into_bytes())
}

/// HMAC over the canonical string, keyed with `secret`.
///
/// HMAC is defined for keys of every length (long keys are hashed, short ones
/// padded), so keying cannot fail.
fn keyed_mac(secret: &[u8], method: &str, uri: &str) -> HmacSha256 {
    let mut mac = match <HmacSha256 as KeyInit>::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    };
    mac.update(canonical_string(method, uri).as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyId, SecurityLevel, UserId};
    use chrono::{Duration, Utc};

    const KNOWN_SIGNATURE: &str =
        "6df6881e8d3d601ab1802dba356a2ffc55949e04f47b896f4ca19baab260dad5";

    fn test_key(secret: &str) -> Key {
        Key::new(
            KeyId::new(42),
            UserId::new(1),
            SecurityLevel::new(0),
            secret.as_bytes().to_vec(),
            Utc::now() + Duration::days(365),
        )
    }

    fn validate(key: &Key, signature: &str, method: &str, uri: &str) -> bool {
        HmacSha256Validator.is_valid(
            key,
            signature,
            &method.parse::<Method>().unwrap(),
            &uri.parse::<Uri>().unwrap(),
        )
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(
            canonical_string("GET", "/resource"),
            "GET:/resource:placeholder:"
        );
    }

    #[test]
    fn test_sign_request_known_answer() {
        assert_eq!(sign_request(b"s3cret", "GET", "/resource"), KNOWN_SIGNATURE);
        assert_eq!(
            sign_request(b"other", "POST", "/orders?id=7"),
            "cafa5e35c59954e4ddd7ca6d6337c2ade29430db1efe1167e117ca5c37a80b67"
        );
    }

    #[test]
    fn test_sign_request_any_key_length() {
        assert_eq!(
            sign_request(b"", "GET", "/resource"),
            "8a8c4e8e1e1b77a4e240131c6e6d972bce8dc1fe7513ec6aa2d8c2756ad4bdb1"
        );

        // Longer than the SHA-256 block, so the key is hashed first
        let long_secret = "k".repeat(100);
        let signature = sign_request(long_secret.as_bytes(), "GET", "/resource");
        assert_eq!(
            signature,
            "c2edb347a925b5d3dda45de2806b131c59c12587eb62a690212b84555f16f25e"
        );
        assert!(validate(&test_key(&long_secret), &signature, "GET", "/resource"));
    }

    #[test]
    fn test_valid_signature() {
        let key = test_key("s3cret");
        assert!(validate(&key, KNOWN_SIGNATURE, "GET", "/resource"));
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let key = test_key("s3cret");
        assert!(validate(
            &key,
            &KNOWN_SIGNATURE.to_uppercase(),
            "GET",
            "/resource"
        ));
    }

    #[test]
    fn test_single_character_change_rejected() {
        let key = test_key("s3cret");
        for i in 0..KNOWN_SIGNATURE.len() {
            let mut altered: Vec<char> = KNOWN_SIGNATURE.chars().collect();
            altered[i] = if altered[i] == '0' { '1' } else { '0' };
            let altered: String = altered.into_iter().collect();
            assert!(
                !validate(&key, &altered, "GET", "/resource"),
                "altered position {} accepted",
                i
            );
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        let key = test_key("s3cret");
        assert!(!validate(&key, &KNOWN_SIGNATURE[..62], "GET", "/resource"));
        assert!(!validate(
            &key,
            &format!("{}00", KNOWN_SIGNATURE),
            "GET",
            "/resource"
        ));
        assert!(!validate(&key, "", "GET", "/resource"));
    }

    #[test]
    fn test_non_hex_rejected() {
        let key = test_key("s3cret");
        assert!(!validate(&key, "not-a-signature", "GET", "/resource"));
        assert!(!validate(&key, &KNOWN_SIGNATURE[..63], "GET", "/resource"));
    }

    #[test]
    fn test_signature_bound_to_request() {
        let key = test_key("s3cret");
        assert!(!validate(&key, KNOWN_SIGNATURE, "POST", "/resource"));
        assert!(!validate(&key, KNOWN_SIGNATURE, "GET", "/resource2"));
        assert!(!validate(&test_key("other"), KNOWN_SIGNATURE, "GET", "/resource"));
    }
}
