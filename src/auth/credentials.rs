//! Credential extraction from the `Authorization` header value.

use crate::types::KeyId;

/// Authentication scheme token for distributed-HMAC credentials.
pub const DHMAC_SCHEME: &str = "dHMACSignature";

/// Credential presented on a single request.
///
/// Derived per request and discarded after one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Key the client claims to have signed with
    pub key_id: KeyId,
    /// Hex-encoded signature as supplied by the client
    pub signature: String,
}

/// Strategy for turning a raw credential value into a [`Credential`].
///
/// Implementations must be fail-closed: every malformed input maps to `None`.
pub trait CredentialExtractor: Send + Sync {
    fn extract(&self, credentials: Option<&str>) -> Option<Credential>;
}

/// Parses `dHMACSignature <identifier>:<signature>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DhmacCredentialExtractor;

impl CredentialExtractor for DhmacCredentialExtractor {
    fn extract(&self, credentials: Option<&str>) -> Option<Credential> {
        let raw = credentials?.trim();
        let (scheme, param) = raw.split_once(char::is_whitespace)?;

        // Scheme tokens are case-insensitive (RFC 9110 §11.1)
        if !scheme.eq_ignore_ascii_case(DHMAC_SCHEME) {
            return None;
        }

        let parts: Vec<&str> = param.trim().split(':').collect();
        let [key_id, signature] = parts.as_slice() else {
            return None;
        };

        // Plain decimal digits only; `u64` parsing alone would also take a leading `+`
        if key_id.is_empty() || !key_id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let key_id = key_id.parse::<KeyId>().ok()?;

        Some(Credential {
            key_id,
            signature: (*signature).to_string(),
        })
    }
}

/// Build the `Authorization` header value a client sends.
pub fn format_credentials(key_id: KeyId, signature: &str) -> String {
    format!("{} {}:{}", DHMAC_SCHEME, key_id, signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(raw: &str) -> Option<Credential> {
        DhmacCredentialExtractor.extract(Some(raw))
    }

    #[test]
    fn test_extract_valid_credentials() {
        let cred = extract("dHMACSignature 42:abcdef0123").unwrap();
        assert_eq!(cred.key_id, KeyId::new(42));
        assert_eq!(cred.signature, "abcdef0123");
    }

    #[test]
    fn test_extract_absent_credentials() {
        assert!(DhmacCredentialExtractor.extract(None).is_none());
        assert!(extract("").is_none());
        assert!(extract("dHMACSignature").is_none());
    }

    #[test]
    fn test_extract_wrong_scheme() {
        assert!(extract("Bearer 42:abcdef").is_none());
        assert!(extract("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==").is_none());
        assert!(extract("dHMACSignatureX 42:abcdef").is_none());
    }

    #[test]
    fn test_extract_scheme_is_case_insensitive() {
        let cred = extract("dhmacsignature 7:ff").unwrap();
        assert_eq!(cred.key_id, KeyId::new(7));
    }

    #[test]
    fn test_extract_wrong_part_count() {
        assert!(extract("dHMACSignature 42").is_none());
        assert!(extract("dHMACSignature 42:ab:cd").is_none());
        assert!(extract("dHMACSignature 42:ab:").is_none());
    }

    #[test]
    fn test_extract_non_integer_identifier() {
        assert!(extract("dHMACSignature abc:ff").is_none());
        assert!(extract("dHMACSignature -1:ff").is_none());
        assert!(extract("dHMACSignature :ff").is_none());
        assert!(extract("dHMACSignature 1.5:ff").is_none());
        assert!(extract("dHMACSignature 99999999999999999999999:ff").is_none());
    }

    #[test]
    fn test_extract_identifier_digits_only() {
        assert!(extract("dHMACSignature +42:ff").is_none());
        assert_eq!(
            extract("dHMACSignature 0042:ff").map(|c| c.key_id),
            Some(KeyId::new(42))
        );
    }

    #[test]
    fn test_extract_tolerates_surrounding_whitespace() {
        let cred = extract("  dHMACSignature   42:ab  ").unwrap();
        assert_eq!(cred.key_id, KeyId::new(42));
        assert_eq!(cred.signature, "ab");
    }

    #[test]
    fn test_format_credentials_is_extractable() {
        let header = format_credentials(KeyId::new(5), "deadbeef");
        assert_eq!(header, "dHMACSignature 5:deadbeef");
        let cred = extract(&header).unwrap();
        assert_eq!(cred.key_id, KeyId::new(5));
        assert_eq!(cred.signature, "deadbeef");
    }
}
