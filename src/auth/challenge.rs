//! `WWW-Authenticate` challenge issued on rejection.

use std::fmt;

use http::header::{HeaderName, HeaderValue, InvalidHeaderValue, WWW_AUTHENTICATE};

use crate::auth::credentials::DHMAC_SCHEME;
use crate::types::SecurityLevel;

/// Challenge telling a client which scheme, realm and minimum key level to
/// use when it retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    realm: String,
    level: SecurityLevel,
}

impl Challenge {
    pub fn new(realm: impl Into<String>, level: SecurityLevel) -> Self {
        Self {
            realm: realm.into(),
            level,
        }
    }

    pub fn scheme(&self) -> &'static str {
        DHMAC_SCHEME
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// Header name the challenge is sent under.
    pub fn header_name() -> HeaderName {
        WWW_AUTHENTICATE
    }

    /// Render as a header value. Fails only if the realm contains bytes that
    /// are not allowed in a header (e.g. control characters).
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} realm={},level={}",
            DHMAC_SCHEME,
            quoted(&self.realm),
            quoted(&self.level.to_string())
        )
    }
}

fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_rendering() {
        let challenge = Challenge::new("api", SecurityLevel::new(5));
        assert_eq!(
            challenge.to_string(),
            r#"dHMACSignature realm="api",level="5""#
        );
        assert_eq!(challenge.scheme(), "dHMACSignature");
        assert_eq!(challenge.realm(), "api");
        assert_eq!(challenge.level(), SecurityLevel::new(5));
    }

    #[test]
    fn test_challenge_realm_escaping() {
        let challenge = Challenge::new(r#"a "quoted" \ realm"#, SecurityLevel::MIN);
        assert_eq!(
            challenge.to_string(),
            r#"dHMACSignature realm="a \"quoted\" \\ realm",level="0""#
        );
    }

    #[test]
    fn test_challenge_header_value() {
        let challenge = Challenge::new("secure", SecurityLevel::new(2));
        let value = challenge.header_value().unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            r#"dHMACSignature realm="secure",level="2""#
        );
        assert_eq!(Challenge::header_name(), http::header::WWW_AUTHENTICATE);
    }

    #[test]
    fn test_challenge_header_value_rejects_control_characters() {
        let challenge = Challenge::new("bad\nrealm", SecurityLevel::MIN);
        assert!(challenge.header_value().is_err());
    }
}
