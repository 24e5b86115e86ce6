use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

use crate::auth::{AuthenticatorConfig, DEFAULT_KEY_TTL_SECONDS, Key};

/// Default bind address for the HTTP service.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Raw service configuration as written in `dhmac.json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceJsonConfig {
    #[serde(default)]
    bind: Option<String>,
    #[serde(default)]
    authenticator: AuthenticatorConfig,
    #[serde(default)]
    key_ttl_seconds: Option<i64>,
    #[serde(default)]
    keys: Vec<serde_json::Value>,
}

/// Service configuration after environment expansion.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: String,
    pub authenticator: AuthenticatorConfig,
    /// Lifetime granted to a key on each refresh
    pub key_ttl: chrono::Duration,
    /// Keys seeded into the in-memory store at startup
    pub keys: Vec<Key>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            authenticator: AuthenticatorConfig::default(),
            key_ttl: chrono::Duration::seconds(DEFAULT_KEY_TTL_SECONDS),
            keys: Vec::new(),
        }
    }
}

impl ServiceConfig {
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let cfg: ServiceJsonConfig = serde_json::from_str(raw)?;

        let ttl_seconds = cfg.key_ttl_seconds.unwrap_or(DEFAULT_KEY_TTL_SECONDS);
        if ttl_seconds <= 0 {
            return Err(anyhow::anyhow!(
                "`keyTtlSeconds` must be positive, got {}",
                ttl_seconds
            ));
        }

        let mut authenticator = cfg.authenticator;
        authenticator.realm = expand_env_vars(&authenticator.realm);

        let keys = cfg
            .keys
            .into_iter()
            .map(|mut value| {
                expand_json_strings(&mut value);
                serde_json::from_value::<Key>(value)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bind: cfg
                .bind
                .map(|b| expand_env_vars(&b))
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            authenticator,
            key_ttl: chrono::Duration::seconds(ttl_seconds),
            keys,
        })
    }
}

pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(p) = env::var("DHMAC_CONFIG") {
        return Ok(PathBuf::from(p));
    }

    let candidate = PathBuf::from("dhmac.json");
    if candidate.exists() {
        return Ok(candidate);
    }

    Err(anyhow::anyhow!(
        "Could not find dhmac.json (set DHMAC_CONFIG or create ./dhmac.json)"
    ))
}

pub fn load_service_config(path: &Path) -> anyhow::Result<ServiceConfig> {
    let raw = fs::read_to_string(path)?;
    ServiceConfig::from_json_str(&raw)
}

/// Replace `${NAME}` references with the value of environment variable `NAME`.
///
/// Unset variables and an unterminated `${` (through the end of the string)
/// are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let reference = &rest[start..];
        let Some(end) = reference.find('}') else {
            rest = reference;
            break;
        };
        match env::var(&reference[2..end]) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&reference[..=end]),
        }
        rest = &reference[end + 1..];
    }

    // `rest` is either fully scanned or starts at an unterminated `${`
    out.push_str(rest);
    out
}

fn expand_json_strings(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => *s = expand_env_vars(s),
        serde_json::Value::Object(map) => map.values_mut().for_each(expand_json_strings),
        serde_json::Value::Array(items) => items.iter_mut().for_each(expand_json_strings),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyId, SecurityLevel};
    use std::io::Write;

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-local variable name, not read elsewhere
        unsafe { env::set_var("DHMAC_TEST_REALM", "payments") };
        assert_eq!(expand_env_vars("${DHMAC_TEST_REALM}-api"), "payments-api");
        assert_eq!(
            expand_env_vars("${DHMAC_TEST_UNSET_VARIABLE}"),
            "${DHMAC_TEST_UNSET_VARIABLE}"
        );
        assert_eq!(expand_env_vars("plain $ text"), "plain $ text");
    }

    #[test]
    fn test_expand_env_vars_unterminated_reference_kept() {
        // SAFETY: test-local variable name, not read elsewhere
        unsafe { env::set_var("DHMAC_TEST_PREFIX", "x") };
        assert_eq!(expand_env_vars("a-${DHMAC_TEST_PREFIX"), "a-${DHMAC_TEST_PREFIX");
        assert_eq!(
            expand_env_vars("${DHMAC_TEST_PREFIX}-${DHMAC_TEST_PREFIX"),
            "x-${DHMAC_TEST_PREFIX"
        );
        assert_eq!(expand_env_vars("$${DHMAC_TEST_PREFIX}$"), "$x$");
    }

    #[test]
    fn test_resolve_config_path_prefers_env() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // SAFETY: the only test touching DHMAC_CONFIG
        unsafe { env::set_var("DHMAC_CONFIG", file.path()) };
        let resolved = resolve_config_path();
        unsafe { env::remove_var("DHMAC_CONFIG") };

        assert_eq!(resolved.unwrap(), file.path());
    }

    #[test]
    fn test_defaults_for_empty_config() {
        let cfg = ServiceConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg.bind, DEFAULT_BIND);
        assert_eq!(cfg.authenticator, AuthenticatorConfig::default());
        assert_eq!(cfg.key_ttl.num_seconds(), DEFAULT_KEY_TTL_SECONDS);
        assert!(cfg.keys.is_empty());
    }

    #[test]
    fn test_rejects_non_positive_ttl() {
        let err = ServiceConfig::from_json_str(r#"{"keyTtlSeconds": 0}"#).unwrap_err();
        assert!(err.to_string().contains("keyTtlSeconds"));
    }

    #[test]
    fn test_load_service_config_from_file() {
        // SAFETY: test-local variable name, not read elsewhere
        unsafe { env::set_var("DHMAC_TEST_KEY_SECRET", "from-env") };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "bind": "0.0.0.0:9000",
                "authenticator": {{
                    "realm": "internal",
                    "minSecurityLevel": 2,
                    "refreshOnValidUse": true
                }},
                "keyTtlSeconds": 600,
                "keys": [
                    {{
                        "identifier": 42,
                        "userId": 7,
                        "securityLevel": 3,
                        "secret": "${{DHMAC_TEST_KEY_SECRET}}",
                        "expiresAt": 4102444800000
                    }}
                ]
            }}"#
        )
        .unwrap();

        let cfg = load_service_config(file.path()).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:9000");
        assert_eq!(cfg.authenticator.realm, "internal");
        assert_eq!(cfg.authenticator.min_security_level, SecurityLevel::new(2));
        assert!(cfg.authenticator.refresh_on_valid_use);
        assert_eq!(cfg.key_ttl.num_seconds(), 600);

        assert_eq!(cfg.keys.len(), 1);
        let key = &cfg.keys[0];
        assert_eq!(key.identifier(), KeyId::new(42));
        assert_eq!(key.secret().expose_secret(), b"from-env");
    }

    #[test]
    fn test_load_service_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_service_config(&dir.path().join("absent.json")).is_err());
    }
}
