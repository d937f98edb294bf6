use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_CONFIG_FILE: &str = "MICROPOST_AUTH_CONFIG";
pub const ENV_SESSION_TTL: &str = "MICROPOST_AUTH_SESSION_TTL_SECS";
pub const ENV_REMEMBER_TTL: &str = "MICROPOST_AUTH_REMEMBER_TTL_SECS";
pub const ENV_TOKEN_BYTES: &str = "MICROPOST_AUTH_TOKEN_BYTES";
pub const ENV_INTENT_TTL: &str = "MICROPOST_AUTH_INTENT_TTL_SECS";

/// Settings for sessions and redirect intents. Unspecified values in a JSON file
/// fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of a session created without "remember me".
    pub session_ttl_secs: u64,
    /// Lifetime of a remembered session (the long-lived cookie).
    pub remember_ttl_secs: u64,
    /// Random bytes per session token; clamped to at least 32.
    pub token_bytes: usize,
    pub session_shards: usize,
    /// How long a remembered page waits for its visitor to sign in.
    pub intent_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 24 * 60 * 60,
            remember_ttl_secs: 20 * 365 * 24 * 60 * 60,
            token_bytes: 32,
            session_shards: 16,
            intent_ttl_secs: 60 * 60,
        }
    }
}

impl AuthConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading auth config {}", path.display()))?;
        let cfg: AuthConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing auth config {}", path.display()))?;
        Ok(cfg.normalized())
    }

    /// Defaults, then the JSON file named by `MICROPOST_AUTH_CONFIG` (if set),
    /// then individual environment overrides.
    pub fn load() -> Result<Self> {
        let base = match std::env::var(ENV_CONFIG_FILE) {
            Ok(p) if !p.trim().is_empty() => Self::from_json_file(Path::new(p.trim()))?,
            _ => Self::default(),
        };
        base.with_env_overrides(|k| std::env::var(k).ok())
    }

    /// Apply overrides from a key lookup. Taking the lookup as a closure keeps
    /// tests off the process environment.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_SESSION_TTL) {
            self.session_ttl_secs = v.trim().parse().with_context(|| format!("{ENV_SESSION_TTL}='{v}'"))?;
        }
        if let Some(v) = lookup(ENV_REMEMBER_TTL) {
            self.remember_ttl_secs = v.trim().parse().with_context(|| format!("{ENV_REMEMBER_TTL}='{v}'"))?;
        }
        if let Some(v) = lookup(ENV_TOKEN_BYTES) {
            self.token_bytes = v.trim().parse().with_context(|| format!("{ENV_TOKEN_BYTES}='{v}'"))?;
        }
        if let Some(v) = lookup(ENV_INTENT_TTL) {
            self.intent_ttl_secs = v.trim().parse().with_context(|| format!("{ENV_INTENT_TTL}='{v}'"))?;
        }
        Ok(self.normalized())
    }

    fn normalized(mut self) -> Self {
        self.token_bytes = self.token_bytes.max(32);
        self.session_shards = self.session_shards.clamp(1, 256);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let c = AuthConfig::default();
        assert!(c.remember_ttl_secs > c.session_ttl_secs);
        assert!(c.intent_ttl_secs > 0);
        assert_eq!(c.token_bytes, 32);
    }

    #[test]
    fn json_file_fills_missing_fields_from_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"session_ttl_secs": 60, "token_bytes": 8}}"#).unwrap();
        let c = AuthConfig::from_json_file(f.path()).unwrap();
        assert_eq!(c.session_ttl_secs, 60);
        // clamped up
        assert_eq!(c.token_bytes, 32);
        assert_eq!(c.session_shards, 16);
    }

    #[test]
    fn env_overrides_apply_and_reject_garbage() {
        let mut env = HashMap::new();
        env.insert(ENV_REMEMBER_TTL.to_string(), "3600".to_string());
        env.insert(ENV_INTENT_TTL.to_string(), " 120 ".to_string());
        let c = AuthConfig::default().with_env_overrides(|k| env.get(k).cloned()).unwrap();
        assert_eq!(c.remember_ttl_secs, 3600);
        assert_eq!(c.intent_ttl_secs, 120);

        env.insert(ENV_SESSION_TTL.to_string(), "soon".to_string());
        assert!(AuthConfig::default().with_env_overrides(|k| env.get(k).cloned()).is_err());
    }
}
