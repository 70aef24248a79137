//! FocusLab configuration.
//!
//! Settings come from `~/.focuslab/config.toml` (every section optional), with
//! `${VAR}` expansion inside string values, and are then overridden by a few
//! well-known environment variables:
//!
//! | variable | overrides |
//! |---|---|
//! | `FOCUSLAB_BACKEND_URL` | `[client] backend_url` |
//! | `FOCUSLAB_DATABASE` | `[server] database` |
//! | `JWT_SECRET` | `[auth] jwt_secret` |
//! | `GEMINI_API_KEY` | `[ai] api_key` |
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8000"
//! database = "~/.focuslab/focuslab.db"
//! cors_origin = "http://localhost:5173"
//!
//! [auth]
//! jwt_secret = "${JWT_SECRET}"
//! token_ttl_minutes = 3000
//!
//! [ai]
//! api_key = "${GEMINI_API_KEY}"
//! model = "gemini-2.5-flash"
//!
//! [client]
//! backend_url = "http://localhost:8000"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};
use thiserror::Error;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 3000;
pub const DEFAULT_AI_MODEL: &str = "gemini-2.5-flash";

const APP_DIR: &str = ".focuslab";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Raw file contents. Every field is optional; see the `resolve_*` methods
/// for defaults.
#[derive(Debug, Default, Deserialize)]
pub struct FocusConfig {
    pub server: Option<ServerConfig>,
    pub auth: Option<AuthConfig>,
    pub ai: Option<AiConfig>,
    pub client: Option<ClientConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub database: Option<String>,
    pub cors_origin: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_minutes: Option<u64>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &mask(self.jwt_secret.as_deref()))
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}

#[derive(Default, Deserialize)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// Override for the Gemini API base URL (tests, proxies).
    pub base_url: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &mask(self.api_key.as_deref()))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientConfig {
    pub backend_url: Option<String>,
}

fn mask(value: Option<&str>) -> &'static str {
    if value.is_some() { "[REDACTED]" } else { "None" }
}

/// Everything the REST service needs, after defaults and overrides.
#[derive(Clone)]
pub struct ServerSettings {
    pub bind: String,
    pub database: PathBuf,
    pub cors_origin: String,
    pub jwt_secret: String,
    /// False when no secret was configured and one was generated for this
    /// process only.
    pub jwt_secret_configured: bool,
    pub token_ttl_minutes: u64,
    pub ai: Option<AiSettings>,
}

impl std::fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSettings")
            .field("bind", &self.bind)
            .field("database", &self.database)
            .field("cors_origin", &self.cors_origin)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_secret_configured", &self.jwt_secret_configured)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("ai", &self.ai)
            .finish()
    }
}

#[derive(Clone)]
pub struct AiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub backend_url: String,
}

/// Replace `${VAR}` references with the variable's value (empty if unset).
pub fn expand_env_vars(value: &str) -> String {
    expand_with(value, &|name| env::var(name).ok())
}

fn expand_with(value: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&lookup(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Expand `${VAR}` and drop values that end up blank.
fn expanded(value: Option<&String>, lookup: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    value
        .map(|v| expand_with(v, lookup))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Expand a leading `~/` to the home directory.
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

impl FocusConfig {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {:?}: {}", path, source);
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Self::parse(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, source);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn resolve_server(&self) -> ServerSettings {
        self.resolve_server_with(&|name| env::var(name).ok())
    }

    #[must_use]
    pub fn resolve_client(&self) -> ClientSettings {
        self.resolve_client_with(&|name| env::var(name).ok())
    }

    fn resolve_server_with(&self, lookup: &dyn Fn(&str) -> Option<String>) -> ServerSettings {
        let server = self.server.as_ref();
        let auth = self.auth.as_ref();
        let ai = self.ai.as_ref();

        let bind = expanded(server.and_then(|s| s.bind.as_ref()), lookup)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let database = non_blank(lookup("FOCUSLAB_DATABASE"))
            .or_else(|| expanded(server.and_then(|s| s.database.as_ref()), lookup))
            .map(|raw| expand_home(&raw))
            .unwrap_or_else(default_database_path);
        let cors_origin = expanded(server.and_then(|s| s.cors_origin.as_ref()), lookup)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        let configured_secret = non_blank(lookup("JWT_SECRET"))
            .or_else(|| expanded(auth.and_then(|a| a.jwt_secret.as_ref()), lookup));
        let jwt_secret_configured = configured_secret.is_some();
        let jwt_secret = configured_secret.unwrap_or_else(|| {
            format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
        });
        let token_ttl_minutes = auth
            .and_then(|a| a.token_ttl_minutes)
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES);

        let api_key = non_blank(lookup("GEMINI_API_KEY"))
            .or_else(|| expanded(ai.and_then(|a| a.api_key.as_ref()), lookup));
        let ai = api_key.map(|api_key| AiSettings {
            api_key,
            model: expanded(ai.and_then(|a| a.model.as_ref()), lookup)
                .unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            base_url: expanded(ai.and_then(|a| a.base_url.as_ref()), lookup),
        });

        ServerSettings {
            bind,
            database,
            cors_origin,
            jwt_secret,
            jwt_secret_configured,
            token_ttl_minutes,
            ai,
        }
    }

    fn resolve_client_with(&self, lookup: &dyn Fn(&str) -> Option<String>) -> ClientSettings {
        let backend_url = non_blank(lookup("FOCUSLAB_BACKEND_URL"))
            .or_else(|| {
                expanded(
                    self.client.as_ref().and_then(|c| c.backend_url.as_ref()),
                    lookup,
                )
            })
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        ClientSettings {
            backend_url: backend_url.trim_end_matches('/').to_string(),
        }
    }
}

/// `~/.focuslab`
#[must_use]
pub fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("config.toml"))
}

/// Where the client keeps its bearer token.
#[must_use]
pub fn token_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("token"))
}

fn default_database_path() -> PathBuf {
    app_dir().map_or_else(
        || PathBuf::from(APP_DIR).join("focuslab.db"),
        |dir| dir.join("focuslab.db"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn expand_no_vars() {
        assert_eq!(expand_with("hello world", &env_of(&[])), "hello world");
    }

    #[test]
    fn expand_single_and_adjacent_vars() {
        let env = env_of(&[("A", "alpha"), ("B", "beta")]);
        assert_eq!(expand_with("x ${A} y", &env), "x alpha y");
        assert_eq!(expand_with("${A}${B}", &env), "alphabeta");
    }

    #[test]
    fn expand_missing_var_becomes_empty() {
        assert_eq!(expand_with("a ${NOPE} b", &env_of(&[])), "a  b");
    }

    #[test]
    fn expand_unclosed_brace_preserved() {
        assert_eq!(expand_with("test ${UNCLOSED", &env_of(&[])), "test ${UNCLOSED");
    }

    #[test]
    fn empty_file_resolves_to_defaults() {
        let config = FocusConfig::parse("").unwrap();
        let server = config.resolve_server_with(&env_of(&[]));
        assert_eq!(server.bind, DEFAULT_BIND);
        assert_eq!(server.cors_origin, DEFAULT_CORS_ORIGIN);
        assert_eq!(server.token_ttl_minutes, DEFAULT_TOKEN_TTL_MINUTES);
        assert!(!server.jwt_secret_configured);
        assert!(!server.jwt_secret.is_empty());
        assert!(server.ai.is_none());

        let client = config.resolve_client_with(&env_of(&[]));
        assert_eq!(client.backend_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn file_values_are_expanded() {
        let config = FocusConfig::parse(
            r#"
            [auth]
            jwt_secret = "${SECRET_FROM_ENV}"
            token_ttl_minutes = 60

            [ai]
            api_key = "${KEY}"
            "#,
        )
        .unwrap();
        let server =
            config.resolve_server_with(&env_of(&[("SECRET_FROM_ENV", "s3cret"), ("KEY", "k")]));
        assert_eq!(server.jwt_secret, "s3cret");
        assert!(server.jwt_secret_configured);
        assert_eq!(server.token_ttl_minutes, 60);
        let ai = server.ai.unwrap();
        assert_eq!(ai.api_key, "k");
        assert_eq!(ai.model, DEFAULT_AI_MODEL);
    }

    #[test]
    fn blank_expansion_counts_as_unset() {
        let config = FocusConfig::parse("[ai]\napi_key = \"${MISSING}\"\n").unwrap();
        assert!(config.resolve_server_with(&env_of(&[])).ai.is_none());
    }

    #[test]
    fn environment_overrides_file() {
        let config = FocusConfig::parse(
            r#"
            [server]
            database = "/tmp/from-file.db"
            [client]
            backend_url = "http://file:1/"
            "#,
        )
        .unwrap();
        let env = env_of(&[
            ("FOCUSLAB_DATABASE", "/tmp/from-env.db"),
            ("FOCUSLAB_BACKEND_URL", "http://env:2/"),
            ("GEMINI_API_KEY", "g"),
        ]);
        let server = config.resolve_server_with(&env);
        assert_eq!(server.database, PathBuf::from("/tmp/from-env.db"));
        assert_eq!(server.ai.unwrap().api_key, "g");
        assert_eq!(config.resolve_client_with(&env).backend_url, "http://env:2");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = FocusConfig::parse(
            "[auth]\njwt_secret = \"topsecret\"\n[ai]\napi_key = \"apikey\"\n",
        )
        .unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("topsecret"));
        assert!(!printed.contains("apikey"));
        let settings = format!("{:?}", config.resolve_server_with(&env_of(&[])));
        assert!(!settings.contains("topsecret"));
    }

    #[test]
    fn load_from_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FocusConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.server.is_none());
    }

    #[test]
    fn load_from_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nbind = 1").unwrap();
        let err = FocusConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());
    }
}
