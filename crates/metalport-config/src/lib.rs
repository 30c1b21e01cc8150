//! Configuration for metalport.
//!
//! TOML profiles, auth token resolution (env + keyring + plaintext), and
//! translation to `metalport_core::ClientConfig`. The CLI layers its
//! flag overrides on top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use metalport_core::config::{
    DEFAULT_ENDPOINT, DEFAULT_RECONCILE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
use metalport_core::{ClientConfig, TlsVerification};

/// Env var consulted last when no profile supplies a token.
pub const AUTH_TOKEN_ENV: &str = "METAL_AUTH_TOKEN";

const KEYRING_SERVICE: &str = "metalport";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no auth token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is requested.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named API profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick a profile by name, falling back to `default_profile`.
    ///
    /// A missing *default* profile yields an empty one so that flags and
    /// env vars alone are enough; a missing *named* profile is an error.
    pub fn select(&self, requested: Option<&str>) -> Result<(String, Profile), ConfigError> {
        if let Some(name) = requested {
            return self
                .profiles
                .get(name)
                .cloned()
                .map(|p| (name.to_owned(), p))
                .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() });
        }
        let name = self
            .default_profile
            .clone()
            .unwrap_or_else(|| "default".into());
        let profile = self.profiles.get(&name).cloned().unwrap_or_default();
        Ok((name, profile))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout, seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Budget for one reconciliation, seconds.
    #[serde(default = "default_reconcile_timeout")]
    pub reconcile_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            endpoint: default_endpoint(),
            request_timeout: default_request_timeout(),
            reconcile_timeout: default_reconcile_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}
fn default_reconcile_timeout() -> u64 {
    DEFAULT_RECONCILE_TIMEOUT.as_secs()
}

/// A named API profile. Every field overrides `Defaults`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL.
    pub endpoint: Option<String>,

    /// Auth token (plaintext, prefer keyring or env var).
    pub auth_token: Option<String>,

    /// Environment variable name containing the auth token.
    pub auth_token_env: Option<String>,

    /// Project used to resolve VXLAN tags and list VLANs.
    pub project: Option<String>,

    /// Metro used to narrow VXLAN resolution.
    pub metro: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    pub request_timeout: Option<u64>,

    pub reconcile_timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "metalport", "metalport").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("metalport");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + `METALPORT_` env vars (`__` separates nesting, e.g.
/// `METALPORT_DEFAULTS__OUTPUT=json`). A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("METALPORT_").split("__"));

    Ok(figment.extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the auth token from the credential chain (no CLI flag step).
pub fn resolve_auth_token(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's auth_token_env → env var lookup
    if let Some(ref env_name) = profile.auth_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(secret) = keyring_token(profile_name) {
        return Ok(secret);
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.auth_token {
        return Ok(SecretString::from(token.clone()));
    }

    // 4. The conventional Metal env var
    if let Ok(val) = std::env::var(AUTH_TOKEN_ENV) {
        return Ok(SecretString::from(val));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn keyring_token(profile_name: &str) -> Option<SecretString> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)).ok()?;
    entry.get_password().ok().map(SecretString::from)
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/auth-token")
}

/// Store `token` in the system keyring for `profile_name`.
pub fn store_auth_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)).map_err(
        |e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        },
    )?;
    entry
        .set_password(token)
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ClientConfig` from a profile, no CLI flag overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let auth_token = resolve_auth_token(profile, profile_name)?;
    build_client_config(profile, defaults, auth_token)
}

/// Build a `ClientConfig` with an already resolved token.
pub fn build_client_config(
    profile: &Profile,
    defaults: &Defaults,
    auth_token: SecretString,
) -> Result<ClientConfig, ConfigError> {
    let raw = profile.endpoint.as_deref().unwrap_or(&defaults.endpoint);
    let endpoint = parse_endpoint(raw)?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ClientConfig {
        endpoint,
        auth_token,
        tls,
        request_timeout: Duration::from_secs(
            profile.request_timeout.unwrap_or(defaults.request_timeout),
        ),
        reconcile_timeout: Duration::from_secs(
            profile
                .reconcile_timeout
                .unwrap_or(defaults.reconcile_timeout),
        ),
        project_id: profile.project.clone(),
        metro: profile.metro.as_ref().map(|m| m.to_lowercase()),
    })
}

/// Parse an API base URL. Only http(s) is accepted.
pub fn parse_endpoint(raw: &str) -> Result<url::Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Validation {
        field: "endpoint".into(),
        reason,
    };
    let url: url::Url = raw
        .parse()
        .map_err(|_| invalid(format!("invalid URL: {raw}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}' in {raw}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.defaults.reconcile_timeout, 1800);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn profiles_are_read_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "lab"

[defaults]
output = "json"

[profiles.lab]
project = "proj-1"
metro = "SV"
auth_token = "plain"
request_timeout = 5
"#,
        );

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.defaults.output, "json");

        let (name, profile) = config.select(None).unwrap();
        assert_eq!(name, "lab");
        assert_eq!(profile.project.as_deref(), Some("proj-1"));
        assert_eq!(profile.request_timeout, Some(5));
    }

    #[test]
    fn unknown_named_profile_is_an_error() {
        let config = Config::default();
        assert!(matches!(
            config.select(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
        let (name, profile) = config.select(None).unwrap();
        assert_eq!(name, "default");
        assert!(profile.endpoint.is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                project: Some("p".into()),
                ..Profile::default()
            },
        );

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].project.as_deref(), Some("p"));
    }

    #[test]
    fn client_config_applies_profile_over_defaults() {
        let profile = Profile {
            auth_token: Some("plain".into()),
            project: Some("proj".into()),
            metro: Some("DA".into()),
            ca_cert: Some(PathBuf::from("/etc/ca.pem")),
            reconcile_timeout: Some(60),
            ..Profile::default()
        };

        let config =
            profile_to_client_config(&profile, "metalport-test-unused", &Defaults::default())
                .unwrap();

        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.tls, TlsVerification::CustomCa("/etc/ca.pem".into()));
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.reconcile_timeout, Duration::from_secs(60));
        assert_eq!(config.metro.as_deref(), Some("da"));
    }

    #[test]
    fn insecure_wins_over_ca_cert() {
        let profile = Profile {
            auth_token: Some("plain".into()),
            ca_cert: Some(PathBuf::from("/etc/ca.pem")),
            insecure: Some(true),
            ..Profile::default()
        };
        let config =
            profile_to_client_config(&profile, "metalport-test-unused", &Defaults::default())
                .unwrap();
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn endpoint_must_be_http() {
        assert!(parse_endpoint("https://metal.example/metal/v1/").is_ok());
        assert!(matches!(
            parse_endpoint("ftp://metal.example/"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(parse_endpoint("not a url").is_err());
    }
}
