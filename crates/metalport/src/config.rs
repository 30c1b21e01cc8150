//! CLI configuration: thin wrapper around `metalport_config`.
//!
//! Adds flag overrides (`--endpoint`, `--auth-token`, `--project`, ...) on
//! top of the profile the config crate resolves.

use std::time::Duration;

use secrecy::SecretString;

use metalport_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use metalport_config::{Config, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ClientConfig` from the config file, profile, and CLI flags.
///
/// Flags take priority over profile values, which take priority over
/// `[defaults]`.
pub fn resolve_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config()?;
    let (profile_name, mut profile) =
        cfg.select(global.profile.as_deref()).map_err(|e| match e {
            metalport_config::ConfigError::UnknownProfile { name } => {
                let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
                names.sort();
                CliError::ProfileNotFound {
                    name,
                    available: if names.is_empty() {
                        "(none)".into()
                    } else {
                        names.join(", ")
                    },
                }
            }
            other => other.into(),
        })?;

    if let Some(ref endpoint) = global.endpoint {
        profile.endpoint = Some(endpoint.clone());
    }
    if let Some(ref project) = global.project {
        profile.project = Some(project.clone());
    }
    if let Some(ref metro) = global.metro {
        profile.metro = Some(metro.clone());
    }

    let auth_token = match global.auth_token {
        Some(ref token) => SecretString::from(token.clone()),
        None => metalport_config::resolve_auth_token(&profile, &profile_name)?,
    };

    let mut config = metalport_config::build_client_config(&profile, &cfg.defaults, auth_token)?;
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.reconcile_timeout = Duration::from_secs(secs);
    }
    Ok(config)
}
