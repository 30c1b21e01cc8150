//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use metalport_config::ConfigError;
use metalport_core::{CoreError, Stage};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const TIMEOUT: i32 = 8;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(metalport::auth_failed),
        help(
            "Check the auth token for profile '{profile}'.\n\
             Store a new one with: metalport config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No auth token configured for profile '{profile}'")]
    #[diagnostic(
        code(metalport::no_credentials),
        help(
            "Pass --auth-token, set METAL_AUTH_TOKEN, or run:\n\
             metalport config set-token --profile {profile}"
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(metalport::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("Access to {resource_type} '{identifier}' is forbidden")]
    #[diagnostic(
        code(metalport::forbidden),
        help("The auth token has no access to this {resource_type}.")
    )]
    Forbidden {
        resource_type: String,
        identifier: String,
    },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("Cannot reconcile: {reason}")]
    #[diagnostic(code(metalport::invalid_transition))]
    InvalidTransition { reason: String },

    #[error("VXLAN {vxlan} is ambiguous: {candidates}")]
    #[diagnostic(
        code(metalport::ambiguous_vxlan),
        help("Narrow the lookup with --metro, or declare VLANs by ID with --vlan.")
    )]
    AmbiguousVxlan { vxlan: u16, candidates: String },

    #[error("No VLAN with VXLAN {vxlan} in scope")]
    #[diagnostic(
        code(metalport::unknown_vxlan),
        help("Run: metalport vlan list --project <id> to see available VLANs")
    )]
    UnknownVxlan { vxlan: u16 },

    #[error("API call failed during {stage}: {message}")]
    #[diagnostic(
        code(metalport::remote_call_failed),
        help("Stages before {stage} were applied. Re-running continues from the port's current state.")
    )]
    RemoteCallFailed { stage: Stage, message: String },

    #[error("Timed out during {stage}")]
    #[diagnostic(
        code(metalport::timeout),
        help("Completed stages: {completed}. Increase the budget with --timeout.")
    )]
    Timeout { stage: Stage, completed: String },

    #[error("Cancelled before {stage}")]
    #[diagnostic(code(metalport::cancelled))]
    Cancelled { stage: Stage },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(metalport::api_error))]
    ApiError { message: String, status: Option<u16> },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(metalport::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(metalport::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(metalport::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(metalport::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid declaration file: {0}")]
    #[diagnostic(
        code(metalport::declaration),
        help("Expected keys: bonded, layer2, native_vlan_id, vlan_ids, vxlan_ids, reset_on_delete")
    )]
    Declaration(#[from] toml::de::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::InvalidTransition { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Cancelled { .. } => exit_code::CANCELLED,
            Self::Validation { .. }
            | Self::AmbiguousVxlan { .. }
            | Self::UnknownVxlan { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::Declaration(_) => exit_code::USAGE,
            Self::ApiError {
                status: Some(401), ..
            } => exit_code::AUTH,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        tracing::debug!(
            kind = %err.kind(),
            stage = ?err.stage(),
            retryable = err.is_retryable(),
            "reconciliation error"
        );
        match err {
            CoreError::NotFound { entity, id } => CliError::NotFound {
                resource_type: entity.into(),
                identifier: id,
            },
            CoreError::Forbidden { entity, id } => CliError::Forbidden {
                resource_type: entity.into(),
                identifier: id,
            },
            CoreError::AmbiguousVxlan { vxlan, candidates } => CliError::AmbiguousVxlan {
                vxlan,
                candidates: candidates.join(", "),
            },
            CoreError::UnknownVxlan { vxlan } => CliError::UnknownVxlan { vxlan },
            CoreError::InvalidTransition { reason } => CliError::InvalidTransition { reason },
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::RemoteCallFailed { stage, source } => CliError::RemoteCallFailed {
                stage,
                message: source.to_string(),
            },
            CoreError::Timeout { stage, completed } => CliError::Timeout {
                stage,
                completed: stage_list(&completed),
            },
            CoreError::Cancelled { stage, .. } => CliError::Cancelled { stage },
            CoreError::Api { message, status } => CliError::ApiError { message, status },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

fn stage_list(stages: &[Stage]) -> String {
    if stages.is_empty() {
        return "none".into();
    }
    stages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
