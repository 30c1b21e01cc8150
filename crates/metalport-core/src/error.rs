// ── Core error types ──
//
// What callers of the reconciler see. Service failures arrive already
// classified (`ServiceError`); API transport errors only surface here
// when a service is being built. Pipeline failures carry the stage they
// stopped at so callers can tell how far reconciliation got.

use std::fmt;

use strum::Display;
use thiserror::Error;

use crate::service::{ServiceError, ServiceErrorKind};
use crate::stage::Stage;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Access errors ────────────────────────────────────────────────
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Access to {entity} {id} is forbidden")]
    Forbidden { entity: &'static str, id: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("VXLAN {vxlan} matches more than one VLAN: {}", .candidates.join(", "))]
    AmbiguousVxlan { vxlan: u16, candidates: Vec<String> },

    #[error("No VLAN in scope has VXLAN {vxlan}")]
    UnknownVxlan { vxlan: u16 },

    #[error("Invalid transition: {reason}")]
    InvalidTransition { reason: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Pipeline errors ──────────────────────────────────────────────
    #[error("Remote call failed during {stage}: {source}")]
    RemoteCallFailed {
        stage: Stage,
        #[source]
        source: ServiceError,
    },

    #[error("Timed out before {stage} finished (completed: {})", StageList(.completed))]
    Timeout { stage: Stage, completed: Vec<Stage> },

    #[error("Cancelled before {stage} (completed: {})", StageList(.completed))]
    Cancelled { stage: Stage, completed: Vec<Stage> },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },
}

/// Coarse classification of a `CoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    AmbiguousVxlan,
    UnknownVxlan,
    InvalidTransition,
    Validation,
    Config,
    RemoteCallFailed,
    Timeout,
    Cancelled,
    Api,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::AmbiguousVxlan { .. } => ErrorKind::AmbiguousVxlan,
            Self::UnknownVxlan { .. } => ErrorKind::UnknownVxlan,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Config { .. } => ErrorKind::Config,
            Self::RemoteCallFailed { .. } => ErrorKind::RemoteCallFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Api { .. } => ErrorKind::Api,
        }
    }

    /// Whether re-running reconciliation may succeed without changing the
    /// declaration. Access and configuration errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteCallFailed { source, .. } => source.kind == ServiceErrorKind::Other,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// The pipeline stage the error stopped at, if it came from one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::RemoteCallFailed { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Cancelled { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Map a failed read of `entity` `id` to `NotFound` / `Forbidden`,
    /// anything else to `RemoteCallFailed` at `stage`.
    pub(crate) fn from_read(
        entity: &'static str,
        id: impl Into<String>,
        stage: Stage,
        err: ServiceError,
    ) -> Self {
        match err.kind {
            ServiceErrorKind::NotFound => Self::NotFound {
                entity,
                id: id.into(),
            },
            ServiceErrorKind::Forbidden => Self::Forbidden {
                entity,
                id: id.into(),
            },
            _ => Self::RemoteCallFailed { stage, source: err },
        }
    }

    pub(crate) fn remote(stage: Stage) -> impl FnOnce(ServiceError) -> Self {
        move |source| Self::RemoteCallFailed { stage, source }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            reason: reason.into(),
        }
    }
}

struct StageList<'a>(&'a [Stage]);

impl fmt::Display for StageList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        for (i, stage) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<metalport_api::Error> for CoreError {
    fn from(err: metalport_api::Error) -> Self {
        match err {
            metalport_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            metalport_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            other => CoreError::Api {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
