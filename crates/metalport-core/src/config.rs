// ── Runtime client configuration ──
//
// Describes *how* to reach the Metal API and the defaults reconciliation
// runs with. Carries credential data but never touches disk: the config
// crate builds a `ClientConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::model::VlanScope;

pub const DEFAULT_ENDPOINT: &str = "https://api.equinix.com/metal/v1/";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Only for test endpoints.
    DangerAcceptInvalid,
}

/// Everything needed to build a `MetalService` and a `Reconciler`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    pub auth_token: SecretString,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Wall-clock budget for one reconciliation.
    pub reconcile_timeout: Duration,
    pub project_id: Option<String>,
    pub metro: Option<String>,
}

impl ClientConfig {
    /// Scope for resolving VXLAN tags; needs a project.
    pub fn vlan_scope(&self) -> Option<VlanScope> {
        self.project_id.as_ref().map(|project_id| VlanScope {
            project_id: project_id.clone(),
            metro: self.metro.as_ref().map(|m| m.to_lowercase()),
        })
    }
}
