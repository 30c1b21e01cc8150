// ── Remote service seam ──
//
// The reconciler talks to the infrastructure API only through these
// traits. Errors come back classified by value so that "already gone" and
// "already in place" can be told apart from real failures without looking
// at HTTP details.

use async_trait::async_trait;
use metalport_api::types::{AddressRequest, VirtualNetworkCreateRequest};
use metalport_api::{MetalClient, TlsMode, TransportConfig};
use strum::Display;
use thiserror::Error;

use crate::config::{ClientConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{Layer, Location, Port, PortId, Vlan, VlanCreate, VlanId, VlanScope};

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ServiceErrorKind {
    NotFound,
    Forbidden,
    /// Assigning a VLAN the port already carries.
    AlreadyAssigned,
    /// Unassigning a VLAN the port does not carry.
    NotAssigned,
    Other,
}

/// A failed remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ServiceErrorKind::NotFound
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind == ServiceErrorKind::Forbidden
    }

    /// Not found or forbidden: the resource is out of reach either way.
    pub fn is_gone(&self) -> bool {
        self.is_not_found() || self.is_forbidden()
    }
}

impl From<metalport_api::Error> for ServiceError {
    fn from(err: metalport_api::Error) -> Self {
        let kind = if err.is_not_found() {
            ServiceErrorKind::NotFound
        } else if err.is_forbidden() {
            ServiceErrorKind::Forbidden
        } else if err.is_already_assigned() {
            ServiceErrorKind::AlreadyAssigned
        } else if err.is_not_assigned() {
            ServiceErrorKind::NotAssigned
        } else {
            ServiceErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

// ── Traits ──────────────────────────────────────────────────────────

/// Port reads and mutations. Every mutation returns the port as the
/// service sees it afterwards.
#[async_trait]
pub trait PortService: Send + Sync {
    async fn get_port(&self, port: &PortId) -> Result<Port, ServiceError>;

    async fn assign_vlan(&self, port: &PortId, vlan: &VlanId) -> Result<Port, ServiceError>;

    async fn unassign_vlan(&self, port: &PortId, vlan: &VlanId) -> Result<Port, ServiceError>;

    async fn bond(&self, port: &PortId) -> Result<Port, ServiceError>;

    async fn disbond(&self, port: &PortId) -> Result<Port, ServiceError>;

    async fn convert_mode(&self, port: &PortId, layer: Layer) -> Result<Port, ServiceError>;

    /// `None` clears the native VLAN.
    async fn set_native_vlan(
        &self,
        port: &PortId,
        vlan: Option<&VlanId>,
    ) -> Result<Port, ServiceError>;

    async fn list_vlans(&self, scope: &VlanScope) -> Result<Vec<Vlan>, ServiceError>;
}

/// VLAN lifecycle.
#[async_trait]
pub trait VlanService: Send + Sync {
    async fn get_vlan(&self, vlan: &VlanId) -> Result<Vlan, ServiceError>;

    async fn create_vlan(&self, request: &VlanCreate) -> Result<Vlan, ServiceError>;

    async fn delete_vlan(&self, vlan: &VlanId) -> Result<(), ServiceError>;

    /// Ports the VLAN is currently assigned to.
    async fn vlan_port_ids(&self, vlan: &VlanId) -> Result<Vec<PortId>, ServiceError>;
}

// ── Metal API implementation ────────────────────────────────────────

/// `PortService` and `VlanService` over the Metal HTTP API.
pub struct MetalService {
    client: MetalClient,
}

impl MetalService {
    pub fn new(client: MetalClient) -> Self {
        Self { client }
    }

    /// Build an authenticated client from runtime configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, CoreError> {
        let tls = match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        let transport = TransportConfig {
            tls,
            timeout: config.request_timeout,
            ..TransportConfig::default()
        };
        let client =
            MetalClient::from_auth_token(config.endpoint.as_str(), &config.auth_token, &transport)?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PortService for MetalService {
    async fn get_port(&self, port: &PortId) -> Result<Port, ServiceError> {
        Ok(self.client.get_port(port.as_str()).await?.into())
    }

    async fn assign_vlan(&self, port: &PortId, vlan: &VlanId) -> Result<Port, ServiceError> {
        Ok(self
            .client
            .assign_vlan(port.as_str(), vlan.as_str())
            .await?
            .into())
    }

    async fn unassign_vlan(&self, port: &PortId, vlan: &VlanId) -> Result<Port, ServiceError> {
        Ok(self
            .client
            .unassign_vlan(port.as_str(), vlan.as_str())
            .await?
            .into())
    }

    async fn bond(&self, port: &PortId) -> Result<Port, ServiceError> {
        Ok(self.client.bond(port.as_str(), false).await?.into())
    }

    async fn disbond(&self, port: &PortId) -> Result<Port, ServiceError> {
        Ok(self.client.disbond(port.as_str(), false).await?.into())
    }

    async fn convert_mode(&self, port: &PortId, layer: Layer) -> Result<Port, ServiceError> {
        let resp = match layer {
            Layer::L2 => self.client.convert_to_layer2(port.as_str()).await?,
            Layer::L3 => {
                self.client
                    .convert_to_layer3(port.as_str(), &AddressRequest::DEFAULT_LAYER3)
                    .await?
            }
        };
        Ok(resp.into())
    }

    async fn set_native_vlan(
        &self,
        port: &PortId,
        vlan: Option<&VlanId>,
    ) -> Result<Port, ServiceError> {
        let resp = match vlan {
            Some(vlan) => {
                self.client
                    .assign_native_vlan(port.as_str(), vlan.as_str())
                    .await?
            }
            None => self.client.unassign_native_vlan(port.as_str()).await?,
        };
        Ok(resp.into())
    }

    async fn list_vlans(&self, scope: &VlanScope) -> Result<Vec<Vlan>, ServiceError> {
        let vlans = self
            .client
            .list_virtual_networks(&scope.project_id, scope.metro.as_deref())
            .await?;
        Ok(vlans.into_iter().map(Vlan::from).collect())
    }
}

#[async_trait]
impl VlanService for MetalService {
    async fn get_vlan(&self, vlan: &VlanId) -> Result<Vlan, ServiceError> {
        Ok(self.client.get_virtual_network(vlan.as_str()).await?.into())
    }

    async fn create_vlan(&self, request: &VlanCreate) -> Result<Vlan, ServiceError> {
        let (metro, facility) = match &request.location {
            Location::Metro(code) => (Some(code.clone()), None),
            Location::Facility(code) => (None, Some(code.clone())),
        };
        let body = VirtualNetworkCreateRequest {
            project_id: request.project_id.clone(),
            description: request.description.clone(),
            metro,
            facility,
            vxlan: request.vxlan,
        };
        Ok(self.client.create_virtual_network(&body).await?.into())
    }

    async fn delete_vlan(&self, vlan: &VlanId) -> Result<(), ServiceError> {
        Ok(self.client.delete_virtual_network(vlan.as_str()).await?)
    }

    async fn vlan_port_ids(&self, vlan: &VlanId) -> Result<Vec<PortId>, ServiceError> {
        let expanded = self
            .client
            .get_virtual_network_attachments(vlan.as_str())
            .await?;
        Ok(crate::convert::ports_carrying(&expanded, vlan))
    }
}
