// ── VLAN lifecycle ──
//
// Create, look up and delete project VLANs. Deleting a VLAN first
// detaches it from every port that still carries it.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::CoreError;
use crate::model::{NewVlan, PortId, Vlan, VlanId, VlanScope};
use crate::service::{PortService, ServiceError, ServiceErrorKind, VlanService};

#[derive(Clone)]
pub struct VlanManager {
    vlans: Arc<dyn VlanService>,
    ports: Arc<dyn PortService>,
}

impl VlanManager {
    pub fn new(vlans: Arc<dyn VlanService>, ports: Arc<dyn PortService>) -> Self {
        Self { vlans, ports }
    }

    pub async fn create(&self, request: NewVlan) -> Result<Vlan, CoreError> {
        let request = request
            .validate()
            .map_err(|message| CoreError::Validation { message })?;
        let vlan = self
            .vlans
            .create_vlan(&request)
            .await
            .map_err(|e| service_error("virtual network", request.project_id.as_str(), e))?;
        info!(vlan = %vlan.id, vxlan = ?vlan.vxlan, "created VLAN");
        Ok(vlan)
    }

    /// `None` when the VLAN is gone or not visible to this token.
    pub async fn get(&self, id: &VlanId) -> Result<Option<Vlan>, CoreError> {
        match self.vlans.get_vlan(id).await {
            Ok(vlan) => Ok(Some(vlan)),
            Err(e) if e.is_gone() => Ok(None),
            Err(e) => Err(service_error("virtual network", id.as_str(), e)),
        }
    }

    pub async fn list(&self, scope: &VlanScope) -> Result<Vec<Vlan>, CoreError> {
        let mut vlans = self
            .ports
            .list_vlans(scope)
            .await
            .map_err(|e| service_error("project", scope.project_id.as_str(), e))?;
        vlans.sort_by(|a, b| a.vxlan.cmp(&b.vxlan).then_with(|| a.id.cmp(&b.id)));
        Ok(vlans)
    }

    /// Detach `id` from every port carrying it, then delete it. Returns the
    /// ports it was detached from. Deleting a VLAN that no longer exists
    /// succeeds.
    #[instrument(skip(self), fields(vlan = %id))]
    pub async fn delete(&self, id: &VlanId) -> Result<Vec<PortId>, CoreError> {
        let carriers = match self.vlans.vlan_port_ids(id).await {
            Ok(ports) => ports,
            Err(e) if e.is_gone() => {
                debug!("VLAN already gone");
                return Ok(Vec::new());
            }
            Err(e) => return Err(service_error("virtual network", id.as_str(), e)),
        };

        let mut detached = Vec::with_capacity(carriers.len());
        for port in carriers {
            match self.ports.unassign_vlan(&port, id).await {
                Ok(_) => detached.push(port),
                Err(e) if e.is_gone() || e.kind == ServiceErrorKind::NotAssigned => {
                    debug!(%port, "port no longer carries VLAN: {e}");
                }
                Err(e) => return Err(service_error("port", port.as_str(), e)),
            }
        }

        match self.vlans.delete_vlan(id).await {
            Ok(()) => info!(ports = detached.len(), "deleted VLAN"),
            Err(e) if e.is_gone() => debug!("VLAN vanished before delete"),
            Err(e) => return Err(service_error("virtual network", id.as_str(), e)),
        }
        Ok(detached)
    }
}

fn service_error(entity: &'static str, id: &str, err: ServiceError) -> CoreError {
    match err.kind {
        ServiceErrorKind::NotFound => CoreError::NotFound {
            entity,
            id: id.to_owned(),
        },
        ServiceErrorKind::Forbidden => CoreError::Forbidden {
            entity,
            id: id.to_owned(),
        },
        _ => CoreError::Api {
            message: err.message,
            status: None,
        },
    }
}
