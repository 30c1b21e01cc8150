// ── Reconciliation context ──
//
// The state threaded through every pipeline stage. Stages replace `port`
// with whatever the service returns after each successful call, so later
// stages always see the effect of earlier ones.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::CoreError;
use crate::model::{DesiredPortConfig, Port, PortState, VlanId, VlanScope, VlanSelection};
use crate::service::PortService;
use crate::snapshot::{self, PortSnapshot};
use crate::stage::Stage;
use crate::vlan_batch::resolve_vxlans;

pub struct ReconcileContext<'a> {
    pub service: &'a dyn PortService,
    pub port: Port,
    pub peer: Option<Port>,
    pub desired: DesiredPortConfig,
    /// Cleanup mode: some failures become warnings instead of errors.
    pub best_effort: bool,
    pub warnings: Vec<String>,
    /// Stages that have finished, in order.
    pub completed: Vec<Stage>,
    scope: Option<&'a VlanScope>,
    desired_vlans: Option<BTreeSet<VlanId>>,
}

impl<'a> ReconcileContext<'a> {
    pub fn new(
        service: &'a dyn PortService,
        snapshot: PortSnapshot,
        desired: DesiredPortConfig,
        scope: Option<&'a VlanScope>,
    ) -> Self {
        Self {
            service,
            port: snapshot.port,
            peer: snapshot.peer,
            desired,
            best_effort: false,
            warnings: Vec::new(),
            completed: Vec::new(),
            scope,
            desired_vlans: None,
        }
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn state(&self) -> PortState {
        self.port.state()
    }

    /// The desired VLAN ids, resolving VXLAN tags on first use.
    pub async fn desired_vlans(&mut self, stage: Stage) -> Result<BTreeSet<VlanId>, CoreError> {
        if let Some(resolved) = &self.desired_vlans {
            return Ok(resolved.clone());
        }
        let resolved = match &self.desired.vlans {
            VlanSelection::ById(ids) => ids.clone(),
            VlanSelection::ByVxlan(tags) if tags.is_empty() => BTreeSet::new(),
            VlanSelection::ByVxlan(tags) => {
                let scope = self.scope.ok_or_else(|| CoreError::Validation {
                    message: "VXLAN tags need a project to resolve them in".into(),
                })?;
                let candidates = self
                    .service
                    .list_vlans(scope)
                    .await
                    .map_err(CoreError::remote(stage))?;
                resolve_vxlans(tags, &candidates)?
            }
        };
        self.desired_vlans = Some(resolved.clone());
        Ok(resolved)
    }

    /// Re-read the port only.
    pub async fn refresh_port(&mut self, stage: Stage) -> Result<(), CoreError> {
        self.port = self
            .service
            .get_port(&self.port.id)
            .await
            .map_err(|e| CoreError::from_read("port", self.port.id.as_str(), stage, e))?;
        Ok(())
    }

    /// Re-read the port and its bond peer.
    pub async fn refresh(&mut self, stage: Stage) -> Result<(), CoreError> {
        let snapshot = snapshot::fetch_at(self.service, &self.port.id, stage).await?;
        self.port = snapshot.port;
        self.peer = snapshot.peer;
        Ok(())
    }

    pub fn warn(&mut self, message: String) {
        warn!(port = %self.port.id, "{message}");
        self.warnings.push(message);
    }
}
