// ── Convergence driver ──
//
// Runs the fixed stage order against a freshly read port, stopping at the
// first unrecoverable failure, and re-reads the port at the end. Nothing
// is cached between calls: every call starts from what the service
// reports. Callers must not reconcile the same port (or bond pair) from
// two tasks at once.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::DEFAULT_RECONCILE_TIMEOUT;
use crate::context::ReconcileContext;
use crate::error::CoreError;
use crate::model::{DesiredPortConfig, NetworkType, Port, PortDeclaration, PortId, VlanScope};
use crate::plan::{self, Plan};
use crate::service::PortService;
use crate::snapshot;
use crate::stage::Stage;
use crate::transition;
use crate::vlan_batch::{self, BatchPhase};

/// Per-reconciler settings.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Wall-clock budget for one call. `None` means unbounded.
    pub timeout: Option<Duration>,
    /// Where VXLAN tags are resolved.
    pub vlan_scope: Option<VlanScope>,
    /// Checked before each stage.
    pub cancel: CancellationToken,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_RECONCILE_TIMEOUT),
            vlan_scope: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Outcome of returning a port to factory defaults.
#[derive(Debug, Clone, Serialize)]
pub struct ResetReport {
    /// The port after the reset, or `None` if it was already out of reach.
    pub port: Option<Port>,
    pub completed: Vec<Stage>,
    pub warnings: Vec<String>,
}

impl ResetReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Drives ports towards a declared configuration.
#[derive(Clone)]
pub struct Reconciler {
    ports: Arc<dyn PortService>,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(ports: Arc<dyn PortService>) -> Self {
        Self::with_options(ports, ReconcileOptions::default())
    }

    pub fn with_options(ports: Arc<dyn PortService>, options: ReconcileOptions) -> Self {
        Self { ports, options }
    }

    /// Validate `declaration` and converge `port_id` to it.
    pub async fn reconcile(
        &self,
        port_id: &PortId,
        declaration: PortDeclaration,
    ) -> Result<Port, CoreError> {
        let desired = DesiredPortConfig::try_from(declaration)?;
        self.converge(port_id, desired).await
    }

    /// Converge `port_id` to `desired` and return the port as re-read
    /// afterwards.
    #[instrument(skip(self, desired), fields(port = %port_id))]
    pub async fn converge(
        &self,
        port_id: &PortId,
        desired: DesiredPortConfig,
    ) -> Result<Port, CoreError> {
        let deadline = self.deadline();
        let snapshot = self
            .bounded(deadline, Stage::SanityChecks, &[], snapshot::fetch(&*self.ports, port_id))
            .await?;

        let mut ctx = ReconcileContext::new(
            &*self.ports,
            snapshot,
            desired,
            self.options.vlan_scope.as_ref(),
        );
        self.run(&mut ctx, &Stage::CONVERGE, deadline).await?;

        let completed = ctx.completed.clone();
        let final_read = snapshot::fetch_at(&*self.ports, port_id, Stage::UpdateNativeVlan);
        let snapshot = self
            .bounded(deadline, Stage::UpdateNativeVlan, &completed, final_read)
            .await?;
        info!(stages = completed.len(), "port converged");
        Ok(snapshot.port)
    }

    /// The steps `converge` would take right now, without taking them.
    pub async fn plan(&self, port_id: &PortId, desired: DesiredPortConfig) -> Result<Plan, CoreError> {
        let snapshot = snapshot::fetch(&*self.ports, port_id).await?;
        let mut ctx = ReconcileContext::new(
            &*self.ports,
            snapshot,
            desired,
            self.options.vlan_scope.as_ref(),
        );
        let desired_vlans = ctx.desired_vlans(Stage::SanityChecks).await?;
        transition::sanity_check(&ctx.port, &ctx.desired, &desired_vlans)?;
        Ok(plan::diff(
            ctx.port.id.clone(),
            ctx.state(),
            &ctx.desired,
            &desired_vlans,
        ))
    }

    /// Return `port_id` to factory defaults: bonded, layer3, no VLANs.
    ///
    /// Best effort. Failures become warnings in the report; only a port
    /// that cannot be read for reasons other than being gone is an error.
    #[instrument(skip(self), fields(port = %port_id))]
    pub async fn reset_to_defaults(&self, port_id: &PortId) -> Result<ResetReport, CoreError> {
        let deadline = self.deadline();
        let snapshot = match snapshot::fetch(&*self.ports, port_id).await {
            Ok(snapshot) => snapshot,
            Err(e @ (CoreError::NotFound { .. } | CoreError::Forbidden { .. })) => {
                warn!("port not accessible, nothing to reset: {e}");
                return Ok(ResetReport {
                    port: None,
                    completed: Vec::new(),
                    warnings: Vec::new(),
                });
            }
            Err(e) => return Err(e),
        };

        let mut ctx = ReconcileContext::new(
            &*self.ports,
            snapshot,
            DesiredPortConfig::factory_defaults(),
            None,
        )
        .best_effort();

        if let Err(e) = self.run(&mut ctx, &Stage::RESET, deadline).await {
            ctx.warn(format!("reset stopped: {e}"));
        }

        let port = match ctx.service.get_port(port_id).await {
            Ok(port) => port,
            Err(e) => {
                ctx.warn(format!("could not re-read port after reset: {e}"));
                ctx.port.clone()
            }
        };
        for deviation in reset_deviations(&port) {
            ctx.warn(deviation);
        }

        Ok(ResetReport {
            port: Some(port),
            completed: ctx.completed,
            warnings: ctx.warnings,
        })
    }

    /// Stop managing `port_id` under `desired`.
    ///
    /// Only a declaration with `reset_on_delete` touches the port: it is
    /// returned to factory defaults and the report comes back. Otherwise
    /// the port is left as it is and nothing is called.
    #[instrument(skip(self, desired), fields(port = %port_id))]
    pub async fn release(
        &self,
        port_id: &PortId,
        desired: &DesiredPortConfig,
    ) -> Result<Option<ResetReport>, CoreError> {
        if !desired.reset_on_delete {
            debug!("reset_on_delete not set, leaving port as it is");
            return Ok(None);
        }
        self.reset_to_defaults(port_id).await.map(Some)
    }

    // ── Pipeline ─────────────────────────────────────────────────────

    fn deadline(&self) -> Option<Instant> {
        self.options.timeout.map(|t| Instant::now() + t)
    }

    async fn run(
        &self,
        ctx: &mut ReconcileContext<'_>,
        stages: &[Stage],
        deadline: Option<Instant>,
    ) -> Result<(), CoreError> {
        for &stage in stages {
            if self.options.cancel.is_cancelled() {
                return Err(CoreError::Cancelled {
                    stage,
                    completed: ctx.completed.clone(),
                });
            }
            let completed = ctx.completed.clone();
            debug!(%stage, "running stage");
            self.bounded(deadline, stage, &completed, run_stage(ctx, stage))
                .await?;
            ctx.completed.push(stage);
        }
        Ok(())
    }

    /// Run `fut` unless the deadline has passed, and give up on it when
    /// the deadline passes while it runs.
    async fn bounded<T>(
        &self,
        deadline: Option<Instant>,
        stage: Stage,
        completed: &[Stage],
        fut: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        let timeout = || CoreError::Timeout {
            stage,
            completed: completed.to_vec(),
        };
        let Some(deadline) = deadline else {
            return fut.await;
        };
        if Instant::now() >= deadline {
            return Err(timeout());
        }
        timeout_at(deadline, fut).await.map_err(|_| timeout())?
    }
}

async fn run_stage(ctx: &mut ReconcileContext<'_>, stage: Stage) -> Result<(), CoreError> {
    match stage {
        Stage::SanityChecks => transition::sanity_checks(ctx).await,
        Stage::DetachVlans => vlan_batch::apply(ctx, BatchPhase::DetachOnly).await,
        Stage::Disbond => transition::make_disbond(ctx).await,
        Stage::ConvertToLayer2 => transition::convert_to_layer2(ctx).await,
        Stage::Bond => transition::make_bond(ctx).await,
        Stage::ConvertToLayer3 => transition::convert_to_layer3(ctx).await,
        Stage::AttachVlans => vlan_batch::apply(ctx, BatchPhase::AttachOnly).await,
        Stage::UpdateNativeVlan => transition::update_native_vlan(ctx).await,
    }
}

/// Ways `port` differs from factory defaults.
pub fn reset_deviations(port: &Port) -> Vec<String> {
    let mut deviations = Vec::new();
    if !port.bonded {
        deviations.push(format!("port {} is not bonded", port.name));
    }
    if port.is_bond_port() && port.network_type != Some(NetworkType::Layer3) {
        let current = port
            .network_type
            .map_or_else(|| "unknown".to_owned(), |t| t.to_string());
        deviations.push(format!("bond port {} is {current}, not layer3", port.name));
    }
    if let Some(native) = &port.native_vlan {
        deviations.push(format!("port {} still has native VLAN {native}", port.name));
    }
    if !port.vlans.is_empty() {
        let ids: Vec<String> = port.vlans.iter().map(|v| v.id.to_string()).collect();
        deviations.push(format!(
            "port {} still carries VLANs: {}",
            port.name,
            ids.join(", ")
        ));
    }
    deviations
}
