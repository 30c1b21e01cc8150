// ── VLAN batch reconciler ──
//
// Computes which VLANs to detach and attach, and applies one side of
// that difference at a time: detaching runs before any bond or layer
// change, attaching after. Conflicts that mean "already done" are
// treated as success.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::context::ReconcileContext;
use crate::error::CoreError;
use crate::model::{Vlan, VlanId};
use crate::service::ServiceErrorKind;
use crate::stage::Stage;

/// The two halves of a membership change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanDiff {
    pub to_detach: BTreeSet<VlanId>,
    pub to_attach: BTreeSet<VlanId>,
}

impl VlanDiff {
    pub fn compute(attached: &BTreeSet<VlanId>, desired: &BTreeSet<VlanId>) -> Self {
        Self {
            to_detach: attached.difference(desired).cloned().collect(),
            to_attach: desired.difference(attached).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    DetachOnly,
    AttachOnly,
}

impl BatchPhase {
    pub fn stage(self) -> Stage {
        match self {
            Self::DetachOnly => Stage::DetachVlans,
            Self::AttachOnly => Stage::AttachVlans,
        }
    }
}

/// Map VXLAN tags to the ids of the VLANs carrying them.
///
/// Each tag must match exactly one candidate.
pub fn resolve_vxlans(
    tags: &BTreeSet<u16>,
    candidates: &[Vlan],
) -> Result<BTreeSet<VlanId>, CoreError> {
    tags.iter()
        .map(|&tag| {
            let mut matches = candidates.iter().filter(|v| v.vxlan == Some(tag));
            match (matches.next(), matches.next()) {
                (Some(only), None) => Ok(only.id.clone()),
                (None, _) => Err(CoreError::UnknownVxlan { vxlan: tag }),
                (Some(first), Some(second)) => {
                    let mut ids = vec![first.id.to_string(), second.id.to_string()];
                    ids.extend(matches.map(|v| v.id.to_string()));
                    Err(CoreError::AmbiguousVxlan {
                        vxlan: tag,
                        candidates: ids,
                    })
                }
            }
        })
        .collect()
}

/// Apply one phase of the membership change to `ctx.port`.
///
/// Calls go out one VLAN at a time in ascending id order. When detaching
/// the native VLAN, it is cleared first.
pub async fn apply(ctx: &mut ReconcileContext<'_>, phase: BatchPhase) -> Result<(), CoreError> {
    let stage = phase.stage();
    let desired = ctx.desired_vlans(stage).await?;
    let diff = VlanDiff::compute(&ctx.port.attached_ids(), &desired);

    match phase {
        BatchPhase::DetachOnly => {
            if diff.to_detach.is_empty() {
                return Ok(());
            }
            if ctx
                .port
                .native_vlan
                .as_ref()
                .is_some_and(|n| diff.to_detach.contains(n))
            {
                clear_native(ctx, stage).await?;
            }
            for vlan in &diff.to_detach {
                detach(ctx, vlan, stage).await?;
            }
        }
        BatchPhase::AttachOnly => {
            for vlan in &diff.to_attach {
                attach(ctx, vlan, stage).await?;
            }
        }
    }
    Ok(())
}

async fn clear_native(ctx: &mut ReconcileContext<'_>, stage: Stage) -> Result<(), CoreError> {
    match ctx.service.set_native_vlan(&ctx.port.id, None).await {
        Ok(port) => {
            info!(port = %ctx.port.id, "cleared native VLAN before detaching it");
            ctx.port = port;
            Ok(())
        }
        Err(e) if ctx.best_effort && e.is_gone() => {
            ctx.warn(format!("could not clear native VLAN on {}: {e}", ctx.port.id));
            Ok(())
        }
        Err(e) => Err(CoreError::RemoteCallFailed { stage, source: e }),
    }
}

async fn detach(
    ctx: &mut ReconcileContext<'_>,
    vlan: &VlanId,
    stage: Stage,
) -> Result<(), CoreError> {
    match ctx.service.unassign_vlan(&ctx.port.id, vlan).await {
        Ok(port) => {
            info!(port = %ctx.port.id, %vlan, "detached VLAN");
            ctx.port = port;
            Ok(())
        }
        Err(e) if e.kind == ServiceErrorKind::NotAssigned => {
            debug!(port = %ctx.port.id, %vlan, "VLAN already detached");
            ctx.refresh_port(stage).await
        }
        Err(e) if ctx.best_effort && e.is_gone() => {
            ctx.warn(format!("could not detach VLAN {vlan} from {}: {e}", ctx.port.id));
            Ok(())
        }
        Err(e) => Err(CoreError::RemoteCallFailed { stage, source: e }),
    }
}

async fn attach(
    ctx: &mut ReconcileContext<'_>,
    vlan: &VlanId,
    stage: Stage,
) -> Result<(), CoreError> {
    match ctx.service.assign_vlan(&ctx.port.id, vlan).await {
        Ok(port) => {
            info!(port = %ctx.port.id, %vlan, "attached VLAN");
            ctx.port = port;
            Ok(())
        }
        Err(e) if e.kind == ServiceErrorKind::AlreadyAssigned => {
            debug!(port = %ctx.port.id, %vlan, "VLAN already attached");
            ctx.refresh_port(stage).await
        }
        Err(e) => Err(CoreError::RemoteCallFailed { stage, source: e }),
    }
}
