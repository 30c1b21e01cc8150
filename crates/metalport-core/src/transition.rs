// ── Mode transition engine ──
//
// Bonding and layer-mode changes. The predicates are pure functions of
// a `PortState` and the desired config; the planner replays them over a
// simulated state and the pipeline runs them against the live port.
// Each transition is a single remote call.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::context::ReconcileContext;
use crate::error::CoreError;
use crate::model::{DesiredPortConfig, Layer, Port, PortState, VlanId};
use crate::stage::Stage;

// ── Predicates ──────────────────────────────────────────────────────

pub fn needs_disbond(state: &PortState, desired: &DesiredPortConfig) -> bool {
    state.bonded && !desired.bonded
}

pub fn needs_bond(state: &PortState, desired: &DesiredPortConfig) -> bool {
    !state.bonded && desired.bonded
}

/// Only ports that report a layer can switch layers.
pub fn needs_layer2(state: &PortState, desired: &DesiredPortConfig) -> bool {
    desired.layer == Some(Layer::L2) && state.layer == Some(Layer::L3)
}

pub fn needs_layer3(state: &PortState, desired: &DesiredPortConfig) -> bool {
    desired.layer == Some(Layer::L3) && state.layer == Some(Layer::L2)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "op", content = "vlan")]
pub enum NativeChange {
    Set(VlanId),
    Clear,
}

pub fn native_change(state: &PortState, desired: &DesiredPortConfig) -> Option<NativeChange> {
    match (&state.native, &desired.native_vlan) {
        (current, Some(wanted)) if current.as_ref() != Some(wanted) => {
            Some(NativeChange::Set(wanted.clone()))
        }
        (Some(_), None) => Some(NativeChange::Clear),
        _ => None,
    }
}

/// Pre-flight validation of a desired config against the observed port.
pub fn sanity_check(
    port: &Port,
    desired: &DesiredPortConfig,
    desired_vlans: &BTreeSet<VlanId>,
) -> Result<(), CoreError> {
    if desired.layer.is_some() && !port.is_bond_port() {
        return Err(CoreError::invalid(format!(
            "layer can only be set on bond ports; {} is a {}",
            port.name, port.port_type
        )));
    }

    if !desired.bonded && !port.disbond_supported {
        if port.bonded {
            return Err(CoreError::invalid(format!(
                "port {} is bonded and does not support disbonding",
                port.name
            )));
        }
        if desired.layer == Some(Layer::L2) {
            return Err(CoreError::invalid(format!(
                "layer2 without bonding needs disbond support, which port {} lacks",
                port.name
            )));
        }
    }

    if let Some(native) = &desired.native_vlan {
        if !desired_vlans.contains(native) {
            return Err(CoreError::invalid(format!(
                "native VLAN {native} is not among the port's VLANs"
            )));
        }
    }

    Ok(())
}

// ── Transitions ─────────────────────────────────────────────────────

pub async fn sanity_checks(ctx: &mut ReconcileContext<'_>) -> Result<(), CoreError> {
    let desired_vlans = ctx.desired_vlans(Stage::SanityChecks).await?;
    sanity_check(&ctx.port, &ctx.desired, &desired_vlans)
}

pub async fn make_disbond(ctx: &mut ReconcileContext<'_>) -> Result<(), CoreError> {
    const STAGE: Stage = Stage::Disbond;
    if !needs_disbond(&ctx.state(), &ctx.desired) {
        return Ok(());
    }
    if !ctx.port.disbond_supported {
        return Err(CoreError::invalid(format!(
            "port {} does not support disbonding",
            ctx.port.name
        )));
    }

    ctx.service
        .disbond(&ctx.port.id)
        .await
        .map_err(CoreError::remote(STAGE))?;
    info!(port = %ctx.port.id, "disbonded");
    ctx.refresh(STAGE).await
}

pub async fn make_bond(ctx: &mut ReconcileContext<'_>) -> Result<(), CoreError> {
    const STAGE: Stage = Stage::Bond;
    if !needs_bond(&ctx.state(), &ctx.desired) {
        return Ok(());
    }
    if let Some(peer) = ctx.peer.as_ref().filter(|p| !p.vlans.is_empty()) {
        return Err(CoreError::invalid(format!(
            "bond peer {} still carries {} VLAN(s)",
            peer.name,
            peer.vlans.len()
        )));
    }

    ctx.service
        .bond(&ctx.port.id)
        .await
        .map_err(CoreError::remote(STAGE))?;
    info!(port = %ctx.port.id, "bonded");
    ctx.refresh(STAGE).await
}

pub async fn convert_to_layer2(ctx: &mut ReconcileContext<'_>) -> Result<(), CoreError> {
    if !needs_layer2(&ctx.state(), &ctx.desired) {
        return Ok(());
    }
    convert(ctx, Layer::L2, Stage::ConvertToLayer2).await
}

pub async fn convert_to_layer3(ctx: &mut ReconcileContext<'_>) -> Result<(), CoreError> {
    if !needs_layer3(&ctx.state(), &ctx.desired) {
        return Ok(());
    }
    convert(ctx, Layer::L3, Stage::ConvertToLayer3).await
}

async fn convert(
    ctx: &mut ReconcileContext<'_>,
    layer: Layer,
    stage: Stage,
) -> Result<(), CoreError> {
    let desired = ctx.desired_vlans(stage).await?;
    let extra: Vec<String> = ctx
        .port
        .attached_ids()
        .difference(&desired)
        .map(ToString::to_string)
        .collect();
    if !extra.is_empty() {
        return Err(CoreError::invalid(format!(
            "cannot switch {} to {layer} while it carries undeclared VLANs: {}",
            ctx.port.name,
            extra.join(", ")
        )));
    }

    ctx.port = ctx
        .service
        .convert_mode(&ctx.port.id, layer)
        .await
        .map_err(CoreError::remote(stage))?;
    info!(port = %ctx.port.id, %layer, "converted");
    Ok(())
}

pub async fn update_native_vlan(ctx: &mut ReconcileContext<'_>) -> Result<(), CoreError> {
    const STAGE: Stage = Stage::UpdateNativeVlan;
    let Some(change) = native_change(&ctx.state(), &ctx.desired) else {
        return Ok(());
    };

    let vlan = match &change {
        NativeChange::Set(vlan) => {
            if !ctx.port.has_vlan(vlan) {
                return Err(CoreError::invalid(format!(
                    "native VLAN {vlan} is not attached to {}",
                    ctx.port.name
                )));
            }
            Some(vlan)
        }
        NativeChange::Clear => None,
    };

    ctx.port = ctx
        .service
        .set_native_vlan(&ctx.port.id, vlan)
        .await
        .map_err(CoreError::remote(STAGE))?;
    info!(port = %ctx.port.id, ?change, "updated native VLAN");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{BondRef, NetworkType, PortId, VlanSelection};
    use crate::snapshot;
    use crate::testing::{Call, FakePorts, bond_port, physical_port, vlan};

    fn desired(bonded: bool, layer: Option<Layer>) -> DesiredPortConfig {
        DesiredPortConfig {
            bonded,
            layer,
            native_vlan: None,
            vlans: VlanSelection::default(),
            reset_on_delete: false,
        }
    }

    fn state(bonded: bool, layer: Option<Layer>) -> PortState {
        PortState {
            bonded,
            layer,
            ..PortState::default()
        }
    }

    fn set(raw: &[&str]) -> BTreeSet<VlanId> {
        raw.iter().map(|s| VlanId::from(*s)).collect()
    }

    #[test]
    fn predicates_only_fire_on_a_difference() {
        let l2 = Some(Layer::L2);
        let l3 = Some(Layer::L3);

        assert!(needs_disbond(&state(true, l3), &desired(false, None)));
        assert!(!needs_disbond(&state(false, l3), &desired(false, None)));
        assert!(needs_bond(&state(false, l3), &desired(true, None)));
        assert!(!needs_bond(&state(true, l3), &desired(true, None)));

        assert!(needs_layer2(&state(true, l3), &desired(true, l2)));
        assert!(!needs_layer2(&state(true, l2), &desired(true, l2)));
        assert!(!needs_layer2(&state(true, None), &desired(true, l2)));
        assert!(needs_layer3(&state(true, l2), &desired(true, l3)));
        assert!(!needs_layer3(&state(true, l3), &desired(true, None)));
    }

    #[test]
    fn native_change_sets_and_clears() {
        let mut want = desired(true, None);
        let mut have = state(true, None);
        assert_eq!(native_change(&have, &want), None);

        want.native_vlan = Some(VlanId::from("v1"));
        assert_eq!(
            native_change(&have, &want),
            Some(NativeChange::Set(VlanId::from("v1")))
        );

        have.native = Some(VlanId::from("v1"));
        assert_eq!(native_change(&have, &want), None);

        want.native_vlan = None;
        assert_eq!(native_change(&have, &want), Some(NativeChange::Clear));
    }

    #[test]
    fn sanity_rejects_layer_on_physical_ports() {
        let err = sanity_check(
            &physical_port("eth1"),
            &desired(true, Some(Layer::L3)),
            &set(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn sanity_rejects_unbonding_without_disbond_support() {
        let mut port = bond_port("p1", NetworkType::Layer3);
        port.disbond_supported = false;
        assert!(sanity_check(&port, &desired(false, None), &set(&[])).is_err());

        port.bonded = false;
        assert!(sanity_check(&port, &desired(false, Some(Layer::L2)), &set(&[])).is_err());
        assert!(sanity_check(&port, &desired(false, Some(Layer::L3)), &set(&[])).is_ok());
    }

    #[test]
    fn sanity_rejects_native_outside_the_desired_set() {
        let port = bond_port("p1", NetworkType::HybridBonded);
        let mut want = desired(true, None);
        want.native_vlan = Some(VlanId::from("v9"));
        assert!(sanity_check(&port, &want, &set(&["v1"])).is_err());
        assert!(sanity_check(&port, &want, &set(&["v1", "v9"])).is_ok());
    }

    #[tokio::test]
    async fn disbond_refuses_without_support_and_issues_no_call() {
        let mut port = bond_port("p1", NetworkType::Layer3);
        port.disbond_supported = false;
        let fake = FakePorts::with_ports([port]);
        let snap = snapshot::fetch(&fake, &PortId::from("p1")).await.unwrap();
        let mut ctx = ReconcileContext::new(&fake, snap, desired(false, None), None);

        assert!(make_disbond(&mut ctx).await.is_err());
        assert!(fake.port_calls().is_empty());
    }

    #[tokio::test]
    async fn layer_switch_requires_membership_within_the_desired_set() {
        let mut port = bond_port("p1", NetworkType::Layer3);
        port.vlans = vec![vlan("v1", 1001)];
        let fake = FakePorts::with_ports([port]);
        let snap = snapshot::fetch(&fake, &PortId::from("p1")).await.unwrap();
        let mut ctx = ReconcileContext::new(&fake, snap, desired(true, Some(Layer::L2)), None);

        let err = convert_to_layer2(&mut ctx).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert!(fake.port_calls().is_empty());
    }

    #[tokio::test]
    async fn bond_waits_for_a_clean_peer() {
        let mut eth1 = physical_port("eth1");
        eth1.bonded = false;
        eth1.bond = Some(BondRef {
            id: PortId::from("bond0"),
            name: "bond0".into(),
        });
        let mut bond0 = bond_port("bond0", NetworkType::HybridBonded);
        bond0.vlans = vec![vlan("v1", 1001)];
        let fake = FakePorts::with_ports([eth1, bond0]);
        let snap = snapshot::fetch(&fake, &PortId::from("eth1")).await.unwrap();
        let mut ctx = ReconcileContext::new(&fake, snap, desired(true, None), None);

        assert!(make_bond(&mut ctx).await.is_err());
        assert!(fake.port_calls().is_empty());

        fake.edit_port("bond0", |p| p.vlans.clear());
        ctx.refresh(Stage::Bond).await.unwrap();
        make_bond(&mut ctx).await.unwrap();
        assert_eq!(fake.port_calls(), vec![Call::Bond(PortId::from("eth1"))]);
        assert!(ctx.port.bonded);
    }
}
