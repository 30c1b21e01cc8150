// ── Desired-state differ ──
//
// Dry run of the convergence pipeline: replays the transition
// predicates over a simulated `PortState` and records what each stage
// would do. An empty plan means the port has converged.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{DesiredPortConfig, Layer, PortId, PortState, VlanId};
use crate::stage::Stage;
use crate::transition::{
    NativeChange, native_change, needs_bond, needs_disbond, needs_layer2, needs_layer3,
};
use crate::vlan_batch::VlanDiff;

/// One remote call the pipeline would issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "action", content = "vlan")]
pub enum Action {
    ClearNativeVlan,
    DetachVlan(VlanId),
    Disbond,
    ConvertToLayer2,
    Bond,
    ConvertToLayer3,
    AttachVlan(VlanId),
    SetNativeVlan(VlanId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub stage: Stage,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub port: PortId,
    pub steps: Vec<PlannedStep>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.steps.iter().map(|s| &s.action)
    }
}

/// Compute the ordered steps that take `state` to `desired`.
///
/// `desired_vlans` is the desired membership with VXLAN tags already
/// resolved to VLAN ids.
pub fn diff(
    port: PortId,
    mut state: PortState,
    desired: &DesiredPortConfig,
    desired_vlans: &BTreeSet<VlanId>,
) -> Plan {
    let mut steps = Vec::new();
    let mut push = |stage, action| steps.push(PlannedStep { stage, action });

    let detach = VlanDiff::compute(&state.attached, desired_vlans).to_detach;
    if state.native.as_ref().is_some_and(|n| detach.contains(n)) {
        push(Stage::DetachVlans, Action::ClearNativeVlan);
        state.native = None;
    }
    for vlan in detach {
        state.attached.remove(&vlan);
        push(Stage::DetachVlans, Action::DetachVlan(vlan));
    }

    if needs_disbond(&state, desired) {
        push(Stage::Disbond, Action::Disbond);
        state.bonded = false;
    }
    if needs_layer2(&state, desired) {
        push(Stage::ConvertToLayer2, Action::ConvertToLayer2);
        state.layer = Some(Layer::L2);
    }
    if needs_bond(&state, desired) {
        push(Stage::Bond, Action::Bond);
        state.bonded = true;
    }
    if needs_layer3(&state, desired) {
        push(Stage::ConvertToLayer3, Action::ConvertToLayer3);
        state.layer = Some(Layer::L3);
    }

    let attach = VlanDiff::compute(&state.attached, desired_vlans).to_attach;
    for vlan in attach {
        state.attached.insert(vlan.clone());
        push(Stage::AttachVlans, Action::AttachVlan(vlan));
    }

    match native_change(&state, desired) {
        Some(NativeChange::Set(vlan)) => push(Stage::UpdateNativeVlan, Action::SetNativeVlan(vlan)),
        Some(NativeChange::Clear) => push(Stage::UpdateNativeVlan, Action::ClearNativeVlan),
        None => {}
    }

    Plan { port, steps }
}
