// ── Port domain type ──
//
// A port as observed on the remote service, plus the `PortState`
// projection the transition predicates work on.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{MacAddress, PortId, VlanId};
use super::vlan::Vlan;

/// Forwarding layer of a bond port.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Layer {
    #[serde(rename = "layer2")]
    #[strum(to_string = "layer2", serialize = "l2")]
    L2,
    #[serde(rename = "layer3")]
    #[strum(to_string = "layer3", serialize = "l3")]
    L3,
}

/// Network type reported for bond ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum NetworkType {
    #[serde(rename = "layer2-bonded")]
    #[strum(serialize = "layer2-bonded")]
    Layer2Bonded,
    #[serde(rename = "layer2-individual")]
    #[strum(serialize = "layer2-individual")]
    Layer2Individual,
    #[serde(rename = "layer3")]
    #[strum(serialize = "layer3")]
    Layer3,
    #[serde(rename = "hybrid")]
    #[strum(serialize = "hybrid")]
    Hybrid,
    #[serde(rename = "hybrid-bonded")]
    #[strum(serialize = "hybrid-bonded")]
    HybridBonded,
}

impl NetworkType {
    pub fn layer(self) -> Layer {
        match self {
            Self::Layer2Bonded | Self::Layer2Individual => Layer::L2,
            Self::Layer3 | Self::Hybrid | Self::HybridBonded => Layer::L3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum PortType {
    /// A single physical interface (`NetworkPort`).
    #[serde(rename = "NetworkPort")]
    #[strum(serialize = "NetworkPort")]
    Physical,
    /// The logical bond interface (`NetworkBondPort`).
    #[serde(rename = "NetworkBondPort")]
    #[strum(serialize = "NetworkBondPort")]
    Bond,
}

/// Bond group a port belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondRef {
    pub id: PortId,
    pub name: String,
}

/// A network port and its current VLAN membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub port_type: PortType,
    /// Only present on bond ports.
    pub network_type: Option<NetworkType>,
    pub bonded: bool,
    pub mac: Option<MacAddress>,
    pub disbond_supported: bool,
    pub native_vlan: Option<VlanId>,
    pub vlans: Vec<Vlan>,
    pub bond: Option<BondRef>,
}

impl Port {
    pub fn is_bond_port(&self) -> bool {
        self.port_type == PortType::Bond
    }

    pub fn layer(&self) -> Option<Layer> {
        self.network_type.map(NetworkType::layer)
    }

    /// `Some(true)` for layer2 network types, `Some(false)` for layer3 and
    /// hybrid types, `None` when the port reports no network type.
    pub fn layer2_flag(&self) -> Option<bool> {
        self.layer().map(|l| l == Layer::L2)
    }

    pub fn attached_ids(&self) -> BTreeSet<VlanId> {
        self.vlans.iter().map(|v| v.id.clone()).collect()
    }

    /// VXLAN tags of the attached VLANs, where the API reported them.
    pub fn attached_vxlans(&self) -> BTreeSet<u16> {
        self.vlans.iter().filter_map(|v| v.vxlan).collect()
    }

    pub fn has_vlan(&self, vlan: &VlanId) -> bool {
        self.vlans.iter().any(|v| &v.id == vlan)
    }

    pub fn state(&self) -> PortState {
        PortState {
            bonded: self.bonded,
            layer: self.layer(),
            attached: self.attached_ids(),
            native: self.native_vlan.clone(),
        }
    }
}

// ── PortState ───────────────────────────────────────────────────────

/// The parts of a port that reconciliation changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortState {
    pub bonded: bool,
    pub layer: Option<Layer>,
    pub attached: BTreeSet<VlanId>,
    pub native: Option<VlanId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(network_type: Option<NetworkType>) -> Port {
        Port {
            id: PortId::from("p1"),
            name: "bond0".into(),
            port_type: PortType::Bond,
            network_type,
            bonded: true,
            mac: None,
            disbond_supported: true,
            native_vlan: None,
            vlans: Vec::new(),
            bond: None,
        }
    }

    #[test]
    fn layer2_flag_follows_network_type() {
        assert_eq!(port(Some(NetworkType::Layer2Bonded)).layer2_flag(), Some(true));
        assert_eq!(port(Some(NetworkType::Layer2Individual)).layer2_flag(), Some(true));
        assert_eq!(port(Some(NetworkType::Layer3)).layer2_flag(), Some(false));
        assert_eq!(port(Some(NetworkType::Hybrid)).layer2_flag(), Some(false));
        assert_eq!(port(Some(NetworkType::HybridBonded)).layer2_flag(), Some(false));
        assert_eq!(port(None).layer2_flag(), None);
    }

    #[test]
    fn network_type_round_trips_through_strings() {
        let parsed: NetworkType = "hybrid-bonded".parse().unwrap_or(NetworkType::Layer3);
        assert_eq!(parsed, NetworkType::HybridBonded);
        assert_eq!(NetworkType::Layer2Individual.to_string(), "layer2-individual");
        assert_eq!(Layer::L3.to_string(), "layer3");
    }
}
