// ── Declared target state ──
//
// `PortDeclaration` is the loose, serde-shaped form a configuration file
// or CLI flags produce. `DesiredPortConfig` is the checked form the
// reconciler works with: VLAN membership is a tagged union, so asking
// for VLANs by id and by VXLAN tag at once cannot be expressed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::VlanId;
use super::port::Layer;
use crate::error::CoreError;

/// Desired VLAN membership, by VLAN id or by VXLAN tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VlanSelection {
    ById(BTreeSet<VlanId>),
    ByVxlan(BTreeSet<u16>),
}

impl Default for VlanSelection {
    fn default() -> Self {
        Self::ById(BTreeSet::new())
    }
}

impl VlanSelection {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::ById(ids) => ids.is_empty(),
            Self::ByVxlan(tags) => tags.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredPortConfig {
    pub bonded: bool,
    /// `None` leaves the layer as it is.
    pub layer: Option<Layer>,
    pub native_vlan: Option<VlanId>,
    pub vlans: VlanSelection,
    /// Only consulted when the port is released.
    pub reset_on_delete: bool,
}

impl DesiredPortConfig {
    /// Bonded, layer3, no VLANs and no native VLAN.
    pub fn factory_defaults() -> Self {
        Self {
            bonded: true,
            layer: Some(Layer::L3),
            native_vlan: None,
            vlans: VlanSelection::default(),
            reset_on_delete: false,
        }
    }
}

// ── Declaration ─────────────────────────────────────────────────────

/// A port declaration as read from a file or assembled from flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortDeclaration {
    pub bonded: bool,
    #[serde(default)]
    pub layer2: Option<bool>,
    #[serde(default)]
    pub native_vlan_id: Option<String>,
    #[serde(default)]
    pub vlan_ids: Vec<String>,
    #[serde(default)]
    pub vxlan_ids: Vec<u16>,
    #[serde(default)]
    pub reset_on_delete: bool,
}

impl TryFrom<PortDeclaration> for DesiredPortConfig {
    type Error = CoreError;

    fn try_from(decl: PortDeclaration) -> Result<Self, Self::Error> {
        let vlans = match (decl.vlan_ids.is_empty(), decl.vxlan_ids.is_empty()) {
            (false, false) => {
                return Err(CoreError::InvalidTransition {
                    reason: "vlan_ids and vxlan_ids cannot both be set".into(),
                });
            }
            (true, false) => VlanSelection::ByVxlan(decl.vxlan_ids.into_iter().collect()),
            _ => VlanSelection::ById(decl.vlan_ids.into_iter().map(VlanId::from).collect()),
        };

        Ok(Self {
            bonded: decl.bonded,
            layer: decl.layer2.map(|l2| if l2 { Layer::L2 } else { Layer::L3 }),
            native_vlan: decl
                .native_vlan_id
                .filter(|id| !id.is_empty())
                .map(VlanId::from),
            vlans,
            reset_on_delete: decl.reset_on_delete,
        })
    }
}
