// ── Domain model ──
//
// Ports, VLANs and the declared target state, independent of the wire
// format the API uses for them.

pub mod desired;
pub mod ids;
pub mod port;
pub mod vlan;

// ── Re-exports ──────────────────────────────────────────────────────

pub use desired::{DesiredPortConfig, PortDeclaration, VlanSelection};
pub use ids::{MacAddress, PortId, VlanId};
pub use port::{BondRef, Layer, NetworkType, Port, PortState, PortType};
pub use vlan::{Location, NewVlan, Vlan, VlanCreate, VlanScope};
