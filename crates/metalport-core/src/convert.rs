// ── API-to-domain type conversions ──
//
// Bridges raw `metalport_api` response types into `metalport_core::model`
// types. Unknown network types are dropped rather than rejected; a port
// that reports one simply has no known layer.

use metalport_api::types::{PortResponse, VirtualNetworkResponse};

use crate::model::{BondRef, Location, MacAddress, Port, PortId, PortType, Vlan, VlanId};

impl From<VirtualNetworkResponse> for Vlan {
    fn from(vn: VirtualNetworkResponse) -> Self {
        let id = vn.resolved_id().unwrap_or_default().to_owned();
        let location = match (vn.metro_code, vn.facility_code) {
            (Some(metro), _) if !metro.is_empty() => Some(Location::Metro(metro)),
            (_, Some(facility)) if !facility.is_empty() => Some(Location::Facility(facility)),
            _ => None,
        };
        Self {
            id: VlanId::from(id),
            vxlan: vn.vxlan,
            project_id: vn
                .project
                .as_ref()
                .and_then(|p| p.resolved_id())
                .map(str::to_owned),
            location,
            description: vn.description.filter(|d| !d.is_empty()),
            created_at: vn.created_at,
        }
    }
}

impl From<PortResponse> for Port {
    fn from(p: PortResponse) -> Self {
        let port_type = if p.port_type == "NetworkBondPort" {
            PortType::Bond
        } else {
            PortType::Physical
        };
        Self {
            id: PortId::from(p.id),
            name: p.name,
            port_type,
            network_type: p.network_type.as_deref().and_then(|t| t.parse().ok()),
            bonded: p.data.bonded,
            mac: p.data.mac.as_deref().map(MacAddress::new),
            disbond_supported: p.disbond_operation_supported,
            native_vlan: p
                .native_virtual_network
                .as_ref()
                .and_then(VirtualNetworkResponse::resolved_id)
                .map(VlanId::from),
            vlans: p.virtual_networks.into_iter().map(Vlan::from).collect(),
            bond: p.bond.map(|b| BondRef {
                id: PortId::from(b.id),
                name: b.name,
            }),
        }
    }
}

/// Ports that carry `vlan`, from a VLAN read with its instances expanded.
pub(crate) fn ports_carrying(vn: &VirtualNetworkResponse, vlan: &VlanId) -> Vec<PortId> {
    let mut ports: Vec<PortId> = vn
        .instances
        .iter()
        .flat_map(|instance| &instance.network_ports)
        .filter(|port| {
            port.virtual_networks
                .iter()
                .any(|attached| attached.resolved_id() == Some(vlan.as_str()))
        })
        .map(|port| PortId::from(port.id.as_str()))
        .collect();
    ports.sort();
    ports.dedup();
    ports
}

#[cfg(test)]
mod tests {
    use metalport_api::types::{Href, InstanceResponse, NetworkPortResponse, PortData};

    use super::*;
    use crate::model::{Layer, NetworkType};

    #[test]
    fn port_response_maps_to_domain() {
        let resp = PortResponse {
            id: "p1".into(),
            port_type: "NetworkBondPort".into(),
            name: "bond0".into(),
            network_type: Some("hybrid-bonded".into()),
            data: PortData {
                bonded: true,
                mac: Some("AA:BB:CC:DD:EE:FF".into()),
            },
            disbond_operation_supported: true,
            native_virtual_network: Some(VirtualNetworkResponse {
                href: Some("/metal/v1/virtual-networks/v1".into()),
                ..VirtualNetworkResponse::default()
            }),
            virtual_networks: vec![VirtualNetworkResponse {
                id: "v1".into(),
                vxlan: Some(1000),
                metro_code: Some("sv".into()),
                ..VirtualNetworkResponse::default()
            }],
            bond: None,
            href: None,
        };

        let port = Port::from(resp);

        assert_eq!(port.port_type, PortType::Bond);
        assert_eq!(port.network_type, Some(NetworkType::HybridBonded));
        assert_eq!(port.layer(), Some(Layer::L3));
        assert_eq!(port.native_vlan, Some(VlanId::from("v1")));
        assert_eq!(port.mac.as_ref().map(MacAddress::as_str), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(port.vlans[0].metro(), Some("sv"));
    }

    #[test]
    fn unknown_network_type_has_no_layer() {
        let resp = PortResponse {
            id: "p2".into(),
            port_type: "NetworkPort".into(),
            name: "eth1".into(),
            network_type: Some("something-new".into()),
            data: PortData::default(),
            disbond_operation_supported: false,
            native_virtual_network: None,
            virtual_networks: vec![],
            bond: None,
            href: None,
        };
        let port = Port::from(resp);
        assert_eq!(port.port_type, PortType::Physical);
        assert!(port.layer().is_none());
    }

    #[test]
    fn ports_carrying_matches_by_href() {
        let vlan = VlanId::from("v1");
        let vn = VirtualNetworkResponse {
            id: "v1".into(),
            instances: vec![InstanceResponse {
                network_ports: vec![
                    NetworkPortResponse {
                        id: "p2".into(),
                        virtual_networks: vec![Href {
                            id: None,
                            href: Some("/metal/v1/virtual-networks/v1".into()),
                        }],
                    },
                    NetworkPortResponse {
                        id: "p1".into(),
                        virtual_networks: vec![Href {
                            id: None,
                            href: Some("/metal/v1/virtual-networks/v9".into()),
                        }],
                    },
                ],
            }],
            ..VirtualNetworkResponse::default()
        };

        assert_eq!(ports_carrying(&vn, &vlan), vec![PortId::from("p2")]);
    }
}
