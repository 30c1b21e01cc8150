//! Wire types for the Metal API (`/metal/v1/`).
//!
//! The API speaks snake_case JSON, so fields map one-to-one; only the
//! `type` keyword needs a rename. Everything the API may omit depending on
//! `include=` expansion is `#[serde(default)]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── References ───────────────────────────────────────────────────────

/// A link to another resource, optionally expanded with its id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Href {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
}

impl Href {
    /// The referenced id: the explicit `id` when present, otherwise the
    /// last path segment of `href` (the API leaves `id` unset on some
    /// nested expansions).
    pub fn resolved_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.href.as_deref().and_then(last_segment))
    }
}

fn last_segment(href: &str) -> Option<&str> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

// ── Ports ────────────────────────────────────────────────────────────

/// Port — from `GET /ports/{id}` and every port action endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortResponse {
    pub id: String,
    /// `NetworkPort` or `NetworkBondPort`.
    #[serde(rename = "type")]
    pub port_type: String,
    pub name: String,
    /// One of `layer2-bonded`, `layer2-individual`, `layer3`, `hybrid`,
    /// `hybrid-bonded`. Only set on bond ports.
    #[serde(default)]
    pub network_type: Option<String>,
    #[serde(default)]
    pub data: PortData,
    #[serde(default)]
    pub disbond_operation_supported: bool,
    #[serde(default)]
    pub native_virtual_network: Option<VirtualNetworkResponse>,
    #[serde(default)]
    pub virtual_networks: Vec<VirtualNetworkResponse>,
    #[serde(default)]
    pub bond: Option<BondInfo>,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortData {
    #[serde(default)]
    pub bonded: bool,
    #[serde(default)]
    pub mac: Option<String>,
}

/// Bond group a physical port belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondInfo {
    pub id: String,
    pub name: String,
}

/// Address block requested when converting a port to layer3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRequest {
    pub address_family: u8,
    pub public: bool,
}

impl AddressRequest {
    /// Public IPv4, private IPv4, public IPv6: what a freshly provisioned
    /// layer3 port gets.
    pub const DEFAULT_LAYER3: [Self; 3] = [
        Self {
            address_family: 4,
            public: true,
        },
        Self {
            address_family: 4,
            public: false,
        },
        Self {
            address_family: 6,
            public: true,
        },
    ];
}

// ── Virtual networks ─────────────────────────────────────────────────

/// Virtual network (VLAN) — from `GET /virtual-networks/{id}`, project
/// listings, and port expansions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualNetworkResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub vxlan: Option<u16>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metro_code: Option<String>,
    #[serde(default)]
    pub facility_code: Option<String>,
    #[serde(default)]
    pub project: Option<Href>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Only present with `include=instances,instances.network_ports.virtual_networks`.
    #[serde(default)]
    pub instances: Vec<InstanceResponse>,
}

impl VirtualNetworkResponse {
    pub fn resolved_id(&self) -> Option<&str> {
        if self.id.is_empty() {
            self.href.as_deref().and_then(last_segment)
        } else {
            Some(&self.id)
        }
    }
}

/// Device carrying a virtual network, as expanded on the VLAN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceResponse {
    #[serde(default)]
    pub network_ports: Vec<NetworkPortResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPortResponse {
    pub id: String,
    #[serde(default)]
    pub virtual_networks: Vec<Href>,
}

/// `GET /projects/{id}/virtual-networks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualNetworkList {
    #[serde(default)]
    pub virtual_networks: Vec<VirtualNetworkResponse>,
}

/// `POST /projects/{id}/virtual-networks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualNetworkCreateRequest {
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metro: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vxlan: Option<u16>,
}
