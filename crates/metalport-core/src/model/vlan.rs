// ── Virtual network (VLAN) domain types ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::VlanId;

/// Where a VLAN lives. Metro VLANs span a metro area; facility VLANs are
/// the legacy single-datacenter kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "code")]
pub enum Location {
    Metro(String),
    Facility(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metro(code) => write!(f, "metro {code}"),
            Self::Facility(code) => write!(f, "facility {code}"),
        }
    }
}

/// A virtual network.
///
/// VLANs embedded in a port read carry only what the port expansion
/// returns, so everything but the id is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vlan {
    pub id: VlanId,
    pub vxlan: Option<u16>,
    pub project_id: Option<String>,
    pub location: Option<Location>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Vlan {
    pub fn metro(&self) -> Option<&str> {
        match &self.location {
            Some(Location::Metro(code)) => Some(code),
            _ => None,
        }
    }
}

/// The set of VLANs VXLAN tags are resolved against: a project's VLANs,
/// optionally narrowed to one metro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanScope {
    pub project_id: String,
    pub metro: Option<String>,
}

// ── Creation ────────────────────────────────────────────────────────

/// A VLAN creation request as a user supplies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVlan {
    pub project_id: String,
    pub description: Option<String>,
    pub metro: Option<String>,
    pub facility: Option<String>,
    pub vxlan: Option<u16>,
}

/// A validated VLAN creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanCreate {
    pub project_id: String,
    pub description: Option<String>,
    pub location: Location,
    pub vxlan: Option<u16>,
}

impl NewVlan {
    /// Exactly one of metro and facility must be set, a VXLAN tag may only
    /// be chosen for metro VLANs, and metro codes are lower-cased.
    pub fn validate(self) -> Result<VlanCreate, String> {
        let location = match (self.metro, self.facility) {
            (Some(metro), None) => Location::Metro(metro.to_lowercase()),
            (None, Some(facility)) => Location::Facility(facility),
            (Some(_), Some(_)) => {
                return Err("metro and facility are mutually exclusive".into());
            }
            (None, None) => return Err("one of metro or facility is required".into()),
        };
        if self.vxlan.is_some() && matches!(location, Location::Facility(_)) {
            return Err("a VXLAN tag can only be chosen for metro VLANs".into());
        }
        if self.project_id.is_empty() {
            return Err("project id is required".into());
        }
        Ok(VlanCreate {
            project_id: self.project_id,
            description: self.description,
            location,
            vxlan: self.vxlan,
        })
    }
}
