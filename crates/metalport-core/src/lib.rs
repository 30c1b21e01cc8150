//! Port reconciliation engine for Equinix Metal.
//!
//! Given the declared bonding, layer mode, VLAN membership and native
//! VLAN of a server port, [`Reconciler`] reads the port, works out the
//! ordered remote calls that take it there, and issues them one stage at
//! a time. [`VlanManager`] covers the VLAN resources the ports attach to.
//!
//! All remote access goes through the [`PortService`] and [`VlanService`]
//! traits; [`MetalService`] implements both against the Metal API.

pub mod config;
pub mod context;
mod convert;
pub mod error;
pub mod model;
pub mod plan;
pub mod reconciler;
pub mod service;
pub mod snapshot;
pub mod stage;
pub mod transition;
pub mod vlan_batch;
pub mod vlans;

#[cfg(test)]
mod testing;

pub use config::{ClientConfig, TlsVerification};
pub use error::{CoreError, ErrorKind};
pub use model::{
    DesiredPortConfig, Layer, Location, NetworkType, NewVlan, Port, PortDeclaration, PortId,
    PortType, Vlan, VlanId, VlanScope, VlanSelection,
};
pub use plan::{Action, Plan, PlannedStep};
pub use reconciler::{ReconcileOptions, Reconciler, ResetReport};
pub use service::{MetalService, PortService, ServiceError, ServiceErrorKind, VlanService};
pub use snapshot::PortSnapshot;
pub use stage::Stage;
pub use vlans::VlanManager;
