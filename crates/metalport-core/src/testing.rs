// In-memory port and VLAN service for unit tests.
//
// Models just enough of the API's behaviour for the pipeline: bonding
// flips network types between their bonded and individual forms, layer
// conversion picks the form matching the bond state, and VLAN
// assignment reports "already assigned" / "not assigned" conflicts.
// Every mutating call is recorded, including ones that fail.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{
    Layer, Location, NetworkType, Port, PortId, PortType, Vlan, VlanCreate, VlanId, VlanScope,
};
use crate::service::{PortService, ServiceError, ServiceErrorKind, VlanService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Assign(PortId, VlanId),
    Unassign(PortId, VlanId),
    Bond(PortId),
    Disbond(PortId),
    Convert(PortId, Layer),
    SetNative(PortId, Option<VlanId>),
    CreateVlan(VlanId),
    DeleteVlan(VlanId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CallKind {
    Assign,
    Unassign,
    Bond,
    Disbond,
    Convert,
    SetNative,
    DeleteVlan,
}

#[derive(Default)]
struct Inner {
    ports: BTreeMap<PortId, Port>,
    vlans: Vec<Vlan>,
    calls: Vec<Call>,
    reads: usize,
    fail_read: Option<ServiceErrorKind>,
    failures: HashMap<CallKind, ServiceErrorKind>,
    next_vlan: usize,
}

#[derive(Default)]
pub(crate) struct FakePorts {
    inner: Mutex<Inner>,
    delay: Mutex<Option<Duration>>,
}

impl FakePorts {
    pub(crate) fn with_ports(ports: impl IntoIterator<Item = Port>) -> Self {
        let fake = Self::default();
        {
            let mut inner = fake.inner.lock().unwrap();
            for port in ports {
                inner.ports.insert(port.id.clone(), port);
            }
        }
        fake
    }

    pub(crate) fn with_vlans(self, vlans: impl IntoIterator<Item = Vlan>) -> Self {
        self.inner.lock().unwrap().vlans.extend(vlans);
        self
    }

    pub(crate) fn port(&self, id: &str) -> Port {
        self.inner.lock().unwrap().ports[&PortId::from(id)].clone()
    }

    /// Change a port behind the reconciler's back.
    pub(crate) fn edit_port(&self, id: &str, edit: impl FnOnce(&mut Port)) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(port) = inner.ports.get_mut(&PortId::from(id)) {
            edit(port);
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub(crate) fn port_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::CreateVlan(_) | Call::DeleteVlan(_)))
            .collect()
    }

    pub(crate) fn reads(&self) -> usize {
        self.inner.lock().unwrap().reads
    }

    pub(crate) fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub(crate) fn fail_next_read(&self, kind: ServiceErrorKind) {
        self.inner.lock().unwrap().fail_read = Some(kind);
    }

    pub(crate) fn fail_on(&self, call: CallKind, kind: ServiceErrorKind) {
        self.inner.lock().unwrap().failures.insert(call, kind);
    }

    /// Make every mutating call take `delay` of (tokio) time.
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Record `call`, apply any injected failure, then run `mutate` on the port.
    fn mutate(
        &self,
        kind: CallKind,
        call: Call,
        port: &PortId,
        mutate: impl FnOnce(&mut Port, &[Vlan]) -> Result<(), ServiceError>,
    ) -> Result<Port, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if let Some(err) = inner.failures.get(&kind) {
            return Err(ServiceError::new(*err, format!("injected {kind:?} failure")));
        }
        let Inner { ports, vlans, .. } = &mut *inner;
        let entry = ports
            .get_mut(port)
            .ok_or_else(|| ServiceError::new(ServiceErrorKind::NotFound, "Not found"))?;
        mutate(entry, vlans)?;
        Ok(entry.clone())
    }
}

fn bonded_form(network_type: NetworkType) -> NetworkType {
    match network_type {
        NetworkType::Layer2Individual => NetworkType::Layer2Bonded,
        NetworkType::Hybrid => NetworkType::HybridBonded,
        other => other,
    }
}

fn individual_form(network_type: NetworkType) -> NetworkType {
    match network_type {
        NetworkType::Layer2Bonded => NetworkType::Layer2Individual,
        NetworkType::Layer3 | NetworkType::HybridBonded => NetworkType::Hybrid,
        other => other,
    }
}

#[async_trait]
impl PortService for FakePorts {
    async fn get_port(&self, port: &PortId) -> Result<Port, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.reads += 1;
        if let Some(kind) = inner.fail_read.take() {
            return Err(ServiceError::new(kind, "injected read failure"));
        }
        inner
            .ports
            .get(port)
            .cloned()
            .ok_or_else(|| ServiceError::new(ServiceErrorKind::NotFound, "Not found"))
    }

    async fn assign_vlan(&self, port: &PortId, vlan: &VlanId) -> Result<Port, ServiceError> {
        self.pause().await;
        self.mutate(
            CallKind::Assign,
            Call::Assign(port.clone(), vlan.clone()),
            port,
            |p, catalogue| {
                if p.has_vlan(vlan) {
                    return Err(ServiceError::new(
                        ServiceErrorKind::AlreadyAssigned,
                        format!("Virtual network {vlan} already assigned"),
                    ));
                }
                let known = catalogue.iter().find(|v| &v.id == vlan).cloned();
                p.vlans.push(known.unwrap_or_else(|| vlan_without_tag(vlan)));
                Ok(())
            },
        )
    }

    async fn unassign_vlan(&self, port: &PortId, vlan: &VlanId) -> Result<Port, ServiceError> {
        self.pause().await;
        self.mutate(
            CallKind::Unassign,
            Call::Unassign(port.clone(), vlan.clone()),
            port,
            |p, _| {
                if !p.has_vlan(vlan) {
                    return Err(ServiceError::new(
                        ServiceErrorKind::NotAssigned,
                        format!("Virtual network {vlan} not assigned"),
                    ));
                }
                if p.native_vlan.as_ref() == Some(vlan) {
                    return Err(ServiceError::new(
                        ServiceErrorKind::Other,
                        "cannot unassign the native virtual network",
                    ));
                }
                p.vlans.retain(|v| &v.id != vlan);
                Ok(())
            },
        )
    }

    async fn bond(&self, port: &PortId) -> Result<Port, ServiceError> {
        self.pause().await;
        self.mutate(CallKind::Bond, Call::Bond(port.clone()), port, |p, _| {
            p.bonded = true;
            p.network_type = p.network_type.map(bonded_form);
            Ok(())
        })
    }

    async fn disbond(&self, port: &PortId) -> Result<Port, ServiceError> {
        self.pause().await;
        self.mutate(CallKind::Disbond, Call::Disbond(port.clone()), port, |p, _| {
            p.bonded = false;
            p.network_type = p.network_type.map(individual_form);
            Ok(())
        })
    }

    async fn convert_mode(&self, port: &PortId, layer: Layer) -> Result<Port, ServiceError> {
        self.pause().await;
        self.mutate(
            CallKind::Convert,
            Call::Convert(port.clone(), layer),
            port,
            |p, _| {
                p.network_type = Some(match (layer, p.bonded) {
                    (Layer::L2, true) => NetworkType::Layer2Bonded,
                    (Layer::L2, false) => NetworkType::Layer2Individual,
                    (Layer::L3, true) => NetworkType::Layer3,
                    (Layer::L3, false) => NetworkType::Hybrid,
                });
                Ok(())
            },
        )
    }

    async fn set_native_vlan(
        &self,
        port: &PortId,
        vlan: Option<&VlanId>,
    ) -> Result<Port, ServiceError> {
        self.pause().await;
        self.mutate(
            CallKind::SetNative,
            Call::SetNative(port.clone(), vlan.cloned()),
            port,
            |p, _| {
                if let Some(vlan) = vlan {
                    if !p.has_vlan(vlan) {
                        return Err(ServiceError::new(
                            ServiceErrorKind::Other,
                            "native virtual network must be assigned first",
                        ));
                    }
                }
                p.native_vlan = vlan.cloned();
                Ok(())
            },
        )
    }

    async fn list_vlans(&self, scope: &VlanScope) -> Result<Vec<Vlan>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .vlans
            .iter()
            .filter(|v| v.project_id.as_deref() == Some(scope.project_id.as_str()))
            .filter(|v| scope.metro.is_none() || v.metro() == scope.metro.as_deref())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VlanService for FakePorts {
    async fn get_vlan(&self, vlan: &VlanId) -> Result<Vlan, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.reads += 1;
        if let Some(kind) = inner.fail_read.take() {
            return Err(ServiceError::new(kind, "injected read failure"));
        }
        inner
            .vlans
            .iter()
            .find(|v| &v.id == vlan)
            .cloned()
            .ok_or_else(|| ServiceError::new(ServiceErrorKind::NotFound, "Not found"))
    }

    async fn create_vlan(&self, request: &VlanCreate) -> Result<Vlan, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_vlan += 1;
        let vlan = Vlan {
            id: VlanId::from(format!("vlan-{}", inner.next_vlan)),
            vxlan: request
                .vxlan
                .or_else(|| u16::try_from(1000 + inner.next_vlan).ok()),
            project_id: Some(request.project_id.clone()),
            location: Some(request.location.clone()),
            description: request.description.clone(),
            created_at: None,
        };
        inner.calls.push(Call::CreateVlan(vlan.id.clone()));
        inner.vlans.push(vlan.clone());
        Ok(vlan)
    }

    async fn delete_vlan(&self, vlan: &VlanId) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::DeleteVlan(vlan.clone()));
        if let Some(kind) = inner.failures.get(&CallKind::DeleteVlan) {
            return Err(ServiceError::new(*kind, "injected delete failure"));
        }
        let before = inner.vlans.len();
        inner.vlans.retain(|v| &v.id != vlan);
        if inner.vlans.len() == before {
            return Err(ServiceError::new(ServiceErrorKind::NotFound, "Not found"));
        }
        Ok(())
    }

    async fn vlan_port_ids(&self, vlan: &VlanId) -> Result<Vec<PortId>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .ports
            .values()
            .filter(|p| p.has_vlan(vlan))
            .map(|p| p.id.clone())
            .collect())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn vlan_without_tag(id: &VlanId) -> Vlan {
    Vlan {
        id: id.clone(),
        vxlan: None,
        project_id: None,
        location: None,
        description: None,
        created_at: None,
    }
}

/// A metro VLAN in project `proj`, metro `sv`.
pub(crate) fn vlan(id: &str, vxlan: u16) -> Vlan {
    Vlan {
        id: VlanId::from(id),
        vxlan: Some(vxlan),
        project_id: Some("proj".into()),
        location: Some(Location::Metro("sv".into())),
        description: None,
        created_at: None,
    }
}

/// A bonded bond port with the given network type that supports disbonding.
pub(crate) fn bond_port(id: &str, network_type: NetworkType) -> Port {
    Port {
        id: PortId::from(id),
        name: "bond0".into(),
        port_type: PortType::Bond,
        network_type: Some(network_type),
        bonded: true,
        mac: None,
        disbond_supported: true,
        native_vlan: None,
        vlans: Vec::new(),
        bond: None,
    }
}

/// A bonded physical port with no network type of its own.
pub(crate) fn physical_port(id: &str) -> Port {
    Port {
        id: PortId::from(id),
        name: id.into(),
        port_type: PortType::Physical,
        network_type: None,
        bonded: true,
        mac: None,
        disbond_supported: false,
        native_vlan: None,
        vlans: Vec::new(),
        bond: None,
    }
}
