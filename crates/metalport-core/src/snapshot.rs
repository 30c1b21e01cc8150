// ── Port snapshot fetcher ──
//
// Reads the observed state of a port and, when it belongs to a bond
// group, of the other port named by its bond reference. Read-only.

use tracing::debug;

use crate::error::CoreError;
use crate::model::{Port, PortId};
use crate::service::PortService;
use crate::stage::Stage;

/// A port and its bond peer, read together.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSnapshot {
    pub port: Port,
    pub peer: Option<Port>,
}

/// Read `port_id` and its bond peer.
///
/// A missing port is `NotFound`, an inaccessible one `Forbidden`. A port
/// without a bond reference, or whose peer has vanished, has no peer.
pub async fn fetch(service: &dyn PortService, port_id: &PortId) -> Result<PortSnapshot, CoreError> {
    fetch_at(service, port_id, Stage::SanityChecks).await
}

/// As [`fetch`], attributing unexpected failures to `stage`.
pub(crate) async fn fetch_at(
    service: &dyn PortService,
    port_id: &PortId,
    stage: Stage,
) -> Result<PortSnapshot, CoreError> {
    let port = service
        .get_port(port_id)
        .await
        .map_err(|e| CoreError::from_read("port", port_id.as_str(), stage, e))?;
    let peer = fetch_peer(service, &port, stage).await?;
    Ok(PortSnapshot { port, peer })
}

async fn fetch_peer(
    service: &dyn PortService,
    port: &Port,
    stage: Stage,
) -> Result<Option<Port>, CoreError> {
    let Some(bond) = port.bond.as_ref().filter(|b| b.id != port.id) else {
        return Ok(None);
    };

    match service.get_port(&bond.id).await {
        Ok(peer) => Ok(Some(peer)),
        Err(e) if e.is_gone() => {
            debug!(port = %port.id, peer = %bond.id, "bond peer not readable: {e}");
            Ok(None)
        }
        Err(e) => Err(CoreError::RemoteCallFailed { stage, source: e }),
    }
}
