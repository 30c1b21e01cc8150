// ── Pipeline stages ──

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

/// One step of the convergence pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    SanityChecks,
    DetachVlans,
    Disbond,
    #[serde(rename = "convert-to-layer2")]
    #[strum(serialize = "convert-to-layer2")]
    ConvertToLayer2,
    Bond,
    #[serde(rename = "convert-to-layer3")]
    #[strum(serialize = "convert-to-layer3")]
    ConvertToLayer3,
    AttachVlans,
    UpdateNativeVlan,
}

impl Stage {
    /// Full convergence order. Detaching comes before any mode or bond
    /// change and attaching after, so a layer switch never sees VLANs the
    /// target does not want.
    pub const CONVERGE: [Self; 8] = [
        Self::SanityChecks,
        Self::DetachVlans,
        Self::Disbond,
        Self::ConvertToLayer2,
        Self::Bond,
        Self::ConvertToLayer3,
        Self::AttachVlans,
        Self::UpdateNativeVlan,
    ];

    /// Restricted order used to return a port to factory defaults. Never
    /// attaches anything.
    pub const RESET: [Self; 3] = [Self::DetachVlans, Self::Bond, Self::ConvertToLayer3];
}
