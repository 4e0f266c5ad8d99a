use nestcall_types_common::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::PeerId;

/// The kind of WebRTC handshake message being relayed (spec §3 "SignalMessage").
///
/// The core never parses `data` — it is opaque transport payload handed back to the
/// browser's RTCPeerConnection verbatim.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// One relayed signaling message, queued in a peer's mailbox until drained or swept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignalMessage {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub data: serde_json::Value,
    pub from_peer_id: PeerId,
    pub timestamp: Timestamp,
}
