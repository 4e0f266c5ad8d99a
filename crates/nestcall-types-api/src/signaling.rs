use nestcall_types_signaling::{PeerId, SignalKind, SignalMessage};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `POST /groups/{gid}/calls/{cid}/signal` request body, and the recorder-signal
/// equivalent.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostSignalRequestBody {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub data: serde_json::Value,
    pub target_peer_id: Option<PeerId>,
}

/// `GET /groups/{gid}/calls/{cid}/signal` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GetSignalResponseBody {
    pub signals: Vec<SignalMessage>,
    pub peers: Vec<PeerId>,
    pub my_peer_id: PeerId,
}
