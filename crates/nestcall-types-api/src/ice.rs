use serde::Serialize;
use utoipa::ToSchema;

/// One entry of the `RTCIceServer` dictionary clients feed into their
/// `RTCPeerConnection` constructor.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// `GET /groups/{gid}/calls/{cid}/ice-servers` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GetIceServersResponseBody {
    pub ice_servers: Vec<IceServer>,
}
