use nestcall_types_common::CallKind;
use nestcall_types_signaling::Recording;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::queue::QueueWaitInfo;

/// `POST /groups/{gid}/calls/{cid}/start-recording` response body.
#[derive(Debug, Clone, serde::Serialize, ToSchema)]
pub struct PostStartRecordingResponseBody {
    pub needs_queue: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueWaitInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording: Option<Recording>,
}

/// `POST /groups/{gid}/calls/{cid}/stop-recording` and
/// `GET /groups/{gid}/calls/{cid}/recording-status` response body.
#[derive(Debug, Clone, serde::Serialize, ToSchema)]
pub struct RecordingStatusResponseBody {
    pub recording: Recording,
}

/// `POST /groups/{gid}/calls/{cid}/recording` query parameters. The artifact bytes and
/// filename arrive as multipart form fields handled directly by the actix route.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct PostRecordingIngestQuery {
    pub kind: CallKind,
    pub original_mime_type: String,
}
