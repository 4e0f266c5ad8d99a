use nestcall_types_common::{MemberId, Timestamp};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// The recording substate of a [`crate::Call`] (spec §4.7).
///
/// `None -> Recording -> Processing -> (Ready | Failed)`. `hidden` is an orthogonal
/// flag toggled by `CallCoordinator::hide_recording` once the recording is `Ready`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordingStatus {
    None,
    Recording,
    Processing,
    Ready,
    Failed,
}

/// The recording attached to a call, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recording {
    pub status: RecordingStatus,
    pub file_id: Option<String>,
    pub url: Option<String>,
    pub duration_ms: Option<i64>,
    pub size_bytes: Option<i64>,
    pub hidden: bool,
    pub hidden_by_id: Option<MemberId>,
    pub hidden_at: Option<Timestamp>,
}

impl Recording {
    /// The state every new call starts in: no recording has ever run.
    pub fn none() -> Self {
        Self {
            status: RecordingStatus::None,
            file_id: None,
            url: None,
            duration_ms: None,
            size_bytes: None,
            hidden: false,
            hidden_by_id: None,
            hidden_at: None,
        }
    }
}

impl Default for Recording {
    fn default() -> Self {
        Self::none()
    }
}
