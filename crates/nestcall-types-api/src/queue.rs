use nestcall_types_common::{CallKind, GroupId, MemberId, QueueId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The wait-state fields present whenever a call could not start immediately
/// (spec §4.6 `admit`).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueWaitInfo {
    pub queue_id: QueueId,
    pub position: usize,
    pub total_in_queue: usize,
    pub estimated_wait_minutes: i64,
}

/// The outcome of `RecordingQueue::admit`: either capacity was free (`needs_queue:
/// false`) or the caller now holds a queue entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdmitOutcome {
    pub needs_queue: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueWaitInfo>,
}

impl AdmitOutcome {
    pub fn bypass() -> Self {
        Self {
            needs_queue: false,
            queue: None,
        }
    }

    pub fn queued(info: QueueWaitInfo) -> Self {
        Self {
            needs_queue: true,
            queue: Some(info),
        }
    }
}

/// `GET /recording-queue/status` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GetQueueStatusResponseBody {
    pub active: usize,
    pub max: usize,
    pub queue_len: usize,
    pub available_slots: usize,
    pub at_capacity: bool,
}

/// `POST /recording-queue/join` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostQueueJoinRequestBody {
    pub group_id: GroupId,
    pub call_kind: CallKind,
    pub intended_participants: Vec<MemberId>,
}

/// `POST /recording-queue/leave` request body — leave by id, or by `(user, kind)` when
/// the caller never learned their `queueId`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostQueueLeaveRequestBody {
    pub queue_id: Option<QueueId>,
    pub call_kind: Option<CallKind>,
}

/// `GET /recording-queue/position/{qid}` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GetQueuePositionResponseBody {
    pub entry: Option<QueueWaitInfo>,
}

/// `GET /recording-queue/check-turn/{qid}` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GetCheckTurnResponseBody {
    pub is_your_turn: bool,
}
