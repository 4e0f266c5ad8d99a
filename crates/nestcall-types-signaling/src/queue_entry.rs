use nestcall_types_common::{CallKind, GroupId, MemberId, QueueId, Timestamp};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A FIFO placeholder for a user waiting for recording capacity (spec §3 "QueueEntry").
///
/// Ephemeral, in-memory only — never persisted via `CallStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueEntry {
    pub queue_id: QueueId,
    pub user_id: MemberId,
    pub group_id: GroupId,
    pub call_kind: CallKind,
    pub intended_participants: Vec<MemberId>,
    pub display_name: String,
    pub email: String,
    pub enqueued_at: Timestamp,
    /// 1-based position, recomputed on every admission/leave/sweep (spec §3 invariant
    /// "Queue positions are always 1..queueLen contiguous").
    pub position: usize,
}
