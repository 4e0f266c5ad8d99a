use nestcall_types_common::{CallId, CallKind, GroupId, MemberId, Timestamp};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::Recording;

/// The lifecycle status of a [`Call`] (spec §3 invariant 1).
///
/// Transitions only ever move forward: `Ringing -> (Active | Missed) -> Ended`.
/// `Ended` and `Missed` are sinks — nothing transitions out of them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallStatus {
    Ringing,
    Active,
    Ended,
    Missed,
}

impl CallStatus {
    /// Whether no further transition out of this status is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Missed)
    }
}

/// A call between group members (spec §3 "Call").
///
/// Persisted via the injected `CallStore` capability; the core never owns a database
/// connection of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Call {
    pub id: CallId,
    pub group_id: GroupId,
    pub kind: CallKind,
    pub initiator_id: MemberId,
    pub status: CallStatus,
    pub started_at: Timestamp,
    pub connected_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub duration_ms: Option<i64>,
    pub recording: Recording,
}

impl Call {
    /// Compute `duration_ms` per spec §3 invariant 5: `endedAt - connectedAt` if the call
    /// ever connected, else `None`.
    pub fn compute_duration_ms(&self, ended_at: Timestamp) -> Option<i64> {
        self.connected_at
            .map(|connected_at| (ended_at - connected_at).num_milliseconds())
    }
}
