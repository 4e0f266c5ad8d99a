use nestcall_types_common::{CallId, MemberId, Timestamp};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// The lifecycle status of a [`Participant`] inside a call (spec §3 invariant 3).
///
/// Forward-only: `Invited -> (Accepted | Rejected) -> (Joined -> Left)` or directly
/// `-> Left`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParticipantStatus {
    Invited,
    Accepted,
    Rejected,
    Joined,
    Left,
}

impl ParticipantStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Left)
    }
}

/// A member's participation record within one call.
///
/// Keyed by `(call_id, member_id)`; the `CallStore` capability enforces the uniqueness.
/// Mutated only through `nestcall_call_core::ParticipantRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    pub call_id: CallId,
    pub member_id: MemberId,
    pub status: ParticipantStatus,
    pub invited_at: Timestamp,
    pub responded_at: Option<Timestamp>,
    pub joined_at: Option<Timestamp>,
    pub left_at: Option<Timestamp>,
}
