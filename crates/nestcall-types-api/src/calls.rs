use nestcall_types_common::{CallKind, MemberId};
use nestcall_types_signaling::{Call, Participant};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `POST /groups/{gid}/calls` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostCallsRequestBody {
    pub kind: CallKind,
    pub invitees: Vec<MemberId>,
}

/// One call plus the participants invited to it, as returned by the history and
/// active-call listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CallResource {
    #[serde(flatten)]
    pub call: Call,
    pub participants: Vec<Participant>,
}

/// `GET /groups/{gid}/calls` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GetCallsResponseBody {
    pub calls: Vec<CallResource>,
    pub total: i64,
}

/// `GET /groups/{gid}/calls/active` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GetActiveCallsResponseBody {
    pub active: Vec<CallResource>,
    pub incoming: Vec<CallResource>,
}

/// The action a participant is taking in `PUT .../respond`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RespondAction {
    Accept,
    Reject,
}

/// `PUT /groups/{gid}/calls/{cid}/respond` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PutRespondRequestBody {
    pub action: RespondAction,
}
