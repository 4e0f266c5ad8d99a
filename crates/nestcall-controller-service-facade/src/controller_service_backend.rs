use async_trait::async_trait;
use nestcall_signaling_core::{AuthContext, RecordingArtifact};
use nestcall_types_api::calls::{CallResource, GetActiveCallsResponseBody, GetCallsResponseBody};
use nestcall_types_api::error::ApiError;
use nestcall_types_api::ice::GetIceServersResponseBody;
use nestcall_types_api::pagination::PageQuery;
use nestcall_types_api::queue::{
    AdmitOutcome, GetCheckTurnResponseBody, GetQueuePositionResponseBody, GetQueueStatusResponseBody,
};
use nestcall_types_api::recording::{PostStartRecordingResponseBody, RecordingStatusResponseBody};
use nestcall_types_api::signaling::GetSignalResponseBody;
use nestcall_types_common::{CallId, CallKind, GroupId, MemberId, QueueId};
use nestcall_types_signaling::{PeerId, SignalKind, SignalMessage};

/// One method per route in the HTTP surface (spec §6), decoupling the routing layer
/// in `nestcall-controller-core` from the concrete wiring of `CallCoordinator`,
/// `RecorderCoordinator`, `RecordingQueue`, and `RecordingIngest`.
#[async_trait(?Send)]
pub trait CallServiceBackend: Send + Sync {
    /// `GET /groups/{gid}/calls`.
    async fn list_calls(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        page: PageQuery,
    ) -> Result<GetCallsResponseBody, ApiError>;

    /// `GET /groups/{gid}/calls/active`.
    async fn list_active_calls(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
    ) -> Result<GetActiveCallsResponseBody, ApiError>;

    /// `POST /groups/{gid}/calls`.
    async fn initiate_call(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        kind: CallKind,
        invitees: Vec<MemberId>,
    ) -> Result<CallResource, ApiError>;

    /// `PUT /groups/{gid}/calls/{cid}/respond`.
    async fn respond_to_call(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        accept: bool,
    ) -> Result<CallResource, ApiError>;

    /// `PUT /groups/{gid}/calls/{cid}/leave`.
    async fn leave_call(&self, auth: &AuthContext, call_id: CallId) -> Result<CallResource, ApiError>;

    /// `PUT /groups/{gid}/calls/{cid}/end`.
    async fn end_call(&self, auth: &AuthContext, call_id: CallId) -> Result<CallResource, ApiError>;

    /// `PUT /groups/{gid}/calls/{cid}/hide-recording`.
    async fn hide_recording(&self, auth: &AuthContext, call_id: CallId) -> Result<CallResource, ApiError>;

    /// `POST /groups/{gid}/calls/{cid}/signal`.
    async fn deposit_signal(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: SignalKind,
        data: serde_json::Value,
        target: Option<PeerId>,
    ) -> Result<(), ApiError>;

    /// `GET /groups/{gid}/calls/{cid}/signal`.
    async fn drain_signals(&self, auth: &AuthContext, call_id: CallId) -> Result<GetSignalResponseBody, ApiError>;

    /// `GET /groups/{gid}/calls/{cid}/ice-servers`.
    async fn ice_servers(&self) -> GetIceServersResponseBody;

    /// `POST /groups/{gid}/calls/{cid}/start-recording`.
    async fn start_recording(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: CallKind,
    ) -> Result<PostStartRecordingResponseBody, ApiError>;

    /// `POST /groups/{gid}/calls/{cid}/stop-recording`.
    async fn stop_recording(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: CallKind,
    ) -> Result<RecordingStatusResponseBody, ApiError>;

    /// `GET /groups/{gid}/calls/{cid}/recording-status`.
    async fn recording_status(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: CallKind,
    ) -> Result<RecordingStatusResponseBody, ApiError>;

    /// `GET /groups/{gid}/calls/{cid}/recorder-signal`: drained on behalf of the
    /// `RecorderBackend`, not a group member, so it takes no `AuthContext`.
    async fn recorder_drain_signals(&self, call_id: CallId) -> Vec<SignalMessage>;

    /// `POST /groups/{gid}/calls/{cid}/recorder-signal`.
    async fn recorder_deposit_signal(
        &self,
        call_id: CallId,
        target: Option<PeerId>,
        message: SignalMessage,
    ) -> Result<(), ApiError>;

    /// `POST /groups/{gid}/calls/{cid}/recording` (multipart artifact upload).
    async fn ingest_recording(
        &self,
        call_id: CallId,
        kind: CallKind,
        artifact: RecordingArtifact,
    ) -> Result<(), ApiError>;

    /// `GET /recording-queue/status`.
    async fn queue_status(&self) -> GetQueueStatusResponseBody;

    /// `POST /recording-queue/join`.
    async fn queue_join(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        kind: CallKind,
        intended_participants: Vec<MemberId>,
    ) -> AdmitOutcome;

    /// `POST /recording-queue/leave`.
    async fn queue_leave(
        &self,
        auth: &AuthContext,
        queue_id: Option<QueueId>,
        kind: Option<CallKind>,
    ) -> Result<(), ApiError>;

    /// `GET /recording-queue/position/{qid}`.
    async fn queue_position(&self, queue_id: QueueId) -> GetQueuePositionResponseBody;

    /// `GET /recording-queue/check-turn/{qid}`.
    async fn queue_check_turn(&self, queue_id: QueueId) -> Result<GetCheckTurnResponseBody, ApiError>;
}
