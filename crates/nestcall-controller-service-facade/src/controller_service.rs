use std::sync::Arc;

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
use tokio::sync::RwLock;

use crate::controller_service_backend::CallServiceBackend;

/// A concrete, cloneable facade in front of a `CallServiceBackend`. Routes in
/// `nestcall-controller-core` hold one of these and never see the concrete backend
/// type, which keeps the HTTP layer testable against a fake backend.
#[derive(Clone)]
pub struct CallService {
    backend: Arc<RwLock<dyn CallServiceBackend>>,
}

impl std::fmt::Debug for CallService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CallService")
    }
}

impl CallService {
    pub fn new<B: CallServiceBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(RwLock::new(backend)),
        }
    }

    pub async fn list_calls(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        page: PageQuery,
    ) -> Result<GetCallsResponseBody, ApiError> {
        self.backend.read().await.list_calls(auth, group_id, page).await
    }

    pub async fn list_active_calls(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
    ) -> Result<GetActiveCallsResponseBody, ApiError> {
        self.backend.read().await.list_active_calls(auth, group_id).await
    }

    pub async fn initiate_call(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        kind: CallKind,
        invitees: Vec<MemberId>,
    ) -> Result<CallResource, ApiError> {
        self.backend.read().await.initiate_call(auth, group_id, kind, invitees).await
    }

    pub async fn respond_to_call(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        accept: bool,
    ) -> Result<CallResource, ApiError> {
        self.backend.read().await.respond_to_call(auth, call_id, accept).await
    }

    pub async fn leave_call(&self, auth: &AuthContext, call_id: CallId) -> Result<CallResource, ApiError> {
        self.backend.read().await.leave_call(auth, call_id).await
    }

    pub async fn end_call(&self, auth: &AuthContext, call_id: CallId) -> Result<CallResource, ApiError> {
        self.backend.read().await.end_call(auth, call_id).await
    }

    pub async fn hide_recording(&self, auth: &AuthContext, call_id: CallId) -> Result<CallResource, ApiError> {
        self.backend.read().await.hide_recording(auth, call_id).await
    }

    pub async fn deposit_signal(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: SignalKind,
        data: serde_json::Value,
        target: Option<PeerId>,
    ) -> Result<(), ApiError> {
        self.backend.read().await.deposit_signal(auth, call_id, kind, data, target).await
    }

    pub async fn drain_signals(&self, auth: &AuthContext, call_id: CallId) -> Result<GetSignalResponseBody, ApiError> {
        self.backend.read().await.drain_signals(auth, call_id).await
    }

    pub async fn ice_servers(&self) -> GetIceServersResponseBody {
        self.backend.read().await.ice_servers().await
    }

    pub async fn start_recording(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: CallKind,
    ) -> Result<PostStartRecordingResponseBody, ApiError> {
        self.backend.read().await.start_recording(auth, call_id, kind).await
    }

    pub async fn stop_recording(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: CallKind,
    ) -> Result<RecordingStatusResponseBody, ApiError> {
        self.backend.read().await.stop_recording(auth, call_id, kind).await
    }

    pub async fn recording_status(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: CallKind,
    ) -> Result<RecordingStatusResponseBody, ApiError> {
        self.backend.read().await.recording_status(auth, call_id, kind).await
    }

    pub async fn recorder_drain_signals(&self, call_id: CallId) -> Vec<SignalMessage> {
        self.backend.read().await.recorder_drain_signals(call_id).await
    }

    pub async fn recorder_deposit_signal(
        &self,
        call_id: CallId,
        target: Option<PeerId>,
        message: SignalMessage,
    ) -> Result<(), ApiError> {
        self.backend.read().await.recorder_deposit_signal(call_id, target, message).await
    }

    pub async fn ingest_recording(
        &self,
        call_id: CallId,
        kind: CallKind,
        artifact: RecordingArtifact,
    ) -> Result<(), ApiError> {
        self.backend.read().await.ingest_recording(call_id, kind, artifact).await
    }

    pub async fn queue_status(&self) -> GetQueueStatusResponseBody {
        self.backend.read().await.queue_status().await
    }

    pub async fn queue_join(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        kind: CallKind,
        intended_participants: Vec<MemberId>,
    ) -> AdmitOutcome {
        self.backend.read().await.queue_join(auth, group_id, kind, intended_participants).await
    }

    pub async fn queue_leave(
        &self,
        auth: &AuthContext,
        queue_id: Option<QueueId>,
        kind: Option<CallKind>,
    ) -> Result<(), ApiError> {
        self.backend.read().await.queue_leave(auth, queue_id, kind).await
    }

    pub async fn queue_position(&self, queue_id: QueueId) -> GetQueuePositionResponseBody {
        self.backend.read().await.queue_position(queue_id).await
    }

    pub async fn queue_check_turn(&self, queue_id: QueueId) -> Result<GetCheckTurnResponseBody, ApiError> {
        self.backend.read().await.queue_check_turn(queue_id).await
    }
}
