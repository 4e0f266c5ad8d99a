//! The concrete [`CallServiceBackend`], wiring `CallCoordinator`, its
//! `RecorderCoordinator`, the standalone `RecordingQueue`, and `RecordingIngest`
//! behind the one trait the HTTP routes depend on.

use std::sync::Arc;

use async_trait::async_trait;
use nestcall_call_core::{CallCoordinator, CallCoreError, ParticipantRegistry, RecordingIngest, RecordingQueue, StartOutcome};
use nestcall_controller_service_facade::CallServiceBackend;
use nestcall_signaling_core::{AuthContext, CallStore, RecordingArtifact};
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
use nestcall_types_signaling::{Call, PeerId, SignalKind, SignalMessage};

/// Wires the domain crates together behind [`CallServiceBackend`]. Holds its own
/// `Arc<dyn CallStore>` alongside the coordinator's, since `recording_status` needs a
/// raw read that has no dedicated `CallCoordinator` method.
pub struct CoordinatorBackend {
    coordinator: Arc<CallCoordinator>,
    queue: Arc<RecordingQueue>,
    ingest: Arc<RecordingIngest>,
    call_store: Arc<dyn CallStore>,
    registry: ParticipantRegistry,
}

impl CoordinatorBackend {
    pub fn new(
        coordinator: Arc<CallCoordinator>,
        queue: Arc<RecordingQueue>,
        ingest: Arc<RecordingIngest>,
        call_store: Arc<dyn CallStore>,
    ) -> Self {
        Self {
            coordinator,
            queue,
            ingest,
            call_store,
            registry: ParticipantRegistry,
        }
    }

    async fn call_resource(&self, call: Call) -> Result<CallResource, CallCoreError> {
        let participants = self.coordinator.participants_of(call.id).await?;
        Ok(CallResource { call, participants })
    }

    async fn load_for_status_read(&self, auth: &AuthContext, call_id: CallId) -> Result<Call, CallCoreError> {
        let call = self.call_store.get_call(call_id).await?.ok_or(CallCoreError::CallNotFound)?;
        let participants = self.call_store.get_participants(call_id).await?;
        if !self.registry.is_involved(&call, &participants, auth.member_id) {
            return Err(CallCoreError::PermissionDenied);
        }
        Ok(call)
    }
}

#[async_trait(?Send)]
impl CallServiceBackend for CoordinatorBackend {
    async fn list_calls(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        page: PageQuery,
    ) -> Result<GetCallsResponseBody, ApiError> {
        let page = page.clamped();
        let (calls, total) = self.coordinator.list_calls(auth, group_id, page.limit, page.offset).await?;
        let mut resources = Vec::with_capacity(calls.len());
        for call in calls {
            resources.push(self.call_resource(call).await?);
        }
        Ok(GetCallsResponseBody { calls: resources, total })
    }

    async fn list_active_calls(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
    ) -> Result<GetActiveCallsResponseBody, ApiError> {
        let active_calls = self.coordinator.list_active(auth, group_id).await?;
        let mut active = Vec::with_capacity(active_calls.active.len());
        for call in active_calls.active {
            active.push(self.call_resource(call).await?);
        }
        let mut incoming = Vec::with_capacity(active_calls.incoming.len());
        for call in active_calls.incoming {
            incoming.push(self.call_resource(call).await?);
        }
        Ok(GetActiveCallsResponseBody { active, incoming })
    }

    async fn initiate_call(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        kind: CallKind,
        invitees: Vec<MemberId>,
    ) -> Result<CallResource, ApiError> {
        let call = self.coordinator.initiate(auth, group_id, kind, invitees).await?;
        Ok(self.call_resource(call).await?)
    }

    async fn respond_to_call(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        accept: bool,
    ) -> Result<CallResource, ApiError> {
        let call = self.coordinator.respond(auth, call_id, accept).await?;
        Ok(self.call_resource(call).await?)
    }

    async fn leave_call(&self, auth: &AuthContext, call_id: CallId) -> Result<CallResource, ApiError> {
        let call = self.coordinator.leave(auth, call_id).await?;
        Ok(self.call_resource(call).await?)
    }

    async fn end_call(&self, auth: &AuthContext, call_id: CallId) -> Result<CallResource, ApiError> {
        let call = self.coordinator.end(auth, call_id).await?;
        Ok(self.call_resource(call).await?)
    }

    async fn hide_recording(&self, auth: &AuthContext, call_id: CallId) -> Result<CallResource, ApiError> {
        let call = self.coordinator.hide_recording(auth, call_id).await?;
        Ok(self.call_resource(call).await?)
    }

    async fn deposit_signal(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: SignalKind,
        data: serde_json::Value,
        target: Option<PeerId>,
    ) -> Result<(), ApiError> {
        Ok(self.coordinator.deposit_signal(auth, call_id, kind, data, target).await?)
    }

    async fn drain_signals(&self, auth: &AuthContext, call_id: CallId) -> Result<GetSignalResponseBody, ApiError> {
        let drained = self.coordinator.drain_signals(auth, call_id).await?;
        Ok(GetSignalResponseBody {
            signals: drained.signals,
            peers: drained.peers,
            my_peer_id: drained.my_peer_id,
        })
    }

    async fn ice_servers(&self) -> GetIceServersResponseBody {
        GetIceServersResponseBody {
            ice_servers: self.coordinator.ice_servers(),
        }
    }

    async fn start_recording(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: CallKind,
    ) -> Result<PostStartRecordingResponseBody, ApiError> {
        match self.coordinator.recorder().start(auth, call_id, kind).await? {
            StartOutcome::Queued(admission) => Ok(PostStartRecordingResponseBody {
                needs_queue: admission.needs_queue,
                queue: admission.queue,
                recording: None,
            }),
            StartOutcome::Started(recording) => Ok(PostStartRecordingResponseBody {
                needs_queue: false,
                queue: None,
                recording: Some(recording),
            }),
        }
    }

    async fn stop_recording(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        kind: CallKind,
    ) -> Result<RecordingStatusResponseBody, ApiError> {
        let recording = self.coordinator.recorder().stop(auth, call_id, kind).await?;
        Ok(RecordingStatusResponseBody { recording })
    }

    async fn recording_status(
        &self,
        auth: &AuthContext,
        call_id: CallId,
        _kind: CallKind,
    ) -> Result<RecordingStatusResponseBody, ApiError> {
        let call = self.load_for_status_read(auth, call_id).await?;
        Ok(RecordingStatusResponseBody { recording: call.recording })
    }

    async fn recorder_drain_signals(&self, call_id: CallId) -> Vec<SignalMessage> {
        self.coordinator.recorder().drain_recorder_signals(call_id)
    }

    async fn recorder_deposit_signal(
        &self,
        call_id: CallId,
        target: Option<PeerId>,
        message: SignalMessage,
    ) -> Result<(), ApiError> {
        Ok(self.coordinator.recorder().deposit_recorder_signal(call_id, target, message).await?)
    }

    async fn ingest_recording(
        &self,
        call_id: CallId,
        kind: CallKind,
        artifact: RecordingArtifact,
    ) -> Result<(), ApiError> {
        Ok(self.ingest.ingest(call_id, kind, artifact).await?)
    }

    async fn queue_status(&self) -> GetQueueStatusResponseBody {
        self.queue.status()
    }

    async fn queue_join(
        &self,
        auth: &AuthContext,
        group_id: GroupId,
        kind: CallKind,
        intended_participants: Vec<MemberId>,
    ) -> AdmitOutcome {
        self.queue
            .admit(
                auth.user_id,
                group_id,
                kind,
                intended_participants,
                auth.display_name.clone(),
                auth.email.clone(),
            )
            .await
    }

    async fn queue_leave(
        &self,
        auth: &AuthContext,
        queue_id: Option<QueueId>,
        kind: Option<CallKind>,
    ) -> Result<(), ApiError> {
        match (queue_id, kind) {
            (Some(queue_id), _) => Ok(self.queue.leave(queue_id)?),
            (None, Some(kind)) => Ok(self.queue.leave_by_user(auth.user_id, kind)?),
            (None, None) => Err(CallCoreError::QueueEntryNotFound.into()),
        }
    }

    async fn queue_position(&self, queue_id: QueueId) -> GetQueuePositionResponseBody {
        GetQueuePositionResponseBody {
            entry: self.queue.position(queue_id),
        }
    }

    async fn queue_check_turn(&self, queue_id: QueueId) -> Result<GetCheckTurnResponseBody, ApiError> {
        let is_your_turn = self.queue.check_turn(queue_id)?;
        Ok(GetCheckTurnResponseBody { is_your_turn })
    }
}
