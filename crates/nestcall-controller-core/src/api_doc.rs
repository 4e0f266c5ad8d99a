//! Aggregated OpenAPI document, mounted under `/swagger-ui/` by
//! [`crate::controller::Controller::run`].

use utoipa::OpenApi;

use crate::routes::{calls, queue, recording};

#[derive(OpenApi)]
#[openapi(
    paths(
        calls::list_calls,
        calls::list_active_calls,
        calls::initiate_call,
        calls::respond_to_call,
        calls::leave_call,
        calls::end_call,
        calls::hide_recording,
        calls::deposit_signal,
        calls::drain_signals,
        calls::ice_servers,
        recording::start_recording,
        recording::stop_recording,
        recording::recording_status,
        recording::recorder_drain_signals,
        recording::recorder_deposit_signal,
        recording::ingest_recording,
        queue::queue_status,
        queue::queue_join,
        queue::queue_leave,
        queue::queue_position,
        queue::queue_check_turn,
    ),
    components(schemas(
        calls::PostCallsRequestBody,
        calls::RecorderSignalsResponseBody,
        nestcall_types_api::calls::CallResource,
        nestcall_types_api::calls::GetCallsResponseBody,
        nestcall_types_api::calls::GetActiveCallsResponseBody,
        nestcall_types_api::calls::RespondAction,
        nestcall_types_api::calls::PutRespondRequestBody,
        nestcall_types_api::error::ErrorBody,
        nestcall_types_api::ice::IceServer,
        nestcall_types_api::ice::GetIceServersResponseBody,
        nestcall_types_api::queue::QueueWaitInfo,
        nestcall_types_api::queue::AdmitOutcome,
        nestcall_types_api::queue::GetQueueStatusResponseBody,
        nestcall_types_api::queue::GetQueuePositionResponseBody,
        nestcall_types_api::queue::GetCheckTurnResponseBody,
        queue::PostQueueJoinRequestBody,
        queue::PostQueueLeaveRequestBody,
        nestcall_types_api::recording::PostStartRecordingResponseBody,
        nestcall_types_api::recording::RecordingStatusResponseBody,
        nestcall_types_api::signaling::PostSignalRequestBody,
        nestcall_types_api::signaling::GetSignalResponseBody,
        nestcall_types_signaling::Call,
        nestcall_types_signaling::CallStatus,
        nestcall_types_signaling::Participant,
        nestcall_types_signaling::ParticipantStatus,
        nestcall_types_signaling::Recording,
        nestcall_types_signaling::RecordingStatus,
        nestcall_types_signaling::SignalMessage,
        nestcall_types_signaling::SignalKind,
        nestcall_types_signaling::PeerId,
    )),
    tags(
        (name = "calls", description = "Call lifecycle"),
        (name = "signaling", description = "Ephemeral WebRTC signaling relay"),
        (name = "recording", description = "Ghost-recorder admission and ingest"),
        (name = "queue", description = "Recording admission queue"),
    )
)]
pub struct ApiDoc;
