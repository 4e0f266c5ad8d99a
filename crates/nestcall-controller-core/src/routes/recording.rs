//! Recording admission and ghost-recorder callback routes (spec §6, §4.6-4.8).

use actix_multipart::Multipart;
use actix_web::web::{Data, Json, Path, Query, ReqData};
use actix_web::{get, post, HttpResponse};
use futures::TryStreamExt;
use nestcall_controller_service_facade::CallService;
use nestcall_signaling_core::RecordingArtifact;
use nestcall_types_api::error::ApiError;
use nestcall_types_api::recording::PostRecordingIngestQuery;
use nestcall_types_api::signaling::PostSignalRequestBody;
use nestcall_types_common::{CallId, CallKind, GroupId};
use nestcall_types_signaling::SignalMessage;

use crate::auth::{Identity, RecorderIdentity};
use crate::routes::calls::RecorderSignalsResponseBody;

/// The `?kind=` query string shared by the start/stop/status recording routes.
#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub struct KindQuery {
    pub kind: CallKind,
}

/// `POST /groups/{gid}/calls/{cid}/start-recording`.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/calls/{call_id}/start-recording",
    params(KindQuery),
    responses((status = 200, description = "Either the started recording or the caller's queue position")),
    tag = "recording"
)]
#[post("/groups/{group_id}/calls/{call_id}/start-recording")]
pub async fn start_recording(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    path: Path<(GroupId, CallId)>,
    kind: Query<KindQuery>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, call_id) = path.into_inner();
    let auth = identity.into_inner().into_auth_context(group_id);
    let body = service.start_recording(&auth, call_id, kind.into_inner().kind).await?;
    Ok(HttpResponse::Ok().json(body))
}

/// `POST /groups/{gid}/calls/{cid}/stop-recording`.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/calls/{call_id}/stop-recording",
    params(KindQuery),
    responses((status = 200, description = "The recording's status once stopped")),
    tag = "recording"
)]
#[post("/groups/{group_id}/calls/{call_id}/stop-recording")]
pub async fn stop_recording(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    path: Path<(GroupId, CallId)>,
    kind: Query<KindQuery>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, call_id) = path.into_inner();
    let auth = identity.into_inner().into_auth_context(group_id);
    let body = service.stop_recording(&auth, call_id, kind.into_inner().kind).await?;
    Ok(HttpResponse::Ok().json(body))
}

/// `GET /groups/{gid}/calls/{cid}/recording-status`.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/calls/{call_id}/recording-status",
    params(KindQuery),
    responses((status = 200, description = "The call's current recording status")),
    tag = "recording"
)]
#[get("/groups/{group_id}/calls/{call_id}/recording-status")]
pub async fn recording_status(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    path: Path<(GroupId, CallId)>,
    kind: Query<KindQuery>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, call_id) = path.into_inner();
    let auth = identity.into_inner().into_auth_context(group_id);
    let body = service.recording_status(&auth, call_id, kind.into_inner().kind).await?;
    Ok(HttpResponse::Ok().json(body))
}

/// `GET /groups/{gid}/calls/{cid}/recorder-signal`. Recorder-only: authenticated by
/// the callback token minted when the session was started, not a member's token.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/calls/{call_id}/recorder-signal",
    responses((status = 200, description = "Signals queued for the ghost recorder")),
    tag = "recording"
)]
#[get("/groups/{group_id}/calls/{call_id}/recorder-signal")]
pub async fn recorder_drain_signals(
    service: Data<CallService>,
    _recorder: ReqData<RecorderIdentity>,
    path: Path<(GroupId, CallId)>,
) -> HttpResponse {
    let (_group_id, call_id) = path.into_inner();
    let signals = service.recorder_drain_signals(call_id).await;
    HttpResponse::Ok().json(RecorderSignalsResponseBody { signals })
}

/// `POST /groups/{gid}/calls/{cid}/recorder-signal`.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/calls/{call_id}/recorder-signal",
    request_body = PostSignalRequestBody,
    responses((status = 200, description = "Signal deposited for a member peer")),
    tag = "recording"
)]
#[post("/groups/{group_id}/calls/{call_id}/recorder-signal")]
pub async fn recorder_deposit_signal(
    service: Data<CallService>,
    _recorder: ReqData<RecorderIdentity>,
    path: Path<(GroupId, CallId)>,
    body: Json<PostSignalRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let (_group_id, call_id) = path.into_inner();
    let body = body.into_inner();
    let message = SignalMessage {
        kind: body.kind,
        data: body.data,
        from_peer_id: nestcall_types_signaling::PeerId::Recorder,
        timestamp: chrono::Utc::now(),
    };
    service.recorder_deposit_signal(call_id, body.target_peer_id, message).await?;
    Ok(HttpResponse::Ok().finish())
}

/// `POST /groups/{gid}/calls/{cid}/recording`: the finished artifact upload. Recorder-only.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/calls/{call_id}/recording",
    params(PostRecordingIngestQuery),
    responses((status = 200, description = "Artifact accepted for transcoding and storage")),
    tag = "recording"
)]
#[post("/groups/{group_id}/calls/{call_id}/recording")]
pub async fn ingest_recording(
    service: Data<CallService>,
    _recorder: ReqData<RecorderIdentity>,
    path: Path<(GroupId, CallId)>,
    query: Query<PostRecordingIngestQuery>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let (_group_id, call_id) = path.into_inner();
    let query = query.into_inner();

    let mut bytes = Vec::new();
    while let Some(mut field) = payload.try_next().await.map_err(|err| {
        ApiError::bad_request("invalid_multipart", "malformed multipart body").with_message(err.to_string())
    })? {
        while let Some(chunk) = field.try_next().await.map_err(|err| {
            ApiError::bad_request("invalid_multipart", "malformed multipart body").with_message(err.to_string())
        })? {
            bytes.extend_from_slice(&chunk);
        }
    }

    let artifact = RecordingArtifact {
        bytes,
        original_mime_type: query.original_mime_type,
    };
    service.ingest_recording(call_id, query.kind, artifact).await?;
    Ok(HttpResponse::Ok().finish())
}
