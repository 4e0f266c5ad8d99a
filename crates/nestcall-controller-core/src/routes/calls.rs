//! Call lifecycle and signaling routes (spec §6).

use actix_web::web::{Data, Json, Path, Query, ReqData};
use actix_web::{get, post, put, HttpResponse};
use nestcall_controller_service_facade::CallService;
use nestcall_types_api::calls::{PutRespondRequestBody, RespondAction};
use nestcall_types_api::error::ApiError;
use nestcall_types_api::ice::GetIceServersResponseBody;
use nestcall_types_api::pagination::PageQuery;
use nestcall_types_api::signaling::PostSignalRequestBody;
use nestcall_types_common::{CallId, GroupId};
use nestcall_types_signaling::SignalMessage;

use crate::auth::Identity;

/// `GET /groups/{gid}/calls`.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/calls",
    params(PageQuery),
    responses((status = 200, description = "Paginated call history")),
    tag = "calls"
)]
#[get("/groups/{group_id}/calls")]
pub async fn list_calls(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    group_id: Path<GroupId>,
    page: Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let auth = identity.into_inner().into_auth_context(group_id.into_inner());
    let body = service.list_calls(&auth, auth.group_id, page.into_inner()).await?;
    Ok(HttpResponse::Ok().json(body))
}

/// `GET /groups/{gid}/calls/active`.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/calls/active",
    responses((status = 200, description = "The caller's active and incoming calls")),
    tag = "calls"
)]
#[get("/groups/{group_id}/calls/active")]
pub async fn list_active_calls(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    group_id: Path<GroupId>,
) -> Result<HttpResponse, ApiError> {
    let auth = identity.into_inner().into_auth_context(group_id.into_inner());
    let body = service.list_active_calls(&auth, auth.group_id).await?;
    Ok(HttpResponse::Ok().json(body))
}

#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct PostCallsRequestBody {
    pub kind: nestcall_types_common::CallKind,
    pub invitees: Vec<nestcall_types_common::MemberId>,
}

/// `POST /groups/{gid}/calls`.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/calls",
    request_body = PostCallsRequestBody,
    responses((status = 200, description = "The newly initiated call")),
    tag = "calls"
)]
#[post("/groups/{group_id}/calls")]
pub async fn initiate_call(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    group_id: Path<GroupId>,
    body: Json<PostCallsRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let auth = identity.into_inner().into_auth_context(group_id.into_inner());
    let body = body.into_inner();
    let call = service.initiate_call(&auth, auth.group_id, body.kind, body.invitees).await?;
    Ok(HttpResponse::Ok().json(call))
}

/// `PUT /groups/{gid}/calls/{cid}/respond`.
#[utoipa::path(
    put,
    path = "/groups/{group_id}/calls/{call_id}/respond",
    request_body = PutRespondRequestBody,
    responses((status = 200, description = "The call after the caller's response")),
    tag = "calls"
)]
#[put("/groups/{group_id}/calls/{call_id}/respond")]
pub async fn respond_to_call(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    path: Path<(GroupId, CallId)>,
    body: Json<PutRespondRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, call_id) = path.into_inner();
    let auth = identity.into_inner().into_auth_context(group_id);
    let accept = matches!(body.into_inner().action, RespondAction::Accept);
    let call = service.respond_to_call(&auth, call_id, accept).await?;
    Ok(HttpResponse::Ok().json(call))
}

/// `PUT /groups/{gid}/calls/{cid}/leave`.
#[utoipa::path(
    put,
    path = "/groups/{group_id}/calls/{call_id}/leave",
    responses((status = 200, description = "The call after the caller left")),
    tag = "calls"
)]
#[put("/groups/{group_id}/calls/{call_id}/leave")]
pub async fn leave_call(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    path: Path<(GroupId, CallId)>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, call_id) = path.into_inner();
    let auth = identity.into_inner().into_auth_context(group_id);
    let call = service.leave_call(&auth, call_id).await?;
    Ok(HttpResponse::Ok().json(call))
}

/// `PUT /groups/{gid}/calls/{cid}/end`.
#[utoipa::path(
    put,
    path = "/groups/{group_id}/calls/{call_id}/end",
    responses((status = 200, description = "The ended call")),
    tag = "calls"
)]
#[put("/groups/{group_id}/calls/{call_id}/end")]
pub async fn end_call(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    path: Path<(GroupId, CallId)>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, call_id) = path.into_inner();
    let auth = identity.into_inner().into_auth_context(group_id);
    let call = service.end_call(&auth, call_id).await?;
    Ok(HttpResponse::Ok().json(call))
}

/// `PUT /groups/{gid}/calls/{cid}/hide-recording`.
#[utoipa::path(
    put,
    path = "/groups/{group_id}/calls/{call_id}/hide-recording",
    responses((status = 200, description = "The call with its recording hidden"), (status = 403, description = "Not an admin")),
    tag = "calls"
)]
#[put("/groups/{group_id}/calls/{call_id}/hide-recording")]
pub async fn hide_recording(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    path: Path<(GroupId, CallId)>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, call_id) = path.into_inner();
    let auth = identity.into_inner().into_auth_context(group_id);
    let call = service.hide_recording(&auth, call_id).await?;
    Ok(HttpResponse::Ok().json(call))
}

/// `POST /groups/{gid}/calls/{cid}/signal`.
#[utoipa::path(
    post,
    path = "/groups/{group_id}/calls/{call_id}/signal",
    request_body = PostSignalRequestBody,
    responses((status = 200, description = "Signal deposited")),
    tag = "signaling"
)]
#[post("/groups/{group_id}/calls/{call_id}/signal")]
pub async fn deposit_signal(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    path: Path<(GroupId, CallId)>,
    body: Json<PostSignalRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, call_id) = path.into_inner();
    let auth = identity.into_inner().into_auth_context(group_id);
    let body = body.into_inner();
    service.deposit_signal(&auth, call_id, body.kind, body.data, body.target_peer_id).await?;
    Ok(HttpResponse::Ok().finish())
}

/// `GET /groups/{gid}/calls/{cid}/signal`.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/calls/{call_id}/signal",
    responses((status = 200, description = "The caller's drained mailbox")),
    tag = "signaling"
)]
#[get("/groups/{group_id}/calls/{call_id}/signal")]
pub async fn drain_signals(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    path: Path<(GroupId, CallId)>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, call_id) = path.into_inner();
    let auth = identity.into_inner().into_auth_context(group_id);
    let body = service.drain_signals(&auth, call_id).await?;
    Ok(HttpResponse::Ok().json(body))
}

/// `GET /groups/{gid}/calls/{cid}/ice-servers`.
#[utoipa::path(
    get,
    path = "/groups/{group_id}/calls/{call_id}/ice-servers",
    responses((status = 200, body = GetIceServersResponseBody)),
    tag = "calls"
)]
#[get("/groups/{group_id}/calls/{call_id}/ice-servers")]
pub async fn ice_servers(service: Data<CallService>) -> HttpResponse {
    HttpResponse::Ok().json(service.ice_servers().await)
}

/// Matches the recorder-facing signal shape the [`CallService`] returns from
/// `recorder_drain_signals`, wrapped for a stable JSON response.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct RecorderSignalsResponseBody {
    pub signals: Vec<SignalMessage>,
}
