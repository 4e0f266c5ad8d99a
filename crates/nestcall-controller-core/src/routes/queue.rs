//! Recording-queue routes (spec §4.6, §6). These sit outside any single group's
//! call scope — a member may wait in only one recording queue at a time regardless
//! of which group's call they're trying to join.

use actix_web::web::{Data, Json, Path, ReqData};
use actix_web::{get, post, HttpResponse};
use nestcall_controller_service_facade::CallService;
use nestcall_types_api::error::ApiError;
use nestcall_types_common::{CallKind, GroupId, MemberId, QueueId};

use crate::auth::Identity;

#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct PostQueueJoinRequestBody {
    pub group_id: GroupId,
    pub call_kind: CallKind,
    pub intended_participants: Vec<MemberId>,
}

#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::ToSchema)]
pub struct PostQueueLeaveRequestBody {
    pub queue_id: Option<QueueId>,
    pub call_kind: Option<CallKind>,
}

/// `GET /recording-queue/status`.
#[utoipa::path(
    get,
    path = "/recording-queue/status",
    responses((status = 200, description = "Aggregate recording-capacity status")),
    tag = "recording-queue"
)]
#[get("/recording-queue/status")]
pub async fn queue_status(service: Data<CallService>) -> HttpResponse {
    HttpResponse::Ok().json(service.queue_status().await)
}

/// `POST /recording-queue/join`.
#[utoipa::path(
    post,
    path = "/recording-queue/join",
    request_body = PostQueueJoinRequestBody,
    responses((status = 200, description = "Either immediate admission or a queue entry")),
    tag = "recording-queue"
)]
#[post("/recording-queue/join")]
pub async fn queue_join(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    body: Json<PostQueueJoinRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let auth = identity.into_inner().into_auth_context(body.group_id);
    let outcome = service
        .queue_join(&auth, body.group_id, body.call_kind, body.intended_participants)
        .await;
    Ok(HttpResponse::Ok().json(outcome))
}

/// `POST /recording-queue/leave`.
#[utoipa::path(
    post,
    path = "/recording-queue/leave",
    request_body = PostQueueLeaveRequestBody,
    responses((status = 200, description = "Removed from the queue")),
    tag = "recording-queue"
)]
#[post("/recording-queue/leave")]
pub async fn queue_leave(
    service: Data<CallService>,
    identity: ReqData<Identity>,
    body: Json<PostQueueLeaveRequestBody>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    // Leaving the queue is scoped to the caller, not to a group; `AuthContext::group_id`
    // is unused on this path, so a nil placeholder carries no weight here.
    let auth = identity.into_inner().into_auth_context(GroupId::nil());
    service.queue_leave(&auth, body.queue_id, body.call_kind).await?;
    Ok(HttpResponse::Ok().finish())
}

/// `GET /recording-queue/position/{qid}`.
#[utoipa::path(
    get,
    path = "/recording-queue/position/{queue_id}",
    responses((status = 200, description = "The caller's current queue position, if still queued")),
    tag = "recording-queue"
)]
#[get("/recording-queue/position/{queue_id}")]
pub async fn queue_position(service: Data<CallService>, queue_id: Path<QueueId>) -> HttpResponse {
    HttpResponse::Ok().json(service.queue_position(queue_id.into_inner()).await)
}

/// `GET /recording-queue/check-turn/{qid}`.
#[utoipa::path(
    get,
    path = "/recording-queue/check-turn/{queue_id}",
    responses((status = 200, description = "Whether a recording slot just opened up for this entry")),
    tag = "recording-queue"
)]
#[get("/recording-queue/check-turn/{queue_id}")]
pub async fn queue_check_turn(service: Data<CallService>, queue_id: Path<QueueId>) -> Result<HttpResponse, ApiError> {
    let body = service.queue_check_turn(queue_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(body))
}
