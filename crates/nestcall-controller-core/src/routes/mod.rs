//! Route handlers, grouped by the spec's own sections and mounted onto scopes by
//! [`crate::controller::Controller::run`].

pub mod calls;
pub mod queue;
pub mod recording;

use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

use crate::auth::{bearer_validator, recorder_bearer_validator};

// Each handler's route macro already carries its full absolute path (so that
// `utoipa::path` documents the real URL), so these scopes use an empty prefix and
// exist only to attach the right bearer-auth middleware to the right group of routes.

/// Member-authenticated call lifecycle, signaling, and recording-admission routes.
pub fn member_scope() -> actix_web::Scope {
    web::scope("")
        .wrap(HttpAuthentication::bearer(bearer_validator))
        .service(calls::list_calls)
        .service(calls::list_active_calls)
        .service(calls::initiate_call)
        .service(calls::respond_to_call)
        .service(calls::leave_call)
        .service(calls::end_call)
        .service(calls::hide_recording)
        .service(calls::deposit_signal)
        .service(calls::drain_signals)
        .service(calls::ice_servers)
        .service(recording::start_recording)
        .service(recording::stop_recording)
        .service(recording::recording_status)
}

/// The ghost recorder's own callback endpoints, gated by its callback token instead
/// of a member's bearer token.
pub fn recorder_scope() -> actix_web::Scope {
    web::scope("")
        .wrap(HttpAuthentication::bearer(recorder_bearer_validator))
        .service(recording::recorder_drain_signals)
        .service(recording::recorder_deposit_signal)
        .service(recording::ingest_recording)
}

/// `/recording-queue/...` — member-authenticated admission queue.
pub fn queue_scope() -> actix_web::Scope {
    web::scope("")
        .wrap(HttpAuthentication::bearer(bearer_validator))
        .service(queue::queue_status)
        .service(queue::queue_join)
        .service(queue::queue_leave)
        .service(queue::queue_position)
        .service(queue::queue_check_turn)
}
