//! HTTP surface and process wiring for the call-orchestration service: JWT
//! authentication, the route handlers, the `prometheus` metrics endpoint, the
//! default (non-test) capability implementations, and the [`controller::Controller`]
//! that ties them to an `actix-web` server.

pub mod api_doc;
pub mod auth;
pub mod backend;
pub mod cli;
pub mod controller;
pub mod metrics;
pub mod reference_impls;
pub mod routes;

pub use backend::CoordinatorBackend;
pub use controller::{try_or_exit, Controller};
