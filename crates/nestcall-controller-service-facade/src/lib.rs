//! Service facade between the HTTP routing layer and the call orchestration core.
//!
//! [`CallServiceBackend`] has one method per route in the external HTTP surface;
//! [`CallService`] wraps a concrete backend behind a trait object so routes depend
//! on neither `nestcall-call-core` nor any particular wiring of its capabilities.

mod controller_service;
mod controller_service_backend;

pub use controller_service::CallService;
pub use controller_service_backend::CallServiceBackend;
