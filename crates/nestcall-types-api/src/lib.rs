//! HTTP-facing request/response DTOs and the [`error::ApiError`] type (spec §6, §7).
//!
//! Internal domain types (`nestcall_types_signaling`) are reused directly wherever the
//! wire shape and the domain shape coincide; a dedicated DTO only exists where they
//! diverge (requests, paginated/aggregated responses).

pub mod calls;
pub mod error;
pub mod ice;
pub mod pagination;
pub mod queue;
pub mod recording;
pub mod signaling;
