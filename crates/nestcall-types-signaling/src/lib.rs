//! The persisted and ephemeral data model of the call orchestration core (spec §3).
//!
//! This crate only holds data — no behavior. The state machine that mutates [`Call`]
//! and [`Participant`] lives in `nestcall_call_core`; the relay that stores
//! [`SignalMessage`]s lives in `nestcall_signaling_core`.

mod call;
mod participant;
mod peer;
mod queue_entry;
mod recording;
mod signal;

pub use call::{Call, CallStatus};
pub use participant::{Participant, ParticipantStatus};
pub use peer::PeerId;
pub use queue_entry::QueueEntry;
pub use recording::{Recording, RecordingStatus};
pub use signal::{SignalKind, SignalMessage};
