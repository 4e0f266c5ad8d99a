//! The call orchestration core: the state machine, participant bookkeeping, the
//! recording admission queue, and the recorder/backend bridge (spec §4).
//!
//! Everything here is pure domain logic over the capability traits defined in
//! `nestcall-signaling-core`; it knows nothing about HTTP, actix, or a specific
//! database.

mod call_coordinator;
mod error;
mod participant_registry;
mod recorder_coordinator;
mod recording_ingest;
mod recording_queue;
mod state_machine;

pub use call_coordinator::{ActiveCalls, CallCoordinator, DrainedSignals};
pub use error::CallCoreError;
pub use participant_registry::{Involvement, ParticipantRegistry};
pub use recorder_coordinator::{RecorderCoordinator, StartOutcome};
pub use recording_ingest::RecordingIngest;
pub use recording_queue::{RecordingQueue, RecordingQueueConfig};
pub use state_machine::{CallStateMachine, TransitionOutcome};
