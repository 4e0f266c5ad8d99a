//! The signaling plane and the capability traits the rest of the core is built
//! against (spec §4.1, §4.2, §9).
//!
//! Nothing in this crate knows what a "call state machine" or a "recording queue"
//! is — that behavior lives one layer up, in `nestcall_call_core`. This crate only
//! owns the two pieces that sit below it: the ephemeral WebRTC signaling relay, and
//! the capability interfaces (`CallStore`, `Notifier`, `RecorderBackend`, ...) that
//! decouple the core from any concrete infrastructure.

pub mod capabilities;
pub mod clock;
pub mod error;
pub mod ice;
pub mod signal_relay;

pub use capabilities::{
    AuthContext, AuthorizationPolicy, CallStore, GroupSettings, IceConfigProvider, Notifier, QueuePressureNotice,
    RecorderBackend, RecorderSessionRequest, RecordingArtifact, RecordingAssetStore, StoredArtifact,
    TranscodeService, TranscodedArtifact,
};
pub use clock::{Clock, SystemClock};
pub use error::CoreError;
pub use ice::{StaticIceConfigProvider, TurnConfig};
pub use signal_relay::{KnownPeers, SignalRelay, DEFAULT_TTL};
