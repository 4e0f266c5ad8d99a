use snafu::Snafu;

/// Errors surfaced by the signaling plane and by the capability traits it depends on
/// (spec §7, the subset that originates below the call state machine).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CoreError {
    /// The call referenced by a signaling operation does not exist.
    #[snafu(display("call not found"))]
    CallNotFound,

    /// A capability backend (recorder, transcoder, notifier) could not be reached.
    #[snafu(display("backend unavailable: {message}"))]
    BackendUnavailable {
        /// what was being attempted
        message: String,
    },

    /// A `TranscodeService` call failed.
    #[snafu(display("transcode failed: {message}"))]
    TranscodeFailed {
        /// what went wrong
        message: String,
    },

    /// A `Notifier` call failed. Callers treat this as best-effort and log it rather
    /// than aborting the operation that triggered it (spec §4.6 alert policy).
    #[snafu(display("notifier failed: {message}"))]
    NotifierFailed {
        /// what went wrong
        message: String,
    },

    /// Any other infrastructure-level failure that does not fit a more specific
    /// variant above.
    #[snafu(display("internal error: {message}"))]
    Internal {
        /// what went wrong
        message: String,
    },
}
