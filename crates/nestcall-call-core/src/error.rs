use nestcall_signaling_core::CoreError;
use nestcall_types_api::error::ApiError;
use snafu::Snafu;

/// The error taxonomy of the call orchestration core (spec §7).
///
/// Every state-machine rejection and every capability failure funnels through this
/// enum; `nestcall-controller-core`'s routes need only `?` and a `From` conversion
/// (implemented below) to reach an HTTP response.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CallCoreError {
    /// No `AuthContext` could be established for the request.
    #[snafu(display("unauthenticated"))]
    Unauthenticated,

    /// The caller's role does not permit this operation.
    #[snafu(display("permission denied"))]
    PermissionDenied,

    /// The caller is not a member of the group the operation targets.
    #[snafu(display("not a group member"))]
    NotMember,

    /// The group is frozen and cannot start new calls.
    #[snafu(display("group is read-only"))]
    ReadOnlyGroup,

    /// No call exists with the given id.
    #[snafu(display("call not found"))]
    CallNotFound,

    /// The caller has no participant record in this call.
    #[snafu(display("participant not found"))]
    ParticipantNotFound,

    /// No queue entry exists with the given id, or for the given `(user, kind)` pair.
    #[snafu(display("queue entry not found"))]
    QueueEntryNotFound,

    /// `initiate` was called with zero invitees, or one of the invitees was the
    /// initiator themselves, or an invitee is not a registered group member.
    #[snafu(display("invalid invitees: {reason}"))]
    InvalidInvitees {
        /// which precondition failed
        reason: String,
    },

    /// One of the invitees holds the `supervisor` role.
    #[snafu(display("a supervisor cannot be invited to a call"))]
    SupervisorNotAllowed,

    /// `respond` was called by a participant whose status is no longer `invited`.
    #[snafu(display("already responded"))]
    AlreadyResponded,

    /// The operation requires a non-terminal call but the call has already ended.
    #[snafu(display("call is already terminal"))]
    CallTerminal,

    /// `hideRecording` was called on a call with no recording.
    #[snafu(display("call has no recording"))]
    NoRecording,

    /// `hideRecording` was called on a recording that is already hidden.
    #[snafu(display("recording is already hidden"))]
    AlreadyHidden,

    /// `start` was called while a recording for this call/kind is already running.
    #[snafu(display("recording is already running"))]
    RecordingAlreadyRunning,

    /// The `RecorderBackend` did not respond within its deadline.
    #[snafu(display("backend unavailable: {message}"))]
    BackendUnavailable {
        /// what was being attempted
        message: String,
    },

    /// The `TranscodeService` could not produce the canonical artifact.
    #[snafu(display("transcode failed: {message}"))]
    TranscodeFailed {
        /// what went wrong
        message: String,
    },

    /// The `Notifier` could not deliver an operator alert. Never fails the operation
    /// that triggered it (spec §4.6); surfaced only when a route calls it directly.
    #[snafu(display("notifier failed: {message}"))]
    NotifierFailed {
        /// what went wrong
        message: String,
    },

    /// A programming error, or any other infrastructure failure.
    #[snafu(display("internal error: {message}"))]
    Internal {
        /// what went wrong
        message: String,
    },
}

impl From<CoreError> for CallCoreError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::CallNotFound => Self::CallNotFound,
            CoreError::BackendUnavailable { message } => Self::BackendUnavailable { message },
            CoreError::TranscodeFailed { message } => Self::TranscodeFailed { message },
            CoreError::NotifierFailed { message } => Self::NotifierFailed { message },
            CoreError::Internal { message } => Self::Internal { message },
        }
    }
}

impl From<CallCoreError> for ApiError {
    fn from(value: CallCoreError) -> Self {
        match value {
            CallCoreError::Unauthenticated => Self::unauthenticated(),
            CallCoreError::PermissionDenied => Self::permission_denied(),
            CallCoreError::NotMember => Self::not_member(),
            CallCoreError::ReadOnlyGroup => Self::read_only_group(),
            CallCoreError::CallNotFound => Self::not_found("call_not_found", "No such call"),
            CallCoreError::ParticipantNotFound => {
                Self::not_found("participant_not_found", "No such participant in this call")
            }
            CallCoreError::QueueEntryNotFound => {
                Self::not_found("queue_entry_not_found", "No such recording-queue entry")
            }
            CallCoreError::InvalidInvitees { reason } => {
                Self::bad_request("invalid_invitees", "The invitee list is invalid").with_message(reason)
            }
            CallCoreError::SupervisorNotAllowed => Self::bad_request(
                "supervisor_not_allowed",
                "A supervisor cannot be invited to a call",
            ),
            CallCoreError::AlreadyResponded => {
                Self::bad_request("already_responded", "This call invitation already has a response")
            }
            CallCoreError::CallTerminal => {
                Self::bad_request("call_terminal", "This call has already ended")
            }
            CallCoreError::NoRecording => {
                Self::bad_request("no_recording", "This call has no recording")
            }
            CallCoreError::AlreadyHidden => {
                Self::bad_request("already_hidden", "This recording is already hidden")
            }
            CallCoreError::RecordingAlreadyRunning => Self::bad_request(
                "recording_already_running",
                "A recording is already running for this call",
            ),
            CallCoreError::BackendUnavailable { message } => {
                log::error!("recorder backend unavailable: {message}");
                Self::backend_unavailable()
            }
            CallCoreError::TranscodeFailed { message } => {
                log::error!("transcode failed: {message}");
                Self::transcode_failed()
            }
            CallCoreError::NotifierFailed { message } => {
                log::warn!("notifier failed: {message}");
                Self::notifier_failed()
            }
            CallCoreError::Internal { message } => {
                log::error!("internal error: {message}");
                Self::internal()
            }
        }
    }
}
