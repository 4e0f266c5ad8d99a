use async_trait::async_trait;
use nestcall_types_api::ice::IceServer;
use nestcall_types_common::{CallKind, GroupId, MemberId, Role};
use nestcall_types_signaling::{Call, Participant};

use crate::error::CoreError;

/// The caller's identity and group membership, resolved by whatever sits in front of
/// the core (an auth middleware in `nestcall-controller-core` today) and passed down
/// as an opaque bag of facts (spec §9 "Inject an `AuthContext`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: MemberId,
    pub member_id: MemberId,
    pub group_id: GroupId,
    pub role: Role,
    /// Carried alongside identity so `RecordingQueue` entries can show operators a
    /// human-readable name/contact without the core owning a user-profile lookup.
    pub display_name: String,
    pub email: String,
}

/// The subset of group configuration a policy decision needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSettings {
    pub read_only: bool,
}

/// Role/group-settings gating, injected so that new roles or group flags never
/// require a change to `nestcall-call-core` itself (spec §9).
pub trait AuthorizationPolicy: Send + Sync {
    /// Whether `role` may initiate, join, or otherwise drive a call in a group with
    /// `settings`.
    fn can_use(&self, role: &Role, settings: GroupSettings) -> bool;

    /// Whether `role` may view a group's calls and recordings without necessarily
    /// being able to join them.
    fn can_see(&self, role: &Role, settings: GroupSettings) -> bool;
}

/// Durable storage for calls and participants (spec §9 "`CallStore` capability").
///
/// Implementations own persistence and consistency; the core only ever sees the
/// domain types, never a schema.
#[async_trait]
pub trait CallStore: Send + Sync {
    async fn create_call(&self, call: Call, participants: Vec<Participant>) -> Result<(), CoreError>;

    async fn get_call(&self, call_id: nestcall_types_common::CallId) -> Result<Option<Call>, CoreError>;

    async fn update_call(&self, call: Call) -> Result<(), CoreError>;

    async fn get_participants(
        &self,
        call_id: nestcall_types_common::CallId,
    ) -> Result<Vec<Participant>, CoreError>;

    async fn get_participant(
        &self,
        call_id: nestcall_types_common::CallId,
        member_id: MemberId,
    ) -> Result<Option<Participant>, CoreError>;

    async fn upsert_participant(&self, participant: Participant) -> Result<(), CoreError>;

    /// Calls visible to `group_id`, newest first, paginated. `member_id` narrows the
    /// result to calls that member was invited to; `None` returns every call in the
    /// group (spec §4.4 role-gated visibility is applied by the caller, not here).
    async fn list_calls(
        &self,
        group_id: GroupId,
        member_id: Option<MemberId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Call>, i64), CoreError>;

    /// Calls in `group_id` currently `Ringing` or `Active` (spec §4.5 `listActive`).
    async fn list_active_for_group(&self, group_id: GroupId) -> Result<Vec<Call>, CoreError>;

    async fn is_group_read_only(&self, group_id: GroupId) -> Result<bool, CoreError>;

    /// Whether every id in `member_ids` is a registered member of `group_id` (spec
    /// §4.3 `initiate` edge case "invitee not a group member").
    async fn are_registered_members(&self, group_id: GroupId, member_ids: &[MemberId]) -> Result<bool, CoreError>;

    /// The role `member_id` holds in `group_id`, if any.
    async fn role_of(&self, group_id: GroupId, member_id: MemberId) -> Result<Option<Role>, CoreError>;
}

/// Best-effort push notifications (spec §9 "`Notifier` capability"). Failures are
/// logged by the caller and never abort the operation that triggered them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_incoming_call(&self, call: &Call, to: MemberId) -> Result<(), CoreError>;

    async fn notify_queue_pressure(&self, notice: QueuePressureNotice) -> Result<(), CoreError>;
}

/// The facts behind a "the recording queue is under pressure" notification (spec
/// §4.6 alert policy).
#[derive(Debug, Clone)]
pub struct QueuePressureNotice {
    pub group_id: GroupId,
    pub enqueuing_user: MemberId,
    pub active: usize,
    pub max: usize,
    pub queue_len: usize,
}

/// A request to start or stop a recorder session for a call (spec §9 `RecorderBackend`).
#[derive(Debug, Clone)]
pub struct RecorderSessionRequest {
    pub call_id: nestcall_types_common::CallId,
    pub kind: CallKind,
}

/// The out-of-process recording agent (spec §9 "`RecorderBackend` capability").
/// Overload handling for the backend itself is out of scope (spec §4.7 Non-goals);
/// admission control lives entirely in `RecordingQueue`.
#[async_trait]
pub trait RecorderBackend: Send + Sync {
    async fn start(&self, request: RecorderSessionRequest) -> Result<(), CoreError>;

    async fn stop(&self, request: RecorderSessionRequest) -> Result<(), CoreError>;

    /// Recorder sessions the backend currently believes are running, used to
    /// reconcile `RecordingQueue::sync_active` against reality (spec §4.6).
    async fn active_sessions(&self) -> Result<usize, CoreError>;
}

/// Raw ingested media plus its declared mime type (spec §4.8 `RecordingIngest`).
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    pub bytes: Vec<u8>,
    pub original_mime_type: String,
}

/// A transcoded artifact ready for storage (spec §4.8 step 1).
#[derive(Debug, Clone)]
pub struct TranscodedArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Normalizes an ingested recording artifact into the storage format (spec §9
/// `TranscodeService`).
#[async_trait]
pub trait TranscodeService: Send + Sync {
    async fn transcode(&self, artifact: RecordingArtifact) -> Result<TranscodedArtifact, CoreError>;
}

/// A persisted artifact's opaque id and the canonical URL clients fetch it from.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub file_id: String,
    pub url: String,
}

/// Durable blob storage for finished recordings (spec §4.8 step 2 "the storage
/// capability"). Kept separate from `CallStore` since it has nothing to do with
/// call/participant metadata.
#[async_trait]
pub trait RecordingAssetStore: Send + Sync {
    async fn save(
        &self,
        call_id: nestcall_types_common::CallId,
        artifact: TranscodedArtifact,
    ) -> Result<StoredArtifact, CoreError>;
}

/// Pure function of server configuration: the ICE servers handed to clients (spec
/// §4.2 `IceConfigProvider`). No network calls, no capability dependency.
pub trait IceConfigProvider: Send + Sync {
    fn ice_servers(&self) -> Vec<IceServer>;
}
