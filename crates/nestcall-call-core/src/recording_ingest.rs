use std::sync::Arc;

use nestcall_signaling_core::{RecordingArtifact, RecordingAssetStore, TranscodeService, TranscodedArtifact};
use nestcall_types_common::{CallId, CallKind};
use nestcall_types_signaling::RecordingStatus;

use crate::error::CallCoreError;
use crate::recorder_coordinator::RecorderCoordinator;
use crate::recording_queue::RecordingQueue;

/// The canonical container a `CallKind`'s recordings are stored in (spec §4.8 step 1
/// "if the artifact isn't already in the canonical format, transcode it").
fn canonical_mime_type(kind: CallKind) -> &'static str {
    match kind {
        CallKind::Video => "video/mp4",
        CallKind::Voice => "audio/mpeg",
    }
}

/// Takes a finished recorder artifact from the backend to a playable, stored
/// recording on the call (spec §4.8 "RecordingIngest").
pub struct RecordingIngest {
    call_store: Arc<dyn nestcall_signaling_core::CallStore>,
    transcoder: Arc<dyn TranscodeService>,
    assets: Arc<dyn RecordingAssetStore>,
    queue: Arc<RecordingQueue>,
    recorder: Arc<RecorderCoordinator>,
}

impl RecordingIngest {
    pub fn new(
        call_store: Arc<dyn nestcall_signaling_core::CallStore>,
        transcoder: Arc<dyn TranscodeService>,
        assets: Arc<dyn RecordingAssetStore>,
        queue: Arc<RecordingQueue>,
        recorder: Arc<RecorderCoordinator>,
    ) -> Self {
        Self {
            call_store,
            transcoder,
            assets,
            queue,
            recorder,
        }
    }

    /// `ingest(callId, kind, artifact)` (spec §4.8). Always releases the recording
    /// queue's active slot exactly once, whether ingestion succeeds or fails.
    pub async fn ingest(
        &self,
        call_id: CallId,
        kind: CallKind,
        artifact: RecordingArtifact,
    ) -> Result<(), CallCoreError> {
        let result = self.try_ingest(call_id, kind, artifact).await;
        self.queue.recording_ended();
        self.recorder.cancel_pending_ingest(call_id, kind);

        if result.is_err() {
            if let Ok(Some(mut call)) = self.call_store.get_call(call_id).await {
                call.recording.status = RecordingStatus::Failed;
                let _ = self.call_store.update_call(call).await;
            }
        }

        result
    }

    async fn try_ingest(
        &self,
        call_id: CallId,
        kind: CallKind,
        artifact: RecordingArtifact,
    ) -> Result<(), CallCoreError> {
        let mut call = self
            .call_store
            .get_call(call_id)
            .await?
            .ok_or(CallCoreError::CallNotFound)?;

        let canonical = canonical_mime_type(kind);
        let transcoded = if artifact.original_mime_type == canonical {
            TranscodedArtifact {
                bytes: artifact.bytes,
                mime_type: canonical.to_owned(),
            }
        } else {
            self.transcoder.transcode(artifact).await?
        };

        let size_bytes = transcoded.bytes.len() as i64;
        let stored = self.assets.save(call_id, transcoded).await?;

        call.recording.status = RecordingStatus::Ready;
        call.recording.file_id = Some(stored.file_id);
        call.recording.url = Some(stored.url);
        call.recording.duration_ms = call.duration_ms;
        call.recording.size_bytes = Some(size_bytes);
        self.call_store.update_call(call).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use nestcall_signaling_core::{
        CallStore, CoreError, Notifier, QueuePressureNotice, RecorderBackend, RecorderSessionRequest, SignalRelay,
        StoredArtifact, SystemClock,
    };
    use nestcall_types_common::{GroupId, MemberId, Role};
    use nestcall_types_signaling::{Call, CallStatus, Participant};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::recording_queue::RecordingQueueConfig;

    #[derive(Default)]
    struct FakeCallStore {
        calls: Mutex<HashMap<CallId, Call>>,
    }

    #[async_trait]
    impl CallStore for FakeCallStore {
        async fn create_call(&self, call: Call, _participants: Vec<Participant>) -> Result<(), CoreError> {
            self.calls.lock().insert(call.id, call);
            Ok(())
        }

        async fn get_call(&self, call_id: CallId) -> Result<Option<Call>, CoreError> {
            Ok(self.calls.lock().get(&call_id).cloned())
        }

        async fn update_call(&self, call: Call) -> Result<(), CoreError> {
            self.calls.lock().insert(call.id, call);
            Ok(())
        }

        async fn get_participants(&self, _call_id: CallId) -> Result<Vec<Participant>, CoreError> {
            Ok(vec![])
        }

        async fn get_participant(&self, _call_id: CallId, _member_id: MemberId) -> Result<Option<Participant>, CoreError> {
            Ok(None)
        }

        async fn upsert_participant(&self, _participant: Participant) -> Result<(), CoreError> {
            Ok(())
        }

        async fn list_calls(
            &self,
            _group_id: GroupId,
            _member_id: Option<MemberId>,
            _limit: i64,
            _offset: i64,
        ) -> Result<(Vec<Call>, i64), CoreError> {
            Ok((vec![], 0))
        }

        async fn list_active_for_group(&self, _group_id: GroupId) -> Result<Vec<Call>, CoreError> {
            Ok(vec![])
        }

        async fn is_group_read_only(&self, _group_id: GroupId) -> Result<bool, CoreError> {
            Ok(false)
        }

        async fn are_registered_members(&self, _group_id: GroupId, _member_ids: &[MemberId]) -> Result<bool, CoreError> {
            Ok(true)
        }

        async fn role_of(&self, _group_id: GroupId, _member_id: MemberId) -> Result<Option<Role>, CoreError> {
            Ok(Some(Role::new("member")))
        }
    }

    struct PassthroughTranscoder;

    #[async_trait]
    impl TranscodeService for PassthroughTranscoder {
        async fn transcode(&self, artifact: RecordingArtifact) -> Result<TranscodedArtifact, CoreError> {
            Ok(TranscodedArtifact {
                bytes: artifact.bytes,
                mime_type: "video/mp4".to_owned(),
            })
        }
    }

    struct FailingTranscoder;

    #[async_trait]
    impl TranscodeService for FailingTranscoder {
        async fn transcode(&self, _artifact: RecordingArtifact) -> Result<TranscodedArtifact, CoreError> {
            Err(CoreError::TranscodeFailed {
                message: "transcoder down".to_owned(),
            })
        }
    }

    struct FakeAssetStore;

    #[async_trait]
    impl RecordingAssetStore for FakeAssetStore {
        async fn save(&self, call_id: CallId, _artifact: TranscodedArtifact) -> Result<StoredArtifact, CoreError> {
            Ok(StoredArtifact {
                file_id: format!("file-{call_id}"),
                url: format!("https://recordings.example.com/{call_id}"),
            })
        }
    }

    struct NoopNotifier;

    #[async_trait]
    impl Notifier for NoopNotifier {
        async fn notify_incoming_call(&self, _call: &Call, _to: MemberId) -> Result<(), CoreError> {
            Ok(())
        }

        async fn notify_queue_pressure(&self, _notice: QueuePressureNotice) -> Result<(), CoreError> {
            Ok(())
        }
    }

    struct NoopRecorderBackend;

    #[async_trait]
    impl RecorderBackend for NoopRecorderBackend {
        async fn start(&self, _request: RecorderSessionRequest) -> Result<(), CoreError> {
            Ok(())
        }

        async fn stop(&self, _request: RecorderSessionRequest) -> Result<(), CoreError> {
            Ok(())
        }

        async fn active_sessions(&self) -> Result<usize, CoreError> {
            Ok(0)
        }
    }

    fn sample_call(kind: nestcall_types_common::CallKind) -> Call {
        use nestcall_types_common::{CallId, Timestamp};

        Call {
            id: CallId::generate(),
            group_id: GroupId::generate(),
            kind,
            initiator_id: MemberId::generate(),
            status: CallStatus::Ended,
            started_at: Timestamp::from_timestamp(1_700_000_000, 0).unwrap(),
            connected_at: Some(Timestamp::from_timestamp(1_700_000_000, 0).unwrap()),
            ended_at: Some(Timestamp::from_timestamp(1_700_000_030, 0).unwrap()),
            duration_ms: Some(30_000),
            recording: nestcall_types_signaling::Recording {
                status: RecordingStatus::Processing,
                ..nestcall_types_signaling::Recording::none()
            },
        }
    }

    fn harness(
        transcoder: Arc<dyn TranscodeService>,
    ) -> (Arc<FakeCallStore>, RecordingIngest) {
        let store = Arc::new(FakeCallStore::default());
        let relay = Arc::new(SignalRelay::new());
        let queue = Arc::new(RecordingQueue::new(
            RecordingQueueConfig::new(2, MemberId::generate()),
            Arc::new(NoopNotifier),
            Arc::new(SystemClock),
        ));
        let recorder = Arc::new(RecorderCoordinator::new(
            Arc::new(NoopRecorderBackend),
            store.clone(),
            relay,
            queue.clone(),
        ));
        let ingest = RecordingIngest::new(store.clone(), transcoder, Arc::new(FakeAssetStore), queue, recorder);
        (store, ingest)
    }

    #[tokio::test]
    async fn ingest_of_already_canonical_artifact_skips_transcoding_and_marks_ready() {
        let (store, ingest) = harness(Arc::new(FailingTranscoder));
        let call = sample_call(nestcall_types_common::CallKind::Video);
        store.calls.lock().insert(call.id, call.clone());

        ingest
            .ingest(
                call.id,
                call.kind,
                RecordingArtifact {
                    bytes: vec![1, 2, 3],
                    original_mime_type: "video/mp4".to_owned(),
                },
            )
            .await
            .unwrap();

        let updated = store.calls.lock().get(&call.id).cloned().unwrap();
        assert_eq!(updated.recording.status, RecordingStatus::Ready);
        assert_eq!(updated.recording.size_bytes, Some(3));
        assert_eq!(updated.recording.duration_ms, Some(30_000));
    }

    #[tokio::test]
    async fn ingest_transcodes_non_canonical_artifacts() {
        let (store, ingest) = harness(Arc::new(PassthroughTranscoder));
        let call = sample_call(nestcall_types_common::CallKind::Video);
        store.calls.lock().insert(call.id, call.clone());

        ingest
            .ingest(
                call.id,
                call.kind,
                RecordingArtifact {
                    bytes: vec![1, 2, 3, 4],
                    original_mime_type: "video/webm".to_owned(),
                },
            )
            .await
            .unwrap();

        let updated = store.calls.lock().get(&call.id).cloned().unwrap();
        assert_eq!(updated.recording.status, RecordingStatus::Ready);
    }

    #[tokio::test]
    async fn failed_transcode_marks_the_recording_failed() {
        let (store, ingest) = harness(Arc::new(FailingTranscoder));
        let call = sample_call(nestcall_types_common::CallKind::Video);
        store.calls.lock().insert(call.id, call.clone());

        let err = ingest
            .ingest(
                call.id,
                call.kind,
                RecordingArtifact {
                    bytes: vec![1],
                    original_mime_type: "video/webm".to_owned(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CallCoreError::TranscodeFailed { .. }));

        let updated = store.calls.lock().get(&call.id).cloned().unwrap();
        assert_eq!(updated.recording.status, RecordingStatus::Failed);
    }
}
