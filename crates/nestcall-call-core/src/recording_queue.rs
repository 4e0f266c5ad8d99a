use std::sync::Arc;
use std::time::Duration;

use nestcall_signaling_core::{Clock, Notifier, QueuePressureNotice};
use nestcall_types_api::queue::{AdmitOutcome, GetQueueStatusResponseBody, QueueWaitInfo};
use nestcall_types_common::{CallKind, GroupId, MemberId, QueueId, Timestamp};
use nestcall_types_signaling::QueueEntry;
use parking_lot::Mutex;

use crate::error::CallCoreError;

/// The average length of a recording used for wait-time estimation (spec §4.6). This
/// figure is advisory only (spec §9 Open Question (c)).
const AVERAGE_CALL_MINUTES: f64 = 10.0;

/// `RecordingQueue` tuning (spec §4.6, §6 configuration).
#[derive(Debug, Clone)]
pub struct RecordingQueueConfig {
    pub max_concurrent: usize,
    pub queue_timeout: Duration,
    pub cleanup_interval: Duration,
    pub alert_cooldown: Duration,
    pub alert_recipient: MemberId,
}

impl RecordingQueueConfig {
    pub fn new(max_concurrent: usize, alert_recipient: MemberId) -> Self {
        Self {
            max_concurrent,
            queue_timeout: Duration::from_millis(600_000),
            cleanup_interval: Duration::from_millis(30_000),
            alert_cooldown: Duration::from_millis(300_000),
            alert_recipient,
        }
    }
}

struct QueueState {
    active: usize,
    queue: Vec<QueueEntry>,
    last_alert_at: Option<Timestamp>,
}

/// Admission control for ghost-recorder sessions (spec §4.6 "RecordingQueue").
///
/// `active` and `queue` are guarded by a single `Mutex`; every operation does only
/// small, bounded in-memory work while the lock is held (spec §5). The one place
/// this type talks to the outside world is the best-effort pressure alert, which is
/// always awaited after the lock has been released.
pub struct RecordingQueue {
    config: RecordingQueueConfig,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    state: Mutex<QueueState>,
}

impl RecordingQueue {
    pub fn new(config: RecordingQueueConfig, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            notifier,
            clock,
            state: Mutex::new(QueueState {
                active: 0,
                queue: Vec::new(),
                last_alert_at: None,
            }),
        }
    }

    pub fn status(&self) -> GetQueueStatusResponseBody {
        let state = self.state.lock();
        let available_slots = self.config.max_concurrent.saturating_sub(state.active);
        GetQueueStatusResponseBody {
            active: state.active,
            max: self.config.max_concurrent,
            queue_len: state.queue.len(),
            available_slots,
            at_capacity: available_slots == 0,
        }
    }

    fn wait_info(&self, entry: &QueueEntry, total_in_queue: usize) -> QueueWaitInfo {
        let estimated_wait_minutes =
            ((entry.position as f64 / self.config.max_concurrent.max(1) as f64) * AVERAGE_CALL_MINUTES).ceil() as i64;
        QueueWaitInfo {
            queue_id: entry.queue_id,
            position: entry.position,
            total_in_queue,
            estimated_wait_minutes,
        }
    }

    /// Whether an alert should fire given `now`, and records it as fired if so. Must
    /// be called with `state` already locked.
    fn should_alert(&self, state: &mut QueueState, now: Timestamp) -> bool {
        let due = match state.last_alert_at {
            None => true,
            Some(last) => (now - last).to_std().unwrap_or(Duration::ZERO) >= self.config.alert_cooldown,
        };
        if due {
            state.last_alert_at = Some(now);
        }
        due
    }

    async fn fire_alert(&self, notice: QueuePressureNotice) {
        if let Err(err) = self.notifier.notify_queue_pressure(notice).await {
            tracing::warn!(?err, "failed to deliver recording-queue pressure alert");
        }
    }

    /// `admit` (spec §4.6). Deduplicates on `(userId, kind)`.
    pub async fn admit(
        &self,
        user_id: MemberId,
        group_id: GroupId,
        call_kind: CallKind,
        intended_participants: Vec<MemberId>,
        display_name: String,
        email: String,
    ) -> AdmitOutcome {
        let now = self.clock.now();
        let (outcome, alert) = {
            let mut state = self.state.lock();

            if let Some(existing) = state
                .queue
                .iter()
                .find(|entry| entry.user_id == user_id && entry.call_kind == call_kind)
                .cloned()
            {
                let alert = self.should_alert(&mut state, now).then(|| QueuePressureNotice {
                    group_id,
                    enqueuing_user: user_id,
                    active: state.active,
                    max: self.config.max_concurrent,
                    queue_len: state.queue.len(),
                });
                (AdmitOutcome::queued(self.wait_info(&existing, state.queue.len())), alert)
            } else if state.active < self.config.max_concurrent && state.queue.is_empty() {
                (AdmitOutcome::bypass(), None)
            } else {
                let entry = QueueEntry {
                    queue_id: QueueId::generate(),
                    user_id,
                    group_id,
                    call_kind,
                    intended_participants,
                    display_name,
                    email,
                    enqueued_at: now,
                    position: state.queue.len() + 1,
                };
                state.queue.push(entry.clone());
                let alert = self.should_alert(&mut state, now).then(|| QueuePressureNotice {
                    group_id,
                    enqueuing_user: user_id,
                    active: state.active,
                    max: self.config.max_concurrent,
                    queue_len: state.queue.len(),
                });
                (AdmitOutcome::queued(self.wait_info(&entry, state.queue.len())), alert)
            }
        };

        if let Some(notice) = alert {
            self.fire_alert(notice).await;
        }
        outcome
    }

    /// `leave(queueId)` (spec §4.6).
    pub fn leave(&self, queue_id: QueueId) -> Result<(), CallCoreError> {
        let mut state = self.state.lock();
        let index = state
            .queue
            .iter()
            .position(|entry| entry.queue_id == queue_id)
            .ok_or(CallCoreError::QueueEntryNotFound)?;
        state.queue.remove(index);
        renumber(&mut state.queue);
        Ok(())
    }

    /// `leaveByUser(userId, kind)` (spec §4.6).
    pub fn leave_by_user(&self, user_id: MemberId, call_kind: CallKind) -> Result<(), CallCoreError> {
        let mut state = self.state.lock();
        let index = state
            .queue
            .iter()
            .position(|entry| entry.user_id == user_id && entry.call_kind == call_kind)
            .ok_or(CallCoreError::QueueEntryNotFound)?;
        state.queue.remove(index);
        renumber(&mut state.queue);
        Ok(())
    }

    /// `position(queueId)` (spec §4.6).
    pub fn position(&self, queue_id: QueueId) -> Option<QueueWaitInfo> {
        let state = self.state.lock();
        let total_in_queue = state.queue.len();
        state
            .queue
            .iter()
            .find(|entry| entry.queue_id == queue_id)
            .map(|entry| self.wait_info(entry, total_in_queue))
    }

    /// `checkTurn(queueId)` (spec §4.6).
    pub fn check_turn(&self, queue_id: QueueId) -> Result<bool, CallCoreError> {
        let state = self.state.lock();
        let entry = state
            .queue
            .iter()
            .find(|entry| entry.queue_id == queue_id)
            .ok_or(CallCoreError::QueueEntryNotFound)?;
        Ok(entry.position == 1 && state.active < self.config.max_concurrent)
    }

    /// `recordingStarted(userId, kind)` (spec §4.6).
    pub fn recording_started(&self, user_id: MemberId, call_kind: CallKind) {
        let mut state = self.state.lock();
        state.active += 1;
        if let Some(index) = state
            .queue
            .iter()
            .position(|entry| entry.user_id == user_id && entry.call_kind == call_kind)
        {
            state.queue.remove(index);
            renumber(&mut state.queue);
        }
    }

    /// `recordingEnded()` (spec §4.6).
    pub fn recording_ended(&self) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
    }

    /// `syncActive(count)` (spec §4.6).
    pub fn sync_active(&self, count: usize) {
        self.state.lock().active = count;
    }

    /// `sweep()` (spec §4.6): drop entries older than `QueueTimeoutMs` and renumber.
    pub fn sweep(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let timeout = self.config.queue_timeout;
        state
            .queue
            .retain(|entry| (now - entry.enqueued_at).to_std().unwrap_or(Duration::ZERO) < timeout);
        renumber(&mut state.queue);
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.config.cleanup_interval
    }
}

fn renumber(queue: &mut [QueueEntry]) {
    for (index, entry) in queue.iter_mut().enumerate() {
        entry.position = index + 1;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;

    struct NoopNotifier;

    #[async_trait]
    impl Notifier for NoopNotifier {
        async fn notify_incoming_call(
            &self,
            _call: &nestcall_types_signaling::Call,
            _to: MemberId,
        ) -> Result<(), nestcall_signaling_core::CoreError> {
            Ok(())
        }

        async fn notify_queue_pressure(&self, _notice: QueuePressureNotice) -> Result<(), nestcall_signaling_core::CoreError> {
            Ok(())
        }
    }

    struct FixedClock(Timestamp);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            self.0
        }
    }

    fn queue(max_concurrent: usize) -> RecordingQueue {
        RecordingQueue::new(
            RecordingQueueConfig::new(max_concurrent, MemberId::generate()),
            Arc::new(NoopNotifier),
            Arc::new(FixedClock(Timestamp::from_timestamp(0, 0).unwrap())),
        )
    }

    #[tokio::test]
    async fn admits_immediately_under_capacity() {
        let q = queue(2);
        let outcome = q.admit(MemberId::generate(), GroupId::generate(), CallKind::Video, vec![], "U".into(), "u@x".into()).await;
        assert!(!outcome.needs_queue);
    }

    #[tokio::test]
    async fn queue_overflow_assigns_sequential_positions() {
        let q = queue(2);
        q.sync_active(2);
        let u_id = MemberId::generate();
        let v_id = MemberId::generate();
        let u = q
            .admit(u_id, GroupId::generate(), CallKind::Video, vec![], "U".into(), "u@x".into())
            .await;
        assert!(u.needs_queue);
        assert_eq!(u.queue.as_ref().unwrap().position, 1);
        assert_eq!(u.queue.as_ref().unwrap().total_in_queue, 1);

        let v = q
            .admit(v_id, GroupId::generate(), CallKind::Video, vec![], "V".into(), "v@x".into())
            .await;
        assert_eq!(v.queue.as_ref().unwrap().position, 2);
        assert_eq!(v.queue.as_ref().unwrap().total_in_queue, 2);

        q.recording_ended();
        let u_queue_id = u.queue.unwrap().queue_id;
        assert!(q.check_turn(u_queue_id).unwrap());

        q.recording_started(u_id, CallKind::Video);
        let v_queue_id = v.queue.unwrap().queue_id;
        let v_snapshot = q.position(v_queue_id).unwrap();
        assert_eq!(v_snapshot.position, 1);
        assert_eq!(v_snapshot.total_in_queue, 1);
    }

    #[tokio::test]
    async fn dedup_returns_the_same_entry() {
        let q = queue(1);
        q.sync_active(1);
        let user = MemberId::generate();
        let first = q
            .admit(user, GroupId::generate(), CallKind::Video, vec![], "U".into(), "u@x".into())
            .await;
        let second = q
            .admit(user, GroupId::generate(), CallKind::Video, vec![], "U".into(), "u@x".into())
            .await;
        assert_eq!(first.queue.unwrap().queue_id, second.queue.unwrap().queue_id);
        assert_eq!(q.status().queue_len, 1);
    }

    #[test]
    fn sweep_drops_timed_out_entries_and_renumbers() {
        let q = RecordingQueue::new(
            RecordingQueueConfig {
                max_concurrent: 1,
                queue_timeout: Duration::from_millis(10),
                cleanup_interval: Duration::from_secs(30),
                alert_cooldown: Duration::from_secs(300),
                alert_recipient: MemberId::generate(),
            },
            Arc::new(NoopNotifier),
            Arc::new(FixedClock(Timestamp::from_timestamp(0, 0).unwrap())),
        );
        {
            let mut state = q.state.lock();
            state.queue.push(QueueEntry {
                queue_id: QueueId::generate(),
                user_id: MemberId::generate(),
                group_id: GroupId::generate(),
                call_kind: CallKind::Video,
                intended_participants: vec![],
                display_name: String::new(),
                email: String::new(),
                enqueued_at: Timestamp::from_timestamp(0, 0).unwrap() - chrono::Duration::seconds(1),
                position: 1,
            });
        }
        q.sweep();
        assert_eq!(q.status().queue_len, 0);
    }
}
