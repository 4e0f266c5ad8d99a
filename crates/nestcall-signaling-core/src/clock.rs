use nestcall_types_common::Timestamp;

/// Wall-clock time, injected so that state-machine and queue tests can hold time
/// fixed instead of racing `Utc::now()` (spec §8 "deterministic... tests").
///
/// Mirrors the same dependency-injection shape as the other capabilities in this
/// crate: production code wires up [`SystemClock`], tests wire up a fake.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The production [`Clock`]: the actual system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}
