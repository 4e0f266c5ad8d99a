use chrono::{DateTime, Utc};

/// A UTC point in time.
///
/// The core never measures wall-clock time itself (see `nestcall_signaling_core::clock`);
/// this alias only exists so every crate names the concept the same way.
pub type Timestamp = DateTime<Utc>;
