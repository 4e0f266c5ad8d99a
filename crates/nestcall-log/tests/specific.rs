#[path = "utils.rs"]
mod utils;

use log::Level;
use nestcall_log::{debug, error, info, log, trace, warn};
use utils::DummyLogger;

#[test]
fn log_general() {
    let dummy = DummyLogger::new();

    log!(log: &dummy, Level::Warn, "Hello, {}", "world");

    assert_eq!(vec![(Level::Warn, String::from("Hello, world"))], dummy.entries());
}

#[test]
fn log_multiple_levels() {
    let dummy = DummyLogger::new();

    error!(log: &dummy, "Hello, {}", "error");
    warn!(log: &dummy, "Hello, {}", "warn");
    info!(log: &dummy, "Hello, {}", "info");
    debug!(log: &dummy, "Hello, {}", "debug");
    trace!(log: &dummy, "Hello, {}", "trace");

    assert_eq!(
        vec![
            (Level::Error, String::from("Hello, error")),
            (Level::Warn, String::from("Hello, warn")),
            (Level::Info, String::from("Hello, info")),
            (Level::Debug, String::from("Hello, debug")),
            (Level::Trace, String::from("Hello, trace")),
        ],
        dummy.entries()
    );
}

#[test]
fn log_to_different_loggers() {
    let dummy_a = DummyLogger::new();
    let dummy_b = DummyLogger::new();

    error!(log: &dummy_a, "goes to a");
    error!(log: &dummy_b, "goes to b");

    assert_eq!(vec![(Level::Error, String::from("goes to a"))], dummy_a.entries());
    assert_eq!(vec![(Level::Error, String::from("goes to b"))], dummy_b.entries());
}
