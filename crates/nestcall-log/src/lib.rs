//! Thin extension over the `log` facade macros.
//!
//! In addition to the usual global-logger form (`error!("...")`), every macro here
//! accepts a `log:` argument pointing at a specific [`log::Log`] implementation, so a
//! component that holds its own per-call or per-request logger can still use the
//! familiar macro call shape.

#![warn(missing_debug_implementations, unsafe_code, unused)]

use log::Log;

mod subscriber;

pub use subscriber::{init_subscriber, LogFormat};

#[doc(hidden)]
pub fn __private_api_log(
    logger: &dyn Log,
    args: std::fmt::Arguments,
    level: log::Level,
    &(target, module_path, file, line): &(&str, &'static str, &'static str, u32),
) {
    logger.log(
        &log::Record::builder()
            .args(args)
            .level(level)
            .target(target)
            .module_path_static(Some(module_path))
            .file_static(Some(file))
            .line(Some(line))
            .build(),
    );
}

/// Standard logging macro, with an optional `log: <&dyn Log>` argument to target a
/// specific logger instead of the global one.
#[macro_export]
macro_rules! log {
    (target: $target:expr, log: $logger:expr, $lvl:expr, $($arg:tt)+) => ({
        let logger = $logger;
        let lvl = $lvl;
        if lvl <= ::log::STATIC_MAX_LEVEL {
            $crate::__private_api_log(
                logger,
                ::log::__private_api::format_args!($($arg)+),
                lvl,
                &($target, ::log::__private_api::module_path!(), ::log::__private_api::file!(), ::log::__private_api::line!()),
            );
        }
    });

    (target: $target:expr, $lvl:expr, $($arg:tt)+) => ($crate::log!(target: $target, log: ::log::logger(), $lvl, $($arg)+));

    (log: $logger:expr, $lvl:expr, $($arg:tt)+) => ($crate::log!(target: ::log::__private_api::module_path!(), log: $logger, $lvl, $($arg)+));

    ($lvl:expr, $($arg:tt)+) => ($crate::log!(target: ::log::__private_api::module_path!(), log: ::log::logger(), $lvl, $($arg)+));
}

/// Log a message at the error level, optionally against a specific logger.
#[macro_export]
macro_rules! error {
    (log: $logger:expr, $($arg:tt)+) => ($crate::log!(log: $logger, ::log::Level::Error, $($arg)+));
    ($($arg:tt)+) => ($crate::log!(::log::Level::Error, $($arg)+));
}

/// Log a message at the warn level, optionally against a specific logger.
#[macro_export]
macro_rules! warn {
    (log: $logger:expr, $($arg:tt)+) => ($crate::log!(log: $logger, ::log::Level::Warn, $($arg)+));
    ($($arg:tt)+) => ($crate::log!(::log::Level::Warn, $($arg)+));
}

/// Log a message at the info level, optionally against a specific logger.
#[macro_export]
macro_rules! info {
    (log: $logger:expr, $($arg:tt)+) => ($crate::log!(log: $logger, ::log::Level::Info, $($arg)+));
    ($($arg:tt)+) => ($crate::log!(::log::Level::Info, $($arg)+));
}

/// Log a message at the debug level, optionally against a specific logger.
#[macro_export]
macro_rules! debug {
    (log: $logger:expr, $($arg:tt)+) => ($crate::log!(log: $logger, ::log::Level::Debug, $($arg)+));
    ($($arg:tt)+) => ($crate::log!(::log::Level::Debug, $($arg)+));
}

/// Log a message at the trace level, optionally against a specific logger.
#[macro_export]
macro_rules! trace {
    (log: $logger:expr, $($arg:tt)+) => ($crate::log!(log: $logger, ::log::Level::Trace, $($arg)+));
    ($($arg:tt)+) => ($crate::log!(::log::Level::Trace, $($arg)+));
}
