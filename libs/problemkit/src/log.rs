//! Log levels, log-only problem data and the logging sink.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::Context;

/// Key under which a problem is passed to a [`ProblemLogger`] when the
/// generator does not configure one.
pub const DEFAULT_LOG_ARG_KEY: &str = "problem";

/// Severity a problem is logged with. Defaults to [`LogLevel::Error`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    #[default]
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Data carried by a problem purely for logging.
///
/// `stack` and `uuid` are only populated when the corresponding
/// [`Flags`](crate::Flags) include [`Flags::LOG`](crate::Flags::LOG).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogInfo {
    pub level: LogLevel,
    pub stack: String,
    pub uuid: String,
}

/// Sink receiving problems to be logged.
///
/// `fields` always contains the problem's log view under the generator's log
/// argument key, next to any caller-supplied fields.
pub trait ProblemLogger: Send + Sync {
    fn log(&self, ctx: &Context, level: LogLevel, message: &str, fields: &Map<String, Value>);
}

impl<F> ProblemLogger for F
where
    F: Fn(&Context, LogLevel, &str, &Map<String, Value>) + Send + Sync,
{
    fn log(&self, ctx: &Context, level: LogLevel, message: &str, fields: &Map<String, Value>) {
        self(ctx, level, message, fields);
    }
}

/// Emits one `tracing` event per logged problem, under the
/// `problemkit` target, with all fields rendered as a JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ProblemLogger for TracingLogger {
    fn log(&self, _ctx: &Context, level: LogLevel, message: &str, fields: &Map<String, Value>) {
        let fields = Value::Object(fields.clone());
        match level {
            LogLevel::Debug => tracing::debug!(target: "problemkit", fields = %fields, "{message}"),
            LogLevel::Info => tracing::info!(target: "problemkit", fields = %fields, "{message}"),
            LogLevel::Warn => tracing::warn!(target: "problemkit", fields = %fields, "{message}"),
            LogLevel::Error => tracing::error!(target: "problemkit", fields = %fields, "{message}"),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl ProblemLogger for NoopLogger {
    fn log(&self, _ctx: &Context, _level: LogLevel, _message: &str, _fields: &Map<String, Value>) {}
}
