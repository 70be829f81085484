//! Log sink used by the dispatcher.

use std::fmt;

use jsh_domain::RequestContext;
use tracing::{error, info, warn};

/// Level of a dispatcher log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Destination for the dispatcher's leveled log entries.
///
/// Injected into every resource node through the [`Dispatcher`](super::Dispatcher);
/// the default is [`TracingSink`].
pub trait LogSink: Send + Sync + 'static {
    fn log(&self, level: LogLevel, ctx: &RequestContext, message: &str);
}

/// Forwards entries to `tracing` under the `jsh::dispatch` target.
///
/// `Critical` has no `tracing` level of its own; it is emitted at `ERROR`
/// with a `severity = "critical"` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, ctx: &RequestContext, message: &str) {
        let request_id = ctx.request_id().unwrap_or("-");
        let method = ctx.method();
        let path = ctx.path();

        match level {
            LogLevel::Info => {
                info!(target: "jsh::dispatch", request_id, method, path, "{message}")
            }
            LogLevel::Warning => {
                warn!(target: "jsh::dispatch", request_id, method, path, "{message}")
            }
            LogLevel::Error => {
                error!(target: "jsh::dispatch", request_id, method, path, "{message}")
            }
            LogLevel::Critical => error!(
                target: "jsh::dispatch",
                severity = "critical",
                request_id,
                method,
                path,
                "{message}"
            ),
        }
    }
}
