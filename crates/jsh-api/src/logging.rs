//! Logging setup.
//!
//! Two output formats are supported:
//!
//! - text (pretty, multi-line) for local development
//! - JSON, one object per line:
//!
//! ```json
//! {"timestamp":"...","level":"WARN","fields":{"message":"GET /users/7 -> 404: ..."},"target":"jsh::dispatch"}
//! ```
//!
//! `RUST_LOG` always wins over the configured default level.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// JSON output instead of text.
    pub json_format: bool,
    /// Level used when `RUST_LOG` is not set.
    pub default_level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            default_level: Level::INFO,
        }
    }
}

/// Installs the global subscriber.
///
/// Only the first call has an effect.
pub fn init_logging(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));

    let _ = tracing_subscriber::registry()
        .with(format_layer(config.json_format))
        .with(filter)
        .try_init();
}

fn format_layer(json: bool) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer().with_target(true);
    if json {
        layer
            .json()
            .with_current_span(true)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    } else {
        layer.pretty().boxed()
    }
}

/// A JSON subscriber writing to `writer`, for capturing log output in tests.
pub fn create_json_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use jsh_domain::RequestContext;

    use crate::dispatch::{LogLevel, LogSink, TracingSink};

    #[derive(Clone, Default)]
    struct CaptureWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl CaptureWriter {
        fn lines(&self) -> Vec<serde_json::Value> {
            let buffer = self.buffer.lock().unwrap();
            String::from_utf8_lossy(&buffer)
                .lines()
                .filter(|line| !line.is_empty())
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.buffer.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_logging_config_defaults_to_info_text() {
        let config = LoggingConfig::default();
        assert!(!config.json_format);
        assert_eq!(config.default_level, Level::INFO);
    }

    #[test]
    fn test_tracing_sink_levels() {
        let writer = CaptureWriter::default();
        let subscriber = create_json_subscriber(writer.clone());
        let (ctx, _guard) = RequestContext::new(Some("req-9".into()), "GET", "/users/7", Vec::new());

        tracing::subscriber::with_default(subscriber, || {
            TracingSink.log(LogLevel::Warning, &ctx, "client fault");
            TracingSink.log(LogLevel::Critical, &ctx, "server fault");
        });

        let lines = writer.lines();
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0]["level"], "WARN");
        assert_eq!(lines[0]["target"], "jsh::dispatch");
        assert_eq!(lines[0]["fields"]["message"], "client fault");
        assert_eq!(lines[0]["fields"]["request_id"], "req-9");

        assert_eq!(lines[1]["level"], "ERROR");
        assert_eq!(lines[1]["fields"]["severity"], "critical");
    }
}
