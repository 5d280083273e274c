//! Tracing subscriber setup shared by both binaries.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global tracing subscriber writing to stdout.
pub fn init_tracing(logging: &LoggingConfig) {
    init_tracing_with_writer(logging, std::io::stdout);
}

/// Install the global tracing subscriber writing to `writer`.
///
/// `RUST_LOG` takes precedence over `logging.level`.  `logging.format`
/// selects between the human-readable and JSON formatters.
pub fn init_tracing_with_writer<W>(logging: &LoggingConfig, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
