//! The agent's logging sink.
//!
//! Every record the agent emits goes through [`loge!`](crate::loge): one
//! ERROR-level `tracing` event with target [`TAG`]. The subscriber is only
//! installed if the host process has not installed one already.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Target of every record emitted by the agent.
pub const TAG: &str = "pcall";

const DEFAULT_FILTER: &str = "pcall=info";

/// Emits one record on the agent's error channel.
#[macro_export]
macro_rules! loge {
    ($($arg:tt)+) => {
        ::tracing::error!(target: "pcall", $($arg)+)
    };
}

/// Installs the global subscriber.
///
/// Filter precedence: `filter` (from the `log=` option), then `RUST_LOG`, then
/// `pcall=info`. Records go to `log_file` when given and openable, else stderr;
/// a log file that cannot be opened is reported once.
pub fn init(filter: Option<&str>, log_file: Option<&Path>) {
    let filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let mut unopened = None;
    let writer = match log_file.map(|p| (p, OpenOptions::new().create(true).append(true).open(p))) {
        Some((_, Ok(file))) => BoxMakeWriter::new(std::sync::Mutex::new(file)),
        Some((path, Err(err))) => {
            unopened = Some((path, err));
            BoxMakeWriter::new(std::io::stderr)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    // A host that already owns the global subscriber keeps it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .without_time()
        .try_init();

    if let Some((path, err)) = unopened {
        crate::loge!("Cannot open log file {}: {}, logging to stderr", path.display(), err);
    }
}
