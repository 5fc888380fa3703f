//! Log output for processes embedding the extension manager.
//!
//! Filter directives come from `EXTMAN_LOG`, then `RUST_LOG`; without either
//! only the extension manager's own crates log at `info`.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable read before `RUST_LOG`.
pub const ENV_VAR: &str = "EXTMAN_LOG";

const DEFAULT_DIRECTIVES: &str = "warn,extman_core=info,extman_job=info";

fn filter(directives: Option<&str>) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(directives.unwrap_or(DEFAULT_DIRECTIVES))
}

/// Install a compact stderr subscriber.
///
/// Thread names are shown since every job runs on its own `extman-job-*`
/// thread. Fails if a global subscriber is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let directives = std::env::var(ENV_VAR)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .compact();

    tracing_subscriber::registry()
        .with(filter(directives.as_deref())?)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
