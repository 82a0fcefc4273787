use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Install a global `fmt` subscriber, honouring `RUST_LOG` and falling back to `info`.
///
/// `json = true` emits flattened JSON events for log shippers; otherwise a
/// compact human-readable format is used.
pub fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = fmt::fmt().with_env_filter(filter).with_target(true);

    if json {
        builder
            .json()
            .flatten_event(true)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))
    } else {
        builder
            .compact()
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))
    }
}
