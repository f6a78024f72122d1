//! Log output for the server.
//!
//! Events from the server and from `idpool` (built with its `tracing`
//! feature) go through one `tracing_subscriber` registry. Verbosity follows
//! `RUST_LOG` and defaults to `info`; `idpool=debug` shows refills and source
//! failures, `idpool=trace` also shows every buffer switch.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(json: bool) -> anyhow::Result<()> {
    // Only one of the two fmt layers is installed.
    let pretty = (!json).then(|| {
        fmt::layer()
            .with_thread_ids(true)
            .with_line_number(true)
            .with_target(false)
            .with_timer(fmt::time::ChronoLocal::rfc_3339())
            .with_file(true)
            .pretty()
    });
    let json = json.then(|| {
        fmt::layer()
            .with_thread_ids(true)
            .with_line_number(true)
            .with_timer(fmt::time::ChronoLocal::rfc_3339())
            .with_file(true)
            .json()
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(pretty)
        .with(json)
        .try_init()?;

    Ok(())
}
