//! Logging setup for the `suid` binary.
//!
//! Events from the library and the binary go to stderr through
//! `tracing_subscriber::fmt`, so stdout only ever carries command output.
//! Filtering follows `RUST_LOG` and defaults to `warn`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_line_number(true),
        )
        .try_init()?;
    Ok(())
}
