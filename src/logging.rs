//! Tracing initialization.
//!
//! Controlled by environment variables: `ORGQ_LOG` (falls back to
//! `RUST_LOG`) using the usual filter syntax. Defaults to `warn` when
//! neither is set. The `debug` query builtin logs at `info` under the
//! `orgq::query` target.

use std::sync::OnceLock;

use tracing_subscriber::{prelude::*, EnvFilter, Registry};

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber. Safe to call multiple times; only the
/// first call takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env("ORGQ_LOG")
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        Registry::default()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .with(filter)
            .init();
    });
}
