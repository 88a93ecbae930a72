use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_directive` when set.
///
/// Calling this more than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
