use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

static INIT: OnceLock<()> = OnceLock::new();

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize `tracing` on stderr; `RUST_LOG` overrides the `-v` count.
pub fn init(verbose: u8) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
        let subscriber = Registry::default().with(filter).with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        );
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            // Ignore error if a subscriber is already set (e.g., tests).
        }
    });
}
