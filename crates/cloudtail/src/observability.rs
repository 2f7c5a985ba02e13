use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

fn resolve_env_filter() -> tracing_subscriber::EnvFilter {
    if let Ok(level) = std::env::var("CLOUDTAIL_LOG")
        && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
    {
        return filter;
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize console logging once per process.
///
/// Environment variables:
/// - `CLOUDTAIL_LOG`: optional level/filter override (`info`, `debug`, etc.).
/// - `RUST_LOG`: standard filter override.
///
/// The library only emits `tracing` events and never installs a subscriber
/// on its own; binaries and examples opt in by calling this.
pub fn init_logging() {
    INIT.get_or_init(|| {
        let console_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stdout);
        let _ = tracing_subscriber::registry()
            .with(resolve_env_filter())
            .with(console_layer)
            .try_init();
    });
}
