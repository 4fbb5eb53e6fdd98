pub mod call; // Consultation video call state
pub mod config;
pub mod models;
pub mod queue; // Provider queue synchronizer
pub mod relative_time;
pub mod store; // Durable local key/value store
pub mod triage; // Voice triage capture

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
