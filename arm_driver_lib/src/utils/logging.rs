//! Tracing initialization shared by the driver nodes.
//!
//! Uses a thread-local subscriber so it does not fight with Dora's own
//! global tracing setup.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with a thread-local subscriber.
///
/// Respects `RUST_LOG` (defaults to "info") and prints compact lines without
/// targets, files or line numbers.
///
/// The returned guard keeps the subscriber active and must stay in scope for
/// the lifetime of the node.
///
/// # Example
/// ```no_run
/// use arm_driver_lib::init_tracing;
///
/// fn main() {
///     let _guard = init_tracing();
///     // node code here
/// }
/// ```
pub fn init_tracing() -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_default(subscriber)
}
