//! Observability infrastructure for Corral.
//!
//! Structured logging with consistent spans across all components. The
//! metastore emits one span per operation carrying the database and table
//! being acted on.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `corral_metastore=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for metastore operations with standard fields.
///
/// # Example
///
/// ```rust
/// use corral_core::observability::metastore_span;
///
/// let span = metastore_span("drop_table", "sales", "orders");
/// let _guard = span.enter();
/// // ... do metastore operation
/// ```
#[must_use]
pub fn metastore_span(operation: &str, database: &str, table: &str) -> Span {
    tracing::info_span!(
        "metastore",
        op = operation,
        database = database,
        table = table,
    )
}
