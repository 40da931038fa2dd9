pub mod paths;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
///
/// `RUST_LOG` wins when set; otherwise `split_ledger=info` is used. Installing a
/// subscriber twice (e.g. from tests) is ignored rather than treated as fatal.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("split_ledger=info"));

        let _ = fmt().with_env_filter(filter).try_init();
    });
}
