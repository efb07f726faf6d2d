pub mod build_info;
pub mod paths;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global `fmt` subscriber, filtered by `RUST_LOG` with
/// `billing_core=info` as the floor for this crate. Logs go to stderr so
/// command output on stdout stays clean.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::from_default_env().add_directive(
            "billing_core=info"
                .parse()
                .expect("static directive is valid"),
        );

        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
