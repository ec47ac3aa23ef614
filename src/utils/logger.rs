use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
///
/// `json` switches to one JSON object per line, for runs collected by another tool.
pub fn init_logger(verbose: bool, json: bool) {
    let default = if verbose { "acc_pmo=debug,info" } else { "acc_pmo=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let output = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(output.json()).init();
    } else {
        registry.with(output.compact()).init();
    }
}
