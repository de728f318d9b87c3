use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays parseable.
pub(crate) fn init_logging(verbose: bool) {
    let directive = log_directive(
        verbose,
        std::env::var("SKILLMGR_LOG").ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(crate) fn log_directive(
    verbose: bool,
    skillmgr_log: Option<String>,
    rust_log: Option<String>,
) -> String {
    [skillmgr_log, rust_log]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| default_directive(verbose).to_string())
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}
