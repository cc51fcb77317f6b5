use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr so stdout stays clean for reports and `--json`.
/// `RUST_LOG` overrides the level picked from the command line.
pub fn init(debug: bool) {
    let default = if debug { "diskdoctor=debug" } else { "diskdoctor=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
