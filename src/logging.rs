use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn,courtline=info";

/// Logs go to stderr so JSON on stdout stays machine-readable. `RUST_LOG`
/// overrides the default filter.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// `.env.local` wins over `.env`; both are optional.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}
