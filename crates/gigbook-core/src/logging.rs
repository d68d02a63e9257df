use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` takes precedence over `default_filter`, which falls back to `info`.
pub fn init_logging(default_filter: Option<&str>) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), default_filter);
    let _ = fmt().with_env_filter(filter).try_init();
}

fn build_filter(rust_log: Option<&str>, default_filter: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter.unwrap_or("info")))
}
