use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is unset: this crate at info (debug with `DEBUG=true`), HTTP traces at info.
pub fn default_log_directives(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("bookstore_api={},tower_http=info", level)
}

/// `RUST_LOG` wins whenever it parses; otherwise the defaults apply.
pub fn log_filter(debug: bool, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_log_directives(debug)))
}
