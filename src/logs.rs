use super::*;

/// Installs the stderr subscriber. Log lines are written from a background
/// thread, so the returned guard must live until exit to flush them.
pub(crate) fn init() -> tracing_appender::non_blocking::WorkerGuard {
    let (writer, guard) = non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(writer)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    guard
}
