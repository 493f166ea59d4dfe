use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use ::tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// Honours `RUST_LOG`, defaulting to `info`. Output goes to stderr so report
/// JSON written to stdout by a caller stays clean; ANSI colours are only used
/// when stderr is a terminal. Calling this more than once is harmless.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        debug!("global tracing subscriber already installed");
    }

    Ok(())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span covering one batch run
pub fn batch_span(total_tasks: usize, max_concurrency: usize) -> Span {
    span!(Level::INFO, "batch", total_tasks = %total_tasks, max_concurrency = %max_concurrency)
}

/// Span covering one recipe execution inside a batch
pub fn recipe_span(identifier: &str, worker: usize) -> Span {
    span!(Level::INFO, "recipe", recipe = %identifier, worker = %worker)
}

/// Span covering one workflow step
pub fn step_span(name: &str, index: usize) -> Span {
    span!(Level::INFO, "step", step = %name, index = %index)
}

/// Span covering the resolution of one root recipe
pub fn resolve_span(root: &str) -> Span {
    span!(Level::DEBUG, "resolve", root = %root)
}

/// Emit a structured event for recipe completion
pub fn recipe_completed(identifier: &str, duration_ms: u64, success: bool) {
    if success {
        info!(
            recipe = %identifier,
            duration_ms = %duration_ms,
            "recipe_completed"
        );
    } else {
        error!(
            recipe = %identifier,
            duration_ms = %duration_ms,
            "recipe_failed"
        );
    }
}
