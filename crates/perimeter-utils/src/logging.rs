//! Tracing initialization for the perimeter CLI and library consumers.

use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG` when set; otherwise defaults to `perimeter=debug,info`
/// in verbose mode and `perimeter=info,warn` otherwise. Safe to call once
/// per process; a second call returns an error from the subscriber
/// registry.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("perimeter=debug,info")
            } else {
                EnvFilter::try_new("perimeter=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_thread_ids(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_tolerant_of_repeat_calls() {
        // Only the first call in a process can win the global registry;
        // both outcomes are acceptable in a test binary.
        let first = init_tracing(false);
        let second = init_tracing(true);
        assert!(first.is_ok() || second.is_err());
    }
}
