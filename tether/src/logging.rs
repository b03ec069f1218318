use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global `tracing` subscriber which logs to stderr, for binaries which don't bring their own.
///
/// Filtering follows `RUST_LOG` if it's set, and defaults to `info` otherwise. Thread names are included, since
/// nearly everything interesting here is about which thread something happened on.
///
/// Returns `false` (and changes nothing) if a global subscriber was already installed.
pub fn trace_init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        // another test may have gotten there first, which is fine; after this, though, it's definitely taken
        trace_init();
        assert!(!trace_init());
    }
}
