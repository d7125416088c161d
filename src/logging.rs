use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "MARKOV_COHORT_LOG";

static INIT: Once = Once::new();

/// Install the global tracing subscriber.
///
/// Filter directives come from `MARKOV_COHORT_LOG`, e.g.
/// `MARKOV_COHORT_LOG=markov_cohort::cohort=debug`. Falls back to
/// `markov_cohort=info`. Logs go to stderr so stdout carries only results.
/// Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("markov_cohort=info"));

        // a subscriber installed by the host process wins
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .with(filter)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!("tracing initialised twice without panicking");
    }
}
