//! Tracing subscriber setup shared by the server and the headless driver

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `log_level`;
/// `LOG_FORMAT=json` switches to structured output.
pub fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    let registry = tracing_subscriber::registry().with(env_filter);

    // A second call (tests, embedding) keeps the first subscriber
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing already initialised");
    }
}
