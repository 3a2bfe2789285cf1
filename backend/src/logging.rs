use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

use crate::types::Environment;

/// Installs the global tracing subscriber
///
/// Deployed stages log JSON without ANSI colors so `CloudWatch` can parse the lines.
/// `RUST_LOG` overrides the default level from [`Environment::tracing_level`].
pub fn init_tracing(environment: &Environment) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(environment.tracing_level()).into())
        .from_env_lossy();

    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_ansi(false)
                .with_current_span(false)
                .with_env_filter(filter)
                .init();
        }
        Environment::Development { .. } => {
            fmt().with_env_filter(filter).init();
        }
    }
}
