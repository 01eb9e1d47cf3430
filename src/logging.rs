//! Tracing subscriber setup.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build tracing-subscriber filter directives from the logging config.
///
/// The base level applies globally; component levels narrow to this crate's
/// modules, e.g. `{"orchestrator": "debug"}` yields
/// `info,quorum::orchestrator=debug`.
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",quorum::{}={}", component, level));
        }
    }

    filter_str
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured directives.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = build_filter_directives(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn directives_without_components() {
        let config = LoggingConfig::default();
        assert_eq!(build_filter_directives(&config), "info");
    }

    #[test]
    fn directives_with_components_are_sorted() {
        let mut component_levels = HashMap::new();
        component_levels.insert("retry".to_string(), "trace".to_string());
        component_levels.insert("orchestrator".to_string(), "debug".to_string());

        let config = LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
            component_levels: Some(component_levels),
        };

        assert_eq!(
            build_filter_directives(&config),
            "warn,quorum::orchestrator=debug,quorum::retry=trace"
        );
    }
}
