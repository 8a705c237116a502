//! Process wide tracing setup driven by the `log_filter` setting

use tracing_subscriber::EnvFilter;

/// Install a stdout subscriber. `RUST_LOG` takes precedence over `filter`.
/// Returns false when a global subscriber was already installed.
pub fn init_logging(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_tolerated() {
        init_logging("info");
        assert!(!init_logging("debug"));
    }
}
