// Logging initialization shared by the server and the client commands
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Client commands: silent unless `--verbose`.
    Quiet,
    /// Long running server: `info` by default.
    Service,
    Verbose,
}

impl LogMode {
    fn levels(self) -> (LevelFilter, &'static str) {
        match self {
            LogMode::Quiet => (LevelFilter::OFF, "off"),
            LogMode::Service => (LevelFilter::INFO, "info"),
            LogMode::Verbose => (LevelFilter::DEBUG, "debug"),
        }
    }
}

pub fn init_logging(mode: LogMode) {
    let (level_filter, level) = mode.levels();
    let env_filter = EnvFilter::try_from_default_env().ok();
    // Without RUST_LOG only our own crates and the HTTP trace layer log.
    let app_filter = env_filter.is_none().then(|| {
        Targets::new()
            .with_target("xrate", level_filter)
            .with_target("tower_http", level_filter)
    });
    let env_filter = env_filter.unwrap_or_else(|| EnvFilter::new(level));

    let fmt_layer = fmt::layer().with_target(mode == LogMode::Verbose);
    let registry = tracing_subscriber::registry().with(app_filter).with(env_filter);
    if mode == LogMode::Service {
        registry.with(fmt_layer.compact()).init();
    } else {
        registry.with(fmt_layer.pretty().without_time()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_mode_levels() {
        assert_eq!(LogMode::Quiet.levels(), (LevelFilter::OFF, "off"));
        assert_eq!(LogMode::Service.levels(), (LevelFilter::INFO, "info"));
        assert_eq!(LogMode::Verbose.levels(), (LevelFilter::DEBUG, "debug"));
    }
}
