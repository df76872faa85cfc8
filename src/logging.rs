use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Target of the lifecycle transition stream
pub const AUDIT_TARGET: &str = "FREIGHT_AUDIT";

fn filter_directive(config: &AppConfig) -> String {
    if config.enable_audit {
        config.log_level.clone()
    } else {
        format!("{},{}=off", config.log_level, AUDIT_TARGET)
    }
}

pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true) // audit events are selected by target
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enable_audit: bool) -> AppConfig {
        let mut cfg = AppConfig::parse(
            "log_level: debug\nlog_dir: ./logs\nlog_file: t.log\nuse_json: true\nrotation: never\ngateway: {host: 127.0.0.1, port: 1}\n",
        )
        .unwrap();
        cfg.enable_audit = enable_audit;
        cfg
    }

    #[test]
    fn test_audit_target_off_by_default() {
        assert_eq!(filter_directive(&config(false)), "debug,FREIGHT_AUDIT=off");
        assert_eq!(filter_directive(&config(true)), "debug");
    }
}
