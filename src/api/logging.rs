use anyhow::Context;
use std::path::Path;
use tracing::level_filters::LevelFilter;

/// Install the global tracing subscriber.
///
/// With a log directory, logs go to a daily rolling file; otherwise to stderr.
/// Calling this again after a subscriber is installed is a no-op.
pub fn init_logging(log_dir: Option<&Path>) -> anyhow::Result<()> {
    let level = resolve_log_level();

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, "network_inspector");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // Logging lasts until process exit.
            std::mem::forget(guard);
            let _ = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(non_blocking)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }

    tracing::info!("Network inspector core v{} logging at {}", crate::VERSION, level);
    Ok(())
}

pub(crate) fn resolve_log_level() -> LevelFilter {
    match std::env::var("RUST_LOG") {
        Ok(val) => parse_level(&val),
        Err(_) => LevelFilter::INFO,
    }
}

fn parse_level(val: &str) -> LevelFilter {
    match val.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level("warning"), LevelFilter::WARN);
        assert_eq!(parse_level("network_inspector_core=trace"), LevelFilter::INFO);
    }

    #[test]
    fn init_twice_is_tolerated() {
        let dir = tempfile::tempdir().expect("temp dir");
        init_logging(Some(dir.path())).expect("first init");
        init_logging(None).expect("second init");
    }
}
