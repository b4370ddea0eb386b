//! Logging setup.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Setup logging with the given level.
///
/// `RUST_LOG` takes precedence over `level`. With `file`, events are also
/// written (without colours) through a non-blocking appender; keep the
/// returned guard alive until exit so buffered lines are flushed. A
/// subscriber installed earlier stays in place.
pub fn setup_logging(level: &str, json: bool, file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().pretty().boxed()
    });

    let guard = file.map(|path| {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let name = path.file_name().unwrap_or(path.as_os_str());
        let appender = tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        layers.push(if json { layer.json().boxed() } else { layer.boxed() });
        guard
    });

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zoombot.log");

        let guard = setup_logging("info", true, Some(&path));
        assert!(guard.is_some());
        tracing::info!(timeframe = "5m", "zoomed in");
        tracing::debug!("filtered out");
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("zoomed in"));
        assert!(contents.contains("\"timeframe\":\"5m\""));
        assert!(!contents.contains("filtered out"));
    }
}
