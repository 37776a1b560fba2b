// src/main.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use tokio::io::BufReader;
use tracing::{info, warn};

use securitytxt_scanner::alert::{AlertPublisher, JsonLinesPublisher};
use securitytxt_scanner::config::{Config, ScannerContext};
use securitytxt_scanner::logging;
use securitytxt_scanner::store::{DatalakeStore, MemoryStore, ResultStore};
use securitytxt_scanner::worker::Worker;

/// Reads one JSON scan request per stdin line and handles each in its own task.
/// Alerts are written to stdout as JSON lines, logs go to stderr.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::initialize_logging().wrap_err("failed to initialize logging")?;

    let config_path = config_path_from_args(std::env::args().skip(1));
    let config = Config::load(config_path.as_deref()).wrap_err("failed to load configuration")?;
    let context = ScannerContext::from_config(&config)?;

    let store: Arc<dyn ResultStore> = match &config.storage.endpoint {
        Some(endpoint) => Arc::new(
            DatalakeStore::new(endpoint, Duration::from_secs(config.scanner.request_timeout))
                .wrap_err("failed to set up datalake storage")?,
        ),
        None => {
            warn!("No storage endpoint configured, results are kept in memory only.");
            Arc::new(MemoryStore::new())
        }
    };
    let publisher: Arc<dyn AlertPublisher> = Arc::new(JsonLinesPublisher::new(tokio::io::stdout()));
    let worker = Arc::new(Worker::new(&context, store, publisher).wrap_err("failed to build HTTP client")?);

    info!("Waiting for scan requests on stdin.");
    let dispatched = worker.serve(BufReader::new(tokio::io::stdin())).await;
    info!(dispatched, "Input closed, all scan requests handled.");
    Ok(())
}

/// `--config <path>` if present.
fn config_path_from_args(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}
