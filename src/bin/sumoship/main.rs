#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]

use std::env;
use std::io::{Error, ErrorKind, Result};
use std::path::Path;
use std::sync::Arc;

use sumoship::{
    config::{self, Config},
    input, logger,
    logs::failure::FailureSink,
    transport::{SumoLogicTransport, Transport},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_DIR: &str = "/etc/sumoship";

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    enable_logging_subsystem(&config)?;

    let transport = SumoLogicTransport::new(Arc::clone(&config), FailureSink::Silent)
        .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => forward(&transport, &line),
                Ok(None) => {
                    debug!("Input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        }
    }

    transport.close().await;
    let left = transport.shipper().pending_len();
    if left > 0 {
        warn!("Exiting with {left} log entries not shipped");
    }
    Ok(())
}

fn forward(transport: &SumoLogicTransport, line: &str) {
    let Some(parsed) = input::parse_line(line) else {
        return;
    };
    if let Err(e) = transport.log(&parsed.level, &parsed.message, parsed.meta) {
        error!("Rejected log line: {e}");
    }
}

fn load_config() -> Result<Arc<Config>> {
    let config_directory =
        env::var("SUMO_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    config::get_config(Path::new(&config_directory))
        .map(Arc::new)
        .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))
}

fn enable_logging_subsystem(config: &Arc<Config>) -> Result<()> {
    let env_filter = format!(
        "h2=off,hyper=off,rustls=off,reqwest=off,{}",
        config.log_level.as_filter_directive()
    );
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter)
                .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))?,
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(false)
        .without_time()
        .event_format(logger::Formatter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::other(e.to_string()))?;

    debug!("Logging subsystem enabled");
    Ok(())
}
