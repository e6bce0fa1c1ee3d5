//! Operator entry-point: loads settings, wires adapters and runs the
//! control loop over the watch stream read from standard input.

use std::io;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use operator::domain::{Reconciler, SqlProvisioner};
use operator::inbound::{Controller, read_watch_events};
use operator::outbound::informer::InMemoryInformerCache;
use operator::outbound::postgres::PostgresConnector;
use operator::outbound::status::JsonLinesStatusWriter;
use operator::settings::OperatorSettings;

const EVENT_BUFFER: usize = 256;

/// Application bootstrap.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = OperatorSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load operator settings: {err}"))?;
    let validated = settings
        .validate()
        .wrap_err("invalid operator settings")?;
    info!(
        host = validated.operator.target_host(),
        grant_to_admin = validated.operator.admin_grantee().is_some(),
        max_concurrent_reconciles = validated.controller.max_concurrent_reconciles,
        "Starting tenant operator"
    );

    let cache = Arc::new(InMemoryInformerCache::new());
    let provisioner = Arc::new(SqlProvisioner::new(
        PostgresConnector::new(validated.connection),
        &validated.operator,
    ));
    let status = Arc::new(JsonLinesStatusWriter::new(io::stdout()));
    let reconciler = Arc::new(Reconciler::new(
        &validated.operator,
        provisioner,
        Arc::clone(&cache),
        status,
    ));
    let controller = Controller::new(cache, reconciler, validated.controller);

    let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
    let reader = std::thread::Builder::new()
        .name("watch-reader".to_owned())
        .spawn(move || read_watch_events(io::stdin().lock(), &sender))
        .wrap_err("failed to start watch reader")?;

    controller.run(receiver).await;

    match reader.join() {
        Ok(Ok(summary)) => info!(?summary, "Watch stream drained"),
        Ok(Err(err)) => error!(error = %err, "Watch stream ended with an error"),
        Err(_) => error!("Watch reader panicked"),
    }
    Ok(())
}
