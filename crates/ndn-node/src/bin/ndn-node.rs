//! ndn-node: run one node session.
//!
//! Configuration comes from flags or the environment, see `--help`. The
//! process exits 0 once the session has drained, whatever the outcome;
//! failures are in the log.

use std::future::Future;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::EnvFilter;

use ndn_node::mgmt::DefaultConnector;
use ndn_node::{IdleWorkload, NodeArgs, SessionOutcome, Supervisor};

/// Installs the SIGINT handler immediately, so an interrupt during any
/// stage is caught; the returned future resolves on the first one.
fn shutdown_signal() -> impl Future<Output = ()> + Send {
    let interrupt = signal(SignalKind::interrupt());
    async move {
        match interrupt {
            Ok(mut interrupt) => {
                interrupt.recv().await;
                tracing::info!("stopped by ctrl+c");
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for ctrl+c");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = NodeArgs::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "bad configuration");
            return Ok(());
        }
    };

    let shutdown = shutdown_signal();
    let supervisor = Supervisor::new(config, Arc::new(DefaultConnector::default()));
    match supervisor.run(Arc::new(IdleWorkload), shutdown).await {
        SessionOutcome::Aborted(e) => tracing::error!(error = %e, "session failed"),
        outcome => tracing::info!(%outcome, "session finished"),
    }
    Ok(())
}
