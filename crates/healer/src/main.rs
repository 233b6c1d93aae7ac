//! crashloop-healer binary: wires config, credentials, the liveness endpoint and
//! the controller loop under one shutdown token.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crashloop_healer::{
    credentials, health, logging, open_pod_watch, Controller, HealerConfig, KubePodRemover,
    LoopExit,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = HealerConfig::parse();
    logging::init(config.log_format);
    config.validate()?;

    info!("Starting crashloop-healer v{}", env!("CARGO_PKG_VERSION"));

    let (kube_config, source) = credentials::resolve(config.kubeconfig.as_deref())
        .await
        .context("failed to build kubeconfig")?;
    let client = credentials::client(kube_config).context("failed to create clientset")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let listener = health::bind(config.port).await?;
    let health_handle = health::spawn(listener, cancel.child_token());

    info!("connected via {}", source);

    let events = match open_pod_watch(client.clone(), &config.namespace).await {
        Ok(events) => events,
        Err(err) => {
            cancel.cancel();
            return Err(err).context("failed to start pod watch");
        }
    };

    let mut controller = Controller::new(
        config.namespace.clone(),
        KubePodRemover::new(client),
        config.delete_timeout(),
        cancel.clone(),
    );
    let exit = controller.run(events).await;

    let stats = controller.stats();
    info!(
        events = stats.events,
        remediated = stats.remediated,
        failed = stats.failed,
        open_episodes = controller.reported().len(),
        "controller loop stopped"
    );
    if exit == LoopExit::StreamClosed {
        info!("watch ended by the API server, shutting down");
    }

    cancel.cancel();
    if let Err(err) = health::stop(health_handle, config.shutdown_grace()).await {
        error!(error = %err, "health server stopped with an error");
        return Err(err.into());
    }

    info!("shutdown complete");
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }

    token.cancel();
}
