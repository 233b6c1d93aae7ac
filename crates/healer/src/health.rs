//! Liveness endpoint for the kubelet probe.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{info, warn, Level};

use crate::error::{Error, Result};

/// `GET /healthz` answers `ok`; every other method on it gets 405.
pub fn router() -> Router {
    Router::new()
        .route(
            "/healthz",
            // axum would otherwise serve HEAD through the GET handler.
            get(healthz).head(|| async { StatusCode::METHOD_NOT_ALLOWED }),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::DEBUG)),
        )
}

async fn healthz() -> &'static str {
    "ok"
}

/// Bind the endpoint on all interfaces. Failure here is fatal to the process.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { port, source })
}

/// Serve until `cancel` fires, then let in-flight requests finish.
pub async fn serve(listener: TcpListener, cancel: CancellationToken) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("health server listening on :{}", addr.port());
    }
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(Error::Serve)
}

/// Spawn [`serve`] on its own task.
pub fn spawn(listener: TcpListener, cancel: CancellationToken) -> JoinHandle<Result<()>> {
    tokio::spawn(serve(listener, cancel))
}

/// Wait up to `grace` for the server task to drain, aborting it afterwards.
///
/// The caller is expected to have cancelled the server's token already.
pub async fn stop(mut handle: JoinHandle<Result<()>>, grace: Duration) -> Result<()> {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::Serve(std::io::Error::other(join_err))),
        Err(_) => {
            warn!(
                grace_secs = grace.as_secs(),
                "health server did not drain within grace period, forcing stop"
            );
            handle.abort();
            Ok(())
        }
    }
}
