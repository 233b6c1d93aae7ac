//! The remediation action: delete the pod and let its owner recreate it.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a single remediation attempt did not complete.
#[derive(Error, Debug)]
pub enum RemediationError {
    /// The API server rejected or failed the delete.
    #[error("delete request failed: {0}")]
    Api(#[from] kube::Error),

    /// The delete did not finish within the per-action timeout.
    #[error("delete timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// The controller started shutting down before the delete finished.
    #[error("delete abandoned because the controller is shutting down")]
    Cancelled,
}

/// Deletes pods. Implemented over `kube::Client` in production and by fakes in tests.
#[async_trait]
pub trait PodRemover: Send + Sync {
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), kube::Error>;
}

/// [`PodRemover`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubePodRemover {
    client: kube::Client,
}

impl KubePodRemover {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodRemover for KubePodRemover {
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        pods.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }
}

/// Issue one delete for `namespace/name`, bounded by `timeout` and by `cancel`.
///
/// Both outcomes are final for this attempt; nothing here retries.
pub async fn remediate<R>(
    remover: &R,
    namespace: &str,
    name: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), RemediationError>
where
    R: PodRemover + ?Sized,
{
    let delete = tokio::time::timeout(timeout, remover.delete_pod(namespace, name));

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RemediationError::Cancelled),
        result = delete => match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(RemediationError::Api(err)),
            Err(_) => Err(RemediationError::Timeout(timeout)),
        },
    }
}
