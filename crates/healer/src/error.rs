//! Startup error types.
//!
//! Everything here is fatal: the process logs the error and exits non-zero.
//! Per-pod remediation failures live in [`crate::remediate::RemediationError`]
//! and never reach this type.

use std::path::PathBuf;

use kube::config::KubeconfigError;
use thiserror::Error;

/// Errors that stop the healer from starting or keep it from serving.
#[derive(Error, Debug)]
pub enum Error {
    /// Neither in-cluster credentials nor a kubeconfig location are available.
    #[error("no kubeconfig path: KUBECONFIG is unset and the home directory is unknown")]
    NoKubeconfigPath,

    /// The kubeconfig file could not be read or turned into a client config.
    #[error("failed to load kubeconfig from {path:?}: {source}")]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: KubeconfigError,
    },

    /// The Kubernetes client could not be built from the resolved config.
    #[error("failed to create Kubernetes client: {0}")]
    Client(#[source] kube::Error),

    /// The pod watch could not be opened.
    #[error("failed to start pod watch in namespace {namespace}: {source}")]
    Watch {
        namespace: String,
        #[source]
        source: kube::Error,
    },

    /// The liveness endpoint could not bind its port.
    #[error("failed to bind health server on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The liveness endpoint stopped with an I/O error.
    #[error("health server error: {0}")]
    Serve(#[source] std::io::Error),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias for startup operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
