//! Process configuration.
//!
//! Every option can be given on the command line or through the environment,
//! which is how the Deployment manifest sets them.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::{Error, Result};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Watches a namespace and deletes pods stuck in CrashLoopBackOff.
#[derive(Debug, Clone, Parser)]
#[command(name = "crashloop-healer")]
#[command(about = "Deletes pods stuck in CrashLoopBackOff so their owners recreate them")]
#[command(version)]
pub struct HealerConfig {
    /// Namespace whose pods are watched.
    #[arg(long, env = "NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Port for the `/healthz` liveness endpoint.
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Kubeconfig used when no in-cluster identity is available
    /// (defaults to `~/.kube/config`).
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Upper bound for a single pod delete request, in seconds.
    #[arg(long, env = "DELETE_TIMEOUT_SECS", default_value = "10")]
    pub delete_timeout_secs: u64,

    /// Time the liveness endpoint gets to drain on shutdown, in seconds.
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value = "5")]
    pub shutdown_grace_secs: u64,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl HealerConfig {
    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(Error::Config("namespace must not be empty".to_string()));
        }
        if self.delete_timeout_secs == 0 {
            return Err(Error::Config(
                "delete timeout must be greater than zero".to_string(),
            ));
        }
        if self.shutdown_grace_secs == 0 {
            return Err(Error::Config(
                "shutdown grace period must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
