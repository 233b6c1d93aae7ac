//! Cluster credential resolution.
//!
//! In-cluster service account first, then a kubeconfig file. There is no retry:
//! if neither works the process cannot do anything useful.

use std::fmt;
use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::debug;

use crate::error::{Error, Result};

/// Which strategy produced the client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Mounted service account token and cluster CA.
    InCluster,
    /// A kubeconfig file at the given path.
    Kubeconfig(PathBuf),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InCluster => write!(f, "in-cluster"),
            Self::Kubeconfig(_) => write!(f, "kubeconfig"),
        }
    }
}

/// Resolve a client configuration, preferring the in-cluster identity.
pub async fn resolve(
    explicit_kubeconfig: Option<&Path>,
) -> Result<(kube::Config, CredentialSource)> {
    match kube::Config::incluster() {
        Ok(config) => return Ok((config, CredentialSource::InCluster)),
        Err(err) => debug!(error = %err, "in-cluster config unavailable, trying kubeconfig"),
    }

    let home = std::env::var_os("HOME").map(PathBuf::from);
    let path = kubeconfig_path(explicit_kubeconfig, home.as_deref())?;

    let kubeconfig = Kubeconfig::read_from(&path).map_err(|source| Error::Kubeconfig {
        path: path.clone(),
        source,
    })?;
    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|source| Error::Kubeconfig {
            path: path.clone(),
            source,
        })?;

    Ok((config, CredentialSource::Kubeconfig(path)))
}

/// Build the client used for both the watch and the deletes.
pub fn client(config: kube::Config) -> Result<kube::Client> {
    kube::Client::try_from(without_read_timeout(config)).map_err(Error::Client)
}

/// Drop the per-read timeout: a quiet watch only carries bookmarks, and deletes
/// are bounded by the remediation timeout instead.
pub fn without_read_timeout(mut config: kube::Config) -> kube::Config {
    config.read_timeout = None;
    config
}

/// Explicit path wins; otherwise `<home>/.kube/config`.
pub fn kubeconfig_path(explicit: Option<&Path>, home: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path.to_path_buf());
    }
    home.filter(|h| !h.as_os_str().is_empty())
        .map(|h| h.join(".kube").join("config"))
        .ok_or(Error::NoKubeconfigPath)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_home() {
        let path = kubeconfig_path(
            Some(Path::new("/etc/healer/kubeconfig")),
            Some(Path::new("/home/ops")),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/etc/healer/kubeconfig"));
    }

    #[test]
    fn falls_back_to_home_kube_config() {
        let path = kubeconfig_path(None, Some(Path::new("/home/ops"))).unwrap();
        assert_eq!(path, PathBuf::from("/home/ops/.kube/config"));
    }

    #[test]
    fn empty_explicit_path_is_ignored() {
        let path = kubeconfig_path(Some(Path::new("")), Some(Path::new("/root"))).unwrap();
        assert_eq!(path, PathBuf::from("/root/.kube/config"));
    }

    #[test]
    fn no_home_and_no_explicit_path_is_an_error() {
        assert!(matches!(
            kubeconfig_path(None, None),
            Err(Error::NoKubeconfigPath)
        ));
    }

    #[test]
    fn client_config_has_no_read_timeout() {
        let mut config = kube::Config::new("https://127.0.0.1:6443".parse().unwrap());
        config.read_timeout = Some(std::time::Duration::from_secs(295));

        assert!(without_read_timeout(config).read_timeout.is_none());
    }

    #[test]
    fn source_labels() {
        assert_eq!(CredentialSource::InCluster.to_string(), "in-cluster");
        assert_eq!(
            CredentialSource::Kubeconfig(PathBuf::from("/x")).to_string(),
            "kubeconfig"
        );
    }

    #[tokio::test]
    async fn unreadable_kubeconfig_reports_path() {
        let missing = Path::new("/nonexistent/crashloop-healer/kubeconfig");
        // Outside a cluster the in-cluster strategy fails and the missing file is reported.
        if std::env::var_os("KUBERNETES_SERVICE_HOST").is_some() {
            return;
        }
        let err = resolve(Some(missing)).await.unwrap_err();
        match err {
            Error::Kubeconfig { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }
}
