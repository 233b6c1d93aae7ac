//! Pod identity and the crash-loop verdict.

use std::fmt;

use k8s_openapi::api::core::v1::Pod;

/// Waiting reason the kubelet reports for a container stuck restarting.
pub const CRASH_LOOP_REASON: &str = "CrashLoopBackOff";

/// `namespace/name` identity of a pod.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey(String);

impl InstanceKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}/{name}"))
    }

    /// Key for a pod snapshot, or `None` when the snapshot lacks a name or namespace.
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.as_deref()?;
        let namespace = pod.metadata.namespace.as_deref()?;
        Some(Self::new(namespace, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into `(namespace, name)`.
    pub fn parts(&self) -> (&str, &str) {
        // Namespaces cannot contain '/', so the first one is the separator.
        self.0.split_once('/').unwrap_or(("", self.0.as_str()))
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// True when any container of the pod is waiting with reason `CrashLoopBackOff`.
///
/// Only the current snapshot is consulted: restart counts, timestamps and init
/// containers play no part.
pub fn is_crash_looping(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .is_some_and(|statuses| {
            statuses.iter().any(|cs| {
                cs.state
                    .as_ref()
                    .and_then(|state| state.waiting.as_ref())
                    .and_then(|waiting| waiting.reason.as_deref())
                    == Some(CRASH_LOOP_REASON)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateWaiting, ContainerStatus, PodStatus,
    };
    use kube::api::ObjectMeta;

    fn status(name: &str, state: ContainerState) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            state: Some(state),
            ..ContainerStatus::default()
        }
    }

    fn waiting(reason: &str) -> ContainerState {
        ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some(reason.to_string()),
                ..ContainerStateWaiting::default()
            }),
            ..ContainerState::default()
        }
    }

    fn running() -> ContainerState {
        ContainerState {
            running: Some(ContainerStateRunning::default()),
            ..ContainerState::default()
        }
    }

    fn pod_with(statuses: Vec<ContainerStatus>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("api-7f9c".to_string()),
                namespace: Some("shop".to_string()),
                ..ObjectMeta::default()
            },
            status: Some(PodStatus {
                container_statuses: Some(statuses),
                ..PodStatus::default()
            }),
            ..Pod::default()
        }
    }

    #[test]
    fn single_crashing_container_is_enough() {
        let pod = pod_with(vec![
            status("app", running()),
            status("sidecar", waiting(CRASH_LOOP_REASON)),
        ]);
        assert!(is_crash_looping(&pod));
    }

    #[test]
    fn other_waiting_reasons_do_not_count() {
        let pod = pod_with(vec![
            status("app", waiting("ImagePullBackOff")),
            status("init", waiting("ContainerCreating")),
        ]);
        assert!(!is_crash_looping(&pod));
    }

    #[test]
    fn reason_must_match_exactly() {
        let pod = pod_with(vec![status("app", waiting("crashloopbackoff"))]);
        assert!(!is_crash_looping(&pod));
    }

    #[test]
    fn pod_without_status_is_healthy() {
        assert!(!is_crash_looping(&Pod::default()));
        assert!(!is_crash_looping(&pod_with(vec![])));
    }

    #[test]
    fn init_container_statuses_are_ignored() {
        let mut pod = pod_with(vec![status("app", running())]);
        if let Some(pod_status) = pod.status.as_mut() {
            pod_status.init_container_statuses =
                Some(vec![status("migrate", waiting(CRASH_LOOP_REASON))]);
        }
        assert!(!is_crash_looping(&pod));
    }

    #[test]
    fn key_formats_namespace_and_name() {
        let pod = pod_with(vec![]);
        let key = InstanceKey::from_pod(&pod).unwrap();
        assert_eq!(key.as_str(), "shop/api-7f9c");
        assert_eq!(key.to_string(), "shop/api-7f9c");
        assert_eq!(key.parts(), ("shop", "api-7f9c"));
    }

    #[test]
    fn key_requires_name_and_namespace() {
        let mut pod = pod_with(vec![]);
        pod.metadata.namespace = None;
        assert!(InstanceKey::from_pod(&pod).is_none());

        let mut pod = pod_with(vec![]);
        pod.metadata.name = None;
        assert!(InstanceKey::from_pod(&pod).is_none());
    }
}
