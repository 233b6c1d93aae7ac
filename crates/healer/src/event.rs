//! Watch notifications as seen by the controller.

use k8s_openapi::api::core::v1::Pod;
use kube::api::WatchEvent;

/// A pod lifecycle notification.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Added(Pod),
    Modified(Pod),
    Deleted(Pod),
    /// Bookmarks, in-band watch errors and anything else without a pod snapshot.
    Other,
}

impl ChangeEvent {
    /// Pod snapshot carried by the event, if any.
    pub fn pod(&self) -> Option<&Pod> {
        match self {
            Self::Added(pod) | Self::Modified(pod) | Self::Deleted(pod) => Some(pod),
            Self::Other => None,
        }
    }
}

impl From<WatchEvent<Pod>> for ChangeEvent {
    fn from(event: WatchEvent<Pod>) -> Self {
        match event {
            WatchEvent::Added(pod) => Self::Added(pod),
            WatchEvent::Modified(pod) => Self::Modified(pod),
            WatchEvent::Deleted(pod) => Self::Deleted(pod),
            WatchEvent::Bookmark(_) | WatchEvent::Error(_) => Self::Other,
        }
    }
}
