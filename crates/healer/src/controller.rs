//! Crash-loop remediation controller.
//!
//! A single consumer of the namespace pod watch. Each notification is handled to
//! completion before the next one is pulled, so [`ReportedSet`] needs no locking
//! and per-pod ordering from the API server is preserved.
//!
//! Per pod the controller tracks one "episode": it opens on the first
//! `CrashLoopBackOff` verdict, which triggers exactly one delete, and closes when
//! the pod is deleted or seen healthy again.

use std::time::Duration;

use axum::http::{Method, Request};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::WatchEvent;
use kube::Resource;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::event::ChangeEvent;
use crate::pod::{is_crash_looping, InstanceKey, CRASH_LOOP_REASON};
use crate::remediate::{remediate, PodRemover};
use crate::reported::ReportedSet;

/// Raw pod watch stream as delivered by the API server.
pub type PodEventStream = BoxStream<'static, std::result::Result<WatchEvent<Pod>, kube::Error>>;

/// What handling a single event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Crash detected, episode opened, delete succeeded.
    Remediated,
    /// Crash detected, episode opened, delete failed. The episode stays open.
    RemediationFailed,
    /// Crash seen again inside an open episode.
    AlreadyReported,
    /// Pod healthy again; episode closed.
    Recovered,
    /// Pod deleted; any episode closed.
    Forgotten,
    /// Pod healthy and no episode open.
    Healthy,
    /// Not a pod notification, or a snapshot without a usable key.
    Ignored,
}

/// Why [`Controller::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Shutdown was requested.
    Cancelled,
    /// The API server ended the watch.
    StreamClosed,
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub events: u64,
    pub remediated: u64,
    pub failed: u64,
}

/// Watch request for every pod in `namespace`, starting from the current state.
///
/// `timeoutSeconds` is left out so the API server's own request timeout bounds
/// the watch rather than the 290 s kube applies to `WatchParams`.
pub fn pod_watch_request(
    namespace: &str,
) -> std::result::Result<Request<Vec<u8>>, kube::Error> {
    let uri = format!(
        "{}?watch=true&allowWatchBookmarks=true&resourceVersion=0",
        Pod::url_path(&(), Some(namespace))
    );
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Vec::new())
        .map_err(kube::Error::HttpError)
}

/// Open the long-lived pod watch for `namespace`. No retry on failure.
pub async fn open_pod_watch(client: kube::Client, namespace: &str) -> Result<PodEventStream> {
    let watch_error = |source: kube::Error| Error::Watch {
        namespace: namespace.to_string(),
        source,
    };
    let request = pod_watch_request(namespace).map_err(watch_error)?;
    let stream = client
        .request_events::<Pod>(request)
        .await
        .map_err(watch_error)?;
    Ok(stream.boxed())
}

pub struct Controller<R> {
    namespace: String,
    remover: R,
    reported: ReportedSet,
    delete_timeout: Duration,
    cancel: CancellationToken,
    stats: ControllerStats,
}

impl<R: PodRemover> Controller<R> {
    pub fn new(
        namespace: impl Into<String>,
        remover: R,
        delete_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            remover,
            reported: ReportedSet::new(),
            delete_timeout,
            cancel,
            stats: ControllerStats::default(),
        }
    }

    pub fn reported(&self) -> &ReportedSet {
        &self.reported
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    /// Consume `events` until shutdown is requested or the stream ends.
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    pub async fn run<S>(&mut self, mut events: S) -> LoopExit
    where
        S: Stream<Item = std::result::Result<WatchEvent<Pod>, kube::Error>> + Unpin,
    {
        info!("watching namespace: {}", self.namespace);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    info!("shutting down...");
                    return LoopExit::Cancelled;
                }
                next = events.next() => match next {
                    Some(Ok(event)) => {
                        self.handle_event(ChangeEvent::from(event)).await;
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "dropping undecodable watch item");
                    }
                    None => {
                        warn!("watch channel closed");
                        return LoopExit::StreamClosed;
                    }
                },
            }
        }
    }

    /// Apply one notification to the episode state, remediating if needed.
    pub async fn handle_event(&mut self, event: ChangeEvent) -> EventOutcome {
        self.stats.events += 1;

        let (pod, deleted) = match event {
            ChangeEvent::Added(pod) | ChangeEvent::Modified(pod) => (pod, false),
            ChangeEvent::Deleted(pod) => (pod, true),
            ChangeEvent::Other => return EventOutcome::Ignored,
        };

        let Some(key) = InstanceKey::from_pod(&pod) else {
            debug!("ignoring pod event without name or namespace");
            return EventOutcome::Ignored;
        };

        if deleted {
            self.reported.unmark(&key);
            return EventOutcome::Forgotten;
        }

        if !is_crash_looping(&pod) {
            if self.reported.unmark(&key) {
                info!(pod = %key, "pod recovered");
                return EventOutcome::Recovered;
            }
            return EventOutcome::Healthy;
        }

        // Mark before the delete goes out so redelivery during the call is a no-op.
        if !self.reported.mark(key.clone()) {
            debug!(pod = %key, "crash already handled in this episode");
            return EventOutcome::AlreadyReported;
        }

        info!(
            pod = %key,
            reason = CRASH_LOOP_REASON,
            "restarted pod {} due to {}",
            key,
            CRASH_LOOP_REASON
        );

        let (namespace, name) = key.parts();
        match remediate(
            &self.remover,
            namespace,
            name,
            self.delete_timeout,
            &self.cancel,
        )
        .await
        {
            Ok(()) => {
                self.stats.remediated += 1;
                info!(pod = %key, "deleted pod {}", key);
                EventOutcome::Remediated
            }
            Err(err) => {
                self.stats.failed += 1;
                error!(pod = %key, error = %err, "failed to delete pod {}", key);
                EventOutcome::RemediationFailed
            }
        }
    }
}
