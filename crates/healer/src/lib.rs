//! Crash-loop healer.
//!
//! Watches the pods of one namespace and deletes any pod that reports a container
//! waiting in `CrashLoopBackOff`, so the owning controller recreates it. Each crash
//! episode is remediated at most once: the pod has to be deleted or recover before
//! another crash triggers a new delete.
//!
//! ## Modules
//!
//! - [`controller`]: watch loop, episode state machine and the pod watch
//! - [`pod`]: instance keys and the crash-loop predicate
//! - [`remediate`]: the bounded delete and the [`PodRemover`] seam
//! - [`health`]: `/healthz` liveness endpoint
//! - [`credentials`]: in-cluster / kubeconfig resolution
//! - [`config`]: command line and environment options

pub mod config;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod event;
pub mod health;
pub mod logging;
pub mod pod;
pub mod remediate;
pub mod reported;

pub use config::{HealerConfig, LogFormat};
pub use controller::{open_pod_watch, Controller, ControllerStats, EventOutcome, LoopExit};
pub use error::{Error, Result};
pub use event::ChangeEvent;
pub use pod::{is_crash_looping, InstanceKey, CRASH_LOOP_REASON};
pub use remediate::{remediate, KubePodRemover, PodRemover, RemediationError};
pub use reported::ReportedSet;
