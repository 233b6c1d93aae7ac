//! Open remediation episodes.

use std::collections::HashSet;

use crate::pod::InstanceKey;

/// Pods already remediated in their current crash episode.
///
/// A key is present from the first crash verdict until the pod is deleted or
/// observed healthy again. Nothing here outlives the process.
#[derive(Debug, Default)]
pub struct ReportedSet {
    keys: HashSet<InstanceKey>,
}

impl ReportedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an episode. Returns `false` if one was already open for `key`.
    pub fn mark(&mut self, key: InstanceKey) -> bool {
        self.keys.insert(key)
    }

    /// Close an episode. Returns `false` (and changes nothing) if none was open.
    pub fn unmark(&mut self, key: &InstanceKey) -> bool {
        self.keys.remove(key)
    }

    pub fn contains(&self, key: &InstanceKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
