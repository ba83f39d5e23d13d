//! Default Node Names
//!
//! Unnamed map, zip, and output nodes get a synthesized name of the form
//! `<prefix>-<counter>`. The counter is owned by one graph; there is no
//! process-wide numbering, so two graphs both start at zero.

use std::collections::HashMap;

use super::node::{NodeId, NodeKind};
use crate::config::NamingPolicy;

/// Registration counters for a single graph.
#[derive(Debug)]
pub(crate) struct NameAllocator {
    policy: NamingPolicy,

    /// Bumped on every registration, whatever the kind.
    next_id: u64,

    /// Bumped only for registrations of the matching kind.
    per_kind: HashMap<NodeKind, u64>,
}

impl NameAllocator {
    pub(crate) fn new(policy: NamingPolicy) -> Self {
        Self {
            policy,
            next_id: 0,
            per_kind: HashMap::new(),
        }
    }

    /// The value the shared counter will hand out next.
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Name an unnamed node of `kind` from the current counter value.
    ///
    /// Does not advance any counter; only [`record`](Self::record) does.
    pub(crate) fn default_name(&self, kind: NodeKind) -> String {
        let counter = match self.policy {
            NamingPolicy::Shared => self.next_id,
            NamingPolicy::PerKind => self.per_kind.get(&kind).copied().unwrap_or(0),
        };
        format!("{}-{}", kind.prefix(), counter)
    }

    /// Account for a successful registration and return the node's id.
    pub(crate) fn record(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from(self.next_id);
        self.next_id += 1;
        *self.per_kind.entry(kind).or_insert(0) += 1;
        id
    }
}
