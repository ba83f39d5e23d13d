//! Propagation Events
//!
//! Every node reports what it does while a value moves through the graph:
//!
//! - `Received` when a value arrives at the node.
//! - `Emitted` with no target when a map or zip node has computed its result.
//! - `Emitted` with a target for every child the value is forwarded to, in
//!   wiring order.
//!
//! Events always go to `tracing` at `TRACE` level. A graph can additionally
//! hold one [`Observer`], which is how tests and embedding applications see
//! the exact event sequence.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// What happened at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Received,
    Emitted,
}

/// A single step of propagation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent<T> {
    /// Name of the node reporting the event.
    pub node: String,
    pub phase: Phase,
    pub value: T,
    /// Child the value was forwarded to, for per-child emissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl<T> TraceEvent<T> {
    pub fn received(node: &str, value: T) -> Self {
        Self {
            node: node.to_string(),
            phase: Phase::Received,
            value,
            target: None,
        }
    }

    pub fn emitted(node: &str, value: T, target: Option<&str>) -> Self {
        Self {
            node: node.to_string(),
            phase: Phase::Emitted,
            value,
            target: target.map(str::to_string),
        }
    }
}

/// Receives propagation events from a graph.
pub trait Observer<T>: Send + Sync {
    fn observe(&self, event: &TraceEvent<T>);
}

impl<T, F> Observer<T> for F
where
    F: Fn(&TraceEvent<T>) + Send + Sync,
{
    fn observe(&self, event: &TraceEvent<T>) {
        self(event)
    }
}

/// Forward an event to `tracing`, then to the installed observer if any.
pub(crate) fn dispatch<T: Debug>(observer: Option<&Arc<dyn Observer<T>>>, event: TraceEvent<T>) {
    tracing::trace!(
        node = %event.node,
        phase = ?event.phase,
        value = ?event.value,
        child = event.target.as_deref(),
        "propagation"
    );
    if let Some(observer) = observer {
        observer.observe(&event);
    }
}

/// Observer that records every event in order.
///
/// Clones share the same event log, so one clone can be installed on the
/// graph while another is kept for assertions.
#[derive(Debug)]
pub struct TraceRecorder<T> {
    events: Arc<Mutex<Vec<TraceEvent<T>>>>,
}

impl<T> TraceRecorder<T> {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forget all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl<T: Clone> TraceRecorder<T> {
    /// Snapshot of every recorded event.
    pub fn events(&self) -> Vec<TraceEvent<T>> {
        self.events.lock().clone()
    }

    /// Values received by the named node, in arrival order.
    pub fn received_by(&self, node: &str) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.phase == Phase::Received && e.node == node)
            .map(|e| e.value.clone())
            .collect()
    }
}

impl<T> Clone for TraceRecorder<T> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<T> Default for TraceRecorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> Observer<T> for TraceRecorder<T> {
    fn observe(&self, event: &TraceEvent<T>) {
        self.events.lock().push(event.clone());
    }
}
