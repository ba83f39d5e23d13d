//! Dataflow Graph
//!
//! This module implements the graph that owns every node of one dataflow
//! topology.
//!
//! # Overview
//!
//! The graph is a registry of uniquely named nodes plus the ordered list of
//! root (source) nodes:
//!
//! - Nodes are created through the graph (`create_source`, `join_with`) or
//!   through an existing node (`map_to`, `join_with`, `to_output`). Every
//!   creation registers the node immediately, and a name collision fails the
//!   creation without side effects.
//! - Edges point from parent to child. A node's children are visited in the
//!   order they were wired.
//! - Nodes are never removed or renamed; the graph only grows.
//!
//! # Design Decisions
//!
//! 1. Registry and counters live in the graph instance, never in a global, so
//!    independent graphs can coexist in one process.
//!
//! 2. Nodes hold a weak reference back to their graph. The graph owns the
//!    nodes; a node handle that outlives its graph can still propagate values
//!    but can no longer be wired.
//!
//! 3. All mutation happens during wiring, which is expected to be finished
//!    (or at least not interleaved) before values are pushed.

mod join;
mod naming;
mod node;

pub use node::{Node, NodeId, NodeKind, Value};

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use crate::config::GraphConfig;
use crate::error::{FlowError, Result};
use crate::observe::Observer;
use naming::NameAllocator;
use node::Behavior;

/// Everything mutated by wiring.
struct Registry<T> {
    /// All nodes by name, in registration order.
    nodes: IndexMap<String, Node<T>>,

    /// Source nodes in creation order.
    roots: Vec<Node<T>>,

    names: NameAllocator,
}

pub(crate) struct GraphInner<T> {
    config: GraphConfig,
    registry: RwLock<Registry<T>>,
    observer: RwLock<Option<Arc<dyn Observer<T>>>>,
}

impl<T> GraphInner<T> {
    pub(crate) fn observer(&self) -> Option<Arc<dyn Observer<T>>> {
        self.observer.read().clone()
    }
}

/// A dataflow graph holding values of type `T`.
///
/// `Graph` is a cheap handle; clones refer to the same graph.
///
/// # Example
///
/// ```rust
/// use rivulet_core::Graph;
///
/// let graph = Graph::new();
/// let src = graph.create_source("src").unwrap();
/// let doubled = src.map_to(|x: &i32| x * 2, Some("double")).unwrap();
/// let out = doubled.to_output(Some("out")).unwrap();
///
/// src.push(3).unwrap();
/// assert_eq!(out.current_value(), Some(6));
/// ```
pub struct Graph<T> {
    inner: Arc<GraphInner<T>>,
}

impl<T> Clone for Graph<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Value> Graph<T> {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create an empty graph with the given configuration.
    pub fn with_config(config: GraphConfig) -> Self {
        let names = NameAllocator::new(config.naming);
        Self {
            inner: Arc::new(GraphInner {
                config,
                registry: RwLock::new(Registry {
                    nodes: IndexMap::new(),
                    roots: Vec::new(),
                    names,
                }),
                observer: RwLock::new(None),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<GraphInner<T>>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a root node that values are pushed into.
    ///
    /// Sources have no default naming scheme, so a name is required.
    pub fn create_source(&self, name: &str) -> Result<Node<T>> {
        let mut registry = self.inner.registry.write();
        let node = self.insert(&mut registry, name.to_string(), Behavior::Source)?;
        registry.roots.push(node.clone());
        Ok(node)
    }

    /// Create a zip node fed by `parents`.
    ///
    /// The position of each parent in `parents` is its slot: `func` receives
    /// one value per parent, in this order, no matter which parent delivers
    /// first. The zip node is appended as a child of every parent.
    ///
    /// Unnamed zips are called `zip-<counter>`.
    pub fn join_with<F>(&self, parents: &[Node<T>], func: F, name: Option<&str>) -> Result<Node<T>>
    where
        F: Fn(&[T]) -> T + Send + Sync + 'static,
    {
        if parents.is_empty() {
            return Err(FlowError::NoParents {
                name: self.resolve_name(name, NodeKind::Zip),
            });
        }

        let mut slots = IndexSet::with_capacity(parents.len());
        for parent in parents {
            if !parent.belongs_to(&self.inner) {
                return Err(FlowError::ForeignNode {
                    node: parent.name().to_string(),
                });
            }
            if !parent.kind().can_have_children() {
                return Err(FlowError::TerminalNode {
                    node: parent.name().to_string(),
                });
            }
            if !slots.insert(parent.name().to_string()) {
                return Err(FlowError::DuplicateParent {
                    node: self.resolve_name(name, NodeKind::Zip),
                    parent: parent.name().to_string(),
                });
            }
        }

        let node = self.register(name, Behavior::zip(Arc::new(func), slots))?;
        for parent in parents {
            parent.attach(node.clone());
        }
        Ok(node)
    }

    /// Register a derived node, naming it from the counter if unnamed.
    ///
    /// Derived nodes are not roots.
    pub(crate) fn register(&self, name: Option<&str>, behavior: Behavior<T>) -> Result<Node<T>> {
        let mut registry = self.inner.registry.write();
        let name = match name {
            Some(name) => name.to_string(),
            None => registry.names.default_name(behavior.kind()),
        };
        self.insert(&mut registry, name, behavior)
    }

    fn insert(&self, registry: &mut Registry<T>, name: String, behavior: Behavior<T>) -> Result<Node<T>> {
        if registry.nodes.contains_key(&name) {
            return Err(FlowError::DuplicateName { name });
        }

        let kind = behavior.kind();
        let id = registry.names.record(kind);
        let node = Node::new(id, name.clone(), behavior, Arc::downgrade(&self.inner));
        registry.nodes.insert(name, node.clone());

        tracing::debug!(node = %node.name(), kind = ?kind, id = id.raw(), "registered node");
        Ok(node)
    }

    fn resolve_name(&self, name: Option<&str>, kind: NodeKind) -> String {
        match name {
            Some(name) => name.to_string(),
            None => self.next_default_name(kind),
        }
    }

    /// The name an unnamed node of `kind` would get right now.
    pub fn next_default_name(&self, kind: NodeKind) -> String {
        self.inner.registry.read().names.default_name(kind)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Source nodes in creation order.
    pub fn root_nodes(&self) -> Vec<Node<T>> {
        self.inner.registry.read().roots.clone()
    }

    /// Every node in registration order.
    pub fn nodes(&self) -> Vec<Node<T>> {
        self.inner.registry.read().nodes.values().cloned().collect()
    }

    /// Look up a node by name.
    pub fn get(&self, name: &str) -> Option<Node<T>> {
        self.inner.registry.read().nodes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.registry.read().nodes.contains_key(name)
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.inner.registry.read().nodes.len()
    }

    /// Current value of the shared registration counter.
    pub fn next_id(&self) -> u64 {
        self.inner.registry.read().names.next_id()
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Install an observer that sees every propagation event.
    ///
    /// Replaces any previously installed observer.
    pub fn set_observer<O>(&self, observer: O)
    where
        O: Observer<T> + 'static,
    {
        *self.inner.observer.write() = Some(Arc::new(observer));
    }

    pub fn clear_observer(&self) {
        *self.inner.observer.write() = None;
    }

    /// Discard the partial round of every zip node.
    ///
    /// Joins are never flushed automatically; this is the explicit way to
    /// recover from a stalled parent or an aborted propagation. Returns the
    /// total number of buffered values dropped.
    pub fn reset_joins(&self) -> usize {
        let dropped: usize = self.nodes().iter().map(Node::reset_join).sum();
        if dropped > 0 {
            tracing::debug!(dropped, "reset partial join rounds");
        }
        dropped
    }
}

impl<T: Value> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Value> std::fmt::Debug for Graph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.registry.read();
        f.debug_struct("Graph")
            .field("config", &self.inner.config)
            .field("node_count", &registry.nodes.len())
            .field("roots", &registry.roots.iter().map(Node::name).collect::<Vec<_>>())
            .finish()
    }
}
