//! Graph Nodes
//!
//! This module defines the node handle shared by every kind of node in a
//! dataflow graph, and the propagation protocol that moves values from
//! sources to outputs.
//!
//! # Node Kinds
//!
//! - **Source**: a root node. Values are pushed into it from outside and
//!   forwarded unchanged to its children.
//! - **Map**: applies a pure function to each incoming value and forwards
//!   the result.
//! - **Zip**: waits for one value from each of its parents, combines them,
//!   and forwards the combined value. The round state machine lives in the
//!   `join` module.
//! - **Output**: a terminal node that keeps the last value it received.
//!
//! # Propagation
//!
//! `receive` runs to completion before it returns: every node reachable from
//! the receiving node is visited depth-first, children in wiring order. An
//! error at any node aborts the remaining propagation and is returned to the
//! caller of the outermost `receive`.

use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::join::{JoinBuffer, SlotError};
use super::{Graph, GraphInner};
use crate::error::{FlowError, Result};
use crate::observe::{dispatch, Observer, TraceEvent};

/// Values that can flow through a graph.
///
/// Blanket-implemented for every `Clone + Debug + Send + Sync + 'static` type.
pub trait Value: Clone + Debug + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Debug + Send + Sync + 'static {}

/// Registration sequence number of a node within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The kind of node in the dataflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A root node fed from outside the graph.
    Source,

    /// A single-parent transform.
    Map,

    /// A multi-parent join that fires once per complete round.
    Zip,

    /// A terminal node holding the last value it received.
    Output,
}

impl NodeKind {
    /// Prefix used for default names of this kind.
    ///
    /// Sources are always named by the caller, so `"source"` never ends up
    /// in a registered name.
    pub fn prefix(&self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::Map => "map",
            NodeKind::Zip => "zip",
            NodeKind::Output => "output",
        }
    }

    /// Whether nodes of this kind may be wired to children.
    pub fn can_have_children(&self) -> bool {
        !matches!(self, NodeKind::Output)
    }
}

pub(crate) type MapFn<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;
pub(crate) type ZipFn<T> = Arc<dyn Fn(&[T]) -> T + Send + Sync>;

/// Kind-specific state.
pub(crate) enum Behavior<T> {
    Source,
    Map {
        func: MapFn<T>,
    },
    Zip {
        func: ZipFn<T>,
        /// Parent names; the index of a name is its slot.
        parents: IndexSet<String>,
        buffer: Mutex<JoinBuffer<T>>,
    },
    Output {
        current: RwLock<Option<T>>,
    },
}

impl<T> Behavior<T> {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Behavior::Source => NodeKind::Source,
            Behavior::Map { .. } => NodeKind::Map,
            Behavior::Zip { .. } => NodeKind::Zip,
            Behavior::Output { .. } => NodeKind::Output,
        }
    }

    pub(crate) fn zip(func: ZipFn<T>, parents: IndexSet<String>) -> Self {
        let buffer = Mutex::new(JoinBuffer::new(parents.len()));
        Behavior::Zip {
            func,
            parents,
            buffer,
        }
    }

    pub(crate) fn output() -> Self {
        Behavior::Output {
            current: RwLock::new(None),
        }
    }
}

struct NodeInner<T> {
    id: NodeId,
    name: String,
    behavior: Behavior<T>,

    /// Wiring order is propagation order.
    children: RwLock<SmallVec<[Node<T>; 4]>>,

    /// Non-owning: the graph owns its nodes, not the other way round.
    graph: Weak<GraphInner<T>>,
}

/// Handle to a node in a dataflow graph.
///
/// Handles are cheap to clone; clones refer to the same node.
pub struct Node<T> {
    inner: Arc<NodeInner<T>>,
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for Node<T> {}

impl<T: Value> Node<T> {
    pub(crate) fn new(
        id: NodeId,
        name: String,
        behavior: Behavior<T>,
        graph: Weak<GraphInner<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id,
                name,
                behavior,
                children: RwLock::new(SmallVec::new()),
                graph,
            }),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the node's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.inner.behavior.kind()
    }

    /// Snapshot of the node's children in wiring order.
    pub fn children(&self) -> Vec<Node<T>> {
        self.inner.children.read().to_vec()
    }

    /// Parent names of a zip node in slot order. Empty for other kinds.
    pub fn parents(&self) -> Vec<String> {
        match &self.inner.behavior {
            Behavior::Zip { parents, .. } => parents.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// The graph that owns this node, if it is still alive.
    pub fn graph(&self) -> Option<Graph<T>> {
        self.inner.graph.upgrade().map(Graph::from_inner)
    }

    pub(crate) fn belongs_to(&self, graph: &Arc<GraphInner<T>>) -> bool {
        std::ptr::eq(self.inner.graph.as_ptr(), Arc::as_ptr(graph))
    }

    /// Whether both handles were created by the same graph.
    fn shares_graph(&self, other: &Node<T>) -> bool {
        Weak::ptr_eq(&self.inner.graph, &other.inner.graph)
    }

    pub(crate) fn attach(&self, child: Node<T>) {
        self.inner.children.write().push(child);
    }

    /// Resolve the owning graph for a wiring call on this node.
    fn owner(&self) -> Result<Graph<T>> {
        if !self.kind().can_have_children() {
            return Err(FlowError::TerminalNode {
                node: self.name().to_string(),
            });
        }
        self.graph().ok_or_else(|| FlowError::GraphDropped {
            node: self.name().to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Wiring
    // ------------------------------------------------------------------

    /// Add a map child applying `func` to every value this node forwards.
    ///
    /// Unnamed maps are called `map-<counter>`.
    pub fn map_to<F>(&self, func: F, name: Option<&str>) -> Result<Node<T>>
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        let graph = self.owner()?;
        let node = graph.register(name, Behavior::Map {
            func: Arc::new(func),
        })?;
        self.attach(node.clone());
        Ok(node)
    }

    /// Join this node with `others` into a zip node.
    ///
    /// This node takes slot 0 and `others` follow in order; `func` receives
    /// one value per slot in that order. See [`Graph::join_with`].
    pub fn join_with<F>(&self, others: &[Node<T>], func: F, name: Option<&str>) -> Result<Node<T>>
    where
        F: Fn(&[T]) -> T + Send + Sync + 'static,
    {
        let graph = self.owner()?;
        let parents: Vec<Node<T>> = std::iter::once(self.clone())
            .chain(others.iter().cloned())
            .collect();
        graph.join_with(&parents, func, name)
    }

    /// Add an output child that keeps the last value it receives.
    ///
    /// Unnamed outputs are called `output-<counter>`.
    pub fn to_output(&self, name: Option<&str>) -> Result<Node<T>> {
        let graph = self.owner()?;
        let node = graph.register(name, Behavior::output())?;
        self.attach(node.clone());
        Ok(node)
    }

    // ------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------

    /// Push a value into this node from outside the graph.
    pub fn push(&self, value: T) -> Result<()> {
        self.receive(value, None)
    }

    /// Deliver `value` to this node, sent by `from`.
    ///
    /// Zip nodes require `from` to be one of their parents. Other kinds
    /// ignore it.
    pub fn receive(&self, value: T, from: Option<&Node<T>>) -> Result<()> {
        let observer = self
            .inner
            .graph
            .upgrade()
            .and_then(|graph| graph.observer());
        self.deliver(value, from, observer.as_ref())
    }

    fn deliver(
        &self,
        value: T,
        from: Option<&Node<T>>,
        observer: Option<&Arc<dyn Observer<T>>>,
    ) -> Result<()> {
        dispatch(observer, TraceEvent::received(self.name(), value.clone()));

        match &self.inner.behavior {
            Behavior::Source => self.forward(value, observer),
            Behavior::Map { func } => {
                let result = func(&value);
                dispatch(observer, TraceEvent::emitted(self.name(), result.clone(), None));
                self.forward(result, observer)
            }
            Behavior::Zip {
                func,
                parents,
                buffer,
            } => {
                if let Some(sender) = from.filter(|sender| !sender.shares_graph(self)) {
                    return Err(aborted(FlowError::ForeignNode {
                        node: sender.name().to_string(),
                    }));
                }

                let sender = from.map(Node::name);
                let slot = sender
                    .and_then(|name| parents.get_index_of(name))
                    .ok_or_else(|| {
                        aborted(FlowError::MissingSource {
                            node: self.name().to_string(),
                            from: sender.map(str::to_string),
                        })
                    })?;

                // The lock is released before forwarding so a re-entrant
                // delivery sees the cleared buffer.
                let ready = buffer.lock().fill(slot, value).map_err(|err| {
                    aborted(match err {
                        SlotError::Occupied { slot } => FlowError::DuplicateDelivery {
                            node: self.name().to_string(),
                            parent: parents[slot].clone(),
                        },
                        SlotError::OutOfRange => FlowError::MissingSource {
                            node: self.name().to_string(),
                            from: sender.map(str::to_string),
                        },
                    })
                })?;

                let Some(values) = ready else {
                    return Ok(());
                };
                let result = func(values.as_slice());
                dispatch(observer, TraceEvent::emitted(self.name(), result.clone(), None));
                self.forward(result, observer)
            }
            Behavior::Output { current } => {
                *current.write() = Some(value);
                Ok(())
            }
        }
    }

    fn forward(&self, value: T, observer: Option<&Arc<dyn Observer<T>>>) -> Result<()> {
        for child in self.children() {
            dispatch(
                observer,
                TraceEvent::emitted(self.name(), value.clone(), Some(child.name())),
            );
            child.deliver(value.clone(), Some(self), observer)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// The last value an output node received.
    ///
    /// `None` if nothing has arrived yet, and always `None` for nodes that
    /// are not outputs.
    pub fn current_value(&self) -> Option<T> {
        match &self.inner.behavior {
            Behavior::Output { current } => current.read().clone(),
            _ => None,
        }
    }

    /// Number of values a zip node is holding for the current round.
    pub fn buffered(&self) -> usize {
        match &self.inner.behavior {
            Behavior::Zip { buffer, .. } => buffer.lock().filled(),
            _ => 0,
        }
    }

    /// Parents a zip node is still waiting on for the current round.
    pub fn waiting_on(&self) -> Vec<String> {
        match &self.inner.behavior {
            Behavior::Zip {
                parents, buffer, ..
            } => {
                let buffer = buffer.lock();
                parents
                    .iter()
                    .enumerate()
                    .filter(|(slot, _)| !buffer.is_filled(*slot))
                    .map(|(_, name)| name.clone())
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Discard a zip node's partially collected round.
    ///
    /// Returns the number of values dropped. No-op for other kinds.
    pub fn reset_join(&self) -> usize {
        match &self.inner.behavior {
            Behavior::Zip { buffer, .. } => {
                let mut buffer = buffer.lock();
                let dropped = buffer.filled();
                buffer.clear();
                dropped
            }
            _ => 0,
        }
    }
}

fn aborted(err: FlowError) -> FlowError {
    tracing::warn!(error = %err, "propagation aborted");
    err
}

impl<T: Value> Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children: Vec<String> = self
            .inner
            .children
            .read()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("children", &children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_prefixes() {
        assert_eq!(NodeKind::Source.prefix(), "source");
        assert_eq!(NodeKind::Map.prefix(), "map");
        assert_eq!(NodeKind::Zip.prefix(), "zip");
        assert_eq!(NodeKind::Output.prefix(), "output");
    }

    #[test]
    fn only_outputs_are_terminal() {
        assert!(NodeKind::Source.can_have_children());
        assert!(NodeKind::Map.can_have_children());
        assert!(NodeKind::Zip.can_have_children());
        assert!(!NodeKind::Output.can_have_children());
    }

    #[test]
    fn source_forwards_unchanged() {
        let graph: Graph<i32> = Graph::new();
        let src = graph.create_source("src").unwrap();
        let out = src.to_output(Some("out")).unwrap();

        src.push(41).unwrap();
        assert_eq!(out.current_value(), Some(41));
    }

    #[test]
    fn output_overwrites_and_starts_unset() {
        let graph: Graph<String> = Graph::new();
        let src = graph.create_source("src").unwrap();
        let out = src.to_output(None).unwrap();

        assert_eq!(out.current_value(), None);
        src.push("first".to_string()).unwrap();
        src.push("second".to_string()).unwrap();
        assert_eq!(out.current_value().as_deref(), Some("second"));
    }

    #[test]
    fn non_outputs_have_no_current_value() {
        let graph: Graph<i32> = Graph::new();
        let src = graph.create_source("src").unwrap();
        let doubled = src.map_to(|x| x * 2, None).unwrap();

        src.push(1).unwrap();
        assert_eq!(src.current_value(), None);
        assert_eq!(doubled.current_value(), None);
    }

    #[test]
    fn outputs_cannot_have_children() {
        let graph: Graph<i32> = Graph::new();
        let src = graph.create_source("src").unwrap();
        let out = src.to_output(Some("out")).unwrap();

        let err = out.map_to(|x| *x, None).unwrap_err();
        assert!(matches!(err, FlowError::TerminalNode { ref node } if node == "out"));

        let err = out.to_output(None).unwrap_err();
        assert!(matches!(err, FlowError::TerminalNode { .. }));
        // Nothing was registered by the failed calls
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn wiring_after_graph_dropped_fails() {
        let graph: Graph<i32> = Graph::new();
        let src = graph.create_source("src").unwrap();
        drop(graph);

        assert!(src.graph().is_none());
        let err = src.map_to(|x| *x, None).unwrap_err();
        assert!(matches!(err, FlowError::GraphDropped { .. }));
    }

    #[test]
    fn zip_rejects_missing_sender() {
        let graph: Graph<i32> = Graph::new();
        let a = graph.create_source("a").unwrap();
        let b = graph.create_source("b").unwrap();
        let zip = a.join_with(&[b], |v| v[0] + v[1], Some("sum")).unwrap();

        let err = zip.push(1).unwrap_err();
        assert!(matches!(err, FlowError::MissingSource { from: None, .. }));
        assert_eq!(zip.buffered(), 0);
    }

    #[test]
    fn zip_rejects_unknown_sender() {
        let graph: Graph<i32> = Graph::new();
        let a = graph.create_source("a").unwrap();
        let b = graph.create_source("b").unwrap();
        let stray = graph.create_source("stray").unwrap();
        let zip = a.join_with(&[b], |v| v[0] + v[1], Some("sum")).unwrap();

        let err = zip.receive(1, Some(&stray)).unwrap_err();
        match err {
            FlowError::MissingSource { node, from } => {
                assert_eq!(node, "sum");
                assert_eq!(from.as_deref(), Some("stray"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zip_rejects_same_named_sender_from_other_graph() {
        let graph: Graph<i32> = Graph::new();
        let a = graph.create_source("a").unwrap();
        let b = graph.create_source("b").unwrap();
        let zip = a.join_with(&[b.clone()], |v| v[0] * 100 + v[1], Some("z")).unwrap();
        let out = zip.to_output(None).unwrap();

        let other: Graph<i32> = Graph::new();
        let impostor = other.create_source("a").unwrap();

        let err = zip.receive(7, Some(&impostor)).unwrap_err();
        assert!(matches!(err, FlowError::ForeignNode { ref node } if node == "a"));
        assert_eq!(zip.buffered(), 0);

        b.push(1).unwrap();
        assert_eq!(out.current_value(), None);
        assert_eq!(zip.waiting_on(), vec!["a"]);
    }

    #[test]
    fn zip_reports_pending_parents() {
        let graph: Graph<i32> = Graph::new();
        let a = graph.create_source("a").unwrap();
        let b = graph.create_source("b").unwrap();
        let c = graph.create_source("c").unwrap();
        let zip = graph
            .join_with(&[a.clone(), b, c.clone()], |v| v.iter().sum(), Some("total"))
            .unwrap();

        assert_eq!(zip.parents(), vec!["a", "b", "c"]);
        assert_eq!(zip.waiting_on(), vec!["a", "b", "c"]);

        a.push(1).unwrap();
        c.push(3).unwrap();
        assert_eq!(zip.buffered(), 2);
        assert_eq!(zip.waiting_on(), vec!["b"]);
    }

    #[test]
    fn reset_join_discards_partial_round() {
        let graph: Graph<i32> = Graph::new();
        let a = graph.create_source("a").unwrap();
        let b = graph.create_source("b").unwrap();
        let zip = a.join_with(&[b.clone()], |v| v[0] - v[1], None).unwrap();
        let out = zip.to_output(None).unwrap();

        a.push(10).unwrap();
        assert_eq!(zip.reset_join(), 1);
        assert_eq!(zip.buffered(), 0);

        // The reset round no longer holds 10, so this starts a new round
        a.push(7).unwrap();
        b.push(2).unwrap();
        assert_eq!(out.current_value(), Some(5));
    }

    #[test]
    fn handles_compare_by_identity() {
        let graph: Graph<i32> = Graph::new();
        let src = graph.create_source("src").unwrap();
        let again = graph.get("src").unwrap();
        let other = graph.create_source("other").unwrap();

        assert_eq!(src, again);
        assert_ne!(src, other);
    }

    #[test]
    fn debug_lists_child_names() {
        let graph: Graph<i32> = Graph::new();
        let src = graph.create_source("src").unwrap();
        src.to_output(Some("out")).unwrap();

        let rendered = format!("{src:?}");
        assert!(rendered.contains("\"src\""));
        assert!(rendered.contains("\"out\""));
    }
}
