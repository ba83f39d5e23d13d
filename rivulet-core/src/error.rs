//! Error Types
//!
//! Every failure in Rivulet surfaces synchronously to the caller of the
//! operation that triggered it: either a wiring call (`create_source`,
//! `map_to`, `join_with`, `to_output`) or a `receive` call. Nothing is caught
//! and retried internally, so an error returned from `receive` means the
//! in-flight propagation was aborted at the failing node.

use thiserror::Error;

/// Errors raised while wiring or driving a dataflow graph.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A node with this name is already registered in the graph.
    #[error("node name '{name}' is already registered")]
    DuplicateName { name: String },

    /// A join node received a value without an identifiable sending parent.
    ///
    /// `from` is `None` when no sender was passed at all, and holds the
    /// sender's name when it is not one of the join's parents.
    #[error("join '{node}' received a value from {}", describe_sender(.from))]
    MissingSource { node: String, from: Option<String> },

    /// A parent delivered twice into the same join round.
    #[error("join '{node}' already holds a value from '{parent}' for the current round")]
    DuplicateDelivery { node: String, parent: String },

    /// A join was requested with an empty parent list.
    #[error("join '{name}' needs at least one parent")]
    NoParents { name: String },

    /// The same parent was listed more than once for a join.
    #[error("join '{node}' lists parent '{parent}' more than once")]
    DuplicateParent { node: String, parent: String },

    /// A node from another graph was used while wiring this one.
    #[error("node '{node}' belongs to a different graph")]
    ForeignNode { node: String },

    /// Output nodes are terminal and cannot be given children.
    #[error("node '{node}' is an output and cannot have children")]
    TerminalNode { node: String },

    /// The graph that owns this node no longer exists.
    #[error("graph owning node '{node}' has been dropped")]
    GraphDropped { node: String },

    /// A graph configuration document could not be parsed.
    #[error("invalid graph configuration: {0}")]
    Config(#[from] serde_json::Error),
}

fn describe_sender(from: &Option<String>) -> String {
    match from {
        Some(name) => format!("unknown parent '{name}'"),
        None => "no parent".to_string(),
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = FlowError> = std::result::Result<T, E>;
