//! Rivulet Core
//!
//! This crate provides a minimal synchronous dataflow runtime. A graph is
//! built from named nodes and values are pushed into its sources; each node
//! forwards derived values to its children until they reach outputs.
//!
//! It implements:
//!
//! - A per-graph node registry with unique names and default naming
//! - Map, zip (join), and output nodes wired onto sources
//! - Depth-first, in-order propagation that finishes before `push` returns
//! - Per-round join accounting with strict duplicate-delivery checks
//! - An observation hook for every receive/emit step
//!
//! # Architecture
//!
//! - `graph`: the graph registry, node handles, and the propagation protocol
//! - `observe`: propagation events and observers
//! - `analysis`: name-level topology export (JSON, Graphviz DOT)
//! - `config`: graph configuration
//! - `error`: the crate error type
//!
//! # Example
//!
//! ```rust
//! use rivulet_core::{Graph, TraceRecorder};
//!
//! let graph: Graph<i64> = Graph::new();
//! let recorder = TraceRecorder::new();
//! graph.set_observer(recorder.clone());
//!
//! let left = graph.create_source("left").unwrap();
//! let right = graph.create_source("right").unwrap();
//! let sum = left.join_with(&[right.clone()], |v| v[0] + v[1], Some("sum")).unwrap();
//! let out = sum.to_output(None).unwrap();
//!
//! left.push(2).unwrap();
//! assert_eq!(out.current_value(), None); // still waiting on `right`
//!
//! right.push(5).unwrap();
//! assert_eq!(out.current_value(), Some(7));
//! assert_eq!(recorder.received_by("sum"), vec![2, 5]);
//! ```
//!
//! # Limitations
//!
//! A zip node fires only when every parent has delivered for the current
//! round. If one parent never delivers again, the zip holds its partial
//! round indefinitely. There is no timeout; [`Graph::reset_joins`] is the
//! explicit way out.

pub mod analysis;
pub mod config;
pub mod error;
pub mod graph;
pub mod observe;

pub use analysis::{DisplayGraph, Edge};
pub use config::{GraphConfig, NamingPolicy};
pub use error::{FlowError, Result};
pub use graph::{Graph, Node, NodeId, NodeKind, Value};
pub use observe::{Observer, Phase, TraceEvent, TraceRecorder};
