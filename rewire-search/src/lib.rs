//! Rewire Search - Substitution-based graph optimization
//!
//! This crate provides the rewrite machinery of the Rewire optimizer:
//!
//! - [`xfer`] - Declarative substitution rules: a source pattern with
//!   constraints, a destination pattern with constructors, and the port
//!   mappings that splice the replacement into its surroundings
//! - [`matcher`] - Deterministic backtracking enumeration of pattern matches
//! - [`rewrite`] - Atomic replacement of a matched subgraph with boundary
//!   rewiring and acyclicity checking
//! - [`library`] - The standard substitution set (fusions, merges, and the
//!   split/concat cancellation)
//! - [`search`] - The best-first driver with cost pruning, hash
//!   deduplication, and an expansion budget
//!
//! # Example
//!
//! ```ignore
//! use rewire_search::{library, search};
//!
//! let xfers = library::standard_xfers()?;
//! let config = search::SearchConfig::default();
//! let outcome = search::optimize(graph, &mut model, &xfers, &config)?;
//! println!("optimized cost: {:.4} ms", outcome.graph.total_cost());
//! ```

pub mod error;
pub mod library;
pub mod matcher;
pub mod rewrite;
pub mod search;
pub mod xfer;

// Re-export main types
pub use error::{SearchError, SearchResult};
pub use library::standard_xfers;
pub use matcher::{enumerate_matches, Binding};
pub use rewrite::apply;
pub use search::{optimize, SearchConfig, SearchOutcome};
pub use xfer::{Compare, Constraint, DstOp, PairConstraint, PatternEdge, SrcOp, Xfer, XferBuilder};
