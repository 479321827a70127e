//! Rewire Core - Foundation types for the Rewire graph optimizer
//!
//! This crate provides the operator vocabulary shared by every layer of the
//! optimizer:
//!
//! - [`Guid`] - Monotonic identity for operator instances
//! - [`TensorDims`] / [`Tensor`] - Shape descriptors flowing between operators
//! - [`OpKind`] / [`OpAttrs`] - The closed operator vocabulary and its
//!   kind-specific attribute records
//! - [`OpDef`] / [`Op`] - Interned operator definitions and graph instances
//! - [`Param`] - The uniform parameter-query surface used by substitution
//!   constraints
//! - [`CostOracle`] - The measurement interface, with a deterministic
//!   [`AnalyticOracle`] implementation
//!
//! Graph structure, the model catalog, and the rewrite search live in the
//! `rewire-graph` and `rewire-search` crates.

pub mod attrs;
pub mod error;
pub mod guid;
pub mod kind;
pub mod op;
pub mod oracle;
pub mod tensor;

// Re-export commonly used types at crate root
pub use attrs::{Conv2dAttrs, ConcatAttrs, MatmulAttrs, OpAttrs, Pool2dAttrs, SplitAttrs};
pub use error::{CoreError, CoreResult};
pub use guid::Guid;
pub use kind::{ActiMode, OpKind};
pub use op::{expected_arity, infer_output_dims, Op, OpDef, Param};
pub use oracle::{AnalyticOracle, CostOracle};
pub use tensor::{Tensor, TensorDims, MAX_DIMS};
