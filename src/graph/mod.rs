//! Editor graph compilation.
//!
//! Stages, in the order the pipeline runs them:
//! - [`check_graph`]: structural checks (unique IDs, known endpoints, no cycles)
//! - [`compile`]: one task per node, literal parameter bindings, dependencies
//! - [`link`]: artifact references along edges become data-flow bindings
//! - [`validate`]: every mandatory input is supplied or connected

mod compiler;
mod dag;
mod linker;
mod types;
mod validator;

pub use compiler::compile;
pub use dag::{check_graph, execution_order};
pub use linker::link;
pub use types::*;
pub use validator::{into_result, validate, ArtifactPolicy, FieldKind, ValidationError};
