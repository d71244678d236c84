//! vmflow - compile visual job-template graphs into Argo Workflow DAGs
//!
//! A graph editor places catalog templates as nodes and connects them with
//! edges. vmflow turns that graph into an executable workflow:
//!
//! 1. fetch the normalized spec of every template entrypoint in use,
//! 2. compile nodes into tasks, keeping only declared parameters,
//! 3. link artifact references (`"<nodeId>::<artifact>"`) across edges,
//! 4. validate that every mandatory input is satisfied,
//! 5. emit a Workflow manifest, either as YAML or by submitting it.
//!
//! ## Example request
//!
//! ```json
//! {
//!   "nodes": [
//!     {"id": "fit", "template_name": "tp-time-series-scaling", "entrypoint": "fit",
//!      "arguments": {"data_path": "/data/raw.csv"}},
//!     {"id": "transform", "template_name": "tp-time-series-scaling", "entrypoint": "transform",
//!      "arguments": {"model": "fit::model"}}
//!   ],
//!   "edges": [{"source": "fit", "target": "transform"}],
//!   "action": "download"
//! }
//! ```

pub mod api;
pub mod argo;
pub mod config;
pub mod emit;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod telemetry;
pub mod template;

pub use error::{Error, Result};
pub use pipeline::{CompileRequest, Pipeline, PipelineSettings};
