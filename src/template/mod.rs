//! Template documents and spec resolution.
//!
//! Templates come from the catalog as Argo `WorkflowTemplate` documents, each
//! with one or more named sub-templates (entrypoints). A node in the editor
//! graph picks one template and one entrypoint; resolving that pair yields a
//! [`TemplateSpec`].

mod cache;
mod parser;
mod spec;
mod types;

pub use cache::{CacheStats, SpecCache, SpecKey};
pub use parser::{parse_template, parse_template_file};
pub use spec::{
    default_entrypoint, entrypoints, is_forced_required, resolve, ArtifactSpec, ParamSpec,
    TemplateSpec, ALWAYS_REQUIRED_PARAMS,
};
pub use types::*;
