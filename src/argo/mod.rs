//! Template catalog and workflow executor collaborators.
//!
//! The compiler only sees these two traits. [`ArgoClient`] implements both
//! against the Argo Workflows REST API; [`DirectoryCatalog`] serves templates
//! from local YAML files for offline compilation.

mod client;
mod directory;

use async_trait::async_trait;

use crate::emit::WorkflowManifest;
use crate::error::Result;
use crate::template::TemplateDocument;

pub use client::{ArgoClient, ArgoClientConfig};
pub use directory::DirectoryCatalog;

/// Source of raw template documents.
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    /// Fetch a template document by name.
    ///
    /// Fails with `TemplateNotFound` when the catalog has no such template.
    async fn fetch_template(&self, name: &str) -> Result<TemplateDocument>;

    /// Names of all templates in the catalog.
    async fn list_template_names(&self) -> Result<Vec<String>>;
}

/// Receiver of compiled workflows.
#[async_trait]
pub trait WorkflowExecutor: Send + Sync {
    /// Submit a workflow, returning the execution identifier it was assigned.
    async fn submit(&self, manifest: &WorkflowManifest) -> Result<String>;
}
