//! Compilation pipeline.
//!
//! `FetchSpecs -> Compile -> Link -> Validate -> {Serialize | Submit}`, strictly
//! linear. Any failure aborts before the executor is contacted, so a workflow
//! is either submitted fully validated or not at all.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::argo::{TemplateCatalog, WorkflowExecutor};
use crate::emit::{self, build_manifest, EmitMode, EmitOutput, ManifestSettings, StorageCredentials};
use crate::error::{Error, Result};
use crate::graph::{self, ArtifactPolicy, CompiledGraph, Graph, ValidationError};
use crate::template::{self, SpecCache, TemplateDocument, TemplateSpec};

/// Default timeout for a single catalog call.
const DEFAULT_CATALOG_TIMEOUT_SECS: u64 = 30;

/// Default timeout for workflow submission.
const DEFAULT_EXECUTOR_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub manifest: ManifestSettings,
    pub artifact_policy: ArtifactPolicy,
    pub catalog_timeout: Duration,
    pub executor_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            manifest: ManifestSettings::default(),
            artifact_policy: ArtifactPolicy::default(),
            catalog_timeout: Duration::from_secs(DEFAULT_CATALOG_TIMEOUT_SECS),
            executor_timeout: Duration::from_secs(DEFAULT_EXECUTOR_TIMEOUT_SECS),
        }
    }
}

/// A graph submission, as posted by the editor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompileRequest {
    #[serde(flatten)]
    pub graph: Graph,

    #[serde(default, rename = "s3Config")]
    pub storage: Option<StorageCredentials>,

    #[serde(default)]
    pub action: EmitMode,
}

/// Catalog entry shown in the editor's template sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub entrypoints: Vec<String>,
    pub default_entrypoint: Option<String>,
}

/// Compiles editor graphs against a catalog and emits them.
///
/// Holds no per-request state: every call builds its own spec cache.
pub struct Pipeline {
    catalog: Arc<dyn TemplateCatalog>,
    executor: Arc<dyn WorkflowExecutor>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<dyn TemplateCatalog>,
        executor: Arc<dyn WorkflowExecutor>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            catalog,
            executor,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one catalog call under the catalog timeout.
    async fn catalog_call<T, F>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.settings.catalog_timeout, call)
            .await
            .map_err(|_| {
                Error::CatalogUnavailable(format!(
                    "{} timed out after {}s",
                    what,
                    self.settings.catalog_timeout.as_secs_f64()
                ))
            })?
    }

    /// Fetch every distinct template the graph uses, concurrently.
    async fn fetch_documents(&self, graph: &Graph) -> Result<HashMap<String, TemplateDocument>> {
        let names: BTreeSet<&str> = graph
            .nodes
            .iter()
            .map(|n| n.template_name.as_str())
            .collect();

        let fetches = names.into_iter().map(|name| async move {
            let what = format!("fetching template '{}'", name);
            let document = self
                .catalog_call(&what, self.catalog.fetch_template(name))
                .await?;
            Ok::<_, Error>((name.to_string(), document))
        });

        Ok(try_join_all(fetches).await?.into_iter().collect())
    }

    /// Compile, link and validate, returning the graph with every violation.
    ///
    /// Fails only on structural or catalog errors; validation violations are
    /// returned alongside the compiled graph.
    pub async fn analyze(&self, graph: &Graph) -> Result<(CompiledGraph, Vec<ValidationError>)> {
        if graph.nodes.is_empty() {
            return Err(Error::InvalidGraph("No nodes provided".to_string()));
        }
        graph::check_graph(graph)?;

        let documents = self.fetch_documents(graph).await?;
        info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            templates = documents.len(),
            "template specs fetched"
        );

        let mut cache = SpecCache::new();
        let mut compiled = graph::compile(graph, &mut cache, |key| {
            let document = documents
                .get(&key.template_name)
                .ok_or_else(|| Error::TemplateNotFound(key.template_name.clone()))?;
            template::resolve(&key.template_name, document, &key.entrypoint)
        })?;
        graph::link(&mut compiled, graph);

        let errors = graph::validate(
            &compiled.tasks,
            &compiled.specs_by_node,
            self.settings.artifact_policy,
        );

        let stats = cache.stats();
        info!(
            tasks = compiled.tasks.len(),
            specs = stats.entry_count,
            cache_hits = stats.hits,
            violations = errors.len(),
            "graph compiled"
        );
        Ok((compiled, errors))
    }

    /// Compile a graph, failing with every violation if validation fails.
    pub async fn compile(&self, graph: &Graph) -> Result<CompiledGraph> {
        let (compiled, errors) = self.analyze(graph).await?;
        if !errors.is_empty() {
            warn!(violations = errors.len(), "graph validation failed");
        }
        graph::into_result(errors)?;
        Ok(compiled)
    }

    /// Compile a request and emit it as its action asks.
    pub async fn run(&self, request: &CompileRequest) -> Result<EmitOutput> {
        let compiled = self.compile(&request.graph).await?;
        let manifest = build_manifest(&compiled, &self.settings.manifest, request.storage.as_ref());
        emit::emit(
            &manifest,
            request.action,
            self.executor.as_ref(),
            self.settings.executor_timeout,
        )
        .await
    }

    /// Resolve the spec of one template entrypoint.
    pub async fn template_spec(&self, name: &str, entrypoint: &str) -> Result<TemplateSpec> {
        let what = format!("fetching template '{}'", name);
        let document = self
            .catalog_call(&what, self.catalog.fetch_template(name))
            .await?;
        template::resolve(name, &document, entrypoint)
    }

    /// Summaries of every template in the catalog, in catalog order.
    pub async fn template_summaries(&self) -> Result<Vec<TemplateSummary>> {
        let names = self
            .catalog_call("listing templates", self.catalog.list_template_names())
            .await?;

        let summaries = names.into_iter().map(|name| async move {
            let what = format!("fetching template '{}'", name);
            let document = self
                .catalog_call(&what, self.catalog.fetch_template(&name))
                .await?;
            Ok::<_, Error>(TemplateSummary {
                entrypoints: template::entrypoints(&document),
                default_entrypoint: template::default_entrypoint(&document),
                name,
            })
        });

        try_join_all(summaries).await
    }
}
