//! Emitting compiled graphs: YAML download or submission to the executor.

mod manifest;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::argo::WorkflowExecutor;
use crate::error::{Error, Result};

pub use manifest::{
    build_manifest, task_name, ArtifactArgument, Dag, DagTask, DagTemplate, EnvVar,
    LocalObjectReference, ManifestMetadata, ManifestSettings, ParameterArgument,
    StorageCredentials, TaskArguments, WorkflowManifest, WorkflowSpec,
};

/// What to do with a compiled workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitMode {
    /// Hand the workflow to the executor
    #[default]
    Submit,
    /// Return the YAML definition without contacting the executor
    Download,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutput {
    /// YAML workflow definition
    Definition(String),
    /// Execution identifier assigned by the executor
    Submitted(String),
}

/// Serialize a manifest as a YAML workflow definition.
pub fn to_yaml(manifest: &WorkflowManifest) -> Result<String> {
    Ok(serde_yaml::to_string(manifest)?)
}

/// Emit a manifest.
///
/// `Download` is pure. `Submit` performs a single call to the executor,
/// bounded by `timeout`; expiry is reported as a submission failure.
pub async fn emit(
    manifest: &WorkflowManifest,
    mode: EmitMode,
    executor: &dyn WorkflowExecutor,
    timeout: Duration,
) -> Result<EmitOutput> {
    match mode {
        EmitMode::Download => to_yaml(manifest).map(EmitOutput::Definition),
        EmitMode::Submit => {
            let id = tokio::time::timeout(timeout, executor.submit(manifest))
                .await
                .map_err(|_| {
                    Error::ExecutorSubmissionFailed(format!(
                        "submission timed out after {}s",
                        timeout.as_secs_f64()
                    ))
                })??;
            let task_count: usize = manifest.spec.templates.iter().map(|t| t.dag.tasks.len()).sum();
            info!(execution_id = %id, tasks = task_count, "workflow handed to executor");
            Ok(EmitOutput::Submitted(id))
        }
    }
}
