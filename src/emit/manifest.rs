//! Argo `Workflow` manifest built from a compiled graph.

use serde::{Deserialize, Serialize};

use crate::graph::{CompiledGraph, TaskOutputRef, TemplateRef};

const API_VERSION: &str = "argoproj.io/v1alpha1";
const KIND: &str = "Workflow";

/// Workflow-level settings applied to every emitted manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSettings {
    /// `metadata.generateName` prefix
    pub generate_name: String,
    pub namespace: String,
    /// Name of the DAG template (and the workflow entrypoint)
    pub entrypoint: String,
    pub image_pull_secrets: Vec<String>,
    /// Storage endpoint used when credentials carry none
    pub default_storage_endpoint: String,
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            generate_name: "vm-gui-job-".to_string(),
            namespace: "virtual-measurement".to_string(),
            entrypoint: "main-dag".to_string(),
            image_pull_secrets: vec!["vm-pipeline-image-pull-secret".to_string()],
            default_storage_endpoint: "https://s3.rwth-aachen.de".to_string(),
        }
    }
}

/// Object-storage credentials, as sent by the editor's storage dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageCredentials {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl StorageCredentials {
    /// Environment bindings injected into every task.
    ///
    /// Empty when no access key is set.
    pub fn env(&self, default_endpoint: &str) -> Vec<EnvVar> {
        if self.access_key.is_empty() {
            return Vec::new();
        }
        let endpoint = self
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(default_endpoint);
        vec![
            EnvVar::new("AWS_ACCESS_KEY_ID", &self.access_key),
            EnvVar::new("AWS_SECRET_ACCESS_KEY", &self.secret_key),
            EnvVar::new("S3_ENDPOINT_URL", endpoint),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: ManifestMetadata,
    pub spec: WorkflowSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    pub generate_name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    pub entrypoint: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
    pub templates: Vec<DagTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalObjectReference {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagTemplate {
    pub name: String,
    pub dag: Dag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dag {
    pub tasks: Vec<DagTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DagTask {
    pub name: String,
    pub template_ref: TemplateRef,
    #[serde(skip_serializing_if = "TaskArguments::is_empty")]
    pub arguments: TaskArguments,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskArguments {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterArgument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactArgument>,
}

impl TaskArguments {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.artifacts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterArgument {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactArgument {
    pub name: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// DAG task name for a node: `node-<id>`, lowercase, underscores as hyphens.
pub fn task_name(node_id: &str) -> String {
    format!("node-{}", node_id).replace('_', "-").to_lowercase()
}

/// `from` expression pointing at another task's output artifact.
fn artifact_source(reference: &TaskOutputRef) -> String {
    format!(
        "{{{{tasks.{}.outputs.artifacts.{}}}}}",
        task_name(&reference.source_task_id),
        reference.artifact
    )
}

/// Build the manifest for a compiled (and validated) graph.
pub fn build_manifest(
    graph: &CompiledGraph,
    settings: &ManifestSettings,
    credentials: Option<&StorageCredentials>,
) -> WorkflowManifest {
    let env = credentials
        .map(|c| c.env(&settings.default_storage_endpoint))
        .unwrap_or_default();

    let tasks = graph
        .tasks
        .iter()
        .map(|task| DagTask {
            name: task_name(&task.node_id),
            template_ref: task.template_ref.clone(),
            arguments: TaskArguments {
                parameters: task
                    .parameter_bindings
                    .iter()
                    .map(|(name, value)| ParameterArgument {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
                artifacts: task
                    .artifact_bindings
                    .iter()
                    .map(|(name, reference)| ArtifactArgument {
                        name: name.clone(),
                        from: artifact_source(reference),
                    })
                    .collect(),
            },
            dependencies: task.depends_on.iter().map(|id| task_name(id)).collect(),
            env: env.clone(),
        })
        .collect();

    WorkflowManifest {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        metadata: ManifestMetadata {
            generate_name: settings.generate_name.clone(),
            namespace: settings.namespace.clone(),
        },
        spec: WorkflowSpec {
            entrypoint: settings.entrypoint.clone(),
            image_pull_secrets: settings
                .image_pull_secrets
                .iter()
                .map(|name| LocalObjectReference { name: name.clone() })
                .collect(),
            templates: vec![DagTemplate {
                name: settings.entrypoint.clone(),
                dag: Dag { tasks },
            }],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::graph::{CompiledTask, Node};

    fn compiled() -> CompiledGraph {
        let fit = CompiledTask::new(&Node {
            id: "fit_1".into(),
            template_name: "tp-scaling".into(),
            entrypoint: "fit".into(),
            arguments: Default::default(),
        });
        let mut transform = CompiledTask::new(&Node {
            id: "Transform".into(),
            template_name: "tp-scaling".into(),
            entrypoint: "transform".into(),
            arguments: Default::default(),
        });
        transform
            .parameter_bindings
            .insert("data_path".into(), "/data".into());
        transform
            .artifact_bindings
            .insert("model".into(), TaskOutputRef::new("fit_1", "model"));
        transform.depends_on.insert("fit_1".into());

        CompiledGraph {
            tasks: vec![fit, transform],
            specs_by_node: HashMap::new(),
        }
    }

    #[test]
    fn test_task_name() {
        assert_eq!(task_name("fit_1"), "node-fit-1");
        assert_eq!(task_name("Transform"), "node-transform");
    }

    #[test]
    fn test_build_manifest() {
        let manifest = build_manifest(&compiled(), &ManifestSettings::default(), None);
        assert_eq!(manifest.api_version, "argoproj.io/v1alpha1");
        assert_eq!(manifest.spec.entrypoint, "main-dag");
        assert_eq!(manifest.spec.templates[0].name, "main-dag");

        let tasks = &manifest.spec.templates[0].dag.tasks;
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].dependencies.is_empty());
        assert!(tasks[0].arguments.is_empty());

        let transform = &tasks[1];
        assert_eq!(transform.name, "node-transform");
        assert_eq!(transform.template_ref.template, "transform");
        assert_eq!(transform.dependencies, vec!["node-fit-1"]);
        assert_eq!(transform.arguments.parameters[0].value, "/data");
        assert_eq!(
            transform.arguments.artifacts[0].from,
            "{{tasks.node-fit-1.outputs.artifacts.model}}"
        );
        assert!(transform.env.is_empty());
    }

    #[test]
    fn test_credentials_applied_to_every_task() {
        let credentials = StorageCredentials {
            access_key: "AKIA".into(),
            secret_key: "s3cr3t".into(),
            endpoint: None,
        };
        let manifest = build_manifest(&compiled(), &ManifestSettings::default(), Some(&credentials));
        for task in &manifest.spec.templates[0].dag.tasks {
            assert_eq!(task.env.len(), 3);
            assert_eq!(task.env[0], EnvVar::new("AWS_ACCESS_KEY_ID", "AKIA"));
            assert_eq!(task.env[2], EnvVar::new("S3_ENDPOINT_URL", "https://s3.rwth-aachen.de"));
        }
    }

    #[test]
    fn test_credentials_without_access_key_inject_nothing() {
        let credentials = StorageCredentials {
            endpoint: Some("https://minio.local".into()),
            ..Default::default()
        };
        assert!(credentials.env("https://s3.example").is_empty());
    }

    #[test]
    fn test_credentials_endpoint_override() {
        let credentials: StorageCredentials = serde_json::from_value(serde_json::json!({
            "accessKey": "k",
            "secretKey": "s",
            "endpoint": "https://minio.local"
        }))
        .unwrap();
        let env = credentials.env("https://s3.example");
        assert_eq!(env[2].value, "https://minio.local");
    }

    #[test]
    fn test_manifest_yaml_field_names() {
        let manifest = build_manifest(&compiled(), &ManifestSettings::default(), None);
        let value = serde_yaml::to_value(&manifest).unwrap();
        assert_eq!(value["apiVersion"], "argoproj.io/v1alpha1");
        assert_eq!(value["metadata"]["generateName"], "vm-gui-job-");
        assert_eq!(
            value["spec"]["imagePullSecrets"][0]["name"],
            "vm-pipeline-image-pull-secret"
        );
        let task = &value["spec"]["templates"][0]["dag"]["tasks"][1];
        assert_eq!(task["templateRef"]["name"], "tp-scaling");
        assert!(value["spec"]["templates"][0]["dag"]["tasks"][0]
            .get("arguments")
            .is_none());
    }
}
