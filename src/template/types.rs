//! Raw Argo `WorkflowTemplate` document types.
//!
//! Only the fields the resolver reads are modelled; everything else in the
//! document is ignored on deserialization.

use serde::{Deserialize, Deserializer, Serialize};

/// A workflow template document as served by the catalog.
///
/// # Example YAML
///
/// ```yaml
/// metadata:
///   name: tp-time-series-scaling
/// spec:
///   entrypoint: fit
///   arguments:
///     parameters:
///       - name: scaler
///         value: standard
///   templates:
///     - name: fit
///       inputs:
///         parameters:
///           - name: data_path
///         artifacts:
///           - name: dataset
///       outputs:
///         artifacts:
///           - name: model
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateDocument {
    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub spec: TemplateDocumentSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateDocumentSpec {
    /// Entrypoint used when the caller does not pick one
    #[serde(default)]
    pub entrypoint: Option<String>,

    /// Workflow-level arguments (global defaults)
    #[serde(default)]
    pub arguments: Arguments,

    /// Sub-templates, one per entrypoint
    #[serde(default)]
    pub templates: Vec<SubTemplate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub parameters: Vec<GlobalParameter>,
}

/// A workflow-level argument. Its `value` acts as the global default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalParameter {
    pub name: String,

    #[serde(default, deserialize_with = "scalar_string")]
    pub value: Option<String>,
}

/// One named sub-template (entrypoint).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubTemplate {
    pub name: String,

    #[serde(default)]
    pub inputs: Inputs,

    #[serde(default)]
    pub outputs: Outputs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inputs {
    #[serde(default)]
    pub parameters: Vec<InputParameter>,

    #[serde(default)]
    pub artifacts: Vec<InputArtifact>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub artifacts: Vec<OutputArtifact>,
}

/// An entrypoint-local parameter. Its `default` is the local default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputParameter {
    pub name: String,

    #[serde(default, deserialize_with = "scalar_string")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputArtifact {
    pub name: String,

    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub name: String,
}

/// Accept any scalar as a string; `null` stays absent.
///
/// Template authors write `default: 10` or `value: true` as often as quoted
/// strings, and Argo passes every parameter as text anyway.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl TemplateDocument {
    /// The template's name from its metadata, if present.
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    /// Find a sub-template by entrypoint name.
    pub fn sub_template(&self, entrypoint: &str) -> Option<&SubTemplate> {
        self.spec.templates.iter().find(|t| t.name == entrypoint)
    }
}
