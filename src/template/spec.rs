//! Template spec resolution.
//!
//! Turns a raw template document plus a chosen entrypoint into the
//! normalized view the compiler works with: which parameters and artifacts a
//! node accepts, and which of them must be supplied.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use super::types::TemplateDocument;
use crate::error::{Error, Result};

/// Parameter names that are always mandatory, whatever default a template
/// declares for them. Matched case-insensitively.
pub const ALWAYS_REQUIRED_PARAMS: [&str; 5] = [
    "input_path",
    "output_path",
    "data_path",
    "input_file",
    "output_file",
];

/// Normalized inputs/outputs of one template entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSpec {
    /// Template name (the catalog key)
    #[serde(skip)]
    pub name: String,

    /// Entrypoint this spec was resolved for
    #[serde(skip)]
    pub entrypoint: String,

    pub parameters: Vec<ParamSpec>,

    #[serde(rename = "artifacts")]
    pub input_artifacts: Vec<ArtifactSpec>,

    #[serde(serialize_with = "serialize_outputs")]
    pub outputs: Vec<ArtifactSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    /// Effective default: the local one, else the global one
    pub default: Option<String>,
    pub required: bool,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSpec {
    pub name: String,
    /// Always `false` for outputs
    pub required: bool,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, default: Option<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            default,
            required,
            kind: "parameter",
        }
    }
}

impl ArtifactSpec {
    pub fn input(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            kind: "artifact",
        }
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self::input(name, false)
    }
}

/// Outputs are reported with name and type only.
fn serialize_outputs<S>(outputs: &[ArtifactSpec], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    #[derive(Serialize)]
    struct Output<'a> {
        name: &'a str,
        #[serde(rename = "type")]
        kind: &'a str,
    }

    serializer.collect_seq(outputs.iter().map(|o| Output {
        name: &o.name,
        kind: o.kind,
    }))
}

impl TemplateSpec {
    pub fn parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameter(name).is_some()
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o.name == name)
    }
}

/// Whether a parameter name is on the always-required list.
pub fn is_forced_required(name: &str) -> bool {
    ALWAYS_REQUIRED_PARAMS
        .iter()
        .any(|forced| forced.eq_ignore_ascii_case(name))
}

/// Resolve the spec for one entrypoint of a template document.
///
/// `template_name` is the catalog name the document was fetched under; it is
/// used in preference to `metadata.name`, which catalogs are free to omit.
pub fn resolve(
    template_name: &str,
    document: &TemplateDocument,
    entrypoint: &str,
) -> Result<TemplateSpec> {
    let target = document
        .sub_template(entrypoint)
        .ok_or_else(|| Error::EntrypointNotFound {
            template: template_name.to_string(),
            entrypoint: entrypoint.to_string(),
        })?;

    // Later duplicates win, as a mapping built in document order would.
    let global_defaults: HashMap<&str, Option<&str>> = document
        .spec
        .arguments
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.value.as_deref()))
        .collect();

    let parameters = target
        .inputs
        .parameters
        .iter()
        .map(|p| {
            let global_default = global_defaults.get(p.name.as_str()).copied().flatten();
            let default = p.default.as_deref().or(global_default).map(str::to_string);
            let required = default.is_none() || is_forced_required(&p.name);
            ParamSpec::new(&p.name, default, required)
        })
        .collect();

    let input_artifacts = target
        .inputs
        .artifacts
        .iter()
        .map(|a| ArtifactSpec::input(&a.name, !a.optional))
        .collect();

    let outputs = target
        .outputs
        .artifacts
        .iter()
        .map(|o| ArtifactSpec::output(&o.name))
        .collect();

    Ok(TemplateSpec {
        name: template_name.to_string(),
        entrypoint: entrypoint.to_string(),
        parameters,
        input_artifacts,
        outputs,
    })
}

/// Names of all entrypoints (sub-templates) in a document.
pub fn entrypoints(document: &TemplateDocument) -> Vec<String> {
    document
        .spec
        .templates
        .iter()
        .map(|t| t.name.clone())
        .collect()
}

/// The entrypoint a new node should start with.
pub fn default_entrypoint(document: &TemplateDocument) -> Option<String> {
    document
        .spec
        .entrypoint
        .clone()
        .or_else(|| document.spec.templates.first().map(|t| t.name.clone()))
}
