//! Validation of compiled tasks against their specs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::types::CompiledTask;
use crate::error::{Error, Result};
use crate::template::TemplateSpec;

/// How required input artifacts are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactPolicy {
    /// Required artifacts are not checked
    #[default]
    Ignore,
    /// A required artifact must be connected (or given as a parameter value
    /// of the same name)
    Enforce,
}

impl std::str::FromStr for ArtifactPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(ArtifactPolicy::Ignore),
            "enforce" => Ok(ArtifactPolicy::Enforce),
            other => Err(Error::Config(format!(
                "Unknown artifact policy '{}', expected 'ignore' or 'enforce'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Parameter,
    Artifact,
}

/// One unsatisfied mandatory input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub node_id: String,
    pub template_name: String,
    pub field: String,
    pub kind: FieldKind,
    pub message: String,
}

impl ValidationError {
    fn missing(task: &CompiledTask, field: &str, kind: FieldKind) -> Self {
        let what = match kind {
            FieldKind::Parameter => "parameter",
            FieldKind::Artifact => "artifact",
        };
        Self {
            node_id: task.node_id.clone(),
            template_name: task.template_ref.name.clone(),
            field: field.to_string(),
            kind,
            message: format!(
                "Node '{}' ({}): {} '{}' is missing (fill it in manually or connect it)",
                task.template_ref.name, task.node_id, what, field
            ),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Collect every unsatisfied mandatory input across all tasks.
///
/// A required parameter is satisfied by a literal binding that is non-empty
/// after trimming, or by an artifact binding with the same name. Required
/// artifacts are only checked under [`ArtifactPolicy::Enforce`].
pub fn validate(
    tasks: &[CompiledTask],
    specs_by_node: &HashMap<String, Arc<TemplateSpec>>,
    policy: ArtifactPolicy,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for task in tasks {
        let Some(spec) = specs_by_node.get(&task.node_id) else {
            continue;
        };

        let has_literal = |name: &str| {
            task.parameter_bindings
                .get(name)
                .is_some_and(|v| !v.trim().is_empty())
        };
        let is_connected = |name: &str| task.artifact_bindings.contains_key(name);

        for param in spec.parameters.iter().filter(|p| p.required) {
            if !has_literal(&param.name) && !is_connected(&param.name) {
                errors.push(ValidationError::missing(task, &param.name, FieldKind::Parameter));
            }
        }

        if policy == ArtifactPolicy::Enforce {
            for artifact in spec.input_artifacts.iter().filter(|a| a.required) {
                if !is_connected(&artifact.name) && !has_literal(&artifact.name) {
                    errors.push(ValidationError::missing(task, &artifact.name, FieldKind::Artifact));
                }
            }
        }
    }

    errors
}

/// Turn a validation result into the pipeline's error, if non-empty.
pub fn into_result(errors: Vec<ValidationError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::ValidationFailed(
            errors.into_iter().map(|e| e.message).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{CompiledTask, Node, TaskOutputRef};
    use crate::template::{ArtifactSpec, ParamSpec};

    fn spec() -> Arc<TemplateSpec> {
        Arc::new(TemplateSpec {
            name: "tp-scaling".into(),
            entrypoint: "fit".into(),
            parameters: vec![
                ParamSpec::new("data_path", Some("/default".into()), true),
                ParamSpec::new("alpha", Some("0.5".into()), false),
                ParamSpec::new("model", None, true),
            ],
            input_artifacts: vec![
                ArtifactSpec::input("dataset", true),
                ArtifactSpec::input("weights", false),
            ],
            outputs: vec![],
        })
    }

    fn task(id: &str) -> CompiledTask {
        CompiledTask::new(&Node {
            id: id.into(),
            template_name: "tp-scaling".into(),
            entrypoint: "fit".into(),
            arguments: Default::default(),
        })
    }

    fn specs(ids: &[&str]) -> HashMap<String, Arc<TemplateSpec>> {
        ids.iter().map(|id| (id.to_string(), spec())).collect()
    }

    #[test]
    fn test_missing_forced_parameter_reported_once() {
        let mut n = task("N");
        n.parameter_bindings.insert("model".into(), "m".into());

        let errors = validate(&[n], &specs(&["N"]), ArtifactPolicy::Ignore);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].node_id, "N");
        assert_eq!(errors[0].field, "data_path");
        assert_eq!(errors[0].kind, FieldKind::Parameter);
        assert!(errors[0].message.contains("tp-scaling"));
    }

    #[test]
    fn test_whitespace_literal_does_not_satisfy() {
        let mut n = task("N");
        n.parameter_bindings.insert("data_path".into(), "   ".into());
        n.parameter_bindings.insert("model".into(), "m".into());

        let errors = validate(&[n], &specs(&["N"]), ArtifactPolicy::Ignore);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "data_path");
    }

    #[test]
    fn test_artifact_binding_satisfies_parameter_by_name() {
        let mut n = task("N");
        n.parameter_bindings.insert("data_path".into(), "/in".into());
        n.artifact_bindings
            .insert("model".into(), TaskOutputRef::new("fit", "model"));

        assert!(validate(&[n], &specs(&["N"]), ArtifactPolicy::Ignore).is_empty());
    }

    #[test]
    fn test_errors_aggregated_across_tasks() {
        let errors = validate(&[task("a"), task("b")], &specs(&["a", "b"]), ArtifactPolicy::Ignore);
        let fields: Vec<_> = errors
            .iter()
            .map(|e| (e.node_id.as_str(), e.field.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![("a", "data_path"), ("a", "model"), ("b", "data_path"), ("b", "model")]
        );
    }

    #[test]
    fn test_required_artifacts_ignored_by_default() {
        let mut n = task("N");
        n.parameter_bindings.insert("data_path".into(), "/in".into());
        n.parameter_bindings.insert("model".into(), "m".into());

        assert!(validate(&[n], &specs(&["N"]), ArtifactPolicy::default()).is_empty());
    }

    #[test]
    fn test_required_artifacts_enforced() {
        let mut n = task("N");
        n.parameter_bindings.insert("data_path".into(), "/in".into());
        n.parameter_bindings.insert("model".into(), "m".into());

        let errors = validate(&[n.clone()], &specs(&["N"]), ArtifactPolicy::Enforce);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "dataset");
        assert_eq!(errors[0].kind, FieldKind::Artifact);

        n.artifact_bindings
            .insert("dataset".into(), TaskOutputRef::new("load", "dataset"));
        assert!(validate(&[n], &specs(&["N"]), ArtifactPolicy::Enforce).is_empty());
    }

    #[test]
    fn test_into_result() {
        assert!(into_result(vec![]).is_ok());

        let errors = validate(&[task("a")], &specs(&["a"]), ArtifactPolicy::Ignore);
        let err = into_result(errors).unwrap_err();
        match &err {
            Error::ValidationFailed(messages) => assert_eq!(messages.len(), 2),
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
        assert!(err.to_string().contains("'data_path'"));
        assert!(err.to_string().contains("'model'"));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Enforce".parse::<ArtifactPolicy>().unwrap(), ArtifactPolicy::Enforce);
        assert_eq!(" ignore ".parse::<ArtifactPolicy>().unwrap(), ArtifactPolicy::Ignore);
        assert!("strict".parse::<ArtifactPolicy>().is_err());
    }
}
