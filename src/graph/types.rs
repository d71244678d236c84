//! Editor graph and compiled task types.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::template::{SpecKey, TemplateSpec};

/// Separator of the `"<nodeId>::<artifactName>"` reference convention.
pub const REFERENCE_SEPARATOR: &str = "::";

/// A node placed in the visual editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node ID across the whole graph
    pub id: String,

    /// Catalog name of the template
    pub template_name: String,

    /// Sub-template to run
    pub entrypoint: String,

    /// User-entered values, keyed by parameter or artifact name
    #[serde(default)]
    pub arguments: BTreeMap<String, ArgumentValue>,
}

impl Node {
    pub fn spec_key(&self) -> SpecKey {
        SpecKey::new(&self.template_name, &self.entrypoint)
    }
}

/// A dependency/data-flow connection: `target` runs after `source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// The graph as submitted by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Reference to an output artifact of another task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskOutputRef {
    pub source_task_id: String,
    pub artifact: String,
}

impl TaskOutputRef {
    pub fn new(source_task_id: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            source_task_id: source_task_id.into(),
            artifact: artifact.into(),
        }
    }
}

impl fmt::Display for TaskOutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.source_task_id, REFERENCE_SEPARATOR, self.artifact)
    }
}

/// A node argument: either literal data or a reference to another node's
/// output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentValue {
    Literal(String),
    ArtifactRef(TaskOutputRef),
}

impl ArgumentValue {
    /// Parse the boundary string form.
    ///
    /// A value is a reference only when it splits on the first `::` into two
    /// non-empty halves; anything else is kept as literal text.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(REFERENCE_SEPARATOR) {
            Some((node, artifact)) if !node.is_empty() && !artifact.is_empty() => {
                ArgumentValue::ArtifactRef(TaskOutputRef::new(node, artifact))
            }
            _ => ArgumentValue::Literal(raw.to_string()),
        }
    }

    pub fn as_reference(&self) -> Option<&TaskOutputRef> {
        match self {
            ArgumentValue::ArtifactRef(r) => Some(r),
            ArgumentValue::Literal(_) => None,
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Literal(s) => f.write_str(s),
            ArgumentValue::ArtifactRef(r) => fmt::Display::fmt(r, f),
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(raw: &str) -> Self {
        ArgumentValue::parse(raw)
    }
}

impl Serialize for ArgumentValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArgumentValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // The editor sends numbers and booleans straight from form inputs.
        let value = serde_json::Value::deserialize(deserializer)?;
        let raw = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(serde::de::Error::custom(
                    "argument values must be strings, numbers or booleans",
                ))
            }
            other => other.to_string(),
        };
        Ok(ArgumentValue::parse(&raw))
    }
}

/// `templateRef` of a compiled task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateRef {
    pub name: String,
    pub template: String,
}

/// One node after compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTask {
    pub node_id: String,
    pub template_ref: TemplateRef,
    pub parameter_bindings: BTreeMap<String, String>,
    pub artifact_bindings: BTreeMap<String, TaskOutputRef>,
    pub depends_on: BTreeSet<String>,
}

impl CompiledTask {
    pub fn new(node: &Node) -> Self {
        Self {
            node_id: node.id.clone(),
            template_ref: TemplateRef {
                name: node.template_name.clone(),
                template: node.entrypoint.clone(),
            },
            parameter_bindings: BTreeMap::new(),
            artifact_bindings: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }
}

/// Compiled tasks plus the specs they were compiled against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledGraph {
    /// Tasks in node input order
    pub tasks: Vec<CompiledTask>,

    /// Resolved spec per node ID
    pub specs_by_node: HashMap<String, Arc<TemplateSpec>>,
}

impl CompiledGraph {
    pub fn task(&self, node_id: &str) -> Option<&CompiledTask> {
        self.tasks.iter().find(|t| t.node_id == node_id)
    }

    pub fn task_mut(&mut self, node_id: &str) -> Option<&mut CompiledTask> {
        self.tasks.iter_mut().find(|t| t.node_id == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            ArgumentValue::parse("fit::model"),
            ArgumentValue::ArtifactRef(TaskOutputRef::new("fit", "model"))
        );
    }

    #[test]
    fn test_parse_literals() {
        for raw in ["model", "", "::model", "fit::", "s3://bucket/key"] {
            assert_eq!(
                ArgumentValue::parse(raw),
                ArgumentValue::Literal(raw.to_string()),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_reference_splits_on_first_separator() {
        let value = ArgumentValue::parse("a::b::c");
        assert_eq!(value.as_reference(), Some(&TaskOutputRef::new("a", "b::c")));
        assert_eq!(value.to_string(), "a::b::c");
    }

    #[test]
    fn test_deserialize_node_arguments() {
        let node: Node = serde_json::from_value(serde_json::json!({
            "id": "transform",
            "template_name": "tp-scaling",
            "entrypoint": "transform",
            "arguments": {
                "model": "fit::model",
                "epochs": 5,
                "verbose": true,
                "note": null,
                "data_path": "/data"
            }
        }))
        .unwrap();

        assert!(node.arguments["model"].as_reference().is_some());
        assert_eq!(node.arguments["epochs"], ArgumentValue::Literal("5".into()));
        assert_eq!(node.arguments["verbose"].to_string(), "true");
        assert_eq!(node.arguments["note"], ArgumentValue::Literal(String::new()));
        assert_eq!(node.spec_key(), SpecKey::new("tp-scaling", "transform"));
    }

    #[test]
    fn test_deserialize_rejects_nested_argument() {
        let result: std::result::Result<Node, _> = serde_json::from_value(serde_json::json!({
            "id": "a",
            "template_name": "t",
            "entrypoint": "e",
            "arguments": { "x": {"nested": 1} }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_argument_serializes_as_text() {
        let value = ArgumentValue::parse("fit::model");
        assert_eq!(serde_json::to_value(&value).unwrap(), "fit::model");
    }
}
