//! Graph compiler: nodes and edges to compiled tasks.

use std::collections::HashMap;

use tracing::debug;

use super::types::{CompiledGraph, CompiledTask, Graph};
use crate::error::{Error, Result};
use crate::template::{SpecCache, SpecKey, TemplateSpec};

/// Compile the editor graph into tasks with literal parameter bindings and
/// dependency edges.
///
/// Each node's spec is looked up in `cache`, calling `resolver` on a miss.
/// Argument keys that are not declared parameters of the node's spec are
/// dropped without error. Artifact bindings are left empty for the linker.
///
/// Expects a graph that passed [`check_graph`](super::check_graph).
pub fn compile<F>(graph: &Graph, cache: &mut SpecCache, mut resolver: F) -> Result<CompiledGraph>
where
    F: FnMut(&SpecKey) -> Result<TemplateSpec>,
{
    let mut tasks = Vec::with_capacity(graph.nodes.len());
    let mut specs_by_node = HashMap::with_capacity(graph.nodes.len());

    for node in &graph.nodes {
        let spec = cache.get_or_resolve(&node.spec_key(), &mut resolver)?;

        let mut task = CompiledTask::new(node);
        for (name, value) in &node.arguments {
            if spec.has_parameter(name) {
                task.parameter_bindings
                    .insert(name.clone(), value.to_string());
            } else {
                debug!(node_id = %node.id, argument = %name, "dropping undeclared argument");
            }
        }

        tasks.push(task);
        specs_by_node.insert(node.id.clone(), spec);
    }

    let mut compiled = CompiledGraph {
        tasks,
        specs_by_node,
    };

    for edge in &graph.edges {
        let target = compiled.task_mut(&edge.target).ok_or_else(|| {
            Error::InvalidGraph(format!(
                "Edge target '{}' is not a node of this graph",
                edge.target
            ))
        })?;
        target.depends_on.insert(edge.source.clone());
    }

    Ok(compiled)
}
