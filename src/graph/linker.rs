//! Artifact linker: cross-node artifact references to data-flow bindings.

use tracing::{debug, warn};

use super::types::{CompiledGraph, Graph};

/// Bind target input artifacts to source outputs along each edge.
///
/// For an edge `source -> target`, each input artifact of the target's spec is
/// bound when the target node's argument under the artifact's name is a
/// reference `source::output` and `output` is a declared output of the
/// source's spec. Anything else (a bare output name, a reference to another
/// node, an undeclared output) leaves the artifact unbound.
///
/// Edges are processed in input order and a later binding replaces an
/// earlier one under the same artifact name.
pub fn link(compiled: &mut CompiledGraph, graph: &Graph) {
    for edge in &graph.edges {
        let (Some(target_node), Some(source_spec), Some(target_spec)) = (
            graph.node(&edge.target),
            compiled.specs_by_node.get(&edge.source).cloned(),
            compiled.specs_by_node.get(&edge.target).cloned(),
        ) else {
            warn!(source = %edge.source, target = %edge.target, "skipping edge between unknown nodes");
            continue;
        };

        let Some(task) = compiled.task_mut(&edge.target) else {
            continue;
        };

        for artifact in &target_spec.input_artifacts {
            let Some(value) = target_node.arguments.get(&artifact.name) else {
                continue;
            };

            let Some(reference) = value.as_reference() else {
                if source_spec.has_output(&value.to_string()) {
                    debug!(
                        target = %edge.target,
                        artifact = %artifact.name,
                        value = %value,
                        "unqualified output name, leaving artifact unbound"
                    );
                }
                continue;
            };

            if reference.source_task_id != edge.source || !source_spec.has_output(&reference.artifact) {
                continue;
            }

            let previous = task
                .artifact_bindings
                .insert(artifact.name.clone(), reference.clone());
            if let Some(previous) = previous {
                debug!(
                    target = %edge.target,
                    artifact = %artifact.name,
                    previous = %previous,
                    current = %reference,
                    "artifact binding replaced by later edge"
                );
            }
        }
    }
}
