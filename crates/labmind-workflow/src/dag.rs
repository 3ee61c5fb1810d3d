//! Dependency validation and topological ordering.

use std::collections::{HashMap, HashSet};

use labmind_core::StepId;

use crate::error::{WorkflowError, WorkflowResult};
use crate::types::WorkflowStep;

/// Traversal colors for cycle detection: white = unvisited, gray = on the
/// current DFS path, black = fully explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Check that every declared dependency id exists among the step set.
pub fn validate_dependencies(steps: &[WorkflowStep]) -> WorkflowResult<()> {
    let known: HashSet<StepId> = steps.iter().map(|s| s.id).collect();
    for step in steps {
        for dependency in &step.depends_on {
            if !known.contains(dependency) {
                return Err(WorkflowError::UnknownDependency {
                    step: step.name.clone(),
                    dependency: *dependency,
                });
            }
        }
    }
    Ok(())
}

/// Topological order via depth-first traversal with three-color cycle
/// detection. Dependencies come before their dependents.
///
/// # Errors
///
/// `CircularDependency` carrying the step names along the cycle.
pub fn topological_order(steps: &[WorkflowStep]) -> WorkflowResult<Vec<StepId>> {
    validate_dependencies(steps)?;

    let by_id: HashMap<StepId, &WorkflowStep> = steps.iter().map(|s| (s.id, s)).collect();
    let mut colors: HashMap<StepId, Color> = steps.iter().map(|s| (s.id, Color::White)).collect();
    let mut order: Vec<StepId> = Vec::with_capacity(steps.len());
    let mut path: Vec<StepId> = Vec::new();

    // Visit steps in declaration order so the sort is stable for callers.
    for step in steps {
        if colors[&step.id] == Color::White {
            visit(step.id, &by_id, &mut colors, &mut order, &mut path)?;
        }
    }
    Ok(order)
}

fn visit(
    id: StepId,
    by_id: &HashMap<StepId, &WorkflowStep>,
    colors: &mut HashMap<StepId, Color>,
    order: &mut Vec<StepId>,
    path: &mut Vec<StepId>,
) -> WorkflowResult<()> {
    colors.insert(id, Color::Gray);
    path.push(id);

    // Sort dependency ids so traversal (and any reported cycle) is
    // deterministic despite the HashSet.
    let mut dependencies: Vec<StepId> = by_id[&id].depends_on.iter().copied().collect();
    dependencies.sort();

    for dependency in dependencies {
        match colors[&dependency] {
            Color::Black => {}
            Color::White => visit(dependency, by_id, colors, order, path)?,
            Color::Gray => {
                // Back edge: the cycle is the path from the gray node on.
                let start = path
                    .iter()
                    .position(|&p| p == dependency)
                    .unwrap_or(0);
                let mut cycle: Vec<String> = path[start..]
                    .iter()
                    .map(|p| by_id[p].name.clone())
                    .collect();
                cycle.push(by_id[&dependency].name.clone());
                return Err(WorkflowError::CircularDependency { cycle });
            }
        }
    }

    path.pop();
    colors.insert(id, Color::Black);
    order.push(id);
    Ok(())
}
