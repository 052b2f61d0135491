//! Emission ordering of models.
//!
//! Parents must be emitted before the models that reference them. The default
//! [`SortStrategy::BoundedPasses`] is a best-effort ordering: it seeds the
//! output with every model nobody references, then runs [`HIERARCHY_PASSES`]
//! passes adding models whose single recorded parent is already placed, then
//! appends whatever is left. Multi-parent models and hierarchies deeper than
//! the pass count can come out of dependency order. [`SortStrategy::Topological`]
//! is a full Kahn's-algorithm ordering for those schemas.

use crate::config::SortStrategy;
use crate::schema::{qualified_name, CompiledSchema, HierarchyGraph};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// Passes the bounded sorter makes after seeding.
pub const HIERARCHY_PASSES: usize = 3;

/// Qualified model names in reverse discovery order.
pub fn discovery_order(schema: &CompiledSchema) -> Vec<String> {
    let mut models: Vec<String> = schema
        .models()
        .map(|(package, model, _)| qualified_name(package, model))
        .collect();
    models.reverse();
    models
}

pub fn sort_models(models: &[String], graph: &HierarchyGraph, strategy: SortStrategy) -> Vec<String> {
    match strategy {
        SortStrategy::BoundedPasses => bounded_passes(models, graph),
        SortStrategy::Topological => topological(models, graph),
    }
}

pub fn bounded_passes(models: &[String], graph: &HierarchyGraph) -> Vec<String> {
    let parents = graph.parents();
    let mut placed: IndexSet<&str> = IndexSet::new();

    for model in models {
        if !graph.is_child(model) {
            placed.insert(model);
        }
    }
    log::debug!("Seeded hierarchy with {} root models", placed.len());

    for pass in 0..HIERARCHY_PASSES {
        let mut progressed = false;
        for model in models {
            if placed.contains(model.as_str()) {
                continue;
            }
            let single_placed_parent = parents
                .get(model.as_str())
                .map(|ps| ps.len() == 1 && placed.contains(ps[0]))
                .unwrap_or(false);
            if single_placed_parent {
                placed.insert(model);
                progressed = true;
            }
        }
        if !progressed {
            log::debug!("Hierarchy settled after {} passes", pass + 1);
            break;
        }
    }

    let unplaced: Vec<&str> = models
        .iter()
        .map(String::as_str)
        .filter(|model| !placed.contains(model))
        .collect();
    if !unplaced.is_empty() {
        log::debug!("Appending {} models in original order: {}", unplaced.len(), unplaced.join(", "));
    }
    placed.extend(unplaced);

    placed.into_iter().map(str::to_string).collect()
}

pub fn topological(models: &[String], graph: &HierarchyGraph) -> Vec<String> {
    let known: IndexSet<&str> = models.iter().map(String::as_str).collect();
    let parents = graph.parents();

    let mut in_degree: IndexMap<&str, usize> = IndexMap::new();
    for model in &known {
        let degree = parents
            .get(model)
            .map(|ps| {
                ps.iter()
                    .filter(|p| **p != *model && known.contains(**p))
                    .collect::<IndexSet<_>>()
                    .len()
            })
            .unwrap_or(0);
        in_degree.insert(model, degree);
    }

    let mut ready: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(model, _)| *model)
        .collect();
    let mut sorted: IndexSet<&str> = IndexSet::new();

    while let Some(model) = ready.pop_front() {
        if !sorted.insert(model) {
            continue;
        }
        let Some(children) = graph.children(model) else {
            continue;
        };
        for child in children {
            if child == model {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(child.as_str()) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.push_back(child.as_str());
                }
            }
        }
    }

    let cyclic: Vec<&str> = known.iter().copied().filter(|m| !sorted.contains(m)).collect();
    if !cyclic.is_empty() {
        log::warn!(
            "Relationship cycle between {}; emitting them in original order",
            cyclic.join(", ")
        );
    }
    sorted.extend(cyclic);

    sorted.into_iter().map(str::to_string).collect()
}
