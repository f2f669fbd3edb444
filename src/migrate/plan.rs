//! Load order for the migrated tables.

use std::collections::VecDeque;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Table '{table}' depends on undefined table '{dependency}'")]
    UnknownDependency { table: String, dependency: String },

    #[error("Circular dependency detected involving tables: {0:?}")]
    Cycle(Vec<String>),
}

/// Tables written by the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyTable {
    Zone,
    Hospital,
    Member,
    Attendee,
    Finance,
}

impl LegacyTable {
    pub const ALL: [LegacyTable; 5] = [
        LegacyTable::Zone,
        LegacyTable::Hospital,
        LegacyTable::Member,
        LegacyTable::Attendee,
        LegacyTable::Finance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LegacyTable::Zone => "zone",
            LegacyTable::Hospital => "hospital",
            LegacyTable::Member => "member",
            LegacyTable::Attendee => "attendee",
            LegacyTable::Finance => "finance",
        }
    }

    /// Tables whose rows must already be loaded before this one.
    pub fn depends_on(self) -> &'static [LegacyTable] {
        match self {
            LegacyTable::Zone => &[],
            LegacyTable::Hospital => &[LegacyTable::Zone],
            LegacyTable::Member => &[LegacyTable::Hospital],
            LegacyTable::Attendee => &[LegacyTable::Hospital, LegacyTable::Member],
            LegacyTable::Finance => &[LegacyTable::Hospital, LegacyTable::Member],
        }
    }

    /// Tables that are emptied and reloaded on every run.
    pub fn is_reloaded(self) -> bool {
        matches!(
            self,
            LegacyTable::Member | LegacyTable::Attendee | LegacyTable::Finance
        )
    }
}

impl fmt::Display for LegacyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered list of tables to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    order: Vec<LegacyTable>,
}

impl LoadPlan {
    /// Plan for every table in [`LegacyTable::ALL`].
    pub fn build() -> Result<Self, PlanError> {
        let graph: IndexMap<LegacyTable, Vec<LegacyTable>> = LegacyTable::ALL
            .iter()
            .map(|&t| (t, t.depends_on().to_vec()))
            .collect();
        Ok(LoadPlan {
            order: topological_order(&graph)?,
        })
    }

    pub fn load_order(&self) -> &[LegacyTable] {
        &self.order
    }

    /// Reloaded tables, dependents first, so deletes never orphan a reference.
    pub fn clear_order(&self) -> Vec<LegacyTable> {
        self.order
            .iter()
            .rev()
            .copied()
            .filter(|t| t.is_reloaded())
            .collect()
    }
}

/// Sort `graph` (node → dependencies) so every node follows its dependencies.
///
/// Kahn's algorithm; ties are broken by declaration order, so the result is
/// deterministic.
pub fn topological_order<T>(graph: &IndexMap<T, Vec<T>>) -> Result<Vec<T>, PlanError>
where
    T: Copy + Eq + std::hash::Hash + fmt::Display,
{
    let mut in_degree: IndexMap<T, usize> = graph.keys().map(|&node| (node, 0)).collect();
    let mut dependents: IndexMap<T, Vec<T>> = graph.keys().map(|&node| (node, Vec::new())).collect();

    for (&node, dependencies) in graph {
        for dep in dependencies {
            let Some(children) = dependents.get_mut(dep) else {
                return Err(PlanError::UnknownDependency {
                    table: node.to_string(),
                    dependency: dep.to_string(),
                });
            };
            children.push(node);
            if let Some(degree) = in_degree.get_mut(&node) {
                *degree += 1;
            }
        }
    }

    let mut queue: VecDeque<T> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&node, _)| node)
        .collect();

    let mut sorted = Vec::with_capacity(graph.len());

    while let Some(node) = queue.pop_front() {
        sorted.push(node);

        for dependent in dependents.get(&node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*dependent);
                }
            }
        }
    }

    if sorted.len() != graph.len() {
        let unprocessed = graph
            .keys()
            .filter(|node| !sorted.contains(node))
            .map(|node| node.to_string())
            .collect();
        return Err(PlanError::Cycle(unprocessed));
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&'static str, &[&'static str])]) -> IndexMap<&'static str, Vec<&'static str>> {
        edges.iter().map(|(node, deps)| (*node, deps.to_vec())).collect()
    }

    #[test]
    fn test_builtin_plan_order() {
        let plan = LoadPlan::build().unwrap();
        assert_eq!(
            plan.load_order(),
            &[
                LegacyTable::Zone,
                LegacyTable::Hospital,
                LegacyTable::Member,
                LegacyTable::Attendee,
                LegacyTable::Finance,
            ]
        );
    }

    #[test]
    fn test_clear_order_is_reversed() {
        let plan = LoadPlan::build().unwrap();
        assert_eq!(
            plan.clear_order(),
            vec![LegacyTable::Finance, LegacyTable::Attendee, LegacyTable::Member]
        );
    }

    #[test]
    fn test_diamond_dependency() {
        let g = graph(&[("D", &["B", "C"]), ("B", &["A"]), ("C", &["A"]), ("A", &[])]);
        let order = topological_order(&g).unwrap();
        assert_eq!(order, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_independent_nodes_keep_declaration_order() {
        let g = graph(&[("C", &[]), ("A", &[]), ("B", &[])]);
        assert_eq!(topological_order(&g).unwrap(), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let g = graph(&[("A", &["B"]), ("B", &["A"]), ("C", &[])]);
        let err = topological_order(&g).unwrap_err();
        assert_eq!(err, PlanError::Cycle(vec!["A".to_string(), "B".to_string()]));
        assert!(err.to_string().contains("Circular dependency"));
    }

    #[test]
    fn test_missing_dependency() {
        let g = graph(&[("A", &["B"])]);
        let err = topological_order(&g).unwrap_err();
        assert!(err.to_string().contains("depends on undefined table 'B'"));
    }
}
