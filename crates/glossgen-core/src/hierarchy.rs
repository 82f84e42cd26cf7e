use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::concept::ConceptStore;
use crate::relation::{Predicate, RelationSet};
use crate::report::{DiagnosticKind, Diagnostics};

/// Broader edges of the new scheme as a directed graph (child -> parent).
pub struct Hierarchy<'a> {
    graph: DiGraph<&'a str, ()>,
    nodes: HashMap<&'a str, NodeIndex>,
    store: &'a ConceptStore,
    relations: &'a RelationSet,
}

impl<'a> Hierarchy<'a> {
    #[must_use]
    pub fn new(store: &'a ConceptStore, relations: &'a RelationSet) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for concept in store.iter() {
            let idx = graph.add_node(concept.id.as_str());
            nodes.insert(concept.id.as_str(), idx);
        }

        for relation in relations.with_predicate(Predicate::Broader) {
            if let (Some(&child), Some(&parent)) = (
                nodes.get(relation.subject.as_str()),
                nodes.get(relation.object.as_str()),
            ) {
                graph.add_edge(child, parent, ());
            }
        }

        Self {
            graph,
            nodes,
            store,
            relations,
        }
    }

    /// Every broader cycle, members sorted, cycles sorted by first member.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut ids: Vec<String> = component
                    .into_iter()
                    .map(|idx| self.graph[idx].to_string())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    pub fn report_cycles(&self, diagnostics: &mut Diagnostics) -> usize {
        let cycles = self.cycles();
        for cycle in &cycles {
            diagnostics.push(
                DiagnosticKind::BroaderCycle,
                cycle.first().map(String::as_str),
                format!("broader cycle through {}", cycle.join(" -> ")),
            );
        }
        cycles.len()
    }

    /// Concepts without a broader edge, in document order.
    #[must_use]
    pub fn top_concepts(&self) -> Vec<&'a str> {
        self.store
            .iter()
            .filter(|c| self.relations.broader_of(&c.id).is_none())
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Number of broader steps up to a top concept; `None` on a cycle or an
    /// unknown id.
    #[must_use]
    pub fn depth(&self, id: &str) -> Option<usize> {
        let mut current = *self.nodes.get(id)?;
        for depth in 0..=self.nodes.len() {
            match self.graph.neighbors(current).next() {
                Some(parent) => current = parent,
                None => return Some(depth),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::SourceRecord;
    use crate::fixes::FixRegistry;
    use crate::relation::Relation;

    fn store(ids: &[&str]) -> ConceptStore {
        let mut diagnostics = Diagnostics::new();
        ConceptStore::load(
            ids.iter().map(|id| SourceRecord::new(*id, format!("Label {id}"))),
            &FixRegistry::empty(),
            &mut diagnostics,
        )
    }

    fn broader(pairs: &[(&str, &str)]) -> RelationSet {
        let mut set = RelationSet::new();
        for (child, parent) in pairs {
            set.insert(Relation::new(*child, Predicate::Broader, *parent).unwrap());
        }
        set
    }

    #[test]
    fn test_top_concepts_and_depth() {
        let store = store(&["A", "B", "C", "D"]);
        let relations = broader(&[("B", "A"), ("C", "B")]);
        let hierarchy = Hierarchy::new(&store, &relations);

        assert_eq!(hierarchy.top_concepts(), vec!["A", "D"]);
        assert_eq!(hierarchy.depth("C"), Some(2));
        assert_eq!(hierarchy.depth("A"), Some(0));
        assert_eq!(hierarchy.depth("Z"), None);
        assert!(hierarchy.cycles().is_empty());
    }

    #[test]
    fn test_cycle_detection() {
        let store = store(&["A", "B", "C", "D"]);
        let relations = broader(&[("A", "B"), ("B", "C"), ("C", "A"), ("D", "A")]);
        let hierarchy = Hierarchy::new(&store, &relations);

        assert_eq!(hierarchy.cycles(), vec![vec!["A", "B", "C"]]);
        assert_eq!(hierarchy.depth("D"), None);

        let mut diagnostics = Diagnostics::new();
        assert_eq!(hierarchy.report_cycles(&mut diagnostics), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::BroaderCycle), 1);
    }
}
