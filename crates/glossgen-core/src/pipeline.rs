use crate::concept::{CodelistAssociation, ConceptStore, SourceRecord};
use crate::fixes::FixRegistry;
use crate::hierarchy::Hierarchy;
use crate::matching::{LegacyGraph, Matching, ModelMatcher};
use crate::relation::Relation;
use crate::report::{DiagnosticKind, Diagnostics, ReconciliationReport, TuningReport};
use crate::resolve::{RelationshipResolver, Resolution};
use crate::Result;

/// Everything one glossary run produces.
#[derive(Debug)]
pub struct BuildOutput {
    pub store: ConceptStore,
    pub resolution: Resolution,
    pub matching: Matching,
    pub codelists: Vec<CodelistAssociation>,
    pub tuning: TuningReport,
    pub reconciliation: ReconciliationReport,
    /// Concepts without a broader edge, in document order.
    pub top_concepts: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl BuildOutput {
    /// Hierarchy, associative and match edges leaving `concept_id`, ordered.
    pub fn outgoing<'a>(&'a self, concept_id: &'a str) -> impl Iterator<Item = &'a Relation> {
        self.resolution
            .relations
            .outgoing(concept_id)
            .chain(self.matching.relations.outgoing(concept_id))
    }

    pub fn relation_count(&self) -> usize {
        self.resolution.relations.len() + self.matching.relations.len()
    }
}

/// Runs store loading, relationship resolution and legacy matching in order.
pub struct GlossaryBuilder {
    fixes: FixRegistry,
    resolver: RelationshipResolver,
    matcher: ModelMatcher,
}

impl GlossaryBuilder {
    #[must_use]
    pub fn new(fixes: FixRegistry, resolver: RelationshipResolver, matcher: ModelMatcher) -> Self {
        Self {
            fixes,
            resolver,
            matcher,
        }
    }

    pub fn fixes(&self) -> &FixRegistry {
        &self.fixes
    }

    /// A failed legacy load does not stop the run: every concept is left
    /// unmatched and the output is flagged as not reconciled.
    pub fn build(
        &self,
        records: impl IntoIterator<Item = SourceRecord>,
        legacy: Result<LegacyGraph>,
    ) -> BuildOutput {
        let mut diagnostics = Diagnostics::new();

        let store = ConceptStore::load(records, &self.fixes, &mut diagnostics);
        let resolution = self.resolver.resolve(&store, &self.fixes, &mut diagnostics);

        let top_concepts = {
            let hierarchy = Hierarchy::new(&store, &resolution.relations);
            hierarchy.report_cycles(&mut diagnostics);
            hierarchy
                .top_concepts()
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        let legacy = match legacy {
            Ok(graph) => Some(graph),
            Err(e) => {
                diagnostics.push(DiagnosticKind::LegacyGraphUnavailable, None, e.to_string());
                None
            }
        };
        let matching = self.matcher.match_all(&store, legacy.as_ref());

        let tuning = resolution.tuning_report(&store);
        let reconciliation = ReconciliationReport::from_results(&matching.results, matching.reconciled);
        let codelists = store.codelist_associations();

        tracing::info!(
            "Built glossary: {} concepts, {} relations, {} diagnostics",
            store.len(),
            resolution.relations.len() + matching.relations.len(),
            diagnostics.len()
        );

        BuildOutput {
            store,
            resolution,
            matching,
            codelists,
            tuning,
            reconciliation,
            top_concepts,
            diagnostics,
        }
    }
}

impl Default for GlossaryBuilder {
    fn default() -> Self {
        Self::new(
            FixRegistry::empty(),
            RelationshipResolver::default(),
            ModelMatcher::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{Classification, LegacyConcept};
    use crate::relation::Predicate;
    use crate::resolve::RuleKind;
    use crate::Error;

    fn records() -> Vec<SourceRecord> {
        vec![
            SourceRecord::new("DSD", "Data structure definition"),
            SourceRecord::new("ATTRIBUTE", "Attribute")
                .with_annotation("RELATED_TERMS", "DSD; MEASURE"),
            SourceRecord::new("MEASURE", "Measure")
                .with_annotation("CODELIST_ID", "CL_MEASURE"),
            SourceRecord::new("COHERENCE_X", "Coherence - cross-domain"),
            SourceRecord::new("COHERENCE", "Coherence"),
        ]
    }

    fn legacy() -> LegacyGraph {
        LegacyGraph::new(vec![LegacyConcept {
            marker_id: "MEASURE".to_string(),
            local_id: "measure".to_string(),
            label: "Measure".to_string(),
            description: None,
        }])
    }

    fn builder() -> GlossaryBuilder {
        GlossaryBuilder::new(
            FixRegistry::sdmx_defaults().unwrap(),
            RelationshipResolver::default(),
            ModelMatcher::default(),
        )
    }

    #[test]
    fn test_attribute_belongs_to_dsd() {
        let output = builder().build(records(), Ok(legacy()));

        let relations = &output.resolution.relations;
        assert_eq!(relations.broader_of("ATTRIBUTE"), Some("DSD"));
        assert!(relations.contains(&Relation::new("DSD", Predicate::Narrower, "ATTRIBUTE").unwrap()));
        assert!(!relations.contains(&Relation::new("ATTRIBUTE", Predicate::Related, "DSD").unwrap()));
        assert!(relations.contains(&Relation::new("ATTRIBUTE", Predicate::Related, "MEASURE").unwrap()));
        assert_eq!(
            output.resolution.decisions.get("ATTRIBUTE"),
            Some(&RuleKind::Override)
        );
    }

    #[test]
    fn test_full_run_outputs() {
        let output = builder().build(records(), Ok(legacy()));

        assert_eq!(output.store.len(), 5);
        assert!(output.matching.reconciled);
        assert_eq!(
            output.matching.get("MEASURE").unwrap().classification,
            Classification::Exact
        );
        assert_eq!(output.codelists.len(), 1);
        assert_eq!(output.codelists[0].codelist_id, "CL_MEASURE");
        assert!(output.top_concepts.contains(&"DSD".to_string()));
        assert!(!output.top_concepts.contains(&"ATTRIBUTE".to_string()));
        assert_eq!(output.tuning.len(), output.resolution.decisions.len());
        assert!(output.reconciliation.unmatched.contains(&"DSD".to_string()));

        let edges: Vec<_> = output.outgoing("MEASURE").collect();
        assert!(edges.iter().any(|r| r.predicate == Predicate::ExactMatch));
    }

    #[test]
    fn test_unavailable_legacy_degrades() {
        let output = builder().build(
            records(),
            Err(Error::LegacyGraphUnavailable("connection refused".to_string())),
        );

        assert!(!output.matching.reconciled);
        assert!(!output.reconciliation.reconciled);
        assert_eq!(output.reconciliation.unmatched.len(), 5);
        assert_eq!(
            output
                .diagnostics
                .count(DiagnosticKind::LegacyGraphUnavailable),
            1
        );
        // Resolution is unaffected.
        assert_eq!(output.resolution.relations.broader_of("ATTRIBUTE"), Some("DSD"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let first = builder().build(records(), Ok(legacy()));
        let second = builder().build(records(), Ok(legacy()));
        assert_eq!(first.resolution.relations, second.resolution.relations);
        assert_eq!(first.matching.relations, second.matching.relations);
        assert_eq!(first.top_concepts, second.top_concepts);
    }
}
