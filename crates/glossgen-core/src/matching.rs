use serde::{Deserialize, Serialize};

use crate::concept::{Concept, ConceptStore};
use crate::relation::{Predicate, Relation, RelationSet};
use crate::text::{first_difference, Difference, TextNormalizer};

/// A concept of the legacy graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyConcept {
    /// The uppercase id the legacy document labels the concept with.
    pub marker_id: String,
    /// Local name under the legacy namespace, e.g. `confStatus`.
    pub local_id: String,
    pub label: String,
    pub description: Option<String>,
}

/// Read-only set of legacy concepts in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyGraph {
    concepts: Vec<LegacyConcept>,
}

impl LegacyGraph {
    #[must_use]
    pub fn new(concepts: Vec<LegacyConcept>) -> Self {
        Self { concepts }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LegacyConcept> {
        self.concepts.iter()
    }

    #[must_use]
    pub fn get(&self, local_id: &str) -> Option<&LegacyConcept> {
        self.concepts.iter().find(|c| c.local_id == local_id)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Exact,
    Close,
    Mismatch,
    None,
}

impl Classification {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Close => "close",
            Self::Mismatch => "mismatch",
            Self::None => "none",
        }
    }

    /// The SKOS mapping edge this classification produces, if any.
    #[must_use]
    pub fn predicate(&self) -> Option<Predicate> {
        match self {
            Self::Exact => Some(Predicate::ExactMatch),
            Self::Close => Some(Predicate::CloseMatch),
            Self::Mismatch | Self::None => None,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Same marker id, different labels. Routed to the reconciliation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub concept_id: String,
    pub legacy_id: String,
    pub new_label: String,
    pub legacy_label: String,
    /// First divergence of the normalized labels.
    pub difference: Option<Difference>,
    /// Normalized Levenshtein similarity of the normalized labels, 0.0..=1.0.
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub concept_id: String,
    pub classification: Classification,
    /// Local id of the legacy concept, set for every class but `None`.
    pub legacy_id: Option<String>,
    pub mismatch: Option<Mismatch>,
}

impl MatchResult {
    fn unmatched(concept_id: &str) -> Self {
        Self {
            concept_id: concept_id.to_string(),
            classification: Classification::None,
            legacy_id: None,
            mismatch: None,
        }
    }

    fn matched(concept_id: &str, classification: Classification, legacy: &LegacyConcept) -> Self {
        Self {
            concept_id: concept_id.to_string(),
            classification,
            legacy_id: Some(legacy.local_id.clone()),
            mismatch: None,
        }
    }

    /// The `exactMatch`/`closeMatch` edge for this result.
    #[must_use]
    pub fn relation(&self) -> Option<Relation> {
        let predicate = self.classification.predicate()?;
        let legacy_id = self.legacy_id.as_deref()?;
        Relation::new(self.concept_id.as_str(), predicate, legacy_id).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Shortest normalized description (in chars) that may count as
    /// contained in another.
    pub min_description_overlap: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_description_overlap: 24,
        }
    }
}

/// Outcome of matching a whole store.
#[derive(Debug, Clone, Default)]
pub struct Matching {
    /// One result per concept, in document order.
    pub results: Vec<MatchResult>,
    pub relations: RelationSet,
    /// False when no legacy graph was available.
    pub reconciled: bool,
}

impl Matching {
    #[must_use]
    pub fn count(&self, classification: Classification) -> usize {
        self.results
            .iter()
            .filter(|r| r.classification == classification)
            .count()
    }

    #[must_use]
    pub fn get(&self, concept_id: &str) -> Option<&MatchResult> {
        self.results.iter().find(|r| r.concept_id == concept_id)
    }
}

/// Legacy concept with its comparison keys computed once.
struct Indexed<'a> {
    concept: &'a LegacyConcept,
    marker: String,
    label: String,
    description: String,
}

pub struct ModelMatcher {
    normalizer: TextNormalizer,
    config: MatcherConfig,
}

impl ModelMatcher {
    #[must_use]
    pub fn new(normalizer: TextNormalizer, config: MatcherConfig) -> Self {
        Self { normalizer, config }
    }

    #[must_use]
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    fn index<'a>(&self, legacy: &'a LegacyGraph) -> Vec<Indexed<'a>> {
        legacy
            .iter()
            .map(|concept| Indexed {
                concept,
                marker: self.normalizer.normalize(&concept.marker_id),
                label: self.normalizer.normalize(&concept.label),
                description: concept
                    .description
                    .as_deref()
                    .map(|d| self.normalizer.normalize(d))
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Classifies one concept against the legacy graph.
    #[must_use]
    pub fn classify(&self, concept: &Concept, legacy: &LegacyGraph) -> MatchResult {
        self.classify_indexed(concept, &self.index(legacy))
    }

    fn classify_indexed(&self, concept: &Concept, legacy: &[Indexed<'_>]) -> MatchResult {
        let id = self.normalizer.normalize(&concept.id);
        let label = self.normalizer.normalize(&concept.label);
        let description = concept
            .description
            .as_deref()
            .map(|d| self.normalizer.normalize(d))
            .unwrap_or_default();

        if let Some(l) = legacy
            .iter()
            .find(|l| !id.is_empty() && !label.is_empty() && l.marker == id && l.label == label)
        {
            return MatchResult::matched(&concept.id, Classification::Exact, l.concept);
        }

        if let Some(l) = legacy.iter().find(|l| !label.is_empty() && l.label == label) {
            return MatchResult::matched(&concept.id, Classification::Close, l.concept);
        }

        if let Some(l) = legacy
            .iter()
            .find(|l| self.descriptions_overlap(&description, &l.description))
        {
            return MatchResult::matched(&concept.id, Classification::Close, l.concept);
        }

        if let Some(l) = legacy.iter().find(|l| !id.is_empty() && l.marker == id) {
            let mismatch = Mismatch {
                concept_id: concept.id.clone(),
                legacy_id: l.concept.local_id.clone(),
                new_label: concept.label.clone(),
                legacy_label: l.concept.label.clone(),
                difference: first_difference(&label, &l.label),
                similarity: strsim::normalized_levenshtein(&label, &l.label),
            };
            return MatchResult {
                concept_id: concept.id.clone(),
                classification: Classification::Mismatch,
                legacy_id: Some(l.concept.local_id.clone()),
                mismatch: Some(mismatch),
            };
        }

        MatchResult::unmatched(&concept.id)
    }

    fn descriptions_overlap(&self, a: &str, b: &str) -> bool {
        let (shorter, longer) = if a.chars().count() <= b.chars().count() {
            (a, b)
        } else {
            (b, a)
        };
        !shorter.is_empty()
            && shorter.chars().count() >= self.config.min_description_overlap
            && longer.contains(shorter)
    }

    /// Matches every concept of `store`.
    ///
    /// Without a legacy graph every concept is classified `None` and the
    /// outcome is flagged as not reconciled; the caller records why.
    #[must_use]
    pub fn match_all(&self, store: &ConceptStore, legacy: Option<&LegacyGraph>) -> Matching {
        let Some(legacy) = legacy else {
            tracing::warn!("Running without reconciliation; {} concepts unmatched", store.len());
            return Matching {
                results: store.iter().map(|c| MatchResult::unmatched(&c.id)).collect(),
                relations: RelationSet::new(),
                reconciled: false,
            };
        };

        let indexed = self.index(legacy);
        let results: Vec<MatchResult> = store
            .iter()
            .map(|concept| self.classify_indexed(concept, &indexed))
            .collect();

        let mut relations = RelationSet::new();
        for result in &results {
            if let Some(relation) = result.relation() {
                relations.insert(relation);
            }
        }

        let matching = Matching {
            results,
            relations,
            reconciled: true,
        };

        tracing::info!(
            "Matched {} concepts against {} legacy concepts: {} exact, {} close, {} mismatched, {} unmatched",
            store.len(),
            legacy.len(),
            matching.count(Classification::Exact),
            matching.count(Classification::Close),
            matching.count(Classification::Mismatch),
            matching.count(Classification::None),
        );

        matching
    }
}

impl Default for ModelMatcher {
    fn default() -> Self {
        Self::new(TextNormalizer::default(), MatcherConfig::default())
    }
}
