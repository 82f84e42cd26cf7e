use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::fixes::FixRegistry;
use crate::report::Diagnostics;
use crate::text::TextNormalizer;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnotationKind {
    Context,
    RecommendedRepresentation,
    CodelistId,
    RelatedTerms,
}

impl AnnotationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "CONTEXT",
            Self::RecommendedRepresentation => "RECOMMENDED_REPRESENTATION",
            Self::CodelistId => "CODELIST_ID",
            Self::RelatedTerms => "RELATED_TERMS",
        }
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnnotationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CONTEXT" => Ok(Self::Context),
            "RECOMMENDED_REPRESENTATION" => Ok(Self::RecommendedRepresentation),
            "CODELIST_ID" => Ok(Self::CodelistId),
            "RELATED_TERMS" => Ok(Self::RelatedTerms),
            other => Err(Error::InvalidAnnotationType(other.to_string())),
        }
    }
}

/// Annotation values by kind, in document order within a kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations(BTreeMap<AnnotationKind, Vec<String>>);

impl Annotations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// RELATED_TERMS text is a `;`-separated list and is split here.
    pub fn push(&mut self, kind: AnnotationKind, text: &str) {
        let values = self.0.entry(kind).or_default();
        match kind {
            AnnotationKind::RelatedTerms => values.extend(
                text.split(';')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            ),
            _ => {
                let text = text.trim();
                if !text.is_empty() {
                    values.push(text.to_string());
                }
            }
        }
    }

    #[must_use]
    pub fn values(&self, kind: AnnotationKind) -> &[String] {
        self.0.get(&kind).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn first(&self, kind: AnnotationKind) -> Option<&str> {
        self.values(kind).first().map(String::as_str)
    }

    pub fn context(&self) -> Option<&str> {
        self.first(AnnotationKind::Context)
    }

    pub fn recommended_representation(&self) -> Option<&str> {
        self.first(AnnotationKind::RecommendedRepresentation)
    }

    pub fn codelist_id(&self) -> Option<&str> {
        self.first(AnnotationKind::CodelistId)
    }

    pub fn related_terms(&self) -> &[String] {
        self.values(AnnotationKind::RelatedTerms)
    }
}

/// A record as produced by a source loader, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: Option<String>,
    pub urn: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// `(annotation type, annotation text)` pairs, unknown types included.
    pub annotations: Vec<(String, String)>,
}

impl SourceRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_urn(mut self, urn: impl Into<String>) -> Self {
        self.urn = Some(urn.into());
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, kind: impl Into<String>, text: impl Into<String>) -> Self {
        self.annotations.push((kind.into(), text.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    /// Label after correction by the fix registry.
    pub label: String,
    /// The source label, kept only when a correction changed it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub annotations: Annotations,
}

impl Concept {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            urn: None,
            label: label.into(),
            original_label: None,
            description: None,
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn from_record(index: usize, record: SourceRecord, fixes: &FixRegistry) -> crate::Result<Self> {
        let id = non_blank(record.id).ok_or(Error::MalformedRecord { index, field: "id" })?;
        let name = non_blank(record.name).ok_or(Error::MalformedRecord { index, field: "name" })?;

        let label = fixes.corrected_label(&name);
        let original_label = (label != name).then_some(name);

        let mut annotations = Annotations::new();
        for (kind, text) in &record.annotations {
            match kind.parse::<AnnotationKind>() {
                Ok(kind) => annotations.push(kind, text),
                Err(e) => tracing::debug!("Ignoring annotation on {}: {}", id, e),
            }
        }

        Ok(Self {
            id,
            urn: non_blank(record.urn),
            label,
            original_label,
            description: non_blank(record.description),
            annotations,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodelistAssociation {
    pub codelist_id: String,
    pub concept_id: String,
}

/// Concepts of the new scheme in document order. Write-once, then read-only.
#[derive(Debug, Clone, Default)]
pub struct ConceptStore {
    normalizer: TextNormalizer,
    concepts: Vec<Concept>,
    by_id: HashMap<String, usize>,
    by_label: BTreeMap<String, usize>,
}

impl ConceptStore {
    /// Builds the store, correcting labels through `fixes`.
    ///
    /// Records missing an id or name are skipped. A duplicate id replaces the
    /// earlier concept in place, so the earlier position in document order is
    /// kept. Both cases are recorded in `diagnostics`.
    pub fn load(
        records: impl IntoIterator<Item = SourceRecord>,
        fixes: &FixRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut store = Self {
            normalizer: fixes.normalizer().clone(),
            ..Self::default()
        };

        for (index, record) in records.into_iter().enumerate() {
            let concept = match Concept::from_record(index, record, fixes) {
                Ok(concept) => concept,
                Err(e) => {
                    if let Err(e) = diagnostics.record_error(None, e) {
                        tracing::error!("Unexpected error while loading records: {}", e);
                    }
                    continue;
                }
            };

            if let Some(&pos) = store.by_id.get(&concept.id) {
                diagnostics.push(
                    crate::report::DiagnosticKind::DuplicateId,
                    Some(&concept.id),
                    format!(
                        "record #{index} redefines {}; '{}' replaces '{}'",
                        concept.id, concept.label, store.concepts[pos].label
                    ),
                );
                store.concepts[pos] = concept;
            } else {
                store.by_id.insert(concept.id.clone(), store.concepts.len());
                store.concepts.push(concept);
            }
        }

        for (pos, concept) in store.concepts.iter().enumerate() {
            let key = store.normalizer.normalize(&concept.label);
            store.by_label.entry(key).or_insert(pos);
        }

        tracing::info!("Loaded {} concepts", store.concepts.len());
        store
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Concept> {
        self.by_id.get(id).map(|&pos| &self.concepts[pos])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// First concept in document order whose label is equivalent to `label`.
    #[must_use]
    pub fn find_by_label(&self, label: &str) -> Option<&Concept> {
        self.by_label
            .get(&self.normalizer.normalize(label))
            .map(|&pos| &self.concepts[pos])
    }

    /// Resolves a reference by id first, then by label.
    #[must_use]
    pub fn resolve_reference(&self, reference: &str) -> Option<&Concept> {
        self.get(reference.trim())
            .or_else(|| self.find_by_label(reference))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.iter()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Sorted by codelist id, then concept id.
    #[must_use]
    pub fn codelist_associations(&self) -> Vec<CodelistAssociation> {
        let mut associations: Vec<CodelistAssociation> = self
            .concepts
            .iter()
            .filter_map(|c| {
                c.annotations.codelist_id().map(|codelist| CodelistAssociation {
                    codelist_id: codelist.to_string(),
                    concept_id: c.id.clone(),
                })
            })
            .collect();
        associations.sort();
        associations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::DiagnosticKind;

    fn load(records: Vec<SourceRecord>) -> (ConceptStore, Diagnostics) {
        let fixes = FixRegistry::sdmx_defaults().unwrap();
        let mut diagnostics = Diagnostics::new();
        let store = ConceptStore::load(records, &fixes, &mut diagnostics);
        (store, diagnostics)
    }

    #[test]
    fn test_labels_are_corrected_at_load() {
        let (store, _) = load(vec![SourceRecord::new(
            "COHERENCE_X_DOMAIN",
            "Coherence - cross-domain",
        )]);

        let concept = store.get("COHERENCE_X_DOMAIN").unwrap();
        assert_eq!(concept.label, "coherence - cross domain");
        assert_eq!(concept.original_label.as_deref(), Some("Coherence - cross-domain"));
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let mut missing_name = SourceRecord::new("B", "");
        missing_name.name = None;
        let mut missing_id = SourceRecord::new("", "No id");
        missing_id.id = Some("   ".into());

        let (store, diagnostics) = load(vec![
            SourceRecord::new("A", "Alpha"),
            missing_name,
            missing_id,
        ]);

        assert_eq!(store.len(), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::MalformedRecord), 2);
    }

    #[test]
    fn test_duplicate_id_later_record_wins_in_place() {
        let (store, diagnostics) = load(vec![
            SourceRecord::new("A", "First"),
            SourceRecord::new("B", "Beta"),
            SourceRecord::new("A", "Second"),
        ]);

        let ids: Vec<&str> = store.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(store.get("A").unwrap().label, "Second");
        assert!(store.find_by_label("first").is_none());
        assert_eq!(diagnostics.count(DiagnosticKind::DuplicateId), 1);
    }

    #[test]
    fn test_annotations_and_codelists() {
        let (store, _) = load(vec![
            SourceRecord::new("FREQ", "Frequency")
                .with_annotation("CODELIST_ID", " CL_FREQ ")
                .with_annotation("RELATED_TERMS", "Time period; ; Reference period")
                .with_annotation("SOMETHING_ELSE", "ignored"),
            SourceRecord::new("AREA", "Reference area").with_annotation("CODELIST_ID", "CL_AREA"),
        ]);

        let freq = store.get("FREQ").unwrap();
        assert_eq!(freq.label, "frequency of observation");
        assert_eq!(freq.annotations.codelist_id(), Some("CL_FREQ"));
        assert_eq!(
            freq.annotations.related_terms(),
            ["Time period".to_string(), "Reference period".to_string()]
        );

        let associations = store.codelist_associations();
        assert_eq!(associations.len(), 2);
        assert_eq!(associations[0].codelist_id, "CL_AREA");
        assert_eq!(associations[1].concept_id, "FREQ");
    }

    #[test]
    fn test_resolve_reference_by_id_then_label() {
        let (store, _) = load(vec![
            SourceRecord::new("DSD", "Data Structure Definition"),
            SourceRecord::new("DATA_SET", "Data set"),
        ]);

        assert_eq!(store.resolve_reference("DSD").unwrap().id, "DSD");
        assert_eq!(store.resolve_reference("data  SET").unwrap().id, "DATA_SET");
        assert!(store.resolve_reference("unknown").is_none());
    }

    #[test]
    fn test_annotation_kind_parse() {
        assert_eq!(
            "RELATED_TERMS".parse::<AnnotationKind>().unwrap(),
            AnnotationKind::RelatedTerms
        );
        assert!("NOPE".parse::<AnnotationKind>().is_err());
    }
}
