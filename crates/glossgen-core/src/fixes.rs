use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::text::TextNormalizer;
use crate::{Error, Result};

/// Outcome of a forced-parent lookup for a concept that has an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParentOverride {
    /// This parent is the sole broader concept.
    Parent(String),
    /// No broader concept at all; the concept keeps related edges only.
    NoParent,
}

/// Serialized form of the override tables.
///
/// In `broader_fixes`, `null` or `""` is the explicit negative override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideConfig {
    #[serde(default)]
    pub label_fixes: BTreeMap<String, String>,
    #[serde(default)]
    pub broader_fixes: BTreeMap<String, Option<String>>,
}

impl OverrideConfig {
    /// Tables curated while migrating the SDMX 2009 vocabulary.
    #[must_use]
    pub fn sdmx_defaults() -> Self {
        let label_fixes = [
            // typos in one of the two models
            ("timelinesst", "timeliness"),
            ("coherence - cross-domain", "coherence - cross domain"),
            ("relevance - user satisifaction", "relevance - user satisfaction"),
            // renamed between the models
            (
                "asymmetry for mirror flow statistics",
                "asymmetry for mirror flows statistics - coefficient",
            ),
            ("contact mail", "contact mail address"),
            (
                "sdmx registry interface",
                "sdmx registry interface (in the context of registry)",
            ),
            ("contact organization unit", "contact organisation unit"),
            ("observation", "observation value"),
            ("data presentation", "data presentation - detailed description"),
            ("frequency", "frequency of observation"),
            ("contact person job title", "contact person function"),
            ("accuracy - sampling error", "sampling error"),
            (
                "quality management - assessment",
                "quality management - quality assessment",
            ),
            ("coverage- time", "time coverage"),
        ];

        let broader_fixes = [
            ("DSD", Some("DATA_SET")),
            ("ATTRIBUTE", Some("DSD")),
            ("DIMENSION", Some("DSD")),
            ("MEASURE", Some("DSD")),
            ("CODING_FORMAT", Some("CODE")),
            ("CONSTRAINT", Some("CODELIST")),
            ("ORGANISATION_UNIT", Some("CONTACT")),
            ("CDC", Some("COG")),
            ("CDCL", Some("COG")),
            ("STAT_SUBJECT_MATTER", Some("COG")),
            ("LEVEL", Some("HIERARCHY")),
            ("MEMBER_SEL", Some("CONSTRAINT")),
            ("MSD", Some("META_SET")),
            ("REP_CATEGORY", Some("REPRESENT")),
            ("REP_TAXO", Some("REP_CATEGORY")),
            ("SDMX_REG_INTERFACE", Some("SDMX_REG")),
            ("SERIES_KEY", Some("SIBLING_GR")),
            ("STRUCT_VALIDATION", Some("STRUCT_META")),
            ("TIMELAG_FINAL", Some("TIMELINESS")),
            ("TIMELAG_FIRST", Some("TIMELINESS")),
            ("DATAFLOW", None),
            ("DATA_VALIDATION", None),
            ("HIERARCHY", None),
            ("DATA_SET", None),
        ];

        Self {
            label_fixes: label_fixes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            broader_fixes: broader_fixes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Entries of `other` win over entries of `self`.
    #[must_use]
    pub fn merged_with(mut self, other: Self) -> Self {
        self.label_fixes.extend(other.label_fixes);
        self.broader_fixes.extend(other.broader_fixes);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FixRegistry {
    normalizer: TextNormalizer,
    labels: BTreeMap<String, String>,
    parents: BTreeMap<String, ParentOverride>,
}

impl FixRegistry {
    /// Builds and validates the registry.
    ///
    /// Fails when a corrected label is itself a correction key (corrections
    /// must be a fixed point), when two keys collapse to the same normalized
    /// form with different corrections, or when a concept is forced to be its
    /// own parent.
    pub fn new(config: OverrideConfig, normalizer: TextNormalizer) -> Result<Self> {
        let mut labels = BTreeMap::new();
        for (bad, good) in &config.label_fixes {
            let key = normalizer.normalize(bad);
            if key.is_empty() {
                return Err(Error::InvalidOverride(format!(
                    "label fix key '{bad}' is empty after normalization"
                )));
            }
            if let Some(previous) = labels.insert(key, good.clone()) {
                if previous != *good {
                    return Err(Error::InvalidOverride(format!(
                        "label fix '{bad}' collides with another key mapping to '{previous}'"
                    )));
                }
            }
        }

        for good in labels.values() {
            let key = normalizer.normalize(good);
            if let Some(next) = labels.get(&key) {
                if !normalizer.equivalent(next, good) {
                    return Err(Error::InvalidOverride(format!(
                        "corrected label '{good}' is itself corrected to '{next}'"
                    )));
                }
            }
        }

        let mut parents = BTreeMap::new();
        for (child, parent) in config.broader_fixes {
            let entry = match parent.map(|p| p.trim().to_string()) {
                Some(p) if !p.is_empty() => {
                    if p == child {
                        return Err(Error::InvalidOverride(format!(
                            "concept '{child}' is forced to be its own parent"
                        )));
                    }
                    ParentOverride::Parent(p)
                }
                _ => ParentOverride::NoParent,
            };
            parents.insert(child, entry);
        }

        Ok(Self {
            normalizer,
            labels,
            parents,
        })
    }

    pub fn sdmx_defaults() -> Result<Self> {
        Self::new(OverrideConfig::sdmx_defaults(), TextNormalizer::default())
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            normalizer: TextNormalizer::default(),
            labels: BTreeMap::new(),
            parents: BTreeMap::new(),
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// The corrected label when the normalized original has a mapping,
    /// otherwise the input unchanged.
    #[must_use]
    pub fn corrected_label(&self, original: &str) -> String {
        self.labels
            .get(&self.normalizer.normalize(original))
            .cloned()
            .unwrap_or_else(|| original.to_string())
    }

    #[must_use]
    pub fn forced_parent(&self, concept_id: &str) -> Option<&ParentOverride> {
        self.parents.get(concept_id)
    }

    pub fn label_fix_count(&self) -> usize {
        self.labels.len()
    }

    pub fn parent_override_count(&self) -> usize {
        self.parents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let registry = FixRegistry::sdmx_defaults().unwrap();
        assert_eq!(registry.label_fix_count(), 14);
        assert_eq!(registry.parent_override_count(), 24);
    }

    #[test]
    fn test_corrected_label_is_fixed_point() {
        let registry = FixRegistry::sdmx_defaults().unwrap();

        let once = registry.corrected_label("timelinesst");
        assert_eq!(once, "timeliness");
        assert_eq!(registry.corrected_label(&once), once);

        assert_eq!(registry.corrected_label("Timelinesst "), "timeliness");
    }

    #[test]
    fn test_unmapped_label_is_unchanged() {
        let registry = FixRegistry::sdmx_defaults().unwrap();
        assert_eq!(registry.corrected_label("Data Set"), "Data Set");
    }

    #[test]
    fn test_forced_parent_lookup() {
        let registry = FixRegistry::sdmx_defaults().unwrap();

        assert_eq!(
            registry.forced_parent("ATTRIBUTE"),
            Some(&ParentOverride::Parent("DSD".into()))
        );
        assert_eq!(
            registry.forced_parent("DATAFLOW"),
            Some(&ParentOverride::NoParent)
        );
        assert_eq!(registry.forced_parent("UNIT_MULT"), None);
    }

    #[test]
    fn test_override_json_empty_string_is_negative() {
        let config = OverrideConfig::from_json(
            r#"{"broader_fixes": {"A": "", "B": null, "C": "A"}}"#,
        )
        .unwrap();
        let registry = FixRegistry::new(config, TextNormalizer::default()).unwrap();

        assert_eq!(registry.forced_parent("A"), Some(&ParentOverride::NoParent));
        assert_eq!(registry.forced_parent("B"), Some(&ParentOverride::NoParent));
        assert_eq!(
            registry.forced_parent("C"),
            Some(&ParentOverride::Parent("A".into()))
        );
    }

    #[test]
    fn test_rejects_chained_corrections() {
        let mut config = OverrideConfig::default();
        config.label_fixes.insert("a".into(), "b".into());
        config.label_fixes.insert("b".into(), "c".into());

        let err = FixRegistry::new(config, TextNormalizer::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidOverride(_)));
    }

    #[test]
    fn test_rejects_self_parent() {
        let mut config = OverrideConfig::default();
        config.broader_fixes.insert("X".into(), Some("X".into()));

        assert!(FixRegistry::new(config, TextNormalizer::default()).is_err());
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut extra = OverrideConfig::default();
        extra.broader_fixes.insert("DSD".into(), None);

        let merged = OverrideConfig::sdmx_defaults().merged_with(extra);
        assert_eq!(merged.broader_fixes.get("DSD"), Some(&None));
    }
}
