use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::emit::{OutputNames, SchemeMetadata};
use crate::fixes::{FixRegistry, OverrideConfig};
use crate::ingest::{FetchConfig, SdmxReader};
use crate::matching::{MatcherConfig, ModelMatcher};
use crate::namespace::NamespaceContext;
use crate::pipeline::GlossaryBuilder;
use crate::resolve::{RelationshipResolver, ResolverConfig};
use crate::text::TextNormalizer;
use crate::Result;

pub const ENV_XML_SOURCE: &str = "GLOSSGEN_XML_SOURCE";
pub const ENV_LEGACY_SOURCE: &str = "GLOSSGEN_LEGACY_SOURCE";
pub const ENV_OUT_DIR: &str = "GLOSSGEN_OUT_DIR";

/// Run configuration. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossgenConfig {
    /// SDMX-ML concept scheme, URL or path.
    pub xml_source: String,
    /// Legacy Turtle vocabulary, URL or path.
    pub legacy_source: String,
    pub out_dir: PathBuf,
    /// Extra override tables merged over the built-in ones.
    pub overrides: Option<PathBuf>,
    /// Start from the built-in SDMX override tables.
    pub builtin_overrides: bool,
    /// Keep CONTEXT annotations.
    pub include_context: bool,
    /// Write the broader review report.
    pub tuning: bool,
    /// Characters removed before comparing text.
    pub punctuation: String,
    pub namespaces: NamespaceContext,
    pub resolver: ResolverConfig,
    pub matcher: MatcherConfig,
    pub fetch: FetchConfig,
    pub scheme: SchemeMetadata,
    pub outputs: OutputNames,
}

impl Default for GlossgenConfig {
    fn default() -> Self {
        Self {
            xml_source:
                "https://registry.sdmx.org/sdmx/v2/structure/conceptscheme/SDMX/CROSS_DOMAIN_CONCEPTS/2.0"
                    .to_string(),
            legacy_source: "http://purl.org/linked-data/sdmx/2009/concept".to_string(),
            out_dir: PathBuf::from("."),
            overrides: None,
            builtin_overrides: true,
            include_context: true,
            tuning: true,
            punctuation: (0u8..=127)
                .map(char::from)
                .filter(char::is_ascii_punctuation)
                .collect(),
            namespaces: NamespaceContext::default(),
            resolver: ResolverConfig::default(),
            matcher: MatcherConfig::default(),
            fetch: FetchConfig::default(),
            scheme: SchemeMetadata::default(),
            outputs: OutputNames::default(),
        }
    }
}

impl GlossgenConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Defaults overlaid with `GLOSSGEN_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlays whichever variables `lookup` returns. Blank values are
    /// ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(source) = lookup(ENV_XML_SOURCE) {
            self.xml_source = source;
        }
        if let Some(source) = lookup(ENV_LEGACY_SOURCE) {
            self.legacy_source = source;
        }
        if let Some(dir) = lookup(ENV_OUT_DIR) {
            self.out_dir = PathBuf::from(dir);
        }
    }

    #[must_use]
    pub fn normalizer(&self) -> TextNormalizer {
        TextNormalizer::new(self.punctuation.chars())
    }

    /// Built-in tables (unless disabled) merged with the override file.
    pub fn override_config(&self) -> Result<OverrideConfig> {
        let base = if self.builtin_overrides {
            OverrideConfig::sdmx_defaults()
        } else {
            OverrideConfig::default()
        };

        match &self.overrides {
            Some(path) => Ok(base.merged_with(OverrideConfig::from_path(path)?)),
            None => Ok(base),
        }
    }

    pub fn fix_registry(&self) -> Result<FixRegistry> {
        FixRegistry::new(self.override_config()?, self.normalizer())
    }

    pub fn glossary_builder(&self) -> Result<GlossaryBuilder> {
        Ok(GlossaryBuilder::new(
            self.fix_registry()?,
            RelationshipResolver::new(self.resolver.clone()),
            ModelMatcher::new(self.normalizer(), self.matcher.clone()),
        ))
    }

    #[must_use]
    pub fn sdmx_reader(&self) -> SdmxReader {
        SdmxReader::new(self.include_context, self.namespaces.language.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GlossgenConfig::default();
        assert!(config.include_context);
        assert!(config.tuning);
        assert!(config.punctuation.contains('-'));
        assert!(config.punctuation.contains('_'));
        assert_eq!(config.normalizer(), TextNormalizer::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glossgen.json");
        std::fs::write(
            &path,
            r#"{ "xml_source": "concepts.xml", "tuning": false, "matcher": { "min_description_overlap": 40 } }"#,
        )
        .unwrap();

        let config = GlossgenConfig::from_path(&path).unwrap();
        assert_eq!(config.xml_source, "concepts.xml");
        assert!(!config.tuning);
        assert_eq!(config.matcher.min_description_overlap, 40);
        assert_eq!(config.legacy_source, GlossgenConfig::default().legacy_source);
        assert_eq!(config.namespaces, NamespaceContext::default());
    }

    #[test]
    fn test_env_overlay() {
        let mut config = GlossgenConfig::default();
        config.apply_env(|key| match key {
            ENV_XML_SOURCE => Some("local.xml".to_string()),
            ENV_OUT_DIR => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.xml_source, "local.xml");
        assert_eq!(config.out_dir, PathBuf::from("."));
    }

    #[test]
    fn test_override_file_merges_over_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        std::fs::write(
            &path,
            r#"{ "broader_fixes": { "ATTRIBUTE": "DIMENSION", "NEW_ONE": null } }"#,
        )
        .unwrap();

        let config = GlossgenConfig {
            overrides: Some(path),
            ..GlossgenConfig::default()
        };
        let merged = config.override_config().unwrap();
        assert_eq!(
            merged.broader_fixes.get("ATTRIBUTE"),
            Some(&Some("DIMENSION".to_string()))
        );
        assert_eq!(merged.broader_fixes.get("NEW_ONE"), Some(&None));
        assert_eq!(
            merged.broader_fixes.get("DIMENSION"),
            Some(&Some("DSD".to_string()))
        );
        assert!(config.glossary_builder().is_ok());
    }

    #[test]
    fn test_missing_override_file_is_fatal() {
        let config = GlossgenConfig {
            overrides: Some(PathBuf::from("/nonexistent/overrides.json")),
            ..GlossgenConfig::default()
        };
        assert!(config.glossary_builder().is_err());
    }
}
