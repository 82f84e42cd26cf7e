use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::concept::{CodelistAssociation, Concept};
use crate::namespace::NamespaceContext;
use crate::pipeline::BuildOutput;
use crate::relation::Relation;
use crate::text::format_literal;
use crate::Result;

/// Descriptive triples of the concept scheme resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeMetadata {
    pub label: String,
    pub comment: String,
    pub creator_name: String,
    pub creator_homepage: String,
}

impl Default for SchemeMetadata {
    fn default() -> Self {
        Self {
            label: "Content Oriented Guidelines concept scheme".to_string(),
            comment: "The new model replaces the outdated version from 2009.".to_string(),
            creator_name: "SemanticPro - E-projecting R&D Group".to_string(),
            creator_homepage: "http://www.semanticpro.org".to_string(),
        }
    }
}

/// File names written into the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNames {
    pub model: String,
    pub codelists: String,
    pub tuning: String,
    pub reconciliation: String,
    pub comments: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            model: "SDMX_Glossary.ttl".to_string(),
            codelists: "codelist_associations.csv".to_string(),
            tuning: "tuning_res.ttl".to_string(),
            reconciliation: "no_match_concepts.ttl".to_string(),
            comments: "comment_output.txt".to_string(),
        }
    }
}

pub struct TurtleEmitter<'a> {
    ns: &'a NamespaceContext,
    scheme: &'a SchemeMetadata,
}

impl<'a> TurtleEmitter<'a> {
    #[must_use]
    pub fn new(ns: &'a NamespaceContext, scheme: &'a SchemeMetadata) -> Self {
        Self { ns, scheme }
    }

    fn literal(&self, text: &str) -> String {
        format_literal(text, &self.ns.language)
    }

    fn object(&self, relation: &Relation) -> String {
        if relation.predicate.is_cross_model() {
            self.ns.legacy_concept(&relation.object)
        } else {
            self.ns.concept(&relation.object)
        }
    }

    fn scheme_block(&self, issued: NaiveDate) -> String {
        let lines = [
            format!("{} a skos:ConceptScheme", self.ns.scheme()),
            format!("    rdfs:label {}", self.literal(&self.scheme.label)),
            format!("    rdfs:isDefinedBy <{}>", self.ns.new_scheme_doc),
            format!("    dcterms:replaces <{}>", self.ns.legacy_document()),
            format!("    rdfs:comment {}", self.literal(&self.scheme.comment)),
            format!(
                "    dcterms:creator [\n        a foaf:Organization ;\n        foaf:name {} ;\n        foaf:homepage <{}>\n    ]",
                format_literal(&self.scheme.creator_name, ""),
                self.scheme.creator_homepage
            ),
            format!("    dcterms:issued \"{}\"^^xsd:date", issued.format("%Y-%m-%d")),
        ];
        format!("{} .\n", lines.join(" ;\n"))
    }

    /// The subject block of one concept, terminated by ` .`.
    #[must_use]
    pub fn concept_block(&self, output: &BuildOutput, concept: &Concept) -> String {
        let mut lines = vec![
            format!("{} a skos:Concept", self.ns.concept(&concept.id)),
            format!("    rdfs:label {}", self.literal(&concept.label)),
        ];

        if let Some(original) = &concept.original_label {
            lines.push(format!("    skos:hiddenLabel {}", self.literal(original)));
        }
        if let Some(description) = &concept.description {
            lines.push(format!("    skos:definition {}", self.literal(description)));
        }
        if let Some(urn) = &concept.urn {
            lines.push(format!("    skos:notation {}", format_literal(urn, "")));
        }
        lines.push(format!("    skos:inScheme {}", self.ns.scheme()));

        let annotations = &concept.annotations;
        if let Some(representation) = annotations.recommended_representation() {
            let note = format!("Recommended representation: {representation}");
            lines.push(format!("    skos:note {}", self.literal(&note)));
        }
        if let Some(codelist) = annotations.codelist_id() {
            let note = format!("Codelist ID: {codelist}");
            lines.push(format!("    skos:note {}", self.literal(&note)));
        }
        if let Some(context) = annotations.context() {
            lines.push(format!("    rdfs:comment {}", self.literal(context)));
        }

        for relation in output.outgoing(&concept.id) {
            lines.push(format!(
                "    {} {}",
                relation.predicate.skos_term(),
                self.object(relation)
            ));
        }

        format!("{} .\n", lines.join(" ;\n"))
    }

    /// The complete new model.
    #[must_use]
    pub fn render_model(&self, output: &BuildOutput, issued: NaiveDate) -> String {
        let mut out = String::new();
        out.push_str(&self.ns.prefix_block());
        out.push_str("\n\n");
        out.push_str(&self.scheme_block(issued));

        for concept in output.store.iter() {
            let _ = write!(out, "\n# {}\n", concept.id);
            out.push_str(&self.concept_block(output, concept));
        }

        if !output.top_concepts.is_empty() {
            out.push('\n');
        }
        for id in &output.top_concepts {
            let _ = writeln!(
                out,
                "{} skos:hasTopConcept {} .",
                self.ns.scheme(),
                self.ns.concept(id)
            );
        }

        out
    }

    /// Numbered concepts whose broader relation should be reviewed.
    #[must_use]
    pub fn render_tuning(&self, output: &BuildOutput) -> String {
        let mut out = self.ns.prefix_block();
        out.push('\n');

        for entry in &output.tuning.entries {
            let Some(concept) = output.store.get(&entry.concept_id) else {
                continue;
            };
            let _ = write!(
                out,
                "\n# {}. {}  skos:broader {} - {}\n",
                entry.ordinal, entry.concept_id, entry.broader_id, entry.decided_by
            );
            out.push_str(&self.concept_block(output, concept));
        }

        out
    }

    /// Unmatched and mismatched concepts, mismatches with review notes and a
    /// commented-out candidate mapping.
    #[must_use]
    pub fn render_reconciliation(&self, output: &BuildOutput) -> String {
        let report = &output.reconciliation;
        let mut out = self.ns.prefix_block();
        out.push_str("\n\n");

        if !report.reconciled {
            out.push_str("# Legacy graph unavailable: every concept is listed as unmatched.\n");
        }
        let _ = writeln!(
            out,
            "# {} unmatched, {} mismatched",
            report.unmatched.len(),
            report.mismatched.len()
        );

        for id in &report.unmatched {
            let Some(concept) = output.store.get(id) else {
                continue;
            };
            let _ = write!(out, "\n# {id}\n");
            out.push_str(&self.concept_block(output, concept));
        }

        for mismatch in &report.mismatched {
            let Some(concept) = output.store.get(&mismatch.concept_id) else {
                continue;
            };
            let legacy = self.ns.legacy_concept(&mismatch.legacy_id);
            let _ = write!(out, "\n# {}: label differs from {legacy}\n", mismatch.concept_id);
            let _ = writeln!(out, "#   new:    {:?}", mismatch.new_label);
            let _ = writeln!(out, "#   legacy: {:?}", mismatch.legacy_label);
            if let Some(diff) = &mismatch.difference {
                let _ = writeln!(
                    out,
                    "#   first difference at {}: {:?} vs {:?}",
                    diff.position, diff.left, diff.right
                );
            }
            let _ = writeln!(out, "#   similarity: {:.2}", mismatch.similarity);
            let _ = writeln!(
                out,
                "# {} skos:exactMatch {legacy} .",
                self.ns.concept(&mismatch.concept_id)
            );
            out.push_str(&self.concept_block(output, concept));
        }

        out
    }
}

/// Labels, definitions and context notes, one paragraph per concept.
#[must_use]
pub fn render_comments(output: &BuildOutput, language: &str) -> String {
    let mut out = String::new();

    for concept in output.store.iter() {
        let mut lines = vec![
            concept.id.clone(),
            format!("    rdfs:label {}", format_literal(&concept.label, language)),
        ];
        if let Some(description) = &concept.description {
            lines.push(format!(
                "    skos:definition {}",
                format_literal(description, language)
            ));
        }
        if let Some(context) = concept.annotations.context() {
            lines.push(format!("    rdfs:comment {}", format_literal(context, language)));
        }

        out.push('\n');
        out.push_str(&lines.join(" ;\n"));
        out.push_str(" .\n");
    }

    out
}

/// `Codelist ID,Concept ID` rows in the order given.
#[must_use]
pub fn render_codelists(associations: &[CodelistAssociation]) -> String {
    let mut out = String::from("Codelist ID,Concept ID\n");
    for association in associations {
        let _ = writeln!(
            out,
            "{},{}",
            csv_field(&association.codelist_id),
            csv_field(&association.concept_id)
        );
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// What [`write_outputs`] should produce.
#[derive(Debug, Clone)]
pub struct EmitOptions<'a> {
    pub namespaces: &'a NamespaceContext,
    pub scheme: &'a SchemeMetadata,
    pub names: &'a OutputNames,
    pub issued: NaiveDate,
    pub tuning: bool,
}

/// Writes every output file into `dir`, creating it if needed. Returns the
/// paths written, in order.
pub fn write_outputs(output: &BuildOutput, dir: &Path, options: &EmitOptions<'_>) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let emitter = TurtleEmitter::new(options.namespaces, options.scheme);
    let names = options.names;

    let mut files = vec![
        (&names.model, emitter.render_model(output, options.issued)),
        (&names.codelists, render_codelists(&output.codelists)),
        (&names.reconciliation, emitter.render_reconciliation(output)),
        (
            &names.comments,
            render_comments(output, &options.namespaces.language),
        ),
    ];
    if options.tuning {
        files.push((&names.tuning, emitter.render_tuning(output)));
    }

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        std::fs::write(&path, contents)?;
        tracing::debug!("Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::SourceRecord;
    use crate::fixes::FixRegistry;
    use crate::matching::{LegacyConcept, LegacyGraph, ModelMatcher};
    use crate::pipeline::GlossaryBuilder;
    use crate::resolve::RelationshipResolver;

    fn output() -> BuildOutput {
        let records = vec![
            SourceRecord::new("DSD", "Data structure definition")
                .with_urn("urn:sdmx:DSD")
                .with_description("A set of \"structural\" metadata."),
            SourceRecord::new("ATTRIBUTE", "Attribute")
                .with_annotation("CODELIST_ID", "CL_ATTR")
                .with_annotation("CONTEXT", "Used in DSDs."),
            SourceRecord::new("FREQ", "Frequency")
                .with_annotation("CODELIST_ID", "CL_FREQ"),
            SourceRecord::new("DECIMALS", "Decimal places"),
        ];
        let legacy = LegacyGraph::new(vec![
            LegacyConcept {
                marker_id: "FREQ".to_string(),
                local_id: "freq".to_string(),
                label: "Frequency of observation".to_string(),
                description: None,
            },
            LegacyConcept {
                marker_id: "DECIMALS".to_string(),
                local_id: "decimals".to_string(),
                label: "Decimals".to_string(),
                description: None,
            },
        ]);
        let builder = GlossaryBuilder::new(
            FixRegistry::sdmx_defaults().unwrap(),
            RelationshipResolver::default(),
            ModelMatcher::default(),
        );
        builder.build(records, Ok(legacy))
    }

    fn issued() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_render_model() {
        let output = output();
        let ns = NamespaceContext::default();
        let scheme = SchemeMetadata::default();
        let ttl = TurtleEmitter::new(&ns, &scheme).render_model(&output, issued());

        assert!(ttl.starts_with("@prefix rdf: "));
        assert!(ttl.contains("sip-concept:cog a skos:ConceptScheme ;\n"));
        assert!(ttl.contains("    dcterms:issued \"2025-03-01\"^^xsd:date .\n"));
        assert!(ttl.contains(
            "    dcterms:replaces <http://purl.org/linked-data/sdmx/2009/concept#> ;\n"
        ));

        assert!(ttl.contains("\n# DSD\nsip-concept:DSD a skos:Concept ;\n"));
        assert!(ttl.contains("    skos:definition \"A set of \\\"structural\\\" metadata.\"@en ;\n"));
        assert!(ttl.contains("    skos:notation \"urn:sdmx:DSD\" ;\n"));
        assert!(ttl.contains("    skos:note \"Codelist ID: CL_ATTR\"@en ;\n"));
        assert!(ttl.contains("    rdfs:comment \"Used in DSDs.\"@en ;\n"));
        assert!(ttl.contains("    skos:broader sip-concept:DSD .\n"));
        assert!(ttl.contains("    skos:narrower sip-concept:ATTRIBUTE"));

        // "Frequency" is corrected to the legacy label, so it matches exactly.
        assert!(ttl.contains("    skos:hiddenLabel \"Frequency\"@en ;\n"));
        assert!(ttl.contains("    skos:exactMatch sdmx-concept:freq .\n"));

        assert!(ttl.contains("sip-concept:cog skos:hasTopConcept sip-concept:DSD .\n"));
        assert!(!ttl.contains("skos:hasTopConcept sip-concept:ATTRIBUTE"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let ns = NamespaceContext::default();
        let scheme = SchemeMetadata::default();
        let emitter = TurtleEmitter::new(&ns, &scheme);
        assert_eq!(
            emitter.render_model(&output(), issued()),
            emitter.render_model(&output(), issued())
        );
    }

    #[test]
    fn test_render_tuning() {
        let output = output();
        let ns = NamespaceContext::default();
        let scheme = SchemeMetadata::default();
        let ttl = TurtleEmitter::new(&ns, &scheme).render_tuning(&output);

        assert!(ttl.contains("\n# 1. ATTRIBUTE  skos:broader DSD - override\n"));
        assert!(!ttl.contains("# 2."));
    }

    #[test]
    fn test_render_reconciliation() {
        let output = output();
        let ns = NamespaceContext::default();
        let scheme = SchemeMetadata::default();
        let ttl = TurtleEmitter::new(&ns, &scheme).render_reconciliation(&output);

        assert!(ttl.contains("# 2 unmatched, 1 mismatched\n"));
        assert!(ttl.contains("\n# DSD\nsip-concept:DSD a skos:Concept"));
        assert!(ttl.contains("# DECIMALS: label differs from sdmx-concept:decimals\n"));
        assert!(ttl.contains("#   legacy: \"Decimals\"\n"));
        assert!(ttl.contains("# sip-concept:DECIMALS skos:exactMatch sdmx-concept:decimals .\n"));
        assert!(!ttl.contains("Legacy graph unavailable"));
    }

    #[test]
    fn test_render_codelists_sorted_with_header() {
        let csv = render_codelists(&output().codelists);
        assert_eq!(
            csv,
            "Codelist ID,Concept ID\nCL_ATTR,ATTRIBUTE\nCL_FREQ,FREQ\n"
        );
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"x\""), "\"say \"\"x\"\"\"");
    }

    #[test]
    fn test_render_comments() {
        let text = render_comments(&output(), "en");
        assert!(text.contains("\nATTRIBUTE ;\n    rdfs:label \"Attribute\"@en ;\n    rdfs:comment \"Used in DSDs.\"@en .\n"));
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let ns = NamespaceContext::default();
        let scheme = SchemeMetadata::default();
        let names = OutputNames::default();
        let options = EmitOptions {
            namespaces: &ns,
            scheme: &scheme,
            names: &names,
            issued: issued(),
            tuning: false,
        };

        let written = write_outputs(&output(), &dir.path().join("out"), &options).unwrap();
        assert_eq!(written.len(), 4);
        assert!(dir.path().join("out/SDMX_Glossary.ttl").exists());
        assert!(!dir.path().join("out/tuning_res.ttl").exists());
    }
}
