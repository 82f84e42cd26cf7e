use roxmltree::{Document, Node, NS_XML_URI};

use crate::concept::{AnnotationKind, SourceRecord};
use crate::Result;

pub const STRUCTURE_NS: &str = "http://www.sdmx.org/resources/sdmxml/schemas/v3_0/structure";
pub const COMMON_NS: &str = "http://www.sdmx.org/resources/sdmxml/schemas/v3_0/common";

/// Reads concept records from an SDMX-ML structure message.
#[derive(Debug, Clone)]
pub struct SdmxReader {
    include_context: bool,
    language: String,
}

impl SdmxReader {
    #[must_use]
    pub fn new(include_context: bool, language: impl Into<String>) -> Self {
        Self {
            include_context,
            language: language.into(),
        }
    }

    /// Records in document order. Missing ids and names are left as `None`
    /// for the store to report.
    pub fn read(&self, xml: &str) -> Result<Vec<SourceRecord>> {
        let doc = Document::parse(xml)?;

        let records: Vec<SourceRecord> = doc
            .descendants()
            .filter(|n| is_element(n, "Concept", STRUCTURE_NS))
            .map(|n| self.record(n))
            .collect();

        tracing::info!("Read {} concept records", records.len());
        Ok(records)
    }

    fn record(&self, concept: Node<'_, '_>) -> SourceRecord {
        let mut record = SourceRecord {
            id: concept.attribute("id").map(str::to_string),
            urn: concept.attribute("urn").map(str::to_string),
            name: self.localized_child(concept, "Name"),
            description: self.localized_child(concept, "Description"),
            annotations: Vec::new(),
        };

        for annotation in concept
            .descendants()
            .filter(|n| is_element(n, "Annotation", COMMON_NS))
        {
            let Some(kind) = annotation
                .children()
                .find(|n| is_element(n, "AnnotationType", COMMON_NS))
                .map(|n| text_of(n).trim().to_string())
            else {
                continue;
            };

            if !self.include_context && kind == AnnotationKind::Context.as_str() {
                continue;
            }

            if let Some(text) = self.localized_child(annotation, "AnnotationText") {
                record.annotations.push((kind, text));
            }
        }

        record
    }

    /// Text of the direct child in the configured language, or of the first
    /// such child when none carries that language. Blank text counts as
    /// missing.
    fn localized_child(&self, parent: Node<'_, '_>, name: &str) -> Option<String> {
        let candidates: Vec<Node<'_, '_>> = parent
            .children()
            .filter(|n| is_element(n, name, COMMON_NS))
            .collect();

        let chosen = candidates
            .iter()
            .find(|n| n.attribute((NS_XML_URI, "lang")) == Some(self.language.as_str()))
            .or_else(|| candidates.first())?;

        let text = text_of(*chosen);
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl Default for SdmxReader {
    fn default() -> Self {
        Self::new(true, "en")
    }
}

/// Matches on local name; elements without a namespace are accepted too so
/// that hand-written fixtures need not declare one.
fn is_element(node: &Node<'_, '_>, local: &str, namespace: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node
            .tag_name()
            .namespace()
            .map_or(true, |ns| ns == namespace)
}

fn text_of(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mes:Structure xmlns:mes="http://www.sdmx.org/resources/sdmxml/schemas/v3_0/message"
               xmlns:str="http://www.sdmx.org/resources/sdmxml/schemas/v3_0/structure"
               xmlns:com="http://www.sdmx.org/resources/sdmxml/schemas/v3_0/common">
  <mes:Structures>
    <str:ConceptSchemes>
      <str:ConceptScheme id="CROSS_DOMAIN_CONCEPTS" urn="urn:scheme">
        <com:Name xml:lang="en">Cross-domain concepts</com:Name>
        <str:Concept id="CONF_STATUS" urn="urn:sdmx:CONF_STATUS">
          <com:Annotations>
            <com:Annotation>
              <com:AnnotationType>CONTEXT</com:AnnotationType>
              <com:AnnotationText xml:lang="en">Used for confidential data.</com:AnnotationText>
            </com:Annotation>
            <com:Annotation>
              <com:AnnotationType>RELATED_TERMS</com:AnnotationType>
              <com:AnnotationText xml:lang="en">CONF; OBS_STATUS</com:AnnotationText>
            </com:Annotation>
            <com:Annotation>
              <com:AnnotationType>CODELIST_ID</com:AnnotationType>
              <com:AnnotationText xml:lang="en">CL_CONF_STATUS</com:AnnotationText>
            </com:Annotation>
          </com:Annotations>
          <com:Name xml:lang="fr">Statut de confidentialité</com:Name>
          <com:Name xml:lang="en">Confidentiality - status</com:Name>
          <com:Description xml:lang="en">Information about the confidentiality status.</com:Description>
        </str:Concept>
        <str:Concept id="NO_NAME" urn="urn:sdmx:NO_NAME">
          <com:Name xml:lang="en">   </com:Name>
        </str:Concept>
      </str:ConceptScheme>
    </str:ConceptSchemes>
  </mes:Structures>
</mes:Structure>"#;

    #[test]
    fn test_read_concepts() {
        let records = SdmxReader::default().read(MESSAGE).unwrap();
        assert_eq!(records.len(), 2);

        let conf = &records[0];
        assert_eq!(conf.id.as_deref(), Some("CONF_STATUS"));
        assert_eq!(conf.urn.as_deref(), Some("urn:sdmx:CONF_STATUS"));
        assert_eq!(conf.name.as_deref(), Some("Confidentiality - status"));
        assert_eq!(
            conf.description.as_deref(),
            Some("Information about the confidentiality status.")
        );
        assert_eq!(conf.annotations.len(), 3);
        assert_eq!(conf.annotations[0].0, "CONTEXT");
        assert_eq!(conf.annotations[1].1, "CONF; OBS_STATUS");

        // The scheme's own Name is not a concept name.
        assert_eq!(records[1].name, None);
    }

    #[test]
    fn test_context_annotation_can_be_excluded() {
        let records = SdmxReader::new(false, "en").read(MESSAGE).unwrap();
        assert!(records[0]
            .annotations
            .iter()
            .all(|(kind, _)| kind != "CONTEXT"));
        assert_eq!(records[0].annotations.len(), 2);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(matches!(
            SdmxReader::default().read("<Structure><Concept></Structure>"),
            Err(crate::Error::Xml(_))
        ));
    }
}
