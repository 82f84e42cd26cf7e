use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub prefix: String,
    pub base: String,
}

impl Binding {
    #[must_use]
    pub fn new(prefix: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            base: base.into(),
        }
    }

    /// `prefix:local`
    #[must_use]
    pub fn qualify(&self, local: &str) -> String {
        format!("{}:{local}", self.prefix)
    }

    #[must_use]
    pub fn iri(&self, local: &str) -> String {
        format!("{}{local}", self.base)
    }

    /// The local part of `iri` if it lives under this base.
    #[must_use]
    pub fn local_name<'a>(&self, iri: &'a str) -> Option<&'a str> {
        iri.strip_prefix(self.base.as_str()).filter(|l| !l.is_empty())
    }

    #[must_use]
    pub fn declaration(&self) -> String {
        format!("@prefix {}: <{}> .", self.prefix, self.base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceContext {
    /// Namespace of the generated concepts.
    pub new_scheme: Binding,
    /// Namespace of the 2009 vocabulary being replaced.
    pub legacy_scheme: Binding,
    /// Local name of the concept scheme resource in the new namespace.
    pub scheme_id: String,
    /// Documentation the new scheme is defined by.
    pub new_scheme_doc: String,
    /// Language tag for emitted literals.
    pub language: String,
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self {
            new_scheme: Binding::new(
                "sip-concept",
                "https://purl.semanticip.org/linked-data/sdmx/concept/",
            ),
            legacy_scheme: Binding::new(
                "sdmx-concept",
                "http://purl.org/linked-data/sdmx/2009/concept#",
            ),
            scheme_id: "cog".to_string(),
            new_scheme_doc:
                "https://sdmx.org/wp-content/uploads/SDMX_Glossary_Version_2_1_December_2020.htm"
                    .to_string(),
            language: "en".to_string(),
        }
    }
}

impl NamespaceContext {
    #[must_use]
    pub fn concept(&self, id: &str) -> String {
        self.new_scheme.qualify(id)
    }

    #[must_use]
    pub fn legacy_concept(&self, id: &str) -> String {
        self.legacy_scheme.qualify(id)
    }

    #[must_use]
    pub fn scheme(&self) -> String {
        self.new_scheme.qualify(&self.scheme_id)
    }

    /// The legacy vocabulary namespace, as the new scheme's `dcterms:replaces`.
    #[must_use]
    pub fn legacy_document(&self) -> &str {
        &self.legacy_scheme.base
    }

    /// Fixed vocabulary prefixes followed by the two scheme bindings.
    #[must_use]
    pub fn prefix_block(&self) -> String {
        let fixed = [
            Binding::new("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
            Binding::new("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
            Binding::new("xsd", "http://www.w3.org/2001/XMLSchema#"),
            Binding::new("dcterms", "http://purl.org/dc/terms/"),
            Binding::new("foaf", "http://xmlns.com/foaf/0.1/"),
            Binding::new("skos", "http://www.w3.org/2004/02/skos/core#"),
        ];

        fixed
            .iter()
            .chain([&self.legacy_scheme, &self.new_scheme])
            .map(Binding::declaration)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify() {
        let ns = NamespaceContext::default();
        assert_eq!(ns.concept("DSD"), "sip-concept:DSD");
        assert_eq!(ns.legacy_concept("dsd"), "sdmx-concept:dsd");
        assert_eq!(ns.scheme(), "sip-concept:cog");
    }

    #[test]
    fn test_local_name() {
        let ns = NamespaceContext::default();
        assert_eq!(
            ns.legacy_scheme
                .local_name("http://purl.org/linked-data/sdmx/2009/concept#confStatus"),
            Some("confStatus")
        );
        assert_eq!(ns.legacy_scheme.local_name("http://example.org/x"), None);
        assert_eq!(
            ns.legacy_document(),
            "http://purl.org/linked-data/sdmx/2009/concept#"
        );
    }

    #[test]
    fn test_prefix_block_lists_schemes_last() {
        let ns = NamespaceContext::default();
        let block = ns.prefix_block();
        assert!(block.starts_with("@prefix rdf: "));
        assert!(block.ends_with(
            "@prefix sip-concept: <https://purl.semanticip.org/linked-data/sdmx/concept/> ."
        ));
    }
}
