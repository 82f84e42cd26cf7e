use std::collections::HashMap;

use regex::Regex;

use crate::matching::{LegacyConcept, LegacyGraph};
use crate::namespace::NamespaceContext;
use crate::text::camel_to_upper_snake;
use crate::{Error, Result};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
const SKOS_CONCEPT: &str = "http://www.w3.org/2004/02/skos/core#Concept";
const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
const SKOS_DEFINITION: &str = "http://www.w3.org/2004/02/skos/core#definition";
const SKOS_NOTATION: &str = "http://www.w3.org/2004/02/skos/core#notation";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Iri(String),
    /// Prefixed names, `a`, bare keywords, numbers and booleans.
    Name(String),
    /// `@prefix`, `@base`, lower-cased without the `@`.
    Directive(String),
    Literal { value: String, lang: Option<String> },
    Punct(char),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Object {
    Iri(String),
    Literal { value: String, lang: Option<String> },
    Anonymous,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidDocument(message.into())
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ';' | ',' | '<' | '>' | '"' | '\'' | '[' | ']' | '(' | ')' | '#')
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '#' => {
                let start = i + 1;
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Comment(text.trim().to_string()));
            }
            '<' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '>')
                    .map(|p| i + 1 + p)
                    .ok_or_else(|| invalid(format!("unterminated IRI at char {i}")))?;
                tokens.push(Token::Iri(chars[i + 1..end].iter().collect()));
                i = end + 1;
            }
            '"' | '\'' => {
                let (value, next) = read_string(&chars, i)?;
                i = next;

                let mut lang = None;
                if chars.get(i) == Some(&'@') {
                    let start = i + 1;
                    i = start;
                    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '-') {
                        i += 1;
                    }
                    lang = Some(chars[start..i].iter().collect());
                } else if chars.get(i) == Some(&'^') && chars.get(i + 1) == Some(&'^') {
                    i += 2;
                    if chars.get(i) == Some(&'<') {
                        while i < chars.len() && chars[i] != '>' {
                            i += 1;
                        }
                        i += 1;
                    } else {
                        i = read_name_end(&chars, i);
                    }
                }

                tokens.push(Token::Literal { value, lang });
            }
            ';' | ',' | '[' | ']' | '(' | ')' => {
                tokens.push(Token::Punct(c));
                i += 1;
            }
            '.' if !chars.get(i + 1).is_some_and(char::is_ascii_digit) => {
                tokens.push(Token::Punct('.'));
                i += 1;
            }
            '@' => {
                let end = read_name_end(&chars, i + 1);
                let word: String = chars[i + 1..end].iter().collect();
                tokens.push(Token::Directive(word.to_lowercase()));
                i = end;
            }
            _ => {
                let end = read_name_end(&chars, i);
                if end == i {
                    return Err(invalid(format!("unexpected '{c}' at char {i}")));
                }
                tokens.push(Token::Name(chars[i..end].iter().collect()));
                i = end;
            }
        }
    }

    Ok(tokens)
}

/// End of a bare name starting at `start`. A `.` belongs to the name only
/// when another name character follows it.
fn read_name_end(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == '.' {
            match chars.get(i + 1) {
                Some(&n) if !is_delimiter(n) && n != '.' => i += 1,
                _ => break,
            }
        } else if is_delimiter(c) {
            break;
        } else {
            i += 1;
        }
    }
    i
}

/// Reads a short or long (triple-quoted) string starting at the opening
/// quote. Returns the unescaped value and the index after the closing quote.
fn read_string(chars: &[char], start: usize) -> Result<(String, usize)> {
    let quote = chars[start];
    let long = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = if long { start + 3 } else { start + 1 };
    let mut value = String::new();

    loop {
        let Some(&c) = chars.get(i) else {
            return Err(invalid(format!("unterminated string at char {start}")));
        };

        if c == '\\' {
            let escaped = chars
                .get(i + 1)
                .ok_or_else(|| invalid(format!("dangling escape at char {i}")))?;
            i += 2;
            match escaped {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                'b' => value.push('\u{8}'),
                'f' => value.push('\u{c}'),
                'u' | 'U' => {
                    let width = if *escaped == 'u' { 4 } else { 8 };
                    let hex: String = chars.get(i..i + width).unwrap_or_default().iter().collect();
                    let decoded = u32::from_str_radix(&hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| invalid(format!("bad unicode escape at char {i}")))?;
                    value.push(decoded);
                    i += width;
                }
                other => value.push(*other),
            }
            continue;
        }

        if long {
            if c == quote && chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                return Ok((value, i + 3));
            }
        } else if c == quote {
            return Ok((value, i + 1));
        } else if c == '\n' {
            return Err(invalid(format!("newline in short string at char {start}")));
        }

        value.push(c);
        i += 1;
    }
}

/// Everything said about one subject, across all of its blocks.
#[derive(Debug, Default)]
struct Subject {
    marker: Option<String>,
    types: Vec<String>,
    labels: Vec<(String, Option<String>)>,
    pref_labels: Vec<(String, Option<String>)>,
    comments: Vec<(String, Option<String>)>,
    definitions: Vec<(String, Option<String>)>,
    notation: Option<String>,
}

impl Subject {
    fn add(&mut self, predicate: &str, object: Object) {
        match (predicate, object) {
            (RDF_TYPE, Object::Iri(iri)) => self.types.push(iri),
            (RDFS_LABEL, Object::Literal { value, lang }) => self.labels.push((value, lang)),
            (SKOS_PREF_LABEL, Object::Literal { value, lang }) => {
                self.pref_labels.push((value, lang));
            }
            (RDFS_COMMENT, Object::Literal { value, lang }) => self.comments.push((value, lang)),
            (SKOS_DEFINITION, Object::Literal { value, lang }) => {
                self.definitions.push((value, lang));
            }
            (SKOS_NOTATION, Object::Literal { value, .. }) => {
                self.notation.get_or_insert(value);
            }
            _ => {}
        }
    }
}

/// First value in `language`, else the first untagged value, else the first.
fn pick<'a>(values: &'a [(String, Option<String>)], language: &str) -> Option<&'a str> {
    values
        .iter()
        .find(|(_, lang)| lang.as_deref() == Some(language))
        .or_else(|| values.iter().find(|(_, lang)| lang.is_none()))
        .or_else(|| values.first())
        .map(|(value, _)| value.trim())
        .filter(|value| !value.is_empty())
}

pub struct LegacyReader {
    namespaces: NamespaceContext,
    marker: Regex,
    notation_id: Regex,
}

impl LegacyReader {
    pub fn new(namespaces: NamespaceContext) -> Result<Self> {
        Ok(Self {
            namespaces,
            marker: Regex::new(r"^[A-Z][A-Z0-9_]*$")?,
            notation_id: Regex::new(r"([A-Z][A-Z0-9_]*)$")?,
        })
    }

    pub fn read(&self, text: &str) -> Result<LegacyGraph> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            prefixes: HashMap::new(),
        };

        let mut order: Vec<String> = Vec::new();
        let mut subjects: HashMap<String, Subject> = HashMap::new();
        let mut pending_marker: Option<String> = None;

        while let Some(token) = parser.peek() {
            match token {
                Token::Comment(comment) => {
                    pending_marker = self
                        .marker
                        .is_match(comment)
                        .then(|| comment.clone());
                    parser.pos += 1;
                }
                Token::Directive(_) | Token::Name(_)
                    if parser.at_directive() =>
                {
                    parser.directive()?;
                    pending_marker = None;
                }
                _ => {
                    let (subject, pairs) = parser.statement()?;
                    let marker = pending_marker.take();
                    let Some(subject) = subject else { continue };

                    let entry = subjects.entry(subject.clone()).or_insert_with(|| {
                        order.push(subject);
                        Subject::default()
                    });
                    if entry.marker.is_none() {
                        entry.marker = marker;
                    }
                    for (predicate, object) in pairs {
                        entry.add(&predicate, object);
                    }
                }
            }
        }

        let language = self.namespaces.language.as_str();
        let mut concepts = Vec::new();

        for iri in order {
            let Some(subject) = subjects.remove(&iri) else { continue };
            if !subject.types.iter().any(|t| t == SKOS_CONCEPT) {
                continue;
            }

            let Some(label) = pick(&subject.labels, language)
                .or_else(|| pick(&subject.pref_labels, language))
            else {
                tracing::debug!("Skipping unlabeled legacy concept {}", iri);
                continue;
            };

            let local_id = self
                .namespaces
                .legacy_scheme
                .local_name(&iri)
                .unwrap_or_else(|| iri.rsplit(['#', '/']).next().unwrap_or(iri.as_str()))
                .to_string();

            let marker_id = subject
                .marker
                .clone()
                .or_else(|| {
                    subject
                        .notation
                        .as_deref()
                        .and_then(|n| self.notation_id.captures(n))
                        .map(|c| c[1].to_string())
                })
                .unwrap_or_else(|| camel_to_upper_snake(&local_id));

            concepts.push(LegacyConcept {
                marker_id,
                local_id,
                label: label.to_string(),
                description: pick(&subject.comments, language)
                    .or_else(|| pick(&subject.definitions, language))
                    .map(str::to_string),
            });
        }

        tracing::info!("Read {} legacy concepts", concepts.len());
        Ok(LegacyGraph::new(concepts))
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    prefixes: HashMap<String, String>,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    /// Next token that is not a comment.
    fn next_significant(&mut self) -> Result<&'t Token> {
        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            if !matches!(token, Token::Comment(_)) {
                return Ok(token);
            }
        }
        Err(invalid("unexpected end of document"))
    }

    fn at_directive(&self) -> bool {
        match self.peek() {
            Some(Token::Directive(_)) => true,
            Some(Token::Name(n)) => n.eq_ignore_ascii_case("prefix") || n.eq_ignore_ascii_case("base"),
            _ => false,
        }
    }

    fn directive(&mut self) -> Result<()> {
        let (keyword, turtle_style) = match self.next_significant()? {
            Token::Directive(d) => (d.to_lowercase(), true),
            Token::Name(n) => (n.to_lowercase(), false),
            other => return Err(invalid(format!("expected directive, found {other:?}"))),
        };

        if keyword == "prefix" {
            let Token::Name(name) = self.next_significant()? else {
                return Err(invalid("expected prefix name"));
            };
            let Token::Iri(iri) = self.next_significant()? else {
                return Err(invalid(format!("expected IRI for prefix {name}")));
            };
            let prefix = name.strip_suffix(':').unwrap_or(name);
            self.prefixes.insert(prefix.to_string(), iri.clone());
        } else {
            let Token::Iri(_) = self.next_significant()? else {
                return Err(invalid("expected IRI after base"));
            };
        }

        if turtle_style {
            self.expect('.')?;
        }
        Ok(())
    }

    fn expect(&mut self, punct: char) -> Result<()> {
        match self.next_significant()? {
            Token::Punct(p) if *p == punct => Ok(()),
            other => Err(invalid(format!("expected '{punct}', found {other:?}"))),
        }
    }

    fn resolve(&self, name: &str) -> Result<String> {
        if name == "a" {
            return Ok(RDF_TYPE.to_string());
        }
        let (prefix, local) = name
            .split_once(':')
            .ok_or_else(|| invalid(format!("not a prefixed name: {name}")))?;
        let base = self
            .prefixes
            .get(prefix)
            .ok_or_else(|| invalid(format!("undeclared prefix '{prefix}'")))?;
        Ok(format!("{base}{local}"))
    }

    /// Skips to the token after the bracket matching the one just consumed.
    fn skip_group(&mut self, open: char, close: char) -> Result<()> {
        let mut depth = 1;
        while depth > 0 {
            match self.next_significant()? {
                Token::Punct(p) if *p == open => depth += 1,
                Token::Punct(p) if *p == close => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn object(&mut self) -> Result<Object> {
        match self.next_significant()? {
            Token::Iri(iri) => Ok(Object::Iri(iri.clone())),
            Token::Name(name) if name.contains(':') => Ok(Object::Iri(self.resolve(name)?)),
            Token::Name(_) => Ok(Object::Anonymous),
            Token::Literal { value, lang } => Ok(Object::Literal {
                value: value.clone(),
                lang: lang.clone(),
            }),
            Token::Punct('[') => {
                self.skip_group('[', ']')?;
                Ok(Object::Anonymous)
            }
            Token::Punct('(') => {
                self.skip_group('(', ')')?;
                Ok(Object::Anonymous)
            }
            other => Err(invalid(format!("expected object, found {other:?}"))),
        }
    }

    /// One subject block up to its closing `.`. Anonymous subjects yield
    /// `None`.
    #[allow(clippy::type_complexity)]
    fn statement(&mut self) -> Result<(Option<String>, Vec<(String, Object)>)> {
        let subject = match self.next_significant()? {
            Token::Iri(iri) => Some(iri.clone()),
            Token::Name(name) => Some(self.resolve(name)?),
            Token::Punct('[') => {
                self.skip_group('[', ']')?;
                None
            }
            other => return Err(invalid(format!("expected subject, found {other:?}"))),
        };

        let mut pairs = Vec::new();

        loop {
            let predicate = match self.next_significant()? {
                Token::Punct('.') => break,
                Token::Punct(';') => continue,
                Token::Iri(iri) => iri.clone(),
                Token::Name(name) => self.resolve(name)?,
                other => return Err(invalid(format!("expected predicate, found {other:?}"))),
            };

            loop {
                let object = self.object()?;
                pairs.push((predicate.clone(), object));

                match self.next_significant()? {
                    Token::Punct(',') => continue,
                    Token::Punct(';') => break,
                    Token::Punct('.') => return Ok((subject, pairs)),
                    other => {
                        return Err(invalid(format!("expected ',', ';' or '.', found {other:?}")))
                    }
                }
            }
        }

        Ok((subject, pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"
@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
@prefix dcterms: <http://purl.org/dc/terms/> .
@prefix sdmx-concept: <http://purl.org/linked-data/sdmx/2009/concept#> .

sdmx-concept:cog a skos:ConceptScheme ;
    rdfs:label "Content oriented guidelines"@en ;
    dcterms:creator [ a <http://xmlns.com/foaf/0.1/Organization> ; rdfs:label "SDMX" ] .

# CONF_STATUS
sdmx-concept:confStatus a skos:Concept, <http://purl.org/linked-data/sdmx#Concept> ;
    rdfs:label "Confidentiality - status"@en, "Statut"@fr ;
    rdfs:comment """Information about the
confidentiality status of the object."""@en ;
    skos:inScheme sdmx-concept:cog .

sdmx-concept:timeCoverage a skos:Concept ;
    skos:prefLabel "Time coverage" ;
    skos:definition "The length of time for which data are available." ;
    skos:notation "urn:sdmx:org.sdmx.infomodel.conceptscheme.Concept=SDMX:CROSS_DOMAIN_CONCEPTS[1.0].TIME_PER_COLLECT" .

# a section header
sdmx-concept:unitMult a skos:Concept ;
    rdfs:label "Unit \"multiplier\""@en ;
    rdfs:comment "Exponent in base 10."^^<http://www.w3.org/2001/XMLSchema#string> .

sdmx-concept:noLabel a skos:Concept .
"#;

    fn reader() -> LegacyReader {
        LegacyReader::new(NamespaceContext::default()).unwrap()
    }

    #[test]
    fn test_reads_concepts_in_order() {
        let graph = reader().read(LEGACY).unwrap();
        let ids: Vec<&str> = graph.iter().map(|c| c.local_id.as_str()).collect();
        assert_eq!(ids, vec!["confStatus", "timeCoverage", "unitMult"]);
    }

    #[test]
    fn test_marker_sources() {
        let graph = reader().read(LEGACY).unwrap();

        // Comment marker.
        assert_eq!(graph.get("confStatus").unwrap().marker_id, "CONF_STATUS");
        // Notation tail when no marker comment precedes the block.
        assert_eq!(graph.get("timeCoverage").unwrap().marker_id, "TIME_PER_COLLECT");
        // Free-text comments are not markers; fall back to the local name.
        assert_eq!(graph.get("unitMult").unwrap().marker_id, "UNIT_MULT");
    }

    #[test]
    fn test_labels_and_descriptions() {
        let graph = reader().read(LEGACY).unwrap();

        let conf = graph.get("confStatus").unwrap();
        assert_eq!(conf.label, "Confidentiality - status");
        assert_eq!(
            conf.description.as_deref(),
            Some("Information about the\nconfidentiality status of the object.")
        );

        let time = graph.get("timeCoverage").unwrap();
        assert_eq!(time.label, "Time coverage");
        assert_eq!(
            time.description.as_deref(),
            Some("The length of time for which data are available.")
        );

        let unit = graph.get("unitMult").unwrap();
        assert_eq!(unit.label, "Unit \"multiplier\"");
        assert_eq!(unit.description.as_deref(), Some("Exponent in base 10."));

        assert!(graph.get("noLabel").is_none());
    }

    #[test]
    fn test_sparql_style_prefix() {
        let text = "PREFIX skos: <http://www.w3.org/2004/02/skos/core#>\n\
                    PREFIX c: <http://purl.org/linked-data/sdmx/2009/concept#>\n\
                    c:freq a skos:Concept ; skos:prefLabel \"Frequency\"@en .";
        let graph = reader().read(text).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get("freq").unwrap().marker_id, "FREQ");
    }

    #[test]
    fn test_malformed_documents() {
        let reader = reader();
        assert!(reader.read("@prefix x: <http://x/> .\nx:a x:b \"open").is_err());
        assert!(reader.read("y:a a y:Concept .").is_err());
        assert!(reader.read("@prefix x: <http://x/> .\nx:a x:b x:c").is_err());
    }
}
