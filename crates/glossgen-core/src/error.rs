use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed record #{index}: missing {field}")]
    MalformedRecord { index: usize, field: &'static str },

    #[error("Unresolved reference from {subject} to {reference}")]
    UnresolvedReference { subject: String, reference: String },

    #[error("Self-referential relation not allowed: {0}")]
    SelfReference(String),

    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("Invalid annotation type: {0}")]
    InvalidAnnotationType(String),

    #[error("Invalid override: {0}")]
    InvalidOverride(String),

    #[error("Legacy graph unavailable: {0}")]
    LegacyGraphUnavailable(String),

    #[error("Invalid source document: {0}")]
    InvalidDocument(String),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
