pub mod concept;
pub mod config;
pub mod emit;
pub mod error;
pub mod fixes;
pub mod hierarchy;
pub mod ingest;
pub mod matching;
pub mod namespace;
pub mod pipeline;
pub mod relation;
pub mod report;
pub mod resolve;
pub mod text;

pub use concept::{
    AnnotationKind, Annotations, CodelistAssociation, Concept, ConceptStore, SourceRecord,
};
pub use config::GlossgenConfig;
pub use emit::{EmitOptions, OutputNames, SchemeMetadata, TurtleEmitter};
pub use error::{Error, Result};
pub use fixes::{FixRegistry, OverrideConfig, ParentOverride};
pub use hierarchy::Hierarchy;
pub use ingest::{FetchConfig, Fetcher, LegacyReader, SdmxReader, SourceLocation};
pub use matching::{
    Classification, LegacyConcept, LegacyGraph, MatchResult, MatcherConfig, Matching, Mismatch,
    ModelMatcher,
};
pub use namespace::{Binding, NamespaceContext};
pub use pipeline::{BuildOutput, GlossaryBuilder};
pub use relation::{Predicate, Relation, RelationSet};
pub use report::{
    Diagnostic, DiagnosticKind, Diagnostics, ReconciliationReport, TuningEntry, TuningReport,
};
pub use resolve::{
    ContainmentScope, RelationshipResolver, Resolution, ResolutionRule, ResolverConfig, RuleKind,
};
pub use text::TextNormalizer;
