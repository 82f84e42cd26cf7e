use serde::{Deserialize, Serialize};

use crate::matching::{Classification, MatchResult, Mismatch};
use crate::resolve::RuleKind;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MalformedRecord,
    DuplicateId,
    UnresolvedReference,
    SelfReference,
    OverriddenProposal,
    BroaderCycle,
    LegacyGraphUnavailable,
}

impl DiagnosticKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRecord => "malformed_record",
            Self::DuplicateId => "duplicate_id",
            Self::UnresolvedReference => "unresolved_reference",
            Self::SelfReference => "self_reference",
            Self::OverriddenProposal => "overridden_proposal",
            Self::BroaderCycle => "broader_cycle",
            Self::LegacyGraphUnavailable => "legacy_graph_unavailable",
        }
    }

    /// Informational kinds record a deliberate decision, not a data problem.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::OverriddenProposal)
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, concept_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            concept_id: concept_id.map(str::to_string),
            message: message.into(),
        }
    }

    /// Maps a non-fatal core error onto its diagnostic kind.
    ///
    /// Returns `None` for errors that are fatal and never recorded.
    #[must_use]
    pub fn from_error(concept_id: Option<&str>, error: &Error) -> Option<Self> {
        let kind = match error {
            Error::MalformedRecord { .. } => DiagnosticKind::MalformedRecord,
            Error::UnresolvedReference { .. } => DiagnosticKind::UnresolvedReference,
            Error::SelfReference(_) => DiagnosticKind::SelfReference,
            Error::LegacyGraphUnavailable(_) => DiagnosticKind::LegacyGraphUnavailable,
            _ => return None,
        };
        Some(Self::new(kind, concept_id, error.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        let concept = diagnostic.concept_id.as_deref().unwrap_or("-");
        if diagnostic.kind.is_informational() {
            tracing::debug!(kind = %diagnostic.kind, concept, "{}", diagnostic.message);
        } else {
            tracing::warn!(kind = %diagnostic.kind, concept, "{}", diagnostic.message);
        }
        self.entries.push(diagnostic);
    }

    pub fn push(&mut self, kind: DiagnosticKind, concept_id: Option<&str>, message: impl Into<String>) {
        self.record(Diagnostic::new(kind, concept_id, message));
    }

    /// Records `error` if it is a non-fatal kind; hands it back otherwise.
    pub fn record_error(&mut self, concept_id: Option<&str>, error: Error) -> Result<(), Error> {
        match Diagnostic::from_error(concept_id, &error) {
            Some(diagnostic) => {
                self.record(diagnostic);
                Ok(())
            }
            None => Err(error),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| !d.kind.is_informational())
            .count()
    }
}

/// One entry of the hierarchy review report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningEntry {
    /// 1-based position in the report.
    pub ordinal: usize,
    pub concept_id: String,
    pub broader_id: String,
    pub decided_by: RuleKind,
}

/// Diagnostic report 1: concepts with a resolved broader relation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TuningReport {
    pub entries: Vec<TuningEntry>,
}

impl TuningReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Diagnostic report 2: concepts with no usable legacy counterpart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// False when the legacy graph could not be loaded.
    pub reconciled: bool,
    pub unmatched: Vec<String>,
    pub mismatched: Vec<Mismatch>,
}

impl ReconciliationReport {
    #[must_use]
    pub fn from_results(results: &[MatchResult], reconciled: bool) -> Self {
        let mut report = Self {
            reconciled,
            ..Self::default()
        };

        for result in results {
            match (&result.classification, &result.mismatch) {
                (Classification::None, _) => report.unmatched.push(result.concept_id.clone()),
                (Classification::Mismatch, Some(mismatch)) => {
                    report.mismatched.push(mismatch.clone());
                }
                _ => {}
            }
        }

        report
    }

    pub fn is_empty(&self) -> bool {
        self.unmatched.is_empty() && self.mismatched.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_keeps_fatal_errors() {
        let mut diagnostics = Diagnostics::new();

        let recorded = diagnostics.record_error(
            Some("A"),
            Error::UnresolvedReference {
                subject: "A".into(),
                reference: "B".into(),
            },
        );
        assert!(recorded.is_ok());

        let fatal = diagnostics.record_error(None, Error::InvalidOverride("bad".into()));
        assert!(fatal.is_err());

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::UnresolvedReference), 1);
    }

    #[test]
    fn test_informational_kinds_are_not_warnings() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(DiagnosticKind::OverriddenProposal, Some("A"), "replaced");
        diagnostics.push(DiagnosticKind::DuplicateId, Some("A"), "duplicate");

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.warning_count(), 1);
    }
}
