use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    // Hierarchical
    Broader,
    Narrower,

    // Associative
    Related,

    // Cross-model
    ExactMatch,
    CloseMatch,
}

impl Predicate {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broader => "broader",
            Self::Narrower => "narrower",
            Self::Related => "related",
            Self::ExactMatch => "exactMatch",
            Self::CloseMatch => "closeMatch",
        }
    }

    /// Prefixed SKOS term, e.g. `skos:broader`.
    #[must_use]
    pub fn skos_term(&self) -> String {
        format!("skos:{}", self.as_str())
    }

    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::Broader => Some(Self::Narrower),
            Self::Narrower => Some(Self::Broader),
            Self::Related => Some(Self::Related),
            Self::ExactMatch | Self::CloseMatch => None,
        }
    }

    /// Match predicates point into the legacy scheme.
    #[must_use]
    pub fn is_cross_model(&self) -> bool {
        matches!(self, Self::ExactMatch | Self::CloseMatch)
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Predicate {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("skos:").unwrap_or(s) {
            "broader" => Ok(Self::Broader),
            "narrower" => Ok(Self::Narrower),
            "related" => Ok(Self::Related),
            "exactMatch" => Ok(Self::ExactMatch),
            "closeMatch" => Ok(Self::CloseMatch),
            _ => Err(crate::Error::InvalidPredicate(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relation {
    pub subject: String,
    pub predicate: Predicate,
    /// A new-scheme id, or a legacy id for cross-model predicates.
    pub object: String,
}

impl Relation {
    pub fn new(
        subject: impl Into<String>,
        predicate: Predicate,
        object: impl Into<String>,
    ) -> crate::Result<Self> {
        let subject = subject.into();
        let object = object.into();

        if !predicate.is_cross_model() && subject == object {
            return Err(crate::Error::SelfReference(subject));
        }

        Ok(Self {
            subject,
            predicate,
            object,
        })
    }

    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        self.predicate.inverse().map(|predicate| Self {
            subject: self.object.clone(),
            predicate,
            object: self.subject.clone(),
        })
    }
}

/// Deduplicated, ordered edge set.
///
/// Holds at most one `broader` edge and at most one cross-model edge per
/// subject; inserting a second one replaces the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSet {
    relations: BTreeSet<Relation>,
}

impl RelationSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the relation this insert displaced, if any.
    pub fn insert(&mut self, relation: Relation) -> Option<Relation> {
        let displaced = match relation.predicate {
            Predicate::Broader => self.take_first(&relation.subject, |p| p == Predicate::Broader),
            p if p.is_cross_model() => {
                self.take_first(&relation.subject, |p| p.is_cross_model())
            }
            _ => None,
        };
        self.relations.insert(relation);
        displaced.filter(|d| !self.relations.contains(d))
    }

    fn take_first(&mut self, subject: &str, pred: impl Fn(Predicate) -> bool) -> Option<Relation> {
        let existing = self
            .relations
            .iter()
            .find(|r| r.subject == subject && pred(r.predicate))
            .cloned()?;
        self.relations.remove(&existing);
        Some(existing)
    }

    pub fn remove(&mut self, relation: &Relation) -> bool {
        self.relations.remove(relation)
    }

    #[must_use]
    pub fn contains(&self, relation: &Relation) -> bool {
        self.relations.contains(relation)
    }

    pub fn extend(&mut self, relations: impl IntoIterator<Item = Relation>) {
        for relation in relations {
            self.insert(relation);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    pub fn outgoing<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a Relation> {
        self.relations.iter().filter(move |r| r.subject == subject)
    }

    #[must_use]
    pub fn broader_of<'a>(&'a self, subject: &str) -> Option<&'a str> {
        self.relations
            .iter()
            .find(|r| r.subject == subject && r.predicate == Predicate::Broader)
            .map(|r| r.object.as_str())
    }

    pub fn with_predicate(&self, predicate: Predicate) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(move |r| r.predicate == predicate)
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

impl<'a> IntoIterator for &'a RelationSet {
    type Item = &'a Relation;
    type IntoIter = std::collections::btree_set::Iter<'a, Relation>;

    fn into_iter(self) -> Self::IntoIter {
        self.relations.iter()
    }
}
