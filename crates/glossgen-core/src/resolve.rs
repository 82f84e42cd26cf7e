use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::concept::{Concept, ConceptStore};
use crate::fixes::{FixRegistry, ParentOverride};
use crate::relation::{Predicate, Relation, RelationSet};
use crate::report::{DiagnosticKind, Diagnostics, TuningEntry, TuningReport};
use crate::text::{split_by_separator, DEFAULT_SEPARATOR};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    AnnotationDerived,
    LabelSeparator,
    DescriptionContainment,
    Override,
}

impl RuleKind {
    #[must_use]
    pub fn priority(&self) -> u8 {
        match self {
            Self::AnnotationDerived => 10,
            Self::LabelSeparator => 20,
            Self::DescriptionContainment => 30,
            Self::Override => 100,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnnotationDerived => "annotation_derived",
            Self::LabelSeparator => "label_separator",
            Self::DescriptionContainment => "description_containment",
            Self::Override => "override",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which concepts the description-containment rule may propose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentScope {
    /// Only concepts named in the concept's RELATED_TERMS.
    #[default]
    RelatedTerms,
    AllConcepts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub separator: String,
    pub containment_scope: ContainmentScope,
    /// Emit `(parent, narrower, child)` for every final broader edge.
    pub include_narrower: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            containment_scope: ContainmentScope::default(),
            include_narrower: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroaderCandidate {
    pub id: String,
    pub rule: RuleKind,
}

/// Candidates for one concept while the rules run.
#[derive(Debug, Clone, Default)]
pub struct Proposal {
    pub related: BTreeSet<String>,
    pub broader: Option<BroaderCandidate>,
}

impl Proposal {
    fn propose_broader(&mut self, subject: &str, id: &str, rule: RuleKind) {
        if let Some(previous) = &self.broader {
            if previous.id != id {
                tracing::debug!(
                    "{}: {} replaces broader {} ({}) with {}",
                    subject,
                    rule,
                    previous.id,
                    previous.rule,
                    id
                );
            }
        }
        self.broader = Some(BroaderCandidate {
            id: id.to_string(),
            rule,
        });
    }
}

pub struct RuleContext<'a> {
    pub store: &'a ConceptStore,
    pub fixes: &'a FixRegistry,
    pub config: &'a ResolverConfig,
}

pub trait ResolutionRule: Send + Sync {
    fn kind(&self) -> RuleKind;

    fn apply(
        &self,
        ctx: &RuleContext<'_>,
        concept: &Concept,
        proposal: &mut Proposal,
        diagnostics: &mut Diagnostics,
    );
}

/// RELATED_TERMS references become related candidates.
pub struct AnnotationRule;

impl ResolutionRule for AnnotationRule {
    fn kind(&self) -> RuleKind {
        RuleKind::AnnotationDerived
    }

    fn apply(
        &self,
        ctx: &RuleContext<'_>,
        concept: &Concept,
        proposal: &mut Proposal,
        diagnostics: &mut Diagnostics,
    ) {
        for reference in concept.annotations.related_terms() {
            let target = ctx
                .store
                .get(reference)
                .or_else(|| ctx.store.find_by_label(&ctx.fixes.corrected_label(reference)));

            let error = match target {
                Some(target) if target.id != concept.id => {
                    proposal.related.insert(target.id.clone());
                    continue;
                }
                Some(_) => Error::SelfReference(concept.id.clone()),
                None => Error::UnresolvedReference {
                    subject: concept.id.clone(),
                    reference: reference.clone(),
                },
            };

            if let Err(e) = diagnostics.record_error(Some(&concept.id), error) {
                tracing::error!("{}", e);
            }
        }
    }
}

/// `"Accuracy - overall"` proposes the concept labelled `"Accuracy"`.
pub struct LabelSeparatorRule;

impl ResolutionRule for LabelSeparatorRule {
    fn kind(&self) -> RuleKind {
        RuleKind::LabelSeparator
    }

    fn apply(
        &self,
        ctx: &RuleContext<'_>,
        concept: &Concept,
        proposal: &mut Proposal,
        _diagnostics: &mut Diagnostics,
    ) {
        let Some((head, _)) = split_by_separator(&concept.label, &ctx.config.separator) else {
            return;
        };

        if let Some(parent) = ctx.store.find_by_label(head) {
            if parent.id != concept.id {
                proposal.propose_broader(&concept.id, &parent.id, self.kind());
            }
        }
    }
}

/// A concept whose label occurs in this concept's description is broader.
///
/// Matching is a substring test on the normalized text. With several hits the
/// longest label wins, ties go to the smaller id.
pub struct DescriptionContainmentRule;

impl ResolutionRule for DescriptionContainmentRule {
    fn kind(&self) -> RuleKind {
        RuleKind::DescriptionContainment
    }

    fn apply(
        &self,
        ctx: &RuleContext<'_>,
        concept: &Concept,
        proposal: &mut Proposal,
        _diagnostics: &mut Diagnostics,
    ) {
        let Some(description) = concept.description.as_deref() else {
            return;
        };
        let normalizer = ctx.store.normalizer();

        let candidates: Vec<&Concept> = match ctx.config.containment_scope {
            ContainmentScope::RelatedTerms => proposal
                .related
                .iter()
                .filter_map(|id| ctx.store.get(id))
                .collect(),
            ContainmentScope::AllConcepts => ctx.store.iter().collect(),
        };

        let best = candidates
            .into_iter()
            .filter(|c| c.id != concept.id)
            .filter_map(|c| {
                let label = normalizer.normalize(&c.label);
                normalizer
                    .contains(description, &c.label)
                    .then_some((label.len(), c))
            })
            .max_by(|(a_len, a), (b_len, b)| a_len.cmp(b_len).then_with(|| b.id.cmp(&a.id)));

        if let Some((_, parent)) = best {
            proposal.propose_broader(&concept.id, &parent.id, self.kind());
        }
    }
}

/// Forced parents from the fix registry.
pub struct OverrideRule;

impl ResolutionRule for OverrideRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Override
    }

    fn apply(
        &self,
        ctx: &RuleContext<'_>,
        concept: &Concept,
        proposal: &mut Proposal,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(forced) = ctx.fixes.forced_parent(&concept.id) else {
            return;
        };

        let discarded = match (forced, &proposal.broader) {
            (ParentOverride::Parent(parent), Some(candidate)) if candidate.id == *parent => None,
            (_, candidate) => candidate.clone(),
        };
        if let Some(candidate) = discarded {
            diagnostics.push(
                DiagnosticKind::OverriddenProposal,
                Some(&concept.id),
                format!(
                    "override discards broader {} proposed by {}",
                    candidate.id, candidate.rule
                ),
            );
        }

        match forced {
            ParentOverride::Parent(parent) if ctx.store.contains(parent) => {
                proposal.propose_broader(&concept.id, parent, self.kind());
            }
            ParentOverride::Parent(parent) => {
                proposal.broader = None;
                let error = Error::UnresolvedReference {
                    subject: concept.id.clone(),
                    reference: parent.clone(),
                };
                if let Err(e) = diagnostics.record_error(Some(&concept.id), error) {
                    tracing::error!("{}", e);
                }
            }
            ParentOverride::NoParent => proposal.broader = None,
        }
    }
}

/// Result of a resolution pass.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub relations: RelationSet,
    /// Rule that settled the broader slot, per concept with a broader edge.
    pub decisions: BTreeMap<String, RuleKind>,
}

impl Resolution {
    /// Concepts with a broader edge, in document order.
    #[must_use]
    pub fn tuning_report(&self, store: &ConceptStore) -> TuningReport {
        let entries = store
            .iter()
            .filter_map(|c| {
                let broader = self.relations.broader_of(&c.id)?;
                let decided_by = *self.decisions.get(&c.id)?;
                Some((c.id.clone(), broader.to_string(), decided_by))
            })
            .enumerate()
            .map(|(i, (concept_id, broader_id, decided_by))| TuningEntry {
                ordinal: i + 1,
                concept_id,
                broader_id,
                decided_by,
            })
            .collect();

        TuningReport { entries }
    }
}

pub struct RelationshipResolver {
    rules: Vec<Box<dyn ResolutionRule>>,
    config: ResolverConfig,
}

impl RelationshipResolver {
    /// Resolver with the four standard rules.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self::empty(config)
            .with_rule(Box::new(AnnotationRule))
            .with_rule(Box::new(LabelSeparatorRule))
            .with_rule(Box::new(DescriptionContainmentRule))
            .with_rule(Box::new(OverrideRule))
    }

    #[must_use]
    pub fn empty(config: ResolverConfig) -> Self {
        Self {
            rules: Vec::new(),
            config,
        }
    }

    /// Adds a rule, keeping the pipeline sorted by priority. Rules of equal
    /// priority run in insertion order.
    #[must_use]
    pub fn with_rule(mut self, rule: Box<dyn ResolutionRule>) -> Self {
        self.rules.push(rule);
        self.rules.sort_by_key(|r| r.kind().priority());
        self
    }

    pub fn rule_order(&self) -> Vec<RuleKind> {
        self.rules.iter().map(|r| r.kind()).collect()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolve(
        &self,
        store: &ConceptStore,
        fixes: &FixRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Resolution {
        let ctx = RuleContext {
            store,
            fixes,
            config: &self.config,
        };

        let proposals: Vec<(&Concept, Proposal)> = store
            .iter()
            .map(|concept| {
                let mut proposal = Proposal::default();
                for rule in &self.rules {
                    rule.apply(&ctx, concept, &mut proposal, diagnostics);
                }
                (concept, proposal)
            })
            .collect();

        let mut resolution = Resolution::default();

        for (concept, proposal) in &proposals {
            if let Some(candidate) = &proposal.broader {
                insert_checked(
                    &mut resolution.relations,
                    diagnostics,
                    &concept.id,
                    Predicate::Broader,
                    &candidate.id,
                );
                resolution
                    .decisions
                    .insert(concept.id.clone(), candidate.rule);
            }
        }

        for (concept, proposal) in &proposals {
            let broader = resolution.relations.broader_of(&concept.id).map(str::to_string);
            for related in &proposal.related {
                if broader.as_deref() == Some(related.as_str()) {
                    continue;
                }
                if self.config.include_narrower
                    && resolution.relations.broader_of(related) == Some(concept.id.as_str())
                {
                    continue;
                }
                insert_checked(
                    &mut resolution.relations,
                    diagnostics,
                    &concept.id,
                    Predicate::Related,
                    related,
                );
            }
        }

        if self.config.include_narrower {
            let narrower: Vec<Relation> = resolution
                .relations
                .with_predicate(Predicate::Broader)
                .filter_map(Relation::inverse)
                .collect();
            resolution.relations.extend(narrower);
        }

        tracing::info!(
            "Resolved {} relations ({} broader)",
            resolution.relations.len(),
            resolution.decisions.len()
        );

        resolution
    }
}

impl Default for RelationshipResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

fn insert_checked(
    relations: &mut RelationSet,
    diagnostics: &mut Diagnostics,
    subject: &str,
    predicate: Predicate,
    object: &str,
) {
    match Relation::new(subject, predicate, object) {
        Ok(relation) => {
            relations.insert(relation);
        }
        Err(e) => {
            if let Err(e) = diagnostics.record_error(Some(subject), e) {
                tracing::warn!("Skipping invalid relation: {}", e);
            }
        }
    }
}
