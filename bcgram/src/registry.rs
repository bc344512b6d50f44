//! The deduplicated rule store underneath every grammar.
//!
//! Rules are numbered in insertion order and stored in a single vector. Two indexes sit on top
//! of it: the structural signature table (production -> rule id), which is what makes insertion
//! idempotent, and the derives table (lhs -> rule ids), which groups alternatives by their
//! left-hand side.

use crate::errors::{GrammarError, Result};
use crate::{Production, RuleId, Symbol};
use core::fmt;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Why a grammar author should take another look at a rule.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ReviewKind {
    /// The rule may belong to a different version than the one that declares it.
    Tentative,
    /// The rule, or one it interacts with, is expected to change.
    Fixme,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ReviewNote {
    pub kind: ReviewKind,
    pub note: String,
}

impl fmt::Display for ReviewNote {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            ReviewKind::Tentative => "tentative",
            ReviewKind::Fixme => "fixme",
        };
        if self.note.is_empty() {
            write!(fmt, "[{}]", tag)
        } else {
            write!(fmt, "[{}] {}", tag, self.note)
        }
    }
}

/// The result of inserting a production.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Insertion {
    Added(RuleId),
    Present(RuleId),
}

impl Insertion {
    pub fn id(self) -> RuleId {
        match self {
            Insertion::Added(id) | Insertion::Present(id) => id,
        }
    }

    pub fn is_added(self) -> bool {
        matches!(self, Insertion::Added(_))
    }
}

#[derive(Clone, Default)]
pub struct RuleRegistry {
    /// index = RuleId
    rules: Vec<Production>,

    /// Semantic label of each rule, if one was asserted. index = RuleId
    labels: Vec<Option<Arc<str>>>,

    signatures: HashMap<Production, RuleId>,

    /// Contains lhs -> [RuleId], in insertion order.
    derives: HashMap<Symbol, Vec<RuleId>>,

    /// Left-hand sides, in the order they were first seen.
    lhs_order: Vec<Symbol>,

    review: BTreeMap<RuleId, ReviewNote>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of rules (productions)
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Adds `production`, unless a structurally identical one is already present.
    pub fn insert(&mut self, production: Production) -> Insertion {
        if let Some(&id) = self.signatures.get(&production) {
            return Insertion::Present(id);
        }

        let id = RuleId::from(self.rules.len());
        let lhs = production.lhs().clone();
        match self.derives.get_mut(&lhs) {
            Some(ids) => ids.push(id),
            None => {
                self.derives.insert(lhs.clone(), vec![id]);
                self.lhs_order.push(lhs);
            }
        }
        self.signatures.insert(production.clone(), id);
        self.rules.push(production);
        self.labels.push(None);
        Insertion::Added(id)
    }

    /// Like [`insert`](Self::insert), but also asserts what the rule means.
    ///
    /// Re-inserting a rule with the label it already has, or with no label, is a no-op. A
    /// label on a previously unlabelled rule is recorded. A *different* label on an existing
    /// rule is a `DuplicateAmbiguousRule` error, and the registry is left unchanged.
    pub fn insert_labeled(
        &mut self,
        production: Production,
        label: Option<&str>,
    ) -> Result<Insertion> {
        self.check_label(&production, label)?;
        Ok(self.insert_with_label(production, label.map(Arc::from)))
    }

    /// Inserts without checking for a conflicting label; an existing label is kept.
    pub(crate) fn insert_with_label(
        &mut self,
        production: Production,
        label: Option<Arc<str>>,
    ) -> Insertion {
        let insertion = self.insert(production);
        if let Some(label) = label {
            let slot = &mut self.labels[insertion.id().index()];
            if slot.is_none() {
                *slot = Some(label);
            }
        }
        insertion
    }

    /// Fails if `production` is already registered under a label other than `label`.
    pub fn check_label(&self, production: &Production, label: Option<&str>) -> Result<()> {
        let label = match label {
            Some(label) => label,
            None => return Ok(()),
        };
        match self.label(production) {
            Some(existing) if existing != label => Err(GrammarError::DuplicateAmbiguousRule {
                production: production.clone(),
                existing: existing.to_string(),
                conflicting: label.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn contains(&self, production: &Production) -> bool {
        self.signatures.contains_key(production)
    }

    pub fn id_of(&self, production: &Production) -> Option<RuleId> {
        self.signatures.get(production).copied()
    }

    pub fn rule(&self, id: RuleId) -> &Production {
        &self.rules[id.index()]
    }

    pub fn label(&self, production: &Production) -> Option<&str> {
        let id = self.id_of(production)?;
        self.labels[id.index()].as_deref()
    }

    /// All rules, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Production> {
        self.rules.iter()
    }

    /// The alternatives for `lhs`, in insertion order.
    pub fn alternatives<'a>(&'a self, lhs: &str) -> impl Iterator<Item = &'a Production> + 'a {
        self.derives
            .get(lhs)
            .into_iter()
            .flat_map(move |ids| ids.iter().map(move |&id| &self.rules[id.index()]))
    }

    pub fn rule_ids_for(&self, lhs: &str) -> &[RuleId] {
        self.derives.get(lhs).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    pub fn defines(&self, lhs: &str) -> bool {
        self.derives.contains_key(lhs)
    }

    /// The left-hand sides, in the order they were first seen.
    pub fn lhs_symbols(&self) -> &[Symbol] {
        &self.lhs_order
    }

    /// Attaches a review note to a rule. The first note wins.
    pub fn annotate(&mut self, id: RuleId, note: ReviewNote) {
        self.review.entry(id).or_insert(note);
    }

    pub fn review_note(&self, production: &Production) -> Option<&ReviewNote> {
        self.review.get(&self.id_of(production)?)
    }

    pub fn review_notes(&self) -> impl Iterator<Item = (&Production, &ReviewNote)> {
        self.review.iter().map(move |(id, note)| (&self.rules[id.index()], note))
    }

    /// Set union with `other`, carrying its labels and review notes along. Returns the number
    /// of rules that were new. Label conflicts are checked before anything is inserted.
    pub fn merge(&mut self, other: &RuleRegistry) -> Result<usize> {
        for (production, label) in other.rules.iter().zip(other.labels.iter()) {
            self.check_label(production, label.as_deref())?;
        }

        let mut added = 0;
        for (i, production) in other.rules.iter().enumerate() {
            let insertion = self.insert_with_label(production.clone(), other.labels[i].clone());
            if insertion.is_added() {
                added += 1;
            }
            if let Some(note) = other.review.get(&RuleId::from(i)) {
                self.annotate(insertion.id(), note.clone());
            }
        }
        Ok(added)
    }

    /// True if both registries hold the same set of rules, regardless of insertion order.
    pub fn same_rules(&self, other: &RuleRegistry) -> bool {
        self.len() == other.len() && self.rules.iter().all(|p| other.contains(p))
    }

    pub fn dump(&self, title: &str) {
        debug!("{}: {} rules, {} left-hand sides", title, self.len(), self.lhs_order.len());
        for (i, p) in self.rules.iter().enumerate() {
            match (&self.labels[i], self.review.get(&RuleId::from(i))) {
                (Some(label), _) => debug!("    [r{:-4}] {}    => {}", i, p, label),
                (None, Some(note)) => debug!("    [r{:-4}] {}    {}", i, p, note),
                (None, None) => debug!("    [r{:-4}] {}", i, p),
            }
        }
    }
}

impl PartialEq for RuleRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.same_rules(other)
    }
}

impl Eq for RuleRegistry {}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_list().entries(self.rules.iter()).finish()
    }
}

impl Extend<Production> for RuleRegistry {
    fn extend<T: IntoIterator<Item = Production>>(&mut self, iter: T) {
        for p in iter {
            self.insert(p);
        }
    }
}

impl core::iter::FromIterator<Production> for RuleRegistry {
    fn from_iter<T: IntoIterator<Item = Production>>(iter: T) -> Self {
        let mut registry = RuleRegistry::new();
        registry.extend(iter);
        registry
    }
}
