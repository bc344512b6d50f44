//! Offline checks for grammar authors.
//!
//! None of these run while parsing, and none of them fail: each check returns a list of
//! [`Finding`]s and leaves it to the caller to decide what matters. A grammar that is
//! deliberately partial (a delta checked without its ancestors, say) is expected to produce
//! `UndefinedNonterminal` findings.
//!
//! The checks:
//!
//! * [`check_well_formed`] -- nonterminals used on a right-hand side but never defined.
//! * [`check_reachability`] -- defined nonterminals that the start symbol can never derive.
//! * [`check_vocabulary`] -- terminals that are not known instruction kinds.
//! * [`check_lineage`] -- rules of an ancestor grammar missing from a descendant.
//! * [`check_review`] -- rules a delta flagged as tentative or pending a fix.
//!
//! [`Validator`] runs any combination of them over a [`Grammar`].

use crate::bitmat::Bitmat;
use crate::ramp_table::RampTable;
use crate::registry::{ReviewNote, RuleRegistry};
use crate::warshall::reflexive_transitive_closure;
use crate::{Grammar, Production, RuleId, Symbol, Var};
use core::fmt;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Finding {
    /// Used on some right-hand side, but no rule defines it.
    UndefinedNonterminal(Symbol),
    /// Defined, but not derivable from the start symbol.
    UnreachableNonterminal(Symbol),
    /// Neither a known instruction kind nor one after removing templated suffixes. Holds the
    /// name with suffixes removed.
    UnknownTerminal(String),
    /// An ancestor has this rule and the checked grammar does not.
    RemovedProduction {
        ancestor: String,
        production: Production,
    },
    TentativeProduction {
        production: Production,
        note: ReviewNote,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::UndefinedNonterminal(sym) => {
                write!(fmt, "nonterminal `{}` is used but never defined", sym)
            }
            Finding::UnreachableNonterminal(sym) => {
                write!(fmt, "nonterminal `{}` is not reachable from the start symbol", sym)
            }
            Finding::UnknownTerminal(name) => {
                write!(fmt, "terminal `{}` is not a known instruction kind", name)
            }
            Finding::RemovedProduction {
                ancestor,
                production,
            } => write!(fmt, "rule `{}` from version {} is missing", production, ancestor),
            Finding::TentativeProduction { production, note } => {
                write!(fmt, "rule `{}` needs review: {}", production, note)
            }
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Report {
    findings: Vec<Finding>,
}

impl Report {
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn unknown_terminals(&self) -> Vec<&str> {
        self.findings
            .iter()
            .filter_map(|f| match f {
                Finding::UnknownTerminal(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn undefined_nonterminals(&self) -> Vec<&Symbol> {
        self.findings
            .iter()
            .filter_map(|f| match f {
                Finding::UndefinedNonterminal(sym) => Some(sym),
                _ => None,
            })
            .collect()
    }

    /// Writes every finding to the log as a warning.
    pub fn log(&self, title: &str) {
        for finding in self.findings.iter() {
            warn!("{}: {}", title, finding);
        }
    }
}

impl Extend<Finding> for Report {
    fn extend<T: IntoIterator<Item = Finding>>(&mut self, iter: T) {
        self.findings.extend(iter);
    }
}

// Arity suffixes (`CALL_FUNCTION_3`) and continuation markers (`JUMP_BACK_CONT`) are stripped,
// in this order, before a terminal is looked up.
static DEFAULT_TEMPLATES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"_\d+$").unwrap(),
        Regex::new(r"_CONT$").unwrap(),
    ]
});

/// The instruction kinds known for a version, and the naming patterns that derive further
/// terminal names from them.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    kinds: HashSet<String>,
    templates: Vec<Regex>,
}

impl Vocabulary {
    /// Uses the default templates: a trailing `_<digits>`, then a trailing `_CONT`.
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
            templates: DEFAULT_TEMPLATES.clone(),
        }
    }

    /// Replaces the templates. Each pattern's match is removed from a terminal name, in order,
    /// before the name is looked up again.
    pub fn with_templates(mut self, templates: Vec<Regex>) -> Self {
        self.templates = templates;
        self
    }

    pub fn extend<I, S>(&mut self, kinds: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds.extend(kinds.into_iter().map(Into::into));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains(kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// `None` if `terminal` is known, directly or after stripping; otherwise the stripped name.
    pub fn residual(&self, terminal: &str) -> Option<String> {
        if self.contains(terminal) {
            return None;
        }
        let mut name = terminal.to_string();
        for template in self.templates.iter() {
            name = template.replace(&name, "").into_owned();
        }
        if self.contains(&name) {
            None
        } else {
            Some(name)
        }
    }
}

/// The symbol sets of a registry.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GrammarSets {
    pub lhs: BTreeSet<Symbol>,
    pub rhs: BTreeSet<Symbol>,
    pub terminals: BTreeSet<Symbol>,
    pub right_recursive: Vec<Production>,
}

pub fn grammar_sets(registry: &RuleRegistry) -> GrammarSets {
    let mut sets = GrammarSets::default();
    for production in registry.iter() {
        sets.lhs.insert(production.lhs().clone());
        for sym in production.rhs() {
            sets.rhs.insert(sym.clone());
            if sym.is_terminal() {
                sets.terminals.insert(sym.clone());
            }
        }
        if production.is_right_recursive() {
            sets.right_recursive.push(production.clone());
        }
    }
    sets
}

/// Reports every nonterminal that appears on a right-hand side without being defined, in order
/// of first appearance.
pub fn check_well_formed(registry: &RuleRegistry) -> Vec<Finding> {
    let mut seen: HashSet<&Symbol> = HashSet::new();
    let mut findings = Vec::new();
    for production in registry.iter() {
        for sym in production.rhs() {
            if sym.is_nonterminal() && !registry.defines(sym.as_str()) && seen.insert(sym) {
                findings.push(Finding::UndefinedNonterminal(sym.clone()));
            }
        }
    }
    findings
}

/// Reports every defined nonterminal that `start` cannot derive.
///
/// Builds the "can derive" relation between nonterminals (A -> B when B is on the right-hand
/// side of a rule for A), takes its reflexive transitive closure, and reads off the row for
/// `start`.
pub fn check_reachability(registry: &RuleRegistry, start: &Symbol) -> Vec<Finding> {
    let vars = registry.lhs_symbols();
    let nvars = vars.len();
    let var_of: HashMap<&str, Var> = vars
        .iter()
        .enumerate()
        .map(|(i, sym)| (sym.as_str(), Var::from(i)))
        .collect();

    // Contains Var -> [RuleId]
    let mut derives: RampTable<RuleId> = RampTable::new();
    for sym in vars.iter() {
        derives.push_entry(registry.rule_ids_for(sym.as_str()).iter().copied());
    }
    debug!(
        "derives: {} nonterminals, {} rules",
        derives.num_keys(),
        derives.num_values()
    );

    let mut relation = Bitmat::new(nvars, nvars);
    for (row, rules) in derives.iter_values().enumerate() {
        for &rule in rules {
            for sym in registry.rule(rule).rhs() {
                if let Some(&var) = var_of.get(sym.as_str()) {
                    relation.set(row, var.index());
                }
            }
        }
    }
    reflexive_transitive_closure(&mut relation);
    debug!("derives closure: {:?}", relation);

    let reachable: HashSet<usize> = match var_of.get(start.as_str()) {
        Some(var) => relation.iter_ones_in_row(var.index()).collect(),
        None => HashSet::new(),
    };

    vars.iter()
        .enumerate()
        .filter(|(i, _)| !reachable.contains(i))
        .map(|(_, sym)| Finding::UnreachableNonterminal(sym.clone()))
        .collect()
}

/// Reports the terminals of `registry` that `vocabulary` does not account for, once per
/// stripped name, in order of first appearance.
pub fn check_vocabulary(registry: &RuleRegistry, vocabulary: &Vocabulary) -> Vec<Finding> {
    let mut checked: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<String> = HashSet::new();
    let mut findings = Vec::new();
    for production in registry.iter() {
        for sym in production.rhs() {
            if !sym.is_terminal() || !checked.insert(sym.as_str()) {
                continue;
            }
            if let Some(residual) = vocabulary.residual(sym.as_str()) {
                if reported.insert(residual.clone()) {
                    findings.push(Finding::UnknownTerminal(residual));
                }
            }
        }
    }
    findings
}

/// Reports every rule of `ancestor` that `registry` lacks.
pub fn check_additive(ancestor: &Grammar, registry: &RuleRegistry) -> Vec<Finding> {
    ancestor
        .registry()
        .iter()
        .filter(|p| !registry.contains(p))
        .map(|p| Finding::RemovedProduction {
            ancestor: ancestor.version().to_string(),
            production: p.clone(),
        })
        .collect()
}

/// Runs [`check_additive`] against every ancestor of `grammar`.
pub fn check_lineage(grammar: &Grammar) -> Vec<Finding> {
    grammar
        .ancestors()
        .flat_map(|ancestor| check_additive(ancestor, grammar.registry()))
        .collect()
}

pub fn check_review(registry: &RuleRegistry) -> Vec<Finding> {
    registry
        .review_notes()
        .map(|(production, note)| Finding::TentativeProduction {
            production: production.clone(),
            note: note.clone(),
        })
        .collect()
}

/// Runs a selection of checks over a grammar. By default everything except the vocabulary
/// check runs; that one needs a [`Vocabulary`].
pub struct Validator<'a> {
    well_formed: bool,
    reachability: bool,
    lineage: bool,
    review: bool,
    vocabulary: Option<&'a Vocabulary>,
}

impl<'a> Default for Validator<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Validator<'a> {
    pub fn new() -> Self {
        Self {
            well_formed: true,
            reachability: true,
            lineage: true,
            review: true,
            vocabulary: None,
        }
    }

    /// Only the vocabulary check.
    pub fn coverage_only(vocabulary: &'a Vocabulary) -> Self {
        Self {
            well_formed: false,
            reachability: false,
            lineage: false,
            review: false,
            vocabulary: Some(vocabulary),
        }
    }

    pub fn with_vocabulary(mut self, vocabulary: &'a Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn well_formed(mut self, enabled: bool) -> Self {
        self.well_formed = enabled;
        self
    }

    pub fn reachability(mut self, enabled: bool) -> Self {
        self.reachability = enabled;
        self
    }

    pub fn lineage(mut self, enabled: bool) -> Self {
        self.lineage = enabled;
        self
    }

    pub fn review(mut self, enabled: bool) -> Self {
        self.review = enabled;
        self
    }

    /// Reachability is only checked when the grammar has a start symbol.
    pub fn validate(&self, grammar: &Grammar) -> Report {
        let registry = grammar.registry();
        let mut report = Report::default();
        if self.well_formed {
            report.extend(check_well_formed(registry));
        }
        if self.reachability {
            if let Some(start) = grammar.start() {
                report.extend(check_reachability(registry, start));
            }
        }
        if let Some(vocabulary) = self.vocabulary {
            report.extend(check_vocabulary(registry, vocabulary));
        }
        if self.lineage {
            report.extend(check_lineage(grammar));
        }
        if self.review {
            report.extend(check_review(registry));
        }
        debug!(
            "validated grammar {}: {} findings",
            grammar.version(),
            report.len()
        );
        report
    }
}
