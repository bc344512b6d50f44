// Defines a grammar.  A grammar has these elements:
//
//     * a version identifier
//     * a registry of rules, in the form A ::= B C ... , where A is a nonterminal and B and C
//       are any combination of terminals (instruction kinds) or nonterminals
//     * (optional) a start symbol
//     * (optional) the grammar it was composed from
//
// A grammar is never modified after it is built. Composing a new version copies the parent's
// registry and applies a delta on top; the parent is left as it was, and the child keeps a
// reference to it.

use crate::errors::Result;
use crate::reader::{read_delta, Delta};
use crate::registry::RuleRegistry;
use crate::{Production, Symbol};
use log::debug;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Grammar {
    version: String,
    registry: RuleRegistry,
    start: Option<Symbol>,
    parent: Option<Arc<Grammar>>,
}

impl Grammar {
    /// A grammar with no rules and no parent.
    pub fn empty(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            registry: RuleRegistry::new(),
            start: None,
            parent: None,
        }
    }

    /// The root of a version chain: just the rules of `delta`.
    pub fn from_delta(version: impl Into<String>, delta: &Delta) -> Self {
        let mut grammar = Self::empty(version);
        delta.apply(&mut grammar.registry);
        grammar.registry.dump(&grammar.version);
        grammar
    }

    pub fn with_start(mut self, start: impl Into<Symbol>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Reads `delta_text` and composes it onto `base`. Nothing is built if the text is
    /// malformed.
    pub fn compose(
        base: &Arc<Grammar>,
        version: impl Into<String>,
        delta_text: &str,
    ) -> Result<Grammar> {
        let delta = read_delta(delta_text)?;
        Ok(Self::compose_delta(base, version, &delta))
    }

    /// The rules of `base` plus the rules of `delta`. The start symbol is inherited.
    pub fn compose_delta(
        base: &Arc<Grammar>,
        version: impl Into<String>,
        delta: &Delta,
    ) -> Grammar {
        let version = version.into();
        let mut registry = base.registry.clone();
        let added = delta.apply(&mut registry);
        debug!(
            "composed {} onto {}: {} of {} delta rules are new, {} rules in all",
            version,
            base.version,
            added,
            delta.len(),
            registry.len()
        );
        Grammar {
            version,
            registry,
            start: base.start.clone(),
            parent: Some(Arc::clone(base)),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn start(&self) -> Option<&Symbol> {
        self.start.as_ref()
    }

    pub fn parent(&self) -> Option<&Arc<Grammar>> {
        self.parent.as_ref()
    }

    /// Parent, grandparent, and so on, up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &Grammar> {
        let mut next = self.parent.as_deref();
        core::iter::from_fn(move || {
            let current = next?;
            next = current.parent.as_deref();
            Some(current)
        })
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, production: &Production) -> bool {
        self.registry.contains(production)
    }

    pub fn alternatives<'a>(&'a self, lhs: &str) -> impl Iterator<Item = &'a Production> + 'a {
        self.registry.alternatives(lhs)
    }

    pub fn rule_to_str(&self, production: &Production) -> String {
        match self.registry.id_of(production) {
            Some(id) => format!("(r{}) {}", id, production),
            None => format!("(r?) {}", production),
        }
    }
}
