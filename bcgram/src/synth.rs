//! Rules synthesized from the instruction stream.
//!
//! Some constructs cannot be covered by a finite, hand-written grammar: `BUILD_STRING 3` needs a
//! rule with three children, `BUILD_STRING 7` one with seven. Rather than enumerating every
//! count, each version layer declares [`Trigger`]s, and a [`SynthesisSession`] expands them for
//! the instructions that actually occur in one stream.
//!
//! A session is an overlay on a shared, immutable [`Grammar`]. It holds only the rules the
//! grammar did not already have, and it is meant to be dropped once its stream has been parsed.

use crate::errors::{GrammarError, Result};
use crate::registry::RuleRegistry;
use crate::{Grammar, Production, Symbol};
use bcgram_runtime::{bcgram_log, Instruction};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Which instruction kinds a trigger responds to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KindMatch {
    Exact(String),
    /// Any kind starting with the prefix, e.g. `CALL_FUNCTION_KW` matches `CALL_FUNCTION_KW_2`.
    Prefix(String),
}

impl KindMatch {
    pub fn exact(kind: &str) -> Self {
        KindMatch::Exact(kind.to_string())
    }

    pub fn prefix(prefix: &str) -> Self {
        KindMatch::Prefix(prefix.to_string())
    }

    pub fn matches(&self, kind: &str) -> bool {
        match self {
            KindMatch::Exact(k) => k == kind,
            KindMatch::Prefix(p) => kind.starts_with(p.as_str()),
        }
    }
}

/// `family_N ::= child × N KIND`, closed by `alias ::= family_N`.
///
/// One family member is made per distinct count, however many instructions use it. The
/// companions are fixed rules the family depends on; they are added along with the first member.
#[derive(Clone, Debug)]
pub struct ArityFamily {
    pub prefix: String,
    pub child: Symbol,
    pub alias: Symbol,
    pub companions: Vec<Production>,
}

impl ArityFamily {
    pub fn new(prefix: &str, child: &str, alias: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            child: Symbol::new(child),
            alias: Symbol::new(alias),
            companions: Vec::new(),
        }
    }

    pub fn with_companions(mut self, companions: Vec<Production>) -> Self {
        self.companions = companions;
        self
    }

    pub fn family_name(&self, count: usize) -> Symbol {
        Symbol::with_count(&self.prefix, count)
    }

    pub fn family_rule(&self, count: usize, terminal: &Symbol) -> Production {
        let rhs = core::iter::repeat(self.child.clone())
            .take(count)
            .chain(core::iter::once(terminal.clone()));
        Production::new(self.family_name(count), rhs)
    }

    pub fn closing_rule(&self, count: usize) -> Production {
        Production::new(self.alias.clone(), vec![self.family_name(count)])
    }
}

/// `pack ::= value × N names` and `call ::= callee... pack KIND`, for instructions whose
/// operand counts keyword arguments.
#[derive(Clone, Debug)]
pub struct KeywordPack {
    pub pack: Symbol,
    pub value: Symbol,
    pub names: Symbol,
    pub call: Symbol,
    pub callee: Vec<Symbol>,
}

impl KeywordPack {
    /// The callee defaults to a single `expr`.
    pub fn new(pack: &str, value: &str, names: &str, call: &str) -> Self {
        Self {
            pack: Symbol::new(pack),
            value: Symbol::new(value),
            names: Symbol::new(names),
            call: Symbol::new(call),
            callee: vec![Symbol::new("expr")],
        }
    }

    pub fn with_callee(mut self, callee: &[&str]) -> Self {
        self.callee = callee.iter().map(|&s| Symbol::new(s)).collect();
        self
    }

    pub fn pack_rule(&self, count: usize) -> Production {
        let rhs = core::iter::repeat(self.value.clone())
            .take(count)
            .chain(core::iter::once(self.names.clone()));
        Production::new(self.pack.clone(), rhs)
    }

    pub fn call_rule(&self, terminal: &Symbol) -> Production {
        let rhs = self
            .callee
            .iter()
            .cloned()
            .chain(core::iter::once(self.pack.clone()))
            .chain(core::iter::once(terminal.clone()));
        Production::new(self.call.clone(), rhs)
    }
}

#[derive(Clone, Debug)]
pub enum Template {
    /// The same rules whatever the operand; added on first sight of the kind.
    Fixed(Vec<Production>),
    ArityFamily(ArityFamily),
    KeywordPack(KeywordPack),
}

impl Template {
    /// Whether the rules depend on the instruction's count operand.
    pub fn needs_operand(&self) -> bool {
        !matches!(self, Template::Fixed(_))
    }

    /// The rules for one instruction of kind `terminal`. The flag marks the principal rules,
    /// which are the ones a trigger's label applies to.
    pub fn expand(&self, terminal: &Symbol, count: Option<usize>) -> Vec<(Production, bool)> {
        let count = count.unwrap_or(0);
        match self {
            Template::Fixed(rules) => rules.iter().map(|p| (p.clone(), true)).collect(),
            Template::ArityFamily(family) => {
                let mut rules = vec![
                    (family.family_rule(count, terminal), true),
                    (family.closing_rule(count), false),
                ];
                rules.extend(family.companions.iter().map(|p| (p.clone(), false)));
                rules
            }
            Template::KeywordPack(pack) => vec![
                (pack.call_rule(terminal), true),
                (pack.pack_rule(count), true),
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Trigger {
    kinds: KindMatch,
    template: Template,
    label: Option<String>,
}

impl Trigger {
    pub fn new(kinds: KindMatch, template: Template) -> Self {
        Self {
            kinds,
            template,
            label: None,
        }
    }

    pub fn fixed(kind: &str, rules: Vec<Production>) -> Self {
        Self::new(KindMatch::exact(kind), Template::Fixed(rules))
    }

    pub fn arity_family(kinds: KindMatch, family: ArityFamily) -> Self {
        Self::new(kinds, Template::ArityFamily(family))
    }

    pub fn keyword_pack(kinds: KindMatch, pack: KeywordPack) -> Self {
        Self::new(kinds, Template::KeywordPack(pack))
    }

    /// Names what the principal rules of this trigger mean. Two triggers that make the same
    /// rule with different labels are in conflict.
    pub fn labeled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn kinds(&self) -> &KindMatch {
        &self.kinds
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// An ordered set of triggers. For any instruction kind, the first matching trigger wins.
#[derive(Clone, Debug, Default)]
pub struct Synthesizer {
    triggers: Arc<Vec<Trigger>>,
}

impl Synthesizer {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        Self {
            triggers: Arc::new(triggers),
        }
    }

    /// `own` triggers first, then everything from `parent`. A layer overrides its parent for a
    /// kind simply by matching it.
    pub fn layered(own: &[Trigger], parent: &Synthesizer) -> Self {
        let triggers = own
            .iter()
            .chain(parent.triggers.iter())
            .cloned()
            .collect();
        Self::new(triggers)
    }

    pub fn trigger_for(&self, kind: &str) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.kinds.matches(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

/// Instruction kind -> operand counts already expanded (`None` for fixed triggers).
pub type Customized = BTreeMap<String, BTreeSet<Option<usize>>>;

/// The per-parse synthesis layer.
pub struct SynthesisSession {
    grammar: Arc<Grammar>,
    synthesizer: Synthesizer,

    /// Rules made by this session that the grammar does not have.
    added: RuleRegistry,

    /// Labels this session asserted on rules the grammar already had.
    asserted: HashMap<Production, String>,

    customized: Customized,
}

impl SynthesisSession {
    pub fn new(grammar: Arc<Grammar>, synthesizer: Synthesizer) -> Self {
        Self {
            grammar,
            synthesizer,
            added: RuleRegistry::new(),
            asserted: HashMap::new(),
            customized: Customized::new(),
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Expands every trigger in `tokens`. Returns the number of rules added.
    ///
    /// All or nothing: if any instruction fails, the session is left as it was before the
    /// call.
    pub fn synthesize(&mut self, tokens: &[Instruction]) -> Result<usize> {
        let saved = (
            self.added.clone(),
            self.asserted.clone(),
            self.customized.clone(),
        );
        let mut added = 0;
        for (position, token) in tokens.iter().enumerate() {
            match self.observe(position, token, tokens.len()) {
                Ok(n) => added += n,
                Err(e) => {
                    let (rules, asserted, customized) = saved;
                    self.added = rules;
                    self.asserted = asserted;
                    self.customized = customized;
                    return Err(e);
                }
            }
        }
        bcgram_log!(
            "synthesized {} rules from {} tokens ({} rules in all)",
            added,
            tokens.len(),
            self.rule_count()
        );
        Ok(added)
    }

    /// Expands the trigger for one instruction, if there is one. Returns the number of rules
    /// added. Instructions that match no trigger are ignored.
    ///
    /// `stream_len` is the length of the stream `token` belongs to. A rule with N children
    /// spans at least N + 1 tokens, so a count above `stream_len` can never be parsed and is
    /// rejected as `ArityOutOfRange`.
    pub fn observe(
        &mut self,
        position: usize,
        token: &Instruction,
        stream_len: usize,
    ) -> Result<usize> {
        let synthesizer = self.synthesizer.clone();
        let trigger = match synthesizer.trigger_for(&token.kind) {
            Some(trigger) => trigger,
            None => return Ok(0),
        };

        let count = if trigger.template.needs_operand() {
            match token.arity() {
                Some(n) => Some(n),
                None => {
                    return Err(GrammarError::MissingOperand {
                        position,
                        kind: token.kind.clone(),
                    })
                }
            }
        } else {
            None
        };

        let seen = self
            .customized
            .get(&token.kind)
            .map_or(false, |counts| counts.contains(&count));
        if seen {
            return Ok(0);
        }
        if let Some(n) = count {
            if n > stream_len {
                return Err(GrammarError::ArityOutOfRange {
                    position,
                    kind: token.kind.clone(),
                    count: n,
                });
            }
        }

        let rules = trigger.template.expand(&Symbol::new(&token.kind), count);
        let added = self.commit(&rules, trigger.label())?;
        self.customized
            .entry(token.kind.clone())
            .or_default()
            .insert(count);
        Ok(added)
    }

    /// Adds a batch of rules. Label conflicts are checked for the whole batch before anything
    /// is added.
    fn commit(&mut self, rules: &[(Production, bool)], label: Option<&str>) -> Result<usize> {
        for (production, principal) in rules.iter() {
            let label = if *principal { label } else { None };
            self.grammar.registry().check_label(production, label)?;
            self.added.check_label(production, label)?;
            if let (Some(label), Some(existing)) = (label, self.asserted.get(production)) {
                if existing != label {
                    return Err(GrammarError::DuplicateAmbiguousRule {
                        production: production.clone(),
                        existing: existing.clone(),
                        conflicting: label.to_string(),
                    });
                }
            }
        }

        let mut added = 0;
        for (production, principal) in rules.iter() {
            let label = if *principal { label } else { None };
            if self.grammar.contains(production) {
                if let Some(label) = label {
                    self.asserted
                        .entry(production.clone())
                        .or_insert_with(|| label.to_string());
                }
                continue;
            }
            if self.added.insert_labeled(production.clone(), label)?.is_added() {
                bcgram_log!("synthesized {}", production);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Rules in the grammar plus rules added by this session.
    pub fn rule_count(&self) -> usize {
        self.grammar.len() + self.added.len()
    }

    /// Only the rules this session added.
    pub fn added(&self) -> &RuleRegistry {
        &self.added
    }

    pub fn customized(&self) -> &Customized {
        &self.customized
    }

    pub fn contains(&self, production: &Production) -> bool {
        self.grammar.contains(production) || self.added.contains(production)
    }

    pub fn alternatives<'a>(&'a self, lhs: &'a str) -> impl Iterator<Item = &'a Production> + 'a {
        self.grammar
            .alternatives(lhs)
            .chain(self.added.alternatives(lhs))
    }

    /// A standalone registry with the grammar's rules followed by this session's.
    pub fn registry(&self) -> RuleRegistry {
        let mut registry = self.grammar.registry().clone();
        for production in self.added.iter() {
            let label = self.added.label(production).map(Arc::from);
            registry.insert_with_label(production.clone(), label);
        }
        registry
    }

    pub fn into_registry(self) -> RuleRegistry {
        self.registry()
    }
}
