//! The hand-off to a parsing engine.
//!
//! This crate builds grammars; it does not parse. Anything that can take a rule registry and an
//! instruction stream and produce a derivation (an Earley parser, a GLR parser, a table-driven
//! LR parser generated from the registry) plugs in through [`ParseEngine`].

use crate::errors::ParseError;
use crate::registry::RuleRegistry;
use crate::synth::{SynthesisSession, Synthesizer};
use crate::{Grammar, Symbol};
use bcgram_runtime::{Instruction, ParseFailure};
use log::debug;
use std::sync::Arc;

pub trait ParseEngine {
    type Tree;

    /// Parses `tokens` with `rules`, starting from `start` when the grammar declares one.
    /// Returns the single derivation tree, or a report of why there is not exactly one.
    fn parse(
        &self,
        rules: &RuleRegistry,
        start: Option<&Symbol>,
        tokens: &[Instruction],
    ) -> Result<Self::Tree, ParseFailure>;
}

/// Synthesizes the rules `tokens` needs on top of `grammar`, then runs `engine`.
///
/// The synthesized rules live only as long as this call; `grammar` is not changed.
pub fn parse_stream<E: ParseEngine>(
    grammar: &Arc<Grammar>,
    synthesizer: &Synthesizer,
    tokens: &[Instruction],
    engine: &E,
) -> Result<E::Tree, ParseError> {
    let mut session = SynthesisSession::new(Arc::clone(grammar), synthesizer.clone());
    let added = session.synthesize(tokens)?;
    debug!(
        "parsing {} tokens with grammar {} ({} rules, {} synthesized)",
        tokens.len(),
        grammar.version(),
        session.rule_count(),
        added
    );
    let rules = session.into_registry();
    Ok(engine.parse(&rules, grammar.start(), tokens)?)
}
