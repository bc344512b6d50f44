//! Property-based tests for composition and synthesis.
//!
//! Deltas are generated as rule text over a small symbol pool, so duplicates and shared
//! left-hand sides are common.

use bcgram::validate::{check_vocabulary, grammar_sets, Vocabulary};
use bcgram::{
    ArityFamily, Grammar, Instruction, KindMatch, SynthesisSession, Synthesizer, Trigger,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn rule_strategy() -> impl Strategy<Value = String> {
    let lhs = prop_oneof![Just("expr"), Just("stmt"), Just("call")];
    let sym = prop_oneof![
        Just("expr"),
        Just("stmt"),
        Just("LOAD_CONST"),
        Just("POP_TOP"),
        Just("CALL_FUNCTION_1"),
    ];
    (lhs, prop::collection::vec(sym, 0..4))
        .prop_map(|(lhs, rhs)| format!("{} ::= {}", lhs, rhs.join(" ")))
}

fn delta_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(rule_strategy(), 0..12).prop_map(|rules| rules.join("\n"))
}

/// Instruction-kind spellings, including templated ones like `CALL_2` and `JUMP_CONT`.
fn terminals_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Z][A-Z_]{0,8}(_[0-9]{1,2})?", 1..10)
}

fn compose(base: &Arc<Grammar>, text: &str) -> Arc<Grammar> {
    Arc::new(Grammar::compose(base, "next", text).unwrap())
}

fn rule_texts(g: &Grammar) -> BTreeSet<String> {
    g.registry().iter().map(|p| p.to_string()).collect()
}

#[cfg(test)]
mod proptest_tests {
    use super::*;

    proptest! {
        #[test]
        fn compose_is_idempotent(text in delta_strategy()) {
            let base = Arc::new(Grammar::empty("base"));
            let once = compose(&base, &text);
            let twice = compose(&once, &text);
            prop_assert_eq!(once.registry(), twice.registry());
        }

        #[test]
        fn registry_has_no_duplicates(text in delta_strategy()) {
            let base = Arc::new(Grammar::empty("base"));
            let g = compose(&base, &text);
            let distinct: BTreeSet<&str> = text.lines().map(|l| l.trim_end()).collect();
            prop_assert_eq!(g.len(), distinct.len());
            prop_assert_eq!(rule_texts(&g).len(), g.len());
        }

        #[test]
        fn composition_order_does_not_change_the_rules(
            a in delta_strategy(),
            b in delta_strategy(),
        ) {
            let base = Arc::new(Grammar::empty("base"));
            let ab = compose(&compose(&base, &a), &b);
            let ba = compose(&compose(&base, &b), &a);
            prop_assert_eq!(ab.registry(), ba.registry());
        }

        #[test]
        fn composition_keeps_every_base_rule(a in delta_strategy(), b in delta_strategy()) {
            let base = Arc::new(Grammar::empty("base"));
            let first = compose(&base, &a);
            let second = compose(&first, &b);
            prop_assert!(rule_texts(&first).is_subset(&rule_texts(&second)));
        }

        #[test]
        fn vocabulary_of_own_terminals_covers_the_grammar(terminals in terminals_strategy()) {
            let text: Vec<String> = terminals
                .chunks(3)
                .map(|chunk| format!("stmt ::= expr {}", chunk.join(" ")))
                .collect();
            let base = Arc::new(Grammar::empty("base"));
            let g = compose(&base, &text.join("\n"));

            let sets = grammar_sets(g.registry());
            prop_assert!(sets.terminals.iter().all(|t| terminals.contains(&t.to_string())));
            let vocabulary = Vocabulary::new(sets.terminals.iter().map(|t| t.as_str()));
            prop_assert!(check_vocabulary(g.registry(), &vocabulary).is_empty());
        }

        #[test]
        fn one_family_member_per_count(counts in prop::collection::vec(0usize..6, 0..20)) {
            let synthesizer = Synthesizer::new(vec![Trigger::arity_family(
                KindMatch::exact("PACK"),
                ArityFamily::new("group_", "item", "expr"),
            )]);
            let grammar = Arc::new(Grammar::empty("base"));
            // enough operands up front for the largest count
            let tokens: Vec<_> = core::iter::repeat(Instruction::new("item"))
                .take(6)
                .chain(counts.iter().map(|&n| Instruction::with_arity("PACK", n)))
                .collect();

            let mut session = SynthesisSession::new(grammar, synthesizer);
            let added = session.synthesize(&tokens).unwrap();
            let distinct: BTreeSet<usize> = counts.iter().copied().collect();
            prop_assert_eq!(added, distinct.len() * 2);
            prop_assert_eq!(session.alternatives("expr").count(), distinct.len());

            prop_assert_eq!(session.synthesize(&tokens).unwrap(), 0);
        }
    }
}
