use bcgram::{
    production, ArityFamily, Grammar, GrammarError, Instruction, KeywordPack, KindMatch, Operand,
    Production, SynthesisSession, Synthesizer, Trigger,
};
use rstest::rstest;
use std::sync::Arc;

#[static_init::dynamic]
static INIT_LOGGER: () = {
    env_logger::builder().default_format_timestamp(false).init();
};

fn session(text: &str, triggers: Vec<Trigger>) -> SynthesisSession {
    let base = Arc::new(Grammar::empty("base"));
    let grammar = Grammar::compose(&base, "test", text).unwrap();
    SynthesisSession::new(Arc::new(grammar), Synthesizer::new(triggers))
}

/// `count` operands followed by the instruction that consumes them.
fn stream(kind: &str, count: usize) -> Vec<Instruction> {
    let mut tokens = vec![Instruction::new("LOAD_CONST"); count];
    tokens.push(Instruction::with_arity(kind, count));
    tokens
}

fn build_list() -> Trigger {
    Trigger::arity_family(
        KindMatch::exact("BUILD_LIST"),
        ArityFamily::new("list_", "expr", "list"),
    )
}

#[rstest]
#[case(0, production!(list_0 => BUILD_LIST))]
#[case(1, production!(list_1 => expr BUILD_LIST))]
#[case(3, production!(list_3 => expr expr expr BUILD_LIST))]
fn family_member_has_one_child_per_count(#[case] count: usize, #[case] expected: Production) {
    let mut s = session("", vec![build_list()]);
    s.synthesize(&stream("BUILD_LIST", count)).unwrap();
    assert!(s.contains(&expected), "missing {}", expected);
    assert_eq!(expected.rhs().len(), count + 1);

    let closing = Production::from_names("list", &[expected.lhs().as_str()]);
    assert!(s.contains(&closing));
}

#[rstest]
#[case(Instruction::new("BUILD_LIST"))]
#[case(Instruction::with_arity("BUILD_LIST", 2))]
#[case(Instruction::with_operand("BUILD_LIST", Operand::Int(2)))]
fn unrelated_kinds_are_ignored(#[case] trigger: Instruction) {
    let mut s = session("expr ::= LOAD_CONST", vec![]);
    assert_eq!(s.synthesize(&[trigger]).unwrap(), 0);
    assert_eq!(s.rule_count(), 1);
}

#[rstest]
#[case(Instruction::new("BUILD_LIST"))]
#[case(Instruction::with_operand("BUILD_LIST", Operand::Int(-1)))]
#[case(Instruction::with_operand("BUILD_LIST", Operand::Str("x".to_string())))]
fn count_operand_is_required(#[case] trigger: Instruction) {
    let mut s = session("", vec![build_list()]);
    match s.synthesize(&[trigger]) {
        Err(GrammarError::MissingOperand { position, kind }) => {
            assert_eq!(position, 0);
            assert_eq!(kind, "BUILD_LIST");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[rstest]
#[case(Instruction::with_operand("BUILD_LIST", Operand::Int(4_000_000_000)), 4_000_000_000)]
#[case(Instruction::with_arity("BUILD_LIST", 3), 3)]
fn count_longer_than_stream_is_rejected(#[case] trigger: Instruction, #[case] count: usize) {
    let mut s = session("", vec![build_list()]);
    let tokens = [Instruction::new("LOAD_CONST"), trigger];
    match s.synthesize(&tokens) {
        Err(GrammarError::ArityOutOfRange {
            position,
            kind,
            count: found,
        }) => {
            assert_eq!(position, 1);
            assert_eq!(kind, "BUILD_LIST");
            assert_eq!(found, count);
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(s.added().is_empty());
    assert!(s.customized().is_empty());
}

#[test]
fn fixed_bundle_added_once() {
    let trigger = Trigger::fixed(
        "FORMAT_VALUE",
        vec![
            production!(expr => fstring_single),
            production!(fstring_single => expr FORMAT_VALUE),
        ],
    );
    let mut s = session("expr ::= LOAD_CONST", vec![trigger]);
    let tokens = [
        Instruction::new("FORMAT_VALUE"),
        Instruction::with_arity("FORMAT_VALUE", 4),
        Instruction::new("FORMAT_VALUE"),
    ];
    assert_eq!(s.synthesize(&tokens).unwrap(), 2);
    assert_eq!(s.rule_count(), 3);
    assert_eq!(s.customized()["FORMAT_VALUE"].len(), 1);
}

#[test]
fn rules_already_in_the_grammar_are_not_added() {
    let mut s = session("expr ::= list\nlist ::= list_2", vec![build_list()]);
    assert_eq!(s.synthesize(&stream("BUILD_LIST", 2)).unwrap(), 1);
    let added: Vec<_> = s.added().iter().cloned().collect();
    assert_eq!(added, [production!(list_2 => expr expr BUILD_LIST)]);
}

#[test]
fn companions_come_with_the_first_member() {
    let family = ArityFamily::new("list_", "expr", "list")
        .with_companions(vec![production!(expr => list)]);
    let mut s = session(
        "",
        vec![Trigger::arity_family(KindMatch::exact("BUILD_LIST"), family)],
    );
    assert_eq!(s.synthesize(&stream("BUILD_LIST", 1)).unwrap(), 3);
    assert_eq!(s.synthesize(&stream("BUILD_LIST", 2)).unwrap(), 2);
    let alternatives: Vec<_> = s.alternatives("list").cloned().collect();
    assert_eq!(
        alternatives,
        [production!(list => list_1), production!(list => list_2)]
    );
}

#[rstest]
#[case("CALL_FUNCTION_KW", 0, production!(kwargs => LOAD_CONST))]
#[case("CALL_FUNCTION_KW_2", 2, production!(kwargs => expr expr LOAD_CONST))]
fn keyword_packs(#[case] kind: &str, #[case] count: usize, #[case] pack: Production) {
    let trigger = Trigger::keyword_pack(
        KindMatch::prefix("CALL_FUNCTION_KW"),
        KeywordPack::new("kwargs", "expr", "LOAD_CONST", "call_function"),
    );
    let mut s = session("", vec![trigger]);
    s.synthesize(&stream(kind, count)).unwrap();
    assert!(s.contains(&pack));
    let call = Production::from_names("call_function", &["expr", "kwargs", kind]);
    assert!(s.contains(&call));
}

#[test]
fn keyword_pack_callee() {
    let trigger = Trigger::keyword_pack(
        KindMatch::exact("CALL_METHOD_KW"),
        KeywordPack::new("kwargs", "expr", "LOAD_CONST", "call_method")
            .with_callee(&["expr", "load_attr"]),
    );
    let mut s = session("", vec![trigger]);
    s.synthesize(&[Instruction::with_arity("CALL_METHOD_KW", 1)])
        .unwrap();
    assert!(s.contains(&production!(call_method => expr load_attr kwargs CALL_METHOD_KW)));
}

#[test]
fn first_matching_trigger_wins() {
    let child = Synthesizer::new(vec![Trigger::arity_family(
        KindMatch::exact("BUILD_LIST"),
        ArityFamily::new("items_", "expr", "list"),
    )]);
    let layered = Synthesizer::layered(&[build_list()], &child);
    assert_eq!(layered.len(), 2);

    let base = Arc::new(Grammar::empty("base"));
    let mut s = SynthesisSession::new(base, layered);
    s.synthesize(&[Instruction::with_arity("BUILD_LIST", 1)])
        .unwrap();
    assert!(s.contains(&production!(list_1 => expr BUILD_LIST)));
    assert!(!s.contains(&production!(items_1 => expr BUILD_LIST)));
}

#[test]
fn conflicting_labels_are_rejected() {
    let bundle = vec![production!(expr => fstring_single)];
    let triggers = vec![
        Trigger::fixed("FORMAT_VALUE", bundle.clone()).labeled("format"),
        Trigger::fixed("FORMAT_SPEC", bundle).labeled("format_spec"),
    ];
    let mut s = session("", triggers);
    s.synthesize(&[Instruction::new("FORMAT_VALUE")]).unwrap();

    let err = s.synthesize(&[Instruction::new("FORMAT_SPEC")]).unwrap_err();
    match err {
        GrammarError::DuplicateAmbiguousRule {
            existing,
            conflicting,
            ..
        } => {
            assert_eq!(existing, "format");
            assert_eq!(conflicting, "format_spec");
        }
        other => panic!("unexpected error {}", other),
    }
    assert_eq!(s.added().len(), 1);
    assert!(!s.customized().contains_key("FORMAT_SPEC"));
}

#[test]
fn same_label_is_not_a_conflict() {
    let bundle = vec![production!(expr => fstring_single)];
    let triggers = vec![
        Trigger::fixed("FORMAT_VALUE", bundle.clone()).labeled("format"),
        Trigger::fixed("FORMAT_SPEC", bundle).labeled("format"),
    ];
    let mut s = session("expr ::= fstring_single", triggers);
    let tokens = [Instruction::new("FORMAT_VALUE"), Instruction::new("FORMAT_SPEC")];
    assert_eq!(s.synthesize(&tokens).unwrap(), 0);
}
