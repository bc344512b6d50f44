use super::*;
use crate::validate::{Finding, Validator, Vocabulary};
use std::sync::Arc;

#[static_init::dynamic]
static INIT_LOGGER: () = {
    env_logger::builder().default_format_timestamp(false).init();
};

fn case(description: &str, base: &Arc<Grammar>, text: &str) -> Option<Grammar> {
    println!("composing grammar: {} -----", description);

    match Grammar::compose(base, "test", text) {
        Ok(g) => {
            println!("composed grammar: nrules={}", g.len());
            for p in g.registry().iter() {
                println!("    {}", g.rule_to_str(p));
            }
            Some(g)
        }
        Err(e) => {
            println!("error: {}", e);
            None
        }
    }
}

const PY35: &str = "
stmts ::= stmt+
stmt ::= expr POP_TOP
stmt ::= withstmt
stmt ::= async_with_stmt
expr ::= LOAD_CONST
expr ::= LOAD_NAME
expr ::= call_function
";

fn chain() -> VersionChain {
    let mut chain = VersionChain::new();
    chain
        .register(VersionLayer::new("3.5", PY35).with_start("stmts"))
        .register(versions::v36::layer());
    chain
}

#[test]
fn test_compose() {
    let base = Arc::new(Grammar::empty("base"));

    let g = case("two alternatives", &base, "expr ::= A B\nexpr ::= C").unwrap();
    assert_eq!(g.len(), 2);

    let g = case(
        "continued rule",
        &base,
        "stmt ::= expr
             POP_TOP",
    )
    .unwrap();
    assert!(g.contains(&production!(stmt => expr POP_TOP)));

    assert!(case("bad separator", &base, "expr ::: A").is_none());
    assert!(case("terminal on the left", &base, "EXPR ::= A").is_none());
}

#[test]
fn test_v36_chain() {
    let chain = chain();
    let g36 = chain.grammar("3.6").unwrap();
    let g35 = chain.grammar("3.5").unwrap();

    assert_eq!(g36.version(), "3.6");
    assert_eq!(g36.parent().map(|p| p.version()), Some("3.5"));
    assert_eq!(g36.start().map(|s| s.as_str()), Some("stmts"));
    for p in g35.registry().iter() {
        assert!(g36.contains(p), "lost {}", p);
    }
    assert!(g36.contains(&production!(stmt => trystmt36)));
    assert!(!g35.contains(&production!(stmt => trystmt36)));

    // built once, then shared
    assert!(Arc::ptr_eq(&g36, &chain.grammar("3.6").unwrap()));
}

#[test]
fn test_v36_validate() {
    let chain = chain();
    let g36 = chain.grammar("3.6").unwrap();

    let report = Validator::new().validate(&g36);
    report.log("3.6");
    let tentative = report
        .iter()
        .filter(|f| matches!(f, Finding::TentativeProduction { .. }))
        .count();
    assert_eq!(tentative, 3);
    assert!(!report
        .iter()
        .any(|f| matches!(f, Finding::RemovedProduction { .. })));
    assert!(report
        .undefined_nonterminals()
        .iter()
        .any(|s| s.as_str() == "suite_stmts_opt"));

    let mut vocabulary = Vocabulary::new(vec![
        "POP_TOP", "LOAD_CONST", "LOAD_NAME", "LOAD_CLOSURE", "DUP_TOP", "STORE_NAME",
        "RETURN_VALUE", "BUILD_STRING", "BUILD_TUPLE", "CALL_FUNCTION_EX", "CALL_FUNCTION_EX_KW",
        "SETUP_WITH", "POP_BLOCK", "WITH_CLEANUP_START", "WITH_CLEANUP_FINISH", "END_FINALLY",
        "BEFORE_ASYNC_WITH", "GET_AWAITABLE", "YIELD_FROM", "SETUP_ASYNC_WITH",
        "POP_EXCEPT", "JUMP_FORWARD", "SETUP_EXCEPT",
    ]);
    vocabulary.extend(chain.extra_vocabulary("3.6").unwrap());
    let report = Validator::coverage_only(&vocabulary).validate(&g36);
    assert_eq!(
        report.unknown_terminals(),
        ["COME_FROM_ASYNC_WITH", "COME_FROM_EXCEPT"]
    );
}

#[test]
fn test_v36_parse() {
    struct RuleCount;

    impl ParseEngine for RuleCount {
        type Tree = usize;

        fn parse(
            &self,
            rules: &RuleRegistry,
            start: Option<&Symbol>,
            _tokens: &[Instruction],
        ) -> core::result::Result<usize, ParseFailure> {
            assert_eq!(start.map(|s| s.as_str()), Some("stmts"));
            Ok(rules.len())
        }
    }

    let chain = chain();
    let base = chain.grammar("3.6").unwrap().len();
    let tokens = [
        Instruction::new("LOAD_CONST"),
        Instruction::new("FORMAT_VALUE"),
        Instruction::new("LOAD_CONST"),
        Instruction::with_arity("BUILD_STRING", 2),
        Instruction::new("POP_TOP"),
    ];
    let n = chain.parse("3.6", &tokens, &RuleCount).unwrap();
    // fstring_single pair, then the BUILD_STRING family member, alias and six companions
    assert_eq!(n, base + 2 + 2 + 6);
    assert_eq!(chain.grammar("3.6").unwrap().len(), base);
}

#[test]
fn test_unknown_version() {
    let chain = chain();
    match chain.grammar("2.7") {
        Err(GrammarError::UnknownVersion(v)) => assert_eq!(v, "2.7"),
        other => panic!("unexpected: {:?}", other.map(|g| g.len())),
    }

    let mut orphan = VersionChain::new();
    orphan.register(versions::v36::layer());
    assert!(matches!(
        orphan.grammar("3.6"),
        Err(GrammarError::UnknownVersion(v)) if v == "3.5"
    ));
}
