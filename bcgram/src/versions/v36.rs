//! Python 3.6 bytecode, layered over 3.5.

use crate::synth::{ArityFamily, KeywordPack, KindMatch, Trigger};
use crate::{production, VersionLayer};

pub const VERSION: &str = "3.6";
pub const PARENT: &str = "3.5";

pub const DELTA: &str = r#"
# closures are returned through a stored cell
return_closure ::= LOAD_CLOSURE DUP_TOP STORE_NAME RETURN_VALUE RETURN_LAST

fstring_multi ::= fstring_expr_or_strs BUILD_STRING
fstring_expr_or_strs ::= fstring_expr_or_str+

func_args36   ::= expr BUILD_TUPLE_0
call_function ::= func_args36 unmapexpr CALL_FUNCTION_EX
call_function ::= func_args36 build_map_unpack_with_call CALL_FUNCTION_EX_KW_1
call_function ::= expr expr CALL_FUNCTION_EX
call_function ::= expr expr expr CALL_FUNCTION_EX_KW_1

withstmt ::= expr SETUP_WITH POP_TOP suite_stmts_opt POP_BLOCK LOAD_CONST
             WITH_CLEANUP_START WITH_CLEANUP_FINISH END_FINALLY

#[tentative] may already hold for 3.5 and earlier
and ::= expr jmp_false expr

# COME_FROM_ASYNC_WITH is new in 3.6
#[fixme] 3.5 has the same form without COME_FROM_ASYNC_WITH
async_with_as_stmt ::= expr
                       BEFORE_ASYNC_WITH GET_AWAITABLE LOAD_CONST YIELD_FROM
                       SETUP_ASYNC_WITH designator
                       suite_stmts_opt
                       POP_BLOCK LOAD_CONST
                       COME_FROM_ASYNC_WITH
                       WITH_CLEANUP_START
                       GET_AWAITABLE LOAD_CONST YIELD_FROM
                       WITH_CLEANUP_FINISH END_FINALLY
#[fixme] 3.5 has the same form without COME_FROM_ASYNC_WITH
async_with_stmt ::= expr
                    BEFORE_ASYNC_WITH GET_AWAITABLE LOAD_CONST YIELD_FROM
                    SETUP_ASYNC_WITH POP_TOP suite_stmts_opt
                    POP_BLOCK LOAD_CONST
                    COME_FROM_ASYNC_WITH
                    WITH_CLEANUP_START
                    GET_AWAITABLE LOAD_CONST YIELD_FROM
                    WITH_CLEANUP_FINISH END_FINALLY

except_suite ::= c_stmts_opt COME_FROM POP_EXCEPT jump_except COME_FROM

# a handler ending in a return has no JUMP_FORWARD END_FINALLY
except_return ::= POP_TOP POP_TOP POP_TOP return_stmts
try_middle    ::= JUMP_FORWARD COME_FROM_EXCEPT except_return
try_middle36  ::= COME_FROM_EXCEPT except_stmts END_FINALLY

stmt      ::= trystmt36
trystmt36 ::= SETUP_EXCEPT return_stmts try_middle36 opt_come_from_except
"#;

/// Terminals the 3.6 grammar uses that are inserted by the disassembler rather than being
/// real opcodes.
pub const EXTRA_VOCABULARY: &[&str] = &[
    "JUMP_BACK",
    "CONTINUE",
    "RETURN_END_IF",
    "COME_FROM",
    "LOAD_GENEXPR",
    "LOAD_ASSERT",
    "LOAD_SETCOMP",
    "LOAD_DICTCOMP",
    "LOAD_CLASSNAME",
    "LAMBDA_MARKER",
    "RETURN_LAST",
];

pub fn triggers() -> Vec<Trigger> {
    let build_string = ArityFamily::new(
        "fstring_expr_or_str_",
        "fstring_expr_or_str",
        "fstring_multi",
    )
    .with_companions(vec![
        production!(expr => fstring_expr),
        production!(fstring_expr => expr FORMAT_VALUE),
        production!(str => LOAD_CONST),
        production!(fstring_expr_or_str => fstring_expr),
        production!(fstring_expr_or_str => str),
        production!(expr => fstring_multi),
    ]);

    vec![
        Trigger::fixed(
            "FORMAT_VALUE",
            vec![
                production!(expr => fstring_single),
                production!(fstring_single => expr FORMAT_VALUE),
            ],
        ),
        Trigger::arity_family(KindMatch::exact("BUILD_STRING"), build_string),
        Trigger::keyword_pack(
            KindMatch::prefix("CALL_FUNCTION_KW"),
            KeywordPack::new("kwargs_only_36", "expr", "LOAD_CONST", "call_function"),
        )
        .labeled("keyword_call"),
    ]
}

pub fn layer() -> VersionLayer {
    VersionLayer::new(VERSION, DELTA)
        .extends(PARENT)
        .with_triggers(triggers())
        .with_extra_vocabulary(EXTRA_VOCABULARY)
}
