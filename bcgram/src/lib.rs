//! # bcgram -- layered grammars for bytecode decompilers
//!
//! A decompiler that works by parsing instruction streams needs a context-free grammar for
//! every version of the bytecode format it supports. Those grammars are nearly identical: each
//! version changes a handful of rules relative to the one before it. And no fixed grammar is
//! enough on its own, because instructions such as "build a string from N pieces" or "call
//! with N keyword arguments" need a rule whose length depends on N, and N is only known once
//! the instruction stream is in hand.
//!
//! This crate builds those grammars. It does not parse; it produces the rule set that a
//! generic parsing engine (Earley, GLR, ...) consumes, together with the instruction stream.
//!
//! ## Writing a version delta
//!
//! Each version is described by a *delta*: the rules it adds on top of its predecessor.
//!
//! ```text
//! # closures are returned through a stored cell
//! return_closure ::= LOAD_CLOSURE DUP_TOP STORE_NAME RETURN_VALUE RETURN_LAST
//!
//! call_function ::= expr expr CALL_FUNCTION_EX
//! call_function ::= expr expr expr CALL_FUNCTION_EX_KW_1
//!
//! withstmt ::= expr SETUP_WITH POP_TOP suite_stmts_opt POP_BLOCK LOAD_CONST
//!              WITH_CLEANUP_START WITH_CLEANUP_FINISH END_FINALLY
//!
//! fstring_expr_or_strs ::= fstring_expr_or_str+
//! ```
//!
//! Lower-case names are nonterminals and upper-case names are instruction kinds. Alternatives
//! are written as repeated lines. An indented line continues the rule above it. A lone `X+` or
//! `X*` on the right-hand side is expanded into a left-recursive list. A comment of the form
//! `#[tentative] why` or `#[fixme] why` marks the next rule for review by a grammar author; the
//! rule is still part of the grammar, and the validator lists it.
//!
//! Composition is a set union. Restating an inherited rule is harmless, and a delta can never
//! remove a rule from an ancestor.
//!
//! ## Building a version chain
//!
//! ```rust,ignore
//! let mut chain = VersionChain::new();
//! chain.register(VersionLayer::new("3.5", DELTA_35).with_start("stmts"));
//! chain.register(bcgram::versions::v36::layer());
//!
//! let grammar = chain.grammar("3.6")?;   // Arc<Grammar>, built once and cached
//! ```
//!
//! A built [`Grammar`] is never mutated. It can be shared freely between threads, and each
//! grammar keeps a reference to its parent so the whole lineage can be inspected.
//!
//! ## Synthesizing rules from the instruction stream
//!
//! Each layer also carries [`Trigger`]s: instruction kinds that call for extra rules. Before a
//! stream is parsed, a [`SynthesisSession`] walks it and, for every trigger it finds, adds the
//! rules that instruction needs. For example, `BUILD_STRING 3` produces
//!
//! ```text
//! fstring_expr_or_str_3 ::= fstring_expr_or_str fstring_expr_or_str fstring_expr_or_str BUILD_STRING
//! fstring_multi ::= fstring_expr_or_str_3
//! ```
//!
//! Rules are deduplicated by their structure, so a module with a hundred three-piece strings
//! adds this family once. The session is an overlay on the shared grammar: it lives for one
//! parse, and two sessions over the same grammar never see each other's rules.
//!
//! ```rust,ignore
//! let mut session = chain.session("3.6")?;
//! session.synthesize(&tokens)?;
//! let tree = engine.parse(&session.into_registry(), grammar.start(), &tokens)?;
//! ```
//!
//! [`parse_stream`] wraps those steps.
//!
//! ## Checking a grammar
//!
//! The [`validate`] module runs offline checks for grammar authors: nonterminals that are used
//! but never defined, nonterminals unreachable from the start symbol, terminals that are not
//! known instruction kinds, rules lost relative to an ancestor, and rules flagged for review.
//! Findings are advisory. Nothing in the checks fails a build.
//!
//! # Logging
//!
//! The crate logs through the `log` facade. The synthesis hot path logs through
//! `bcgram_runtime::bcgram_log!`, which compiles to nothing unless the `bcgram_log` feature is
//! enabled (it is, by default).

#![warn(rust_2018_idioms)]

mod bitmat;
mod engine;
mod errors;
mod grammar;
mod production;
mod ramp_table;
mod reader;
mod registry;
mod symbol;
mod synth;
pub mod validate;
mod version;
pub mod versions;
mod warshall;

#[cfg(test)]
mod tests;

pub use bcgram_runtime::{Instruction, Operand, ParseFailure};
pub use engine::{parse_stream, ParseEngine};
pub use errors::{GrammarError, GrammarSyntaxError, ParseError, Result, SyntaxErrors};
pub use grammar::Grammar;
pub use production::Production;
pub use reader::{read_delta, Delta, DeltaRule};
pub use registry::{Insertion, ReviewKind, ReviewNote, RuleRegistry};
pub use symbol::Symbol;
pub use synth::{
    ArityFamily, Customized, KeywordPack, KindMatch, SynthesisSession, Synthesizer, Template,
    Trigger,
};
pub use version::{VersionChain, VersionLayer};

macro_rules! int_alias {
    (type $name:ident = $int:ty;) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
        pub struct $name(pub $int);

        impl $name {
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, fmt)
            }
        }

        impl core::convert::From<$name> for usize {
            fn from(i: $name) -> usize {
                i.0 as usize
            }
        }

        impl core::convert::From<usize> for $name {
            fn from(i: usize) -> $name {
                $name(i as $int)
            }
        }
    };
}

// Index types
int_alias! {type RuleId = u32;}
int_alias! {type Var = u32;}
