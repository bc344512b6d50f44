//! Contains the types that sit on the boundary between `bcgram` and the code around it: the
//! instruction tokens produced by a disassembler, and the report a parsing engine hands back
//! when it cannot produce a single derivation.
//!
//! Nothing in here knows about grammars. Keeping it separate lets a disassembler depend on
//! this crate alone.

use core::fmt;

/// The payload attached to an instruction, if any.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Operand {
    /// A count or index, e.g. the number of values packed by a build/call instruction.
    Int(i64),
    /// Any other literal the disassembler chose to keep.
    Str(String),
}

impl Operand {
    /// Returns the operand as a repeat count, when it is a non-negative integer.
    pub fn arity(&self) -> Option<usize> {
        match *self {
            Operand::Int(n) => usize::try_from(n).ok(),
            Operand::Str(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(n) => write!(fmt, "{}", n),
            Operand::Str(s) => write!(fmt, "{:?}", s),
        }
    }
}

/// One token of the input stream.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
    pub kind: String,
    pub operand: Option<Operand>,
}

impl Instruction {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            operand: None,
        }
    }

    /// A count that does not fit an `i64` is stored as `i64::MAX`.
    pub fn with_arity(kind: impl Into<String>, n: usize) -> Self {
        Self {
            kind: kind.into(),
            operand: Some(Operand::Int(i64::try_from(n).unwrap_or(i64::MAX))),
        }
    }

    pub fn with_operand(kind: impl Into<String>, operand: Operand) -> Self {
        Self {
            kind: kind.into(),
            operand: Some(operand),
        }
    }

    pub fn arity(&self) -> Option<usize> {
        self.operand.as_ref().and_then(Operand::arity)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(op) => write!(fmt, "{} {}", self.kind, op),
            None => fmt.write_str(&self.kind),
        }
    }
}

/// Why a parsing engine could not produce a single derivation tree.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseFailure {
    /// No derivation exists; `position` is the index of the first token that could not be
    /// consumed (or the stream length, if the input ended early).
    #[error("unparseable token {kind:?} at position {position}")]
    Rejected { position: usize, kind: String },

    /// More than one derivation exists. `candidates` names the competing rules, in whatever
    /// form the engine finds useful for a grammar author.
    #[error("ambiguous parse at position {position}: {}", candidates.join(" | "))]
    Ambiguous {
        position: usize,
        candidates: Vec<String>,
    },

    /// The engine refused the grammar itself (for example, it has no start symbol).
    #[error("grammar rejected by parsing engine: {0}")]
    Grammar(String),
}

#[cfg(feature = "bcgram_log")]
#[macro_export]
macro_rules! bcgram_log {
    (
        $($t:tt)*
    ) => {
        ::log::debug!( $($t)* )
    }
}

#[cfg(not(feature = "bcgram_log"))]
#[macro_export]
macro_rules! bcgram_log {
    (
        $($t:tt)*
    ) => {
        // nothing
    };
}
