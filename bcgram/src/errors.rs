use crate::Production;
use bcgram_runtime::ParseFailure;
use core::fmt;

pub type Result<T, E = GrammarError> = core::result::Result<T, E>;

/// A line of delta text that could not be read as a production.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("line {line}: {reason}: `{content}`")]
pub struct GrammarSyntaxError {
    /// 1-based line number within the delta text.
    pub line: usize,
    pub content: String,
    pub reason: String,
}

/// Every malformed line found in one delta text. Never empty.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyntaxErrors(Vec<GrammarSyntaxError>);

impl SyntaxErrors {
    pub fn first(&self) -> &GrammarSyntaxError {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &GrammarSyntaxError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn lines(&self) -> Vec<usize> {
        self.0.iter().map(|e| e.line).collect()
    }
}

impl fmt::Display for SyntaxErrors {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                fmt.write_str("; ")?;
            }
            fmt::Display::fmt(e, fmt)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxErrors {}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum GrammarError {
    #[error("malformed grammar delta: {0}")]
    Syntax(SyntaxErrors),

    /// The same rule was registered twice under different semantic labels. This is a bug in a
    /// trigger table, not in the input.
    #[error("rule `{production}` is registered as `{existing}` and again as `{conflicting}`")]
    DuplicateAmbiguousRule {
        production: Production,
        existing: String,
        conflicting: String,
    },

    /// A trigger that sizes its rules by the operand found an instruction without a usable one.
    #[error("instruction {kind} at position {position} has no count operand")]
    MissingOperand { position: usize, kind: String },

    /// A count operand larger than the stream it came from. No rule that long could match.
    #[error("instruction {kind} at position {position} has count {count}, longer than its stream")]
    ArityOutOfRange {
        position: usize,
        kind: String,
        count: usize,
    },

    #[error("unknown grammar version `{0}`")]
    UnknownVersion(String),

    #[error("grammar version `{0}` is its own ancestor")]
    VersionCycle(String),
}

impl From<GrammarSyntaxError> for GrammarError {
    fn from(e: GrammarSyntaxError) -> Self {
        GrammarError::Syntax(SyntaxErrors(vec![e]))
    }
}

impl GrammarError {
    /// The syntax errors carried by this error, if it is a `Syntax` error.
    pub fn syntax_errors(&self) -> Option<&SyntaxErrors> {
        match self {
            GrammarError::Syntax(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Everything that can stop [`crate::parse_stream`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

/// Collects syntax errors while a delta is read, so that every bad line is reported at once.
#[derive(Default)]
pub(crate) struct Errors {
    pub(crate) errors: Vec<GrammarSyntaxError>,
}

impl Errors {
    pub(crate) fn push(&mut self, line: usize, content: &str, reason: impl Into<String>) {
        self.errors.push(GrammarSyntaxError {
            line,
            content: content.to_string(),
            reason: reason.into(),
        });
    }

    pub(crate) fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(GrammarError::Syntax(SyntaxErrors(self.errors)))
        }
    }
}
