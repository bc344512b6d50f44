use crate::Symbol;
use core::fmt;

/// A single grammar rule, `lhs ::= rhs...`.
///
/// Productions are plain values. Two productions are the same rule exactly when their
/// left-hand sides and right-hand sequences are equal; that structural identity is what the
/// registry deduplicates on.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Production {
    lhs: Symbol,
    rhs: Vec<Symbol>,
}

impl Production {
    pub fn new<L, I, S>(lhs: L, rhs: I) -> Self
    where
        L: Into<Symbol>,
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Self {
            lhs: lhs.into(),
            rhs: rhs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_names(lhs: &str, rhs: &[&str]) -> Self {
        Self::new(lhs, rhs.iter().copied())
    }

    pub fn lhs(&self) -> &Symbol {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    /// True for an epsilon rule, `lhs ::=`.
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    /// `lhs ::= ... lhs`
    pub fn is_right_recursive(&self) -> bool {
        self.rhs.last() == Some(&self.lhs)
    }
}

impl fmt::Display for Production {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{} ::=", self.lhs)?;
        for sym in self.rhs.iter() {
            write!(fmt, " {}", sym)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Production {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "`{}`", self)
    }
}

/// Builds a [`Production`] from bare names: `production!(expr => expr FORMAT_VALUE)`.
#[macro_export]
macro_rules! production {
    ($lhs:ident => $($rhs:ident)*) => {{
        let rhs: &[&str] = &[$(stringify!($rhs)),*];
        $crate::Production::from_names(stringify!($lhs), rhs)
    }};
}
