use core::borrow::Borrow;
use core::fmt;
use std::sync::Arc;

/// A grammar symbol: either a terminal, which matches an instruction kind exactly, or a
/// nonterminal, which is the left-hand side of some production.
///
/// The class of a symbol is carried by its spelling. Names starting with a lower-case ASCII
/// letter or `_` are nonterminals (`expr`, `call_function`, `fstring_expr_or_str_3`); all
/// other names are terminals (`LOAD_CONST`, `BUILD_STRING`).
///
/// Symbols are cheap to clone; the name is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Symbol(Arc::from(name))
    }

    /// Builds the name of one member of an arity family, e.g. `group_` and 3 give `group_3`.
    pub fn with_count(prefix: &str, count: usize) -> Self {
        Symbol(Arc::from(format!("{}{}", prefix, count)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_nonterminal(&self) -> bool {
        is_nonterminal_name(&self.0)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_nonterminal()
    }
}

pub(crate) fn is_nonterminal_name(name: &str) -> bool {
    matches!(name.as_bytes().first(), Some(b'a'..=b'z') | Some(b'_'))
}

/// Checks that `name` is spelled `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(Arc::from(name))
    }
}

impl From<&Symbol> for Symbol {
    fn from(sym: &Symbol) -> Self {
        sym.clone()
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, fmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_spelling() {
        assert!(Symbol::new("expr").is_nonterminal());
        assert!(Symbol::new("_gen").is_nonterminal());
        assert!(Symbol::new("fstring_expr_or_str_3").is_nonterminal());
        assert!(Symbol::new("LOAD_CONST").is_terminal());
        assert!(Symbol::new("PACK3").is_terminal());
    }

    #[test]
    fn family_names() {
        assert_eq!(Symbol::with_count("group_", 3), "group_3");
        assert_eq!(Symbol::with_count("group_", 0), "group_0");
    }

    #[test]
    fn names() {
        assert!(is_valid_name("expr"));
        assert!(is_valid_name("CALL_FUNCTION_EX_KW_1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("3abc"));
        assert!(!is_valid_name(":::"));
        assert!(!is_valid_name("a-b"));
    }
}
