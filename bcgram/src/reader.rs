//! Reads the text of a version delta and produces its productions.
//!
//! Our grammar for a delta:
//!
//! ```text
//! lhs ::= sym sym ...          // one alternative; the rhs may be empty
//!         sym sym ...          // an indented line continues the rule above
//! lhs ::= sym+                 // lhs ::= lhs sym | sym
//! lhs ::= sym*                 // lhs ::= lhs sym | (empty)
//! # comment
//! #[tentative] note            // review note for the next rule
//! #[fixme] note
//! ```
//!
//! A rule statement ends at the next `::=` line, at a blank line, or at a comment. Reading is
//! all-or-nothing: every malformed line is collected, and if there are any, no productions are
//! returned at all.

use crate::errors::{Errors, Result};
use crate::registry::{ReviewKind, ReviewNote, RuleRegistry};
use crate::symbol::{is_nonterminal_name, is_valid_name};
use crate::{Production, Symbol};
use log::debug;

const SEPARATOR: &str = "::=";

/// One production read from a delta, with where it came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeltaRule {
    pub production: Production,
    /// 1-based line of the `::=` that starts the statement this rule came from.
    pub line: usize,
    pub review: Option<ReviewNote>,
}

/// The parsed form of one version's delta text.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Delta {
    rules: Vec<DeltaRule>,
}

impl Delta {
    pub fn rules(&self) -> &[DeltaRule] {
        &self.rules
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> {
        self.rules.iter().map(|r| &r.production)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Inserts every rule into `registry`. Returns the number of rules that were new.
    pub fn apply(&self, registry: &mut RuleRegistry) -> usize {
        let mut added = 0;
        for rule in self.rules.iter() {
            let insertion = registry.insert(rule.production.clone());
            if insertion.is_added() {
                added += 1;
            }
            if let Some(note) = &rule.review {
                registry.annotate(insertion.id(), note.clone());
            }
        }
        added
    }
}

/// Reads delta text. See the module documentation for the syntax.
pub fn read_delta(text: &str) -> Result<Delta> {
    let mut reader = ReaderState::new();
    for (i, raw) in text.lines().enumerate() {
        reader.read_line(i + 1, raw);
    }
    reader.end_rule();
    reader.finish()
}

/// The rule statement currently being read.
struct Statement {
    lhs: Symbol,
    line: usize,
    review: Option<ReviewNote>,
    rhs: Vec<Symbol>,
    /// `+` or `*`, with the line it was found on.
    list_suffix: Option<(char, usize)>,
    /// Set once any symbol of this statement failed to read.
    poisoned: bool,
}

/// Contains state used while reading a delta.
struct ReaderState {
    rules: Vec<DeltaRule>,
    current: Option<Statement>,
    /// A review pragma waiting for the next rule statement, with its line.
    pending_review: Option<(ReviewNote, usize, String)>,
    errors: Errors,
}

impl ReaderState {
    fn new() -> Self {
        Self {
            rules: Vec::new(),
            current: None,
            pending_review: None,
            errors: Errors::default(),
        }
    }

    fn read_line(&mut self, line: usize, raw: &str) {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            self.end_rule();
            return;
        }

        if let Some(comment) = trimmed.strip_prefix('#') {
            self.end_rule();
            self.read_pragma(line, raw, comment.trim_start());
            return;
        }

        if let Some((lhs, rhs)) = trimmed.split_once(SEPARATOR) {
            self.end_rule();
            self.start_rule(line, raw, lhs.trim());
            self.add_symbols(line, raw, rhs);
            return;
        }

        let continues = raw.starts_with(char::is_whitespace) && self.current.is_some();
        if continues {
            self.add_symbols(line, raw, trimmed);
        } else {
            self.end_rule();
            self.errors.push(line, raw, "expected `lhs ::= symbols`");
        }
    }

    /// `#[tentative] ...` and `#[fixme] ...` attach a note to the next rule; any other comment
    /// is ignored.
    fn read_pragma(&mut self, line: usize, raw: &str, comment: &str) {
        let body = match comment.strip_prefix('[') {
            Some(body) => body,
            None => return,
        };
        let (tag, note) = match body.split_once(']') {
            Some(parts) => parts,
            None => return,
        };
        let kind = match tag.trim() {
            "tentative" => ReviewKind::Tentative,
            "fixme" => ReviewKind::Fixme,
            other => {
                self.errors
                    .push(line, raw, format!("unknown review pragma `{}`", other));
                return;
            }
        };
        if let Some((_, pending_line, pending_raw)) = self.pending_review.take() {
            self.errors.push(
                pending_line,
                &pending_raw,
                "review pragma is not followed by a rule",
            );
        }
        let note = ReviewNote {
            kind,
            note: note.trim().to_string(),
        };
        self.pending_review = Some((note, line, raw.to_string()));
    }

    fn start_rule(&mut self, line: usize, raw: &str, lhs: &str) {
        let review = self.pending_review.take().map(|(note, _, _)| note);
        let mut poisoned = false;
        if lhs.is_empty() {
            self.errors.push(line, raw, "missing left-hand side");
            poisoned = true;
        } else if !is_valid_name(lhs) {
            self.errors
                .push(line, raw, format!("`{}` is not a valid symbol name", lhs));
            poisoned = true;
        } else if !is_nonterminal_name(lhs) {
            self.errors.push(
                line,
                raw,
                format!("`{}` is a terminal and cannot be on the left-hand side of a rule", lhs),
            );
            poisoned = true;
        }

        self.current = Some(Statement {
            lhs: Symbol::new(lhs),
            line,
            review,
            rhs: Vec::new(),
            list_suffix: None,
            poisoned,
        });
    }

    /// Adds the symbols of `text` to the rhs of the current statement.
    fn add_symbols(&mut self, line: usize, raw: &str, text: &str) {
        let stmt = match self.current.as_mut() {
            Some(stmt) => stmt,
            None => return,
        };

        for word in text.split_whitespace() {
            if let Some((suffix, suffix_line)) = stmt.list_suffix {
                self.errors.push(
                    line,
                    raw,
                    format!(
                        "`{}` follows a list symbol (`{}`) from line {}",
                        word, suffix, suffix_line
                    ),
                );
                stmt.poisoned = true;
                continue;
            }

            let (name, suffix) = match word.strip_suffix('+') {
                Some(name) => (name, Some('+')),
                None => match word.strip_suffix('*') {
                    Some(name) => (name, Some('*')),
                    None => (word, None),
                },
            };

            if !is_valid_name(name) {
                self.errors
                    .push(line, raw, format!("`{}` is not a valid symbol name", word));
                stmt.poisoned = true;
                continue;
            }

            if let Some(suffix) = suffix {
                if !stmt.rhs.is_empty() {
                    self.errors.push(
                        line,
                        raw,
                        format!("list symbol `{}` must be the only symbol of its rule", word),
                    );
                    stmt.poisoned = true;
                    continue;
                }
                stmt.list_suffix = Some((suffix, line));
            }
            stmt.rhs.push(Symbol::new(name));
        }
    }

    // Terminates the current rule statement, if any, and emits its productions.
    fn end_rule(&mut self) {
        let stmt = match self.current.take() {
            Some(stmt) => stmt,
            None => return,
        };
        if stmt.poisoned {
            return;
        }

        let Statement {
            lhs,
            line,
            review,
            rhs,
            list_suffix,
            ..
        } = stmt;

        let productions = match list_suffix {
            None => vec![Production::new(lhs, rhs)],
            Some((suffix, _)) => {
                let item = rhs[0].clone();
                let recursive = Production::new(lhs.clone(), vec![lhs.clone(), item.clone()]);
                let base = if suffix == '+' {
                    Production::new(lhs, vec![item])
                } else {
                    Production::new(lhs, Vec::<Symbol>::new())
                };
                vec![recursive, base]
            }
        };

        for production in productions {
            self.rules.push(DeltaRule {
                production,
                line,
                review: review.clone(),
            });
        }
    }

    fn finish(mut self) -> Result<Delta> {
        if let Some((_, line, raw)) = self.pending_review.take() {
            self.errors
                .push(line, &raw, "review pragma is not followed by a rule");
        }
        self.errors.into_result()?;

        debug!("read delta: {} rules", self.rules.len());
        for (i, rule) in self.rules.iter().enumerate() {
            match &rule.review {
                Some(note) => debug!(
                    "    {:3} (line {:3}) {}    {}",
                    i, rule.line, rule.production, note
                ),
                None => debug!("    {:3} (line {:3}) {}", i, rule.line, rule.production),
            }
        }
        Ok(Delta { rules: self.rules })
    }
}

impl Delta {
    /// Registers every rule of this delta in a fresh registry.
    pub fn to_registry(&self) -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        self.apply(&mut registry);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::production;

    fn rules(text: &str) -> Vec<String> {
        read_delta(text)
            .unwrap()
            .productions()
            .map(|p| p.to_string())
            .collect()
    }

    #[test]
    fn alternatives_and_comments() {
        let text = "
            # a comment
            expr ::= A B

            expr ::= C
        ";
        assert_eq!(rules(text), ["expr ::= A B", "expr ::= C"]);
    }

    #[test]
    fn continuation_lines() {
        let text = "withstmt ::= expr SETUP_WITH POP_TOP suite_stmts_opt POP_BLOCK LOAD_CONST
                     WITH_CLEANUP_START WITH_CLEANUP_FINISH END_FINALLY
stmt ::= withstmt";
        let delta = read_delta(text).unwrap();
        assert_eq!(delta.len(), 2);
        assert_eq!(delta.rules()[0].production.len(), 9);
        assert_eq!(delta.rules()[0].line, 1);
        assert_eq!(delta.rules()[1].line, 3);
    }

    #[test]
    fn empty_rhs_is_epsilon() {
        assert_eq!(rules("opt_come_from ::="), ["opt_come_from ::="]);
    }

    #[test]
    fn list_suffixes() {
        assert_eq!(
            rules("strs ::= str+"),
            ["strs ::= strs str", "strs ::= str"]
        );
        assert_eq!(rules("stmts ::= stmt*"), ["stmts ::= stmts stmt", "stmts ::="]);
    }

    #[test]
    fn list_suffix_must_stand_alone() {
        let err = read_delta("strs ::= str+ BUILD_STRING").unwrap_err();
        assert_eq!(err.syntax_errors().unwrap().lines(), [1]);
        let err = read_delta("strs ::= LOAD_CONST str+").unwrap_err();
        assert_eq!(err.syntax_errors().unwrap().lines(), [1]);
    }

    #[test]
    fn wrong_separator() {
        let err = read_delta("expr ::: A").unwrap_err();
        let errors = err.syntax_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().line, 1);
        assert_eq!(errors.first().content, "expr ::: A");
    }

    #[test]
    fn every_bad_line_is_reported() {
        let text = "expr ::= A\nexpr ::: B\nstmt ::= expr\nLOAD ::= x\nstmt ::= a-b";
        let err = read_delta(text).unwrap_err();
        assert_eq!(err.syntax_errors().unwrap().lines(), [2, 4, 5]);
    }

    #[test]
    fn continuation_without_rule() {
        let err = read_delta("    A B C").unwrap_err();
        assert_eq!(err.syntax_errors().unwrap().lines(), [1]);
        // an unindented line without a separator does not continue the rule above
        let err = read_delta("expr ::= A\nB C").unwrap_err();
        assert_eq!(err.syntax_errors().unwrap().lines(), [2]);
    }

    #[test]
    fn review_pragmas() {
        let text = "
            #[tentative] may already hold before 3.6
            and ::= expr jmp_false expr
            stmt ::= and
        ";
        let delta = read_delta(text).unwrap();
        let note = delta.rules()[0].review.as_ref().unwrap();
        assert_eq!(note.kind, ReviewKind::Tentative);
        assert_eq!(note.note, "may already hold before 3.6");
        assert!(delta.rules()[1].review.is_none());

        let registry = delta.to_registry();
        assert!(registry
            .review_note(&production!(and => expr jmp_false expr))
            .is_some());
    }

    #[test]
    fn dangling_pragma() {
        assert!(read_delta("#[fixme] nothing after this").is_err());
        assert!(read_delta("#[later] what").is_err());
    }
}
