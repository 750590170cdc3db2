//! Grammar constructs as data
//!
//! A [`Matcher`] is one grammar construct in interpretable form: running
//! it dispatches to the corresponding [`Stream`] primitive. Grammars
//! loaded at runtime assemble into this shape; the code generator emits
//! source for dedicated structs that invoke the same primitives, so the
//! two layers stay swappable.
//!
//! The free functions below are the construction vocabulary used by the
//! bootstrap grammars and the loader.

use crate::action::Expr;
use crate::rules::Match;
use crate::stream::{MatchResult, Stream};
use crate::value::Value;
use serde::Serialize;
use std::rc::Rc;

/// Predicate for an atomic one-item match.
#[derive(Debug, Clone, Serialize)]
pub enum ItemPred {
    /// Any item
    Any,
    /// An item equal to the given value
    Eq(Value),
    /// A character in an inclusive range
    CharRange(char, char),
}

impl ItemPred {
    /// Human-readable description used in failure messages.
    pub fn description(&self) -> String {
        match self {
            ItemPred::Any => "any".to_string(),
            ItemPred::Eq(Value::Char(c)) => format!("{:?}", c),
            ItemPred::Eq(v) => format!("{}", v),
            ItemPred::CharRange(low, high) => format!("{:?}-{:?}", low, high),
        }
    }
}

/// One grammar construct in interpretable form.
#[derive(Debug, Clone, Serialize)]
pub enum Matcher {
    /// Ordered choice
    Or(Vec<Matcher>),
    /// Sequence
    And(Vec<Matcher>),
    /// Greedy zero-or-more
    Star(Box<Matcher>),
    /// Zero-width negative lookahead
    Not(Box<Matcher>),
    /// Fresh lexical scope around the inner matcher
    Scope(Box<Matcher>),
    /// Bind the inner matcher's action in the current scope
    Bind(String, Box<Matcher>),
    /// Descend into a list-shaped item
    MatchList(Box<Matcher>),
    /// Capture the range covered by the inner matcher
    MatchRange(Box<Matcher>),
    /// Invoke a rule by qualified name
    Call(String),
    /// Invoke the rule named by the item at the cursor (`%`)
    CallByName(String),
    /// Atomic one-item match
    Item(ItemPred),
    /// Deferred semantic action
    Action(Rc<Expr>),
}

impl Match for Matcher {
    fn run(&self, stream: &mut Stream) -> MatchResult {
        match self {
            Matcher::Or(matchers) => {
                let refs: Vec<&dyn Match> = matchers.iter().map(|m| m as &dyn Match).collect();
                stream.operator_or(&refs)
            }
            Matcher::And(matchers) => {
                let refs: Vec<&dyn Match> = matchers.iter().map(|m| m as &dyn Match).collect();
                stream.operator_and(&refs)
            }
            Matcher::Star(matcher) => stream.operator_star(matcher.as_ref()),
            Matcher::Not(matcher) => stream.operator_not(matcher.as_ref()),
            Matcher::Scope(matcher) => stream.with_scope(matcher.as_ref()),
            Matcher::Bind(name, matcher) => {
                let action = matcher.run(stream)?;
                stream.bind(name, action)
            }
            Matcher::MatchList(matcher) => stream.match_list(matcher.as_ref()),
            Matcher::MatchRange(matcher) => stream.match_range(matcher.as_ref()),
            Matcher::Call(name) => stream.match_rule(name),
            Matcher::CallByName(namespace) => stream.match_call_rule(namespace),
            Matcher::Item(pred) => {
                let description = pred.description();
                match pred {
                    ItemPred::Any => stream.match_item(&|_| true, &description),
                    ItemPred::Eq(expected) => {
                        stream.match_item(&|item| item == expected, &description)
                    }
                    ItemPred::CharRange(low, high) => {
                        stream.match_item(&|item| item.in_char_range(*low, *high), &description)
                    }
                }
            }
            Matcher::Action(expr) => stream.action_eval(Rc::clone(expr)),
        }
    }
}

/// Ordered choice over `matchers`.
pub fn choice(matchers: Vec<Matcher>) -> Matcher {
    Matcher::Or(matchers)
}

/// Sequence of `matchers`.
pub fn seq(matchers: Vec<Matcher>) -> Matcher {
    Matcher::And(matchers)
}

/// Greedy zero-or-more repetition.
pub fn star(matcher: Matcher) -> Matcher {
    Matcher::Star(Box::new(matcher))
}

/// Zero-width negative lookahead.
pub fn not_(matcher: Matcher) -> Matcher {
    Matcher::Not(Box::new(matcher))
}

/// Fresh lexical scope around `matcher`.
pub fn scope(matcher: Matcher) -> Matcher {
    Matcher::Scope(Box::new(matcher))
}

/// Bind the matcher's action under `name`.
pub fn bind(name: &str, matcher: Matcher) -> Matcher {
    Matcher::Bind(name.to_string(), Box::new(matcher))
}

/// Descend into a list-shaped item.
pub fn match_list(matcher: Matcher) -> Matcher {
    Matcher::MatchList(Box::new(matcher))
}

/// Capture the range covered by `matcher`.
pub fn match_range(matcher: Matcher) -> Matcher {
    Matcher::MatchRange(Box::new(matcher))
}

/// Invoke the rule registered under `name`.
pub fn call(name: &str) -> Matcher {
    Matcher::Call(name.to_string())
}

/// Invoke the rule named by the item at the cursor, qualified with
/// `namespace`.
pub fn call_by_name(namespace: &str) -> Matcher {
    Matcher::CallByName(namespace.to_string())
}

/// Match any single item.
pub fn any_item() -> Matcher {
    Matcher::Item(ItemPred::Any)
}

/// Match one specific character.
pub fn eq_char(c: char) -> Matcher {
    Matcher::Item(ItemPred::Eq(Value::Char(c)))
}

/// Match one item equal to `value`.
pub fn eq_value(value: Value) -> Matcher {
    Matcher::Item(ItemPred::Eq(value))
}

/// Match one character in `[low, high]`.
pub fn char_range(low: char, high: char) -> Matcher {
    Matcher::Item(ItemPred::CharRange(low, high))
}

/// Deferred semantic action.
pub fn action(expr: Expr) -> Matcher {
    Matcher::Action(Rc::new(expr))
}

/// Sequence matching the characters of `text` one by one.
pub fn chars(text: &str) -> Matcher {
    seq(text.chars().map(eq_char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Runtime;
    use crate::rules::RuleTable;
    use crate::stream::{Stream, Subject};

    #[test]
    fn test_descriptions() {
        assert_eq!(ItemPred::Any.description(), "any");
        assert_eq!(ItemPred::Eq(Value::Char('x')).description(), "'x'");
        assert_eq!(ItemPred::CharRange('a', 'z').description(), "'a'-'z'");
    }

    #[test]
    fn test_chars_matches_literal_text() {
        let rules = RuleTable::new();
        let mut stream = Stream::new(Subject::from_text("true!"), &rules);
        assert!(chars("true").run(&mut stream).is_ok());
        assert_eq!(stream.index(), 4);
    }

    #[test]
    fn test_bind_then_action_lookup() {
        use crate::action::Expr;
        let rules = RuleTable::new();
        let grammar = scope(seq(vec![
            bind("x", eq_char('a')),
            action(Expr::format(vec![
                Expr::lookup("x"),
                Expr::text("!"),
            ])),
        ]));
        let mut stream = Stream::new(Subject::from_text("a"), &rules);
        let action = grammar.run(&mut stream).expect("match");
        assert_eq!(
            action.eval(&Runtime::new()).expect("eval"),
            Value::str("a!")
        );
    }

    #[test]
    fn test_serializes_to_json() {
        let grammar = choice(vec![seq(vec![eq_char('a'), star(char_range('0', '9'))])]);
        let json = serde_json::to_string(&grammar).expect("serialize");
        assert!(json.contains("CharRange"));
        assert!(json.contains("Star"));
    }
}
