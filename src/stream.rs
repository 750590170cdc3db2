//! The matching cursor and its primitive operations
//!
//! A [`Stream`] is the single mutation context for one matching attempt:
//! the subject sequence, a cursor, the list-descent coordinates, the
//! active lexical scope and the best failure seen so far. Every grammar
//! construct bottoms out in one of the primitives here; ordered choice,
//! repetition and negative lookahead are the only constructs that turn a
//! failure back into matching by restoring the cursor.

use crate::action::{new_scope, Scope, SemanticAction};
use crate::range::Range;
use crate::rules::{Match, RuleTable};
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

/// Default maximum rule-invocation depth
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Result of running one matcher.
pub type MatchResult = Result<SemanticAction, MatchError>;

/// The subject of a matching attempt: a sequence of characters or a
/// (possibly nested) sequence of values.
#[derive(Debug, Clone)]
pub enum Subject {
    /// Text input, indexed by character
    Chars(Rc<Vec<char>>),
    /// List input (the bridge format), indexed by element
    Items(Rc<RefCell<Vec<Value>>>),
}

impl Subject {
    /// Subject over the characters of `text`.
    pub fn from_text(text: &str) -> Subject {
        Subject::Chars(Rc::new(text.chars().collect()))
    }

    /// Subject over a value: text, a list, or a node (linearized into the
    /// bridge format). Other values are not matchable sequences.
    pub fn from_value(value: &Value) -> Option<Subject> {
        match value {
            Value::Str(s) => Some(Subject::from_text(s)),
            Value::List(items) => Some(Subject::Items(Rc::clone(items))),
            Value::Node(node) => Subject::from_value(&node.as_list()),
            _ => None,
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        match self {
            Subject::Chars(chars) => chars.len(),
            Subject::Items(items) => items.borrow().len(),
        }
    }

    /// Whether the subject has no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Subject::Chars(chars) => chars.get(index).map(|c| Value::Char(*c)),
            Subject::Items(items) => items.borrow().get(index).cloned(),
        }
    }

    /// The underlying text, when this is a character subject.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Subject::Chars(chars) => Some(chars.iter().collect()),
            Subject::Items(_) => None,
        }
    }

    /// Structural JSON projection (for diagnostics dumps).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Subject::Chars(chars) => {
                serde_json::Value::String(chars.iter().collect::<String>())
            }
            Subject::Items(items) => serde_json::Value::Array(
                items.borrow().iter().map(Value::to_json).collect(),
            ),
        }
    }
}

/// A recoverable match failure.
///
/// Carries the globally furthest failure recorded on the stream, ranked
/// lexicographically by `(nesting, index)`, not merely the most local
/// one; the carried payload is advisory and never changes matching
/// outcomes.
#[derive(Debug, Clone)]
pub struct MatchError {
    /// Failure description (e.g. `expected 'x'`)
    pub message: String,
    /// The subject the failure was recorded against
    pub items: Subject,
    /// Cursor position of the failure
    pub index: usize,
    /// List-descent coordinates of the failure
    pub nesting: Vec<usize>,
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MatchError {}

/// Limits guarding the recursive interpreter.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Maximum nested rule invocations before a match attempt is failed
    pub max_recursion_depth: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl StreamConfig {
    /// Config with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum rule-invocation depth.
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }
}

/// Matching cursor over a subject, tied to a frozen rule table.
pub struct Stream<'a> {
    items: Subject,
    index: usize,
    nesting: Vec<usize>,
    scope: Option<Scope>,
    latest_error: Option<MatchError>,
    rules: &'a RuleTable,
    depth: usize,
    config: StreamConfig,
}

impl<'a> Stream<'a> {
    /// Stream over `items` resolving rule references in `rules`.
    pub fn new(items: Subject, rules: &'a RuleTable) -> Self {
        Self::with_config(items, rules, StreamConfig::default())
    }

    /// Stream with explicit limits.
    pub fn with_config(items: Subject, rules: &'a RuleTable, config: StreamConfig) -> Self {
        Self {
            items,
            index: 0,
            nesting: Vec::new(),
            scope: None,
            latest_error: None,
            rules,
            depth: 0,
            config,
        }
    }

    /// Current cursor position.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Ordered choice: first alternative to match wins; the cursor is
    /// restored before each retry.
    pub fn operator_or(&mut self, matchers: &[&dyn Match]) -> MatchResult {
        for matcher in matchers {
            let backtrack_index = self.index;
            match matcher.run(self) {
                Ok(action) => return Ok(action),
                Err(_) => self.index = backtrack_index,
            }
        }
        self.error("no or match")
    }

    /// Sequence: failure propagates immediately; the overall value is the
    /// last matcher's (bound names accumulate in the active scope).
    pub fn operator_and(&mut self, matchers: &[&dyn Match]) -> MatchResult {
        let mut result = self.action();
        for matcher in matchers {
            result = matcher.run(self)?;
        }
        Ok(result)
    }

    /// Greedy zero-or-more; stopping is success. Yields the list of
    /// per-iteration values, evaluated when the returned action is.
    pub fn operator_star(&mut self, matcher: &dyn Match) -> MatchResult {
        let mut results = Vec::new();
        loop {
            let backtrack_index = self.index;
            match matcher.run(self) {
                Ok(action) => results.push(action),
                Err(_) => {
                    self.index = backtrack_index;
                    return Ok(SemanticAction::sequence(self.scope.clone(), results));
                }
            }
        }
    }

    /// Zero-width negative lookahead: succeeds iff the inner matcher
    /// fails; the cursor is restored regardless of outcome.
    pub fn operator_not(&mut self, matcher: &dyn Match) -> MatchResult {
        let backtrack_index = self.index;
        let result = matcher.run(self);
        self.index = backtrack_index;
        match result {
            Ok(_) => self.error("not matched"),
            Err(_) => Ok(self.action()),
        }
    }

    /// An empty action capturing the current scope.
    pub fn action(&self) -> SemanticAction {
        SemanticAction::constant(self.scope.clone(), Value::Null)
    }

    /// A deferred user-expression action capturing the current scope.
    pub fn action_eval(&mut self, expr: impl Into<Rc<crate::action::Expr>>) -> MatchResult {
        Ok(SemanticAction::expr(self.scope.clone(), expr.into()))
    }

    /// Run `matcher` inside a fresh lexical scope; bindings made inside
    /// do not leak into sibling alternatives.
    pub fn with_scope(&mut self, matcher: &dyn Match) -> MatchResult {
        let saved = self.scope.clone();
        self.scope = Some(new_scope());
        let result = matcher.run(self);
        self.scope = saved;
        result
    }

    /// Record `action` under `name` in the current scope (last write
    /// wins within one scope).
    pub fn bind(&mut self, name: &str, action: SemanticAction) -> MatchResult {
        match &self.scope {
            Some(scope) => {
                scope
                    .borrow_mut()
                    .insert(name.to_string(), action.clone());
                Ok(action)
            }
            None => self.error("bind outside scope"),
        }
    }

    /// Descend one level into a list-shaped item at the cursor; inside,
    /// the subject becomes that item with the cursor reset to zero and
    /// one more nesting coordinate. The outer cursor advances past the
    /// item on success.
    pub fn match_list(&mut self, matcher: &dyn Match) -> MatchResult {
        if let Some(Value::List(inner)) = self.items.get(self.index) {
            let outer_items = std::mem::replace(&mut self.items, Subject::Items(inner));
            let outer_index = self.index;
            self.index = 0;
            self.nesting.push(outer_index);
            let result = matcher.run(self);
            self.nesting.pop();
            self.items = outer_items;
            self.index = if result.is_ok() {
                outer_index + 1
            } else {
                outer_index
            };
            return result;
        }
        self.error("no list found")
    }

    /// Run `matcher` and yield the range its cursor movement covered.
    pub fn match_range(&mut self, matcher: &dyn Match) -> MatchResult {
        let start = self.index;
        matcher.run(self)?;
        let end = self.index;
        Ok(SemanticAction::range(
            self.scope.clone(),
            Range::new(start, end),
        ))
    }

    /// Read the item at the cursor as a rule name and invoke
    /// `"namespace.name"` (the `%` operator).
    pub fn match_call_rule(&mut self, namespace: &str) -> MatchResult {
        if let Some(item) = self.items.get(self.index) {
            if let Some(name) = item.as_str() {
                let qualified = format!("{}.{}", namespace, name);
                if let Some(rule) = self.rules.get(&qualified) {
                    log_debug!("call rule {}", qualified);
                    self.index += 1;
                    self.enter_rule()?;
                    let result = rule.run(self);
                    self.exit_rule();
                    return result;
                }
            }
        }
        self.error("unknown rule")
    }

    /// Invoke a rule by qualified name.
    pub fn match_rule(&mut self, name: &str) -> MatchResult {
        match self.rules.get(name) {
            Some(rule) => {
                log_debug!("rule {} at {}", name, self.index);
                self.enter_rule()?;
                let result = rule.run(self);
                self.exit_rule();
                result
            }
            None => self.error(format!("unknown rule '{}'", name)),
        }
    }

    /// Atomic one-item consumption: succeeds iff the cursor is in range
    /// and `predicate` holds on the item there.
    pub fn match_item(
        &mut self,
        predicate: &dyn Fn(&Value) -> bool,
        description: &str,
    ) -> MatchResult {
        if let Some(item) = self.items.get(self.index) {
            if predicate(&item) {
                self.index += 1;
                return Ok(SemanticAction::constant(self.scope.clone(), item));
            }
        }
        self.error(format!("expected {}", description))
    }

    /// Record a failure at the current position and raise.
    ///
    /// The stored error is only replaced when the candidate position is
    /// strictly further (lexicographically by `(nesting, index)`); the
    /// raised error always carries the furthest failure seen on this
    /// stream, which is what makes the final diagnostic useful.
    pub fn error(&mut self, message: impl Into<String>) -> MatchResult {
        let candidate = MatchError {
            message: message.into(),
            items: self.items.clone(),
            index: self.index,
            nesting: self.nesting.clone(),
        };
        match &mut self.latest_error {
            Some(err)
                if (err.nesting.as_slice(), err.index)
                    >= (candidate.nesting.as_slice(), candidate.index) =>
            {
                Err(err.clone())
            }
            slot => {
                *slot = Some(candidate.clone());
                Err(candidate)
            }
        }
    }

    fn enter_rule(&mut self) -> Result<(), MatchError> {
        if self.depth >= self.config.max_recursion_depth {
            return self.error("recursion limit exceeded").map(|_| ());
        }
        self.depth += 1;
        Ok(())
    }

    fn exit_rule(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Runtime;
    use crate::matcher::{any_item, char_range, choice, eq_char, seq, star};
    use crate::rules::Match;

    fn text_stream<'a>(text: &str, rules: &'a RuleTable) -> Stream<'a> {
        Stream::new(Subject::from_text(text), rules)
    }

    fn eval(action: SemanticAction) -> Value {
        action.eval(&Runtime::new()).expect("eval")
    }

    #[test]
    fn test_match_item_consumes_and_yields_item() {
        let rules = RuleTable::new();
        let mut stream = text_stream("ab", &rules);
        let action = stream
            .match_item(&|item| item.is_char('a'), "'a'")
            .expect("match");
        assert_eq!(stream.index(), 1);
        assert_eq!(eval(action), Value::Char('a'));
    }

    #[test]
    fn test_match_item_failure_reports_description() {
        let rules = RuleTable::new();
        let mut stream = text_stream("b", &rules);
        let err = stream
            .match_item(&|item| item.is_char('a'), "'a'")
            .unwrap_err();
        assert_eq!(err.message, "expected 'a'");
        assert_eq!(err.index, 0);
    }

    #[test]
    fn test_ordered_choice_first_match_wins() {
        let rules = RuleTable::new();
        let grammar = choice(vec![eq_char('a'), char_range('a', 'z')]);
        // Both alternatives can match; re-running always picks the first.
        for _ in 0..3 {
            let mut stream = text_stream("a", &rules);
            let action = grammar.run(&mut stream).expect("match");
            assert_eq!(eval(action), Value::Char('a'));
            assert_eq!(stream.index(), 1);
        }
    }

    #[test]
    fn test_or_backtracks_index_between_alternatives() {
        let rules = RuleTable::new();
        // First alternative consumes 'a' then fails on 'x'; second must
        // start over from the original position.
        let grammar = choice(vec![
            seq(vec![eq_char('a'), eq_char('x')]),
            seq(vec![eq_char('a'), eq_char('b')]),
        ]);
        let mut stream = text_stream("ab", &rules);
        grammar.run(&mut stream).expect("match");
        assert_eq!(stream.index(), 2);
    }

    #[test]
    fn test_star_is_greedy_and_backtracks_cleanly() {
        let rules = RuleTable::new();
        let grammar = star(char_range('a', 'z'));
        let mut stream = text_stream("abc1", &rules);
        let action = grammar.run(&mut stream).expect("star never fails");
        assert_eq!(stream.index(), 3);
        assert_eq!(
            eval(action),
            Value::list(vec![
                Value::Char('a'),
                Value::Char('b'),
                Value::Char('c')
            ])
        );
    }

    #[test]
    fn test_star_on_no_match_yields_empty_list() {
        let rules = RuleTable::new();
        let mut stream = text_stream("1", &rules);
        let action = star(char_range('a', 'z')).run(&mut stream).expect("ok");
        assert_eq!(stream.index(), 0);
        assert_eq!(eval(action), Value::list(vec![]));
    }

    #[test]
    fn test_not_restores_index_on_both_outcomes() {
        let rules = RuleTable::new();
        let grammar = crate::matcher::not_(eq_char('a'));
        let mut stream = text_stream("b", &rules);
        assert!(grammar.run(&mut stream).is_ok());
        assert_eq!(stream.index(), 0);
        let mut stream = text_stream("a", &rules);
        let err = grammar.run(&mut stream).unwrap_err();
        assert_eq!(err.message, "not matched");
        assert_eq!(stream.index(), 0);
    }

    #[test]
    fn test_partial_consumption_restored_after_failed_branch() {
        let rules = RuleTable::new();
        let inner = seq(vec![eq_char('a'), eq_char('b'), eq_char('x')]);
        let mut stream = text_stream("abc", &rules);
        let before = stream.index();
        assert!(choice(vec![inner]).run(&mut stream).is_err());
        assert_eq!(stream.index(), before);
    }

    #[test]
    fn test_error_keeps_furthest_failure() {
        let rules = RuleTable::new();
        let grammar = choice(vec![
            seq(vec![eq_char('a'), eq_char('b'), eq_char('x')]),
            seq(vec![eq_char('z')]),
        ]);
        let mut stream = text_stream("abc", &rules);
        let err = grammar.run(&mut stream).unwrap_err();
        // The deepest attempt got to index 2 before failing on 'x'.
        assert_eq!(err.index, 2);
        assert_eq!(err.message, "expected 'x'");
    }

    #[test]
    fn test_match_list_descends_and_advances_outer_cursor() {
        let rules = RuleTable::new();
        let subject = Subject::from_value(&Value::list(vec![
            Value::list(vec![Value::Char('a')]),
            Value::Char('z'),
        ]))
        .expect("list");
        let mut stream = Stream::new(subject, &rules);
        let grammar = crate::matcher::match_list(seq(vec![eq_char('a'), not_any()]));
        assert!(grammar.run(&mut stream).is_ok());
        assert_eq!(stream.index(), 1);
    }

    fn not_any() -> crate::matcher::Matcher {
        crate::matcher::not_(any_item())
    }

    #[test]
    fn test_match_list_error_ranking_uses_nesting() {
        let rules = RuleTable::new();
        // Failure inside the nested list must outrank an earlier failure
        // at the same top-level index.
        let subject = Subject::from_value(&Value::list(vec![Value::list(vec![
            Value::Char('a'),
            Value::Char('b'),
        ])]))
        .expect("list");
        let mut stream = Stream::new(subject, &rules);
        let grammar = choice(vec![
            eq_char('q'),
            crate::matcher::match_list(seq(vec![eq_char('a'), eq_char('x')])),
        ]);
        let err = grammar.run(&mut stream).unwrap_err();
        assert_eq!(err.nesting, vec![0]);
        assert_eq!(err.index, 1);
        assert_eq!(err.message, "expected 'x'");
    }

    #[test]
    fn test_match_range_spans_cursor_movement() {
        let rules = RuleTable::new();
        let grammar = crate::matcher::match_range(star(char_range('a', 'z')));
        let mut stream = text_stream("abc!", &rules);
        let action = grammar.run(&mut stream).expect("match");
        assert_eq!(eval(action), Value::Range(Range::new(0, 3)));
    }

    #[test]
    fn test_match_call_rule_dispatches_on_item() {
        let mut rules = RuleTable::new();
        rules.define("Test.greeting", eq_char('h'));
        let subject =
            Subject::from_value(&Value::list(vec![Value::str("greeting"), Value::Char('h')]))
                .expect("list");
        let mut stream = Stream::new(subject, &rules);
        assert!(stream.match_call_rule("Test").is_ok());
        assert_eq!(stream.index(), 2);

        let mut stream = Stream::new(
            Subject::from_value(&Value::list(vec![Value::str("missing")])).expect("list"),
            &rules,
        );
        let err = stream.match_call_rule("Test").unwrap_err();
        assert_eq!(err.message, "unknown rule");
    }

    #[test]
    fn test_recursion_limit_fails_the_match() {
        let mut rules = RuleTable::new();
        // loop = loop (left recursion, would never terminate unguarded)
        rules.define("Test.loop", crate::matcher::call("Test.loop"));
        let config = StreamConfig::new().with_max_recursion_depth(50);
        let mut stream =
            Stream::with_config(Subject::from_text("x"), &rules, config);
        let err = stream.match_rule("Test.loop").unwrap_err();
        assert_eq!(err.message, "recursion limit exceeded");
    }

    #[test]
    fn test_scope_isolated_between_alternatives() {
        use crate::action::Expr;
        use crate::matcher::{action, bind, scope as scoped};
        let rules = RuleTable::new();
        // First alternative binds x then fails; second must not see it.
        let grammar = choice(vec![
            scoped(seq(vec![
                bind("x", eq_char('a')),
                eq_char('z'),
            ])),
            scoped(seq(vec![
                eq_char('a'),
                eq_char('b'),
                action(Expr::lookup("x")),
            ])),
        ]);
        let mut stream = text_stream("ab", &rules);
        let action = grammar.run(&mut stream).expect("second alternative");
        assert!(action.eval(&Runtime::new()).is_err());
    }
}
