//! Rule registry
//!
//! Compiled matchers register here under `"Namespace.rule"` names. The
//! table is populated while grammars load, then passed by shared
//! reference into every [`Stream`](crate::stream::Stream); the intended
//! lifecycle is "load all grammars, then match", never interleaved.

use crate::stream::{MatchResult, Stream};
use hashbrown::HashMap;
use std::rc::Rc;

/// One compiled matching unit: a primitive or composite grammar
/// construct run against a stream.
pub trait Match {
    /// Attempt to match at the stream's cursor, producing a deferred
    /// semantic action on success.
    fn run(&self, stream: &mut Stream) -> MatchResult;
}

impl<M: Match + ?Sized> Match for &M {
    fn run(&self, stream: &mut Stream) -> MatchResult {
        (**self).run(stream)
    }
}

impl<M: Match + ?Sized> Match for Rc<M> {
    fn run(&self, stream: &mut Stream) -> MatchResult {
        (**self).run(stream)
    }
}

/// Namespace-qualified registry of compiled matchers.
#[derive(Default)]
pub struct RuleTable {
    rules: HashMap<String, Rc<dyn Match>>,
}

impl RuleTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `matcher` under `name` (`"Namespace.rule"`).
    ///
    /// Registration is additive; redefining a name replaces the previous
    /// matcher.
    pub fn define(&mut self, name: impl Into<String>, matcher: impl Match + 'static) {
        self.rules.insert(name.into(), Rc::new(matcher));
    }

    /// Look up a rule by qualified name.
    pub fn get(&self, name: &str) -> Option<Rc<dyn Match>> {
        self.rules.get(name).map(Rc::clone)
    }

    /// Whether a rule is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
