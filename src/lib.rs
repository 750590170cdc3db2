//! rlmeta - a self-hosting PEG matcher toolkit
//!
//! A grammar language in the PEG family (ordered choice, backtracking,
//! negative lookahead) with semantic actions, list descent and range
//! capture; a stream interpreter for grammars loaded at runtime; and a
//! code generator that turns a parsed grammar into standalone Rust
//! matcher source. The toolkit's own parser and code generator are
//! written in the same matcher vocabulary they compile
//! (`src/grammars/rlmeta.rlmeta` is the surface-syntax original).
//!
//! ## Quick start
//!
//! ```rust
//! use rlmeta::Language;
//!
//! let json = Language::json().unwrap();
//! let tree = json.parse("[1, 2]").unwrap();
//! assert_eq!(tree.name(), "Document");
//! assert_eq!(json.pretty(&tree).unwrap(), "[\n    1,\n    2\n]\n");
//! ```
//!
//! ## Loading a grammar at runtime
//!
//! ```rust
//! use rlmeta::{bootstrap, compile_chain, load_grammar, RuleTable, Value};
//!
//! let mut rules = RuleTable::new();
//! bootstrap::register(&mut rules);
//! load_grammar("Digits { all = <digit*>:r !. -> r digit = '0'-'9' }", &mut rules).unwrap();
//! let out = compile_chain(&rules, &["Digits.all"], Value::str("473")).unwrap();
//! ```
//!
//! Everything is single-threaded by design: streams own their cursor and
//! scope state, node trees are immutable after construction, and the
//! rule table is populated while grammars load and then only read.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod bootstrap;
pub mod chain;
pub mod grammar_pretty;
pub mod languages;
pub mod loader;
pub mod matcher;
pub mod node;
pub mod range;
pub mod rules;
pub mod stream;
pub mod support;
pub mod value;

pub use action::{Builtin, EvalError, Expr, Runtime, Scope, SemanticAction};
pub use chain::{compile_chain, compile_chain_with_config, CompileError, ERROR_MARKER};
pub use languages::{Language, JSON_GRAMMAR, JSON_PRETTY_GRAMMAR, RLMETA_GRAMMAR};
pub use loader::{load_grammar, GrammarError};
pub use matcher::{ItemPred, Matcher};
pub use node::{Node, Token};
pub use range::Range;
pub use rules::{Match, RuleTable};
pub use stream::{MatchError, MatchResult, Stream, StreamConfig, Subject};
pub use support::SUPPORT;
pub use value::Value;
