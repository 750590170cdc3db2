//! Language bundles
//!
//! A [`Language`] packages a loaded rule table with the names of its
//! parse and pretty rules, exposing the two-function surface an editor
//! or build step consumes: `parse(text) -> tree` and
//! `pretty(tree) -> text` (tokenization comes from
//! [`Node::tokenize`](crate::node::Node::tokenize) on the parsed tree).
//!
//! An interactive caller that wants to survive unparsable input catches
//! the error and substitutes a one-node fallback, e.g.
//! `Node::new("Unknown", Range::new(0, text.len()), Value::Null, vec![])`.

use crate::bootstrap;
use crate::chain::{compile_chain, CompileError};
use crate::grammar_pretty;
use crate::loader::load_grammar;
use crate::node::Node;
use crate::rules::RuleTable;
use crate::value::Value;
use std::rc::Rc;

/// The JSON example grammar.
pub const JSON_GRAMMAR: &str = include_str!("grammars/json.rlmeta");

/// The JSON pretty-printer grammar.
pub const JSON_PRETTY_GRAMMAR: &str = include_str!("grammars/json_pretty.rlmeta");

/// The toolkit's own grammar file (`Parser` + `CodeGenerator` in surface
/// syntax); compiling it regenerates the bootstrap matchers.
pub const RLMETA_GRAMMAR: &str = include_str!("grammars/rlmeta.rlmeta");

/// A parse/pretty pair over one loaded rule table.
pub struct Language {
    rules: RuleTable,
    parse_rule: &'static str,
    pretty_rule: &'static str,
}

impl Language {
    /// The JSON language: `JsonParser.file` / `JsonPrettyPrinter.pretty`.
    pub fn json() -> Result<Language, CompileError> {
        let mut rules = RuleTable::new();
        bootstrap::register(&mut rules);
        load_grammar(JSON_GRAMMAR, &mut rules)?;
        load_grammar(JSON_PRETTY_GRAMMAR, &mut rules)?;
        Ok(Language {
            rules,
            parse_rule: "JsonParser.file",
            pretty_rule: "JsonPrettyPrinter.pretty",
        })
    }

    /// The grammar language itself: `Parser.file` /
    /// `GrammarPrettyPrinter.pretty`.
    pub fn grammar() -> Language {
        let mut rules = RuleTable::new();
        bootstrap::register(&mut rules);
        grammar_pretty::register(&mut rules);
        Language {
            rules,
            parse_rule: "Parser.file",
            pretty_rule: "GrammarPrettyPrinter.pretty",
        }
    }

    /// Parse `text` into a tree.
    pub fn parse(&self, text: &str) -> Result<Rc<Node>, CompileError> {
        let out = compile_chain(&self.rules, &[self.parse_rule], Value::str(text))?;
        match out.as_node() {
            Some(node) => Ok(Rc::clone(node)),
            None => Err(CompileError::BadSubject {
                expected: "a node from the parse rule",
            }),
        }
    }

    /// Render `tree` back to text (runs the pretty rule over the tree's
    /// bridge-format list).
    pub fn pretty(&self, tree: &Rc<Node>) -> Result<String, CompileError> {
        let out = compile_chain(&self.rules, &[self.pretty_rule], tree.as_list())?;
        match out.as_str() {
            Some(text) => Ok(text.to_string()),
            None => Err(CompileError::BadSubject {
                expected: "text from the pretty rule",
            }),
        }
    }

    /// The loaded rule table.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }
}
