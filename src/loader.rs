//! Grammar loading
//!
//! Assembles a parsed grammar AST (bridge-format lists) into [`Matcher`]
//! data and registers every rule into a [`RuleTable`]. This is the
//! in-process twin of the code generator: the same AST contract, built
//! into interpretable structures instead of source text.

use crate::action::Expr;
use crate::chain::{compile_chain, CompileError};
use crate::matcher::{ItemPred, Matcher};
use crate::rules::RuleTable;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// A structurally invalid grammar AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// The AST did not have the expected shape
    Malformed {
        /// What went wrong
        reason: String,
    },
    /// An AST node kind without an assembly rule
    UnknownConstruct {
        /// The unrecognized node name
        construct: String,
    },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::Malformed { reason } => write!(f, "malformed grammar: {}", reason),
            GrammarError::UnknownConstruct { construct } => {
                write!(f, "unknown grammar construct '{}'", construct)
            }
        }
    }
}

impl std::error::Error for GrammarError {}

fn malformed(reason: impl Into<String>) -> GrammarError {
    GrammarError::Malformed {
        reason: reason.into(),
    }
}

/// Parse `source` with the bootstrap parser and register every rule of
/// every namespace it defines.
///
/// The table must already contain the `Parser` grammar; new definitions
/// are only added after the whole source has parsed and assembled.
pub fn load_grammar(source: &str, rules: &mut RuleTable) -> Result<(), CompileError> {
    let ast = compile_chain(rules, &["Parser.file"], Value::str(source))?;
    let definitions = assemble_file(&ast)?;
    for (name, matcher) in definitions {
        rules.define(name, matcher);
    }
    Ok(())
}

/// Assemble a parsed grammar file into named matchers.
pub fn assemble_file(ast: &Value) -> Result<Vec<(String, Matcher)>, GrammarError> {
    let file = ast
        .as_node()
        .ok_or_else(|| malformed("expected a grammar file node"))?;
    let mut definitions = Vec::new();
    for namespace in file.children() {
        let name = namespace
            .value()
            .as_str()
            .ok_or_else(|| malformed("namespace without a name"))?;
        for rule in namespace.children() {
            let parts = rule
                .value()
                .as_list()
                .ok_or_else(|| malformed("rule without a [name, body] value"))?;
            let parts = parts.borrow();
            let rule_name = parts
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("rule without a name"))?;
            let body = parts
                .get(1)
                .ok_or_else(|| malformed("rule without a body"))?;
            definitions.push((format!("{}.{}", name, rule_name), assemble(body, name)?));
        }
    }
    Ok(definitions)
}

/// Assemble one grammar construct, resolving rule references against
/// `namespace`.
pub fn assemble(ast: &Value, namespace: &str) -> Result<Matcher, GrammarError> {
    let (head, rest) = split(ast)?;
    match head.as_str() {
        "Or" => Ok(Matcher::Or(assemble_each(&rest, namespace)?)),
        "And" => Ok(Matcher::And(assemble_each(&rest, namespace)?)),
        "Scope" => Ok(Matcher::Scope(Box::new(assemble(one(&head, &rest)?, namespace)?))),
        "Star" => Ok(Matcher::Star(Box::new(assemble(one(&head, &rest)?, namespace)?))),
        "Not" => Ok(Matcher::Not(Box::new(assemble(one(&head, &rest)?, namespace)?))),
        "Bind" => {
            let name = rest
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("Bind without a name"))?;
            let inner = rest.get(1).ok_or_else(|| malformed("Bind without a body"))?;
            Ok(Matcher::Bind(
                name.to_string(),
                Box::new(assemble(inner, namespace)?),
            ))
        }
        "MatchList" => Ok(Matcher::MatchList(Box::new(assemble(
            one(&head, &rest)?,
            namespace,
        )?))),
        "MatchRange" => Ok(Matcher::MatchRange(Box::new(assemble(
            one(&head, &rest)?,
            namespace,
        )?))),
        "MatchCallRule" => Ok(Matcher::CallByName(namespace.to_string())),
        "MatchRule" => {
            let name = rest
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("MatchRule without a name"))?;
            Ok(Matcher::Call(format!("{}.{}", namespace, name)))
        }
        "MatchObject" => Ok(Matcher::Item(assemble_pred(one(&head, &rest)?)?)),
        "Action" => Ok(Matcher::Action(Rc::new(assemble_expr(one(&head, &rest)?)?))),
        other => Err(GrammarError::UnknownConstruct {
            construct: other.to_string(),
        }),
    }
}

fn assemble_each(items: &[Value], namespace: &str) -> Result<Vec<Matcher>, GrammarError> {
    items.iter().map(|item| assemble(item, namespace)).collect()
}

fn assemble_pred(ast: &Value) -> Result<ItemPred, GrammarError> {
    let (head, rest) = split(ast)?;
    match head.as_str() {
        "Any" => Ok(ItemPred::Any),
        "Eq" => {
            let operand = rest.first().ok_or_else(|| malformed("Eq without operand"))?;
            Ok(ItemPred::Eq(normalize_char(operand)))
        }
        "Range" => {
            let low = char_operand("Range", rest.first())?;
            let high = char_operand("Range", rest.get(1))?;
            Ok(ItemPred::CharRange(low, high))
        }
        other => Err(GrammarError::UnknownConstruct {
            construct: other.to_string(),
        }),
    }
}

fn assemble_expr(ast: &Value) -> Result<Expr, GrammarError> {
    let (head, rest) = split(ast)?;
    match head.as_str() {
        "String" => {
            let text = rest
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("String without text"))?;
            Ok(Expr::text(text))
        }
        "Lookup" => {
            let name = rest
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("Lookup without a name"))?;
            Ok(Expr::lookup(name))
        }
        "Call" => {
            let callee = rest.first().ok_or_else(|| malformed("Call without callee"))?;
            let mut args = Vec::new();
            for arg in &rest[1..] {
                args.push(assemble_expr(arg)?);
            }
            Ok(Expr::call(assemble_expr(callee)?, args))
        }
        "List" => {
            let mut out = Vec::new();
            for item in &rest {
                out.push(assemble_list_item(item)?);
            }
            Ok(Expr::list(out))
        }
        "Format" => {
            let mut out = Vec::new();
            for item in &rest {
                out.push(assemble_expr(item)?);
            }
            Ok(Expr::format(out))
        }
        "Set" => {
            let name = rest
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("Set without a name"))?;
            let value = rest.get(1).ok_or_else(|| malformed("Set without a value"))?;
            let cont = rest
                .get(2)
                .ok_or_else(|| malformed("Set without a continuation"))?;
            Ok(Expr::set(
                name,
                assemble_expr(value)?,
                assemble_expr(cont)?,
            ))
        }
        other => Err(GrammarError::UnknownConstruct {
            construct: other.to_string(),
        }),
    }
}

fn assemble_list_item(ast: &Value) -> Result<Expr, GrammarError> {
    let (head, rest) = split(ast)?;
    if head != "ListItem" {
        return Err(GrammarError::UnknownConstruct { construct: head });
    }
    let depth = rest
        .first()
        .and_then(Value::as_int)
        .ok_or_else(|| malformed("ListItem without a depth"))?;
    let expr = rest
        .get(1)
        .ok_or_else(|| malformed("ListItem without an expression"))?;
    Ok(Expr::splice(depth as usize, assemble_expr(expr)?))
}

/// Split a construct list into its head name and remaining items.
fn split(ast: &Value) -> Result<(String, Vec<Value>), GrammarError> {
    let list = ast
        .as_list()
        .ok_or_else(|| malformed("expected a construct list"))?;
    let list = list.borrow();
    let head = list
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("construct list without a name head"))?;
    Ok((head.to_string(), list[1..].to_vec()))
}

fn one<'a>(head: &str, rest: &'a [Value]) -> Result<&'a Value, GrammarError> {
    rest.first()
        .ok_or_else(|| malformed(format!("{} without a body", head)))
}

/// Character operands parse as either chars or one-character strings
/// (escape actions yield strings); normalize to chars so item equality
/// works against character subjects.
fn normalize_char(v: &Value) -> Value {
    match v {
        Value::Str(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => v.clone(),
            }
        }
        other => other.clone(),
    }
}

fn char_operand(construct: &str, v: Option<&Value>) -> Result<char, GrammarError> {
    match v.map(normalize_char) {
        Some(Value::Char(c)) => Ok(c),
        _ => Err(malformed(format!("{} operand is not a character", construct))),
    }
}
