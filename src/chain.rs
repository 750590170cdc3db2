//! Staged compilation pipeline
//!
//! [`compile_chain`] threads a subject through a sequence of named rules:
//! each stage matches the previous stage's output on a fresh stream and
//! evaluates the resulting semantic action. An unrecovered match failure
//! becomes a [`CompileError`] carrying a rendered diagnostic; whether
//! that terminates the process is the caller's decision (the CLI exits,
//! an interactive caller substitutes a fallback tree).

use crate::action::{indent, EvalError, Runtime};
use crate::loader::GrammarError;
use crate::rules::RuleTable;
use crate::stream::{MatchError, Stream, StreamConfig, Subject};
use crate::value::Value;
use std::fmt;

/// Marker spliced into text subjects at the failure position.
pub const ERROR_MARKER: &str = "<ERROR POSITION>";

/// An unrecoverable failure of a compilation pipeline.
#[derive(Debug, Clone)]
pub enum CompileError {
    /// A stage's top-level rule failed to match
    Match {
        /// Description of the furthest failure
        message: String,
        /// Cursor position of the failure
        index: usize,
        /// List-descent coordinates of the failure
        nesting: Vec<usize>,
        /// The failing subject with the position marked (text subjects)
        /// or structurally dumped (list subjects)
        stream: String,
    },
    /// A semantic action faulted (a grammar bug, not an input property)
    Eval(EvalError),
    /// A grammar definition could not be assembled
    Grammar(GrammarError),
    /// A stage produced or received a value that is not a matchable
    /// subject or not the shape the caller required
    BadSubject {
        /// What was required
        expected: &'static str,
    },
}

impl CompileError {
    /// Build the diagnostic for a failed stage.
    pub fn from_match(err: MatchError) -> Self {
        let stream = match err.items.as_text() {
            Some(text) => {
                let mut marked: String = text.chars().take(err.index).collect();
                marked.push_str(ERROR_MARKER);
                marked.extend(text.chars().skip(err.index));
                marked
            }
            None => serde_json::to_string_pretty(&err.items.to_json())
                .unwrap_or_else(|_| "<unprintable subject>".to_string()),
        };
        CompileError::Match {
            message: err.message,
            index: err.index,
            nesting: err.nesting,
            stream,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Match {
                message,
                index,
                nesting,
                stream,
            } => {
                write!(f, "ERROR: {}\nPOSITION: {}", message, index)?;
                if !nesting.is_empty() {
                    write!(f, " (nesting {:?})", nesting)?;
                }
                write!(f, "\nSTREAM:\n{}", indent(stream, "    "))
            }
            CompileError::Eval(err) => write!(f, "ERROR: {}", err),
            CompileError::Grammar(err) => write!(f, "ERROR: {}", err),
            CompileError::BadSubject { expected } => {
                write!(f, "ERROR: expected {}", expected)
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<EvalError> for CompileError {
    fn from(err: EvalError) -> Self {
        CompileError::Eval(err)
    }
}

impl From<GrammarError> for CompileError {
    fn from(err: GrammarError) -> Self {
        CompileError::Grammar(err)
    }
}

/// Thread `subject` through `rule_names` in order.
///
/// Each stage runs on a fresh stream over the previous stage's output; a
/// stage output that is a node is linearized into the bridge format
/// before feeding the next stage.
pub fn compile_chain(
    rules: &RuleTable,
    rule_names: &[&str],
    subject: Value,
) -> Result<Value, CompileError> {
    compile_chain_with_config(rules, rule_names, subject, StreamConfig::default())
}

/// [`compile_chain`] with explicit stream limits.
pub fn compile_chain_with_config(
    rules: &RuleTable,
    rule_names: &[&str],
    subject: Value,
    config: StreamConfig,
) -> Result<Value, CompileError> {
    let runtime = Runtime::new();
    let mut subject = subject;
    for name in rule_names {
        let items = Subject::from_value(&subject).ok_or(CompileError::BadSubject {
            expected: "text, a list or a node",
        })?;
        let mut stream = Stream::with_config(items, rules, config);
        let action = stream.match_rule(name).map_err(CompileError::from_match)?;
        subject = action.eval(&runtime)?;
    }
    Ok(subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap;

    fn bootstrap_rules() -> RuleTable {
        let mut rules = RuleTable::new();
        bootstrap::register(&mut rules);
        rules
    }

    #[test]
    fn test_chain_runs_stages_in_order() {
        let rules = bootstrap_rules();
        let out = compile_chain(
            &rules,
            &["Parser.file", "CodeGenerator.astInner"],
            Value::str("G { r = . }"),
        )
        .expect("compile");
        assert!(out.as_str().expect("text").contains("register_G"));
    }

    #[test]
    fn test_chain_marks_error_position_in_text() {
        let rules = bootstrap_rules();
        let err = compile_chain(&rules, &["Parser.file"], Value::str("G { r = ) }"))
            .expect_err("malformed grammar");
        let rendered = err.to_string();
        assert!(rendered.contains("ERROR:"));
        assert!(rendered.contains("POSITION: 8"));
        assert!(rendered.contains("G { r = <ERROR POSITION>) }"));
    }

    #[test]
    fn test_chain_dumps_list_subjects_structurally() {
        let rules = bootstrap_rules();
        let err = compile_chain(
            &rules,
            &["CodeGenerator.astInner"],
            Value::list(vec![Value::str("NoSuchConstruct")]),
        )
        .expect_err("unknown construct");
        let rendered = err.to_string();
        assert!(rendered.contains("NoSuchConstruct"));
        assert!(rendered.contains("unknown rule"));
    }

    #[test]
    fn test_chain_rejects_unmatchable_subject() {
        let rules = bootstrap_rules();
        let err = compile_chain(&rules, &["Parser.file"], Value::Int(1)).expect_err("bad");
        assert!(matches!(err, CompileError::BadSubject { .. }));
    }

    #[test]
    fn test_chain_unknown_rule_is_a_match_error() {
        let rules = bootstrap_rules();
        let err =
            compile_chain(&rules, &["Missing.rule"], Value::str("")).expect_err("missing");
        assert!(err.to_string().contains("unknown rule 'Missing.rule'"));
    }
}
