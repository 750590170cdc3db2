//! Semantic actions and the evaluation runtime
//!
//! Matching produces [`SemanticAction`]s, deferred computations closed
//! over the lexical scope that was active at the match site. They are
//! evaluated after the whole attempt has succeeded, against a [`Runtime`]
//! environment that supplies a fixed set of helper functions.
//!
//! Action bodies are data ([`Expr`]), not host closures: the grammar
//! loader assembles them from parsed grammar ASTs and the code generator
//! emits source text that rebuilds them, so the expression vocabulary has
//! to stay closed.

use crate::node::Node;
use crate::range::Range;
use crate::value::Value;
use hashbrown::HashMap;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Lexical scope: name to pending semantic action.
///
/// Shared and interior-mutable on purpose: an action captured early in a
/// sequence must observe bindings added later in the same scope.
pub type Scope = Rc<RefCell<HashMap<String, SemanticAction>>>;

/// Create a fresh empty scope.
pub fn new_scope() -> Scope {
    Rc::new(RefCell::new(HashMap::new()))
}

/// A fault raised while evaluating a semantic action.
///
/// These indicate bugs in a grammar (or in generated code), not
/// properties of the input; they never participate in backtracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A name was neither bound in scope nor known to the runtime
    UndefinedName {
        /// The looked-up name
        name: String,
    },
    /// A call target did not evaluate to a helper function
    NotCallable {
        /// The offending callee, rendered
        callee: String,
    },
    /// A helper received a value of the wrong shape
    TypeMismatch {
        /// The helper that rejected its argument
        helper: &'static str,
        /// What the helper expected
        expected: &'static str,
    },
    /// A helper received the wrong number of arguments
    BadArity {
        /// The helper that was called
        helper: &'static str,
        /// Number of arguments received
        got: usize,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UndefinedName { name } => write!(f, "undefined name '{}'", name),
            EvalError::NotCallable { callee } => write!(f, "'{}' is not callable", callee),
            EvalError::TypeMismatch { helper, expected } => {
                write!(f, "{} expected {}", helper, expected)
            }
            EvalError::BadArity { helper, got } => {
                write!(f, "{} called with {} arguments", helper, got)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// A semantic-action expression.
///
/// The variants correspond 1:1 to the host-expression constructs of the
/// grammar language: string literals, variable lookups, helper calls,
/// spliced list construction, format (string building) and let-style
/// runtime binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Literal text
    Text(String),
    /// Look a name up in scope, then in the runtime
    Lookup(String),
    /// Apply a helper to evaluated arguments
    Call(Box<Expr>, Vec<Expr>),
    /// Build a list; items are [`Expr::Splice`]s
    List(Vec<Expr>),
    /// Splice an item into an enclosing list at the given depth
    Splice(usize, Box<Expr>),
    /// Concatenate evaluated items into one string
    Format(Vec<Expr>),
    /// Bind a value into the runtime, then evaluate the continuation
    Set(String, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Literal text expression.
    pub fn text(s: impl Into<String>) -> Expr {
        Expr::Text(s.into())
    }

    /// Name lookup expression.
    pub fn lookup(name: impl Into<String>) -> Expr {
        Expr::Lookup(name.into())
    }

    /// Helper call expression.
    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call(Box::new(callee), args)
    }

    /// List construction expression.
    pub fn list(items: Vec<Expr>) -> Expr {
        Expr::List(items)
    }

    /// Splice item for a list construction.
    pub fn splice(depth: usize, expr: Expr) -> Expr {
        Expr::Splice(depth, Box::new(expr))
    }

    /// String building expression.
    pub fn format(items: Vec<Expr>) -> Expr {
        Expr::Format(items)
    }

    /// Runtime let-binding expression.
    pub fn set(name: impl Into<String>, value: Expr, cont: Expr) -> Expr {
        Expr::Set(name.into(), Box::new(value), Box::new(cont))
    }
}

/// The deferred computation carried by a semantic action.
#[derive(Debug, Clone)]
enum Thunk {
    /// A constant (a matched item, or null for empty actions)
    Value(Value),
    /// The extent captured by a range match
    Range(Range),
    /// Per-iteration actions collected by a repetition
    Sequence(Rc<Vec<SemanticAction>>),
    /// A user action expression
    Expr(Rc<Expr>),
}

/// A deferred computation closed over a lexical scope snapshot.
#[derive(Debug, Clone)]
pub struct SemanticAction {
    scope: Option<Scope>,
    thunk: Thunk,
}

impl SemanticAction {
    /// Action yielding a constant value.
    pub fn constant(scope: Option<Scope>, value: Value) -> Self {
        Self {
            scope,
            thunk: Thunk::Value(value),
        }
    }

    /// Action yielding a captured range.
    pub fn range(scope: Option<Scope>, range: Range) -> Self {
        Self {
            scope,
            thunk: Thunk::Range(range),
        }
    }

    /// Action yielding the values of `actions`, evaluated in order.
    pub fn sequence(scope: Option<Scope>, actions: Vec<SemanticAction>) -> Self {
        Self {
            scope,
            thunk: Thunk::Sequence(Rc::new(actions)),
        }
    }

    /// Action evaluating a user expression.
    pub fn expr(scope: Option<Scope>, expr: Rc<Expr>) -> Self {
        Self {
            scope,
            thunk: Thunk::Expr(expr),
        }
    }

    /// Evaluate against `runtime`, producing the action's value.
    pub fn eval(&self, runtime: &Runtime) -> Result<Value, EvalError> {
        match &self.thunk {
            Thunk::Value(v) => Ok(v.clone()),
            Thunk::Range(r) => Ok(Value::Range(*r)),
            Thunk::Sequence(actions) => {
                let mut out = Vec::with_capacity(actions.len());
                for action in actions.iter() {
                    out.push(action.eval(runtime)?);
                }
                Ok(Value::list(out))
            }
            Thunk::Expr(expr) => {
                let mut ctx = EvalContext {
                    scope: self.scope.clone(),
                    runtime: runtime.clone(),
                };
                ctx.eval(expr)
            }
        }
    }
}

/// Mutable evaluation state for one action body.
///
/// `Set` rebinds the runtime mid-expression; scope lookups that fire
/// afterwards must see the extended environment, so the runtime is
/// threaded through the context rather than passed down immutably.
struct EvalContext {
    scope: Option<Scope>,
    runtime: Runtime,
}

impl EvalContext {
    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Text(s) => Ok(Value::str(s.clone())),
            Expr::Lookup(name) => self.lookup(name),
            Expr::Call(callee, args) => {
                let target = self.eval(callee)?;
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval(arg)?);
                }
                match target {
                    Value::Builtin(builtin) => builtin.invoke(evaluated),
                    other => Err(EvalError::NotCallable {
                        callee: other.to_string(),
                    }),
                }
            }
            Expr::List(items) => {
                let mut out = Vec::new();
                for item in items {
                    match item {
                        Expr::Splice(depth, inner) => {
                            let v = self.eval(inner)?;
                            out.extend(splice(*depth, v)?);
                        }
                        other => out.push(self.eval(other)?),
                    }
                }
                Ok(Value::list(out))
            }
            Expr::Splice(_, inner) => self.eval(inner),
            Expr::Format(items) => {
                let mut evaluated = Vec::with_capacity(items.len());
                for item in items {
                    evaluated.push(self.eval(item)?);
                }
                Ok(Value::Str(join_slice(&evaluated, "")?))
            }
            Expr::Set(name, value, cont) => {
                let v = self.eval(value)?;
                self.runtime = self.runtime.bind(name, v);
                self.eval(cont)
            }
        }
    }

    fn lookup(&mut self, name: &str) -> Result<Value, EvalError> {
        let bound = match &self.scope {
            Some(scope) => scope.borrow().get(name).cloned(),
            None => None,
        };
        if let Some(action) = bound {
            return action.eval(&self.runtime);
        }
        self.runtime
            .lookup(name)
            .ok_or_else(|| EvalError::UndefinedName {
                name: name.to_string(),
            })
    }
}

/// Persistent name-to-value environment.
///
/// `bind` returns a new environment with shadowing and never mutates the
/// parent, so reentrant evaluation keeps proper nesting semantics.
#[derive(Debug, Clone, Default)]
pub struct Runtime {
    vars: HashMap<String, Value>,
}

impl Runtime {
    /// Empty environment; helper functions resolve through the builtin
    /// fallback rather than pre-seeded bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this environment with `name` bound to `value`.
    pub fn bind(&self, name: &str, value: Value) -> Runtime {
        let mut vars = self.vars.clone();
        vars.insert(name.to_string(), value);
        Runtime { vars }
    }

    /// Resolve `name`: user bindings shadow builtins.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.vars.get(name) {
            return Some(v.clone());
        }
        Builtin::by_name(name).map(Value::Builtin)
    }
}

/// The fixed set of runtime helper functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Flatten nested lists into one delimited string
    Join,
    /// Prefix every line of a text
    Indent,
    /// Wrap or unwrap list nesting by a depth
    Splice,
    /// One-level list flatten
    Concat,
    /// Column-align a list of rows
    Table,
    /// Construct a tree node
    MakeNode,
    /// Length of a list or string
    Len,
    /// Render a value as a source literal
    Repr,
    /// Convert text to an integer
    Int,
    /// Convert a one-character value to a character
    Chr,
    /// Push onto a shared list
    Append,
}

impl Builtin {
    /// Resolve a helper by its grammar-visible name.
    pub fn by_name(name: &str) -> Option<Builtin> {
        match name {
            "join" => Some(Builtin::Join),
            "indent" => Some(Builtin::Indent),
            "splice" => Some(Builtin::Splice),
            "concat" => Some(Builtin::Concat),
            "table" => Some(Builtin::Table),
            "Node" => Some(Builtin::MakeNode),
            "len" => Some(Builtin::Len),
            "repr" => Some(Builtin::Repr),
            "int" => Some(Builtin::Int),
            "chr" => Some(Builtin::Chr),
            "append" => Some(Builtin::Append),
            _ => None,
        }
    }

    /// The grammar-visible name of this helper.
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Join => "join",
            Builtin::Indent => "indent",
            Builtin::Splice => "splice",
            Builtin::Concat => "concat",
            Builtin::Table => "table",
            Builtin::MakeNode => "Node",
            Builtin::Len => "len",
            Builtin::Repr => "repr",
            Builtin::Int => "int",
            Builtin::Chr => "chr",
            Builtin::Append => "append",
        }
    }

    /// Apply this helper to evaluated arguments.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, EvalError> {
        match self {
            Builtin::Join => match args.len() {
                1 => Ok(Value::Str(join(&args[0], "")?)),
                2 => {
                    let delim = args[1].as_str().ok_or(EvalError::TypeMismatch {
                        helper: "join",
                        expected: "a string delimiter",
                    })?;
                    Ok(Value::Str(join(&args[0], delim)?))
                }
                got => Err(EvalError::BadArity { helper: "join", got }),
            },
            Builtin::Indent => match args.len() {
                1 => Ok(Value::Str(indent(expect_str("indent", &args[0])?, "    "))),
                2 => Ok(Value::Str(indent(
                    expect_str("indent", &args[0])?,
                    expect_str("indent", &args[1])?,
                ))),
                got => Err(EvalError::BadArity {
                    helper: "indent",
                    got,
                }),
            },
            Builtin::Splice => match args.len() {
                2 => {
                    let depth = args[0].as_int().ok_or(EvalError::TypeMismatch {
                        helper: "splice",
                        expected: "an integer depth",
                    })?;
                    Ok(Value::list(splice(depth as usize, args[1].clone())?))
                }
                got => Err(EvalError::BadArity {
                    helper: "splice",
                    got,
                }),
            },
            Builtin::Concat => match args.len() {
                1 => {
                    let lists = expect_list("concat", &args[0])?;
                    let mut out = Vec::new();
                    for item in lists.borrow().iter() {
                        let inner = expect_list("concat", item)?;
                        out.extend(inner.borrow().iter().cloned());
                    }
                    Ok(Value::list(out))
                }
                got => Err(EvalError::BadArity {
                    helper: "concat",
                    got,
                }),
            },
            Builtin::Table => match args.len() {
                1 => Ok(Value::Str(table(&args[0])?)),
                got => Err(EvalError::BadArity {
                    helper: "table",
                    got,
                }),
            },
            Builtin::MakeNode => match args.len() {
                3 | 4 => {
                    let name = expect_str("Node", &args[0])?.to_string();
                    let range = args[1].as_range().ok_or(EvalError::TypeMismatch {
                        helper: "Node",
                        expected: "a range",
                    })?;
                    let mut children = Vec::new();
                    if let Some(list) = args.get(3) {
                        let items = expect_list("Node", list)?;
                        for item in items.borrow().iter() {
                            let node = item.as_node().ok_or(EvalError::TypeMismatch {
                                helper: "Node",
                                expected: "a list of nodes",
                            })?;
                            children.push(Rc::clone(node));
                        }
                    }
                    Ok(Value::Node(Node::new(name, range, args[2].clone(), children)))
                }
                got => Err(EvalError::BadArity { helper: "Node", got }),
            },
            Builtin::Len => match args.len() {
                1 => match &args[0] {
                    Value::List(items) => Ok(Value::Int(items.borrow().len() as i64)),
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    _ => Err(EvalError::TypeMismatch {
                        helper: "len",
                        expected: "a list or string",
                    }),
                },
                got => Err(EvalError::BadArity { helper: "len", got }),
            },
            Builtin::Repr => match args.len() {
                1 => Ok(Value::Str(repr(&args[0])?)),
                got => Err(EvalError::BadArity { helper: "repr", got }),
            },
            Builtin::Int => match args.len() {
                1 => match &args[0] {
                    Value::Int(n) => Ok(Value::Int(*n)),
                    Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                        EvalError::TypeMismatch {
                            helper: "int",
                            expected: "a numeric string",
                        }
                    }),
                    _ => Err(EvalError::TypeMismatch {
                        helper: "int",
                        expected: "a numeric string",
                    }),
                },
                got => Err(EvalError::BadArity { helper: "int", got }),
            },
            Builtin::Chr => match args.len() {
                1 => match &args[0] {
                    Value::Char(c) => Ok(Value::Char(*c)),
                    Value::Str(s) => {
                        let mut chars = s.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => Ok(Value::Char(c)),
                            _ => Err(EvalError::TypeMismatch {
                                helper: "chr",
                                expected: "a one-character value",
                            }),
                        }
                    }
                    _ => Err(EvalError::TypeMismatch {
                        helper: "chr",
                        expected: "a one-character value",
                    }),
                },
                got => Err(EvalError::BadArity { helper: "chr", got }),
            },
            Builtin::Append => match args.len() {
                2 => {
                    let list = expect_list("append", &args[0])?;
                    list.borrow_mut().push(args[1].clone());
                    Ok(Value::Null)
                }
                got => Err(EvalError::BadArity {
                    helper: "append",
                    got,
                }),
            },
        }
    }
}

fn expect_str<'a>(helper: &'static str, v: &'a Value) -> Result<&'a str, EvalError> {
    v.as_str().ok_or(EvalError::TypeMismatch {
        helper,
        expected: "a string",
    })
}

fn expect_list<'a>(
    helper: &'static str,
    v: &'a Value,
) -> Result<&'a Rc<RefCell<Vec<Value>>>, EvalError> {
    v.as_list().ok_or(EvalError::TypeMismatch {
        helper,
        expected: "a list",
    })
}

/// Flatten `items` into one string, joining nested lists with the same
/// delimiter and stringifying scalars.
pub fn join(items: &Value, delimiter: &str) -> Result<String, EvalError> {
    match items {
        Value::List(list) => {
            let list = list.borrow();
            join_slice(&list, delimiter)
        }
        scalar => stringify(scalar),
    }
}

fn join_slice(items: &[Value], delimiter: &str) -> Result<String, EvalError> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(match item {
            Value::List(_) => join(item, delimiter)?,
            scalar => stringify(scalar)?,
        });
    }
    Ok(parts.join(delimiter))
}

fn stringify(v: &Value) -> Result<String, EvalError> {
    match v {
        Value::Null => Ok(String::new()),
        Value::Char(c) => Ok(c.to_string()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Str(s) => Ok(s.clone()),
        _ => Err(EvalError::TypeMismatch {
            helper: "join",
            expected: "strings, characters, integers or nested lists",
        }),
    }
}

/// Prefix every line of `text` (including an unterminated final line).
pub fn indent(text: &str, prefix: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| format!("{}{}", prefix, line))
        .collect()
}

/// Wrap or unwrap list nesting: depth 0 yields `[item]`, higher depths
/// flatten one level per step.
pub fn splice(depth: usize, item: Value) -> Result<Vec<Value>, EvalError> {
    if depth == 0 {
        return Ok(vec![item]);
    }
    let list = item.as_list().ok_or(EvalError::TypeMismatch {
        helper: "splice",
        expected: "a list at nonzero depth",
    })?;
    let mut out = Vec::new();
    for sub in list.borrow().iter() {
        out.extend(splice(depth - 1, sub.clone())?);
    }
    Ok(out)
}

/// Column-align a list of rows.
///
/// Entries whose elements are themselves lists are row groups and are
/// flattened first. Each cell is padded to its column's maximum width and
/// trailing whitespace is stripped per line.
pub fn table(rows: &Value) -> Result<String, EvalError> {
    let mut flat: Vec<Vec<String>> = Vec::new();
    flatten_rows(rows, &mut flat)?;
    let mut widths: Vec<usize> = Vec::new();
    for row in &flat {
        for (col, cell) in row.iter().enumerate() {
            let w = cell.chars().count();
            if col == widths.len() {
                widths.push(w);
            } else if w > widths[col] {
                widths[col] = w;
            }
        }
    }
    let mut out = String::new();
    for row in &flat {
        let mut line = String::new();
        for (col, cell) in row.iter().enumerate() {
            let pad = widths[col].saturating_sub(cell.chars().count());
            line.push_str(cell);
            line.extend(std::iter::repeat(' ').take(pad));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    Ok(out)
}

fn flatten_rows(entries: &Value, out: &mut Vec<Vec<String>>) -> Result<(), EvalError> {
    let list = expect_list("table", entries)?;
    for entry in list.borrow().iter() {
        let row = expect_list("table", entry)?;
        let is_group = row.borrow().iter().any(|e| matches!(e, Value::List(_)));
        if is_group {
            flatten_rows(entry, out)?;
        } else {
            let mut cells = Vec::new();
            for cell in row.borrow().iter() {
                cells.push(stringify(cell)?);
            }
            out.push(cells);
        }
    }
    Ok(())
}

/// Render a value as a Rust source literal: strings as string literals,
/// characters as character literals, integers bare.
pub fn repr(v: &Value) -> Result<String, EvalError> {
    match v {
        Value::Str(s) => Ok(format!("{:?}", s)),
        Value::Char(c) => Ok(format!("{:?}", c)),
        Value::Int(n) => Ok(n.to_string()),
        _ => Err(EvalError::TypeMismatch {
            helper: "repr",
            expected: "a string, character or integer",
        }),
    }
}
