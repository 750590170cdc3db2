//! Dynamic values
//!
//! Match subjects, semantic-action results, and runtime bindings all share
//! one closed value type. Keeping the set closed (instead of leaning on
//! trait objects) lets the matching primitives and the runtime dispatch by
//! plain `match`.

use crate::action::Builtin;
use crate::node::Node;
use crate::range::Range;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A dynamic value flowing through matching and semantic evaluation.
///
/// Lists are shared and interior-mutable: the `append` runtime helper
/// mutates a list through one alias while another alias of the same list
/// is already captured in a pending result. The code-generator grammar
/// depends on observing those mutations.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absence of a value (the result of an empty semantic action)
    #[default]
    Null,
    /// A single character item from a text subject
    Char(char),
    /// Integer value
    Int(i64),
    /// String value
    Str(String),
    /// Shared list of values
    List(Rc<RefCell<Vec<Value>>>),
    /// A parse-tree node
    Node(Rc<Node>),
    /// A captured source range
    Range(Range),
    /// A runtime helper function
    Builtin(Builtin),
}

impl Value {
    /// Create a string value.
    #[inline]
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Create a list value from owned items.
    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Whether this value is the given character.
    #[inline]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self, Value::Char(x) if *x == c)
    }

    /// Whether this value is a character in `[low, high]` (inclusive).
    #[inline]
    pub fn in_char_range(&self, low: char, high: char) -> bool {
        matches!(self, Value::Char(x) if low <= *x && *x <= high)
    }

    /// Get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the shared list payload.
    pub fn as_list(&self) -> Option<&Rc<RefCell<Vec<Value>>>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the node payload.
    pub fn as_node(&self) -> Option<&Rc<Node>> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Get the range payload.
    pub fn as_range(&self) -> Option<Range> {
        match self {
            Value::Range(r) => Some(*r),
            _ => None,
        }
    }

    /// Project into `serde_json::Value` for structural dumps.
    ///
    /// Nodes appear in their bridge-format list shape, characters as
    /// one-character strings, builtins by name.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Char(c) => serde_json::Value::String(c.to_string()),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.borrow().iter().map(Value::to_json).collect())
            }
            Value::Node(node) => node.as_list().to_json(),
            Value::Range(r) => serde_json::Value::Array(vec![
                serde_json::Value::Number(r.start.into()),
                serde_json::Value::Number(r.end.into()),
            ]),
            Value::Builtin(b) => serde_json::Value::String(format!("<builtin {}>", b.name())),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.to_json(), serializer)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Node(a), Value::Node(b)) => {
                Rc::ptr_eq(a, b) || a.as_list() == b.as_list()
            }
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Char(c) => write!(f, "{}", c),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(_) | Value::Node(_) => write!(f, "{}", self.to_json()),
            Value::Range(r) => write!(f, "{}", r),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name()),
        }
    }
}
