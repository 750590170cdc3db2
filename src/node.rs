//! Parse-tree nodes
//!
//! A [`Node`] is a labeled tree built bottom-up by grammar semantic
//! actions and treated as immutable afterwards. Children are owned in
//! order; every child holds a non-owning back-reference to its parent so
//! consumers can run path and sibling queries without an external index.

use crate::range::Range;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A labeled tree node with a source range and an optional scalar payload.
///
/// Leaf nodes tend to carry a value, interior nodes carry children. The
/// tree is acyclic and single-owner: assigning a node as a child re-points
/// its parent reference, last assignment wins.
#[derive(Debug)]
pub struct Node {
    name: String,
    range: Range,
    value: Value,
    children: Vec<Rc<Node>>,
    parent: RefCell<Weak<Node>>,
}

/// One flattened span produced by [`Node::tokenize`].
#[derive(Debug, Clone)]
pub struct Token {
    /// Name of the node the span belongs to
    pub name: String,
    /// Start position (inclusive)
    pub start: usize,
    /// End position (exclusive)
    pub end: usize,
    /// The owning node
    pub node: Rc<Node>,
}

impl Node {
    /// Build a node and claim every child by pointing its parent here.
    pub fn new(
        name: impl Into<String>,
        range: Range,
        value: Value,
        children: Vec<Rc<Node>>,
    ) -> Rc<Node> {
        let node = Rc::new(Node {
            name: name.into(),
            range,
            value,
            children,
            parent: RefCell::new(Weak::new()),
        });
        for child in &node.children {
            *child.parent.borrow_mut() = Rc::downgrade(&node);
        }
        node
    }

    /// Node name (grammar construct tag).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source extent of this node.
    #[inline]
    pub fn range(&self) -> Range {
        self.range
    }

    /// Scalar payload.
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Ordered children.
    #[inline]
    pub fn children(&self) -> &[Rc<Node>] {
        &self.children
    }

    /// Parent node, if this node has been claimed as a child.
    pub fn parent(&self) -> Option<Rc<Node>> {
        self.parent.borrow().upgrade()
    }

    /// First child, or the node itself when there are none.
    pub fn get_first_child(self: &Rc<Self>) -> Rc<Node> {
        self.children.first().cloned().unwrap_or_else(|| Rc::clone(self))
    }

    /// Names of all ancestors plus this node, root first.
    pub fn get_path(&self) -> Vec<String> {
        let mut path = match self.parent() {
            Some(parent) => parent.get_path(),
            None => Vec::new(),
        };
        path.push(self.name.clone());
        path
    }

    /// Next sibling, wrapping around; a parentless node is its own sibling.
    pub fn get_next_sibling(self: &Rc<Self>) -> Rc<Node> {
        match self.parent() {
            Some(parent) => parent.get_sibling(self, 1),
            None => Rc::clone(self),
        }
    }

    /// Previous sibling, wrapping around; a parentless node is its own sibling.
    pub fn get_previous_sibling(self: &Rc<Self>) -> Rc<Node> {
        match self.parent() {
            Some(parent) => parent.get_sibling(self, -1),
            None => Rc::clone(self),
        }
    }

    fn get_sibling(self: &Rc<Self>, child: &Rc<Node>, offset: isize) -> Rc<Node> {
        let mut index = 0;
        for (i, c) in self.children.iter().enumerate() {
            index = i;
            if Rc::ptr_eq(c, child) {
                break;
            }
        }
        let len = self.children.len() as isize;
        let at = (index as isize + offset).rem_euclid(len) as usize;
        Rc::clone(&self.children[at])
    }

    /// Flatten the tree into a gap-free ordered span list.
    ///
    /// Any position inside this node's range not covered by a child span
    /// is emitted as a token labeled with this node's name, both between
    /// children and after the last one. Concatenating the spans in order
    /// reconstructs `[range.start, range.end)` exactly.
    pub fn tokenize(self: &Rc<Self>) -> Vec<Token> {
        let mut pos = self.range.start;
        let mut result = Vec::new();
        for child in &self.children {
            for token in child.tokenize() {
                if pos != token.start {
                    result.push(Token {
                        name: self.name.clone(),
                        start: pos,
                        end: token.start,
                        node: Rc::clone(self),
                    });
                }
                pos = token.end;
                result.push(token);
            }
        }
        if pos != self.range.end {
            result.push(Token {
                name: self.name.clone(),
                start: pos,
                end: self.range.end,
                node: Rc::clone(self),
            });
        }
        result
    }

    /// Serialize into the bridge format `[name, value, child...]`.
    ///
    /// This is the shape fed to grammars that match over lists, letting a
    /// later pipeline stage consume an earlier stage's tree.
    pub fn as_list(&self) -> Value {
        let mut items = vec![Value::str(&self.name), self.value.clone()];
        items.extend(self.children.iter().map(|c| c.as_list()));
        Value::list(items)
    }
}
