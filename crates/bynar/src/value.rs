//! Node handles and borrowed views of tree values.
//!
//! Nodes live inside a [`Tree`] and are addressed by [`NodeId`]. Reading a
//! node goes through [`Tree::get`], which returns a [`Value`] borrowing
//! from the tree:
//!
//! ```
//! use bynar::{Tree, Value};
//!
//! let mut tree = Tree::new();
//! let n = tree.int(42).unwrap();
//!
//! match tree.get(n).unwrap() {
//!     Value::Int(i) => assert_eq!(i, 42),
//!     other => panic!("expected int, got {other:?}"),
//! }
//! ```

use crate::tag::ValueType;
use crate::tree::Tree;

/// Handle to a node in a [`Tree`].
///
/// Handles carry a generation, so a handle to a freed node is rejected
/// with [`Error::InvalidNode`](crate::Error::InvalidNode) even after its
/// storage has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[inline]
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

/// A key/value pair stored in a dict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) key: NodeId,
    pub(crate) value: NodeId,
}

/// A typed view of a node for pattern matching.
///
/// ```
/// use bynar::Value;
///
/// fn describe(value: Value) -> String {
///     match value {
///         Value::Null => "null".to_string(),
///         Value::Bool(b) => format!("bool: {b}"),
///         Value::Int(n) => format!("int: {n}"),
///         Value::Float(n) => format!("float: {n}"),
///         Value::String(s) => format!("string: {} bytes", s.len()),
///         Value::List(list) => format!("list: {} items", list.len()),
///         Value::Dict(dict) => format!("dict: {} entries", dict.len()),
///     }
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Raw string bytes; not necessarily UTF-8.
    String(&'a [u8]),
    List(ListRef<'a>),
    Dict(DictRef<'a>),
}

impl<'a> Value<'a> {
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Dict(_) => ValueType::Dict,
        }
    }

    /// String contents as UTF-8, if this is a string holding valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::String(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<ListRef<'a>> {
        match self {
            Value::List(list) => Some(*list),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dict(&self) -> Option<DictRef<'a>> {
        match self {
            Value::Dict(dict) => Some(*dict),
            _ => None,
        }
    }
}

/// View into a list's children, in insertion order.
#[derive(Debug, Clone, Copy)]
pub struct ListRef<'a> {
    items: &'a [NodeId],
}

impl<'a> ListRef<'a> {
    #[inline]
    pub(crate) fn new(items: &'a [NodeId]) -> Self {
        Self { items }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.items.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + 'a {
        self.items.iter().copied()
    }
}

/// View into a dict's entries, in insertion order.
#[derive(Clone, Copy)]
pub struct DictRef<'a> {
    tree: &'a Tree,
    entries: &'a [Entry],
}

impl<'a> DictRef<'a> {
    #[inline]
    pub(crate) fn new(tree: &'a Tree, entries: &'a [Entry]) -> Self {
        Self { tree, entries }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the value stored under `key` (linear scan).
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<NodeId> {
        self.tree
            .find_entry(self.entries, key)
            .map(|i| self.entries[i].value)
    }

    /// `(key, value)` handles in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (NodeId, NodeId)> + 'a {
        self.entries.iter().map(|e| (e.key, e.value))
    }
}

impl std::fmt::Debug for DictRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictRef")
            .field("entries", &self.entries)
            .finish()
    }
}
