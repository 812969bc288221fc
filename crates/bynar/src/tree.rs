//! Node storage, construction and teardown.
//!
//! A [`Tree`] is an arena of nodes. Every node records its parent and its
//! position (`slot`) inside that parent; walks use the pair to climb back
//! up after finishing a subtree, so encoding, sizing, comparison and
//! freeing never recurse and keep no stack of their own.
//!
//! Ownership only flows downward: a container owns the children attached
//! to it, and freeing a root releases its whole subtree.
//!
//! ```
//! use bynar::Tree;
//!
//! let mut tree = Tree::new();
//! let list = tree.list(2).unwrap();
//! let n = tree.int(42).unwrap();
//! tree.list_append(list, n).unwrap();
//!
//! assert_eq!(bynar::encode(&tree, list).unwrap(), b"li42;;");
//! tree.free(list).unwrap();
//! assert!(tree.is_empty());
//! ```

use std::mem;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::seq::{Growth, Sequence};
use crate::tag::ValueType;
use crate::value::{DictRef, Entry, ListRef, NodeId, Value};

#[derive(Debug)]
pub(crate) struct DictBody {
    pub(crate) entries: Sequence<Entry>,
    /// A child attached to the dict but not yet part of an entry: a decoded
    /// key waiting for its value, or a value detached during teardown.
    pub(crate) pending: Option<NodeId>,
}

#[derive(Debug)]
pub(crate) enum Payload {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Vec<u8>),
    List(Sequence<NodeId>),
    Dict(DictBody),
}

impl Payload {
    pub(crate) fn value_type(&self) -> ValueType {
        match self {
            Payload::Null => ValueType::Null,
            Payload::Bool(_) => ValueType::Bool,
            Payload::Int(_) => ValueType::Int,
            Payload::Float(_) => ValueType::Float,
            Payload::String(_) => ValueType::String,
            Payload::List(_) => ValueType::List,
            Payload::Dict(_) => ValueType::Dict,
        }
    }

    /// Number of walk positions: list items, or two per dict entry.
    pub(crate) fn child_count(&self) -> usize {
        match self {
            Payload::List(items) => items.len(),
            Payload::Dict(dict) => dict.entries.len() * 2,
            Payload::Null
            | Payload::Bool(_)
            | Payload::Int(_)
            | Payload::Float(_)
            | Payload::String(_) => 0,
        }
    }

    /// Child at walk position `pos`. Dict positions interleave keys (even)
    /// and values (odd).
    pub(crate) fn child_at(&self, pos: usize) -> Option<NodeId> {
        match self {
            Payload::List(items) => items.as_slice().get(pos).copied(),
            Payload::Dict(dict) => {
                let entry = dict.entries.as_slice().get(pos / 2)?;
                Some(if pos % 2 == 0 { entry.key } else { entry.value })
            }
            Payload::Null
            | Payload::Bool(_)
            | Payload::Int(_)
            | Payload::Float(_)
            | Payload::String(_) => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    /// Walk position inside `parent`.
    pub(crate) slot: usize,
    pub(crate) payload: Payload,
}

#[derive(Debug)]
enum Slot {
    Occupied { generation: u32, node: Node },
    Vacant { generation: u32, next_free: Option<u32> },
    /// Generation space used up; never handed out again.
    Retired,
}

/// Arena holding bynar value trees.
///
/// A tree may hold any number of roots. Dropping the tree releases every
/// node at once without walking them.
#[derive(Debug, Default)]
pub struct Tree {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    live: usize,
    growth: Growth,
}

impl Tree {
    /// Create an empty tree using [`Growth::Exact`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree with the given container growth policy.
    #[must_use]
    pub fn with_growth(growth: Growth) -> Self {
        Self {
            growth,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn growth(&self) -> Growth {
        self.growth
    }

    /// Number of live nodes across all roots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn alloc(&mut self, payload: Payload) -> Result<NodeId> {
        let node = Node {
            parent: None,
            slot: 0,
            payload,
        };

        let id = if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let Slot::Vacant {
                generation,
                next_free,
            } = *slot
            else {
                return Err(Error::InvalidNode);
            };
            self.free_head = next_free;
            *slot = Slot::Occupied { generation, node };
            NodeId::new(index, generation)
        } else {
            let index = u32::try_from(self.slots.len()).map_err(|_| Error::AllocationFailure)?;
            self.slots.try_reserve(1)?;
            self.slots.push(Slot::Occupied {
                generation: 0,
                node,
            });
            NodeId::new(index, 0)
        };

        self.live += 1;
        Ok(id)
    }

    /// Return a node's storage to the free list.
    ///
    /// A slot whose generation is exhausted is retired instead of reused,
    /// so a stale handle can never match a later node.
    fn release(&mut self, id: NodeId) -> Result<Node> {
        self.node(id)?;
        let next_generation = id.generation().checked_add(1);
        let vacant = match next_generation {
            Some(generation) => Slot::Vacant {
                generation,
                next_free: self.free_head,
            },
            None => Slot::Retired,
        };
        let Slot::Occupied { node, .. } = mem::replace(&mut self.slots[id.index()], vacant) else {
            return Err(Error::InvalidNode);
        };
        if next_generation.is_some() {
            self.free_head = Some(id.index() as u32);
        }
        self.live -= 1;
        Ok(node)
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied { generation, node }) if *generation == id.generation() => {
                Ok(node)
            }
            _ => Err(Error::InvalidNode),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied { generation, node }) if *generation == id.generation() => {
                Ok(node)
            }
            _ => Err(Error::InvalidNode),
        }
    }

    // --- constructors ---

    pub fn null(&mut self) -> Result<NodeId> {
        self.alloc(Payload::Null)
    }

    pub fn bool(&mut self, value: bool) -> Result<NodeId> {
        self.alloc(Payload::Bool(value))
    }

    pub fn int(&mut self, value: i64) -> Result<NodeId> {
        self.alloc(Payload::Int(value))
    }

    pub fn float(&mut self, value: f64) -> Result<NodeId> {
        self.alloc(Payload::Float(value))
    }

    /// Create a string by copying `bytes`.
    pub fn string_copy(&mut self, bytes: impl AsRef<[u8]>) -> Result<NodeId> {
        let bytes = bytes.as_ref();
        let mut owned = Vec::new();
        owned.try_reserve_exact(bytes.len())?;
        owned.extend_from_slice(bytes);
        self.alloc(Payload::String(owned))
    }

    /// Create a string that takes ownership of an existing buffer (no copy).
    pub fn string_take(&mut self, bytes: Vec<u8>) -> Result<NodeId> {
        self.alloc(Payload::String(bytes))
    }

    /// Create an empty list with room for `capacity_hint` items.
    pub fn list(&mut self, capacity_hint: usize) -> Result<NodeId> {
        let items = Sequence::with_hint(capacity_hint)?;
        self.alloc(Payload::List(items))
    }

    /// Create an empty dict with room for `capacity_hint` entries.
    pub fn dict(&mut self, capacity_hint: usize) -> Result<NodeId> {
        let entries = Sequence::with_hint(capacity_hint)?;
        self.alloc(Payload::Dict(DictBody {
            entries,
            pending: None,
        }))
    }

    // --- inspection ---

    /// Get a typed view of a node.
    pub fn get(&self, id: NodeId) -> Result<Value<'_>> {
        Ok(match &self.node(id)?.payload {
            Payload::Null => Value::Null,
            Payload::Bool(b) => Value::Bool(*b),
            Payload::Int(n) => Value::Int(*n),
            Payload::Float(n) => Value::Float(*n),
            Payload::String(bytes) => Value::String(bytes),
            Payload::List(items) => Value::List(ListRef::new(items.as_slice())),
            Payload::Dict(dict) => Value::Dict(DictRef::new(self, dict.entries.as_slice())),
        })
    }

    pub fn value_type(&self, id: NodeId) -> Result<ValueType> {
        Ok(self.node(id)?.payload.value_type())
    }

    /// The container `id` is attached to, or `None` for a root.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Remaining capacity hint of a list or dict.
    pub fn remaining_hint(&self, id: NodeId) -> Result<usize> {
        match &self.node(id)?.payload {
            Payload::List(items) => Ok(items.remaining_hint()),
            Payload::Dict(dict) => Ok(dict.entries.remaining_hint()),
            other => Err(Error::UnexpectedType {
                expected: "list or dict",
                found: other.value_type().name(),
            }),
        }
    }

    pub(crate) fn child_at(&self, id: NodeId, pos: usize) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.payload.child_at(pos))
    }

    /// Index of the entry whose string key equals `key`. Non-string keys
    /// never match.
    pub(crate) fn find_entry(&self, entries: &[Entry], key: &[u8]) -> Option<usize> {
        entries.iter().position(|entry| {
            matches!(
                self.node(entry.key).map(|n| &n.payload),
                Ok(Payload::String(k)) if k.as_slice() == key
            )
        })
    }

    /// Index of the entry whose key equals `key` by type and value.
    /// Floats compare by bits; container keys never match.
    fn find_key(&self, entries: &[Entry], key: &Payload) -> Option<usize> {
        entries.iter().position(|entry| {
            let Ok(node) = self.node(entry.key) else {
                return false;
            };
            match (&node.payload, key) {
                (Payload::String(a), Payload::String(b)) => a == b,
                (Payload::Int(a), Payload::Int(b)) => a == b,
                (Payload::Float(a), Payload::Float(b)) => a.to_bits() == b.to_bits(),
                (Payload::Bool(a), Payload::Bool(b)) => a == b,
                (Payload::Null, Payload::Null) => true,
                _ => false,
            }
        })
    }

    // --- mutation ---

    /// Check that `child` is a detached node that may be attached under
    /// `container` without creating a cycle.
    fn check_attachable(&self, container: NodeId, child: NodeId) -> Result<()> {
        if child == container {
            debug!("rejected attach: node {child:?} into itself");
            return Err(Error::CycleDetected);
        }
        let node = self.node(child)?;
        if node.parent.is_some() {
            debug!("rejected attach: node {child:?} already has a parent");
            return Err(Error::AlreadyAttached);
        }
        // A childless node cannot be an ancestor of anything.
        if node.payload.child_count() == 0 {
            return Ok(());
        }
        let mut cursor = self.node(container)?.parent;
        while let Some(id) = cursor {
            if id == child {
                debug!("rejected attach: node {child:?} is an ancestor of {container:?}");
                return Err(Error::CycleDetected);
            }
            cursor = self.node(id)?.parent;
        }
        Ok(())
    }

    fn adopt(&mut self, container: NodeId, child: NodeId, slot: usize) -> Result<()> {
        let node = self.node_mut(child)?;
        node.parent = Some(container);
        node.slot = slot;
        Ok(())
    }

    /// Append `value` to `list`, returning `value`.
    ///
    /// Uses storage reserved by the capacity hint while it lasts, then
    /// grows per the tree's [`Growth`] policy.
    ///
    /// # Errors
    ///
    /// `UnexpectedType` if `list` is not a list, `AlreadyAttached` or
    /// `CycleDetected` if `value` cannot be owned by `list`, and
    /// `AllocationFailure` if storage cannot grow (the list is unchanged).
    pub fn list_append(&mut self, list: NodeId, value: NodeId) -> Result<NodeId> {
        let found = self.value_type(list)?;
        if found != ValueType::List {
            return Err(Error::UnexpectedType {
                expected: "list",
                found: found.name(),
            });
        }
        self.check_attachable(list, value)?;

        let growth = self.growth;
        let Payload::List(items) = &mut self.node_mut(list)?.payload else {
            return Err(Error::InvalidNode);
        };
        let index = items.push(value, growth)?;
        self.adopt(list, value, index)?;
        Ok(value)
    }

    /// Insert `key → value` into `dict`, returning the node now holding the
    /// value.
    ///
    /// If an equal key already exists, its value node keeps its identity
    /// and takes over `value`'s contents; `value` and `key` are consumed
    /// and freed, and the existing key is left untouched.
    ///
    /// # Errors
    ///
    /// `InvalidKeyType` if `key` is not a string, `UnexpectedType` if
    /// `dict` is not a dict, plus the attach and allocation errors of
    /// [`Tree::list_append`].
    pub fn dict_push(&mut self, dict: NodeId, key: NodeId, value: NodeId) -> Result<NodeId> {
        let key_type = self.value_type(key)?;
        if key_type != ValueType::String {
            debug!("rejected dict key of type {}", key_type.name());
            return Err(Error::InvalidKeyType {
                found: key_type.name(),
            });
        }
        self.push_entry(dict, key, value)
    }

    /// [`Tree::dict_push`] with a key copied from `key`.
    pub fn dict_push_str(&mut self, dict: NodeId, key: &str, value: NodeId) -> Result<NodeId> {
        let key = self.string_copy(key)?;
        match self.dict_push(dict, key, value) {
            Ok(id) => Ok(id),
            Err(err) => {
                self.free(key)?;
                Err(err)
            }
        }
    }

    /// Insert without checking the key's type. Scalar keys get
    /// duplicate-overwrite semantics by type and value.
    pub(crate) fn push_entry(&mut self, dict: NodeId, key: NodeId, value: NodeId) -> Result<NodeId> {
        let found = self.value_type(dict)?;
        if found != ValueType::Dict {
            return Err(Error::UnexpectedType {
                expected: "dict",
                found: found.name(),
            });
        }
        if key == value {
            return Err(Error::AlreadyAttached);
        }
        self.check_attachable(dict, key)?;
        self.check_attachable(dict, value)?;

        let existing = {
            let Payload::Dict(body) = &self.node(dict)?.payload else {
                return Err(Error::InvalidNode);
            };
            let key_payload = &self.node(key)?.payload;
            self.find_key(body.entries.as_slice(), key_payload)
                .map(|i| body.entries.as_slice()[i].value)
        };

        if let Some(target) = existing {
            trace!("dict_push: overwriting value of existing key");
            self.overwrite(target, value)?;
            self.free(key)?;
            return Ok(target);
        }

        let growth = self.growth;
        let Payload::Dict(body) = &mut self.node_mut(dict)?.payload else {
            return Err(Error::InvalidNode);
        };
        let index = body.entries.push(Entry { key, value }, growth)?;
        self.adopt(dict, key, index * 2)?;
        self.adopt(dict, value, index * 2 + 1)?;
        Ok(value)
    }

    /// Move `source`'s contents into `target` and free `source` together
    /// with whatever `target` held before.
    fn overwrite(&mut self, target: NodeId, source: NodeId) -> Result<()> {
        let incoming = mem::replace(&mut self.node_mut(source)?.payload, Payload::Null);
        let previous = mem::replace(&mut self.node_mut(target)?.payload, incoming);
        self.node_mut(source)?.payload = previous;
        self.reparent_children(target)?;
        self.reparent_children(source)?;
        self.free(source)
    }

    fn reparent_children(&mut self, id: NodeId) -> Result<()> {
        let (count, pending) = {
            let payload = &self.node(id)?.payload;
            let pending = match payload {
                Payload::Dict(body) => body.pending,
                _ => None,
            };
            (payload.child_count(), pending)
        };
        for pos in 0..count {
            if let Some(child) = self.child_at(id, pos)? {
                self.node_mut(child)?.parent = Some(id);
            }
        }
        if let Some(child) = pending {
            self.node_mut(child)?.parent = Some(id);
        }
        Ok(())
    }

    /// Look up `key` in `dict`. Absence is `Ok(None)`, never an error.
    pub fn dict_get(&self, dict: NodeId, key: &[u8]) -> Result<Option<NodeId>> {
        match self.get(dict)? {
            Value::Dict(body) => Ok(body.get(key)),
            other => Err(Error::UnexpectedType {
                expected: "dict",
                found: other.value_type().name(),
            }),
        }
    }

    // --- teardown ---

    /// Free `root` and everything it owns.
    ///
    /// Post-order and iterative: each container hands out its last child
    /// until it is empty, then is released and the walk climbs to its
    /// parent.
    ///
    /// # Errors
    ///
    /// `NotRoot` if `root` is still attached to a container (nothing is
    /// freed), `InvalidNode` if it was already freed.
    pub fn free(&mut self, root: NodeId) -> Result<()> {
        if self.node(root)?.parent.is_some() {
            debug!("rejected free of non-root node {root:?}");
            return Err(Error::NotRoot);
        }

        let mut current = root;
        loop {
            if let Some(child) = self.detach_last_child(current)? {
                current = child;
                continue;
            }
            let node = self.release(current)?;
            if current == root {
                return Ok(());
            }
            current = node.parent.ok_or(Error::InvalidNode)?;
        }
    }

    /// Remove and return the last remaining child of a container.
    fn detach_last_child(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(match &mut self.node_mut(id)?.payload {
            Payload::List(items) => items.pop(),
            Payload::Dict(body) => match body.pending.take() {
                Some(child) => Some(child),
                None => body.entries.pop().map(|entry| {
                    body.pending = Some(entry.value);
                    entry.key
                }),
            },
            Payload::Null
            | Payload::Bool(_)
            | Payload::Int(_)
            | Payload::Float(_)
            | Payload::String(_) => None,
        })
    }

    // --- decode support ---

    /// Hold `key` on `dict` until its value arrives.
    pub(crate) fn set_pending_key(&mut self, dict: NodeId, key: NodeId) -> Result<()> {
        self.check_attachable(dict, key)?;
        let Payload::Dict(body) = &mut self.node_mut(dict)?.payload else {
            return Err(Error::InvalidNode);
        };
        if body.pending.is_some() {
            return Err(Error::AlreadyAttached);
        }
        body.pending = Some(key);
        self.adopt(dict, key, 0)
    }

    /// Detach the pending key of `dict`, making it a root again.
    pub(crate) fn take_pending_key(&mut self, dict: NodeId) -> Result<Option<NodeId>> {
        let key = match &mut self.node_mut(dict)?.payload {
            Payload::Dict(body) => body.pending.take(),
            _ => None,
        };
        if let Some(key) = key {
            self.node_mut(key)?.parent = None;
        }
        Ok(key)
    }

    pub(crate) fn has_pending_key(&self, dict: NodeId) -> Result<bool> {
        Ok(matches!(
            &self.node(dict)?.payload,
            Payload::Dict(DictBody {
                pending: Some(_),
                ..
            })
        ))
    }
}
