//! Iterative pre-order walk over a subtree.
//!
//! The walk keeps only the node it is about to visit. When a node
//! finishes, the walk climbs to the parent and resumes at the position
//! after the node's `slot`, so nested containers cost no extra state.

use crate::error::Result;
use crate::tree::{Payload, Tree};
use crate::value::NodeId;

/// One step of the serialized form.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Event<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(&'a [u8]),
    OpenList,
    OpenDict,
    Close,
}

impl Event<'_> {
    /// Structural equality; floats compare by bits so NaN matches NaN.
    pub(crate) fn same_as(&self, other: &Event<'_>) -> bool {
        match (self, other) {
            (Event::Null, Event::Null)
            | (Event::OpenList, Event::OpenList)
            | (Event::OpenDict, Event::OpenDict)
            | (Event::Close, Event::Close) => true,
            (Event::Bool(a), Event::Bool(b)) => a == b,
            (Event::Int(a), Event::Int(b)) => a == b,
            (Event::Float(a), Event::Float(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Event::String(a), Event::String(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Enter(NodeId),
    /// Continue `container` at walk position `pos`.
    Resume(NodeId, usize),
    Done,
}

pub(crate) struct Walk<'a> {
    tree: &'a Tree,
    root: NodeId,
    step: Step,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(tree: &'a Tree, root: NodeId) -> Self {
        Self {
            tree,
            root,
            step: Step::Enter(root),
        }
    }

    /// Where to go once `id` has been fully visited.
    fn after(&self, id: NodeId) -> Result<Step> {
        if id == self.root {
            return Ok(Step::Done);
        }
        let node = self.tree.node(id)?;
        Ok(match node.parent {
            Some(parent) => Step::Resume(parent, node.slot + 1),
            None => Step::Done,
        })
    }

    fn advance(&mut self) -> Result<Option<Event<'a>>> {
        loop {
            match self.step {
                Step::Done => return Ok(None),
                Step::Enter(id) => {
                    let event = match &self.tree.node(id)?.payload {
                        Payload::Null => Event::Null,
                        Payload::Bool(b) => Event::Bool(*b),
                        Payload::Int(n) => Event::Int(*n),
                        Payload::Float(n) => Event::Float(*n),
                        Payload::String(bytes) => Event::String(bytes),
                        Payload::List(_) => {
                            self.step = Step::Resume(id, 0);
                            return Ok(Some(Event::OpenList));
                        }
                        Payload::Dict(_) => {
                            self.step = Step::Resume(id, 0);
                            return Ok(Some(Event::OpenDict));
                        }
                    };
                    self.step = self.after(id)?;
                    return Ok(Some(event));
                }
                Step::Resume(id, pos) => match self.tree.child_at(id, pos)? {
                    Some(child) => self.step = Step::Enter(child),
                    None => {
                        self.step = self.after(id)?;
                        return Ok(Some(Event::Close));
                    }
                },
            }
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = Result<Event<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(event) => event.map(Ok),
            Err(err) => {
                self.step = Step::Done;
                Some(Err(err))
            }
        }
    }
}

impl Tree {
    /// Compare two subtrees (possibly in different trees) by shape and
    /// contents. Node identities and capacity hints are ignored.
    pub fn structurally_eq(&self, a: NodeId, other: &Tree, b: NodeId) -> Result<bool> {
        let mut left = Walk::new(self, a);
        let mut right = Walk::new(other, b);
        loop {
            match (left.next().transpose()?, right.next().transpose()?) {
                (None, None) => return Ok(true),
                (Some(x), Some(y)) if x.same_as(&y) => {}
                _ => return Ok(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(tree: &Tree, root: NodeId) -> Vec<String> {
        Walk::new(tree, root)
            .map(|e| format!("{:?}", e.unwrap()))
            .collect()
    }

    #[test]
    fn test_walks_dict_keys_then_values() {
        let mut tree = Tree::new();
        let dict = tree.dict(0).unwrap();
        let inner = tree.list(0).unwrap();
        let x = tree.bool(false).unwrap();
        tree.list_append(inner, x).unwrap();
        tree.dict_push_str(dict, "k", inner).unwrap();
        let y = tree.null().unwrap();
        tree.dict_push_str(dict, "n", y).unwrap();

        assert_eq!(
            events(&tree, dict),
            vec![
                "OpenDict",
                "String([107])",
                "OpenList",
                "Bool(false)",
                "Close",
                "String([110])",
                "Null",
                "Close",
            ]
        );
    }

    #[test]
    fn test_subtree_walk_stops_at_its_root() {
        let mut tree = Tree::new();
        let outer = tree.list(0).unwrap();
        let inner = tree.list(0).unwrap();
        let a = tree.int(1).unwrap();
        tree.list_append(inner, a).unwrap();
        tree.list_append(outer, inner).unwrap();
        let b = tree.int(2).unwrap();
        tree.list_append(outer, b).unwrap();

        assert_eq!(events(&tree, inner), vec!["OpenList", "Int(1)", "Close"]);
        assert_eq!(events(&tree, b), vec!["Int(2)"]);
    }

    #[test]
    fn test_empty_containers_open_and_close() {
        let mut tree = Tree::new();
        let list = tree.list(0).unwrap();
        assert_eq!(events(&tree, list), vec!["OpenList", "Close"]);
    }

    #[test]
    fn test_structural_equality_across_trees() {
        let mut left = Tree::new();
        let l = left.list(3).unwrap();
        let nan = left.float(f64::NAN).unwrap();
        left.list_append(l, nan).unwrap();

        let mut right = Tree::with_growth(crate::Growth::Amortized);
        let r = right.list(0).unwrap();
        let nan = right.float(f64::NAN).unwrap();
        right.list_append(r, nan).unwrap();
        assert!(left.structurally_eq(l, &right, r).unwrap());

        let extra = right.null().unwrap();
        right.list_append(r, extra).unwrap();
        assert!(!left.structurally_eq(l, &right, r).unwrap());
    }
}
