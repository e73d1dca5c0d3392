//! Arena-backed record tree.
//!
//! Nodes live in one vector in stream order and refer to each other by
//! [`NodeId`]; a node's parent always precedes it.

use super::record::{FramingError, RawRecord};
use super::treeop::{AncestorStack, Event};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Node<T> {
    pub value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordTree<T> {
    nodes: Vec<Node<T>>,
    roots: Vec<NodeId>,
}

impl<T> Default for RecordTree<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }
}

impl<T> RecordTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` (or at top level).
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this tree.
    pub fn push(&mut self, parent: Option<NodeId>, value: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        self.nodes.push(Node {
            value,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0).map(|n| &n.value)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map_or(&[], |n| &n.children)
    }

    /// Top-level nodes, the children of the synthetic root.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `parent`, or the roots when `parent` is `None`.
    pub fn children_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(id) => self.children(id),
            None => &self.roots,
        }
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&p| self.parent(p))
    }

    /// Every node in stream order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), &n.value))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.nodes.iter().map(|n| &n.value)
    }

    /// Depth-first START/END events over the whole forest.
    pub fn events(&self) -> Events<'_, T> {
        Events {
            tree: self,
            pending_roots: self.roots.iter(),
            stack: Vec::new(),
        }
    }

    /// Transform every value in stream order.
    ///
    /// The callback sees the already transformed tree, so the node's
    /// ancestors and preceding siblings are available under the same ids.
    pub fn into_map<U, F>(self, mut f: F) -> RecordTree<U>
    where
        F: FnMut(&RecordTree<U>, NodeId, Option<NodeId>, T) -> U,
    {
        let mut mapped = RecordTree {
            nodes: Vec::with_capacity(self.nodes.len()),
            roots: Vec::with_capacity(self.roots.len()),
        };
        for (index, node) in self.nodes.into_iter().enumerate() {
            let value = f(&mapped, NodeId(index), node.parent, node.value);
            mapped.push(node.parent, value);
        }
        mapped
    }
}

impl RecordTree<RawRecord> {
    /// Arrange framed records into a tree by their levels.
    ///
    /// Stops at the first framing or level error and returns it next to the
    /// records gathered so far.
    pub fn from_records<I>(records: I, strict: bool) -> (Self, Option<FramingError>)
    where
        I: IntoIterator<Item = Result<RawRecord, FramingError>>,
    {
        let mut tree = RecordTree::new();
        let mut stack = AncestorStack::new(None);
        if !strict {
            stack = stack.lenient();
        }

        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(e) => return (tree, Some(e)),
            };
            let id = NodeId(tree.len());
            let parent = match stack.push(record.level, Some(id)) {
                Ok(chain) => chain.last().copied().flatten(),
                Err(e) => return (tree, Some(e)),
            };
            tree.push(parent, record);
        }
        (tree, None)
    }
}

/// Iterator returned by [`RecordTree::events`].
pub struct Events<'a, T> {
    tree: &'a RecordTree<T>,
    pending_roots: std::slice::Iter<'a, NodeId>,
    stack: Vec<(NodeId, usize)>,
}

impl<'a, T> Iterator for Events<'a, T> {
    type Item = (Event, NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        if self.stack.is_empty() {
            let root = *self.pending_roots.next()?;
            self.stack.push((root, 0));
            return Some((Event::Start, root, &tree.nodes[root.0].value));
        }
        let (id, next_child) = self.stack.last_mut()?;
        let id = *id;
        match tree.children(id).get(*next_child) {
            Some(&child) => {
                *next_child += 1;
                self.stack.push((child, 0));
                Some((Event::Start, child, &tree.nodes[child.0].value))
            },
            None => {
                self.stack.pop();
                Some((Event::End, id, &tree.nodes[id.0].value))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwp5::treeop::{Subtree, build_forest, tree_events};
    use bytes::Bytes;

    fn raw(seqno: usize, level: u16) -> Result<RawRecord, FramingError> {
        Ok(RawRecord {
            tag: 0x42,
            level,
            payload: Bytes::new(),
            seqno,
        })
    }

    #[test]
    fn test_from_records_builds_hierarchy() {
        let records = [0, 1, 2, 1, 0].into_iter().enumerate().map(|(i, l)| raw(i, l));
        let (tree, err) = RecordTree::from_records(records, true);
        assert!(err.is_none());
        assert_eq!(tree.roots(), &[NodeId(0), NodeId(4)]);
        assert_eq!(tree.children(NodeId(0)), &[NodeId(1), NodeId(3)]);
        assert_eq!(tree.children(NodeId(1)), &[NodeId(2)]);
        assert_eq!(tree.ancestors(NodeId(2)).collect::<Vec<_>>(), vec![NodeId(1), NodeId(0)]);
        assert_eq!(tree.parent(NodeId(4)), None);
    }

    #[test]
    fn test_from_records_keeps_prefix_on_error() {
        let records = vec![raw(0, 0), raw(1, 1), raw(2, 3), raw(3, 0)];
        let (tree, err) = RecordTree::from_records(records, true);
        assert_eq!(tree.len(), 2);
        assert!(matches!(err, Some(FramingError::LevelJump { seqno: 2, .. })));

        let records = vec![raw(0, 0), raw(1, 1), raw(2, 3), raw(3, 0)];
        let (tree, err) = RecordTree::from_records(records, false);
        assert!(err.is_none());
        assert_eq!(tree.parent(NodeId(2)), Some(NodeId(1)));
    }

    #[test]
    fn test_events_match_tree_events() {
        let records = [0, 1, 1, 2, 0].into_iter().enumerate().map(|(i, l)| raw(i, l));
        let (tree, _) = RecordTree::from_records(records, true);
        let events: Vec<(Event, usize)> = tree
            .events()
            .map(|(event, id, _)| (event, id.index()))
            .collect();

        let forest: Vec<Subtree<usize>> = build_forest(events.clone()).unwrap();
        let expected: Vec<(Event, usize)> = forest.iter().flat_map(tree_events).collect();
        assert_eq!(events, expected);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].children[1].children[0].item, 3);
    }

    #[test]
    fn test_into_map_sees_parents() {
        let records = [0, 1, 1].into_iter().enumerate().map(|(i, l)| raw(i, l));
        let (tree, _) = RecordTree::from_records(records, true);
        let depths = tree.into_map(|mapped: &RecordTree<usize>, _, parent, _| {
            parent.and_then(|p| mapped.get(p)).map_or(0, |d| d + 1)
        });
        assert_eq!(depths.values().copied().collect::<Vec<_>>(), vec![0, 1, 1]);
        assert_eq!(depths.children(NodeId(0)).len(), 2);
    }
}
