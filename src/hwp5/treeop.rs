//! Tree reconstruction from leveled sequences, and conversion between
//! explicit trees and START/END event streams.

use super::record::FramingError;
use smallvec::{SmallVec, smallvec};

/// Tracks the ancestor chain while leveled items arrive in stream order.
///
/// The chain is seeded with a synthetic root standing one level above the
/// first item. In lenient mode, deep jumps are clamped to one level down and
/// levels under the base are clamped to the base instead of failing.
#[derive(Debug, Clone)]
pub struct AncestorStack<T> {
    chain: SmallVec<[T; 8]>,
    base: Option<u16>,
    previous: Option<(u16, T)>,
    index: usize,
    strict: bool,
}

impl<T: Clone> AncestorStack<T> {
    pub fn new(root: T) -> Self {
        Self {
            chain: smallvec![root],
            base: None,
            previous: None,
            index: 0,
            strict: true,
        }
    }

    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Level of the first item, once one has been seen.
    pub fn base_level(&self) -> Option<u16> {
        self.base
    }

    /// Accept the next item and return its ancestors, root first.
    pub fn push(&mut self, level: u16, item: T) -> Result<&[T], FramingError> {
        let seqno = self.index;
        let level = match (self.base, self.previous.take()) {
            (Some(base), Some((previous, prev_item))) => {
                let level = self.effective_level(seqno, level, base, previous)?;
                if level == previous + 1 {
                    self.chain.push(prev_item);
                } else {
                    self.chain.truncate((level - base) as usize + 1);
                }
                level
            },
            _ => {
                self.base = Some(level);
                level
            },
        };
        self.previous = Some((level, item));
        self.index += 1;
        Ok(&self.chain)
    }

    fn effective_level(
        &self,
        seqno: usize,
        level: u16,
        base: u16,
        previous: u16,
    ) -> Result<u16, FramingError> {
        if level > previous + 1 {
            if self.strict {
                return Err(FramingError::LevelJump {
                    seqno,
                    level,
                    previous,
                });
            }
            return Ok(previous + 1);
        }
        if level < base {
            if self.strict {
                return Err(FramingError::LevelBelowBase { seqno, level, base });
            }
            return Ok(base);
        }
        Ok(level)
    }
}

/// Pair every `(level, item)` with its ancestor chain, root first.
///
/// After the first level violation the iterator yields that error and stops.
pub fn prefix_ancestors_from_level<T, I>(root: T, items: I) -> PrefixAncestors<T, I::IntoIter>
where
    T: Clone,
    I: IntoIterator<Item = (u16, T)>,
{
    PrefixAncestors {
        stack: AncestorStack::new(root),
        items: items.into_iter(),
        failed: false,
    }
}

pub struct PrefixAncestors<T, I> {
    stack: AncestorStack<T>,
    items: I,
    failed: bool,
}

impl<T, I> Iterator for PrefixAncestors<T, I>
where
    T: Clone,
    I: Iterator<Item = (u16, T)>,
{
    type Item = Result<(Vec<T>, T), FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (level, item) = self.items.next()?;
        match self.stack.push(level, item.clone()) {
            Ok(chain) => Some(Ok((chain.to_vec(), item))),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Event {
    Start,
    End,
}

/// Explicit `(item, children)` tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree<T> {
    pub item: T,
    pub children: Vec<Subtree<T>>,
}

impl<T> Subtree<T> {
    pub fn leaf(item: T) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeEventError {
    #[error("event stream is empty")]
    Empty,
    #[error("END event at position {0} has no matching START")]
    UnmatchedEnd(usize),
    #[error("event stream ends with {0} unclosed START events")]
    Unclosed(usize),
    #[error("events continue after the root closed at position {0}")]
    TrailingEvents(usize),
}

/// Flatten a tree into depth-first START/END events.
pub fn tree_events<T: Clone>(tree: &Subtree<T>) -> Vec<(Event, T)> {
    let mut events = Vec::new();
    let mut stack: Vec<(&Subtree<T>, usize)> = vec![(tree, 0)];
    events.push((Event::Start, tree.item.clone()));
    while let Some((node, next_child)) = stack.last_mut() {
        if let Some(child) = node.children.get(*next_child) {
            *next_child += 1;
            events.push((Event::Start, child.item.clone()));
            stack.push((child, 0));
        } else {
            events.push((Event::End, node.item.clone()));
            stack.pop();
        }
    }
    events
}

/// Rebuild a single tree from a balanced event stream.
pub fn build_subtree<T, I>(events: I) -> Result<Subtree<T>, TreeEventError>
where
    I: IntoIterator<Item = (Event, T)>,
{
    let mut forest = build_forest(events)?;
    match forest.len() {
        0 => Err(TreeEventError::Empty),
        1 => Ok(forest.remove(0)),
        _ => Err(TreeEventError::TrailingEvents(count_events(&forest[0]))),
    }
}

/// Rebuild a sequence of sibling trees from a balanced event stream.
pub fn build_forest<T, I>(events: I) -> Result<Vec<Subtree<T>>, TreeEventError>
where
    I: IntoIterator<Item = (Event, T)>,
{
    let mut roots = Vec::new();
    let mut open: Vec<Subtree<T>> = Vec::new();
    for (position, (event, item)) in events.into_iter().enumerate() {
        match event {
            Event::Start => open.push(Subtree::leaf(item)),
            Event::End => {
                let done = open.pop().ok_or(TreeEventError::UnmatchedEnd(position))?;
                match open.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => roots.push(done),
                }
            },
        }
    }
    if !open.is_empty() {
        return Err(TreeEventError::Unclosed(open.len()));
    }
    Ok(roots)
}

fn count_events<T>(tree: &Subtree<T>) -> usize {
    2 + tree.children.iter().map(count_events).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chains(levels: &[u16]) -> Vec<Result<(Vec<i32>, i32), FramingError>> {
        prefix_ancestors_from_level(-1, levels.iter().copied().zip(0..)).collect()
    }

    #[test]
    fn test_prefix_ancestors_basic() {
        let out: Vec<_> = chains(&[0, 1, 2, 1, 0, 1])
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(
            out,
            vec![
                (vec![-1], 0),
                (vec![-1, 0], 1),
                (vec![-1, 0, 1], 2),
                (vec![-1, 0], 3),
                (vec![-1], 4),
                (vec![-1, 4], 5),
            ]
        );
    }

    #[test]
    fn test_nonzero_base_level() {
        let out: Vec<_> = chains(&[2, 3, 2]).into_iter().map(Result::unwrap).collect();
        assert_eq!(out[1].0, vec![-1, 0]);
        assert_eq!(out[2].0, vec![-1]);
    }

    #[test]
    fn test_level_jump_is_fatal_after_good_items() {
        let out = chains(&[0, 1, 3, 1]);
        assert_eq!(out.len(), 3);
        assert!(out[0].is_ok() && out[1].is_ok());
        assert_eq!(
            out[2],
            Err(FramingError::LevelJump {
                seqno: 2,
                level: 3,
                previous: 1
            })
        );
    }

    #[test]
    fn test_level_below_base() {
        let out = chains(&[1, 2, 0]);
        assert_eq!(
            out[2],
            Err(FramingError::LevelBelowBase {
                seqno: 2,
                level: 0,
                base: 1
            })
        );
    }

    #[test]
    fn test_lenient_clamps() {
        let mut stack = AncestorStack::new(-1).lenient();
        assert_eq!(stack.push(0, 0).unwrap(), &[-1]);
        assert_eq!(stack.push(5, 1).unwrap(), &[-1, 0]);
        assert_eq!(stack.push(0, 2).unwrap(), &[-1]);
    }

    #[test]
    fn test_events_and_back() {
        let tree = Subtree {
            item: 'a',
            children: vec![
                Subtree {
                    item: 'b',
                    children: vec![Subtree::leaf('c')],
                },
                Subtree::leaf('d'),
            ],
        };
        let events = tree_events(&tree);
        let order: String = events
            .iter()
            .map(|(e, c)| match e {
                Event::Start => c.to_ascii_uppercase(),
                Event::End => *c,
            })
            .collect();
        assert_eq!(order, "ABCcbDda");
        assert_eq!(build_subtree(events).unwrap(), tree);
    }

    #[test]
    fn test_malformed_event_streams() {
        assert_eq!(
            build_subtree(Vec::<(Event, u8)>::new()),
            Err(TreeEventError::Empty)
        );
        assert_eq!(
            build_subtree(vec![(Event::End, 1)]),
            Err(TreeEventError::UnmatchedEnd(0))
        );
        assert_eq!(
            build_subtree(vec![(Event::Start, 1)]),
            Err(TreeEventError::Unclosed(1))
        );
        assert_eq!(
            build_subtree(vec![
                (Event::Start, 1),
                (Event::End, 1),
                (Event::Start, 2),
                (Event::End, 2)
            ]),
            Err(TreeEventError::TrailingEvents(2))
        );
    }

    /// Level sequences that start at 0 and only ever descend by one.
    fn valid_levels() -> impl Strategy<Value = Vec<u16>> {
        prop::collection::vec(0u16..4, 1..60).prop_map(|steps| {
            let mut levels = vec![0u16];
            for step in steps {
                let last = *levels.last().unwrap_or(&0);
                // step 0 descends, anything else ascends to (step - 1) clamped
                let next = if step == 0 { last + 1 } else { (step - 1).min(last) };
                levels.push(next);
            }
            levels
        })
    }

    fn tree_strategy() -> impl Strategy<Value = Subtree<u32>> {
        let leaf = any::<u32>().prop_map(Subtree::leaf);
        leaf.prop_recursive(4, 48, 5, |inner| {
            (any::<u32>(), prop::collection::vec(inner, 0..5))
                .prop_map(|(item, children)| Subtree { item, children })
        })
    }

    proptest! {
        #[test]
        fn prop_ancestor_paths_rebuild_input_order(levels in valid_levels()) {
            let items = levels.iter().copied().zip(0..);
            let paths: Vec<Vec<usize>> = prefix_ancestors_from_level(usize::MAX, items)
                .map(|r| {
                    let (chain, item) = r.unwrap();
                    let mut path: Vec<usize> = chain.into_iter().skip(1).collect();
                    path.push(item);
                    path
                })
                .collect();

            // Each path is its parent's path plus one item, so sorting by
            // path reproduces a depth-first traversal.
            let mut sorted = paths.clone();
            sorted.sort();
            prop_assert_eq!(&sorted, &paths);
            for (i, path) in paths.iter().enumerate() {
                prop_assert_eq!(path.len() - 1, levels[i] as usize);
            }
        }

        #[test]
        fn prop_events_round_trip(tree in tree_strategy()) {
            let events = tree_events(&tree);
            let rebuilt = build_subtree(events.clone()).unwrap();
            prop_assert_eq!(tree_events(&rebuilt), events);
            prop_assert_eq!(rebuilt, tree);
        }
    }
}
