//! Linked-list ordering and tree assembly for outline notes.
//!
//! # Responsibility
//! - Linearize `previous`/`next` sibling chains into one ordered list.
//! - Nest the ordered list by `parent_id` into a forest.
//!
//! # Invariants
//! - Pure: no I/O, inputs are consumed and returned inside the forest.
//! - The forest holds exactly as many nodes as the input, or an error is
//!   returned. Nothing is silently dropped.
//! - Sibling order is the `next` chain order; root order follows the order
//!   in which list heads appear in the input.

use crate::model::note::{Note, NoteId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Access to the outline pointers of one item.
pub trait OutlineLinks {
    fn outline_id(&self) -> NoteId;
    fn outline_previous(&self) -> Option<NoteId>;
    fn outline_next(&self) -> Option<NoteId>;
    fn outline_parent(&self) -> Option<NoteId>;
}

impl OutlineLinks for Note {
    fn outline_id(&self) -> NoteId {
        self.id
    }

    fn outline_previous(&self) -> Option<NoteId> {
        self.previous
    }

    fn outline_next(&self) -> Option<NoteId> {
        self.next
    }

    fn outline_parent(&self) -> Option<NoteId> {
        self.parent_id
    }
}

/// One node of a reconstructed outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<OutlineNode<T>>,
}

impl<T> OutlineNode<T> {
    /// Number of nodes in this subtree, self included.
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(OutlineNode::subtree_size)
            .sum::<usize>()
    }
}

/// Structural defect found while rebuilding an outline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedOutline {
    /// Non-empty input without any item lacking `previous`.
    #[error("linked list does not have a first item")]
    NoFirstItem,
    /// `next` references an id outside the input set.
    #[error("cannot find 'next' item {missing} referenced by {from}")]
    DanglingNext { from: NoteId, missing: NoteId },
    /// A walk came back to a node it had already visited.
    #[error("circular linked list at {at}")]
    Cycle { at: NoteId },
    /// A node is reachable from more than one list head.
    #[error("item {at} is linked from more than one list")]
    SharedNode { at: NoteId },
    #[error("duplicate item id {0}")]
    DuplicateId(NoteId),
    /// `parent_id` references an id outside the input set.
    #[error("cannot find parent {missing} of item {child}")]
    DanglingParent { child: NoteId, missing: NoteId },
    /// Nodes whose parent chain never reaches a root.
    #[error("parent chain of item {at} never reaches a root")]
    ParentCycle { at: NoteId },
}

/// Errors from outline reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutlineError {
    #[error("malformed outline: {0}")]
    MalformedOutline(MalformedOutline),
    #[error("invalid linked list: ordered {actual} of {expected} items")]
    InvalidLinkedList { expected: usize, actual: usize },
}

impl From<MalformedOutline> for OutlineError {
    fn from(value: MalformedOutline) -> Self {
        Self::MalformedOutline(value)
    }
}

/// Orders items by walking `next` pointers from every list head.
///
/// Returns indices into `items`. Heads are visited in input order.
///
/// # Errors
/// - `NoFirstItem` when no item lacks `previous`.
/// - `DanglingNext` when a `next` id is not in `items`.
/// - `Cycle` / `SharedNode` when a walk revisits a node.
/// - `DuplicateId` when two items share an id.
pub fn order_linked_list<T: OutlineLinks>(items: &[T]) -> Result<Vec<usize>, OutlineError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let positions = index_by_id(items)?;
    let heads: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.outline_previous().is_none())
        .map(|(index, _)| index)
        .collect();
    if heads.is_empty() {
        return Err(MalformedOutline::NoFirstItem.into());
    }

    let mut ordered = Vec::with_capacity(items.len());
    let mut placed: HashSet<usize> = HashSet::with_capacity(items.len());
    for head in heads {
        if !placed.insert(head) {
            return Err(MalformedOutline::SharedNode {
                at: items[head].outline_id(),
            }
            .into());
        }
        ordered.push(head);

        let mut walk: HashSet<usize> = HashSet::from([head]);
        let mut current = head;
        while let Some(next_id) = items[current].outline_next() {
            let next = *positions.get(&next_id).ok_or(MalformedOutline::DanglingNext {
                from: items[current].outline_id(),
                missing: next_id,
            })?;
            if !walk.insert(next) {
                return Err(MalformedOutline::Cycle { at: next_id }.into());
            }
            if !placed.insert(next) {
                return Err(MalformedOutline::SharedNode { at: next_id }.into());
            }
            ordered.push(next);
            current = next;
        }
    }

    Ok(ordered)
}

/// Rebuilds the outline forest from an unordered set of items.
///
/// Empty input yields an empty forest.
///
/// # Errors
/// - Every [`order_linked_list`] error.
/// - `InvalidLinkedList` when some items are not reachable from any head.
/// - `DanglingParent` / `ParentCycle` when nesting cannot be resolved.
pub fn build_outline<T: OutlineLinks>(items: Vec<T>) -> Result<Vec<OutlineNode<T>>, OutlineError> {
    let expected = items.len();
    let ordered = order_linked_list(&items)?;
    if ordered.len() != expected {
        return Err(OutlineError::InvalidLinkedList {
            expected,
            actual: ordered.len(),
        });
    }

    let ids: Vec<NoteId> = items.iter().map(OutlineLinks::outline_id).collect();
    let known: HashSet<NoteId> = ids.iter().copied().collect();
    let mut roots = Vec::new();
    let mut children: HashMap<NoteId, Vec<usize>> = HashMap::new();
    for &index in &ordered {
        match items[index].outline_parent() {
            None => roots.push(index),
            Some(parent) => {
                if !known.contains(&parent) {
                    return Err(MalformedOutline::DanglingParent {
                        child: ids[index],
                        missing: parent,
                    }
                    .into());
                }
                children.entry(parent).or_default().push(index);
            }
        }
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut forest = Vec::with_capacity(roots.len());
    let mut attached = 0;
    for root in roots {
        if let Some(node) = assemble(root, &ids, &children, &mut slots, &mut attached) {
            forest.push(node);
        }
    }

    if attached != expected {
        let stranded = ordered
            .iter()
            .find(|&&index| slots[index].is_some())
            .map(|&index| ids[index]);
        if let Some(at) = stranded {
            return Err(MalformedOutline::ParentCycle { at }.into());
        }
    }

    Ok(forest)
}

/// Builds the subtree rooted at `index`.
///
/// Returns `None` when the slot was already taken; only reachable from
/// roots, so nodes on a parent cycle are never entered.
fn assemble<T>(
    index: usize,
    ids: &[NoteId],
    children: &HashMap<NoteId, Vec<usize>>,
    slots: &mut [Option<T>],
    attached: &mut usize,
) -> Option<OutlineNode<T>> {
    let item = slots[index].take()?;
    *attached += 1;
    let nested = children
        .get(&ids[index])
        .map(|child_indices| {
            child_indices
                .iter()
                .filter_map(|&child| assemble(child, ids, children, slots, attached))
                .collect()
        })
        .unwrap_or_default();

    Some(OutlineNode {
        item,
        children: nested,
    })
}

fn index_by_id<T: OutlineLinks>(items: &[T]) -> Result<HashMap<NoteId, usize>, OutlineError> {
    let mut positions = HashMap::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if positions.insert(item.outline_id(), index).is_some() {
            return Err(MalformedOutline::DuplicateId(item.outline_id()).into());
        }
    }
    Ok(positions)
}
