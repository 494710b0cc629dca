//! Most-recently-seen ordering over routing table entries.
//!
//! An intrusive doubly-linked list stored in a slab: links are slot indices,
//! freed slots are recycled, and an id → slot map gives O(1) touch and
//! remove. The head is the most recently inserted or touched peer.

use super::node_id::NodeId;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Link {
    id: NodeId,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency ordering of node ids, newest first
#[derive(Debug, Clone, Default)]
pub struct RecencyList {
    slots: Vec<Option<Link>>,
    free: Vec<usize>,
    index: HashMap<NodeId, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl RecencyList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `id` to the front, inserting it if absent
    pub fn touch(&mut self, id: &NodeId) {
        if let Some(&slot) = self.index.get(id) {
            if self.head != Some(slot) {
                self.unlink(slot);
                self.push_front(slot);
            }
            return;
        }

        let link = Link {
            id: id.clone(),
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(link);
                slot
            }
            None => {
                self.slots.push(Some(link));
                self.slots.len() - 1
            }
        };
        self.index.insert(id.clone(), slot);
        self.push_front(slot);
    }

    /// Drop `id` from the ordering. Returns whether it was present.
    pub fn remove(&mut self, id: &NodeId) -> bool {
        let Some(slot) = self.index.remove(id) else {
            return false;
        };
        self.unlink(slot);
        self.slots[slot] = None;
        self.free.push(slot);
        true
    }

    /// Whether `id` is tracked
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of tracked ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no ids are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Ids from most to least recent
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let link = self.slots.get(cursor?)?.as_ref()?;
            cursor = link.next;
            Some(&link.id)
        })
    }

    fn push_front(&mut self, slot: usize) {
        let old_head = self.head;
        if let Some(link) = self.slots[slot].as_mut() {
            link.prev = None;
            link.next = old_head;
        }
        match old_head.and_then(|h| self.slots[h].as_mut()) {
            Some(head) => head.prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let Some((prev, next)) = self.slots[slot].as_ref().map(|l| (l.prev, l.next)) else {
            return;
        };
        match prev.and_then(|p| self.slots[p].as_mut()) {
            Some(link) => link.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.slots[n].as_mut()) {
            Some(link) => link.prev = prev,
            None => self.tail = prev,
        }
    }
}
