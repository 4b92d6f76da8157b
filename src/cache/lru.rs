//! Eviction List Module
//!
//! Ordered entry storage used to decide eviction order inside a shard.

use crate::cache::CacheEntry;

#[derive(Debug)]
struct Node<V> {
    entry: CacheEntry<V>,
    /// Neighbour toward the front
    prev: Option<usize>,
    /// Neighbour toward the back
    next: Option<usize>,
}

// == Eviction List ==
/// Doubly linked list of entries stored in a slot vector.
///
/// - Front = most eligible for retention
/// - Back = next to be evicted
///
/// Handles are slot indices. A handle stays valid until its entry is removed;
/// freed slots are recycled for later inserts.
#[derive(Debug)]
pub struct EvictionList<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    front: Option<usize>,
    back: Option<usize>,
    len: usize,
}

impl<V> Default for EvictionList<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> EvictionList<V> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            front: None,
            back: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front(&self) -> Option<usize> {
        self.front
    }

    pub fn back(&self) -> Option<usize> {
        self.back
    }

    /// Returns the entry behind a handle.
    pub fn get(&self, handle: usize) -> Option<&CacheEntry<V>> {
        self.node(handle).map(|node| &node.entry)
    }

    pub fn get_mut(&mut self, handle: usize) -> Option<&mut CacheEntry<V>> {
        self.slots
            .get_mut(handle)
            .and_then(Option::as_mut)
            .map(|node| &mut node.entry)
    }

    // == Insertion ==
    /// Inserts an entry at the front.
    pub fn push_front(&mut self, entry: CacheEntry<V>) -> usize {
        let handle = self.alloc(entry);
        self.link_front(handle);
        handle
    }

    /// Inserts an entry at the back.
    pub fn push_back(&mut self, entry: CacheEntry<V>) -> usize {
        let handle = self.alloc(entry);
        self.link_back(handle);
        handle
    }

    /// Inserts an entry so that exactly `offset` entries sit behind it.
    ///
    /// An offset of zero appends at the back; an offset at or beyond the
    /// current length inserts at the front.
    pub fn insert_from_back(&mut self, entry: CacheEntry<V>, offset: usize) -> usize {
        if offset == 0 {
            return self.push_back(entry);
        }
        if offset >= self.len {
            return self.push_front(entry);
        }

        let mut anchor = self.back;
        for _ in 1..offset {
            anchor = anchor.and_then(|h| self.node(h)).and_then(|n| n.prev);
        }

        let handle = self.alloc(entry);
        match anchor {
            Some(anchor) => self.link_before(handle, anchor),
            None => self.link_front(handle),
        }
        handle
    }

    // == Reordering ==
    /// Moves an entry to the front.
    pub fn move_to_front(&mut self, handle: usize) {
        if self.front == Some(handle) || self.node(handle).is_none() {
            return;
        }
        self.unlink(handle);
        self.link_front(handle);
    }

    // == Removal ==
    /// Removes an entry by handle.
    pub fn remove(&mut self, handle: usize) -> Option<CacheEntry<V>> {
        self.node(handle)?;
        self.unlink(handle);
        let node = self.slots.get_mut(handle).and_then(Option::take)?;
        self.free.push(handle);
        self.len -= 1;
        Some(node.entry)
    }

    /// Removes and returns the entry at the back.
    pub fn pop_back(&mut self) -> Option<CacheEntry<V>> {
        let back = self.back?;
        self.remove(back)
    }

    /// Removes every entry, returning them back to front.
    pub fn drain(&mut self) -> Vec<CacheEntry<V>> {
        let mut drained = Vec::with_capacity(self.len);
        while let Some(entry) = self.pop_back() {
            drained.push(entry);
        }
        self.slots.clear();
        self.free.clear();
        drained
    }

    // == Iteration ==
    /// Iterates entries from the back (next to evict) to the front.
    pub fn iter_from_back(&self) -> impl Iterator<Item = &CacheEntry<V>> + '_ {
        let mut cursor = self.back;
        std::iter::from_fn(move || {
            let node = self.node(cursor?)?;
            cursor = node.prev;
            Some(&node.entry)
        })
    }

    // == Internal Linking ==
    fn node(&self, handle: usize) -> Option<&Node<V>> {
        self.slots.get(handle).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, handle: usize) -> Option<&mut Node<V>> {
        self.slots.get_mut(handle).and_then(Option::as_mut)
    }

    fn alloc(&mut self, entry: CacheEntry<V>) -> usize {
        let node = Node {
            entry,
            prev: None,
            next: None,
        };
        self.len += 1;
        match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(node);
                handle
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn set_prev(&mut self, handle: usize, prev: Option<usize>) {
        if let Some(node) = self.node_mut(handle) {
            node.prev = prev;
        }
    }

    fn set_next(&mut self, handle: usize, next: Option<usize>) {
        if let Some(node) = self.node_mut(handle) {
            node.next = next;
        }
    }

    fn unlink(&mut self, handle: usize) {
        let (prev, next) = match self.node(handle) {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        match prev {
            Some(p) => self.set_next(p, next),
            None => self.front = next,
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None => self.back = prev,
        }
        self.set_prev(handle, None);
        self.set_next(handle, None);
    }

    fn link_front(&mut self, handle: usize) {
        let old_front = self.front;
        self.set_prev(handle, None);
        self.set_next(handle, old_front);
        match old_front {
            Some(f) => self.set_prev(f, Some(handle)),
            None => self.back = Some(handle),
        }
        self.front = Some(handle);
    }

    fn link_back(&mut self, handle: usize) {
        let old_back = self.back;
        self.set_next(handle, None);
        self.set_prev(handle, old_back);
        match old_back {
            Some(b) => self.set_next(b, Some(handle)),
            None => self.front = Some(handle),
        }
        self.back = Some(handle);
    }

    fn link_before(&mut self, handle: usize, anchor: usize) {
        let anchor_prev = self.node(anchor).and_then(|n| n.prev);
        self.set_prev(handle, anchor_prev);
        self.set_next(handle, Some(anchor));
        match anchor_prev {
            Some(p) => self.set_next(p, Some(handle)),
            None => self.front = Some(handle),
        }
        self.set_prev(anchor, Some(handle));
    }
}
