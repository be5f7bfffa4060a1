//! Insertion-ordered list with O(1) removal through stable handles.
//!
//! Nodes keep their fanin/fanout edges and jumps in an [`IndexList`]. The
//! [`ListHandle`] returned by `push_back` is stored on the edge (its
//! "satellite") so that removing the edge from both endpoint lists does not
//! require a scan.

use serde::{Deserialize, Serialize};

/// Stable position of an element inside an [`IndexList`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ListHandle(u32);

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Slot<T> {
    value: Option<T>,
    prev: Option<u32>,
    next: Option<u32>,
}

/// A doubly linked list stored in a vector of slots.
///
/// Freed slots are recycled by later insertions. Iteration follows
/// insertion order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexList<T> {
    slots: Vec<Slot<T>>,
    head: Option<u32>,
    tail: Option<u32>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for IndexList<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            head: None,
            tail: None,
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> IndexList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value` and returns its handle.
    pub fn push_back(&mut self, value: T) -> ListHandle {
        let slot = Slot {
            value: Some(value),
            prev: self.tail,
            next: None,
        };
        let index = match self.free.pop() {
            Some(i) => {
                self.slots[i as usize] = slot;
                i
            }
            None => {
                self.slots.push(slot);
                (self.slots.len() - 1) as u32
            }
        };
        match self.tail {
            Some(t) => self.slots[t as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        ListHandle(index)
    }

    /// Removes the element at `handle`, returning it.
    ///
    /// Returns `None` if the handle was already removed.
    pub fn remove(&mut self, handle: ListHandle) -> Option<T> {
        let index = handle.0;
        let slot = self.slots.get_mut(index as usize)?;
        let value = slot.value.take()?;
        let (prev, next) = (slot.prev.take(), slot.next.take());
        match prev {
            Some(p) => self.slots[p as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n as usize].prev = prev,
            None => self.tail = prev,
        }
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }

    /// Returns the element at `handle`, if still present.
    pub fn get(&self, handle: ListHandle) -> Option<&T> {
        self.slots.get(handle.0 as usize)?.value.as_ref()
    }

    /// Returns the first element.
    pub fn first(&self) -> Option<&T> {
        self.head.and_then(|h| self.slots[h as usize].value.as_ref())
    }

    /// Iterates over elements in insertion order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Iterator over an [`IndexList`] in insertion order.
pub struct Iter<'a, T> {
    list: &'a IndexList<T>,
    cursor: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let index = self.cursor?;
        let slot = &self.list.slots[index as usize];
        self.cursor = slot.next;
        slot.value.as_ref()
    }
}

impl<'a, T> IntoIterator for &'a IndexList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
