// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational storage for arranger items.

use core::fmt;

/// A handle to an item in an [`ItemSlab`].
///
/// Contains both a slot index and a generation counter so that stale handles
/// (for instance a cue queued for an item that has since been removed and
/// whose slot was reused) can be detected.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId {
    /// Slot index into the slab.
    pub(crate) idx: u32,
    /// Generation counter; must match the slab's generation for this slot.
    pub(crate) generation: u32,
}

impl ItemId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({}@gen{})", self.idx, self.generation)
    }
}

/// Slot storage with a free list. Freed slots bump their generation so old
/// handles fail lookup.
#[derive(Debug)]
pub(crate) struct ItemSlab<T> {
    slots: Vec<Option<T>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
}

impl<T> Default for ItemSlab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ItemSlab<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> ItemId {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Some(value);
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).expect("item slab exhausted u32 indices");
            self.slots.push(Some(value));
            self.generation.push(0);
            idx
        };
        ItemId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Removes the item, returning it if the handle was live.
    pub(crate) fn remove(&mut self, id: ItemId) -> Option<T> {
        if !self.is_alive(id) {
            return None;
        }
        let value = self.slots[id.idx as usize].take();
        self.generation[id.idx as usize] += 1;
        self.free_list.push(id.idx);
        value
    }

    pub(crate) fn is_alive(&self, id: ItemId) -> bool {
        (id.idx as usize) < self.slots.len()
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].is_some()
    }

    pub(crate) fn get(&self, id: ItemId) -> Option<&T> {
        if self.is_alive(id) {
            self.slots[id.idx as usize].as_ref()
        } else {
            None
        }
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut T> {
        if self.is_alive(id) {
            self.slots[id.idx as usize].as_mut()
        } else {
            None
        }
    }

    /// Returns the live handle at raw slot `idx`, if any.
    pub(crate) fn id_at(&self, idx: u32) -> Option<ItemId> {
        let slot = self.slots.get(idx as usize)?;
        slot.as_ref().map(|_| ItemId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (ItemId, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            let idx = u32::try_from(idx).ok()?;
            slot.as_ref().map(|value| {
                (
                    ItemId {
                        idx,
                        generation: self.generation[idx as usize],
                    },
                    value,
                )
            })
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (ItemId, &mut T)> + '_ {
        let generation = &self.generation;
        self.slots.iter_mut().enumerate().filter_map(move |(idx, slot)| {
            let idx = u32::try_from(idx).ok()?;
            slot.as_mut().map(|value| {
                (
                    ItemId {
                        idx,
                        generation: generation[idx as usize],
                    },
                    value,
                )
            })
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }
}
