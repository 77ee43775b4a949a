// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-item lifecycle state and the cues that drive it.

use crate::host::NodeId;
use crate::slab::ItemId;
use crate::timeline::Timeline;

/// Lifecycle state of a tracked item.
///
/// ```text
/// INITIAL ──► ENTERING ──► ACTIVE ◄──► MOVING
///                            │           │
///                            └──► LEAVING ◄┘ ──► (removed)
/// ```
///
/// A `LEAVING` item that is requested again restarts at `ENTERING`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Created but not yet entered.
    #[default]
    Initial,
    /// Playing its enter transition.
    Entering,
    /// Present and idle.
    Active,
    /// Playing its move transition.
    Moving,
    /// Logically removed, still present until its exit transition finishes.
    Leaving,
}

/// What an arranger does when a [`Cue`] fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum CueKind {
    /// An enter or move transition finished: the item becomes `ACTIVE`.
    Activate,
    /// A leave transition finished: the item is dropped from the registry.
    Remove,
}

/// A state-transition marker queued on an arranger's timeline.
///
/// Cues are opaque to callers. Each carries the *epoch* of the request that
/// queued it; an item's epoch advances on every enter and leave request, so
/// cues belonging to a superseded request are recognized and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cue<K> {
    pub(crate) kind: CueKind,
    pub(crate) key: K,
    pub(crate) epoch: u32,
}

impl<K> Cue<K> {
    pub(crate) fn new(kind: CueKind, key: K, epoch: u32) -> Self {
        Self { kind, key, epoch }
    }
}

/// Timeline type shared by the element-keyed arrangers.
pub type ArrangerTimeline = Timeline<Cue<NodeId>>;

/// Per-item timeline used by [`MasterArranger`](crate::master::MasterArranger).
pub type ItemTimeline = Timeline<Cue<ItemId>>;
