// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Value-keyed arranger with batched move measurement.
//!
//! [`MasterArranger`] tracks arbitrary caller values under a common root.
//! Each value is materialized into a node once, through a caller-supplied
//! factory, and then moved between containers with
//! [`reparent`](MasterArranger::reparent). Moves mutate the tree right away
//! but are *measured* lazily: the first move in a frame snapshots every
//! container transform and requests a frame, and the next
//! [`clean`](MasterArranger::clean) computes all pending deltas in one pass,
//! however many items moved in between.
//!
//! Unlike the element arrangers, every item owns its own timeline so that
//! values can enter, move and leave on independent schedules.

use core::fmt;
use core::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use kurbo::{Affine, Point};
use tracing::{debug, trace, warn};
use understory_dirty::{CycleHandling, DirtyTracker};

use crate::dirty;
use crate::error::{Error, Result};
use crate::geometry::{accumulated_transform, compute_delta_transform};
use crate::host::{Host, NodeId};
use crate::item::{Cue, CueKind, ItemState, ItemTimeline};
use crate::slab::{ItemId, ItemSlab};
use crate::timeline::Timeline;
use crate::transition::MasterTransitions;

/// Builds the node that represents a value. Invoked at most once per value.
pub type Factory<T, H> = Box<dyn FnMut(&T, &mut H) -> NodeId>;

/// Hooks fired around every clean pass.
#[derive(Default)]
pub struct MasterCallbacks {
    pre_clean: Option<Box<dyn FnMut()>>,
    post_clean: Option<Box<dyn FnMut()>>,
}

impl MasterCallbacks {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs when the first move of a frame marks the arranger dirty, before
    /// container transforms are snapshotted.
    #[must_use]
    pub fn with_pre_clean(mut self, f: impl FnMut() + 'static) -> Self {
        self.pre_clean = Some(Box::new(f));
        self
    }

    /// Runs after the clean pass dispatched its moves.
    #[must_use]
    pub fn with_post_clean(mut self, f: impl FnMut() + 'static) -> Self {
        self.post_clean = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for MasterCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterCallbacks")
            .field("pre_clean", &self.pre_clean.is_some())
            .field("post_clean", &self.post_clean.is_some())
            .finish()
    }
}

struct ManagedItem<T> {
    value: T,
    node: NodeId,
    state: ItemState,
    container: NodeId,
    last_container: Option<NodeId>,
    /// Root-space center recorded before the pending move.
    last_position: Option<Point>,
    timeline: Option<ItemTimeline>,
    epoch: u32,
    pending_move: bool,
}

#[derive(Clone, Copy, Debug)]
struct ManagedContainer {
    /// Root-relative transform at the latest dirty pass.
    transform: Affine,
    last_transform: Option<Affine>,
}

/// Tracks caller values of type `T` as nodes of a host `H`.
pub struct MasterArranger<T, H> {
    root: NodeId,
    values: IndexMap<T, ItemId>,
    items: ItemSlab<ManagedItem<T>>,
    containers: IndexMap<NodeId, ManagedContainer>,
    factory: Factory<T, H>,
    /// Nodes built for values whose registration failed, kept for a retry.
    unplaced: IndexMap<T, NodeId>,
    transitions: MasterTransitions<T>,
    callbacks: MasterCallbacks,
    dirty: bool,
    movers: DirtyTracker<u32>,
}

impl<T, H> fmt::Debug for MasterArranger<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterArranger")
            .field("root", &self.root)
            .field("items", &self.items.len())
            .field("containers", &self.containers.len())
            .field("transitions", &self.transitions)
            .field("callbacks", &self.callbacks)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

/// Center of `node` relative to the border-box origin of `root`.
fn root_position(host: &impl Host, root: NodeId, node: NodeId) -> Point {
    let origin = host.bounding_rect(root).origin();
    host.bounding_rect(node).center() - origin.to_vec2()
}

impl<T, H> MasterArranger<T, H>
where
    T: Clone + Eq + Hash,
    H: Host,
{
    /// Creates an arranger for the subtree under `root`.
    pub fn new(root: NodeId, factory: impl FnMut(&T, &mut H) -> NodeId + 'static) -> Self {
        Self {
            root,
            values: IndexMap::new(),
            items: ItemSlab::new(),
            containers: IndexMap::new(),
            factory: Box::new(factory),
            unplaced: IndexMap::new(),
            transitions: MasterTransitions::new(),
            callbacks: MasterCallbacks::new(),
            dirty: false,
            movers: DirtyTracker::with_cycle_handling(CycleHandling::Error),
        }
    }

    /// Sets the enter/move/leave effects.
    #[must_use]
    pub fn with_transitions(mut self, transitions: MasterTransitions<T>) -> Self {
        self.transitions = transitions;
        self
    }

    /// Sets the clean-pass hooks.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: MasterCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Registers values whose nodes are already in place.
    ///
    /// Each value is materialized through the factory and tracked as
    /// `ACTIVE` in its node's current parent (or the root when detached),
    /// without an enter transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotDescendant`] if a node's parent lies outside the
    /// root.
    pub fn adopt(&mut self, host: &mut H, values: impl IntoIterator<Item = T>) -> Result<()> {
        let root = self.root;
        for value in values {
            let id = self.get_item(host, value, None)?;
            if let Some(item) = self.items.get_mut(id)
                && item.state == ItemState::Initial
            {
                item.state = ItemState::Active;
                if host.is_connected(item.node) {
                    item.last_position = Some(root_position(&*host, root, item.node));
                }
            }
        }
        Ok(())
    }

    /// The root all containers must live under.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the state of a tracked value.
    #[must_use]
    pub fn state(&self, value: &T) -> Option<ItemState> {
        self.item(value).map(|item| item.state)
    }

    /// Returns the node materialized for a tracked value.
    #[must_use]
    pub fn node(&self, value: &T) -> Option<NodeId> {
        self.item(value).map(|item| item.node)
    }

    /// Returns the container a tracked value currently belongs to.
    #[must_use]
    pub fn container_of(&self, value: &T) -> Option<NodeId> {
        self.item(value).map(|item| item.container)
    }

    /// Returns the slab handle of a tracked value.
    #[must_use]
    pub fn item_id(&self, value: &T) -> Option<ItemId> {
        self.values.get(value).copied()
    }

    /// Returns `true` if the value is tracked (including while it leaves).
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.values.contains_key(value)
    }

    /// Tracked values, in registration order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.values.keys()
    }

    /// Number of tracked values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no value is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` between the first move of a frame and the clean pass.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns `true` while any item's timeline is playing.
    #[must_use]
    pub fn transitioning(&self) -> bool {
        self.items.iter().any(|(_, item)| item.timeline.is_some())
    }

    /// Moves `value` under `parent`, or starts its exit when `parent` is
    /// `None`.
    ///
    /// An untracked value with a parent is created and enters. A tracked
    /// value with a parent moves there (a leaving one restarts its enter
    /// instead). An untracked value without a parent is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotDescendant`] if `parent` lies outside the root.
    pub fn reparent(&mut self, host: &mut H, value: T, parent: Option<NodeId>) -> Result<()> {
        if let Some(&id) = self.values.get(&value) {
            match parent {
                Some(parent) => {
                    self.get_container(host, parent)?;
                    let Some(item) = self.items.get_mut(id) else {
                        return Ok(());
                    };
                    item.last_container = Some(item.container);
                    item.container = parent;
                    if item.state == ItemState::Leaving {
                        self.item_enter(host, id);
                    } else {
                        self.item_move(host, id);
                    }
                }
                None => self.item_leave(host, id),
            }
        } else if let Some(parent) = parent {
            let id = self.get_item(host, value, Some(parent))?;
            self.item_enter(host, id);
        }
        Ok(())
    }

    /// Schedules a move measurement for `value` without changing its
    /// container, for when its position changed through some other means
    /// (a sibling was reordered, say).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownValue`] if the value is not tracked.
    pub fn reposition(&mut self, host: &mut H, value: &T) -> Result<()> {
        let id = self.item_id(value).ok_or(Error::UnknownValue)?;
        let Some(item) = self.items.get_mut(id) else {
            return Err(Error::UnknownValue);
        };
        if self.transitions.moved.is_none() || item.pending_move {
            return Ok(());
        }
        item.last_container = Some(item.container);
        item.pending_move = true;
        self.movers.mark(id.idx, dirty::MOVE);
        self.mark_dirty(host);
        Ok(())
    }

    /// Applies a complete layout of `(value, parent)` rows.
    ///
    /// Every row goes through [`reparent`](Self::reparent); tracked values
    /// missing from `layout` leave.
    ///
    /// # Errors
    ///
    /// Stops at the first row whose parent lies outside the root.
    pub fn update_all(
        &mut self,
        host: &mut H,
        layout: impl IntoIterator<Item = (T, Option<NodeId>)>,
    ) -> Result<()> {
        let mut doomed: IndexSet<T> = self.values.keys().cloned().collect();
        for (value, parent) in layout {
            doomed.shift_remove(&value);
            self.reparent(host, value, parent)?;
        }
        for value in doomed {
            self.reparent(host, value, None)?;
        }
        Ok(())
    }

    /// Makes `children` the tracked contents of `parent`, in order.
    ///
    /// Values currently under `parent` but missing from `children` leave.
    /// With `parent` set to `None`, every listed child leaves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotDescendant`] if `parent` lies outside the root.
    pub fn update_single(
        &mut self,
        host: &mut H,
        parent: Option<NodeId>,
        children: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        let Some(parent) = parent else {
            for child in children {
                self.reparent(host, child, None)?;
            }
            return Ok(());
        };

        self.get_container(host, parent)?;
        let mut doomed: IndexSet<T> = self
            .values
            .iter()
            .filter(|&(_, &id)| {
                self.items
                    .get(id)
                    .is_some_and(|item| item.container == parent)
            })
            .map(|(value, _)| value.clone())
            .collect();
        for child in children {
            doomed.shift_remove(&child);
            self.reparent(host, child, Some(parent))?;
        }
        for value in doomed {
            self.reparent(host, value, None)?;
        }
        Ok(())
    }

    /// Frame hook: runs the pending clean pass, then advances every item
    /// timeline by `dt` seconds.
    pub fn frame(&mut self, host: &mut H, dt: f64) {
        self.clean(host);
        self.advance(host, dt);
    }

    /// Measures every pending move and dispatches its move transition.
    /// Does nothing unless the arranger is dirty.
    pub fn clean(&mut self, host: &mut H) {
        if !self.dirty {
            return;
        }
        let movers: Vec<u32> = self
            .movers
            .drain(dirty::MOVE)
            .deterministic()
            .run()
            .collect();
        let mut moved = 0_usize;
        for idx in movers {
            if let Some(id) = self.items.id_at(idx)
                && self.dispatch_move(&*host, id)
            {
                moved += 1;
            }
        }
        if moved > 0 {
            host.request_frame();
        }

        self.dirty = false;
        debug!(moved, "clean pass");
        if let Some(post_clean) = self.callbacks.post_clean.as_mut() {
            post_clean();
        }
    }

    /// Advances every item timeline by `dt` seconds and applies the cues
    /// that fire.
    pub fn advance(&mut self, host: &mut H, dt: f64) {
        let mut fired = Vec::new();
        let mut live = false;
        for (_, item) in self.items.iter_mut() {
            let Some(timeline) = item.timeline.as_mut() else {
                continue;
            };
            fired.extend(timeline.advance(dt));
            if timeline.is_complete() {
                item.timeline = None;
            } else {
                live = true;
            }
        }
        for cue in fired {
            self.apply_cue(host, cue);
        }
        if live {
            host.request_frame();
        }
    }

    fn item(&self, value: &T) -> Option<&ManagedItem<T>> {
        self.values.get(value).and_then(|&id| self.items.get(id))
    }

    fn get_item(&mut self, host: &mut H, value: T, parent: Option<NodeId>) -> Result<ItemId> {
        if let Some(&id) = self.values.get(&value) {
            return Ok(id);
        }
        if let Some(parent) = parent {
            self.get_container(host, parent)?;
        }

        let node = match self.unplaced.swap_remove(&value) {
            Some(node) => node,
            None => (self.factory)(&value, host),
        };
        let container = parent.or_else(|| host.parent(node)).unwrap_or(self.root);
        if let Err(err) = self.get_container(host, container) {
            self.unplaced.insert(value, node);
            return Err(err);
        }

        let id = self.items.insert(ManagedItem {
            value: value.clone(),
            node,
            state: ItemState::Initial,
            container,
            last_container: None,
            last_position: None,
            timeline: None,
            epoch: 0,
            pending_move: false,
        });
        self.values.insert(value, id);
        trace!(?id, ?node, "created item");
        Ok(id)
    }

    fn get_container(&mut self, host: &H, node: NodeId) -> Result<()> {
        if self.containers.contains_key(&node) {
            return Ok(());
        }
        let transform = accumulated_transform(host, self.root, node)?;
        self.containers.insert(
            node,
            ManagedContainer {
                transform,
                last_transform: None,
            },
        );
        Ok(())
    }

    fn item_enter(&mut self, host: &mut H, id: ItemId) {
        let root = self.root;
        let Some(item) = self.items.get_mut(id) else {
            return;
        };
        host.append_child(item.container, item.node);
        if item.state == ItemState::Entering {
            warn!(?id, "item was already entering");
            return;
        }
        item.epoch += 1;

        match self.transitions.enter.as_mut() {
            Some(enter) => {
                trace!(?id, "enter");
                item.state = ItemState::Entering;
                let timeline = item.timeline.get_or_insert_with(Timeline::default);
                let now = timeline.time();
                enter(&item.value, item.node, timeline, now);
                timeline.call(Cue::new(CueKind::Activate, id, item.epoch));
                host.request_frame();
            }
            None => {
                item.state = ItemState::Active;
                if host.is_connected(item.node) {
                    item.last_position = Some(root_position(&*host, root, item.node));
                }
            }
        }
    }

    fn item_leave(&mut self, host: &mut H, id: ItemId) {
        let Some(item) = self.items.get_mut(id) else {
            return;
        };
        if item.state == ItemState::Leaving {
            return;
        }

        match self.transitions.leave.as_mut() {
            Some(leave) => {
                trace!(?id, "leave");
                item.state = ItemState::Leaving;
                item.epoch += 1;
                let timeline = item.timeline.get_or_insert_with(Timeline::default);
                let now = timeline.time();
                leave(&item.value, item.node, timeline, now);
                timeline.call(Cue::new(CueKind::Remove, id, item.epoch));
                host.request_frame();
            }
            None => self.remove_item(host, id),
        }
    }

    fn item_move(&mut self, host: &mut H, id: ItemId) {
        let root = self.root;
        let Some(item) = self.items.get_mut(id) else {
            return;
        };
        let (container, node) = (item.container, item.node);

        let measure = self.transitions.moved.is_some() && !item.pending_move;
        if measure {
            if host.is_connected(node) {
                item.last_position = Some(root_position(&*host, root, node));
            }
            item.pending_move = true;
            self.movers.mark(id.idx, dirty::MOVE);
            self.mark_dirty(host);
        }
        host.append_child(container, node);
    }

    fn remove_item(&mut self, host: &mut H, id: ItemId) {
        let Some(item) = self.items.remove(id) else {
            return;
        };
        host.remove(item.node);
        host.forget(item.node);
        self.values.shift_remove(&item.value);
        self.movers.remove_key(id.idx);
        trace!(?id, "removed item");
    }

    /// Snapshots container transforms and requests a frame, once per frame.
    fn mark_dirty(&mut self, host: &mut H) {
        if self.dirty {
            return;
        }
        self.dirty = true;
        if let Some(pre_clean) = self.callbacks.pre_clean.as_mut() {
            pre_clean();
        }
        for (&node, container) in &mut self.containers {
            container.last_transform = Some(container.transform);
            match accumulated_transform(&*host, self.root, node) {
                Ok(transform) => container.transform = transform,
                Err(err) => warn!(?node, %err, "keeping stale container transform"),
            }
        }
        host.request_frame();
    }

    fn dispatch_move(&mut self, host: &H, id: ItemId) -> bool {
        let root = self.root;
        let Some(moved) = self.transitions.moved.as_mut() else {
            return false;
        };
        let Some(item) = self.items.get_mut(id) else {
            return false;
        };
        item.pending_move = false;
        let Some(container) = self.containers.get(&item.container) else {
            return false;
        };
        let last = item
            .last_container
            .and_then(|c| self.containers.get(&c))
            .and_then(|c| c.last_transform);
        let delta = compute_delta_transform(
            container.transform,
            last,
            root_position(host, root, item.node),
            item.last_position,
        );
        if delta.is_identity() {
            return false;
        }

        // Leaving items still glide but stay LEAVING.
        let leaving = item.state == ItemState::Leaving;
        if !leaving {
            item.state = ItemState::Moving;
        }
        trace!(?id, ?delta, "move");
        let timeline = item.timeline.get_or_insert_with(Timeline::default);
        let now = timeline.time();
        moved(&item.value, item.node, timeline, now, &delta);
        if !leaving {
            timeline.call(Cue::new(CueKind::Activate, id, item.epoch));
        }
        true
    }

    fn apply_cue(&mut self, host: &mut H, cue: Cue<ItemId>) {
        let root = self.root;
        let Some(item) = self.items.get_mut(cue.key) else {
            return;
        };
        if item.epoch != cue.epoch {
            trace!(id = ?cue.key, "ignoring superseded cue");
            return;
        }
        match cue.kind {
            CueKind::Activate => {
                item.state = ItemState::Active;
                if host.is_connected(item.node) {
                    item.last_position = Some(root_position(&*host, root, item.node));
                }
            }
            CueKind::Remove => self.remove_item(host, cue.key),
        }
    }
}
