// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-container reconciler.
//!
//! [`ScatteredArranger`] runs the same diff as
//! [`ElementArranger`](crate::element::ElementArranger) once per container,
//! but shares a single timeline and a single pending commit across all of
//! them. Items may hop between containers. Their move transitions then
//! receive a delta measured in the local space of the destination
//! container, so an item can glide smoothly between differently
//! transformed parents.
//!
//! Geometry is snapshotted on the first mutation after a paint: every
//! container's transform and every attached item's page position. The
//! commit compares the freshly laid-out geometry against that snapshot.

use core::mem;
use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use kurbo::{Affine, Point};
use tracing::{debug, trace, warn};

use crate::diff::{self, Reconcile};
use crate::error::{Error, Result};
use crate::geometry::{Transform2d, compute_delta_transform, element_position, element_transform};
use crate::host::{Host, NodeId};
use crate::item::{ArrangerTimeline, Cue, CueKind, ItemState};
use crate::timeline::Timeline;
use crate::transition::Transitions;

/// One container and the children it should hold, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    /// The container element.
    pub container: NodeId,
    /// Its children, in order. Duplicates are dropped.
    pub children: Vec<NodeId>,
}

impl From<(NodeId, Vec<NodeId>)> for Group {
    fn from((container, children): (NodeId, Vec<NodeId>)) -> Self {
        Self {
            container,
            children,
        }
    }
}

impl From<(NodeId, IndexSet<NodeId>)> for Group {
    fn from((container, children): (NodeId, IndexSet<NodeId>)) -> Self {
        Self {
            container,
            children: children.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<(NodeId, [NodeId; N])> for Group {
    fn from((container, children): (NodeId, [NodeId; N])) -> Self {
        Self {
            container,
            children: children.to_vec(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ScatteredItem {
    state: ItemState,
    container: NodeId,
    last_container: Option<NodeId>,
    last_position: Option<Point>,
    epoch: u32,
}

impl ScatteredItem {
    fn new(container: NodeId, state: ItemState) -> Self {
        Self {
            state,
            container,
            last_container: None,
            last_position: None,
            epoch: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Container {
    order: Vec<NodeId>,
    /// Page-space transform at the last snapshot.
    transform: Affine,
}

/// Reconciles items spread across several containers.
pub struct ScatteredArranger {
    items: IndexMap<NodeId, ScatteredItem>,
    containers: IndexMap<NodeId, Container>,
    transitions: Transitions<Transform2d>,
    timeline: Option<ArrangerTimeline>,
    commit_pending: bool,
    /// Dropped items whose nodes the next commit detaches.
    released: Vec<NodeId>,
}

impl core::fmt::Debug for ScatteredArranger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScatteredArranger")
            .field("items", &self.items.len())
            .field("containers", &self.containers.len())
            .field("transitions", &self.transitions)
            .field("transitioning", &self.transitioning())
            .field("commit_pending", &self.commit_pending)
            .finish_non_exhaustive()
    }
}

impl ScatteredArranger {
    /// Creates an arranger from an initial layout.
    ///
    /// Initial children are registered `ACTIVE` without an enter
    /// transition.
    pub fn new<G: Into<Group>>(
        host: &mut impl Host,
        initial: impl IntoIterator<Item = G>,
        transitions: Transitions<Transform2d>,
    ) -> Self {
        let mut arranger = Self {
            items: IndexMap::new(),
            containers: IndexMap::new(),
            transitions,
            timeline: None,
            commit_pending: false,
            released: Vec::new(),
        };
        for group in initial {
            let group = group.into();
            arranger.containers.entry(group.container).or_default();
            for node in diff::dedup(group.children) {
                if arranger.items.contains_key(&node) {
                    continue;
                }
                arranger
                    .items
                    .insert(node, ScatteredItem::new(group.container, ItemState::Active));
                arranger.containers[&group.container].order.push(node);
            }
        }
        if !arranger.containers.is_empty() {
            arranger.refresh(host);
        }
        arranger
    }

    /// Tracked containers, in registration order.
    pub fn containers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.containers.keys().copied()
    }

    /// Tracked items, in registration order.
    pub fn items(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.keys().copied()
    }

    /// The working order of `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownContainer`] if the container is not tracked.
    pub fn order(&self, container: NodeId) -> Result<&[NodeId]> {
        self.containers
            .get(&container)
            .map(|c| c.order.as_slice())
            .ok_or(Error::UnknownContainer(container))
    }

    /// Returns the state of a tracked item.
    #[must_use]
    pub fn state(&self, node: NodeId) -> Option<ItemState> {
        self.items.get(&node).map(|item| item.state)
    }

    /// Returns the container an item currently belongs to.
    #[must_use]
    pub fn container_of(&self, node: NodeId) -> Option<NodeId> {
        self.items.get(&node).map(|item| item.container)
    }

    /// Number of tracked items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no item is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The shared timeline, created on first use.
    pub fn timeline(&mut self) -> &mut ArrangerTimeline {
        self.timeline.get_or_insert_with(Timeline::default)
    }

    /// Returns `true` while a transition started by the arranger is playing.
    #[must_use]
    pub fn transitioning(&self) -> bool {
        self.timeline.is_some()
    }

    /// Returns `true` if a commit is waiting for the next frame.
    #[must_use]
    pub fn is_commit_pending(&self) -> bool {
        self.commit_pending
    }

    /// Resnapshots geometry and schedules a commit without changing any
    /// order. Use after the surrounding layout changed on its own.
    pub fn refresh(&mut self, host: &mut impl Host) {
        self.touch(host);
    }

    /// Requests a new layout.
    ///
    /// Each group is diffed against its container's current order. An item
    /// of a listed container that no group mentions leaves. Items new to
    /// the arranger, or mid-exit, enter, and items listed under a different
    /// container than before move there without re-entering. Containers
    /// missing from `layout` are not diffed: they keep their order, minus
    /// any item that moved elsewhere.
    pub fn update<G: Into<Group>>(
        &mut self,
        host: &mut impl Host,
        layout: impl IntoIterator<Item = G>,
    ) {
        self.snapshot_if_idle(host);

        let mut targets: IndexMap<NodeId, Vec<NodeId>> = IndexMap::new();
        for group in layout {
            let group = group.into();
            targets
                .entry(group.container)
                .or_default()
                .extend(group.children);
        }

        let all_old: HashSet<NodeId> = self
            .containers
            .values()
            .flat_map(|c| c.order.iter().copied())
            .collect();
        let mut all_target = HashSet::new();
        for (&container, children) in &mut targets {
            *children = diff::dedup(mem::take(children));
            self.containers.entry(container).or_default();
            for &node in children.iter() {
                all_target.insert(node);
                self.items
                    .entry(node)
                    .or_insert_with(|| ScatteredItem::new(container, ItemState::Initial));
            }
        }

        for (container, target) in targets {
            let old = mem::take(&mut self.containers[&container].order);
            let order = diff::reconcile(
                &old,
                &target,
                |node| all_old.contains(&node),
                |node| all_target.contains(&node),
                self,
            );
            for node in &order {
                if let Some(item) = self.items.get_mut(node) {
                    item.container = container;
                }
            }
            self.containers[&container].order = order;
        }

        // Drop items from containers they no longer belong to.
        let items = &self.items;
        for (id, container) in &mut self.containers {
            container
                .order
                .retain(|node| items.get(node).is_some_and(|item| item.container == *id));
        }

        self.schedule_commit(host);
    }

    /// Moves `node` into `container` at `index`, or starts its exit when
    /// `container` is `None`.
    ///
    /// Unknown containers are created on demand. `index` is clamped to the
    /// container's length; `None` appends. An untracked node moved into a
    /// container enters; a node mid-exit restarts its enter.
    pub fn reparent(
        &mut self,
        host: &mut impl Host,
        node: NodeId,
        container: Option<NodeId>,
        index: Option<usize>,
    ) {
        self.snapshot_if_idle(host);

        match container {
            Some(container) => {
                self.containers.entry(container).or_default();
                match self.items.get(&node) {
                    Some(item) => {
                        let from = item.container;
                        if item.state == ItemState::Leaving {
                            self.enter(node);
                        }
                        if let Some(old) = self.containers.get_mut(&from) {
                            old.order.retain(|&n| n != node);
                        }
                    }
                    None => {
                        self.items
                            .insert(node, ScatteredItem::new(container, ItemState::Initial));
                        self.enter(node);
                    }
                }
                if let Some(item) = self.items.get_mut(&node) {
                    item.container = container;
                }
                let order = &mut self.containers[&container].order;
                let at = index.map_or(order.len(), |i| i.min(order.len()));
                order.insert(at, node);
            }
            None => {
                let Some(item) = self.items.get(&node) else {
                    return;
                };
                let from = item.container;
                if !self.leave(node)
                    && let Some(old) = self.containers.get_mut(&from)
                {
                    old.order.retain(|&n| n != node);
                }
            }
        }

        self.schedule_commit(host);
    }

    /// Forgets containers that hold no children and that no tracked item
    /// refers to. Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        let referenced: HashSet<NodeId> = self
            .items
            .values()
            .flat_map(|item| [Some(item.container), item.last_container])
            .flatten()
            .collect();
        let before = self.containers.len();
        self.containers
            .retain(|id, c| !c.order.is_empty() || referenced.contains(id));
        let pruned = before - self.containers.len();
        if pruned > 0 {
            debug!(pruned, "pruned empty containers");
        }
        pruned
    }

    /// Frame hook: runs the pending commit, then advances the shared
    /// timeline by `dt` seconds.
    pub fn frame(&mut self, host: &mut impl Host, dt: f64) {
        self.commit(host);
        self.advance(host, dt);
    }

    /// Applies every container's working order, then dispatches move
    /// transitions. Does nothing without a pending commit.
    pub fn commit(&mut self, host: &mut impl Host) {
        if !self.commit_pending {
            return;
        }
        self.commit_pending = false;

        for (&id, container) in &self.containers {
            host.replace_children(id, &container.order);
        }
        for node in mem::take(&mut self.released) {
            if !self.items.contains_key(&node) {
                host.forget(node);
            }
        }
        debug!(
            containers = self.containers.len(),
            items = self.items.len(),
            "committed layout"
        );

        if self.transitions.moved.is_none() {
            return;
        }
        let now = self.timeline.as_ref().map_or(0.0, Timeline::time);
        let nodes: Vec<NodeId> = self
            .containers
            .values()
            .flat_map(|c| c.order.iter().copied())
            .collect();
        for node in nodes {
            self.item_move(&*host, node, now);
        }
    }

    /// Advances the shared timeline by `dt` seconds and applies the cues
    /// that fire.
    pub fn advance(&mut self, host: &mut impl Host, dt: f64) {
        let Some(timeline) = self.timeline.as_mut() else {
            return;
        };
        for cue in timeline.advance(dt) {
            self.apply_cue(host, cue);
        }
        match &self.timeline {
            Some(timeline) if timeline.is_complete() => self.timeline = None,
            Some(_) => host.request_frame(),
            None => {}
        }
    }

    fn touch(&mut self, host: &mut impl Host) {
        self.snapshot_if_idle(host);
        self.schedule_commit(host);
    }

    /// Records the painted geometry, once per frame.
    ///
    /// While a commit is pending the DOM still shows the previous paint, so
    /// the first snapshot taken after it is the one to keep.
    fn snapshot_if_idle(&mut self, host: &impl Host) {
        if self.commit_pending {
            return;
        }
        for (&id, container) in &mut self.containers {
            container.transform = element_transform(host, id);
        }
        for (&node, item) in &mut self.items {
            if host.is_connected(node) {
                item.last_position = Some(element_position(host, node));
            }
            item.last_container = Some(item.container);
        }
    }

    fn schedule_commit(&mut self, host: &mut impl Host) {
        if self.commit_pending {
            return;
        }
        self.commit_pending = true;
        host.request_frame();
    }

    fn item_move(&mut self, host: &impl Host, node: NodeId, now: f64) {
        let Some(moved) = self.transitions.moved.as_mut() else {
            return;
        };
        let Some(item) = self.items.get_mut(&node) else {
            return;
        };
        if item.state == ItemState::Moving {
            return;
        }
        let Some(last_position) = item.last_position else {
            return;
        };

        let current = element_transform(host, item.container);
        let last = item
            .last_container
            .and_then(|c| self.containers.get(&c))
            .map(|c| c.transform);
        let delta = compute_delta_transform(
            current,
            last,
            element_position(host, node),
            Some(last_position),
        );
        if delta.is_identity() {
            return;
        }
        if !(delta.sx.is_finite() && delta.sy.is_finite()) {
            warn!(?node, "container transform is degenerate, skipping move");
            return;
        }

        let leaving = item.state == ItemState::Leaving;
        if !leaving {
            item.state = ItemState::Moving;
        }
        let epoch = item.epoch;

        trace!(?node, ?delta, "move");
        let timeline = self.timeline.get_or_insert_with(Timeline::default);
        moved(node, timeline, now, &delta);
        if !leaving {
            timeline.call(Cue::new(CueKind::Activate, node, epoch));
        }
    }

    fn apply_cue(&mut self, host: &mut impl Host, cue: Cue<NodeId>) {
        let Some(item) = self.items.get_mut(&cue.key) else {
            return;
        };
        if item.epoch != cue.epoch {
            trace!(node = ?cue.key, "ignoring superseded cue");
            return;
        }
        match cue.kind {
            CueKind::Activate => item.state = ItemState::Active,
            CueKind::Remove => {
                let container = item.container;
                self.items.shift_remove(&cue.key);
                self.released.push(cue.key);
                if let Some(c) = self.containers.get_mut(&container) {
                    c.order.retain(|&node| node != cue.key);
                }
                self.touch(host);
            }
        }
    }
}

impl Reconcile<NodeId> for ScatteredArranger {
    fn leave(&mut self, node: NodeId) -> bool {
        let Some(item) = self.items.get_mut(&node) else {
            return false;
        };
        if item.state == ItemState::Leaving {
            return true;
        }
        item.state = ItemState::Leaving;
        item.epoch += 1;
        let epoch = item.epoch;

        if let Some(leave) = self.transitions.leave.as_mut() {
            trace!(?node, "leave");
            let timeline = self.timeline.get_or_insert_with(Timeline::default);
            let now = timeline.time();
            leave(node, timeline, now);
            timeline.call(Cue::new(CueKind::Remove, node, epoch));
            true
        } else {
            self.items.shift_remove(&node);
            self.released.push(node);
            false
        }
    }

    fn enter(&mut self, node: NodeId) {
        let Some(item) = self.items.get_mut(&node) else {
            return;
        };
        if item.state == ItemState::Entering {
            warn!(?node, "item was already entering");
            return;
        }
        item.epoch += 1;
        let epoch = item.epoch;

        if let Some(enter) = self.transitions.enter.as_mut() {
            trace!(?node, "enter");
            item.state = ItemState::Entering;
            let timeline = self.timeline.get_or_insert_with(Timeline::default);
            let now = timeline.time();
            enter(node, timeline, now);
            timeline.call(Cue::new(CueKind::Activate, node, epoch));
        } else {
            item.state = ItemState::Active;
        }
    }

    fn is_leaving(&self, node: NodeId) -> bool {
        self.items
            .get(&node)
            .is_some_and(|item| item.state == ItemState::Leaving)
    }
}
