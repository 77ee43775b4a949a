// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-container reconciler.
//!
//! [`ElementArranger`] owns the children of one container. Each
//! [`update`](ElementArranger::update) diffs the requested order against the
//! current one, fires enter and leave transitions, and defers the DOM write
//! to the next frame. The commit replaces the container's children in one
//! operation and then hands every item whose border box moved to the move
//! transition, together with its previous and new box.

use core::mem;
use std::collections::HashSet;

use indexmap::IndexMap;
use kurbo::Rect;
use tracing::{debug, trace, warn};

use crate::diff::{self, Reconcile};
use crate::host::{Host, NodeId};
use crate::item::{ArrangerTimeline, Cue, CueKind, ItemState};
use crate::timeline::Timeline;
use crate::transition::{RectMove, Transitions};

#[derive(Clone, Copy, Debug, Default)]
struct ElementItem {
    state: ItemState,
    last_rect: Option<Rect>,
    epoch: u32,
}

/// Reconciles the children of a single container against a target order.
///
/// The arranger keeps at most one commit pending: calling
/// [`update`](Self::update) several times before the next frame only
/// overwrites the in-memory order, and the single commit that follows
/// reflects the latest call.
pub struct ElementArranger {
    container: NodeId,
    items: IndexMap<NodeId, ElementItem>,
    order: Vec<NodeId>,
    transitions: Transitions<RectMove>,
    timeline: Option<ArrangerTimeline>,
    commit_pending: bool,
    /// Dropped items whose nodes the next commit detaches.
    released: Vec<NodeId>,
}

impl core::fmt::Debug for ElementArranger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ElementArranger")
            .field("container", &self.container)
            .field("order", &self.order)
            .field("items", &self.items.len())
            .field("transitions", &self.transitions)
            .field("transitioning", &self.transitioning())
            .field("commit_pending", &self.commit_pending)
            .finish_non_exhaustive()
    }
}

impl ElementArranger {
    /// Creates an arranger for `container`.
    ///
    /// `initial` elements are registered as `ACTIVE` without an enter
    /// transition (they are presumed already painted) and committed on the
    /// next frame. To animate them in, pass an empty `initial` and call
    /// [`update`](Self::update) instead.
    pub fn new(
        host: &mut impl Host,
        container: NodeId,
        initial: impl IntoIterator<Item = NodeId>,
        transitions: Transitions<RectMove>,
    ) -> Self {
        let mut arranger = Self {
            container,
            items: IndexMap::new(),
            order: Vec::new(),
            transitions,
            timeline: None,
            commit_pending: false,
            released: Vec::new(),
        };
        for node in diff::dedup(initial) {
            arranger.items.insert(
                node,
                ElementItem {
                    state: ItemState::Active,
                    ..ElementItem::default()
                },
            );
            arranger.order.push(node);
        }
        if !arranger.order.is_empty() {
            arranger.schedule_commit(host);
        }
        arranger
    }

    /// The container whose children are arranged.
    #[must_use]
    pub fn container(&self) -> NodeId {
        self.container
    }

    /// The working order, including items still playing their exit.
    #[must_use]
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns the state of a tracked element.
    #[must_use]
    pub fn state(&self, node: NodeId) -> Option<ItemState> {
        self.items.get(&node).map(|item| item.state)
    }

    /// Number of tracked elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no element is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The current timeline, created on first use. It is dropped once it
    /// completes and recreated when next needed.
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

    /// Requests a new arrangement.
    ///
    /// Duplicates in `target_order` are dropped (first occurrence wins).
    /// Elements absent from the current order, or currently leaving, enter;
    /// elements absent from `target_order` leave. With a leave transition
    /// configured, leaving elements keep their slot until it has played.
    pub fn update(&mut self, host: &mut impl Host, target_order: impl IntoIterator<Item = NodeId>) {
        let target = diff::dedup(target_order);
        let old = mem::take(&mut self.order);
        let old_set: HashSet<NodeId> = old.iter().copied().collect();
        let target_set: HashSet<NodeId> = target.iter().copied().collect();

        self.order = diff::reconcile(
            &old,
            &target,
            |node| old_set.contains(&node),
            |node| target_set.contains(&node),
            self,
        );
        self.schedule_commit(host);
    }

    /// Frame hook: runs the pending commit, then advances the timeline by
    /// `dt` seconds.
    pub fn frame(&mut self, host: &mut impl Host, dt: f64) {
        self.commit(host);
        self.advance(host, dt);
    }

    /// Applies the working order to the container.
    ///
    /// Records the painted border box of every attached element, replaces
    /// the container's children in one operation, then dispatches move
    /// transitions for elements whose box moved. All moves dispatched by one
    /// commit share the same start time. Does nothing without a pending
    /// commit.
    pub fn commit(&mut self, host: &mut impl Host) {
        if !self.commit_pending {
            return;
        }
        self.commit_pending = false;

        for (&node, item) in &mut self.items {
            if host.is_connected(node) {
                item.last_rect = Some(host.bounding_rect(node));
            }
        }

        host.replace_children(self.container, &self.order);
        for node in mem::take(&mut self.released) {
            if !self.items.contains_key(&node) {
                host.forget(node);
            }
        }
        debug!(container = ?self.container, children = self.order.len(), "committed order");

        if self.transitions.moved.is_some() {
            let now = self.timeline.as_ref().map_or(0.0, Timeline::time);
            for i in 0..self.order.len() {
                let node = self.order[i];
                self.element_move(&*host, node, now);
            }
        }
    }

    /// Advances the timeline by `dt` seconds and applies the cues that fire.
    ///
    /// Drops the timeline once it completes; otherwise asks the host for
    /// another frame.
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

    fn schedule_commit(&mut self, host: &mut impl Host) {
        if self.commit_pending {
            return;
        }
        self.commit_pending = true;
        host.request_frame();
    }

    fn element_move(&mut self, host: &impl Host, node: NodeId, now: f64) {
        let Some(moved) = self.transitions.moved.as_mut() else {
            return;
        };
        let Some(item) = self.items.get_mut(&node) else {
            return;
        };
        let Some(from) = item.last_rect else {
            return;
        };
        let to = host.bounding_rect(node);
        if from.origin() == to.origin() {
            return;
        }

        // Leaving elements still glide to their new slot but stay LEAVING.
        let leaving = item.state == ItemState::Leaving;
        if !leaving {
            item.state = ItemState::Moving;
        }
        let epoch = item.epoch;

        trace!(?node, ?from, ?to, "move");
        let timeline = self.timeline.get_or_insert_with(Timeline::default);
        moved(node, timeline, now, &RectMove { from, to });
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
                self.items.shift_remove(&cue.key);
                self.released.push(cue.key);
                self.order.retain(|&node| node != cue.key);
                self.schedule_commit(host);
            }
        }
    }
}

impl Reconcile<NodeId> for ElementArranger {
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
        let item = self.items.entry(node).or_default();
        if item.state == ItemState::Entering {
            warn!(?node, "element was already entering");
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

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use kurbo::Rect;

    use super::*;
    use crate::testing::{ITEM, TestHost};

    type Log = Rc<RefCell<Vec<String>>>;

    fn setup(count: usize) -> (TestHost, NodeId, Vec<NodeId>) {
        let mut host = TestHost::new();
        let root = host.root();
        let container = host.create_stack(root, Rect::new(0.0, 0.0, 100.0, 100.0));
        let nodes = host.create_items(container, count);
        (host, container, nodes)
    }

    /// Transitions that log every call and play for `duration` seconds.
    fn logging(log: &Log, duration: f64) -> Transitions<RectMove> {
        let enter_log = Rc::clone(log);
        let move_log = Rc::clone(log);
        let leave_log = Rc::clone(log);
        Transitions::new()
            .with_enter(move |node, tl, now| {
                enter_log.borrow_mut().push(format!("enter {}", node.0));
                tl.tween(now, duration, |_| {});
            })
            .with_move(move |node, tl, now, m: &RectMove| {
                move_log
                    .borrow_mut()
                    .push(format!("move {} {}", node.0, m.to.y0 - m.from.y0));
                tl.tween(now, duration, |_| {});
            })
            .with_leave(move |node, tl, now| {
                leave_log.borrow_mut().push(format!("leave {}", node.0));
                tl.tween(now, duration, |_| {});
            })
    }

    #[test]
    fn reorder_and_leave_end_to_end() {
        let (mut host, container, nodes) = setup(3);
        let [a, b, c] = [nodes[0], nodes[1], nodes[2]];
        let log = Log::default();
        let mut arranger = ElementArranger::new(&mut host, container, [a, b, c], logging(&log, 0.0));
        arranger.frame(&mut host, 0.0);
        assert!(log.borrow().is_empty(), "initial elements do not enter");

        arranger.update(&mut host, [c, a]);
        assert_eq!(*log.borrow(), vec![format!("leave {}", b.0)]);
        assert_eq!(arranger.state(b), Some(ItemState::Leaving));

        // B keeps its slot while its zero-length exit plays out.
        arranger.frame(&mut host, 0.0);
        assert_eq!(host.children(container), vec![c, b, a]);
        assert_eq!(arranger.state(b), None);

        arranger.frame(&mut host, 0.0);
        assert_eq!(host.children(container), vec![c, a]);
        assert!(!log.borrow().iter().any(|l| l.starts_with("enter")));
    }

    #[test]
    fn without_leave_transition_removal_is_immediate() {
        let (mut host, container, nodes) = setup(3);
        let [a, b, c] = [nodes[0], nodes[1], nodes[2]];
        let mut arranger =
            ElementArranger::new(&mut host, container, [a, b, c], Transitions::new());
        arranger.frame(&mut host, 0.0);

        arranger.update(&mut host, [c, a]);
        assert_eq!(arranger.order(), &[c, a]);
        assert_eq!(arranger.state(b), None);
        assert!(host.forgotten().is_empty(), "released only once detached");
        arranger.frame(&mut host, 0.0);
        assert_eq!(host.children(container), vec![c, a]);
        assert_eq!(host.forgotten(), &[b]);
    }

    #[test]
    fn element_dropped_and_requested_before_commit_is_kept() {
        let (mut host, container, nodes) = setup(2);
        let [a, b] = [nodes[0], nodes[1]];
        let mut arranger = ElementArranger::new(&mut host, container, [a, b], Transitions::new());
        arranger.frame(&mut host, 0.0);

        arranger.update(&mut host, [a]);
        arranger.update(&mut host, [a, b]);
        arranger.frame(&mut host, 0.0);
        assert_eq!(arranger.state(b), Some(ItemState::Active));
        assert_eq!(host.children(container), vec![a, b]);
        assert!(host.forgotten().is_empty());
    }

    #[test]
    fn duplicates_enter_once() {
        let (mut host, container, _) = setup(0);
        let a = host.create_detached();
        let b = host.create_detached();
        let log = Log::default();
        let mut arranger = ElementArranger::new(&mut host, container, [], logging(&log, 0.1));

        arranger.update(&mut host, [a, b, a]);
        assert_eq!(arranger.order(), &[a, b]);
        assert_eq!(
            *log.borrow(),
            vec![format!("enter {}", a.0), format!("enter {}", b.0)]
        );
        arranger.frame(&mut host, 0.0);
        assert_eq!(host.children(container), vec![a, b]);
    }

    #[test]
    fn enter_completes_to_active() {
        let (mut host, container, _) = setup(0);
        let a = host.create_detached();
        let log = Log::default();
        let mut arranger = ElementArranger::new(&mut host, container, [], logging(&log, 0.5));

        arranger.update(&mut host, [a]);
        assert_eq!(arranger.state(a), Some(ItemState::Entering));
        assert!(arranger.transitioning());

        arranger.frame(&mut host, 0.25);
        assert_eq!(arranger.state(a), Some(ItemState::Entering));
        arranger.frame(&mut host, 0.25);
        assert_eq!(arranger.state(a), Some(ItemState::Active));
        assert!(!arranger.transitioning(), "timeline clears on completion");
    }

    #[test]
    fn updates_before_a_frame_commit_once() {
        let (mut host, container, nodes) = setup(3);
        let [a, b, c] = [nodes[0], nodes[1], nodes[2]];
        let mut arranger =
            ElementArranger::new(&mut host, container, [a, b, c], Transitions::new());
        arranger.frame(&mut host, 0.0);
        let commits = host.replace_count(container);
        let frames = host.frame_requests();

        arranger.update(&mut host, [b, a, c]);
        arranger.update(&mut host, [c, b, a]);
        assert_eq!(host.frame_requests(), frames + 1, "one frame requested");

        arranger.frame(&mut host, 0.0);
        assert_eq!(host.replace_count(container), commits + 1);
        assert_eq!(host.children(container), vec![c, b, a]);

        arranger.frame(&mut host, 0.0);
        assert_eq!(host.replace_count(container), commits + 1, "nothing left to commit");
    }

    #[test]
    fn reordered_elements_receive_move_deltas() {
        let (mut host, container, nodes) = setup(2);
        let [a, b] = [nodes[0], nodes[1]];
        let log = Log::default();
        let mut arranger = ElementArranger::new(&mut host, container, [a, b], logging(&log, 0.2));
        arranger.frame(&mut host, 0.0);
        assert!(log.borrow().is_empty(), "unchanged order does not move");

        arranger.update(&mut host, [b, a]);
        arranger.frame(&mut host, 0.0);
        assert_eq!(
            *log.borrow(),
            vec![format!("move {} {}", b.0, -ITEM), format!("move {} {}", a.0, ITEM)]
        );
        assert_eq!(arranger.state(a), Some(ItemState::Moving));

        arranger.frame(&mut host, 0.2);
        assert_eq!(arranger.state(a), Some(ItemState::Active));
        assert_eq!(arranger.state(b), Some(ItemState::Active));
    }

    #[test]
    fn leaving_element_requested_again_restarts_enter() {
        let (mut host, container, nodes) = setup(2);
        let [a, b] = [nodes[0], nodes[1]];
        let log = Log::default();
        let mut arranger = ElementArranger::new(&mut host, container, [a, b], logging(&log, 1.0));
        arranger.frame(&mut host, 0.0);

        arranger.update(&mut host, [a]);
        assert_eq!(arranger.state(b), Some(ItemState::Leaving));
        arranger.frame(&mut host, 0.5);

        arranger.update(&mut host, [a, b]);
        assert_eq!(arranger.state(b), Some(ItemState::Entering));
        assert_eq!(log.borrow().last(), Some(&format!("enter {}", b.0)));

        // The superseded exit must not remove the element.
        arranger.frame(&mut host, 1.0);
        arranger.frame(&mut host, 1.0);
        assert_eq!(arranger.state(b), Some(ItemState::Active));
        assert_eq!(host.children(container), vec![a, b]);
        assert!(host.forgotten().is_empty());
    }

    #[test]
    fn leave_completion_cleans_registry() {
        let (mut host, container, nodes) = setup(2);
        let [a, b] = [nodes[0], nodes[1]];
        let log = Log::default();
        let mut arranger = ElementArranger::new(&mut host, container, [a, b], logging(&log, 0.3));
        arranger.frame(&mut host, 0.0);

        arranger.update(&mut host, [a]);
        arranger.frame(&mut host, 0.1);
        assert_eq!(host.children(container), vec![a, b]);
        assert!(host.forgotten().is_empty());

        arranger.frame(&mut host, 0.3);
        arranger.frame(&mut host, 0.0);
        assert_eq!(arranger.state(b), None);
        assert_eq!(arranger.len(), 1);
        assert_eq!(host.children(container), vec![a]);
        assert!(!host.is_connected(b));
        assert_eq!(host.forgotten(), &[b]);
    }
}
