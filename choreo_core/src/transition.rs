// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Caller-supplied enter, move and leave effects for the element-keyed
//! arrangers.
//!
//! A transition receives the node, the arranger's timeline and the playhead
//! position at which it should start, and queues its tweens on the
//! timeline. It must not block; the arranger appends its own completion cue
//! right after the transition returns, so the cue fires once everything the
//! transition queued has played.

use core::fmt;

use kurbo::Rect;

use crate::geometry::Transform2d;
use crate::host::NodeId;
use crate::item::{ArrangerTimeline, ItemTimeline};

/// Enter or leave effect: `(node, timeline, now)`.
pub type LifecycleFn = Box<dyn FnMut(NodeId, &mut ArrangerTimeline, f64)>;

/// Move effect: `(node, timeline, now, movement)`.
pub type MoveFn<M> = Box<dyn FnMut(NodeId, &mut ArrangerTimeline, f64, &M)>;

/// Movement handed to [`ElementArranger`](crate::element::ElementArranger)
/// move transitions: the border box before and after the commit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectMove {
    /// Border box at the previous paint.
    pub from: Rect,
    /// Border box after the commit.
    pub to: Rect,
}

/// Optional enter/move/leave effects, parameterized by the movement type
/// passed to move effects.
pub struct Transitions<M> {
    pub(crate) enter: Option<LifecycleFn>,
    pub(crate) moved: Option<MoveFn<M>>,
    pub(crate) leave: Option<LifecycleFn>,
}

impl<M> Transitions<M> {
    /// No transitions: items appear, move and vanish instantly.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enter: None,
            moved: None,
            leave: None,
        }
    }

    /// Sets the enter effect.
    #[must_use]
    pub fn with_enter(mut self, f: impl FnMut(NodeId, &mut ArrangerTimeline, f64) + 'static) -> Self {
        self.enter = Some(Box::new(f));
        self
    }

    /// Sets the move effect.
    #[must_use]
    pub fn with_move(
        mut self,
        f: impl FnMut(NodeId, &mut ArrangerTimeline, f64, &M) + 'static,
    ) -> Self {
        self.moved = Some(Box::new(f));
        self
    }

    /// Sets the leave effect.
    ///
    /// With a leave effect configured, leaving items keep their place in the
    /// arrangement until the effect has played.
    #[must_use]
    pub fn with_leave(mut self, f: impl FnMut(NodeId, &mut ArrangerTimeline, f64) + 'static) -> Self {
        self.leave = Some(Box::new(f));
        self
    }
}

impl<M> Default for Transitions<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Transitions<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transitions")
            .field("enter", &self.enter.is_some())
            .field("moved", &self.moved.is_some())
            .field("leave", &self.leave.is_some())
            .finish()
    }
}

/// Enter or leave effect for a value tracked by a
/// [`MasterArranger`](crate::master::MasterArranger):
/// `(value, node, timeline, now)`.
pub type ValueLifecycleFn<T> = Box<dyn FnMut(&T, NodeId, &mut ItemTimeline, f64)>;

/// Move effect for a tracked value: `(value, node, timeline, now, delta)`.
pub type ValueMoveFn<T> = Box<dyn FnMut(&T, NodeId, &mut ItemTimeline, f64, &Transform2d)>;

/// Optional effects for [`MasterArranger`](crate::master::MasterArranger).
///
/// Each item owns its timeline, so effects for different values run on
/// independent schedules.
pub struct MasterTransitions<T> {
    pub(crate) enter: Option<ValueLifecycleFn<T>>,
    pub(crate) moved: Option<ValueMoveFn<T>>,
    pub(crate) leave: Option<ValueLifecycleFn<T>>,
}

impl<T> MasterTransitions<T> {
    /// No transitions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enter: None,
            moved: None,
            leave: None,
        }
    }

    /// Sets the enter effect.
    #[must_use]
    pub fn with_enter(
        mut self,
        f: impl FnMut(&T, NodeId, &mut ItemTimeline, f64) + 'static,
    ) -> Self {
        self.enter = Some(Box::new(f));
        self
    }

    /// Sets the move effect. Without one, moves are applied to the tree but
    /// never measured.
    #[must_use]
    pub fn with_move(
        mut self,
        f: impl FnMut(&T, NodeId, &mut ItemTimeline, f64, &Transform2d) + 'static,
    ) -> Self {
        self.moved = Some(Box::new(f));
        self
    }

    /// Sets the leave effect. The node is detached once it has played.
    #[must_use]
    pub fn with_leave(
        mut self,
        f: impl FnMut(&T, NodeId, &mut ItemTimeline, f64) + 'static,
    ) -> Self {
        self.leave = Some(Box::new(f));
        self
    }
}

impl<T> Default for MasterTransitions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MasterTransitions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterTransitions")
            .field("enter", &self.enter.is_some())
            .field("moved", &self.moved.is_some())
            .field("leave", &self.leave.is_some())
            .finish()
    }
}
