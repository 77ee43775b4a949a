// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal animation sequencing.
//!
//! A [`Timeline`] holds *children* placed at positions (seconds) along a
//! logical time axis:
//!
//! - **Tweens**: effect closures that receive their progress in `[0, 1]`
//!   every time the playhead moves across them.
//! - **Cues**: zero-duration markers of type `C` that are handed back to
//!   the owner of the timeline when the playhead reaches them.
//!
//! Arrangers use cues for their own bookkeeping (flipping an item to
//! `ACTIVE`, deleting it after its exit) so the completion handlers run with
//! full `&mut` access to the arranger instead of hiding inside closures.
//! Caller-supplied transitions add tweens at the playhead they are given.
//!
//! The playhead only moves when the owner calls [`advance`](Timeline::advance),
//! normally once per animation frame.

use core::fmt;

/// A tween body. Receives progress in `[0, 1]`.
pub type Effect = Box<dyn FnMut(f64)>;

/// Construction options for a [`Timeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineOptions {
    /// Drop children as soon as they finish playing.
    pub auto_remove_children: bool,
    /// Re-anchor children inserted before the playhead at the playhead, so
    /// that they play from their start instead of jumping to mid-progress.
    pub smooth_child_timing: bool,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            auto_remove_children: true,
            smooth_child_timing: true,
        }
    }
}

enum Action<C> {
    Cue(Option<C>),
    Tween(Effect),
}

struct Child<C> {
    start: f64,
    duration: f64,
    action: Action<C>,
    done: bool,
}

/// An ordered, time-addressable sequence of tweens and cues.
///
/// Children are kept sorted by start position; children sharing a position
/// play in insertion order.
pub struct Timeline<C> {
    options: TimelineOptions,
    time: f64,
    end: f64,
    children: Vec<Child<C>>,
}

impl<C> fmt::Debug for Timeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("options", &self.options)
            .field("time", &self.time)
            .field("end", &self.end)
            .field("children", &self.children.len())
            .finish()
    }
}

impl<C> Default for Timeline<C> {
    fn default() -> Self {
        Self::new(TimelineOptions::default())
    }
}

impl<C> Timeline<C> {
    /// Creates an empty timeline with the playhead at zero.
    #[must_use]
    pub fn new(options: TimelineOptions) -> Self {
        Self {
            options,
            time: 0.0,
            end: 0.0,
            children: Vec::new(),
        }
    }

    /// Returns the options the timeline was created with.
    #[must_use]
    pub fn options(&self) -> TimelineOptions {
        self.options
    }

    /// Current playhead position in seconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// End position of the latest-ending child ever inserted.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end
    }

    /// Returns `true` when every child has finished playing.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.children.iter().all(|c| c.done)
    }

    /// Queues `cue` at the end of the timeline.
    pub fn call(&mut self, cue: C) {
        self.insert(self.end, 0.0, Action::Cue(Some(cue)));
    }

    /// Queues `cue` at `position`.
    pub fn call_at(&mut self, position: f64, cue: C) {
        self.insert(position, 0.0, Action::Cue(Some(cue)));
    }

    /// Queues an effect spanning `[position, position + duration]`.
    pub fn tween(&mut self, position: f64, duration: f64, effect: impl FnMut(f64) + 'static) {
        self.insert(position, duration.max(0.0), Action::Tween(Box::new(effect)));
    }

    /// Queues an effect starting at the end of the timeline.
    pub fn append(&mut self, duration: f64, effect: impl FnMut(f64) + 'static) {
        self.tween(self.end, duration, effect);
    }

    /// Moves the playhead forward by `dt` seconds.
    ///
    /// Every tween overlapping the new playhead is driven with its progress.
    /// Cues at or before the new playhead fire and are returned in position
    /// order.
    pub fn advance(&mut self, dt: f64) -> Vec<C> {
        let target = self.time + dt.max(0.0);
        let mut fired = Vec::new();

        for child in &mut self.children {
            if child.done || child.start > target {
                continue;
            }
            match &mut child.action {
                Action::Cue(cue) => {
                    if let Some(cue) = cue.take() {
                        fired.push(cue);
                    }
                    child.done = true;
                }
                Action::Tween(effect) => {
                    let progress = if child.duration > 0.0 {
                        ((target - child.start) / child.duration).clamp(0.0, 1.0)
                    } else {
                        1.0
                    };
                    effect(progress);
                    child.done = target >= child.start + child.duration;
                }
            }
        }

        self.time = target;
        if self.options.auto_remove_children {
            self.children.retain(|c| !c.done);
        }
        fired
    }

    fn insert(&mut self, position: f64, duration: f64, action: Action<C>) {
        let start = if self.options.smooth_child_timing {
            position.max(self.time)
        } else {
            position
        };
        self.end = self.end.max(start + duration);
        let at = self.children.partition_point(|c| c.start <= start);
        self.children.insert(
            at,
            Child {
                start,
                duration,
                action,
                done: false,
            },
        );
    }
}
