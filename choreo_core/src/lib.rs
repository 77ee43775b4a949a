// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animated reconciliation of element arrangements.
//!
//! `choreo_core` keeps sets of elements in step with a requested
//! arrangement (insert, reorder, move between containers, remove) while
//! handing caller-supplied enter, move and leave transitions exactly the
//! information they need to animate the change: the previous geometry, the
//! new geometry and a timeline to queue tweens on.
//!
//! The crate never talks to a platform directly. All measurement and tree
//! mutation goes through the [`Host`] trait; `choreo_backend_web`
//! implements it over the DOM.
//!
//! # Architecture
//!
//! ```text
//!   update / reparent ──► diff::reconcile ──► enter / leave transitions
//!          │                                        │
//!          ▼                                        ▼
//!   commit pending ──► Host::request_frame      Timeline (cues)
//!          │                                        │
//!          ▼                                        │
//!   frame(host, dt) ──► commit ──► move deltas ─────┤
//!                 │                                 ▼
//!                 └──────────► advance ──► Activate / Remove cues
//! ```
//!
//! **[`element`]**: [`ElementArranger`](element::ElementArranger) reorders
//! the children of one container.
//!
//! **[`scattered`]**: [`ScatteredArranger`](scattered::ScatteredArranger)
//! does the same across several containers with one shared timeline, and
//! measures moves relative to each container's transform.
//!
//! **[`master`]**: [`MasterArranger`](master::MasterArranger) tracks
//! arbitrary values, materializes them through a factory and batches all
//! move measurements of a frame into one pass, using
//! `understory_dirty` for the pending set.
//!
//! **[`geometry`]**: positions, transform decomposition and the
//! container-relative delta computation.
//!
//! **[`timeline`]**: the minimal sequencing engine transitions queue onto.
//!
//! **[`host`]**: the [`Host`] trait and [`NodeId`] handles.
//!
//! # Frame model
//!
//! Arrangers never mutate the tree in the middle of an update. They record
//! the new arrangement, keep at most one commit pending and ask the host for
//! a frame. The embedding loop then calls `frame(host, dt)`, which commits
//! and advances the arranger's timelines. Any number of updates before that
//! frame collapse into a single commit.

mod diff;
mod error;
mod slab;

pub mod dirty;
pub mod element;
pub mod geometry;
pub mod host;
pub mod item;
pub mod master;
pub mod scattered;
pub mod timeline;
pub mod transition;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use host::{Host, NodeId};
pub use slab::ItemId;
