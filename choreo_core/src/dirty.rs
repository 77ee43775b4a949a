// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channels used by [`MasterArranger`](crate::master::MasterArranger).
//!
//! Items are keyed by their slab index. Marks are local: moving one item
//! never invalidates another, so no dependency edges are recorded.

use understory_dirty::Channel;

/// The item was re-parented or repositioned and needs a move delta computed
/// on the next clean pass.
pub const MOVE: Channel = Channel::new(0);
