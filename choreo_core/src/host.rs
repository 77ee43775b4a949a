// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract between the arrangers and a presentation tree.
//!
//! The arrangers never touch a platform API directly. Everything they need
//! (layout measurement, child replacement, paint-cycle scheduling) goes
//! through the [`Host`] trait, which the web backend implements over the DOM
//! and which tests implement over an in-memory tree.
//!
//! # Frame loop
//!
//! Arrangers defer DOM mutation to the next paint. When they have work they
//! call [`Host::request_frame`]; the embedding loop answers by calling the
//! arranger's `frame(host, dt)` hook once the browser is about to paint:
//!
//! ```rust,ignore
//! fn on_animation_frame(timestamp_ms: f64) {
//!     let dt = clock.delta_seconds(timestamp_ms);
//!     // Commit the pending arrangement, then advance its timeline.
//!     arranger.frame(&mut host, dt);
//! }
//! ```

use core::fmt;

use kurbo::{Affine, Rect, Vec2};

/// An opaque reference to a node in the host's presentation tree.
///
/// Node identities are handed out by the host (the web backend interns DOM
/// elements) and are stable for the lifetime of the node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Layout queries, tree mutation and paint scheduling for a presentation tree.
///
/// Queries take `&self`; mutations take `&mut self`. Implementations are
/// expected to be cheap to call repeatedly within one frame.
pub trait Host {
    /// Returns the node's border box in viewport coordinates.
    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// Returns the document scroll offset, used to turn viewport coordinates
    /// into page coordinates.
    fn scroll_offset(&self) -> Vec2;

    /// Returns the node's computed 2-D transform (identity when it has none).
    fn computed_transform(&self, node: NodeId) -> Affine;

    /// Returns the node's parent element, if any.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Returns whether the node is attached to the document.
    fn is_connected(&self, node: NodeId) -> bool;

    /// Returns whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Replaces all children of `container` with `children`, in order, as a
    /// single operation.
    fn replace_children(&mut self, container: NodeId, children: &[NodeId]);

    /// Appends `child` as the last child of `container`, moving it if it is
    /// already attached elsewhere.
    fn append_child(&mut self, container: NodeId, child: NodeId);

    /// Detaches `node` from its parent.
    fn remove(&mut self, node: NodeId);

    /// Tells the host that no arranger tracks `node` any longer.
    ///
    /// Called once an item has been dropped and its node detached. Hosts
    /// that intern nodes may release the node and later reuse its id.
    fn forget(&mut self, _node: NodeId) {}

    /// Requests that the arranger's frame hook runs before the next paint.
    ///
    /// Hosts should coalesce repeated requests made before the frame fires.
    fn request_frame(&mut self);
}
