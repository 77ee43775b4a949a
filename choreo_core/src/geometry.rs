// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial helpers shared by the arrangers.
//!
//! All functions are stateless. Positions are page coordinates (viewport
//! coordinates plus the host's scroll offset); transforms are 2-D affine
//! maps from a node's local space into the space of some reference node.
//!
//! The centerpiece is [`compute_delta_transform`], which expresses how far a
//! tracked item travelled between two reconciliation passes in the local
//! space of the container now hosting it. Arrangers hand the resulting
//! [`Transform2d`] to the caller's move transition.

use kurbo::{Affine, Point, Vec2};

use crate::error::{Error, Result};
use crate::host::{Host, NodeId};

/// Components below this magnitude are treated as "no change" when deciding
/// whether a delta warrants a move transition.
const EPSILON: f64 = 1e-6;

/// A 2-D transform decomposed into translation, non-uniform scale and a
/// rotation angle in degrees.
///
/// Used both for absolute decompositions ([`decompose_transform`]) and for
/// relative deltas ([`compute_delta_transform`]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2d {
    /// Horizontal translation.
    pub x: f64,
    /// Vertical translation.
    pub y: f64,
    /// Horizontal scale factor.
    pub sx: f64,
    /// Vertical scale factor.
    pub sy: f64,
    /// Rotation in degrees.
    pub r: f64,
}

impl Transform2d {
    /// The transform that changes nothing.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        sx: 1.0,
        sy: 1.0,
        r: 0.0,
    };

    /// Returns the translation part as a vector.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Returns `true` if every component is within a small tolerance of
    /// [`IDENTITY`](Self::IDENTITY).
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.x.abs() < EPSILON
            && self.y.abs() < EPSILON
            && self.r.abs() < EPSILON
            && (self.sx - 1.0).abs() < EPSILON
            && (self.sy - 1.0).abs() < EPSILON
    }
}

impl Default for Transform2d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Splits an affine transform into translation, scale and rotation.
///
/// Scale is the norm of each basis column and rotation is the angle of the
/// first column, so the result is only exact for transforms without skew.
#[must_use]
pub fn decompose_transform(m: Affine) -> Transform2d {
    let [a, b, c, d, e, f] = m.as_coeffs();
    Transform2d {
        x: e,
        y: f,
        sx: a.hypot(b),
        sy: c.hypot(d),
        r: b.atan2(a).to_degrees(),
    }
}

/// Returns the change in degrees from `from` to `to`, taking the shorter
/// way around the circle.
///
/// The result is normalized to `(-180, 180]`, so `350° → 10°` yields `20°`
/// rather than `-340°`.
#[must_use]
pub fn shortest_rotation(from: f64, to: f64) -> f64 {
    let delta = (to - from + 180.0).rem_euclid(360.0) - 180.0;
    if delta == -180.0 { 180.0 } else { delta }
}

/// Returns the painted center of `node` in page coordinates.
#[must_use]
pub fn element_position(host: &impl Host, node: NodeId) -> Point {
    host.bounding_rect(node).center() + host.scroll_offset()
}

/// Returns the node's computed transform with its border-box origin (page
/// coordinates) folded into the translation.
#[must_use]
pub fn element_transform(host: &impl Host, node: NodeId) -> Affine {
    let origin = host.bounding_rect(node).origin() + host.scroll_offset();
    host.computed_transform(node)
        .then_translate(origin.to_vec2())
}

/// Returns the 2-D transform relating `node`'s local space to `root`'s.
///
/// Walks the parent chain from `node` up to (excluding) `root`, composing
/// each ancestor's computed transform with its border-box offset relative
/// to its own parent. `root` itself maps to the identity.
///
/// # Errors
///
/// Returns [`Error::NotDescendant`] if `node` is not inside `root`.
pub fn accumulated_transform(host: &impl Host, root: NodeId, node: NodeId) -> Result<Affine> {
    if !host.contains(root, node) {
        return Err(Error::NotDescendant { root, node });
    }

    let mut acc = Affine::IDENTITY;
    let mut cursor = node;
    while cursor != root {
        let Some(parent) = host.parent(cursor) else {
            break;
        };
        let offset = host.bounding_rect(cursor).origin() - host.bounding_rect(parent).origin();
        let local = host.computed_transform(cursor).then_translate(offset);
        acc = local * acc;
        cursor = parent;
    }
    Ok(acc)
}

/// Computes how far an item travelled between two passes, in the local space
/// of the container that now hosts it.
///
/// - `current` is the hosting container's transform now.
/// - `last` is the painted transform of the container that hosted the item
///   at the previous pass (`None` when it never changed hands and the
///   container has no earlier snapshot, in which case `current` is used).
/// - `position` is the item's page position now; `last_position` the page
///   position recorded at the previous pass.
///
/// The translation is the difference between the new position mapped
/// through `current` and the old position mapped through `last`, so moving
/// an item between two differently-transformed containers yields the
/// container-relative displacement rather than a page-space jump. Rotation
/// is the shortest-path change between the two containers' rotations and
/// scale is the ratio of their scales.
///
/// Returns [`Transform2d::IDENTITY`] when no previous position is known (the
/// item has just entered).
#[must_use]
pub fn compute_delta_transform(
    current: Affine,
    last: Option<Affine>,
    position: Point,
    last_position: Option<Point>,
) -> Transform2d {
    let Some(last_position) = last_position else {
        return Transform2d::IDENTITY;
    };
    let last = last.unwrap_or(current);

    let new_local = current.inverse() * position;
    let last_local = last.inverse() * last_position;

    let now = decompose_transform(current);
    let before = decompose_transform(last);

    Transform2d {
        x: new_local.x - last_local.x,
        y: new_local.y - last_local.y,
        sx: now.sx / before.sx,
        sy: now.sy / before.sy,
        r: shortest_rotation(before.r, now.r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHost;
    use kurbo::Rect;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn decompose_translation_scale_rotation() {
        let m = Affine::translate((3.0, 4.0))
            * Affine::rotate(core::f64::consts::FRAC_PI_2)
            * Affine::scale_non_uniform(2.0, 5.0);
        let d = decompose_transform(m);
        assert!(approx(d.x, 3.0), "x was {}", d.x);
        assert!(approx(d.y, 4.0), "y was {}", d.y);
        assert!(approx(d.sx, 2.0), "sx was {}", d.sx);
        assert!(approx(d.sy, 5.0), "sy was {}", d.sy);
        assert!(approx(d.r, 90.0), "r was {}", d.r);
    }

    #[test]
    fn shortest_rotation_wraps() {
        assert!(approx(shortest_rotation(350.0, 10.0), 20.0));
        assert!(approx(shortest_rotation(10.0, 350.0), -20.0));
        assert!(approx(shortest_rotation(170.0, -170.0), 20.0));
        assert!(approx(shortest_rotation(0.0, 180.0), 180.0));
        assert!(approx(shortest_rotation(45.0, 45.0), 0.0));
    }

    #[test]
    fn delta_in_stationary_container() {
        let container = Affine::translate((100.0, 40.0));
        let delta = compute_delta_transform(
            container,
            Some(container),
            Point::new(30.0, 80.0),
            Some(Point::new(10.0, 20.0)),
        );
        assert!(approx(delta.x, 20.0), "x was {}", delta.x);
        assert!(approx(delta.y, 60.0), "y was {}", delta.y);
        assert!(approx(delta.r, 0.0), "r was {}", delta.r);
        assert!(approx(delta.sx, 1.0), "sx was {}", delta.sx);
        assert!(approx(delta.sy, 1.0), "sy was {}", delta.sy);
    }

    #[test]
    fn delta_takes_shortest_rotation() {
        let before = Affine::rotate(350_f64.to_radians());
        let after = Affine::rotate(10_f64.to_radians());
        let p = Point::new(0.0, 0.0);
        let delta = compute_delta_transform(after, Some(before), p, Some(p));
        assert!(approx(delta.r, 20.0), "r was {}", delta.r);
    }

    #[test]
    fn delta_normalizes_scale_by_previous_container() {
        let before = Affine::scale(2.0);
        let after = Affine::scale_non_uniform(4.0, 3.0);
        let p = Point::new(0.0, 0.0);
        let delta = compute_delta_transform(after, Some(before), p, Some(p));
        assert!(approx(delta.sx, 2.0), "sx was {}", delta.sx);
        assert!(approx(delta.sy, 1.5), "sy was {}", delta.sy);
    }

    #[test]
    fn delta_across_translated_containers() {
        // Same page position, new container shifted right by 50.
        let p = Point::new(20.0, 20.0);
        let delta = compute_delta_transform(
            Affine::translate((50.0, 0.0)),
            Some(Affine::IDENTITY),
            p,
            Some(p),
        );
        assert!(approx(delta.x, -50.0), "x was {}", delta.x);
        assert!(approx(delta.y, 0.0), "y was {}", delta.y);
    }

    #[test]
    fn delta_without_history_is_identity() {
        let delta = compute_delta_transform(
            Affine::translate((5.0, 5.0)),
            None,
            Point::new(1.0, 2.0),
            None,
        );
        assert_eq!(delta, Transform2d::IDENTITY);
        assert!(delta.is_identity());
    }

    #[test]
    fn element_position_includes_scroll() {
        let mut host = TestHost::new();
        let root = host.root();
        let node = host.create_child(root, Rect::new(10.0, 10.0, 30.0, 50.0));
        host.set_scroll((0.0, 100.0));
        assert_eq!(element_position(&host, node), Point::new(20.0, 130.0));
    }

    #[test]
    fn accumulated_transform_composes_ancestors() {
        let mut host = TestHost::new();
        let root = host.root();
        let outer = host.create_child(root, Rect::new(50.0, 0.0, 250.0, 200.0));
        let inner = host.create_child(outer, Rect::new(60.0, 20.0, 160.0, 120.0));

        let m = accumulated_transform(&host, root, inner).unwrap();
        assert_eq!(m * Point::ORIGIN, Point::new(60.0, 20.0));
        assert_eq!(accumulated_transform(&host, root, root).unwrap(), Affine::IDENTITY);
    }

    #[test]
    fn accumulated_transform_rejects_outsiders() {
        let mut host = TestHost::new();
        let root = host.root();
        let a = host.create_child(root, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = host.create_child(root, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(
            accumulated_transform(&host, a, b),
            Err(Error::NotDescendant { root: a, node: b })
        );
    }
}
