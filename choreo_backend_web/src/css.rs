// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parsing of computed `transform` values.
//!
//! `getComputedStyle` always resolves transforms to `none`, `matrix(...)` or
//! `matrix3d(...)`, so that is all [`parse_transform`] accepts. The inverse
//! direction, [`format_matrix`], writes what move transitions compute.

use choreo_core::geometry::Transform2d;
use kurbo::{Affine, Vec2};

/// Parses a computed CSS `transform` value into a 2-D affine map.
///
/// `matrix3d` is projected onto the plane by keeping its 2-D components.
/// Returns `None` for anything that is not a computed transform.
#[must_use]
pub fn parse_transform(value: &str) -> Option<Affine> {
    let value = value.trim();
    if value.is_empty() || value == "none" {
        return Some(Affine::IDENTITY);
    }

    if let Some(args) = function_args(value, "matrix3d") {
        let m = parse_numbers::<16>(args)?;
        // Column-major: m11 m12 . . m21 m22 . . . . . . m41 m42 . .
        return Some(Affine::new([m[0], m[1], m[4], m[5], m[12], m[13]]));
    }
    if let Some(args) = function_args(value, "matrix") {
        return parse_numbers::<6>(args).map(Affine::new);
    }
    None
}

/// Formats an affine map as a CSS `matrix()` value.
#[must_use]
pub fn format_matrix(m: Affine) -> String {
    let [a, b, c, d, e, f] = m.as_coeffs();
    format!("matrix({a},{b},{c},{d},{e},{f})")
}

/// Returns the transform that shows an element displaced by `delta` at
/// `progress` 0 and in its new place at `progress` 1.
///
/// Apply it as the element's `transform` from a move transition's tween to
/// play the move: the element is already laid out at its destination, and
/// the inverted delta carries it back to where it was painted.
#[must_use]
pub fn flip_transform(delta: &Transform2d, progress: f64) -> Affine {
    let p = progress.clamp(0.0, 1.0);
    let rem = 1.0 - p;
    let lerp = |from: f64| from + (1.0 - from) * p;
    Affine::translate(Vec2::new(-delta.x * rem, -delta.y * rem))
        * Affine::rotate((-delta.r * rem).to_radians())
        * Affine::scale_non_uniform(lerp(1.0 / delta.sx), lerp(1.0 / delta.sy))
}

fn function_args<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    value
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_numbers<const N: usize>(args: &str) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    let mut parts = args.split(',');
    for slot in &mut out {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}
