// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for choreo.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`DomHost`]: the [`Host`] implementation over the DOM
//! - [`FrameRequester`]: coalesced `requestAnimationFrame` scheduling
//! - [`css`]: computed-transform parsing and transform formatting
//!
//! A typical embedding shares the host and an arranger with the frame
//! callback:
//!
//! ```rust,ignore
//! let frames = FrameRequester::new();
//! let host = Rc::new(RefCell::new(DomHost::new(frames.clone()).unwrap()));
//! let container = host.borrow().select("#list")?;
//! let arranger = Rc::new(RefCell::new(ElementArranger::new(
//!     &mut *host.borrow_mut(), container, [], Transitions::new(),
//! )));
//! frames.set_callback({
//!     let (host, arranger) = (host.clone(), arranger.clone());
//!     move |dt| arranger.borrow_mut().frame(&mut *host.borrow_mut(), dt)
//! });
//! ```

pub mod css;
mod host;
mod raf;

pub use choreo_core::Host;
pub use host::DomHost;
pub use raf::FrameRequester;

/// Returns the current time from `performance.now()`, in milliseconds.
#[must_use]
pub fn now() -> f64 {
    raf::performance_now()
}

/// Seconds between two `DOMHighResTimeStamp`s (milliseconds), never
/// negative.
#[must_use]
pub fn frame_delta(anchor_ms: f64, timestamp_ms: f64) -> f64 {
    ((timestamp_ms - anchor_ms) / 1000.0).max(0.0)
}
