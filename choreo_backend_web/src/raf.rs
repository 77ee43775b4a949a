// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-shot `requestAnimationFrame` scheduling.
//!
//! [`FrameRequester`] answers [`Host::request_frame`]: any number of
//! requests before the browser paints collapse into one callback. The
//! callback receives the seconds elapsed since the previous frame, or since
//! the request when the page was idle, ready to hand to an arranger's
//! `frame(host, dt)` hook.
//!
//! [`Host::request_frame`]: choreo_core::Host::request_frame

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use crate::frame_delta;

// Direct global bindings instead of `web_sys::Window` methods, so no
// Window object has to be fetched on every frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

type RafClosure = Closure<dyn FnMut(f64)>;

/// A coalescing, single-shot animation-frame scheduler.
///
/// Cloning yields another handle to the same scheduler. The JS closure only
/// holds a weak reference, so dropping every handle releases it.
#[derive(Clone)]
pub struct FrameRequester {
    inner: Rc<FrameInner>,
}

struct FrameInner {
    /// The JS closure registered with `requestAnimationFrame`.
    closure: RefCell<Option<RafClosure>>,

    /// The embedder's frame hook, receiving `dt` in seconds.
    callback: RefCell<Option<Box<dyn FnMut(f64)>>>,

    /// A frame is requested and has not fired yet.
    pending: Cell<bool>,

    /// The callback is running.
    in_frame: Cell<bool>,

    /// Timestamp (ms) the next `dt` is measured from.
    anchor: Cell<f64>,

    /// The ID returned by the most recent `requestAnimationFrame` call.
    raf_id: Cell<i32>,
}

impl FrameRequester {
    /// Creates a scheduler with no callback.
    pub fn new() -> Self {
        let inner = Rc::new(FrameInner {
            closure: RefCell::new(None),
            callback: RefCell::new(None),
            pending: Cell::new(false),
            in_frame: Cell::new(false),
            anchor: Cell::new(0.0),
            raf_id: Cell::new(0),
        });

        let weak: Weak<FrameInner> = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move |timestamp_ms: f64| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.pending.replace(false) {
                return;
            }
            let dt = frame_delta(inner.anchor.get(), timestamp_ms);
            inner.anchor.set(timestamp_ms);

            inner.in_frame.set(true);
            if let Some(callback) = inner.callback.borrow_mut().as_mut() {
                callback(dt);
            }
            inner.in_frame.set(false);
        }) as Box<dyn FnMut(f64)>);
        *inner.closure.borrow_mut() = Some(closure);

        Self { inner }
    }

    /// Sets the frame hook. Typically it locks the arranger and the host and
    /// calls the arranger's `frame(host, dt)`.
    pub fn set_callback(&self, callback: impl FnMut(f64) + 'static) {
        *self.inner.callback.borrow_mut() = Some(Box::new(callback));
    }

    /// Requests one callback on the next animation frame. Does nothing if one
    /// is already pending.
    pub fn request(&self) {
        if self.inner.pending.get() {
            return;
        }
        self.inner.pending.set(true);
        // A request made from inside the callback continues the animation;
        // anything else starts measuring from now.
        if !self.inner.in_frame.get() {
            self.inner.anchor.set(performance_now());
        }
        if let Some(closure) = self.inner.closure.borrow().as_ref() {
            let id = request_animation_frame(closure.as_ref().unchecked_ref());
            self.inner.raf_id.set(id);
        }
    }

    /// Cancels the pending callback, if any.
    pub fn cancel(&self) {
        if self.inner.pending.replace(false) {
            cancel_animation_frame(self.inner.raf_id.get());
        }
    }

    /// Returns `true` if a callback is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get()
    }
}

impl Default for FrameRequester {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameInner {
    fn drop(&mut self) {
        if self.pending.get() {
            cancel_animation_frame(self.raf_id.get());
        }
    }
}

impl core::fmt::Debug for FrameRequester {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameRequester")
            .field("pending", &self.inner.pending.get())
            .field("in_frame", &self.inner.in_frame.get())
            .field("has_callback", &self.inner.callback.borrow().is_some())
            .finish()
    }
}
