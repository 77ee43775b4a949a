// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Host`] implementation over the browser DOM.
//!
//! Elements are interned on first sight: each gets a [`NodeId`] and a
//! `data-choreo-node` attribute holding it, so the same element always maps
//! back to the same id. [`Host::forget`] releases the element and frees its
//! id for reuse.

use std::cell::RefCell;

use choreo_core::{Error, Host, NodeId, Result};
use kurbo::{Affine, Rect, Vec2};
use tracing::{debug, warn};
use wasm_bindgen::JsCast as _;
use web_sys::{Document, Element, HtmlElement, Window};

use crate::css;
use crate::raf::FrameRequester;

const NODE_ATTR: &str = "data-choreo-node";

/// Interned elements. Freed slots are reused before the table grows.
#[derive(Default)]
struct NodeTable {
    slots: Vec<Option<Element>>,
    free_list: Vec<u32>,
}

impl NodeTable {
    fn get(&self, id: u32) -> Option<&Element> {
        self.slots.get(id as usize)?.as_ref()
    }

    fn insert(&mut self, element: Element) -> Option<u32> {
        if let Some(id) = self.free_list.pop() {
            self.slots[id as usize] = Some(element);
            return Some(id);
        }
        let id = u32::try_from(self.slots.len()).ok()?;
        self.slots.push(Some(element));
        Some(id)
    }

    fn remove(&mut self, id: u32) -> Option<Element> {
        let element = self.slots.get_mut(id as usize)?.take()?;
        self.free_list.push(id);
        Some(element)
    }

    fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }
}

/// A [`Host`] backed by the page's DOM.
pub struct DomHost {
    window: Window,
    document: Document,
    elements: RefCell<NodeTable>,
    frames: FrameRequester,
}

impl core::fmt::Debug for DomHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomHost")
            .field("elements_len", &self.elements.borrow().len())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl DomHost {
    /// Creates a host for the global window. Returns `None` outside a
    /// browser document.
    #[must_use]
    pub fn new(frames: FrameRequester) -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;
        Some(Self {
            window,
            document,
            elements: RefCell::new(NodeTable::default()),
            frames,
        })
    }

    /// The frame scheduler behind [`Host::request_frame`].
    #[must_use]
    pub fn frames(&self) -> &FrameRequester {
        &self.frames
    }

    /// Returns the id of `element`, interning it on first sight.
    pub fn adopt(&self, element: &Element) -> NodeId {
        let mut elements = self.elements.borrow_mut();
        if let Some(id) = element
            .get_attribute(NODE_ATTR)
            .and_then(|attr| attr.parse::<u32>().ok())
            && elements.get(id) == Some(element)
        {
            return NodeId(id);
        }

        let Some(id) = elements.insert(element.clone()) else {
            warn!("node table exhausted");
            return NodeId(u32::MAX);
        };
        let _ = element.set_attribute(NODE_ATTR, &id.to_string());
        NodeId(id)
    }

    /// Resolves the first element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetNotFound`] if nothing matches or the selector
    /// is invalid.
    pub fn select(&self, selector: &str) -> Result<NodeId> {
        match self.document.query_selector(selector) {
            Ok(Some(element)) => Ok(self.adopt(&element)),
            Ok(None) | Err(_) => Err(Error::TargetNotFound {
                selector: selector.to_owned(),
            }),
        }
    }

    /// Returns the element behind `node`.
    #[must_use]
    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.elements.borrow().get(node.0).cloned()
    }

    /// Writes `transform` into the element's inline `transform` style.
    pub fn set_style_transform(&self, node: NodeId, transform: Affine) {
        let Some(element) = self.element(node) else {
            return;
        };
        if let Some(el) = element.dyn_ref::<HtmlElement>() {
            let _ = el
                .style()
                .set_property("transform", &css::format_matrix(transform));
        }
    }

    /// Clears the element's inline `transform` style.
    pub fn clear_style_transform(&self, node: NodeId) {
        if let Some(el) = self
            .element(node)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
        {
            let _ = el.style().remove_property("transform");
        }
    }
}

impl Host for DomHost {
    fn bounding_rect(&self, node: NodeId) -> Rect {
        let Some(element) = self.element(node) else {
            return Rect::ZERO;
        };
        let r = element.get_bounding_client_rect();
        Rect::from_origin_size((r.x(), r.y()), (r.width(), r.height()))
    }

    fn scroll_offset(&self) -> Vec2 {
        Vec2::new(
            self.window.scroll_x().unwrap_or(0.0),
            self.window.scroll_y().unwrap_or(0.0),
        )
    }

    fn computed_transform(&self, node: NodeId) -> Affine {
        let Some(element) = self.element(node) else {
            return Affine::IDENTITY;
        };
        let value = match self.window.get_computed_style(&element) {
            Ok(Some(style)) => style.get_property_value("transform").unwrap_or_default(),
            _ => return Affine::IDENTITY,
        };
        css::parse_transform(&value).unwrap_or_else(|| {
            debug!(?node, %value, "unrecognized computed transform");
            Affine::IDENTITY
        })
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.element(node)?.parent_element()?;
        Some(self.adopt(&parent))
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|e| e.is_connected())
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        match (self.element(ancestor), self.element(node)) {
            (Some(ancestor), Some(node)) => {
                let node: &web_sys::Node = node.as_ref();
                ancestor.contains(Some(node))
            }
            _ => false,
        }
    }

    fn replace_children(&mut self, container: NodeId, children: &[NodeId]) {
        let Some(container_el) = self.element(container) else {
            return;
        };
        let nodes = js_sys::Array::new();
        for &child in children {
            if let Some(el) = self.element(child) {
                nodes.push(&el);
            }
        }
        if let Err(err) = container_el.replace_children_with_node(&nodes) {
            warn!(?container, ?err, "replaceChildren failed");
        }
    }

    fn append_child(&mut self, container: NodeId, child: NodeId) {
        if let (Some(container_el), Some(child_el)) = (self.element(container), self.element(child))
            && let Err(err) = container_el.append_child(&child_el)
        {
            warn!(?container, ?child, ?err, "appendChild failed");
        }
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(element) = self.element(node) {
            element.remove();
        }
    }

    fn forget(&mut self, node: NodeId) {
        if let Some(element) = self.elements.get_mut().remove(node.0) {
            let _ = element.remove_attribute(NODE_ATTR);
        }
    }

    fn request_frame(&mut self) {
        self.frames.request();
    }
}
