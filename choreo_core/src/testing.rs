// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory [`Host`] used by the crate's tests.
//!
//! Nodes either carry an explicit border box or, when their parent is a
//! *stack*, are laid out as `ITEM`-sized squares stacked top to bottom in
//! child order. That is enough to make reordering observable as movement.

use std::collections::HashMap;

use kurbo::{Affine, Rect, Size, Vec2};

use crate::host::{Host, NodeId};

/// Edge length of a stacked child.
pub(crate) const ITEM: f64 = 10.0;

#[derive(Debug, Default)]
struct TestNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Rect,
    transform: Affine,
    stack: bool,
}

#[derive(Debug)]
pub(crate) struct TestHost {
    nodes: Vec<TestNode>,
    scroll: Vec2,
    replace_calls: HashMap<NodeId, usize>,
    frame_requests: usize,
    forgotten: Vec<NodeId>,
}

impl TestHost {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![TestNode {
                rect: Rect::new(0.0, 0.0, 1000.0, 1000.0),
                ..TestNode::default()
            }],
            scroll: Vec2::ZERO,
            replace_calls: HashMap::new(),
            frame_requests: 0,
            forgotten: Vec::new(),
        }
    }

    /// The document root.
    pub(crate) fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> &TestNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TestNode {
        &mut self.nodes[id.0 as usize]
    }

    fn push(&mut self, node: TestNode) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("too many test nodes"));
        self.nodes.push(node);
        id
    }

    /// Creates a child of `parent` with an explicit border box.
    pub(crate) fn create_child(&mut self, parent: NodeId, rect: Rect) -> NodeId {
        let id = self.push(TestNode {
            rect,
            ..TestNode::default()
        });
        self.attach(parent, id);
        id
    }

    /// Creates a container under `parent` that stacks its children.
    pub(crate) fn create_stack(&mut self, parent: NodeId, rect: Rect) -> NodeId {
        let id = self.create_child(parent, rect);
        self.node_mut(id).stack = true;
        id
    }

    /// Creates a node that is not attached to the document.
    pub(crate) fn create_detached(&mut self) -> NodeId {
        self.push(TestNode {
            rect: Rect::from_origin_size((0.0, 0.0), Size::new(ITEM, ITEM)),
            ..TestNode::default()
        })
    }

    /// Creates `count` stacked children of `container`.
    pub(crate) fn create_items(&mut self, container: NodeId, count: usize) -> Vec<NodeId> {
        (0..count)
            .map(|_| {
                let id = self.create_detached();
                self.attach(container, id);
                id
            })
            .collect()
    }

    pub(crate) fn set_scroll(&mut self, scroll: impl Into<Vec2>) {
        self.scroll = scroll.into();
    }

    pub(crate) fn set_transform(&mut self, node: NodeId, transform: Affine) {
        self.node_mut(node).transform = transform;
    }

    pub(crate) fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).children.clone()
    }

    /// Number of `replace_children` calls made on `container`.
    pub(crate) fn replace_count(&self, container: NodeId) -> usize {
        self.replace_calls.get(&container).copied().unwrap_or(0)
    }

    pub(crate) fn frame_requests(&self) -> usize {
        self.frame_requests
    }

    /// Nodes released through [`Host::forget`], in call order.
    pub(crate) fn forgotten(&self) -> &[NodeId] {
        &self.forgotten
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node_mut(node).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != node);
        }
    }

    fn attach(&mut self, parent: NodeId, node: NodeId) {
        self.detach(node);
        self.node_mut(node).parent = Some(parent);
        self.node_mut(parent).children.push(node);
    }
}

impl Host for TestHost {
    fn bounding_rect(&self, node: NodeId) -> Rect {
        let n = self.node(node);
        match n.parent {
            Some(parent) if self.node(parent).stack => {
                let index = self
                    .node(parent)
                    .children
                    .iter()
                    .position(|&c| c == node)
                    .unwrap_or(0);
                let origin = self.bounding_rect(parent).origin();
                let y = origin.y + index as f64 * ITEM;
                Rect::from_origin_size((origin.x, y), Size::new(ITEM, ITEM))
            }
            _ => n.rect,
        }
    }

    fn scroll_offset(&self) -> Vec2 {
        self.scroll
    }

    fn computed_transform(&self, node: NodeId) -> Affine {
        self.node(node).transform
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root(), node)
    }

    fn replace_children(&mut self, container: NodeId, children: &[NodeId]) {
        *self.replace_calls.entry(container).or_insert(0) += 1;
        for old in self.node(container).children.clone() {
            self.node_mut(old).parent = None;
        }
        self.node_mut(container).children.clear();
        for &child in children {
            self.attach(container, child);
        }
    }

    fn append_child(&mut self, container: NodeId, child: NodeId) {
        self.attach(container, child);
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn forget(&mut self, node: NodeId) {
        self.forgotten.push(node);
    }

    fn request_frame(&mut self) {
        self.frame_requests += 1;
    }
}
