// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Usage and configuration errors.

use crate::host::NodeId;

/// Errors surfaced synchronously to the caller of an arranger operation.
///
/// These indicate a caller or configuration defect rather than a transient
/// runtime condition, so nothing in the crate retries them.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A selector resolved to no element.
    #[error("no element matches selector `{selector}`")]
    TargetNotFound {
        /// The selector that failed to match.
        selector: String,
    },
    /// A node is not inside the subtree of the arranger's root.
    #[error("{node:?} is not a descendant of root {root:?}")]
    NotDescendant {
        /// The arranger's root node.
        root: NodeId,
        /// The offending node.
        node: NodeId,
    },
    /// A container required by the operation is not tracked.
    #[error("container {0:?} is not tracked by this arranger")]
    UnknownContainer(NodeId),
    /// The value has never been registered with the arranger.
    #[error("value is not tracked by this arranger")]
    UnknownValue,
}

/// Result alias with [`Error`] as the default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
