//! Tree flattening: produce the ordered node sequence for classification.
//!
//! Two strategies, behaviourally interchangeable downstream:
//!
//! * **Bulk enumeration** — the parser's own `descendants()` when present;
//!   its ordering is trusted as-is.
//! * **Manual walk** — deterministic pre-order traversal (parent before
//!   children, children in declared order) when the capability is absent.
//!   Engaging the fallback is logged and flagged, never an error.
//!
//! The root itself is excluded in both strategies; only descendants are
//! candidates for classification.

use crate::node::NodeHandle;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of flattening a tree handle.
pub struct Traversal {
    /// All descendant nodes (groups and leaves), in visitation order.
    pub nodes: Vec<NodeHandle>,
    /// Whether the manual walk ran instead of bulk enumeration.
    pub used_fallback: bool,
}

/// Flatten the tree below `root` into an ordered node sequence.
pub fn flatten(root: &NodeHandle) -> Traversal {
    if let Some(nodes) = root.descendants() {
        debug!(count = nodes.len(), "bulk descendant enumeration");
        return Traversal {
            nodes,
            used_fallback: false,
        };
    }

    warn!("bulk descendant enumeration unavailable; walking the tree manually");
    let mut nodes = Vec::new();
    walk(root, &mut nodes);
    debug!(count = nodes.len(), "manual tree walk");
    Traversal {
        nodes,
        used_fallback: true,
    }
}

fn walk(node: &NodeHandle, out: &mut Vec<NodeHandle>) {
    for child in node.children() {
        out.push(Arc::clone(&child));
        walk(&child, out);
    }
}
