//! Per-node layer classification.
//!
//! Stateless: each node is judged on its own payloads. The text check runs
//! first and wins when a node technically carries both a type-tool record
//! and pixel data. The direct field is probed before the generic lookup so
//! adapters with a cheap field accessor never pay for the fallback.

use crate::node::PsdNode;

/// Semantic kind of a tree node, from the pipeline's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Carries a type-tool record; extracted by the text stage.
    Text,
    /// Non-group node with pixel data; extracted by the image stage.
    Image,
    /// Group or payload-less node; contributes nothing to the document.
    Ignorable,
}

/// Decide a node's kind without mutating anything.
pub fn classify(node: &dyn PsdNode) -> LayerKind {
    let direct_type_tool = node
        .layer()
        .map(|l| l.type_tool.is_some())
        .unwrap_or(false);
    if direct_type_tool || node.lookup_type_tool().is_some() {
        return LayerKind::Text;
    }

    let has_image = node.layer().map(|l| l.image.is_some()).unwrap_or(false);
    if !node.is_group() && has_image {
        return LayerKind::Image;
    }

    LayerKind::Ignorable
}
