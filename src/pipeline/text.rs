//! Text-layer extraction: raw type-tool record → resolved, validated layer.
//!
//! Failure is never propagated: every path returns a [`TextOutcome`] whose
//! warnings say what (if anything) went wrong, so one illegible text record
//! cannot abort the run.

use crate::id::LayerIdGenerator;
use crate::node::PsdNode;
use crate::output::{DocumentLayer, LayerContent, LayerWarning};
use crate::style::{StyleResolver, TextLayerStyle};
use tracing::warn;

/// Type-tool bounding boxes clip text tighter than the rendered glyph box;
/// these fixed empirical margins compensate. They are not derived from font
/// metrics.
const WIDTH_PAD: i32 = 15;
const HEIGHT_PAD: i32 = 20;

/// Result of one text-node extraction.
pub struct TextOutcome {
    /// The emitted layer, absent when the node was skipped.
    pub layer: Option<DocumentLayer>,
    /// Resolved style for the name-keyed side index, set iff `layer` is.
    pub style: Option<TextLayerStyle>,
    pub warnings: Vec<LayerWarning>,
}

impl TextOutcome {
    fn skip(warning: LayerWarning) -> Self {
        Self {
            layer: None,
            style: None,
            warnings: vec![warning],
        }
    }
}

/// Extract a classified text node.
///
/// The selection side effect always runs first: parser versions that need
/// it require the node to be the active layer before the type-tool record
/// is legible, and for the rest it is a no-op.
pub fn extract_text(
    node: &dyn PsdNode,
    resolver: &dyn StyleResolver,
    ids: &LayerIdGenerator,
    skip_empty_text: bool,
) -> TextOutcome {
    node.activate();

    let raw = node
        .layer()
        .and_then(|l| l.type_tool.clone())
        .or_else(|| node.lookup_type_tool());
    let Some(raw) = raw else {
        warn!(layer = node.name(), "active layer data not found");
        return TextOutcome::skip(LayerWarning::ActiveDataMissing {
            name: node.name().to_string(),
        });
    };

    let Some(style) = resolver.resolve(&raw, node) else {
        warn!(layer = node.name(), "style not found");
        return TextOutcome::skip(LayerWarning::StyleNotFound {
            name: node.name().to_string(),
        });
    };

    let mut warnings = Vec::new();
    if style.text.is_empty() {
        warn!(layer = node.name(), "text value is empty");
        warnings.push(LayerWarning::EmptyText {
            name: node.name().to_string(),
        });
        if skip_empty_text {
            return TextOutcome {
                layer: None,
                style: None,
                warnings,
            };
        }
    }

    let left = node.left().unwrap_or(0);
    let top = node.top().unwrap_or(0);
    let layer = DocumentLayer {
        id: ids.generate(node.name()),
        name: node.name().to_string(),
        x: left,
        y: top,
        width: node.right().unwrap_or(0) - left + WIDTH_PAD,
        height: node.bottom().unwrap_or(0) - top + HEIGHT_PAD,
        content: LayerContent::Text {
            text_content: style.text.clone(),
            text_style: style.clone(),
        },
    };

    TextOutcome {
        layer: Some(layer),
        style: Some(style),
        warnings,
    }
}
