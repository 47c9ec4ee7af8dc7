//! Output model: the flat document, side indices, diagnostics, and stats.
//!
//! Everything here is serde-serializable with camelCase keys so the
//! consuming editor can ingest a run's output as JSON directly as initial
//! element state.
//!
//! Diagnostics are data, not just log lines: every skip and failure the
//! pipeline logs is also collected into [`ExtractionOutput`], so callers
//! (and tests) can assert on outcomes without capturing the log stream.

use crate::error::LayerError;
use crate::node::MaskRecord;
use crate::style::TextLayerStyle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// One normalized layer of the output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLayer {
    /// Unique within the producing run.
    pub id: String,
    /// Layer name as authored in the design file. Not unique.
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(flatten)]
    pub content: LayerContent,
}

impl DocumentLayer {
    pub fn is_text(&self) -> bool {
        matches!(self.content, LayerContent::Text { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self.content, LayerContent::Image { .. })
    }
}

/// Type-specific payload of a [`DocumentLayer`], tagged as
/// `"type": "text" | "image"` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerContent {
    #[serde(rename_all = "camelCase")]
    Text {
        text_content: String,
        text_style: TextLayerStyle,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        /// Durable asset URL produced by the configured store.
        src: String,
        /// Resolved mask record, present even when disabled (informational).
        mask: Option<MaskRecord>,
    },
}

/// The flat, ordered document. Append-only during a run; layer order equals
/// traversal visitation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PsdDocument {
    pub layers: Vec<DocumentLayer>,
}

impl PsdDocument {
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// A non-fatal diagnostic: the layer (or run) degraded but nothing failed
/// hard. Warnings are logged when they occur and collected here as well.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LayerWarning {
    /// Bulk descendant enumeration was unavailable; the manual walk ran.
    #[error("bulk descendant enumeration unavailable; fell back to manual tree walk")]
    TraversalFallback,

    /// No raw type-tool record was obtainable for a classified text node.
    #[error("layer '{name}': active layer data not found")]
    ActiveDataMissing { name: String },

    /// The style resolver returned nothing for the raw record.
    #[error("layer '{name}': style not found")]
    StyleNotFound { name: String },

    /// The resolved style carries empty text. The layer is still emitted
    /// unless [`crate::config::ExtractionConfig::skip_empty_text`] is set.
    #[error("layer '{name}': text value is empty")]
    EmptyText { name: String },

    /// A node classified as an image had no pixel data on recheck.
    #[error("layer '{name}': no image data present")]
    ImageDataMissing { name: String },
}

/// A successfully extracted layer plus its traversal position, as yielded
/// by [`crate::stream::extract_stream`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedLayer {
    /// Position in the traversal order; sort by this when order matters.
    pub index: usize,
    pub layer: DocumentLayer,
    pub warnings: Vec<LayerWarning>,
}

/// Counters and timings for one extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Nodes the traversal produced (groups included).
    pub discovered_nodes: usize,
    /// Text layers appended to the document.
    pub text_layers: usize,
    /// Image layers appended to the document.
    pub image_layers: usize,
    /// Classified nodes that emitted nothing, without a hard failure.
    pub skipped_layers: usize,
    /// Classified nodes whose extraction failed.
    pub failed_layers: usize,
    pub traverse_duration_ms: u64,
    pub process_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl ExtractionStats {
    /// Total layers appended to the document.
    pub fn emitted_layers(&self) -> usize {
        self.text_layers + self.image_layers
    }
}

/// Complete result of one extraction run.
///
/// Ownership of the document and both side indices transfers wholesale to
/// the caller; nothing here is mutated after the run returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutput {
    pub document: PsdDocument,
    /// Name-keyed style lookup; last write wins on duplicate names.
    pub text_layers: HashMap<String, TextLayerStyle>,
    /// Name-keyed asset URL lookup; last write wins on duplicate names.
    pub extracted_images: HashMap<String, String>,
    pub warnings: Vec<LayerWarning>,
    pub failures: Vec<LayerError>,
    pub stats: ExtractionStats,
}
