//! The upstream parser contract: layer-tree nodes and their payloads.
//!
//! psd2doc never decodes PSD binary data itself — an external parser owns
//! that. What the parser hands us is a tree of nodes with a capability
//! surface that varies between parser versions: some expose bulk
//! enumeration, some require a selection side effect before a text record
//! becomes legible, some only surface the type-tool record through a generic
//! attribute lookup.
//!
//! Instead of probing for those capabilities dynamically at every node, the
//! contract is an explicit trait: required accessors plus optional
//! capabilities with default bodies. A parser adapter implements [`PsdNode`]
//! once and overrides exactly the capabilities its version supports; the
//! pipeline calls them unconditionally and treats the defaults (`None`,
//! no-op) as "capability absent".

use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

pub mod value;

/// Shared handle to a node in the parsed layer tree.
pub type NodeHandle = Arc<dyn PsdNode>;

/// One node of the parsed layer tree — a group or a leaf layer.
///
/// Required methods cover what every parser exposes; the default-bodied
/// methods are optional capabilities. Bounding sides are `Option` because
/// some parsers omit them on groups and adjustment layers; extractors
/// substitute `0` for absent sides.
pub trait PsdNode: Send + Sync {
    /// Layer name as authored in the design file.
    fn name(&self) -> &str;

    /// Whether this node is a group (groups never emit document layers).
    fn is_group(&self) -> bool;

    /// Direct children in declared order.
    fn children(&self) -> Vec<NodeHandle>;

    /// Payload record: pixel data, type-tool record, mask.
    fn layer(&self) -> Option<&LayerRecord>;

    fn left(&self) -> Option<i32> {
        None
    }

    fn top(&self) -> Option<i32> {
        None
    }

    fn right(&self) -> Option<i32> {
        None
    }

    fn bottom(&self) -> Option<i32> {
        None
    }

    /// Bulk enumeration of all descendants (non-self), in the parser's own
    /// order. `None` means the capability is absent and the pipeline falls
    /// back to a manual walk.
    fn descendants(&self) -> Option<Vec<NodeHandle>> {
        None
    }

    /// Generic attribute lookup for the type-tool record, for parser
    /// versions that do not surface it on the layer record directly.
    fn lookup_type_tool(&self) -> Option<TypeToolRecord> {
        None
    }

    /// Selection side effect. Some parser versions require a node to be the
    /// active layer before its type-tool attribute is legible; adapters for
    /// those versions override this. Callers always invoke it before reading
    /// text data.
    fn activate(&self) {}
}

/// Payloads attached to a leaf layer.
#[derive(Clone, Default)]
pub struct LayerRecord {
    /// Raw pixel handle for image layers.
    pub image: Option<Arc<dyn PixelSource>>,
    /// Raw type-tool record for text layers.
    pub type_tool: Option<TypeToolRecord>,
    /// Optional mask region and flags.
    pub mask: Option<MaskRecord>,
}

impl std::fmt::Debug for LayerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerRecord")
            .field("image", &self.image.as_ref().map(|_| "<dyn PixelSource>"))
            .field("type_tool", &self.type_tool)
            .field("mask", &self.mask)
            .finish()
    }
}

/// Raw pixel data of an image layer, with a portable-encoding capability.
///
/// The provided [`to_png`](PixelSource::to_png) body encodes the RGBA buffer
/// with the `image` crate; adapters holding pre-encoded data can override it
/// and skip the round trip.
pub trait PixelSource: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Tightly packed RGBA8 pixels, row-major, `width * height * 4` bytes.
    fn rgba(&self) -> Vec<u8>;

    /// Encode the pixels as a PNG buffer.
    fn to_png(&self) -> Result<Vec<u8>, PixelEncodeError> {
        let (w, h) = (self.width(), self.height());
        let raw = self.rgba();
        let expected = w as usize * h as usize * 4;
        if raw.len() != expected {
            return Err(PixelEncodeError::BufferMismatch {
                expected,
                actual: raw.len(),
            });
        }
        let img = image::RgbaImage::from_raw(w, h, raw)
            .ok_or(PixelEncodeError::BufferMismatch {
                expected,
                actual: expected,
            })?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| PixelEncodeError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// PNG encoding failure for a layer's pixel data.
#[derive(Debug, Clone, Error)]
pub enum PixelEncodeError {
    #[error("pixel buffer is {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Raw text-run record of a type-tool layer, as surfaced by the parser.
///
/// Semantic interpretation (font resolution, style merging) is owned by a
/// [`crate::style::StyleResolver`]; this record only carries the fields the
/// parser decoded plus the opaque engine data for resolvers that dig deeper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeToolRecord {
    pub text_value: Option<String>,
    #[serde(default)]
    pub fonts: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<f32>,
    #[serde(default)]
    pub colors: Vec<[u8; 4]>,
    #[serde(default)]
    pub alignment: Option<String>,
    /// Undecoded engine data, passed through to the resolver untouched.
    #[serde(default)]
    pub engine_data: serde_json::Value,
}

/// Mask region and flags attached to an image layer.
///
/// A mask contributes to effective geometry only when `disabled` is false;
/// a disabled mask is still carried on the emitted layer so downstream
/// consumers can re-enable it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaskRecord {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub width: i32,
    pub height: i32,
    pub default_color: Option<u8>,
    pub relative: bool,
    pub disabled: bool,
    pub invert: bool,
}

impl MaskRecord {
    /// Whether the mask has a usable region at all. Zero-area masks are
    /// never attached to emitted layers.
    pub fn has_area(&self) -> bool {
        self.width != 0 && self.height != 0
    }
}
