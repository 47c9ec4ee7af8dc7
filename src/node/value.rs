//! A [`PsdNode`] implementation backed by a JSON tree dump.
//!
//! Parsers in other processes (or test fixtures) can serialise their layer
//! tree to JSON and hand it to psd2doc instead of linking against the crate.
//! This is the input format of the `psd2doc` CLI and the backbone of the
//! integration tests.
//!
//! ## Format
//!
//! ```json
//! {
//!   "name": "root",
//!   "group": true,
//!   "bulkEnumeration": true,
//!   "children": [
//!     { "name": "Title", "left": 10, "top": 20, "right": 110, "bottom": 60,
//!       "typeTool": { "textValue": "Hello" } },
//!     { "name": "Photo", "left": 0, "top": 0, "right": 200, "bottom": 150,
//!       "imagePng": "<base64 PNG>",
//!       "mask": { "left": 10, "top": 5, "width": 100, "height": 80 } }
//!   ]
//! }
//! ```
//!
//! `group` defaults to "has children". `bulkEnumeration` (root only,
//! default `true`) toggles the [`PsdNode::descendants`] capability so
//! fixtures can exercise the manual-walk fallback. A type-tool record under
//! `"attributes"` instead of `"typeTool"` is surfaced through
//! [`PsdNode::lookup_type_tool`] only, modelling parsers that hide the
//! record behind a generic attribute accessor.

use super::{LayerRecord, MaskRecord, NodeHandle, PixelSource, PixelEncodeError, PsdNode, TypeToolRecord};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced while building a [`ValueNode`] tree from JSON.
#[derive(Debug, Error)]
pub enum ValueTreeError {
    #[error("tree node is not a JSON object")]
    NotAnObject,

    #[error("tree node is missing a \"name\" string")]
    MissingName,

    #[error("node '{name}': invalid imagePng payload: {detail}")]
    InvalidImage { name: String, detail: String },

    #[error("node '{name}': invalid mask record: {detail}")]
    InvalidMask { name: String, detail: String },

    #[error("node '{name}': invalid typeTool record: {detail}")]
    InvalidTypeTool { name: String, detail: String },
}

/// Pixel payload carried as an already-encoded PNG.
///
/// Decoded once at parse time so `width`/`height`/`rgba` are cheap;
/// `to_png` is overridden to return the original bytes without a re-encode
/// round trip.
struct EncodedPixels {
    png: Vec<u8>,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl PixelSource for EncodedPixels {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn rgba(&self) -> Vec<u8> {
        self.rgba.clone()
    }

    fn to_png(&self) -> Result<Vec<u8>, PixelEncodeError> {
        Ok(self.png.clone())
    }
}

/// A layer-tree node deserialised from a JSON dump.
pub struct ValueNode {
    name: String,
    group: bool,
    left: Option<i32>,
    top: Option<i32>,
    right: Option<i32>,
    bottom: Option<i32>,
    record: Option<LayerRecord>,
    attribute_type_tool: Option<TypeToolRecord>,
    children: Vec<NodeHandle>,
    bulk_enumeration: bool,
}

impl ValueNode {
    /// Build a node tree from a parsed JSON value. The returned handle is
    /// the root; feed it to [`crate::extract`].
    pub fn from_value(value: &Value) -> Result<NodeHandle, ValueTreeError> {
        let bulk = value
            .get("bulkEnumeration")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        Self::build(value, bulk)
    }

    /// Build a node tree from JSON text.
    pub fn from_json(json: &str) -> Result<NodeHandle, ValueTreeError> {
        let value: Value = serde_json::from_str(json).map_err(|_| ValueTreeError::NotAnObject)?;
        Self::from_value(&value)
    }

    fn build(value: &Value, bulk: bool) -> Result<NodeHandle, ValueTreeError> {
        let obj = value.as_object().ok_or(ValueTreeError::NotAnObject)?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ValueTreeError::MissingName)?
            .to_string();

        let side = |key: &str| obj.get(key).and_then(Value::as_i64).map(|v| v as i32);

        let children = obj
            .get("children")
            .and_then(Value::as_array)
            .map(|kids| {
                kids.iter()
                    .map(|k| Self::build(k, bulk))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let group = obj
            .get("group")
            .and_then(Value::as_bool)
            .unwrap_or(!children.is_empty());

        let type_tool = obj
            .get("typeTool")
            .map(|v| {
                serde_json::from_value::<TypeToolRecord>(v.clone()).map_err(|e| {
                    ValueTreeError::InvalidTypeTool {
                        name: name.clone(),
                        detail: e.to_string(),
                    }
                })
            })
            .transpose()?;

        let attribute_type_tool = obj
            .get("attributes")
            .and_then(|a| a.get("typeTool"))
            .map(|v| {
                serde_json::from_value::<TypeToolRecord>(v.clone()).map_err(|e| {
                    ValueTreeError::InvalidTypeTool {
                        name: name.clone(),
                        detail: e.to_string(),
                    }
                })
            })
            .transpose()?;

        let mask = obj
            .get("mask")
            .map(|v| {
                serde_json::from_value::<MaskRecord>(v.clone()).map_err(|e| {
                    ValueTreeError::InvalidMask {
                        name: name.clone(),
                        detail: e.to_string(),
                    }
                })
            })
            .transpose()?;

        let image: Option<Arc<dyn PixelSource>> = obj
            .get("imagePng")
            .and_then(Value::as_str)
            .map(|b64| {
                let png = STANDARD
                    .decode(b64)
                    .map_err(|e| ValueTreeError::InvalidImage {
                        name: name.clone(),
                        detail: e.to_string(),
                    })?;
                let decoded =
                    image::load_from_memory(&png).map_err(|e| ValueTreeError::InvalidImage {
                        name: name.clone(),
                        detail: e.to_string(),
                    })?;
                let rgba = decoded.to_rgba8();
                Ok(Arc::new(EncodedPixels {
                    width: rgba.width(),
                    height: rgba.height(),
                    rgba: rgba.into_raw(),
                    png,
                }) as Arc<dyn PixelSource>)
            })
            .transpose()?;

        let record = if image.is_some() || type_tool.is_some() || mask.is_some() {
            Some(LayerRecord {
                image,
                type_tool,
                mask,
            })
        } else {
            None
        };

        Ok(Arc::new(ValueNode {
            name,
            group,
            left: side("left"),
            top: side("top"),
            right: side("right"),
            bottom: side("bottom"),
            record,
            attribute_type_tool,
            children,
            bulk_enumeration: bulk,
        }))
    }

    fn collect_descendants(&self, out: &mut Vec<NodeHandle>) {
        for child in &self.children {
            out.push(Arc::clone(child));
            for grandchild in child.descendants().unwrap_or_default() {
                out.push(grandchild);
            }
        }
    }
}

impl PsdNode for ValueNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_group(&self) -> bool {
        self.group
    }

    fn children(&self) -> Vec<NodeHandle> {
        self.children.clone()
    }

    fn layer(&self) -> Option<&LayerRecord> {
        self.record.as_ref()
    }

    fn left(&self) -> Option<i32> {
        self.left
    }

    fn top(&self) -> Option<i32> {
        self.top
    }

    fn right(&self) -> Option<i32> {
        self.right
    }

    fn bottom(&self) -> Option<i32> {
        self.bottom
    }

    fn descendants(&self) -> Option<Vec<NodeHandle>> {
        if !self.bulk_enumeration {
            return None;
        }
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        Some(out)
    }

    fn lookup_type_tool(&self) -> Option<TypeToolRecord> {
        self.attribute_type_tool.clone()
    }
}
