//! Text-style resolution seam.
//!
//! Turning a raw type-tool record into structured style data is typography
//! interpretation — font substitution tables, engine-data decoding, style
//! run merging — and lives outside this crate. The pipeline only needs one
//! call: raw record in, [`TextLayerStyle`] or `None` out. Hosts plug their
//! interpreter in through [`StyleResolver`]; when none is configured,
//! [`RecordStyleResolver`] lifts whatever fields the parser already decoded.

use crate::node::{PsdNode, TypeToolRecord};
use serde::{Deserialize, Serialize};

/// Structured text attributes for a resolved text layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayerStyle {
    /// The text content. May legitimately be empty (placeholder layers).
    pub text: String,
    #[serde(default)]
    pub fonts: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<f32>,
    #[serde(default)]
    pub colors: Vec<[u8; 4]>,
    #[serde(default)]
    pub alignment: Option<String>,
}

/// Resolves a raw type-tool record into structured style data.
///
/// Returning `None` means the record was not interpretable; the pipeline
/// skips the layer with a warning rather than failing the run.
pub trait StyleResolver: Send + Sync {
    fn resolve(&self, raw: &TypeToolRecord, node: &dyn PsdNode) -> Option<TextLayerStyle>;
}

/// Default resolver: passes the record's own decoded fields through.
///
/// Resolves to `None` when the parser decoded no text value at all — a
/// record with `text_value: Some("")` still resolves (empty text is valid,
/// e.g. a placeholder layer).
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordStyleResolver;

impl StyleResolver for RecordStyleResolver {
    fn resolve(&self, raw: &TypeToolRecord, _node: &dyn PsdNode) -> Option<TextLayerStyle> {
        let text = raw.text_value.clone()?;
        Some(TextLayerStyle {
            text,
            fonts: raw.fonts.clone(),
            sizes: raw.sizes.clone(),
            colors: raw.colors.clone(),
            alignment: raw.alignment.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{LayerRecord, NodeHandle};

    struct BareNode;

    impl PsdNode for BareNode {
        fn name(&self) -> &str {
            "bare"
        }
        fn is_group(&self) -> bool {
            false
        }
        fn children(&self) -> Vec<NodeHandle> {
            Vec::new()
        }
        fn layer(&self) -> Option<&LayerRecord> {
            None
        }
    }

    #[test]
    fn resolves_decoded_fields() {
        let raw = TypeToolRecord {
            text_value: Some("Summer Sale".into()),
            fonts: vec!["Inter".into()],
            sizes: vec![32.0],
            alignment: Some("center".into()),
            ..Default::default()
        };
        let style = RecordStyleResolver.resolve(&raw, &BareNode).expect("style");
        assert_eq!(style.text, "Summer Sale");
        assert_eq!(style.fonts, vec!["Inter".to_string()]);
        assert_eq!(style.alignment.as_deref(), Some("center"));
    }

    #[test]
    fn undecoded_record_resolves_to_none() {
        let raw = TypeToolRecord::default();
        assert!(RecordStyleResolver.resolve(&raw, &BareNode).is_none());
    }

    #[test]
    fn empty_text_still_resolves() {
        let raw = TypeToolRecord {
            text_value: Some(String::new()),
            ..Default::default()
        };
        let style = RecordStyleResolver.resolve(&raw, &BareNode).expect("style");
        assert!(style.text.is_empty());
    }
}
