//! Error types for the psd2doc library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PsdExtractError`] — **Fatal**: the extraction cannot start at all
//!   (invalid configuration, unusable collaborator setup). Returned as
//!   `Err(PsdExtractError)` from the top-level `extract*` functions.
//!
//! * [`LayerError`] — **Non-fatal**: a single layer failed (encode glitch,
//!   upload rejection) but every other node is fine. Stored inside
//!   [`crate::output::ExtractionOutput::failures`] so callers can inspect
//!   partial success rather than losing the whole document to one bad layer.
//!
//! Once extraction has begun there is no fatal class at all: a run always
//! completes with a (possibly shorter than expected) document. Callers that
//! want stricter behaviour can inspect `failures` and decide for themselves.

use thiserror::Error;

/// All fatal errors returned by the psd2doc library.
///
/// Layer-level failures use [`LayerError`] and are stored in
/// [`crate::output::ExtractionOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PsdExtractError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single layer.
///
/// Stored in [`crate::output::ExtractionOutput::failures`] when a node's
/// extraction fails. The overall run continues with the next node.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum LayerError {
    /// PNG encoding of the layer's pixel data failed.
    #[error("Layer '{name}': pixel encoding failed: {detail}")]
    EncodeFailed { name: String, detail: String },

    /// Asset upload failed after all retries.
    #[error("Layer '{name}': asset upload failed after {retries} retries: {detail}")]
    UploadFailed {
        name: String,
        retries: u8,
        detail: String,
    },

    /// Asset upload timed out on every attempt.
    #[error("Layer '{name}': asset upload timed out after {secs}s")]
    UploadTimeout { name: String, secs: u64 },
}

impl LayerError {
    /// Name of the layer this error belongs to.
    pub fn layer_name(&self) -> &str {
        match self {
            LayerError::EncodeFailed { name, .. }
            | LayerError::UploadFailed { name, .. }
            | LayerError::UploadTimeout { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_display() {
        let e = PsdExtractError::InvalidConfig("concurrency must be ≥ 1".into());
        assert!(e.to_string().contains("concurrency"));
    }

    #[test]
    fn upload_failed_display() {
        let e = LayerError::UploadFailed {
            name: "Hero Photo".into(),
            retries: 3,
            detail: "HTTP 507".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Hero Photo"), "got: {msg}");
        assert!(msg.contains("3 retries"), "got: {msg}");
        assert_eq!(e.layer_name(), "Hero Photo");
    }

    #[test]
    fn upload_timeout_display() {
        let e = LayerError::UploadTimeout {
            name: "bg".into(),
            secs: 60,
        };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn layer_error_serialises() {
        let e = LayerError::EncodeFailed {
            name: "logo".into(),
            detail: "zero-sized buffer".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("logo"));
        let back: LayerError = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back.layer_name(), "logo");
    }
}
