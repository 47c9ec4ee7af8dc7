//! Progress-callback trait for per-layer extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline processes each classified layer.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a channel, a WebSocket, or a terminal progress bar
//! without the library knowing how the host application communicates. The
//! trait is `Send + Sync` so it works when layers are processed
//! concurrently.

use std::sync::Arc;

/// Called by the extraction pipeline as it processes each classified layer.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// With `concurrency > 1`, `on_layer_start`, `on_layer_complete`, and
/// `on_layer_error` may be called concurrently from different tasks.
/// Implementations must protect shared mutable state accordingly.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after classification, before any layer is processed.
    ///
    /// `total_layers` is the number of classified (text or image) nodes —
    /// ignorable nodes and groups are not counted.
    fn on_extraction_start(&self, total_layers: usize) {
        let _ = total_layers;
    }

    /// Called just before a layer's extraction begins.
    fn on_layer_start(&self, index: usize, total_layers: usize, name: &str) {
        let _ = (index, total_layers, name);
    }

    /// Called when a layer was extracted and will be appended to the
    /// document.
    fn on_layer_complete(&self, index: usize, total_layers: usize, name: &str) {
        let _ = (index, total_layers, name);
    }

    /// Called when a layer is skipped or fails; `detail` is human-readable.
    fn on_layer_error(&self, index: usize, total_layers: usize, name: &str, detail: &str) {
        let _ = (index, total_layers, name, detail);
    }

    /// Called once after every classified layer has been attempted.
    fn on_extraction_complete(&self, total_layers: usize, emitted: usize) {
        let _ = (total_layers, emitted);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
