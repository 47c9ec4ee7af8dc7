//! Image-layer extraction: pixel data → stored asset + mask-resolved layer.
//!
//! This is the only pipeline stage with a suspension point (the asset
//! upload). All failure paths collapse into an [`ImageOutcome`] so a single
//! bad layer — unencodable pixels, a rejecting store, a hung connection —
//! never aborts the run.
//!
//! ## Retry Strategy
//!
//! Store failures are frequently transient under concurrent load.
//! Exponential backoff (`retry_backoff_ms * 2^(attempt-1)`) avoids
//! thundering-herd: with 500 ms base and 3 retries the wait sequence is
//! 500 ms → 1 s → 2 s. Each attempt is additionally bounded by
//! `upload_timeout_secs` so a hung store cannot stall the run.

use crate::config::ExtractionConfig;
use crate::error::LayerError;
use crate::id::LayerIdGenerator;
use crate::node::PsdNode;
use crate::output::{DocumentLayer, LayerContent, LayerWarning};
use crate::storage::AssetStore;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, warn};

/// Result of one image-node extraction.
pub struct ImageOutcome {
    /// The emitted layer, absent when the node was skipped or failed.
    pub layer: Option<DocumentLayer>,
    /// Asset URL for the name-keyed side index, set iff `layer` is.
    pub url: Option<String>,
    pub warnings: Vec<LayerWarning>,
    pub error: Option<LayerError>,
}

impl ImageOutcome {
    fn skip(warning: LayerWarning) -> Self {
        Self {
            layer: None,
            url: None,
            warnings: vec![warning],
            error: None,
        }
    }

    fn fail(error: LayerError) -> Self {
        Self {
            layer: None,
            url: None,
            warnings: Vec::new(),
            error: Some(error),
        }
    }
}

/// Extract a classified image node.
pub async fn extract_image(
    node: &dyn PsdNode,
    store: &Arc<dyn AssetStore>,
    config: &ExtractionConfig,
    ids: &LayerIdGenerator,
) -> ImageOutcome {
    // Recheck the payload: guards against malformed nodes reaching this
    // stage outside the classifier's dispatch.
    let Some(image) = node.layer().and_then(|l| l.image.clone()) else {
        warn!(layer = node.name(), "no image data present");
        return ImageOutcome::skip(LayerWarning::ImageDataMissing {
            name: node.name().to_string(),
        });
    };

    let png = match image.to_png() {
        Ok(buf) => buf,
        Err(e) => {
            error!(layer = node.name(), "pixel encoding failed: {e}");
            return ImageOutcome::fail(LayerError::EncodeFailed {
                name: node.name().to_string(),
                detail: e.to_string(),
            });
        }
    };
    debug!(layer = node.name(), size = png.len(), "encoded layer PNG");

    let url = match upload_with_retry(store, png, node.name(), config).await {
        Ok(url) => url,
        Err(e) => {
            error!(layer = node.name(), "asset upload failed: {e}");
            return ImageOutcome::fail(e);
        }
    };

    let mut x = node.left().unwrap_or(0);
    let mut y = node.top().unwrap_or(0);
    let mut width = node.right().unwrap_or(0) - x;
    let mut height = node.bottom().unwrap_or(0) - y;

    // Zero-area masks are never attached; an enabled mask overrides the
    // crop geometry, a disabled one rides along for downstream unmasking.
    let mask = node
        .layer()
        .and_then(|l| l.mask.clone())
        .filter(|m| m.has_area());
    if let Some(m) = &mask {
        if !m.disabled {
            width = m.width;
            height = m.height;
            x = m.left;
            y = m.top;
        }
    }

    let layer = DocumentLayer {
        id: ids.generate(node.name()),
        name: node.name().to_string(),
        x,
        y,
        width,
        height,
        content: LayerContent::Image {
            src: url.clone(),
            mask,
        },
    };

    ImageOutcome {
        layer: Some(layer),
        url: Some(url),
        warnings: Vec::new(),
        error: None,
    }
}

/// Drive the store with retry, backoff, and a per-attempt timeout.
async fn upload_with_retry(
    store: &Arc<dyn AssetStore>,
    bytes: Vec<u8>,
    name: &str,
    config: &ExtractionConfig,
) -> Result<String, LayerError> {
    let attempt_timeout = Duration::from_secs(config.upload_timeout_secs);
    let mut last_err: Option<String> = None;
    let mut all_timed_out = true;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                layer = name,
                "upload retry {}/{} after {}ms",
                attempt,
                config.max_retries,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(attempt_timeout, store.store(bytes.clone(), name)).await {
            Ok(Ok(url)) => return Ok(url),
            Ok(Err(e)) => {
                warn!(layer = name, "upload attempt {} failed: {e}", attempt + 1);
                last_err = Some(e.to_string());
                all_timed_out = false;
            }
            Err(_) => {
                warn!(
                    layer = name,
                    "upload attempt {} timed out after {}s",
                    attempt + 1,
                    config.upload_timeout_secs
                );
                last_err = Some(format!(
                    "timed out after {}s",
                    config.upload_timeout_secs
                ));
            }
        }
    }

    if all_timed_out {
        Err(LayerError::UploadTimeout {
            name: name.to_string(),
            secs: config.upload_timeout_secs,
        })
    } else {
        Err(LayerError::UploadFailed {
            name: name.to_string(),
            retries: config.max_retries as u8,
            detail: last_err.unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}
