//! Streaming extraction API: emit layers as they complete.
//!
//! ## Why stream?
//!
//! Documents with many image layers spend most of their wall-clock time in
//! uploads. A stream-based API lets callers show layers landing
//! progressively or persist them incrementally instead of waiting for the
//! whole run.
//!
//! Unlike the eager [`crate::extract::extract`], which returns only after
//! every node settles, [`extract_stream`] yields each emitted layer (or
//! per-layer error) as it completes. In concurrent mode layers may arrive
//! out of order — sort by [`ExtractedLayer::index`] if order matters.
//! Nodes skipped with a warning-only outcome produce no stream item; use
//! the eager API when you need the full diagnostic set and side indices.

use crate::config::ExtractionConfig;
use crate::error::{LayerError, PsdExtractError};
use crate::extract::{process_node, WorkItem};
use crate::id::LayerIdGenerator;
use crate::node::NodeHandle;
use crate::output::ExtractedLayer;
use crate::pipeline::classify::{classify, LayerKind};
use crate::pipeline::traverse;
use crate::storage::{AssetStore, DataUriStore};
use crate::style::{RecordStyleResolver, StyleResolver};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-layer extraction results.
pub type LayerStream = Pin<Box<dyn Stream<Item = Result<ExtractedLayer, LayerError>> + Send>>;

/// Extract a parsed layer tree, streaming layers as they are ready.
///
/// Layers are emitted in completion order (not necessarily traversal
/// order) when `config.concurrency > 1`. Sort by `index` if order matters.
///
/// # Returns
/// - `Ok(LayerStream)` — a stream of `Result<ExtractedLayer, LayerError>`
/// - `Err(PsdExtractError)` — setup error (invalid configuration)
pub fn extract_stream(
    root: &NodeHandle,
    config: &ExtractionConfig,
) -> Result<LayerStream, PsdExtractError> {
    config.validate()?;
    info!("Starting streaming extraction");

    let store: Arc<dyn AssetStore> = config
        .store
        .clone()
        .unwrap_or_else(|| Arc::new(DataUriStore));
    let resolver: Arc<dyn StyleResolver> = config
        .resolver
        .clone()
        .unwrap_or_else(|| Arc::new(RecordStyleResolver));
    let ids = Arc::new(LayerIdGenerator::new());
    let config = config.clone();

    let traversal = traverse::flatten(root);
    let work: Vec<WorkItem> = traversal
        .nodes
        .into_iter()
        .map(|node| (classify(node.as_ref()), node))
        .filter(|(kind, _)| *kind != LayerKind::Ignorable)
        .enumerate()
        .map(|(index, (kind, node))| WorkItem { index, node, kind })
        .collect();
    let total = work.len();

    let concurrency = config.concurrency;
    let items = work.into_iter().map(move |item| {
        let store = Arc::clone(&store);
        let resolver = Arc::clone(&resolver);
        let ids = Arc::clone(&ids);
        let config = config.clone();
        async move {
            let outcome = process_node(item, total, &store, &resolver, &ids, &config).await;
            match (outcome.layer, outcome.error) {
                (Some(layer), _) => Some(Ok(ExtractedLayer {
                    index: outcome.index,
                    layer,
                    warnings: outcome.warnings,
                })),
                (None, Some(err)) => Some(Err(err)),
                // Skipped with warnings only: no stream item.
                (None, None) => None,
            }
        }
    });

    let s: LayerStream = if concurrency <= 1 {
        Box::pin(stream::iter(items).then(|fut| fut).filter_map(|r| async { r }))
    } else {
        Box::pin(
            stream::iter(items)
                .buffer_unordered(concurrency)
                .filter_map(|r| async { r }),
        )
    };
    Ok(s)
}
