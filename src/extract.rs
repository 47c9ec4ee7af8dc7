//! Eager (full-document) extraction entry points.
//!
//! ## Why eager vs. streaming?
//!
//! This module provides the simpler API: process every node, then return
//! the assembled [`ExtractionOutput`]. Use [`crate::stream::extract_stream`]
//! instead when you want layers progressively (e.g. to show uploads landing
//! in a UI).
//!
//! ## Ordering
//!
//! The document's layer order always equals the traversal visitation order,
//! never upload completion order. Sequential mode awaits each node before
//! advancing; concurrent mode runs per-node futures through
//! `buffer_unordered` and commits the settled outcomes sorted by traversal
//! index. The two modes produce identical documents.

use crate::config::ExtractionConfig;
use crate::error::{LayerError, PsdExtractError};
use crate::id::LayerIdGenerator;
use crate::node::NodeHandle;
use crate::output::{
    DocumentLayer, ExtractionOutput, ExtractionStats, LayerContent, LayerWarning, PsdDocument,
};
use crate::pipeline::classify::{classify, LayerKind};
use crate::pipeline::{image, text, traverse};
use crate::storage::{AssetStore, DataUriStore};
use crate::style::{RecordStyleResolver, StyleResolver, TextLayerStyle};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// One classified node awaiting extraction.
pub(crate) struct WorkItem {
    pub index: usize,
    pub node: NodeHandle,
    pub kind: LayerKind,
}

/// Settled result of one node's extraction. Errors never escape this shape.
pub(crate) struct NodeOutcome {
    pub index: usize,
    pub name: String,
    pub layer: Option<DocumentLayer>,
    pub style: Option<TextLayerStyle>,
    pub url: Option<String>,
    pub warnings: Vec<LayerWarning>,
    pub error: Option<LayerError>,
}

/// Extract a parsed layer tree into a flat, ordered document.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `root`   — Tree handle from the upstream parser
/// * `config` — Extraction configuration
///
/// # Returns
/// `Ok(ExtractionOutput)` on success, even if some layers were skipped or
/// failed (check `output.warnings` / `output.failures`).
///
/// # Errors
/// Returns `Err(PsdExtractError)` only for setup errors (invalid
/// configuration). Once extraction begins, a run always completes.
pub async fn extract(
    root: &NodeHandle,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PsdExtractError> {
    let total_start = Instant::now();
    config.validate()?;
    info!("Starting extraction");

    // ── Step 1: Resolve collaborators ────────────────────────────────────
    let store: Arc<dyn AssetStore> = config
        .store
        .clone()
        .unwrap_or_else(|| Arc::new(DataUriStore));
    let resolver: Arc<dyn StyleResolver> = config
        .resolver
        .clone()
        .unwrap_or_else(|| Arc::new(RecordStyleResolver));
    let ids = Arc::new(LayerIdGenerator::new());

    // ── Step 2: Flatten the tree ─────────────────────────────────────────
    let traverse_start = Instant::now();
    let traversal = traverse::flatten(root);
    let traverse_duration_ms = traverse_start.elapsed().as_millis() as u64;
    let discovered = traversal.nodes.len();
    info!("Tree flattened: {} nodes", discovered);

    let mut run_warnings = Vec::new();
    if traversal.used_fallback {
        run_warnings.push(LayerWarning::TraversalFallback);
    }

    // ── Step 3: Classify ─────────────────────────────────────────────────
    let work: Vec<WorkItem> = traversal
        .nodes
        .into_iter()
        .map(|node| (classify(node.as_ref()), node))
        .filter(|(kind, _)| *kind != LayerKind::Ignorable)
        .enumerate()
        .map(|(index, (kind, node))| WorkItem { index, node, kind })
        .collect();
    debug!("Classified {} extractable layers", work.len());
    let total_layers = work.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total_layers);
    }

    // ── Step 4: Process ──────────────────────────────────────────────────
    let process_start = Instant::now();
    let mut outcomes = if config.concurrency <= 1 {
        process_sequential(work, &store, &resolver, &ids, config).await
    } else {
        process_concurrent(work, &store, &resolver, &ids, config).await
    };
    let process_duration_ms = process_start.elapsed().as_millis() as u64;

    // Commit in traversal order, not completion order.
    outcomes.sort_by_key(|o| o.index);

    // ── Step 5: Assemble ─────────────────────────────────────────────────
    let mut document = PsdDocument::default();
    let mut text_layers: HashMap<String, TextLayerStyle> = HashMap::new();
    let mut extracted_images: HashMap<String, String> = HashMap::new();
    let mut warnings = run_warnings;
    let mut failures = Vec::new();
    let (mut text_count, mut image_count) = (0usize, 0usize);

    for outcome in outcomes {
        warnings.extend(outcome.warnings);
        if let Some(err) = outcome.error {
            failures.push(err);
        }
        if let Some(layer) = outcome.layer {
            match &layer.content {
                LayerContent::Text { .. } => {
                    text_count += 1;
                    if let Some(style) = outcome.style {
                        text_layers.insert(outcome.name.clone(), style);
                    }
                }
                LayerContent::Image { .. } => {
                    image_count += 1;
                    if let Some(url) = outcome.url {
                        extracted_images.insert(outcome.name.clone(), url);
                    }
                }
            }
            document.layers.push(layer);
        }
    }

    let emitted = text_count + image_count;
    let failed = failures.len();
    let stats = ExtractionStats {
        discovered_nodes: discovered,
        text_layers: text_count,
        image_layers: image_count,
        skipped_layers: total_layers - emitted - failed,
        failed_layers: failed,
        traverse_duration_ms,
        process_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Extraction complete: {}/{} layers, {}ms total",
        emitted, total_layers, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(total_layers, emitted);
    }

    Ok(ExtractionOutput {
        document,
        text_layers,
        extracted_images,
        warnings,
        failures,
        stats,
    })
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    root: &NodeHandle,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PsdExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PsdExtractError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract(root, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Process layers strictly one at a time, awaiting each upload.
async fn process_sequential(
    work: Vec<WorkItem>,
    store: &Arc<dyn AssetStore>,
    resolver: &Arc<dyn StyleResolver>,
    ids: &Arc<LayerIdGenerator>,
    config: &ExtractionConfig,
) -> Vec<NodeOutcome> {
    let total = work.len();
    let mut results = Vec::with_capacity(total);
    for item in work {
        results.push(process_node(item, total, store, resolver, ids, config).await);
    }
    results
}

/// Process layers concurrently; callers re-establish traversal order by
/// sorting on `NodeOutcome::index`.
async fn process_concurrent(
    work: Vec<WorkItem>,
    store: &Arc<dyn AssetStore>,
    resolver: &Arc<dyn StyleResolver>,
    ids: &Arc<LayerIdGenerator>,
    config: &ExtractionConfig,
) -> Vec<NodeOutcome> {
    let total = work.len();
    stream::iter(
        work.into_iter()
            .map(|item| process_node(item, total, store, resolver, ids, config)),
    )
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}

/// Extract one classified node, firing progress callbacks. Never errors.
pub(crate) async fn process_node(
    item: WorkItem,
    total: usize,
    store: &Arc<dyn AssetStore>,
    resolver: &Arc<dyn StyleResolver>,
    ids: &Arc<LayerIdGenerator>,
    config: &ExtractionConfig,
) -> NodeOutcome {
    let WorkItem { index, node, kind } = item;
    let name = node.name().to_string();

    if let Some(ref cb) = config.progress_callback {
        cb.on_layer_start(index, total, &name);
    }

    let outcome = match kind {
        LayerKind::Text => {
            let out = text::extract_text(
                node.as_ref(),
                resolver.as_ref(),
                ids,
                config.skip_empty_text,
            );
            NodeOutcome {
                index,
                name: name.clone(),
                layer: out.layer,
                style: out.style,
                url: None,
                warnings: out.warnings,
                error: None,
            }
        }
        LayerKind::Image => {
            let out = image::extract_image(node.as_ref(), store, config, ids).await;
            NodeOutcome {
                index,
                name: name.clone(),
                layer: out.layer,
                style: None,
                url: out.url,
                warnings: out.warnings,
                error: out.error,
            }
        }
        // Filtered out before work is built; nothing to do.
        LayerKind::Ignorable => NodeOutcome {
            index,
            name: name.clone(),
            layer: None,
            style: None,
            url: None,
            warnings: Vec::new(),
            error: None,
        },
    };

    if let Some(ref cb) = config.progress_callback {
        if outcome.layer.is_some() {
            cb.on_layer_complete(index, total, &name);
        } else {
            let detail = outcome
                .error
                .as_ref()
                .map(|e| e.to_string())
                .or_else(|| outcome.warnings.first().map(|w| w.to_string()))
                .unwrap_or_else(|| "skipped".to_string());
            cb.on_layer_error(index, total, &name, &detail);
        }
    }

    outcome
}
