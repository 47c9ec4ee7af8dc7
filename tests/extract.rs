//! Integration tests for the extraction pipeline.
//!
//! These drive the public API end to end over hand-built stub trees and
//! in-memory asset stores. No real parser and no network: the point is the
//! pipeline's observable behaviour — geometry, mask resolution, ordering,
//! failure isolation, diagnostics — asserted on the structured output
//! rather than on captured logs.

use async_trait::async_trait;
use psd2doc::node::value::ValueNode;
use psd2doc::{
    extract, extract_stream, AssetStore, DataUriStore, ExtractionConfig, LayerContent,
    LayerError, LayerRecord, LayerWarning, MaskRecord, NodeHandle, PixelSource, PsdNode,
    StorageError, StyleResolver, TextLayerStyle, TypeToolRecord,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Stub tree ────────────────────────────────────────────────────────────────

struct SolidPixels {
    w: u32,
    h: u32,
}

impl PixelSource for SolidPixels {
    fn width(&self) -> u32 {
        self.w
    }
    fn height(&self) -> u32 {
        self.h
    }
    fn rgba(&self) -> Vec<u8> {
        vec![0x40; self.w as usize * self.h as usize * 4]
    }
}

struct StubNode {
    name: String,
    group: bool,
    bounds: Option<(i32, i32, i32, i32)>,
    record: Option<LayerRecord>,
    children: Vec<NodeHandle>,
    bulk: bool,
}

impl StubNode {
    fn text(name: &str, bounds: (i32, i32, i32, i32), text: &str) -> NodeHandle {
        Arc::new(StubNode {
            name: name.into(),
            group: false,
            bounds: Some(bounds),
            record: Some(LayerRecord {
                type_tool: Some(TypeToolRecord {
                    text_value: Some(text.into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            children: Vec::new(),
            bulk: false,
        })
    }

    fn image(name: &str, bounds: (i32, i32, i32, i32)) -> NodeHandle {
        Self::image_masked(name, bounds, None)
    }

    fn image_masked(
        name: &str,
        bounds: (i32, i32, i32, i32),
        mask: Option<MaskRecord>,
    ) -> NodeHandle {
        Arc::new(StubNode {
            name: name.into(),
            group: false,
            bounds: Some(bounds),
            record: Some(LayerRecord {
                image: Some(Arc::new(SolidPixels { w: 2, h: 2 })),
                mask,
                ..Default::default()
            }),
            children: Vec::new(),
            bulk: false,
        })
    }

    fn group(name: &str, children: Vec<NodeHandle>) -> NodeHandle {
        Arc::new(StubNode {
            name: name.into(),
            group: true,
            bounds: None,
            record: None,
            children,
            bulk: false,
        })
    }

    /// Root with the bulk-enumeration capability toggled.
    fn root(bulk: bool, children: Vec<NodeHandle>) -> NodeHandle {
        Arc::new(StubNode {
            name: "root".into(),
            group: true,
            bounds: None,
            record: None,
            children,
            bulk,
        })
    }
}

fn preorder(node: &NodeHandle, out: &mut Vec<NodeHandle>) {
    for child in node.children() {
        out.push(Arc::clone(&child));
        preorder(&child, out);
    }
}

impl PsdNode for StubNode {
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
        self.bounds.map(|b| b.0)
    }
    fn top(&self) -> Option<i32> {
        self.bounds.map(|b| b.1)
    }
    fn right(&self) -> Option<i32> {
        self.bounds.map(|b| b.2)
    }
    fn bottom(&self) -> Option<i32> {
        self.bounds.map(|b| b.3)
    }
    fn descendants(&self) -> Option<Vec<NodeHandle>> {
        if !self.bulk {
            return None;
        }
        let mut out = Vec::new();
        for child in &self.children {
            out.push(Arc::clone(child));
            preorder(child, &mut out);
        }
        Some(out)
    }
}

/// A node whose text record is only legible after activation — models
/// parser versions that require the selection side effect. The record is
/// always *present* (so classification sees a text layer) but its text
/// value only decodes once the node is the active layer.
struct ActivationGated {
    activated: AtomicBool,
}

impl PsdNode for ActivationGated {
    fn name(&self) -> &str {
        "gated"
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
    fn left(&self) -> Option<i32> {
        Some(0)
    }
    fn top(&self) -> Option<i32> {
        Some(0)
    }
    fn right(&self) -> Option<i32> {
        Some(40)
    }
    fn bottom(&self) -> Option<i32> {
        Some(10)
    }
    fn activate(&self) {
        self.activated.store(true, Ordering::SeqCst);
    }
    fn lookup_type_tool(&self) -> Option<TypeToolRecord> {
        if !self.activated.load(Ordering::SeqCst) {
            return Some(TypeToolRecord::default());
        }
        Some(TypeToolRecord {
            text_value: Some("gated text".into()),
            ..Default::default()
        })
    }
}

// ── Stub stores & resolvers ──────────────────────────────────────────────────

/// Records uploads; returns deterministic `mem://` URLs.
struct MemoryStore {
    uploads: Mutex<Vec<String>>,
}

impl MemoryStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            uploads: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn store(&self, _bytes: Vec<u8>, name: &str) -> Result<String, StorageError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(name.to_string());
        Ok(format!("mem://{}/{}", name, uploads.len()))
    }
}

/// Rejects uploads for the named layers, succeeds for the rest.
struct FailingStore {
    reject: HashSet<String>,
}

#[async_trait]
impl AssetStore for FailingStore {
    async fn store(&self, _bytes: Vec<u8>, name: &str) -> Result<String, StorageError> {
        if self.reject.contains(name) {
            Err(StorageError::Rejected("simulated CDN outage".into()))
        } else {
            Ok(format!("mem://{name}"))
        }
    }
}

/// Upload latency inversely proportional to arrival order: early uploads
/// finish last, so completion order inverts traversal order.
struct InvertingStore {
    started: AtomicUsize,
}

#[async_trait]
impl AssetStore for InvertingStore {
    async fn store(&self, _bytes: Vec<u8>, name: &str) -> Result<String, StorageError> {
        let order = self.started.fetch_add(1, Ordering::SeqCst);
        let delay = 50u64.saturating_sub(order as u64 * 10);
        tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
        Ok(format!("mem://{name}"))
    }
}

/// Style resolver that never resolves anything.
struct NullResolver;

impl StyleResolver for NullResolver {
    fn resolve(&self, _raw: &TypeToolRecord, _node: &dyn PsdNode) -> Option<TextLayerStyle> {
        None
    }
}

fn fast_config() -> ExtractionConfig {
    ExtractionConfig::builder()
        .max_retries(1)
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

fn layer_names(output: &psd2doc::ExtractionOutput) -> Vec<String> {
    output
        .document
        .layers
        .iter()
        .map(|l| l.name.clone())
        .collect()
}

// ── Geometry & classification ────────────────────────────────────────────────

#[tokio::test]
async fn text_layer_geometry_is_padded() {
    let root = StubNode::root(true, vec![StubNode::text("Title", (10, 20, 110, 60), "Hello")]);
    let output = extract(&root, &fast_config()).await.unwrap();

    assert_eq!(output.document.len(), 1);
    let layer = &output.document.layers[0];
    assert_eq!((layer.x, layer.y), (10, 20));
    assert_eq!((layer.width, layer.height), (115, 60));
    match &layer.content {
        LayerContent::Text { text_content, .. } => assert_eq!(text_content, "Hello"),
        other => panic!("expected text, got {other:?}"),
    }
    assert_eq!(output.text_layers["Title"].text, "Hello");
}

#[tokio::test]
async fn image_without_mask_uses_node_bounds() {
    let root = StubNode::root(true, vec![StubNode::image("Photo", (0, 0, 200, 150))]);
    let store = MemoryStore::new();
    let config = ExtractionConfig::builder().store(store).build().unwrap();
    let output = extract(&root, &config).await.unwrap();

    let layer = &output.document.layers[0];
    assert_eq!(
        (layer.x, layer.y, layer.width, layer.height),
        (0, 0, 200, 150)
    );
    assert!(output.extracted_images["Photo"].starts_with("mem://Photo"));
}

#[tokio::test]
async fn enabled_mask_overrides_image_geometry() {
    let mask = MaskRecord {
        left: 10,
        top: 5,
        right: 110,
        bottom: 85,
        width: 100,
        height: 80,
        disabled: false,
        ..Default::default()
    };
    let root = StubNode::root(
        true,
        vec![StubNode::image_masked("Photo", (0, 0, 200, 150), Some(mask))],
    );
    let store = MemoryStore::new();
    let config = ExtractionConfig::builder().store(store).build().unwrap();
    let output = extract(&root, &config).await.unwrap();

    let layer = &output.document.layers[0];
    assert_eq!(
        (layer.x, layer.y, layer.width, layer.height),
        (10, 5, 100, 80)
    );
}

#[tokio::test]
async fn disabled_mask_is_attached_but_ignored_for_geometry() {
    let mask = MaskRecord {
        left: 10,
        top: 5,
        width: 100,
        height: 80,
        disabled: true,
        ..Default::default()
    };
    let root = StubNode::root(
        true,
        vec![StubNode::image_masked(
            "Photo",
            (0, 0, 200, 150),
            Some(mask.clone()),
        )],
    );
    let store = MemoryStore::new();
    let config = ExtractionConfig::builder().store(store).build().unwrap();
    let output = extract(&root, &config).await.unwrap();

    let layer = &output.document.layers[0];
    assert_eq!(
        (layer.x, layer.y, layer.width, layer.height),
        (0, 0, 200, 150)
    );
    match &layer.content {
        LayerContent::Image { mask: attached, .. } => assert_eq!(attached.as_ref(), Some(&mask)),
        other => panic!("expected image, got {other:?}"),
    }
}

#[tokio::test]
async fn groups_never_emit_layers() {
    let root = StubNode::root(
        true,
        vec![StubNode::group(
            "banner group",
            vec![
                StubNode::image("left", (0, 0, 50, 50)),
                StubNode::image("right", (50, 0, 100, 50)),
            ],
        )],
    );
    let store = MemoryStore::new();
    let config = ExtractionConfig::builder().store(store).build().unwrap();
    let output = extract(&root, &config).await.unwrap();

    assert_eq!(layer_names(&output), vec!["left", "right"]);
    // Three nodes discovered (group + 2 leaves), two classified and emitted.
    assert_eq!(output.stats.discovered_nodes, 3);
    assert_eq!(output.stats.image_layers, 2);
}

// ── Failure isolation & diagnostics ──────────────────────────────────────────

#[tokio::test]
async fn failing_upload_skips_only_that_layer() {
    let root = StubNode::root(
        true,
        vec![
            StubNode::image("broken", (0, 0, 10, 10)),
            StubNode::text("caption", (0, 10, 40, 20), "still here"),
            StubNode::image("fine", (0, 20, 10, 30)),
        ],
    );
    let store = Arc::new(FailingStore {
        reject: HashSet::from(["broken".to_string()]),
    });
    let config = ExtractionConfig::builder()
        .store(store)
        .max_retries(1)
        .retry_backoff_ms(1)
        .build()
        .unwrap();
    let output = extract(&root, &config).await.unwrap();

    assert_eq!(layer_names(&output), vec!["caption", "fine"]);
    assert_eq!(output.failures.len(), 1);
    match &output.failures[0] {
        LayerError::UploadFailed { name, .. } => assert_eq!(name, "broken"),
        other => panic!("expected UploadFailed, got {other:?}"),
    }
    assert_eq!(output.stats.failed_layers, 1);
    assert!(!output.extracted_images.contains_key("broken"));
}

#[tokio::test]
async fn null_style_resolution_skips_with_warning() {
    let root = StubNode::root(true, vec![StubNode::text("Title", (0, 0, 10, 10), "x")]);
    let config = ExtractionConfig::builder()
        .resolver(Arc::new(NullResolver))
        .build()
        .unwrap();
    let output = extract(&root, &config).await.unwrap();

    assert!(output.document.is_empty());
    assert_eq!(
        output.warnings,
        vec![LayerWarning::StyleNotFound {
            name: "Title".into()
        }]
    );
    assert_eq!(output.stats.skipped_layers, 1);
    assert!(output.failures.is_empty());
}

#[tokio::test]
async fn empty_text_is_emitted_with_warning_by_default() {
    let root = StubNode::root(true, vec![StubNode::text("Placeholder", (0, 0, 50, 30), "")]);
    let output = extract(&root, &fast_config()).await.unwrap();

    assert_eq!(output.document.len(), 1);
    assert_eq!(
        output.warnings,
        vec![LayerWarning::EmptyText {
            name: "Placeholder".into()
        }]
    );
}

#[tokio::test]
async fn empty_text_is_dropped_when_configured() {
    let root = StubNode::root(true, vec![StubNode::text("Placeholder", (0, 0, 50, 30), "")]);
    let config = ExtractionConfig::builder()
        .skip_empty_text(true)
        .build()
        .unwrap();
    let output = extract(&root, &config).await.unwrap();

    assert!(output.document.is_empty());
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.stats.skipped_layers, 1);
}

#[tokio::test]
async fn activation_side_effect_runs_before_text_access() {
    let root = StubNode::root(
        false,
        vec![Arc::new(ActivationGated {
            activated: AtomicBool::new(false),
        })],
    );
    let output = extract(&root, &fast_config()).await.unwrap();

    assert_eq!(output.document.len(), 1);
    match &output.document.layers[0].content {
        LayerContent::Text { text_content, .. } => assert_eq!(text_content, "gated text"),
        other => panic!("expected text, got {other:?}"),
    }
}

// ── Ordering ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_order_matches_traversal_despite_upload_timing() {
    let root = StubNode::root(
        true,
        vec![
            StubNode::image("first", (0, 0, 10, 10)),
            StubNode::image("second", (0, 0, 10, 10)),
            StubNode::text("third", (0, 0, 10, 10), "t"),
            StubNode::image("fourth", (0, 0, 10, 10)),
        ],
    );
    let config = ExtractionConfig::builder()
        .store(Arc::new(InvertingStore {
            started: AtomicUsize::new(0),
        }))
        .concurrency(4)
        .build()
        .unwrap();
    let output = extract(&root, &config).await.unwrap();

    assert_eq!(
        layer_names(&output),
        vec!["first", "second", "third", "fourth"]
    );
}

#[tokio::test]
async fn sequential_and_concurrent_modes_agree() {
    let tree = || {
        StubNode::root(
            true,
            vec![
                StubNode::text("a", (0, 0, 10, 10), "1"),
                StubNode::group(
                    "g",
                    vec![
                        StubNode::image("b", (0, 0, 10, 10)),
                        StubNode::text("c", (0, 0, 10, 10), "2"),
                    ],
                ),
                StubNode::image("d", (0, 0, 10, 10)),
            ],
        )
    };

    let sequential = ExtractionConfig::builder()
        .store(MemoryStore::new())
        .concurrency(1)
        .build()
        .unwrap();
    let concurrent = ExtractionConfig::builder()
        .store(MemoryStore::new())
        .concurrency(8)
        .build()
        .unwrap();

    let seq_out = extract(&tree(), &sequential).await.unwrap();
    let conc_out = extract(&tree(), &concurrent).await.unwrap();

    assert_eq!(layer_names(&seq_out), layer_names(&conc_out));
    assert_eq!(layer_names(&seq_out), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn fallback_walk_produces_same_document_as_bulk() {
    let children = || {
        vec![
            StubNode::text("a", (0, 0, 10, 10), "1"),
            StubNode::group("g", vec![StubNode::image("b", (0, 0, 10, 10))]),
            StubNode::text("c", (0, 0, 10, 10), "2"),
        ]
    };

    let bulk_out = extract(&StubNode::root(true, children()), &fast_config())
        .await
        .unwrap();
    let walk_out = extract(&StubNode::root(false, children()), &fast_config())
        .await
        .unwrap();

    assert_eq!(layer_names(&bulk_out), layer_names(&walk_out));
    assert!(!bulk_out.warnings.contains(&LayerWarning::TraversalFallback));
    assert!(walk_out.warnings.contains(&LayerWarning::TraversalFallback));
}

// ── Identifiers & side indices ───────────────────────────────────────────────

#[tokio::test]
async fn ids_are_unique_even_for_duplicate_names() {
    let root = StubNode::root(
        true,
        vec![
            StubNode::text("dup", (0, 0, 10, 10), "one"),
            StubNode::text("dup", (0, 0, 10, 10), "two"),
            StubNode::text("dup", (0, 0, 10, 10), "three"),
        ],
    );
    let output = extract(&root, &fast_config()).await.unwrap();

    let ids: HashSet<&str> = output
        .document
        .layers
        .iter()
        .map(|l| l.id.as_str())
        .collect();
    assert_eq!(ids.len(), 3);
    for id in &ids {
        assert!(id.starts_with("layer_dup_"), "got: {id}");
    }
}

#[tokio::test]
async fn side_indices_are_last_write_wins() {
    let root = StubNode::root(
        true,
        vec![
            StubNode::text("dup", (0, 0, 10, 10), "first"),
            StubNode::text("dup", (0, 0, 10, 10), "second"),
        ],
    );
    let output = extract(&root, &fast_config()).await.unwrap();

    assert_eq!(output.document.len(), 2);
    assert_eq!(output.text_layers.len(), 1);
    assert_eq!(output.text_layers["dup"].text, "second");
}

// ── Default store & serde shape ──────────────────────────────────────────────

#[tokio::test]
async fn default_store_inlines_data_uris() {
    let root = StubNode::root(true, vec![StubNode::image("inline", (0, 0, 2, 2))]);
    let output = extract(&root, &ExtractionConfig::default()).await.unwrap();

    match &output.document.layers[0].content {
        LayerContent::Image { src, .. } => {
            assert!(src.starts_with("data:image/png;base64,"), "got: {src}");
        }
        other => panic!("expected image, got {other:?}"),
    }
    // Same inlining, explicitly configured.
    let config = ExtractionConfig::builder()
        .store(Arc::new(DataUriStore))
        .build()
        .unwrap();
    let output2 = extract(&root, &config).await.unwrap();
    assert_eq!(output.document.len(), output2.document.len());
}

#[tokio::test]
async fn output_serialises_with_tagged_layer_types() {
    let root = StubNode::root(
        true,
        vec![
            StubNode::text("Title", (10, 20, 110, 60), "Hello"),
            StubNode::image("Photo", (0, 0, 200, 150)),
        ],
    );
    let store = MemoryStore::new();
    let config = ExtractionConfig::builder().store(store).build().unwrap();
    let output = extract(&root, &config).await.unwrap();

    let json = serde_json::to_value(&output).unwrap();
    let layers = json["document"]["layers"].as_array().unwrap();
    assert_eq!(layers[0]["type"], "text");
    assert_eq!(layers[0]["textContent"], "Hello");
    assert_eq!(layers[1]["type"], "image");
    assert!(layers[1]["src"].as_str().unwrap().starts_with("mem://"));
    assert_eq!(json["textLayers"]["Title"]["text"], "Hello");
}

// ── Streaming API ────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_every_layer_and_error() {
    use futures::StreamExt;

    let root = StubNode::root(
        true,
        vec![
            StubNode::text("a", (0, 0, 10, 10), "1"),
            StubNode::image("broken", (0, 0, 10, 10)),
            StubNode::image("b", (0, 0, 10, 10)),
        ],
    );
    let config = ExtractionConfig::builder()
        .store(Arc::new(FailingStore {
            reject: HashSet::from(["broken".to_string()]),
        }))
        .max_retries(0)
        .retry_backoff_ms(1)
        .concurrency(4)
        .build()
        .unwrap();

    let stream = extract_stream(&root, &config).unwrap();
    let items: Vec<_> = stream.collect().await;

    let mut emitted: Vec<_> = items
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .cloned()
        .collect();
    emitted.sort_by_key(|l| l.index);
    let names: Vec<_> = emitted.iter().map(|l| l.layer.name.clone()).collect();
    assert_eq!(names, vec!["a", "b"]);

    let errors: Vec<_> = items.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].layer_name(), "broken");
}

// ── ValueNode fixture end-to-end ─────────────────────────────────────────────

#[tokio::test]
async fn value_tree_fixture_extracts_end_to_end() {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let img = image::RgbaImage::from_pixel(4, 3, image::Rgba([200, 100, 50, 255]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let json = format!(
        r#"{{
            "name": "root",
            "children": [
                {{ "name": "Headline", "left": 10, "top": 20, "right": 110, "bottom": 60,
                   "typeTool": {{ "textValue": "Big Sale", "fonts": ["Inter"], "sizes": [32.0] }} }},
                {{ "name": "Hero", "left": 0, "top": 0, "right": 4, "bottom": 3,
                   "imagePng": "{}",
                   "mask": {{ "left": 1, "top": 1, "width": 2, "height": 2, "disabled": false }} }}
            ]
        }}"#,
        STANDARD.encode(&png)
    );

    let root = ValueNode::from_json(&json).unwrap();
    let store = MemoryStore::new();
    let config = ExtractionConfig::builder()
        .store(Arc::clone(&store) as Arc<dyn AssetStore>)
        .build()
        .unwrap();
    let output = extract(&root, &config).await.unwrap();

    assert_eq!(layer_names(&output), vec!["Headline", "Hero"]);

    let text = &output.document.layers[0];
    assert_eq!((text.width, text.height), (115, 60));
    assert_eq!(output.text_layers["Headline"].fonts, vec!["Inter"]);

    let hero = &output.document.layers[1];
    assert_eq!((hero.x, hero.y, hero.width, hero.height), (1, 1, 2, 2));
    assert_eq!(*store.uploads.lock().unwrap(), vec!["Hero".to_string()]);
}
