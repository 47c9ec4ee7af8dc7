//! # psd2doc
//!
//! Extract a flat, ordered document model from parsed PSD layer trees.
//!
//! ## Why this crate?
//!
//! Design editors don't want a layer *tree* — they want a flat, ordered
//! list of typed elements with resolved geometry and externally stored
//! assets. But PSD parsers hand back hierarchies of opaque nodes whose
//! capability surface varies between parser versions: bulk enumeration may
//! or may not exist, text records may hide behind a generic attribute
//! lookup, masks may silently override a layer's effective crop. This crate
//! owns that normalization: it walks the tree, classifies every node,
//! resolves mask geometry, pushes pixel data out to asset storage, and
//! emits a document the editor can take as initial element state — without
//! ever letting one bad layer sink the whole file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! layer tree (external parser)
//!  │
//!  ├─ 1. Traverse  flatten via descendants() or manual pre-order walk
//!  ├─ 2. Classify  per node: Text / Image / Ignorable
//!  ├─ 3. Text      activate → resolve style → padded geometry
//!  ├─ 4. Image     PNG encode → upload with retry → mask geometry
//!  └─ 5. Assemble  ordered document + side indices + diagnostics + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use psd2doc::{extract, ExtractionConfig, node::value::ValueNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let json = std::fs::read_to_string("layer-tree.json")?;
//!     let root = ValueNode::from_json(&json)?;
//!     // Default config: inline data-URI assets, pass-through style resolver
//!     let output = extract(&root, &ExtractionConfig::default()).await?;
//!     println!("{} layers", output.document.len());
//!     for w in &output.warnings {
//!         eprintln!("warning: {w}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `psd2doc` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! psd2doc = { version = "0.3", default-features = false }
//! ```
//!
//! ## Failure model
//!
//! Once extraction starts, nothing is fatal: skips and failures are
//! collected into [`ExtractionOutput`] (`warnings` / `failures`) and the
//! run always completes with whatever layers survived. Partial results
//! beat total failure when extracting from complex design files.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod id;
pub mod node;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;
pub mod stream;
pub mod style;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{LayerError, PsdExtractError};
pub use extract::{extract, extract_sync};
pub use node::{
    LayerRecord, MaskRecord, NodeHandle, PixelEncodeError, PixelSource, PsdNode, TypeToolRecord,
};
pub use output::{
    DocumentLayer, ExtractedLayer, ExtractionOutput, ExtractionStats, LayerContent, LayerWarning,
    PsdDocument,
};
pub use pipeline::classify::LayerKind;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use storage::{AssetStore, DataUriStore, FsAssetStore, HttpAssetStore, StorageError};
pub use stream::{extract_stream, LayerStream};
pub use style::{RecordStyleResolver, StyleResolver, TextLayerStyle};
