//! Configuration types for layer extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`],
//! built via its [`ExtractionConfigBuilder`]. Keeping every knob in one
//! struct makes it trivial to share configs across runs and to diff two
//! runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A many-field constructor breaks on every new field. The builder lets
//! callers set only what they care about and rely on documented defaults
//! for the rest.

use crate::error::PsdExtractError;
use crate::progress::ProgressCallback;
use crate::storage::AssetStore;
use crate::style::StyleResolver;
use std::fmt;
use std::sync::Arc;

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use psd2doc::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .concurrency(4)
///     .max_retries(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Number of layers processed concurrently. Default: 8.
    ///
    /// Only image layers suspend (at the asset upload), so this effectively
    /// bounds in-flight uploads. `1` forces strictly sequential processing;
    /// either way the document order equals traversal order.
    pub concurrency: usize,

    /// Maximum retry attempts for a failed asset upload. Default: 3.
    ///
    /// Transient store failures (overloaded backend, network blip) are
    /// retried; after the last attempt the layer is skipped and recorded in
    /// the run's failures.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s, so concurrent
    /// uploads do not hammer a recovering store in lockstep.
    pub retry_backoff_ms: u64,

    /// Per-upload-attempt timeout in seconds. Default: 60.
    ///
    /// The store may enforce its own tighter timeout; this one guarantees a
    /// hung store cannot stall the run's completion.
    pub upload_timeout_secs: u64,

    /// Drop text layers whose resolved text is empty. Default: false.
    ///
    /// Off by default: an empty text layer is usually a placeholder the
    /// designer intends to fill per banner size, so it is emitted with a
    /// warning. Turn on to exclude placeholders from the document entirely.
    pub skip_empty_text: bool,

    /// Asset store for externalized image layers. Default:
    /// [`crate::storage::DataUriStore`] (inline data URIs, no I/O).
    pub store: Option<Arc<dyn AssetStore>>,

    /// Text-style resolver. Default: [`crate::style::RecordStyleResolver`]
    /// (passes the parser's decoded fields through).
    pub resolver: Option<Arc<dyn StyleResolver>>,

    /// Per-layer progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            max_retries: 3,
            retry_backoff_ms: 500,
            upload_timeout_secs: 60,
            skip_empty_text: false,
            store: None,
            resolver: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("skip_empty_text", &self.skip_empty_text)
            .field("store", &self.store.as_ref().map(|_| "<dyn AssetStore>"))
            .field("resolver", &self.resolver.as_ref().map(|_| "<dyn StyleResolver>"))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Validate constraints; called by [`crate::extract`] so that configs
    /// assembled without the builder are checked too.
    pub(crate) fn validate(&self) -> Result<(), PsdExtractError> {
        if self.concurrency == 0 {
            return Err(PsdExtractError::InvalidConfig(
                "concurrency must be ≥ 1".into(),
            ));
        }
        if self.upload_timeout_secs == 0 {
            return Err(PsdExtractError::InvalidConfig(
                "upload timeout must be ≥ 1s".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs.max(1);
        self
    }

    pub fn skip_empty_text(mut self, v: bool) -> Self {
        self.config.skip_empty_text = v;
        self
    }

    pub fn store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.config.store = Some(store);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn StyleResolver>) -> Self {
        self.config.resolver = Some(resolver);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PsdExtractError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
