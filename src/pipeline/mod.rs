//! Pipeline stages for layer extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! traverse ──▶ classify ──▶ text / image ──▶ assemble
//! (flatten)    (kind)       (extract)        (ordered document)
//! ```
//!
//! 1. [`traverse`] — flatten the tree handle into an ordered node sequence,
//!    via bulk enumeration or the manual-walk fallback
//! 2. [`classify`] — decide Text / Image / Ignorable per node, statelessly
//! 3. [`text`]     — resolve and validate the text style, padded geometry
//! 4. [`image`]    — PNG-encode, upload with retry, resolve mask geometry;
//!    the only stage with network I/O
//!
//! Assembly lives in [`crate::extract`], which owns ordering and failure
//! isolation across stages.

pub mod classify;
pub mod image;
pub mod text;
pub mod traverse;
