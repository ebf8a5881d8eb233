//! Pipeline stages for candidate extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ recognize ──▶ cleanup ──▶ extract
//! (path/bytes) (poppler|pdfium) (tesseract|vision) (text rules) (grammar)
//! ```
//!
//! 1. [`input`]: validate the path, or spill uploaded bytes to a temp file
//! 2. [`render`]: rasterise selected pages on the blocking pool
//! 3. [`recognize`]: page image → text through a [`recognize::TextRecognizer`];
//!    [`llm`] and [`encode`] provide the vision backend
//! 4. [`cleanup`]: deterministic text rules applied to every page
//!
//! Record extraction itself lives in [`crate::extract`].

pub mod cleanup;
pub mod encode;
pub mod input;
pub mod llm;
pub mod recognize;
pub mod render;
