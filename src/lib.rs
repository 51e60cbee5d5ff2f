//! # texmark
//!
//! A transpiler from a practical LaTeX subset to Markdown with inline HTML and
//! `$..$` / `$$..$$` math spans, for pipelines that render Markdown and hand math to a
//! browser-side engine.
//!
//! ## Features
//!
//! - **Protection/restoration**: math, code, tables and links are rendered once and kept
//!   away from the generic text passes behind opaque placeholders
//! - **Numbering**: `\label`/`\ref` and `\bibitem`/`\cite` resolved from a pre-scan
//! - **Academic environments**: theorems, proofs, definitions and `\newtheorem`
//!   environments become styled blocks
//! - **Preview mode**: short one-line forms for list and summary views
//! - **Diagnostics**: non-fatal warnings for unresolved references and unknown input
//!
//! ## Example
//!
//! ```rust
//! use texmark::transpile;
//!
//! let output = transpile(r"\section{Intro}\label{s1}See \ref{s1}.", false);
//! assert!(output.contains("# Intro"));
//! assert!(output.contains("See 1."));
//! ```

pub mod core;
pub mod data;
pub mod utils;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use crate::core::latex2md::{
    transpile, transpile_with_diagnostics, transpile_with_options, ConversionWarning,
    LatexTranspiler, Metadata, TranspileOptions, TranspileResult, WarningKind,
};
pub use crate::utils::error::{ConversionError, ConversionResult};
