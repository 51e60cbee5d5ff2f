//! Core state and the phase pipeline for LaTeX to Markdown conversion
//!
//! This module contains the options, the per-call context and the transpiler that runs
//! the phases in their fixed order.

use fxhash::FxHashMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::blocks::BlockStore;
use super::labels::{self, CitationMap, LabelMap};
use super::utils::{
    finalize_whitespace, neutralize_placeholders, normalize_whitespace, strip_comments,
    strip_line_indentation,
};
use super::{environment, markup, math, preamble, protect, table};
use super::{ConversionWarning, TranspileResult};
use crate::data::colors::ColorTable;
use crate::data::constants::{DEFAULT_ENVIRONMENT_PREVIEW_CHARS, DEFAULT_VERBATIM_PREVIEW_CHARS};
use crate::utils::error::{ConversionError, ConversionResult};

// =============================================================================
// Transpile Options
// =============================================================================

/// Options for LaTeX to Markdown conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranspileOptions {
    /// Emit short one-line forms for list and summary views
    /// Default: false
    pub preview: bool,

    /// Character budget for verbatim blocks in preview mode
    /// Default: 80
    pub verbatim_preview_chars: usize,

    /// Character budget for academic environment excerpts in preview mode
    /// Default: 120
    pub environment_preview_chars: usize,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            preview: false,
            verbatim_preview_chars: DEFAULT_VERBATIM_PREVIEW_CHARS,
            environment_preview_chars: DEFAULT_ENVIRONMENT_PREVIEW_CHARS,
        }
    }
}

impl TranspileOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for the short preview form
    pub fn preview() -> Self {
        Self {
            preview: true,
            ..Self::default()
        }
    }

    /// Load options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> ConversionResult<Self> {
        let options: TranspileOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject budgets that would produce nothing but an ellipsis.
    pub fn validate(&self) -> ConversionResult<()> {
        if self.verbatim_preview_chars == 0 {
            return Err(ConversionError::invalid_options(
                "verbatim_preview_chars must be greater than zero",
            ));
        }
        if self.environment_preview_chars == 0 {
            return Err(ConversionError::invalid_options(
                "environment_preview_chars must be greater than zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Conversion State
// =============================================================================

/// Title block captured from the preamble
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.date.is_none()
    }
}

/// Everything one conversion call reads and writes. Created per call, dropped at the end.
#[derive(Debug, Default)]
pub struct TranspileContext {
    pub options: TranspileOptions,
    pub colors: ColorTable,
    pub labels: LabelMap,
    pub citations: CitationMap,
    pub metadata: Metadata,
    pub blocks: BlockStore,
    /// `\newtheorem` environments: name -> display label
    pub custom_environments: FxHashMap<String, String>,
    pub warnings: Vec<ConversionWarning>,
}

impl TranspileContext {
    pub fn new(options: TranspileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn is_preview(&self) -> bool {
        self.options.preview
    }

    /// Record a non-fatal warning
    pub fn warn(&mut self, warning: ConversionWarning) {
        trace!("{}", warning);
        self.warnings.push(warning);
    }
}

// =============================================================================
// Transpiler
// =============================================================================

/// LaTeX to Markdown transpiler
#[derive(Debug, Clone, Default)]
pub struct LatexTranspiler {
    options: TranspileOptions,
}

impl LatexTranspiler {
    /// Create a new transpiler with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new transpiler with custom options
    pub fn with_options(options: TranspileOptions) -> Self {
        Self { options }
    }

    /// Get a reference to the current options
    pub fn options(&self) -> &TranspileOptions {
        &self.options
    }

    /// Get a mutable reference to the current options
    pub fn options_mut(&mut self) -> &mut TranspileOptions {
        &mut self.options
    }

    /// Convert a complete LaTeX document (or fragment) to Markdown
    pub fn convert_document(&mut self, input: &str) -> String {
        self.convert_document_with_diagnostics(input).output
    }

    /// Convert and keep the warnings, metadata and numbering tables
    pub fn convert_document_with_diagnostics(&mut self, input: &str) -> TranspileResult {
        let mut ctx = TranspileContext::new(self.options.clone());
        let output = run_pipeline(input, &mut ctx);
        TranspileResult {
            output,
            labels: ctx.labels.to_index_map(),
            citations: ctx.citations.to_index_map(),
            metadata: ctx.metadata,
            warnings: ctx.warnings,
        }
    }
}

fn log_phase(phase: &str, buffer: &str, ctx: &TranspileContext) {
    debug!(
        "phase {}: {} bytes, {} blocks, {} warnings",
        phase,
        buffer.len(),
        ctx.blocks.len(),
        ctx.warnings.len()
    );
}

/// Run every phase in order. The order is load-bearing: verbatim before the preamble
/// passes, metadata before preamble stripping, numbering before protection,
/// protection before reference substitution and before any symbol rewriting,
/// restoration last.
fn run_pipeline(input: &str, ctx: &mut TranspileContext) -> String {
    if input.trim().is_empty() {
        return String::new();
    }

    let mut buffer = strip_comments(input);
    buffer = neutralize_placeholders(&buffer);
    log_phase("comments", &buffer, ctx);

    buffer = protect::protect_verbatim(&buffer, ctx);
    log_phase("verbatim", &buffer, ctx);

    buffer = run_preamble(&buffer, ctx);
    log_phase("preamble", &buffer, ctx);

    let prescan = labels::scan(&buffer);
    ctx.labels = prescan.labels;
    ctx.citations = prescan.citations;
    for warning in prescan.warnings {
        ctx.warn(warning);
    }
    debug!(
        "prescan: {} labels, {} citations",
        ctx.labels.len(),
        ctx.citations.len()
    );

    buffer = run_protection(&buffer, ctx);
    log_phase("protection", &buffer, ctx);

    buffer = labels::substitute_references(&buffer, ctx);
    log_phase("references", &buffer, ctx);

    buffer = run_structure(&buffer, ctx);
    log_phase("structure", &buffer, ctx);

    buffer = markup::normalize_symbols(&buffer);
    buffer = normalize_whitespace(&buffer);
    log_phase("normalization", &buffer, ctx);

    buffer = ctx.blocks.restore(&buffer);
    finalize_whitespace(&buffer)
}

/// Metadata capture, body extraction, declaration stripping and `\maketitle`.
pub(crate) fn run_preamble(input: &str, ctx: &mut TranspileContext) -> String {
    let buffer = preamble::capture_metadata(input, &mut ctx.metadata);
    let buffer = preamble::capture_color_definitions(&buffer, &mut ctx.colors);
    let buffer = preamble::capture_theorem_definitions(&buffer, &mut ctx.custom_environments);
    let buffer = preamble::extract_document_body(&buffer);
    let buffer = preamble::strip_declarations(&buffer);
    preamble::expand_maketitle(&buffer, &ctx.metadata, ctx.options.preview)
}

/// Move links, tables and math into the block store; verbatim is already there.
pub(crate) fn run_protection(input: &str, ctx: &mut TranspileContext) -> String {
    let buffer = protect::protect_links(input, ctx);
    let buffer = table::protect_tables(&buffer, ctx);
    let buffer = table::protect_arrays(&buffer, ctx);
    math::protect_math(&buffer, ctx)
}

/// Structural and environment transforms, in their fixed order.
pub(crate) fn run_structure(input: &str, ctx: &mut TranspileContext) -> String {
    let buffer = strip_line_indentation(input);
    let buffer = environment::convert_bibliography_items(&buffer, &ctx.citations);
    let buffer = environment::convert_line_environments(&buffer);
    let buffer = environment::convert_lists(&buffer);
    let buffer = environment::convert_floats(&buffer);
    let buffer = markup::convert_captions(&buffer);
    let buffer = environment::convert_boxed_regions(&buffer);
    let buffer = markup::convert_headings(&buffer);
    let buffer = markup::convert_notes_and_links(&buffer);
    let buffer = markup::convert_inline_formatting(&buffer, ctx);
    let buffer = markup::convert_boxes_and_rules(&buffer);
    let buffer = markup::convert_spacing_and_breaks(&buffer);
    let buffer = environment::convert_academic_environments(&buffer, ctx);
    environment::strip_unknown_environments(&buffer, ctx)
}
