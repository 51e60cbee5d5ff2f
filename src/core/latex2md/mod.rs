//! LaTeX to Markdown transpiler
//!
//! This module implements the substitution-pass converter from a practical LaTeX subset
//! to Markdown with inline HTML and `$`/`$$` math spans. Finished fragments (math, code,
//! tables, links) are protected behind placeholders while the generic passes run, then
//! restored at the end.

pub mod blocks;
pub mod context;
mod environment;
pub mod labels;
mod markup;
mod math;
mod preamble;
mod protect;
mod table;
pub mod utils;

use indexmap::IndexMap;
use serde::Serialize;

pub use blocks::{Block, BlockStore};
pub use context::{LatexTranspiler, Metadata, TranspileContext, TranspileOptions};
pub use labels::{CitationMap, LabelKind, LabelMap};

// =============================================================================
// Warning System
// =============================================================================

/// Kind of warning generated during conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// `\ref`-family command whose key has no `\label`
    UnresolvedReference,
    /// `\cite`-family key with no `\bibitem`
    UnresolvedCitation,
    /// A label or bibitem key declared twice; the later one wins
    DuplicateLabel,
    /// An environment with no conversion rule; its markers were dropped
    UnknownEnvironment,
    /// Bare `\color{..}` switch, emitted as an unclosed span
    UnclosedColorSwitch,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningKind::UnresolvedReference => write!(f, "unresolved reference"),
            WarningKind::UnresolvedCitation => write!(f, "unresolved citation"),
            WarningKind::DuplicateLabel => write!(f, "duplicate label"),
            WarningKind::UnknownEnvironment => write!(f, "unknown environment"),
            WarningKind::UnclosedColorSwitch => write!(f, "unclosed color switch"),
        }
    }
}

/// A warning generated during conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionWarning {
    pub kind: WarningKind,
    /// Human-readable message
    pub message: String,
    /// Location context (e.g., the label key or environment name)
    pub location: Option<String>,
}

impl ConversionWarning {
    /// Create a new warning
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        ConversionWarning {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Add location context to the warning
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn unresolved_reference(key: &str) -> Self {
        ConversionWarning::new(
            WarningKind::UnresolvedReference,
            format!("No \\label for reference '{}'", key),
        )
        .with_location(key)
    }

    pub fn unresolved_citation(key: &str) -> Self {
        ConversionWarning::new(
            WarningKind::UnresolvedCitation,
            format!("No \\bibitem for citation '{}'", key),
        )
        .with_location(key)
    }

    pub fn duplicate_label(key: &str) -> Self {
        ConversionWarning::new(
            WarningKind::DuplicateLabel,
            format!("Key '{}' declared more than once; using the later one", key),
        )
        .with_location(key)
    }

    pub fn unknown_environment(name: &str) -> Self {
        ConversionWarning::new(
            WarningKind::UnknownEnvironment,
            format!("Environment '{}' has no conversion; markers dropped", name),
        )
        .with_location(name)
    }

    pub fn unclosed_color_switch(color: &str) -> Self {
        ConversionWarning::new(
            WarningKind::UnclosedColorSwitch,
            format!("Bare \\color{{{}}} opens a span that is never closed", color),
        )
        .with_location(color)
    }
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref loc) = self.location {
            write!(f, "[{}] {}: {}", self.kind, loc, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}

impl From<ConversionWarning> for crate::utils::error::CliDiagnostic {
    fn from(warning: ConversionWarning) -> Self {
        use crate::utils::error::{CliDiagnostic, DiagnosticSeverity};

        let severity = match warning.kind {
            WarningKind::UnresolvedReference
            | WarningKind::UnresolvedCitation
            | WarningKind::DuplicateLabel => DiagnosticSeverity::Warning,
            WarningKind::UnknownEnvironment | WarningKind::UnclosedColorSwitch => {
                DiagnosticSeverity::Info
            }
        };

        let mut diag = CliDiagnostic::new(severity, warning.kind.to_string(), warning.message);
        if let Some(loc) = warning.location {
            diag = diag.with_location(loc);
        }
        diag
    }
}

/// Result of conversion with diagnostics
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranspileResult {
    /// The converted output
    pub output: String,
    /// Warnings generated during conversion
    pub warnings: Vec<ConversionWarning>,
    /// Title/author/date captured from the preamble
    pub metadata: Metadata,
    /// Resolved label values, in declaration order
    pub labels: IndexMap<String, String>,
    /// Citation numbers, in bibliography order
    pub citations: IndexMap<String, usize>,
}

impl TranspileResult {
    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Get warnings as formatted strings
    pub fn format_warnings(&self) -> Vec<String> {
        self.warnings.iter().map(|w| w.to_string()).collect()
    }
}

/// Convert a LaTeX document (or fragment) to Markdown.
///
/// # Example
///
/// ```
/// use texmark::transpile;
///
/// let output = transpile(r"\section{Intro}\label{s1}See \ref{s1}.", false);
/// assert!(output.contains("# Intro"));
/// assert!(output.contains("See 1."));
/// ```
pub fn transpile(source: &str, preview: bool) -> String {
    let options = TranspileOptions {
        preview,
        ..Default::default()
    };
    transpile_with_options(source, &options)
}

/// Convert with explicit options.
pub fn transpile_with_options(source: &str, options: &TranspileOptions) -> String {
    let mut transpiler = LatexTranspiler::with_options(options.clone());
    transpiler.convert_document(source)
}

/// Convert with full diagnostics
///
/// Returns the output together with warnings, captured metadata and the resolved
/// label and citation tables.
///
/// # Example
///
/// ```
/// use texmark::{transpile_with_diagnostics, TranspileOptions};
///
/// let result = transpile_with_diagnostics(r"See \ref{missing}.", &TranspileOptions::default());
/// assert!(result.output.contains("??"));
/// for warning in &result.warnings {
///     eprintln!("Warning: {}", warning);
/// }
/// ```
pub fn transpile_with_diagnostics(source: &str, options: &TranspileOptions) -> TranspileResult {
    let mut transpiler = LatexTranspiler::with_options(options.clone());
    transpiler.convert_document_with_diagnostics(source)
}
