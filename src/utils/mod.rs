//! Utility modules
//!
//! Error types, result types and CLI diagnostics.

pub mod error;

// Re-export commonly used items
pub use error::{CliDiagnostic, ConversionError, ConversionResult, DiagnosticSeverity};
