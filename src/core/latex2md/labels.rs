//! Label and citation numbering
//!
//! Two passes: `scan` numbers every `\label` and `\bibitem` before the body is
//! touched, `substitute_references` rewrites `\ref`/`\cite`-family commands once the
//! math spans are protected.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

use super::context::TranspileContext;
use super::utils::{replace_command, CommandArgs};
use super::ConversionWarning;
use crate::data::constants::{
    LABEL_LOOKBACK_CHARS, PAGE_UNRESOLVED, UNRESOLVED_CITATION, UNRESOLVED_REFERENCE,
};

lazy_static! {
    static ref LABEL_RE: Regex = Regex::new(r"\\label\s*\{([^}]*)\}").unwrap();
    static ref BIBITEM_RE: Regex =
        Regex::new(r"\\bibitem\s*(?:\[[^\]]*\])?\s*\{([^}]*)\}").unwrap();
    static ref HEADING_RE: Regex = Regex::new(
        r"\\(?:part|chapter|section|subsection|subsubsection|paragraph|subparagraph)\*?\s*[\[{]"
    )
    .unwrap();
}

const CITATION_COMMANDS: &[&str] = &[
    "cite",
    "citep",
    "citet",
    "citealp",
    "parencite",
    "textcite",
    "autocite",
];

const REFERENCE_COMMANDS: &[&str] = &["ref", "autoref", "cref", "Cref"];

/// Numbering class of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Follows a heading command; stored bare (`"2"`)
    Section,
    /// Anything else; stored in parentheses (`"(2)"`)
    Equation,
}

/// Label key -> resolved display string.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    entries: IndexMap<String, String>,
    sections: usize,
    equations: usize,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next number of `kind` to `key`. Returns true if the key was
    /// already declared (the new value replaces it).
    pub fn declare(&mut self, key: &str, kind: LabelKind) -> bool {
        let value = match kind {
            LabelKind::Section => {
                self.sections += 1;
                self.sections.to_string()
            }
            LabelKind::Equation => {
                self.equations += 1;
                format!("({})", self.equations)
            }
        };
        self.entries.insert(key.to_string(), value).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_index_map(&self) -> IndexMap<String, String> {
        self.entries.clone()
    }
}

/// Bibitem key -> 1-based citation number.
#[derive(Debug, Clone, Default)]
pub struct CitationMap {
    entries: IndexMap<String, usize>,
    next: usize,
}

impl CitationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the key was already declared.
    pub fn declare(&mut self, key: &str) -> bool {
        self.next += 1;
        self.entries.insert(key.to_string(), self.next).is_some()
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_index_map(&self) -> IndexMap<String, usize> {
        self.entries.clone()
    }
}

/// Classify a label by the text right before it.
pub fn classify_label(prefix: &str) -> LabelKind {
    let window_start = prefix
        .char_indices()
        .rev()
        .nth(LABEL_LOOKBACK_CHARS - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    if HEADING_RE.is_match(&prefix[window_start..]) {
        LabelKind::Section
    } else {
        LabelKind::Equation
    }
}

/// Output of the numbering pre-scan.
#[derive(Debug, Default)]
pub struct PreScan {
    pub labels: LabelMap,
    pub citations: CitationMap,
    pub warnings: Vec<ConversionWarning>,
}

/// Number every label and bibitem in source order.
pub fn scan(input: &str) -> PreScan {
    let mut result = PreScan::default();

    for caps in LABEL_RE.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        let key = caps[1].trim();
        let kind = classify_label(&input[..whole.start()]);
        if result.labels.declare(key, kind) {
            result.warnings.push(ConversionWarning::duplicate_label(key));
        }
    }

    for caps in BIBITEM_RE.captures_iter(input) {
        let key = caps[1].trim();
        if result.citations.declare(key) {
            result.warnings.push(ConversionWarning::duplicate_label(key));
        }
    }

    result
}

// =============================================================================
// Reference Substitution
// =============================================================================

fn resolve_reference(key: &str, labels: &LabelMap, warnings: &mut Vec<ConversionWarning>) -> String {
    match labels.get(key) {
        Some(value) => value.to_string(),
        None => {
            trace!("unresolved reference '{}'", key);
            warnings.push(ConversionWarning::unresolved_reference(key));
            UNRESOLVED_REFERENCE.to_string()
        }
    }
}

fn split_keys(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|k| !k.is_empty())
}

fn format_citation(
    args: &CommandArgs,
    citations: &CitationMap,
    warnings: &mut Vec<ConversionWarning>,
) -> String {
    let numbers: Vec<String> = split_keys(args.req(0))
        .map(|key| match citations.get(key) {
            Some(n) => n.to_string(),
            None => {
                trace!("unresolved citation '{}'", key);
                warnings.push(ConversionWarning::unresolved_citation(key));
                UNRESOLVED_CITATION.to_string()
            }
        })
        .collect();
    let mut body = numbers.join(", ");

    // one optional argument is a postnote, two are prenote + postnote
    let (prenote, postnote) = match (args.opt(0), args.opt(1)) {
        (Some(pre), Some(post)) => (Some(pre), Some(post)),
        (Some(post), None) => (None, Some(post)),
        _ => (None, None),
    };
    if let Some(pre) = prenote.map(str::trim).filter(|s| !s.is_empty()) {
        body = format!("{} {}", pre, body);
    }
    if let Some(post) = postnote.map(str::trim).filter(|s| !s.is_empty()) {
        body = format!("{}, {}", body, post);
    }
    format!("[{}]", body)
}

/// Rewrite citations and references, then drop every `\label`.
pub fn substitute_references(input: &str, ctx: &mut TranspileContext) -> String {
    resolve_references(input, &ctx.labels, &ctx.citations, &mut ctx.warnings)
}

/// Reference substitution against explicit maps, for fragments rendered before the
/// main pass reaches them.
pub fn resolve_references(
    input: &str,
    labels: &LabelMap,
    citations: &CitationMap,
    warnings: &mut Vec<ConversionWarning>,
) -> String {
    let mut out = input.to_string();

    for name in CITATION_COMMANDS {
        out = replace_command(&out, name, 2, 1, |args| {
            Some(format_citation(args, citations, warnings))
        });
    }

    for name in REFERENCE_COMMANDS {
        out = replace_command(&out, name, 0, 1, |args| {
            let values: Vec<String> = split_keys(args.req(0))
                .map(|key| resolve_reference(key, labels, warnings))
                .collect();
            Some(values.join(", "))
        });
    }

    out = replace_command(&out, "eqref", 0, 1, |args| {
        let value = resolve_reference(args.req(0).trim(), labels, warnings);
        if value.starts_with('(') {
            Some(value)
        } else {
            Some(format!("({})", value))
        }
    });

    out = replace_command(&out, "pageref", 0, 1, |_| Some(PAGE_UNRESOLVED.to_string()));

    LABEL_RE.replace_all(&out, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::latex2md::WarningKind;

    #[test]
    fn test_section_and_equation_numbering() {
        let scan = scan(
            r"\section{Intro}\label{s1}
Some long text that pushes the next label well past the heading window, really.
\begin{equation}x\label{e1}\end{equation}
\subsection*{More}
\label{s2}",
        );
        assert_eq!(scan.labels.get("s1"), Some("1"));
        assert_eq!(scan.labels.get("e1"), Some("(1)"));
        assert_eq!(scan.labels.get("s2"), Some("2"));
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn test_lookback_window_is_bounded() {
        let filler = "x".repeat(LABEL_LOOKBACK_CHARS);
        let src = format!(r"\section{{A}}{}\label{{far}}", filler);
        assert_eq!(scan(&src).labels.get("far"), Some("(1)"));
    }

    #[test]
    fn test_duplicate_label_takes_later_value() {
        let scan = scan(r"$a\label{k}$ $b\label{k}$");
        assert_eq!(scan.labels.get("k"), Some("(2)"));
        assert_eq!(scan.warnings.len(), 1);
        assert_eq!(scan.warnings[0].kind, WarningKind::DuplicateLabel);
    }

    #[test]
    fn test_bibitem_order() {
        let scan = scan(r"\bibitem{a} A \bibitem[Lbl]{b} B \bibitem{c} C");
        assert_eq!(scan.citations.get("a"), Some(1));
        assert_eq!(scan.citations.get("b"), Some(2));
        assert_eq!(scan.citations.get("c"), Some(3));
    }

    #[test]
    fn test_resolve_references() {
        let mut labels = LabelMap::new();
        labels.declare("sec:a", LabelKind::Section);
        let mut citations = CitationMap::new();
        citations.declare("knuth");
        let mut warnings = Vec::new();
        let out = resolve_references(
            r"See \ref{sec:a} on \pageref{sec:a} and \cite{knuth}.\label{x}",
            &labels,
            &citations,
            &mut warnings,
        );
        assert_eq!(out, "See 1 on [p. ?] and [1].");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_citation_notes() {
        let mut citations = CitationMap::new();
        citations.declare("a");
        let mut warnings = Vec::new();
        let args = CommandArgs {
            star: false,
            optional: vec!["see".into(), "p. 5".into()],
            required: vec!["a".into()],
        };
        assert_eq!(format_citation(&args, &citations, &mut warnings), "[see 1, p. 5]");

        let args = CommandArgs {
            star: false,
            optional: vec!["p. 5".into()],
            required: vec!["a, zz".into()],
        };
        assert_eq!(format_citation(&args, &citations, &mut warnings), "[1, ?, p. 5]");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::UnresolvedCitation);
    }
}
