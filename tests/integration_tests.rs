//! Integration tests for texmark document conversion

use texmark::{
    transpile, transpile_with_diagnostics, transpile_with_options, LatexTranspiler,
    TranspileOptions, WarningKind,
};

fn warning_kinds(source: &str) -> Vec<WarningKind> {
    transpile_with_diagnostics(source, &TranspileOptions::default())
        .warnings
        .iter()
        .map(|w| w.kind)
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_section_reference() {
        let output = transpile(r"\section{Intro}\label{s1}See \ref{s1}.", false);
        assert!(output.contains("# Intro"));
        assert!(output.contains("See 1."));
    }

    #[test]
    fn test_display_math_exact() {
        assert_eq!(transpile("$$x^2$$", false), "\n$$\nx^2\n$$\n");
        assert_eq!(transpile("$$x^2$$", true), "$x^2$");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(transpile("", false), "");
        assert_eq!(transpile("   \n\n  ", true), "");
        assert_eq!(transpile("% only a comment\n", false), "");
    }

    #[test]
    fn test_full_document() {
        let source = r"\documentclass{article}
\usepackage{amsmath}
\title{My Paper}
\author{Ana \and Luis}
\begin{document}
\maketitle
\section{Start}
Body text with \textbf{bold} and \emph{emphasis}.
\end{document}";
        let result = transpile_with_diagnostics(source, &TranspileOptions::default());

        assert!(!result.output.contains("documentclass"));
        assert!(!result.output.contains("usepackage"));
        assert!(result.output.contains("# My Paper"));
        assert!(result.output.contains("**Ana & Luis**"));
        assert!(result.output.contains("# Start"));
        assert!(result.output.contains("Body text with **bold** and *emphasis*."));
        assert_eq!(result.metadata.title.as_deref(), Some("My Paper"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_lists() {
        let output = transpile(
            "Steps:\n\\begin{enumerate}\n  \\item First\n  \\item Second\n  \\begin{itemize}\n    \\item Nested\n  \\end{itemize}\n\\end{enumerate}\nDone.",
            false,
        );
        assert!(output.contains("Steps:\n\n1. First\n1. Second\n   - Nested\n\nDone."));
    }

    #[test]
    fn test_figure_with_caption_and_image() {
        let output = transpile(
            "\\begin{figure}[h]\n\\centering\n\\includegraphics[width=0.5\\textwidth]{plots/loss.png}\n\\caption{Training loss}\n\\end{figure}",
            false,
        );
        assert!(output.contains("<img src=\"plots/loss.png\""));
        assert!(output.contains("width: 50%;"));
        assert!(output.contains("**Caption:** Training loss"));
        assert!(!output.contains("centering"));
    }

    #[test]
    fn test_links() {
        let output = transpile(
            r"Visit \href{https://example.com/a--b}{our site} or \url{https://x.org/~me}.",
            false,
        );
        assert!(output.contains("[our site](https://example.com/a--b)"));
        assert!(output.contains("[https://x.org/~me](https://x.org/~me)"));
    }

    #[test]
    fn test_table_in_document() {
        let output = transpile(
            "\\begin{table}\n\\begin{tabular}{|l|r|}\n\\hline\nName & $x^2$ \\\\\n\\hline\nA & 1 \\\\\n\\end{tabular}\n\\caption{Values}\n\\end{table}",
            false,
        );
        assert!(output.contains("<table class=\"latex-table\">"));
        assert!(output.contains("<td style=\"text-align: right;\">$x^2$</td>"));
        assert!(output.contains("**Caption:** Values"));
        assert!(transpile("\\begin{tabular}{l} a \\end{tabular}", true).contains("[tabla]"));
    }
}

// ============================================================================
// Numbering
// ============================================================================

mod numbering {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_label_round_trip() {
        let source = r"\section{Intro}\label{sec:intro}
Filler text that is long enough to leave the heading window behind entirely.
\begin{equation}
E = mc^2 \label{eq:energy}
\end{equation}
Section \ref{sec:intro} and equation \eqref{eq:energy}.";
        let result = transpile_with_diagnostics(source, &TranspileOptions::default());

        assert_eq!(result.labels.get("sec:intro").map(String::as_str), Some("1"));
        assert_eq!(result.labels.get("eq:energy").map(String::as_str), Some("(1)"));
        assert!(result.output.contains("Section 1 and equation (1)."));
        assert!(result.output.contains("E = mc^2 \\tag{1}"));
        assert!(!result.output.contains("\\label"));
    }

    #[test]
    fn test_citation_ordering() {
        let source = r"As shown \cite{C,A}.
\begin{thebibliography}{9}
\bibitem{A} Alpha.
\bibitem{B} Beta.
\bibitem{C} Gamma.
\end{thebibliography}";
        let result = transpile_with_diagnostics(source, &TranspileOptions::default());

        assert!(result.output.contains("As shown [3, 1]."));
        assert!(result.output.contains("latex-env-thebibliography"));
        assert!(result.output.contains("[1] Alpha."));
        assert!(result.output.contains("[3] Gamma."));
        assert_eq!(result.citations.get("C"), Some(&3));
    }

    #[test]
    fn test_unresolved_reference_and_citation() {
        let output = transpile(r"See \ref{nope} and \cite{ghost}.", false);
        assert!(output.contains("See ?? and [?]."));
        assert_eq!(
            warning_kinds(r"See \ref{nope} and \cite{ghost}."),
            vec![WarningKind::UnresolvedCitation, WarningKind::UnresolvedReference]
        );
    }

    #[test]
    fn test_references_inside_table_cells() {
        let source = r"\section{Intro}\label{sec:intro}
\begin{tabular}{ll}
See \ref{sec:intro}\label{tab:row} & \cite{A} \\
Page \pageref{sec:intro} & \ref{nope} \\
\end{tabular}
\begin{thebibliography}{9}
\bibitem{A} Alpha.
\end{thebibliography}";
        let result = transpile_with_diagnostics(source, &TranspileOptions::default());

        assert!(result.output.contains("See 1</td>"));
        assert!(result.output.contains("[1]</td>"));
        assert!(result.output.contains("Page [p. ?]</td>"));
        assert!(result.output.contains("??</td>"));
        assert!(!result.output.contains("\\label"));
        assert!(!result.output.contains("\\ref"));
        let kinds: Vec<WarningKind> = result.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::UnresolvedReference]);
    }

    #[test]
    fn test_duplicate_label_warns() {
        let kinds = warning_kinds(r"$a\label{k}$ $b\label{k}$ \ref{k}");
        assert_eq!(kinds, vec![WarningKind::DuplicateLabel]);
    }
}

// ============================================================================
// Pipeline Ordering
// ============================================================================

mod ordering {
    use super::*;

    #[test]
    fn test_metadata_captured_before_preamble_is_stripped() {
        let result = transpile_with_diagnostics(
            "\\documentclass{article}\\title{Kept}\\begin{document}\\maketitle\\end{document}",
            &TranspileOptions::default(),
        );
        assert_eq!(result.metadata.title.as_deref(), Some("Kept"));
        assert!(result.output.contains("# Kept"));
    }

    #[test]
    fn test_verbatim_precedes_preamble_passes() {
        let result = transpile_with_diagnostics(
            "\\begin{verbatim}\n\\usepackage{amsmath}\n\\title{T}\n\\newcommand{\\x}{y}\n\\end{verbatim}\nUse \\verb|\\author{A}| here.",
            &TranspileOptions::default(),
        );
        assert!(result
            .output
            .contains("```\n\\usepackage{amsmath}\n\\title{T}\n\\newcommand{\\x}{y}\n```"));
        assert!(result.output.contains("<code>\\author{A}</code>"));
        assert_eq!(result.metadata.title, None);
        assert_eq!(result.metadata.author, None);
    }

    #[test]
    fn test_prescan_sees_labels_inside_math() {
        let output = transpile(
            r"\begin{equation}x\label{e}\end{equation} See \eqref{e}.",
            false,
        );
        assert!(output.contains("See (1)."));
        assert!(output.contains("x \\tag{1}"));
    }

    #[test]
    fn test_protection_precedes_reference_substitution() {
        let result = transpile_with_diagnostics(
            "\\begin{verbatim}\n\\ref{x} \\cite{y}\n\\end{verbatim}",
            &TranspileOptions::default(),
        );
        assert!(result.output.contains("\\ref{x} \\cite{y}"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_protection_precedes_symbol_substitution() {
        let output = transpile(r"Range $a--b$ versus pages 1--2, \verb|x~--y|.", false);
        assert!(output.contains("$a--b$"));
        assert!(output.contains("1&ndash;2"));
        assert!(output.contains("<code>x~--y</code>"));
    }

    #[test]
    fn test_restoration_is_last() {
        let output = transpile("\\begin{lemma}\nText.\n$$x -- y$$\n\\end{lemma}", false);
        assert!(output.contains("*Text.*"));
        assert!(output.contains("\n$$\nx -- y\n$$\n"));
        assert!(!output.contains("*@@"));
    }
}

// ============================================================================
// Invariants
// ============================================================================

mod invariants {
    use super::*;
    use pretty_assertions::assert_eq;

    const PROSE: &str = r"\section{Intro}
Some \textbf{bold} text -- with dashes and ``quotes''.

\begin{itemize}
\item One
\item Two
\end{itemize}

\begin{theorem}
Every case holds.
\end{theorem}";

    #[test]
    fn test_idempotent_on_plain_prose() {
        let once = transpile(PROSE, false);
        let twice = transpile(&once, false);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_idempotent_with_inline_heading_and_nested_list() {
        let source = "\\section{Intro} Some \\textbf{bold} -- text.\n\\begin{itemize}\n\\item a\n\\begin{itemize}\n\\item b\n\\end{itemize}\n\\end{itemize}";
        let once = transpile(source, false);
        assert!(once.contains("\n\nSome **bold**"));
        assert!(once.contains("  - b"));
        assert_eq!(transpile(&once, false), once);
    }

    #[test]
    fn test_multibyte_definitions_and_spans() {
        assert_eq!(transpile(r"\def\é{x} hola", false).trim(), "hola");
        let table = transpile(
            r"\begin{tabular}{*{3000000000}{c}} \multicolumn{99999999999}{c}{A} \end{tabular}",
            false,
        );
        assert!(table.contains("colspan=\"256\""));
    }

    #[test]
    fn test_no_placeholder_leaks() {
        let source = r"\begin{theorem}[Main]
Let $x$ be \href{https://a.io}{a link}.
\begin{align}
a &= b \label{eq:a}
\end{align}
\end{theorem}
\begin{tabular}{ll}
\verb|code| & $\alpha$ \\
\url{https://b.io} & \begin{tabular}{c} inner \end{tabular}
\end{tabular}
Literal @@BLOCK7@@ text.";
        for preview in [false, true] {
            let output = transpile(source, preview);
            assert!(!output.contains("@@BLOCK"), "leaked placeholder:\n{}", output);
        }
    }

    #[test]
    fn test_calls_do_not_share_state() {
        let mut transpiler = LatexTranspiler::new();
        let first = transpiler.convert_document_with_diagnostics(r"\section{A}\label{a}");
        let second = transpiler.convert_document_with_diagnostics(r"\ref{a}");
        assert_eq!(first.labels.len(), 1);
        assert!(second.output.contains("??"));
    }
}

// ============================================================================
// Academic Environments
// ============================================================================

mod environments {
    use super::*;

    #[test]
    fn test_theorem_wrapping() {
        let output = transpile("\\begin{theorem}\nEvery prime is odd.\n\\end{theorem}", false);
        assert!(output.contains("class=\"latex-env latex-env-theorem\""));
        assert!(output.contains("**Teorema.** *Every prime is odd.*"));
    }

    #[test]
    fn test_newtheorem_environment() {
        let output = transpile(
            "\\newtheorem{claim}{Afirmación}\n\\begin{claim}\nIt holds.\n\\end{claim}",
            false,
        );
        assert!(output.contains("latex-env-claim"));
        assert!(output.contains("**Afirmación.** *It holds.*"));
    }

    #[test]
    fn test_proof_and_preview() {
        let output = transpile("\\begin{proof}\nObvious.\n\\end{proof}", false);
        assert!(output.contains("Obvious. ∎"));

        let options = TranspileOptions {
            environment_preview_chars: 12,
            ..TranspileOptions::preview()
        };
        let output = transpile_with_options(
            "\\begin{definition}\nA group is a set with an operation.\n\\end{definition}",
            &options,
        );
        assert_eq!(output.trim(), "**Definición.** A group is a...");
    }

    #[test]
    fn test_unknown_environment() {
        let result = transpile_with_diagnostics(
            r"\begin{mystery}kept\end{mystery}",
            &TranspileOptions::default(),
        );
        assert!(result.output.contains("kept"));
        assert!(!result.output.contains("mystery"));
        assert_eq!(result.warnings[0].kind, WarningKind::UnknownEnvironment);
    }
}

// ============================================================================
// Preview Mode
// ============================================================================

mod preview {
    use super::*;

    #[test]
    fn test_verbatim_truncation() {
        let body = "word ".repeat(100);
        let source = format!("\\begin{{verbatim}}\n{}\n\\end{{verbatim}}", body);

        let output = transpile(&source, true);
        assert!(output.ends_with("..."));
        assert!(output.chars().count() <= 83);

        let output = transpile(&source, false);
        assert!(output.contains(&format!("```\n{}\n```", body.trim_end())));
    }

    #[test]
    fn test_verbatim_is_unmodified() {
        let output = transpile(
            "\\begin{verbatim}\nx -- y ~ z\n  indented\n\\end{verbatim}",
            false,
        );
        assert!(output.contains("```\nx -- y ~ z\n  indented\n```"));
    }

    #[test]
    fn test_group_math_preview() {
        assert_eq!(
            transpile("\\begin{align}a &= b\\end{align}", true).trim(),
            "[ecuaciones]"
        );
        assert!(transpile(r"\includegraphics{a.png}", true).contains("[imagen]"));
    }
}

// ============================================================================
// Colors and Formatting
// ============================================================================

mod colors {
    use super::*;

    #[test]
    fn test_unclosed_color_switch() {
        let result = transpile_with_diagnostics(
            r"\color{red} Warning text",
            &TranspileOptions::default(),
        );
        assert!(result.output.contains("<span style=\"color: #e53935;\">"));
        assert!(!result.output.contains("</span>"));
        assert_eq!(
            result.warnings.iter().map(|w| w.kind).collect::<Vec<_>>(),
            vec![WarningKind::UnclosedColorSwitch]
        );
    }

    #[test]
    fn test_grouped_color_is_closed() {
        let result = transpile_with_diagnostics(
            r"{\color{red} scoped} after",
            &TranspileOptions::default(),
        );
        assert!(result
            .output
            .contains("<span style=\"color: #e53935;\">scoped</span> after"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_defined_colors() {
        let output = transpile(
            "\\definecolor{brand}{RGB}{255,136,0}\n\\textcolor{brand}{hi} and $\\textcolor{brand}{x}$",
            false,
        );
        assert!(output.contains("<span style=\"color: #ff8800;\">hi</span>"));
        assert!(output.contains("$\\textcolor{#ff8800}{x}$"));
    }

    #[test]
    fn test_accents_and_symbols() {
        let output = transpile(r#"Caf\'e na\"{\i}ve \S 3 50\% Dr.~Who"#, false);
        assert!(output.contains("Café naïve § 3 50\\% Dr. Who"));
    }
}

// ============================================================================
// Options
// ============================================================================

mod options {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let options = TranspileOptions::from_json(r#"{"preview": true, "verbatim_preview_chars": 10}"#)
            .unwrap();
        assert!(options.preview);
        assert_eq!(options.verbatim_preview_chars, 10);
        assert_eq!(options.environment_preview_chars, 120);
    }

    #[test]
    fn test_invalid_options() {
        assert!(TranspileOptions::from_json("{").is_err());
        assert!(TranspileOptions::from_json(r#"{"unknown": 1}"#).is_err());
        assert!(TranspileOptions::from_json(r#"{"environment_preview_chars": 0}"#).is_err());
    }

    #[test]
    fn test_options_changed_between_calls() {
        let source = "\\begin{tabular}{l} a \\end{tabular}";
        let mut transpiler = LatexTranspiler::new();
        assert!(transpiler.convert_document(source).contains("<table"));

        transpiler.options_mut().preview = true;
        assert!(transpiler.options().preview);
        assert!(transpiler.convert_document(source).contains("[tabla]"));
    }
}
