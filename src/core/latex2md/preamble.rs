//! Preamble handling: metadata capture, definitions, body extraction and
//! declaration stripping.

use fxhash::FxHashMap;
use lazy_static::lazy_static;
use regex::Regex;

use super::context::Metadata;
use super::utils::{
    collapse_whitespace, find_command, read_braced, read_bracketed, replace_command, skip_ws,
};
use crate::data::colors::ColorTable;

lazy_static! {
    static ref AND_RE: Regex = Regex::new(r"\\and\b").unwrap();
    static ref NEWTHEOREM_RE: Regex = Regex::new(
        r"\\newtheorem\*?\s*\{([^}]*)\}\s*(?:\[[^\]]*\])?\s*\{([^}]*)\}(?:\s*\[[^\]]*\])?"
    )
    .unwrap();
    static ref BARE_LENGTH_RE: Regex =
        Regex::new(r"\\(?:setlength|addtolength)\s*\\[a-zA-Z@]+\s*\{[^}]*\}").unwrap();
}

/// Commands that only configure the typesetter: (name, max optional, required).
const DECLARATIONS: &[(&str, usize, usize)] = &[
    ("documentclass", 1, 1),
    ("usepackage", 1, 1),
    ("RequirePackage", 1, 1),
    ("input", 0, 1),
    ("include", 0, 1),
    ("includeonly", 0, 1),
    ("bibliographystyle", 0, 1),
    ("bibliography", 0, 1),
    ("addbibresource", 1, 1),
    ("nocite", 0, 1),
    ("pagestyle", 0, 1),
    ("thispagestyle", 0, 1),
    ("fancyhead", 1, 1),
    ("fancyfoot", 1, 1),
    ("fancyhf", 1, 1),
    ("lhead", 1, 1),
    ("chead", 1, 1),
    ("rhead", 1, 1),
    ("lfoot", 1, 1),
    ("cfoot", 1, 1),
    ("rfoot", 1, 1),
    ("setlength", 0, 2),
    ("addtolength", 0, 2),
    ("setcounter", 0, 2),
    ("addtocounter", 0, 2),
    ("geometry", 0, 1),
    ("hypersetup", 0, 1),
    ("graphicspath", 0, 1),
    ("linespread", 0, 1),
    ("DeclareMathOperator", 0, 2),
    ("theoremstyle", 0, 1),
    ("numberwithin", 1, 2),
    ("tableofcontents", 0, 0),
    ("listoffigures", 0, 0),
    ("listoftables", 0, 0),
    ("makeatletter", 0, 0),
    ("makeatother", 0, 0),
    ("frontmatter", 0, 0),
    ("mainmatter", 0, 0),
    ("backmatter", 0, 0),
    ("appendix", 0, 0),
    ("printbibliography", 1, 0),
    ("onehalfspacing", 0, 0),
    ("doublespacing", 0, 0),
    ("singlespacing", 0, 0),
    ("raggedright", 0, 0),
    ("raggedleft", 0, 0),
];

// =============================================================================
// Metadata
// =============================================================================

/// Normalize a title-block argument: drop `\thanks`, turn `\\` into spaces.
fn clean_metadata_text(raw: &str) -> String {
    let text = replace_command(raw, "thanks", 0, 1, |_| Some(String::new()));
    collapse_whitespace(&text.replace("\\\\", " "))
}

/// Capture `\title`, `\author` and `\date` and remove them from the buffer.
pub fn capture_metadata(input: &str, metadata: &mut Metadata) -> String {
    let out = replace_command(input, "title", 1, 1, |args| {
        let title = clean_metadata_text(args.req(0));
        metadata.title = Some(title).filter(|t| !t.is_empty());
        Some(String::new())
    });

    let out = replace_command(&out, "author", 1, 1, |args| {
        let authors: Vec<String> = AND_RE
            .split(args.req(0))
            .map(clean_metadata_text)
            .filter(|a| !a.is_empty())
            .collect();
        metadata.author = Some(authors.join(" & ")).filter(|a| !a.is_empty());
        Some(String::new())
    });

    replace_command(&out, "date", 0, 1, |args| {
        let date = clean_metadata_text(args.req(0));
        // \today would make the output depend on the clock
        metadata.date = Some(date).filter(|d| !d.is_empty() && d != "\\today");
        Some(String::new())
    })
}

/// Capture `\definecolor` / `\colorlet` into the color table.
pub fn capture_color_definitions(input: &str, colors: &mut ColorTable) -> String {
    let out = replace_command(input, "definecolor", 0, 3, |args| {
        colors.define(args.req(0), args.req(1), args.req(2));
        Some(String::new())
    });
    replace_command(&out, "colorlet", 0, 2, |args| {
        colors.alias(args.req(0), args.req(1));
        Some(String::new())
    })
}

/// Capture `\newtheorem{name}[counter]{Label}[within]`.
pub fn capture_theorem_definitions(
    input: &str,
    custom: &mut FxHashMap<String, String>,
) -> String {
    NEWTHEOREM_RE
        .replace_all(input, |caps: &regex::Captures| {
            custom.insert(caps[1].trim().to_string(), caps[2].trim().to_string());
            String::new()
        })
        .into_owned()
}

/// Keep only the text between `\begin{document}` and `\end{document}`.
pub fn extract_document_body(input: &str) -> String {
    const BEGIN: &str = "\\begin{document}";
    const END: &str = "\\end{document}";
    let start = input.find(BEGIN).map(|pos| pos + BEGIN.len());
    let body_start = start.unwrap_or(0);
    let body_end = input[body_start..]
        .find(END)
        .map(|pos| body_start + pos)
        .unwrap_or(input.len());
    input[body_start..body_end].to_string()
}

// =============================================================================
// Declarations
// =============================================================================

/// Shapes of definition commands whose arguments don't fit `[opt]{req}`.
#[derive(Debug, Clone, Copy)]
enum DefinitionShape {
    /// `\newcommand*{\name}[n][default]{body}` (name may be unbraced)
    Command,
    /// `\newenvironment{name}[n][default]{begin}{end}`
    Environment,
    /// `\def\name#1#2{body}`
    Def,
}

/// End offset of a definition starting right after its command name.
fn definition_end(input: &str, mut i: usize, shape: DefinitionShape) -> Option<usize> {
    if input[i..].starts_with('*') {
        i += 1;
    }
    i = skip_ws(input, i);
    // the defined name
    if input[i..].starts_with('{') {
        i = read_braced(input, i)?.1;
    } else if input[i..].starts_with('\\') {
        let name = &input[i + 1..];
        let len = match name
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic() || *b == b'@')
            .count()
        {
            // control symbol: one character, which may be multi-byte
            0 => name.chars().next().map_or(0, char::len_utf8),
            n => n,
        };
        i += 1 + len;
    } else {
        return None;
    }

    match shape {
        DefinitionShape::Def => {
            // parameter text runs up to the body brace
            let rel = input[i..].find('{')?;
            if rel > 32 || input[i..i + rel].contains('\n') {
                return None;
            }
            read_braced(input, i + rel).map(|(_, end)| end)
        }
        DefinitionShape::Command | DefinitionShape::Environment => {
            for _ in 0..2 {
                let j = skip_ws(input, i);
                match read_bracketed(input, j) {
                    Some((_, end)) => i = end,
                    None => break,
                }
            }
            let bodies = if matches!(shape, DefinitionShape::Environment) { 2 } else { 1 };
            for _ in 0..bodies {
                let j = skip_ws(input, i);
                i = read_braced(input, j)?.1;
            }
            Some(i)
        }
    }
}

fn strip_definitions(input: &str, name: &str, shape: DefinitionShape) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    while let Some(pos) = find_command(input, name, cursor) {
        let after_name = pos + 1 + name.len();
        out.push_str(&input[cursor..pos]);
        match definition_end(input, after_name, shape) {
            Some(end) => cursor = end,
            None => {
                out.push_str(&input[pos..after_name]);
                cursor = after_name;
            }
        }
    }
    out.push_str(&input[cursor..]);
    out
}

/// Delete commands that only configure the typesetting engine.
pub fn strip_declarations(input: &str) -> String {
    let mut out = input.to_string();
    for name in ["newcommand", "renewcommand", "providecommand"] {
        out = strip_definitions(&out, name, DefinitionShape::Command);
    }
    for name in ["newenvironment", "renewenvironment"] {
        out = strip_definitions(&out, name, DefinitionShape::Environment);
    }
    out = strip_definitions(&out, "def", DefinitionShape::Def);
    out = BARE_LENGTH_RE.replace_all(&out, "").into_owned();
    for (name, max_optional, required) in DECLARATIONS {
        out = replace_command(&out, name, *max_optional, *required, |_| Some(String::new()));
    }
    out
}

/// Expand `\maketitle` from the captured metadata. Preview mode drops it.
pub fn expand_maketitle(input: &str, metadata: &Metadata, preview: bool) -> String {
    replace_command(input, "maketitle", 0, 0, |_| {
        if preview {
            return Some(String::new());
        }
        let mut block = String::from("\n\n");
        if let Some(ref title) = metadata.title {
            block.push_str(&format!("# {}\n\n", title));
        }
        if let Some(ref author) = metadata.author {
            block.push_str(&format!("**{}**\n\n", author));
        }
        if let Some(ref date) = metadata.date {
            block.push_str(&format!("*{}*\n\n", date));
        }
        Some(block)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_metadata() {
        let mut metadata = Metadata::default();
        let out = capture_metadata(
            r"\title{Notes\\on Rings\thanks{Draft}}\author{Ana \and Luis}\date{2024}body",
            &mut metadata,
        );
        assert_eq!(out, "body");
        assert_eq!(metadata.title.as_deref(), Some("Notes on Rings"));
        assert_eq!(metadata.author.as_deref(), Some("Ana & Luis"));
        assert_eq!(metadata.date.as_deref(), Some("2024"));
    }

    #[test]
    fn test_today_is_not_captured() {
        let mut metadata = Metadata::default();
        capture_metadata(r"\date{\today}", &mut metadata);
        assert_eq!(metadata.date, None);
    }

    #[test]
    fn test_capture_theorem_definitions() {
        let mut custom = FxHashMap::default();
        let out = capture_theorem_definitions(
            r"\newtheorem{teo}{Teorema}[section]\newtheorem{lem2}[teo]{Lema}x",
            &mut custom,
        );
        assert_eq!(out, "x");
        assert_eq!(custom.get("teo").map(String::as_str), Some("Teorema"));
        assert_eq!(custom.get("lem2").map(String::as_str), Some("Lema"));
    }

    #[test]
    fn test_extract_document_body() {
        let src = r"\documentclass{article}\begin{document}Hi\end{document}trailing";
        assert_eq!(extract_document_body(src), "Hi");
        assert_eq!(extract_document_body("no markers"), "no markers");
        assert_eq!(extract_document_body(r"\begin{document}open"), "open");
    }

    #[test]
    fn test_strip_declarations() {
        let src = r"\usepackage[utf8]{inputenc}\newcommand{\R}[1]{\mathbb{R}^{#1}}\renewcommand\vec{\mathbf}\def\foo#1{x#1}\newenvironment{box}{\begin{center}}{\end{center}}\setlength{\parindent}{0pt}\setlength\parskip{1em}\tableofcontents Text";
        assert_eq!(strip_declarations(src).trim(), "Text");
    }

    #[test]
    fn test_strip_declarations_multibyte_control_symbol() {
        assert_eq!(strip_declarations(r"\def\é{x} hola").trim(), "hola");
        assert_eq!(strip_declarations(r"\newcommand\ß{y}Straße").trim(), "Straße");
    }

    #[test]
    fn test_strip_declarations_keeps_longer_names() {
        let out = strip_declarations(r"\includegraphics{a.png} \inputenc");
        assert_eq!(out, r"\includegraphics{a.png} \inputenc");
    }

    #[test]
    fn test_expand_maketitle() {
        let metadata = Metadata {
            title: Some("T".into()),
            author: None,
            date: Some("D".into()),
        };
        assert_eq!(expand_maketitle(r"\maketitle", &metadata, false), "\n\n# T\n\n*D*\n\n");
        assert_eq!(expand_maketitle(r"\maketitle", &metadata, true), "");
    }
}
