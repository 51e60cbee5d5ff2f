//! Environment transforms: bibliography items, line-oriented bodies, lists, floats,
//! boxed regions and the academic (theorem-like) environments.

use std::borrow::Cow;

use fxhash::FxHashMap;
use lazy_static::lazy_static;
use regex::Regex;

use super::blocks::BlockStore;
use super::context::TranspileContext;
use super::labels::CitationMap;
use super::utils::{
    convert_dimension, find_environment, is_escaped, replace_command, replace_control_word,
    replace_environment, truncate_preview,
};
use super::ConversionWarning;
use crate::data::colors::BUILTIN_PALETTE;
use crate::data::constants::{
    AcademicEnv, ACADEMIC_ENVIRONMENTS, ENVIRONMENT_ALIASES, QED_MARK, UNRESOLVED_CITATION,
};

lazy_static! {
    static ref LINE_BREAK_RE: Regex = Regex::new(r"\\\\\*?(?:[ \t]*\[[^\]\n]*\])?").unwrap();
    static ref TAB_STOP_RE: Regex = Regex::new(r"\\[=<+\-]").unwrap();
    static ref LIST_TOKEN_RE: Regex = Regex::new(
        r"\\begin\{(itemize|enumerate|description)\}(?:[ \t]*\[[^\]\n]*\])?|\\end\{(itemize|enumerate|description)\}|\\item\b(?:[ \t]*\[([^\]\n]*)\])?"
    )
    .unwrap();
    static ref LIST_LINE_RE: Regex = Regex::new(r"^(\s*(?:- \*\*[^*]*\*\* |- |\d+\. ))(.*)$").unwrap();
    static ref ENV_BEGIN_RE: Regex = Regex::new(r"\\begin\{([a-zA-Z]+\*?)\}").unwrap();
    static ref UNKNOWN_BEGIN_RE: Regex =
        Regex::new(r"\\begin\{([^}\n]+)\}(?:[ \t]*\[[^\]\n]*\])?").unwrap();
    static ref UNKNOWN_END_RE: Regex = Regex::new(r"\\end\{([^}\n]+)\}").unwrap();
    static ref HTML_TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Float wrappers whose content is kept: (name, max optional, required).
const FLOAT_ENVIRONMENTS: &[(&str, usize, usize)] = &[
    ("figure", 1, 0),
    ("figure*", 1, 0),
    ("table", 1, 0),
    ("table*", 1, 0),
    ("wrapfigure", 2, 2),
];

const ALIGNED_REGIONS: &[(&str, &str)] = &[
    ("center", "center"),
    ("flushleft", "left"),
    ("flushright", "right"),
];

// =============================================================================
// Bibliography
// =============================================================================

/// `\bibitem[label]{key}` -> `[n] ` paragraph using the pre-scan numbering.
pub fn convert_bibliography_items(input: &str, citations: &CitationMap) -> String {
    let out = replace_command(input, "bibitem", 1, 1, |args| {
        let number = citations
            .get(args.req(0).trim())
            .map(|n| n.to_string())
            .unwrap_or_else(|| UNRESOLVED_CITATION.to_string());
        Some(format!("\n\n[{}] ", number))
    });
    replace_control_word(&out, "newblock", "")
}

// =============================================================================
// Line Environments
// =============================================================================

fn convert_tabbing_body(body: &str) -> String {
    let body: Vec<&str> = body.lines().filter(|line| !line.contains("\\kill")).collect();
    let body = LINE_BREAK_RE.replace_all(&body.join("\n"), "<br>").into_owned();
    let body = body.replace("\\>", "&emsp;");
    TAB_STOP_RE.replace_all(&body, "").into_owned()
}

/// `tabbing` and `verse` bodies: explicit line breaks become `<br>`. The wrappers are
/// left for the academic environment pass.
pub fn convert_line_environments(input: &str) -> String {
    let out = replace_environment(input, "tabbing", 0, 0, |span| {
        Some(format!(
            "\\begin{{tabbing}}{}\\end{{tabbing}}",
            convert_tabbing_body(&span.body)
        ))
    });
    replace_environment(&out, "verse", 0, 0, |span| {
        Some(format!(
            "\\begin{{verse}}{}\\end{{verse}}",
            LINE_BREAK_RE.replace_all(&span.body, "<br>")
        ))
    })
}

// =============================================================================
// Lists
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Itemize,
    Enumerate,
    Description,
}

impl ListKind {
    fn from_name(name: &str) -> Self {
        match name {
            "enumerate" => ListKind::Enumerate,
            "description" => ListKind::Description,
            _ => ListKind::Itemize,
        }
    }

    /// Width of the marker, which is also the indent of a nested list.
    fn marker_width(self) -> usize {
        match self {
            ListKind::Enumerate => 3,
            ListKind::Itemize | ListKind::Description => 2,
        }
    }

    fn marker(self, label: Option<&str>) -> Cow<'static, str> {
        match (label, self) {
            (Some(label), _) => Cow::Owned(format!("- **{}** ", label.trim())),
            (None, ListKind::Enumerate) => Cow::Borrowed("1. "),
            (None, _) => Cow::Borrowed("- "),
        }
    }
}

fn trim_end_in_place(out: &mut String) {
    let len = out.trim_end().len();
    out.truncate(len);
}

/// Convert `itemize`/`enumerate`/`description` with a nesting-aware scan.
pub fn convert_lists(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut stack: Vec<ListKind> = Vec::new();
    let mut opens_list = false;
    let mut cursor = 0usize;

    for caps in LIST_TOKEN_RE.captures_iter(input) {
        let Some(token) = caps.get(0) else { continue };
        if token.start() < cursor || is_escaped(input, token.start()) {
            continue;
        }
        out.push_str(&input[cursor..token.start()]);
        cursor = token.end();

        if let Some(name) = caps.get(1) {
            if stack.is_empty() {
                opens_list = true;
            }
            stack.push(ListKind::from_name(name.as_str()));
        } else if caps.get(2).is_some() {
            stack.pop();
            trim_end_in_place(&mut out);
            out.push_str(if stack.is_empty() { "\n\n" } else { "\n" });
            let rest = &input[cursor..];
            cursor += rest.len() - rest.trim_start().len();
        } else {
            let kind = stack.last().copied().unwrap_or(ListKind::Itemize);
            let indent: usize = stack
                .iter()
                .take(stack.len().saturating_sub(1))
                .map(|k| k.marker_width())
                .sum();
            trim_end_in_place(&mut out);
            if !out.is_empty() {
                out.push('\n');
                if opens_list {
                    out.push('\n');
                }
            }
            opens_list = false;
            out.push_str(&" ".repeat(indent));
            out.push_str(&kind.marker(caps.get(3).map(|m| m.as_str())));
            let rest = &input[cursor..];
            cursor += rest.len() - rest.trim_start().len();
        }
    }
    out.push_str(&input[cursor..]);
    out
}

// =============================================================================
// Floats and Boxed Regions
// =============================================================================

/// Drop float wrappers (keeping their content) and `\centering`.
pub fn convert_floats(input: &str) -> String {
    let mut out = input.to_string();
    for (name, opt, req) in FLOAT_ENVIRONMENTS {
        out = replace_environment(&out, name, *opt, *req, |span| {
            Some(format!("\n\n{}\n\n", convert_floats(&span.body).trim()))
        });
    }
    replace_control_word(&out, "centering", "")
}

/// `minipage`, `center`, `flushleft` and `flushright` -> styled divs.
pub fn convert_boxed_regions(input: &str) -> String {
    let mut out = replace_environment(input, "minipage", 3, 1, |span| {
        let valign = match span.args.opt(0).map(str::trim) {
            Some("b") => "bottom",
            Some("c") | Some("m") => "middle",
            _ => "top",
        };
        Some(format!(
            "\n\n<div style=\"display: inline-block; width: {}; border: 1px dashed #999; padding: 4px; vertical-align: {};\">\n\n{}\n\n</div>\n\n",
            convert_dimension(span.args.req(0)),
            valign,
            convert_boxed_regions(&span.body).trim()
        ))
    });
    for (name, align) in ALIGNED_REGIONS {
        out = replace_environment(&out, name, 0, 0, |span| {
            Some(format!(
                "\n\n<div style=\"text-align: {};\">\n\n{}\n\n</div>\n\n",
                align,
                convert_boxed_regions(&span.body).trim()
            ))
        });
    }
    out
}

// =============================================================================
// Academic Environments
// =============================================================================

/// An academic environment resolved for one `\begin{..}`.
#[derive(Debug, Clone)]
struct ResolvedEnv {
    /// Canonical name, used for the CSS class
    name: String,
    label: String,
    color: &'static str,
    italic: bool,
}

impl ResolvedEnv {
    fn from_table(name: &str, env: &AcademicEnv) -> Self {
        ResolvedEnv {
            name: name.to_string(),
            label: env.label.to_string(),
            color: BUILTIN_PALETTE.get(env.color).copied().unwrap_or("#757575"),
            italic: env.italic,
        }
    }
}

/// Built-in names and aliases win over `\newtheorem` definitions; a starred name
/// maps to the unstarred entry.
fn resolve_environment(name: &str, custom: &FxHashMap<String, String>) -> Option<ResolvedEnv> {
    let base = name.trim_end_matches('*');
    let canonical = ENVIRONMENT_ALIASES.get(base).copied().unwrap_or(base);
    if let Some(env) = ACADEMIC_ENVIRONMENTS.get(canonical) {
        return Some(ResolvedEnv::from_table(canonical, env));
    }
    custom.get(base).map(|label| ResolvedEnv {
        name: base.to_string(),
        label: label.clone(),
        color: BUILTIN_PALETTE.get("blue").copied().unwrap_or("#1e88e5"),
        italic: true,
    })
}

/// Lines that keep their own markup inside an italic body.
fn is_structural_line(line: &str, blocks: &BlockStore) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty()
        || trimmed.starts_with('<')
        || trimmed.starts_with('#')
        || trimmed.starts_with("\\begin")
        || trimmed.starts_with("\\end")
        || blocks.contains_block_level(line)
}

fn italicize(body: &str, blocks: &BlockStore) -> String {
    body.lines()
        .map(|line| {
            if is_structural_line(line, blocks) {
                return line.to_string();
            }
            if let Some(caps) = LIST_LINE_RE.captures(line) {
                let text = caps[2].trim();
                if text.is_empty() {
                    return line.to_string();
                }
                return format!("{}*{}*", &caps[1], text);
            }
            format!("*{}*", line.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether the body opens with something that needs its own paragraph.
fn starts_with_structure(body: &str, blocks: &BlockStore) -> bool {
    let first = body.lines().next().unwrap_or("");
    blocks.starts_with_block_level(body)
        || first.starts_with('<')
        || first.starts_with('#')
        || LIST_LINE_RE.is_match(first)
}

fn render_academic(
    env: &ResolvedEnv,
    title: Option<&str>,
    body: &str,
    ctx: &TranspileContext,
) -> String {
    let heading = match (env.label.is_empty(), title.map(str::trim)) {
        (true, _) => String::new(),
        (false, Some(title)) if !title.is_empty() => format!("**{} ({}).**", env.label, title),
        (false, _) => format!("**{}.**", env.label),
    };
    let body = body.trim();

    if ctx.is_preview() {
        let text = HTML_TAG_RE.replace_all(body, " ");
        let excerpt = truncate_preview(&text, ctx.options.environment_preview_chars);
        return match (heading.is_empty(), excerpt.is_empty()) {
            (true, _) => excerpt,
            (false, true) => heading,
            (false, false) => format!("{} {}", heading, excerpt),
        };
    }

    let mut content = if env.italic {
        italicize(body, &ctx.blocks)
    } else {
        body.to_string()
    };
    if env.name == "proof" {
        content = format!("{} {}", content.trim_end(), QED_MARK);
    }
    if !heading.is_empty() {
        content = if content.is_empty() {
            heading
        } else if starts_with_structure(&content, &ctx.blocks) {
            format!("{}\n\n{}", heading, content)
        } else {
            format!("{} {}", heading, content)
        };
    }

    format!(
        "\n\n<div class=\"latex-env latex-env-{}\" style=\"border-left: 4px solid {}; padding-left: 12px;\">\n\n{}\n\n</div>\n\n",
        env.name, env.color, content
    )
}

/// Convert every theorem-like environment (built-in, alias, starred or `\newtheorem`).
pub fn convert_academic_environments(input: &str, ctx: &mut TranspileContext) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    let mut search = 0usize;

    while let Some(caps) = ENV_BEGIN_RE.captures_at(input, search) {
        let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        search = token.end();
        let Some(env) = resolve_environment(name.as_str(), &ctx.custom_environments) else {
            continue;
        };
        let required = usize::from(env.name == "thebibliography");
        let Some(span) = find_environment(input, name.as_str(), token.start(), 1, required)
            .filter(|span| span.start == token.start())
        else {
            continue;
        };

        let body = convert_academic_environments(&span.body, ctx);
        out.push_str(&input[cursor..span.start]);
        out.push_str(&render_academic(&env, span.args.opt(0), &body, ctx));
        cursor = span.end;
        search = span.end;
    }
    out.push_str(&input[cursor..]);
    out
}

/// Drop the markers of environments nothing converted, keeping their content.
/// One warning per distinct name.
pub fn strip_unknown_environments(input: &str, ctx: &mut TranspileContext) -> String {
    let mut names: Vec<String> = Vec::new();
    let out = UNKNOWN_BEGIN_RE.replace_all(input, |caps: &regex::Captures| {
        let name = caps[1].trim().to_string();
        if !names.contains(&name) {
            names.push(name);
        }
        String::new()
    });
    let out = UNKNOWN_END_RE.replace_all(&out, "").into_owned();
    for name in names {
        ctx.warn(ConversionWarning::unknown_environment(&name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::latex2md::context::TranspileOptions;
    use crate::core::latex2md::WarningKind;

    fn academic(src: &str) -> String {
        convert_academic_environments(src, &mut TranspileContext::default())
    }

    #[test]
    fn test_bibliography_items() {
        let mut citations = CitationMap::new();
        citations.declare("knuth");
        let out = convert_bibliography_items(r"\bibitem{knuth} Knuth. \newblock TAOCP. \bibitem{x} X", &citations);
        assert_eq!(out, "\n\n[1]  Knuth. TAOCP. \n\n[?]  X");
    }

    #[test]
    fn test_tabbing_body() {
        let out = convert_line_environments("\\begin{tabbing}\nA \\= B \\kill\nx \\> y \\\\\nz\n\\end{tabbing}");
        assert_eq!(out, "\\begin{tabbing}\nx &emsp; y <br>\nz\\end{tabbing}");
    }

    #[test]
    fn test_verse_breaks() {
        let out = convert_line_environments("\\begin{verse}a\\\\\nb\\end{verse}");
        assert_eq!(out, "\\begin{verse}a<br>\nb\\end{verse}");
    }

    #[test]
    fn test_flat_lists() {
        let out = convert_lists("Intro:\n\\begin{itemize}\n\\item One\n\\item Two\n\\end{itemize}\nAfter");
        assert_eq!(out, "Intro:\n\n- One\n- Two\n\nAfter");

        let out = convert_lists("\\begin{enumerate}\\item a \\item b\\end{enumerate}");
        assert_eq!(out, "1. a\n1. b\n\n");
    }

    #[test]
    fn test_nested_lists() {
        let src = "\\begin{enumerate}\n\\item Outer\n\\begin{itemize}\n\\item Inner\n\\end{itemize}\n\\item Next\n\\end{enumerate}";
        assert_eq!(convert_lists(src), "1. Outer\n   - Inner\n1. Next\n\n");
    }

    #[test]
    fn test_description_labels() {
        let src = "\\begin{description}\n\\item[Term] Meaning\n\\end{description}";
        assert_eq!(convert_lists(src), "- **Term** Meaning\n\n");
        assert_eq!(convert_lists(r"\itemsep"), r"\itemsep");
    }

    #[test]
    fn test_floats() {
        let src = "\\begin{figure}[h]\n\\centering\nBody\n\\end{figure}";
        assert_eq!(convert_floats(src), "\n\nBody\n\n");
        let src = "\\begin{wrapfigure}{r}{0.4\\textwidth}X\\end{wrapfigure}";
        assert_eq!(convert_floats(src), "\n\nX\n\n");
    }

    #[test]
    fn test_boxed_regions() {
        let out = convert_boxed_regions(r"\begin{minipage}[t]{0.5\textwidth}Left\end{minipage}");
        assert!(out.contains("width: 50%; border: 1px dashed #999; padding: 4px; vertical-align: top;"));
        assert!(out.contains("\n\nLeft\n\n</div>"));

        let out = convert_boxed_regions(r"\begin{center}Mid\end{center}");
        assert_eq!(out, "\n\n<div style=\"text-align: center;\">\n\nMid\n\n</div>\n\n");
    }

    #[test]
    fn test_theorem_wrapping() {
        let out = academic(r"\begin{theorem}[Euclid] Primes are infinite. \end{theorem}");
        assert!(out.contains("class=\"latex-env latex-env-theorem\""));
        assert!(out.contains("border-left: 4px solid #1e88e5;"));
        assert!(out.contains("**Teorema (Euclid).** *Primes are infinite.*"));
    }

    #[test]
    fn test_aliases_and_starred() {
        assert!(academic(r"\begin{thm}x\end{thm}").contains("latex-env-theorem"));
        let out = academic(r"\begin{definition*}x\end{definition*}");
        assert!(out.contains("latex-env-definition"));
        assert!(out.contains("**Definición.** x"));
    }

    #[test]
    fn test_proof_ends_with_qed() {
        let out = academic(r"\begin{proof}Trivial.\end{proof}");
        assert!(out.contains("**Demostración.** Trivial. ∎"));
    }

    #[test]
    fn test_custom_theorem() {
        let mut ctx = TranspileContext::default();
        ctx.custom_environments.insert("claim".into(), "Afirmación".into());
        let out = convert_academic_environments(r"\begin{claim}It holds.\end{claim}", &mut ctx);
        assert!(out.contains("latex-env-claim"));
        assert!(out.contains("**Afirmación.** *It holds.*"));
    }

    #[test]
    fn test_italic_skips_structure() {
        let out = academic("\\begin{lemma}\n- first\n<div>x</div>\n\\end{lemma}");
        assert!(out.contains("**Lema.**\n\n- *first*\n<div>x</div>"));
    }

    #[test]
    fn test_unlabeled_and_bibliography() {
        let out = academic(r"\begin{quote}Said.\end{quote}");
        assert!(out.contains(">\n\nSaid.\n\n</div>"));
        let out = academic(r"\begin{thebibliography}{9}[1] A\end{thebibliography}");
        assert!(out.contains("latex-env-thebibliography"));
        assert!(out.contains("**Referencias.** [1] A"));
    }

    #[test]
    fn test_academic_preview() {
        let mut ctx = TranspileContext::new(TranspileOptions {
            environment_preview_chars: 10,
            ..TranspileOptions::preview()
        });
        let out = convert_academic_environments(
            r"\begin{theorem}<em>Every</em> even number is a sum\end{theorem}",
            &mut ctx,
        );
        assert_eq!(out, "**Teorema.** Every even...");
    }

    #[test]
    fn test_unknown_environments() {
        let mut ctx = TranspileContext::default();
        let out = strip_unknown_environments(
            r"\begin{foo}[x]a\end{foo} \begin{foo}b\end{foo}",
            &mut ctx,
        );
        assert_eq!(out, "a b");
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.warnings[0].kind, WarningKind::UnknownEnvironment);
    }
}
