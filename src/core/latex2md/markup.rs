//! Inline markup: headings, captions, notes, text formatting, boxes, spacing and
//! the final symbol normalization.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::context::TranspileContext;
use super::utils::{
    convert_dimension, read_braced, read_bracketed, replace_command, replace_control_word,
    replace_grouped_declaration, skip_ws,
};
use super::ConversionWarning;
use crate::data::colors::ColorTable;
use crate::data::constants::{
    CAPTION_LABEL, FONT_DECLARATIONS, HEADING_LEVELS, SIZE_SCALE, TEXT_FORMAT_COMMANDS,
};
use crate::data::symbols::{compose_accent, TEXT_SYMBOLS};

lazy_static! {
    static ref ACCENT_RE: Regex =
        Regex::new(r#"\\(['`^"~=.])(?:\{\s*\\?([a-zA-Z])\s*\}|\\?([a-zA-Z]))"#).unwrap();
    static ref LETTER_ACCENT_RE: Regex =
        Regex::new(r"\\([cvuHkr])(?:\s*\{\s*\\?([a-zA-Z])\s*\}|\s+([a-zA-Z]))").unwrap();
    static ref TEXT_SYMBOL_RE: Regex = Regex::new(r"\\([a-zA-Z]+)(\{\})?").unwrap();
    static ref LINE_BREAK_RE: Regex = Regex::new(r"\\\\\*?(?:[ \t]*\[[^\]\n]*\])?").unwrap();
    static ref SPACE_COMMAND_RE: Regex = Regex::new(r"\\[,;: ]").unwrap();
    static ref NULL_COMMAND_RE: Regex = Regex::new(r"\\[!/@-]").unwrap();
    static ref BARE_SIZE_RE: Regex = Regex::new(
        r"\\(?:tiny|scriptsize|footnotesize|small|normalsize|large|Large|LARGE|huge|Huge)\b[ \t]*"
    )
    .unwrap();
    static ref BARE_FONT_RE: Regex = Regex::new(
        r"\\(?:bfseries|itshape|slshape|ttfamily|sffamily|scshape|rmfamily|upshape|mdseries|normalfont|bf|it|em|sl|tt|sf|sc|rm)\b[ \t]*"
    )
    .unwrap();
}

const PARAGRAPH_BREAK: &str = "\n\n";
const PAGE_BREAK: &str = "\n\n<hr>\n\n";

const HFILL: &str = "<span style=\"display: inline-block; min-width: 1em; flex: 1;\"></span>";
const HRULEFILL: &str =
    "<span style=\"display: inline-block; min-width: 2em; flex: 1; border-bottom: 1px solid;\"></span>";
const DOTFILL: &str =
    "<span style=\"display: inline-block; min-width: 2em; flex: 1; border-bottom: 1px dotted;\"></span>";

/// Skip commands and their fixed heights.
const SKIPS: &[(&str, &str)] = &[("smallskip", "0.5em"), ("medskip", "1em"), ("bigskip", "2em")];

// =============================================================================
// Structure
// =============================================================================

/// `\caption[short]{text}` -> bold caption paragraph.
pub fn convert_captions(input: &str) -> String {
    let out = replace_command(input, "caption", 1, 1, |args| {
        Some(format!("\n\n**{}** {}\n\n", CAPTION_LABEL, args.req(0).trim()))
    });
    replace_command(&out, "captionof", 1, 2, |args| {
        Some(format!("\n\n**{}** {}\n\n", CAPTION_LABEL, args.req(1).trim()))
    })
}

/// Sectioning commands -> ATX headings.
pub fn convert_headings(input: &str) -> String {
    let mut out = input.to_string();
    for (name, level) in HEADING_LEVELS {
        out = replace_command(&out, name, 1, 1, |args| {
            Some(format!(
                "\n\n{} {}\n\n",
                "#".repeat(*level),
                args.req(0).split_whitespace().collect::<Vec<_>>().join(" ")
            ))
        });
    }
    out
}

/// Footnotes become parentheticals; `\hyperref` keeps its text.
pub fn convert_notes_and_links(input: &str) -> String {
    let out = replace_command(input, "footnote", 1, 1, |args| {
        Some(format!(" ({})", args.req(0).trim()))
    });
    let out = replace_command(&out, "footnotetext", 1, 1, |args| {
        Some(format!(" ({})", args.req(0).trim()))
    });
    let out = replace_command(&out, "footnotemark", 1, 0, |_| Some(String::new()));
    let out = replace_command(&out, "thanks", 0, 1, |args| {
        Some(format!(" ({})", args.req(0).trim()))
    });
    replace_command(&out, "hyperref", 1, 1, |args| Some(args.req(0).to_string()))
}

// =============================================================================
// Inline Formatting
// =============================================================================

/// `[model]{spec}` at the start of a `{\color..}` group: (color, rest of the group).
fn split_color_group<'a>(rest: &'a str, colors: &ColorTable) -> Option<(String, &'a str)> {
    let mut i = skip_ws(rest, 0);
    let model = match read_bracketed(rest, i) {
        Some((model, end)) => {
            i = skip_ws(rest, end);
            Some(model)
        }
        None => None,
    };
    let (spec, end) = read_braced(rest, i)?;
    Some((colors.resolve_with_model(model, spec), &rest[end..]))
}

/// Text commands, color commands, grouped declarations and switches.
pub fn convert_inline_formatting(input: &str, ctx: &mut TranspileContext) -> String {
    let colors = &ctx.colors;
    let mut out = input.to_string();

    for (name, style) in TEXT_FORMAT_COMMANDS.entries() {
        out = replace_command(&out, name, 0, 1, |args| Some(style.wrap(args.req(0))));
    }

    out = replace_command(&out, "textcolor", 1, 2, |args| {
        Some(format!(
            "<span style=\"color: {};\">{}</span>",
            colors.resolve_with_model(args.opt(0), args.req(0)),
            args.req(1)
        ))
    });
    out = replace_command(&out, "colorbox", 1, 2, |args| {
        Some(format!(
            "<span style=\"background-color: {}; padding: 0 2px;\">{}</span>",
            colors.resolve_with_model(args.opt(0), args.req(0)),
            args.req(1)
        ))
    });
    out = replace_command(&out, "fcolorbox", 1, 3, |args| {
        Some(format!(
            "<span style=\"border: 1px solid {}; background-color: {}; padding: 0 2px;\">{}</span>",
            colors.resolve_with_model(args.opt(0), args.req(0)),
            colors.resolve_with_model(args.opt(0), args.req(1)),
            args.req(2)
        ))
    });

    out = replace_grouped_declaration(&out, |name, rest| {
        if let Some(style) = FONT_DECLARATIONS.get(name) {
            return Some(style.wrap(rest));
        }
        if let Some(size) = SIZE_SCALE.get(name) {
            return Some(format!(
                "<span style=\"font-size: {}pt\">{}</span>",
                size,
                rest.trim()
            ));
        }
        if name == "color" {
            let (color, text) = split_color_group(rest, colors)?;
            return Some(format!(
                "<span style=\"color: {};\">{}</span>",
                color,
                text.trim()
            ));
        }
        None
    });

    // A bare switch colors everything after it; the span is never closed.
    let mut switches = Vec::new();
    out = replace_command(&out, "color", 1, 1, |args| {
        switches.push(args.req(0).trim().to_string());
        Some(format!(
            "<span style=\"color: {};\">",
            colors.resolve_with_model(args.opt(0), args.req(0))
        ))
    });
    for color in switches {
        ctx.warn(ConversionWarning::unclosed_color_switch(&color));
    }

    let out = BARE_SIZE_RE.replace_all(&out, "");
    BARE_FONT_RE.replace_all(&out, "").into_owned()
}

// =============================================================================
// Boxes and Rules
// =============================================================================

fn box_alignment(pos: Option<&str>) -> &'static str {
    match pos.map(str::trim) {
        Some("l") => "left",
        Some("r") => "right",
        Some("s") => "justify",
        _ => "center",
    }
}

fn vertical_alignment(pos: Option<&str>) -> &'static str {
    match pos.map(str::trim) {
        Some("b") => "bottom",
        Some("c") | Some("m") => "middle",
        _ => "top",
    }
}

/// Boxes, rules and fills.
pub fn convert_boxes_and_rules(input: &str) -> String {
    let out = replace_command(input, "fbox", 0, 1, |args| {
        Some(format!(
            "<span style=\"border: 1px solid; padding: 2px 4px;\">{}</span>",
            args.req(0).trim()
        ))
    });
    let out = replace_command(&out, "framebox", 2, 1, |args| {
        let text = args.req(0).trim();
        Some(match args.opt(0) {
            Some(width) => format!(
                "<span style=\"display: inline-block; border: 1px solid; padding: 2px 4px; width: {}; text-align: {};\">{}</span>",
                convert_dimension(width),
                box_alignment(args.opt(1)),
                text
            ),
            None => format!(
                "<span style=\"border: 1px solid; padding: 2px 4px;\">{}</span>",
                text
            ),
        })
    });
    let out = replace_command(&out, "mbox", 0, 1, |args| {
        Some(format!(
            "<span style=\"white-space: nowrap;\">{}</span>",
            args.req(0).trim()
        ))
    });
    let out = replace_command(&out, "makebox", 2, 1, |args| {
        let text = args.req(0).trim();
        Some(match args.opt(0) {
            Some(width) => format!(
                "<span style=\"display: inline-block; white-space: nowrap; width: {}; text-align: {};\">{}</span>",
                convert_dimension(width),
                box_alignment(args.opt(1)),
                text
            ),
            None => format!("<span style=\"white-space: nowrap;\">{}</span>", text),
        })
    });
    let out = replace_command(&out, "parbox", 3, 2, |args| {
        Some(format!(
            "<div style=\"display: inline-block; width: {}; vertical-align: {};\">{}</div>",
            convert_dimension(args.req(0)),
            vertical_alignment(args.opt(0)),
            args.req(1).trim()
        ))
    });
    let out = replace_command(&out, "raisebox", 2, 2, |args| {
        Some(format!(
            "<span style=\"position: relative; bottom: {};\">{}</span>",
            convert_dimension(args.req(0)),
            args.req(1).trim()
        ))
    });
    let out = replace_command(&out, "rule", 1, 2, |args| {
        let raise = args
            .opt(0)
            .map(|r| format!(" position: relative; bottom: {};", convert_dimension(r)))
            .unwrap_or_default();
        Some(format!(
            "<span style=\"display: inline-block; width: {}; height: {}; background: currentColor;{}\"></span>",
            convert_dimension(args.req(0)),
            convert_dimension(args.req(1)),
            raise
        ))
    });

    let out = replace_control_word(&out, "hrulefill", HRULEFILL);
    let out = replace_control_word(&out, "dotfill", DOTFILL);
    let out = replace_control_word(&out, "hfill", HFILL);
    replace_control_word(&out, "hrule", PAGE_BREAK)
}

// =============================================================================
// Spacing and Breaks
// =============================================================================

/// Explicit spacing, line and page breaks.
pub fn convert_spacing_and_breaks(input: &str) -> String {
    let out = replace_command(input, "hspace", 0, 1, |args| {
        let width = args.req(0).trim();
        if width == "\\fill" {
            return Some(HFILL.to_string());
        }
        Some(format!(
            "<span style=\"display: inline-block; width: {};\"></span>",
            convert_dimension(width)
        ))
    });
    let mut out = replace_command(&out, "vspace", 0, 1, |args| {
        Some(format!(
            "\n\n<div style=\"height: {};\"></div>\n\n",
            convert_dimension(args.req(0))
        ))
    });

    for (name, height) in SKIPS {
        out = replace_control_word(&out, name, &format!("\n\n<div style=\"height: {};\"></div>\n\n", height));
    }
    out = replace_control_word(&out, "qquad", "&emsp;&emsp;");
    out = replace_control_word(&out, "quad", "&emsp;");
    out = replace_control_word(&out, "noindent", "");
    out = replace_control_word(&out, "indent", "");

    for name in ["newpage", "clearpage", "cleardoublepage"] {
        out = replace_control_word(&out, name, PAGE_BREAK);
    }
    out = replace_command(&out, "pagebreak", 1, 0, |_| Some(PAGE_BREAK.to_string()));
    out = replace_command(&out, "linebreak", 1, 0, |_| Some(PARAGRAPH_BREAK.to_string()));
    out = replace_control_word(&out, "newline", PARAGRAPH_BREAK);
    out = replace_control_word(&out, "par", PARAGRAPH_BREAK);
    LINE_BREAK_RE.replace_all(&out, PARAGRAPH_BREAK).into_owned()
}

// =============================================================================
// Symbols
// =============================================================================

fn replace_accent(caps: &Captures) -> String {
    let letter = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
    compose_accent(&caps[1], letter)
}

/// Accents, text symbols, quotes, dashes, ties and spacing commands. Escaped
/// specials (`\%`, `\&`, ...) are left as Markdown escapes.
pub fn normalize_symbols(input: &str) -> String {
    let out = ACCENT_RE.replace_all(input, replace_accent);
    let out = LETTER_ACCENT_RE.replace_all(&out, replace_accent);
    let out = TEXT_SYMBOL_RE.replace_all(&out, |caps: &Captures| {
        match TEXT_SYMBOLS.get(&caps[1]) {
            Some(symbol) => (*symbol).to_string(),
            None => caps[0].to_string(),
        }
    });

    let out = out
        .replace("?`", "¿")
        .replace("!`", "¡")
        .replace("``", "“")
        .replace("''", "”")
        .replace('`', "‘")
        .replace("---", "&mdash;")
        .replace("--", "&ndash;")
        .replace('~', " ");

    let out = SPACE_COMMAND_RE.replace_all(&out, " ");
    NULL_COMMAND_RE.replace_all(&out, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::latex2md::WarningKind;

    fn inline(src: &str) -> String {
        convert_inline_formatting(src, &mut TranspileContext::default())
    }

    #[test]
    fn test_headings() {
        assert_eq!(convert_headings(r"\section{Intro}"), "\n\n# Intro\n\n");
        assert_eq!(convert_headings(r"\subsection*{Two words}"), "\n\n## Two words\n\n");
        assert_eq!(
            convert_headings(r"\subsubsection[short]{Long title}"),
            "\n\n### Long title\n\n"
        );
        assert_eq!(convert_headings(r"\paragraph{P}"), "\n\n#### P\n\n");
    }

    #[test]
    fn test_captions_and_notes() {
        assert_eq!(convert_captions(r"\caption[s]{A plot}"), "\n\n**Caption:** A plot\n\n");
        assert_eq!(convert_notes_and_links(r"word\footnote{note}."), "word (note).");
        assert_eq!(convert_notes_and_links(r"a\footnotemark b"), "a b");
        assert_eq!(convert_notes_and_links(r"\hyperref[sec]{there}"), "there");
    }

    #[test]
    fn test_text_commands() {
        assert_eq!(inline(r"\textbf{a \textit{b}}"), "**a *b***");
        assert_eq!(inline(r"\emph{x} \texttt{y}"), "*x* <code>y</code>");
        assert_eq!(inline(r"\sout{gone}"), "<del>gone</del>");
        assert_eq!(inline(r"\textbf{}"), "");
    }

    #[test]
    fn test_grouped_declarations() {
        assert_eq!(inline(r"{\bf bold} and {\it it}"), "**bold** and *it*");
        assert_eq!(
            inline(r"{\large big}"),
            "<span style=\"font-size: 14pt\">big</span>"
        );
        assert_eq!(
            inline(r"{\color{red} x}"),
            "<span style=\"color: #e53935;\">x</span>"
        );
    }

    #[test]
    fn test_bare_switches_dropped() {
        assert_eq!(inline(r"\small text \bfseries more"), "text more");
        assert_eq!(inline(r"\itemsep"), r"\itemsep");
    }

    #[test]
    fn test_bare_color_is_unclosed() {
        let mut ctx = TranspileContext::default();
        let out = convert_inline_formatting(r"\color{blue} rest", &mut ctx);
        assert_eq!(out, "<span style=\"color: #1e88e5;\"> rest");
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.warnings[0].kind, WarningKind::UnclosedColorSwitch);
    }

    #[test]
    fn test_color_commands() {
        let mut ctx = TranspileContext::default();
        ctx.colors.define("brand", "HTML", "FF8800");
        let out = convert_inline_formatting(r"\textcolor{brand}{x} \colorbox{unknown}{y}", &mut ctx);
        assert!(out.contains("<span style=\"color: #ff8800;\">x</span>"));
        assert!(out.contains("background-color: unknown;"));
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn test_boxes_and_rules() {
        assert_eq!(
            convert_boxes_and_rules(r"\fbox{x}"),
            "<span style=\"border: 1px solid; padding: 2px 4px;\">x</span>"
        );
        assert!(convert_boxes_and_rules(r"\parbox[b]{0.5\textwidth}{x}")
            .contains("width: 50%; vertical-align: bottom;"));
        assert!(convert_boxes_and_rules(r"\rule{2cm}{1pt}").contains("width: 2cm; height: 1pt;"));
        assert_eq!(convert_boxes_and_rules(r"a\hrule b"), "a\n\n<hr>\n\nb");
        assert_eq!(convert_boxes_and_rules(r"\hfill x"), format!("{}x", HFILL));
    }

    #[test]
    fn test_spacing_and_breaks() {
        assert_eq!(convert_spacing_and_breaks(r"a\\b"), "a\n\nb");
        assert_eq!(convert_spacing_and_breaks(r"a\\[2pt] b"), "a\n\n b");
        assert_eq!(convert_spacing_and_breaks(r"a\newpage b"), "a\n\n<hr>\n\nb");
        assert_eq!(convert_spacing_and_breaks(r"\noindent Text"), "Text");
        assert_eq!(convert_spacing_and_breaks(r"a\quad b\qquad c"), "a&emsp;b&emsp;&emsp;c");
        assert_eq!(
            convert_spacing_and_breaks(r"\hspace*{1cm}"),
            "<span style=\"display: inline-block; width: 1cm;\"></span>"
        );
        assert_eq!(
            convert_spacing_and_breaks(r"\bigskip"),
            "\n\n<div style=\"height: 2em;\"></div>\n\n"
        );
        assert_eq!(convert_spacing_and_breaks(r"\parbox"), r"\parbox");
    }

    #[test]
    fn test_accents() {
        assert_eq!(normalize_symbols(r"Jos\'e and \~nandu"), "José and ñandu");
        assert_eq!(normalize_symbols(r#"na\"{\i}ve"#), "naïve");
        assert_eq!(normalize_symbols(r"\c{c}a and \v s"), "ça and š");
        assert_eq!(normalize_symbols(r"\cite"), r"\cite");
    }

    #[test]
    fn test_symbols_and_punctuation() {
        assert_eq!(normalize_symbols(r"\LaTeX{} and \S 2"), "LaTeX and § 2");
        assert_eq!(normalize_symbols("``quoted'' `x'"), "“quoted” ‘x'");
        assert_eq!(normalize_symbols("1--2 and a---b"), "1&ndash;2 and a&mdash;b");
        assert_eq!(normalize_symbols("?`Qu\\'e?"), "¿Qué?");
        assert_eq!(normalize_symbols("Dr.~Who"), "Dr. Who");
        assert_eq!(normalize_symbols(r"a\,b\!c"), "a bc");
        assert_eq!(normalize_symbols(r"\unknown stays"), r"\unknown stays");
    }

    #[test]
    fn test_escapes_are_kept() {
        assert_eq!(normalize_symbols(r"50\% \& \$5 \#1 a\_b"), r"50\% \& \$5 \#1 a\_b");
    }
}
