//! Table handling for LaTeX to Markdown conversion
//!
//! `tabular`-family environments become HTML tables; text-mode `array` blocks become
//! display math. Both are protected as finished fragments.

mod cell;
mod parser;


use cell::parse_column_spec;
use parser::{parse_table, split_cells, split_rows, strip_rules};

use super::blocks::BlockStore;
use super::context::TranspileContext;
use super::labels::resolve_references;
use super::markup::normalize_symbols;
use super::math::clean_math;
use super::utils::{
    find_environment, is_escaped, is_inside_math, replace_command, replace_environment,
    replace_grouped_declaration,
};
use crate::data::colors::ColorTable;
use crate::data::constants::{
    ARRAY_PREVIEW, FONT_DECLARATIONS, TABLE_PREVIEW, TEXT_FORMAT_COMMANDS,
};

/// Tabular-like environments: (name, max optional, required). The column spec is
/// always the last required argument.
const TABULAR_ENVIRONMENTS: &[(&str, usize, usize)] = &[
    ("tabular", 1, 1),
    ("tabular*", 1, 2),
    ("tabularx", 0, 2),
    ("longtable", 1, 1),
];

/// Escaped specials inside HTML cells, where Markdown escapes aren't processed.
fn unescape_specials(text: &str) -> String {
    text.replace("\\&", "&amp;")
        .replace("\\%", "%")
        .replace("\\#", "#")
        .replace("\\_", "_")
        .replace("\\$", "&#36;")
        .replace("\\{", "{")
        .replace("\\}", "}")
}

/// Light inline formatting for one cell: math kept, text commands turned into HTML.
fn render_cell_content(raw: &str, colors: &ColorTable) -> String {
    let mut local = BlockStore::new();
    let text = local.protect_delimited(raw, "\\(", "\\)", |body| {
        Some(format!("${}$", clean_math(body, colors)))
    });
    let mut text =
        local.protect_inline_dollars(&text, |body| format!("${}$", clean_math(body, colors)));

    for (name, opt, req) in TABULAR_ENVIRONMENTS {
        text = replace_environment(&text, name, *opt, *req, |span| {
            Some(render_tabular(span.args.req(req - 1), &span.body, colors))
        });
    }
    for (name, style) in TEXT_FORMAT_COMMANDS.entries() {
        text = replace_command(&text, name, 0, 1, |args| Some(style.wrap_html(args.req(0))));
    }
    text = replace_grouped_declaration(&text, |name, rest| {
        FONT_DECLARATIONS.get(name).map(|style| style.wrap_html(rest))
    });
    text = replace_command(&text, "textcolor", 1, 2, |args| {
        Some(format!(
            "<span style=\"color: {};\">{}</span>",
            colors.resolve_with_model(args.opt(0), args.req(0)),
            args.req(1).trim()
        ))
    });

    let text = normalize_symbols(&unescape_specials(&text));
    local.restore(text.trim())
}

/// Render a tabular body as an HTML table.
pub fn render_tabular(spec: &str, body: &str, colors: &ColorTable) -> String {
    parse_table(body, parse_column_spec(spec), colors)
        .generate_html(|content| render_cell_content(content, colors))
}

/// Render an `array` as display math with rules and cell colors dropped.
pub fn render_array(spec: &str, body: &str, colors: &ColorTable) -> String {
    let rows: Vec<String> = split_rows(body)
        .iter()
        .map(|row| strip_rules(row))
        .map(|row| {
            let row = replace_command(&row, "rowcolor", 1, 1, |_| Some(String::new()));
            replace_command(&row, "cellcolor", 1, 1, |_| Some(String::new()))
        })
        .filter(|row| !row.trim().is_empty())
        .map(|row| {
            split_cells(&row)
                .iter()
                .map(|cell| cell.trim().to_string())
                .collect::<Vec<_>>()
                .join(" & ")
        })
        .collect();
    format!(
        "\n$$\n\\begin{{array}}{{{}}}\n{}\n\\end{{array}}\n$$\n",
        spec.trim(),
        clean_math(&rows.join(" \\\\\n"), colors)
    )
}

/// Protect `tabular`, `tabular*`, `tabularx` and `longtable`.
pub fn protect_tables(input: &str, ctx: &mut TranspileContext) -> String {
    let preview = ctx.options.preview;
    let colors = &ctx.colors;
    let labels = &ctx.labels;
    let citations = &ctx.citations;
    let warnings = &mut ctx.warnings;
    let blocks = &mut ctx.blocks;

    let mut out = input.to_string();
    for (name, opt, req) in TABULAR_ENVIRONMENTS {
        out = replace_environment(&out, name, *opt, *req, |span| {
            let fragment = if preview {
                TABLE_PREVIEW.to_string()
            } else {
                // earlier fragments (verbatim, links) go back in so this one is final
                let body = resolve_references(&span.body, labels, citations, warnings);
                let body = blocks.restore(&body);
                render_tabular(span.args.req(req - 1), &body, colors)
            };
            Some(blocks.push(fragment))
        });
    }
    out
}

/// `$$`/`\[` delimiters that wrap exactly the array: (offset of opener, closer length).
fn wrapping_delimiters(before: &str, after: &str) -> Option<(usize, usize)> {
    for (open, close) in [("$$", "$$"), ("\\[", "\\]")] {
        if before.ends_with(open) && after.starts_with(close) {
            let open_at = before.len() - open.len();
            if !is_escaped(before, open_at) && !is_inside_math(&before[..open_at]) {
                return Some((open_at, close.len()));
            }
        }
    }
    None
}

/// Protect text-mode `array` blocks. An array that fills a whole `$$..$$` / `\[..\]`
/// span takes the delimiters with it; one nested in a larger formula is left for the
/// math pass.
pub fn protect_arrays(input: &str, ctx: &mut TranspileContext) -> String {
    let preview = ctx.options.preview;
    let colors = &ctx.colors;
    let blocks = &mut ctx.blocks;

    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    let mut search = 0usize;
    while let Some(span) = find_environment(input, "array", search, 1, 1) {
        search = span.end;
        let before = input[..span.start].trim_end();
        let rest = &input[span.end..];
        let after_ws = rest.len() - rest.trim_start().len();

        let (start, end) = match wrapping_delimiters(before, &rest[after_ws..]) {
            Some((open_at, close_len)) => (open_at, span.end + after_ws + close_len),
            None if is_inside_math(&input[..span.start]) => continue,
            None => (span.start, span.end),
        };
        if start < cursor {
            continue;
        }

        let fragment = if preview {
            ARRAY_PREVIEW.to_string()
        } else {
            render_array(span.args.req(0), &span.body, colors)
        };
        out.push_str(&input[cursor..start]);
        out.push_str(&blocks.push(fragment));
        cursor = end;
        search = end;
    }
    out.push_str(&input[cursor..]);
    out
}
