//! State-aware table grid parser

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

use super::cell::{CellAlign, GridCell, MAX_TABLE_SPAN};
use crate::core::latex2md::utils::{read_bracketed, replace_command, skip_ws};
use crate::data::colors::ColorTable;

lazy_static! {
    static ref RULE_RE: Regex = Regex::new(
        r"\\(?:hline|toprule|midrule|bottomrule|hdashline|cline\s*\{[^}]*\}|cmidrule\s*(?:\([^)]*\))?\s*\{[^}]*\}|addlinespace(?:\s*\[[^\]]*\])?)"
    )
    .unwrap();
    static ref LONGTABLE_CONTROL_RE: Regex =
        Regex::new(r"\\(?:endfirsthead|endhead|endfoot|endlastfoot)\b").unwrap();
}

// =============================================================================
// Row and Cell Splitting
// =============================================================================

/// Split a table body into rows at `\\` / `\tabularnewline` (brace depth 0, outside
/// nested environments). The optional `[len]` and `*` after `\\` are dropped.
pub fn split_rows(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut rows = Vec::new();
    let mut depth = 0usize;
    let mut env_depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'\\' => {
                let rest = &body[i..];
                let top_level = depth == 0 && env_depth == 0;
                if rest.starts_with("\\begin{") {
                    env_depth += 1;
                } else if rest.starts_with("\\end{") {
                    env_depth = env_depth.saturating_sub(1);
                } else if top_level && rest.starts_with("\\\\") {
                    rows.push(body[start..i].to_string());
                    i += 2;
                    if bytes.get(i) == Some(&b'*') {
                        i += 1;
                    }
                    if let Some((_, end)) = read_bracketed(body, skip_ws(body, i)) {
                        i = end;
                    }
                    start = i;
                    continue;
                } else if top_level && rest[1..].starts_with("tabularnewline") {
                    rows.push(body[start..i].to_string());
                    i += "\\tabularnewline".len();
                    start = i;
                    continue;
                }
                // skip the escaped character (\&, \{, ...)
                i += 2;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    rows.push(body[start.min(body.len())..].to_string());
    rows
}

/// Split a row into cells at unescaped `&` (brace depth 0, outside nested environments).
pub fn split_cells(row: &str) -> Vec<String> {
    let bytes = row.as_bytes();
    let mut cells = Vec::new();
    let mut depth = 0usize;
    let mut env_depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if row[i..].starts_with("\\begin{") {
                    env_depth += 1;
                } else if row[i..].starts_with("\\end{") {
                    env_depth = env_depth.saturating_sub(1);
                }
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'&' if depth == 0 && env_depth == 0 => {
                cells.push(row[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    cells.push(row[start.min(row.len())..].to_string());
    cells
}

/// Remove horizontal rules from a row.
pub fn strip_rules(row: &str) -> String {
    RULE_RE.replace_all(row, "").into_owned()
}

/// Pull `\rowcolor[model]{c}` out of a row.
pub fn extract_row_color(row: &str, colors: &ColorTable) -> (String, Option<String>) {
    let mut background = None;
    let text = replace_command(row, "rowcolor", 1, 1, |args| {
        background = Some(colors.resolve_with_model(args.opt(0), args.req(0)));
        Some(String::new())
    });
    (text, background)
}

// =============================================================================
// Grid
// =============================================================================

/// Represents a parsed table row
#[derive(Debug, Clone, Default)]
pub struct GridRow {
    pub cells: Vec<GridCell>,
    pub background: Option<String>,
}

/// State-aware table grid parser
///
/// Tracks which columns are still covered by a `\multirow` from an earlier row, so the
/// empty placeholder cells LaTeX requires under it are not emitted twice.
pub struct TableGridParser {
    /// Remaining rows each column is covered by a multirow
    col_coverage: Vec<usize>,
    pub rows: Vec<GridRow>,
    /// Default column alignments from the column spec
    pub default_alignments: Vec<CellAlign>,
}

impl TableGridParser {
    pub fn new(alignments: Vec<CellAlign>) -> Self {
        TableGridParser {
            col_coverage: Vec::new(),
            rows: Vec::new(),
            default_alignments: alignments,
        }
    }

    /// Process a row of parsed cells
    pub fn process_row(&mut self, cells: Vec<GridCell>, background: Option<String>) {
        let mut row = GridRow {
            cells: Vec::new(),
            background,
        };
        let mut current_col = 0usize;

        for mut cell in cells {
            if current_col >= self.col_coverage.len() {
                self.col_coverage.resize(current_col + 1, 0);
            }
            let span = cell.colspan.clamp(1, MAX_TABLE_SPAN);

            if self.col_coverage[current_col] > 0 && cell.is_placeholder() {
                // covered by a multirow above: consume without emitting
                for i in 0..span {
                    if let Some(cov) = self.col_coverage.get_mut(current_col + i) {
                        *cov = cov.saturating_sub(1);
                    }
                }
                current_col = current_col.saturating_add(span);
                continue;
            }

            let span_end = current_col.saturating_add(span);
            if span_end > self.col_coverage.len() {
                self.col_coverage.resize(span_end, 0);
            }
            let rows_to_cover = cell.rowspan.clamp(1, MAX_TABLE_SPAN) - 1;
            for cov in &mut self.col_coverage[current_col..span_end] {
                *cov = rows_to_cover;
            }

            if cell.align.is_none() {
                cell.align = self.default_alignments.get(current_col).copied();
            }
            row.cells.push(cell);
            current_col = span_end;
        }

        if !row.cells.is_empty() {
            self.rows.push(row);
        }
    }

    /// Render the grid as an HTML table; `render_content` turns raw cell LaTeX into HTML.
    pub fn generate_html<F>(&self, mut render_content: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let mut output = String::from("\n<table class=\"latex-table\">\n");
        for row in &self.rows {
            match row.background {
                Some(ref color) => {
                    output.push_str(&format!("<tr style=\"background-color: {};\">", color))
                }
                None => output.push_str("<tr>"),
            }
            for cell in &row.cells {
                output.push_str("<td");
                if cell.colspan > 1 {
                    output.push_str(&format!(" colspan=\"{}\"", cell.colspan));
                }
                if cell.rowspan > 1 {
                    output.push_str(&format!(" rowspan=\"{}\"", cell.rowspan));
                }
                let mut style = Vec::new();
                if let Some(align) = cell.align.and_then(CellAlign::to_css) {
                    style.push(format!("text-align: {};", align));
                }
                if let Some(ref color) = cell.background {
                    style.push(format!("background-color: {};", color));
                }
                if !style.is_empty() {
                    output.push_str(&format!(" style=\"{}\"", style.join(" ")));
                }
                output.push('>');
                output.push_str(&render_content(&cell.content));
                output.push_str("</td>");
            }
            output.push_str("</tr>\n");
        }
        output.push_str("</table>\n");
        output
    }
}

// =============================================================================
// Longtable Headers
// =============================================================================

/// Keep the first header and the body of a longtable. The repeated header and
/// footer sections between `\endfirsthead` .. `\endlastfoot` only matter for page breaks.
fn longtable_sections(body: &str) -> Cow<'_, str> {
    let mut controls = LONGTABLE_CONTROL_RE.find_iter(body);
    let Some(first) = controls.next() else {
        return Cow::Borrowed(body);
    };
    let last_end = controls.last().map(|m| m.end()).unwrap_or(first.end());
    Cow::Owned(format!("{}\\\\{}", &body[..first.start()], &body[last_end..]))
}

/// Parse a tabular body into a grid.
pub fn parse_table(body: &str, alignments: Vec<CellAlign>, colors: &ColorTable) -> TableGridParser {
    let mut parser = TableGridParser::new(alignments);
    for raw_row in split_rows(&longtable_sections(body)) {
        let row = strip_rules(&raw_row);
        let (row, background) = extract_row_color(&row, colors);
        if row.trim().is_empty() {
            continue;
        }
        let cells = split_cells(&row)
            .iter()
            .map(|raw| GridCell::parse(raw, colors))
            .collect();
        parser.process_row(cells, background);
    }
    parser
}
