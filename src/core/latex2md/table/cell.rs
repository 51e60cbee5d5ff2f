//! Table cells and column specifications

use crate::core::latex2md::utils::{read_braced, replace_command, skip_ws};
use crate::data::colors::ColorTable;

/// Horizontal alignment of a column or cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAlign {
    Left,
    Center,
    Right,
    Auto,
}

impl CellAlign {
    /// CSS `text-align` value
    pub fn to_css(self) -> Option<&'static str> {
        match self {
            CellAlign::Left => Some("left"),
            CellAlign::Center => Some("center"),
            CellAlign::Right => Some("right"),
            CellAlign::Auto => None,
        }
    }
}

/// Upper bound on columns from a spec and on `\multicolumn`/`\multirow` spans.
pub const MAX_TABLE_SPAN: usize = 256;

/// Parse a column spec like `|l|c|p{3cm}|*{2}{r}` into per-column alignments.
pub fn parse_column_spec(spec: &str) -> Vec<CellAlign> {
    let mut aligns = Vec::new();
    let mut i = 0usize;
    let bytes = spec.as_bytes();
    while i < bytes.len() {
        match bytes[i] {
            b'l' => aligns.push(CellAlign::Left),
            b'c' => aligns.push(CellAlign::Center),
            b'r' => aligns.push(CellAlign::Right),
            b'X' | b'S' => aligns.push(CellAlign::Auto),
            b'p' | b'm' | b'b' => {
                aligns.push(CellAlign::Left);
                if let Some((_, end)) = read_braced(spec, skip_ws(spec, i + 1)) {
                    i = end;
                    continue;
                }
            }
            // @{..}, !{..}, >{..}, <{..} insert material, not columns
            b'@' | b'!' | b'>' | b'<' => {
                if let Some((_, end)) = read_braced(spec, skip_ws(spec, i + 1)) {
                    i = end;
                    continue;
                }
            }
            b'*' => {
                let count_at = skip_ws(spec, i + 1);
                if let Some((count, after_count)) = read_braced(spec, count_at) {
                    if let Some((inner, end)) = read_braced(spec, skip_ws(spec, after_count)) {
                        let n = count.trim().parse::<usize>().unwrap_or(1);
                        let repeated = parse_column_spec(inner);
                        if !repeated.is_empty() {
                            for _ in 0..n.min(MAX_TABLE_SPAN) {
                                if aligns.len() >= MAX_TABLE_SPAN {
                                    break;
                                }
                                aligns.extend_from_slice(&repeated);
                            }
                        }
                        i = end;
                        continue;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    aligns.truncate(MAX_TABLE_SPAN);
    aligns
}

fn parse_span(raw: &str) -> usize {
    raw.trim().parse::<usize>().unwrap_or(1).clamp(1, MAX_TABLE_SPAN)
}

/// A parsed table cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    /// Raw LaTeX content with span/color commands removed
    pub content: String,
    pub colspan: usize,
    pub rowspan: usize,
    /// Alignment override from `\multicolumn`
    pub align: Option<CellAlign>,
    /// Resolved CSS color from `\cellcolor`
    pub background: Option<String>,
}

impl GridCell {
    pub fn empty() -> Self {
        GridCell {
            content: String::new(),
            colspan: 1,
            rowspan: 1,
            align: None,
            background: None,
        }
    }

    /// Parse one raw cell, pulling out `\multicolumn`, `\multirow` and `\cellcolor`.
    pub fn parse(raw: &str, colors: &ColorTable) -> Self {
        let mut cell = GridCell::empty();

        let text = replace_command(raw.trim(), "multicolumn", 0, 3, |args| {
            cell.colspan = parse_span(args.req(0));
            cell.align = parse_column_spec(args.req(1)).first().copied();
            Some(args.req(2).to_string())
        });
        let text = replace_command(&text, "multirow", 1, 3, |args| {
            cell.rowspan = parse_span(args.req(0));
            Some(args.req(2).to_string())
        });
        let text = replace_command(&text, "cellcolor", 1, 1, |args| {
            cell.background = Some(colors.resolve_with_model(args.opt(0), args.req(0)));
            Some(String::new())
        });

        cell.content = text.trim().to_string();
        cell
    }

    /// Placeholder cells under a `\multirow` carry no content or spans.
    pub fn is_placeholder(&self) -> bool {
        self.content.is_empty() && self.colspan <= 1 && self.rowspan <= 1 && self.background.is_none()
    }
}
