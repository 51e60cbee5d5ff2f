//! Utility functions for LaTeX to Markdown conversion
//!
//! This module contains pure text helpers that don't depend on transpiler state:
//! brace-aware argument scanning, command/environment rewriting, comment stripping,
//! dimensions, truncation and whitespace cleanup.

use lazy_static::lazy_static;
use regex::Regex;

use super::blocks::PLACEHOLDER_RE;

lazy_static! {
    static ref TRAILING_WS: Regex = Regex::new(r"(?m)[ \t]+$").unwrap();
    static ref INNER_WS: Regex = Regex::new(r"(\S)[ \t]{2,}").unwrap();
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref LEADING_WS: Regex = Regex::new(r"(?m)^[ \t]+(- |\d+\. )?").unwrap();
    static ref RELATIVE_DIM: Regex = Regex::new(
        r"^([0-9]*\.?[0-9]*)\s*\\(textwidth|linewidth|columnwidth|hsize|paperwidth|textheight|paperheight)$"
    )
    .unwrap();
    static ref ABSOLUTE_DIM: Regex =
        Regex::new(r"^(-?[0-9]*\.?[0-9]+)\s*(pt|cm|mm|in|em|ex|px|bp)$").unwrap();
    static ref MATH_ENV_TAG: Regex = Regex::new(
        r"^\\(begin|end)\{(?:equation|align|flalign|alignat|gather|multline|eqnarray|subeqnarray|displaymath|math)\*?\}"
    )
    .unwrap();
}

// =============================================================================
// Argument Scanning
// =============================================================================

/// Arguments of a matched command or environment opener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    /// `\cmd*` form
    pub star: bool,
    /// Bracketed `[...]` arguments, in order
    pub optional: Vec<String>,
    /// Braced `{...}` arguments, in order
    pub required: Vec<String>,
}

impl CommandArgs {
    /// Optional argument by position, if present.
    pub fn opt(&self, idx: usize) -> Option<&str> {
        self.optional.get(idx).map(String::as_str)
    }

    /// Required argument by position (empty when missing).
    pub fn req(&self, idx: usize) -> &str {
        self.required.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// A matched `\begin{name}...\end{name}` span.
#[derive(Debug, Clone)]
pub struct EnvSpan {
    /// Byte offset of `\begin`
    pub start: usize,
    /// Byte offset just past `\end{name}`
    pub end: usize,
    pub args: CommandArgs,
    pub body: String,
}

/// Whether the byte at `pos` is escaped by an odd run of backslashes.
pub fn is_escaped(input: &str, pos: usize) -> bool {
    let bytes = input.as_bytes();
    let mut count = 0usize;
    let mut i = pos.min(bytes.len());
    while i > 0 && bytes[i - 1] == b'\\' {
        count += 1;
        i -= 1;
    }
    count % 2 == 1
}

/// Skip ASCII whitespace starting at `i`.
pub fn skip_ws(input: &str, mut i: usize) -> usize {
    let bytes = input.as_bytes();
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
        i += 1;
    }
    i
}

/// Read a balanced `{...}` group starting at `start`.
/// Returns the inner content and the byte offset just past the closing brace.
pub fn read_braced(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&input[start + 1..i], i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Read a `[...]` group starting at `start`, ignoring brackets nested in braces.
pub fn read_bracketed(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'[') {
        return None;
    }
    let mut braces = 0usize;
    let mut brackets = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => braces += 1,
            b'}' => braces = braces.saturating_sub(1),
            b'[' if braces == 0 => brackets += 1,
            b']' if braces == 0 => {
                brackets -= 1;
                if brackets == 0 {
                    return Some((&input[start + 1..i], i + 1));
                }
            }
            b'\n' if braces == 0 && input[i + 1..].trim_start_matches([' ', '\t']).starts_with('\n') => {
                // a blank line never sits inside an option list
                return None;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Parse `*`, up to `max_optional` bracket groups and exactly `required` brace groups.
fn parse_args(
    input: &str,
    mut i: usize,
    allow_star: bool,
    max_optional: usize,
    required: usize,
) -> Option<(CommandArgs, usize)> {
    let mut args = CommandArgs::default();
    if allow_star && input[i..].starts_with('*') {
        args.star = true;
        i += 1;
    }
    while args.optional.len() < max_optional {
        let j = skip_ws(input, i);
        if !input[j..].starts_with('[') {
            break;
        }
        let (content, end) = read_bracketed(input, j)?;
        args.optional.push(content.to_string());
        i = end;
    }
    for _ in 0..required {
        let j = skip_ws(input, i);
        let (content, end) = read_braced(input, j)?;
        args.required.push(content.to_string());
        i = end;
    }
    Some((args, i))
}

/// Find the next unescaped `\name` at or after `from` that is not a prefix of a longer name.
pub fn find_command(input: &str, name: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while search < input.len() {
        let pos = search + input[search..].find('\\')?;
        let after = pos + 1 + name.len();
        if input[pos + 1..].starts_with(name)
            && !is_escaped(input, pos)
            && !input[after..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
        {
            return Some(pos);
        }
        search = pos + 1;
    }
    None
}

// =============================================================================
// Command Rewriting
// =============================================================================

/// Rewrite every `\name[opt]..{req}..` occurrence.
///
/// Required arguments are rewritten recursively before `f` sees them, so nested
/// uses of the same command are handled. When `f` returns `None` (or the arguments
/// don't parse) the original text is kept.
pub fn replace_command<F>(
    input: &str,
    name: &str,
    max_optional: usize,
    required: usize,
    mut f: F,
) -> String
where
    F: FnMut(&CommandArgs) -> Option<String>,
{
    replace_command_inner(input, name, max_optional, required, &mut f)
}

fn replace_command_inner<F>(
    input: &str,
    name: &str,
    max_optional: usize,
    required: usize,
    f: &mut F,
) -> String
where
    F: FnMut(&CommandArgs) -> Option<String>,
{
    if !input.contains(name) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    while let Some(pos) = find_command(input, name, cursor) {
        let after_name = pos + 1 + name.len();
        out.push_str(&input[cursor..pos]);
        match parse_args(input, after_name, true, max_optional, required) {
            Some((mut args, end)) => {
                for arg in args.required.iter_mut() {
                    if arg.contains('\\') {
                        *arg = replace_command_inner(arg, name, max_optional, required, f);
                    }
                }
                match f(&args) {
                    Some(replacement) => out.push_str(&replacement),
                    None => out.push_str(&input[pos..end]),
                }
                cursor = end;
            }
            None => {
                out.push_str(&input[pos..after_name]);
                cursor = after_name;
            }
        }
    }
    out.push_str(&input[cursor..]);
    out
}

/// Replace an argument-less control word. Spaces after it on the same line are
/// swallowed, as TeX does.
pub fn replace_control_word(input: &str, name: &str, replacement: &str) -> String {
    if !input.contains(name) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    while let Some(pos) = find_command(input, name, cursor) {
        out.push_str(&input[cursor..pos]);
        out.push_str(replacement);
        let after = pos + 1 + name.len();
        cursor = after + input[after..].len() - input[after..].trim_start_matches([' ', '\t']).len();
    }
    out.push_str(&input[cursor..]);
    out
}

/// Rewrite `{\name rest}` groups; `f` receives the declaration name and the
/// (already rewritten) rest of the group.
pub fn replace_grouped_declaration<F>(input: &str, mut f: F) -> String
where
    F: FnMut(&str, &str) -> Option<String>,
{
    replace_grouped_inner(input, &mut f)
}

fn replace_grouped_inner<F>(input: &str, f: &mut F) -> String
where
    F: FnMut(&str, &str) -> Option<String>,
{
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => {
                let j = skip_ws(input, i + 1);
                if input[j..].starts_with('\\') {
                    let name_len = input[j + 1..]
                        .bytes()
                        .take_while(|b| b.is_ascii_alphabetic())
                        .count();
                    let name_end = j + 1 + name_len;
                    if name_len > 0 {
                        if let Some((_, end)) = read_braced(input, i) {
                            let rest = replace_grouped_inner(&input[name_end..end - 1], f);
                            if let Some(replacement) = f(&input[j + 1..name_end], &rest) {
                                out.push_str(&input[cursor..i]);
                                out.push_str(&replacement);
                                cursor = end;
                                i = end;
                                continue;
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    out.push_str(&input[cursor..]);
    out
}

// =============================================================================
// Environment Rewriting
// =============================================================================

/// Find the `\end{name}` matching an opener whose body starts at `from`.
/// Returns (offset of `\end`, offset past it).
pub fn find_matching_end(input: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let begin = format!("\\begin{{{}}}", name);
    let end = format!("\\end{{{}}}", name);
    let mut depth = 1usize;
    let mut i = from;
    loop {
        let next_end = i + input[i..].find(&end)?;
        match input[i..next_end].find(&begin) {
            Some(rel) => {
                depth += 1;
                i += rel + begin.len();
            }
            None => {
                depth -= 1;
                if depth == 0 {
                    return Some((next_end, next_end + end.len()));
                }
                i = next_end + end.len();
            }
        }
    }
}

/// Find the next complete `name` environment at or after `from`.
pub fn find_environment(
    input: &str,
    name: &str,
    from: usize,
    max_optional: usize,
    required: usize,
) -> Option<EnvSpan> {
    let begin = format!("\\begin{{{}}}", name);
    let mut search = from;
    while search < input.len() {
        let start = search + input[search..].find(&begin)?;
        let after_begin = start + begin.len();
        if is_escaped(input, start) {
            search = after_begin;
            continue;
        }
        let Some((args, body_start)) = parse_args(input, after_begin, false, max_optional, required)
        else {
            search = after_begin;
            continue;
        };
        match find_matching_end(input, name, body_start) {
            Some((body_end, end)) => {
                return Some(EnvSpan {
                    start,
                    end,
                    args,
                    body: input[body_start..body_end].to_string(),
                });
            }
            None => search = after_begin,
        }
    }
    None
}

/// Rewrite every outermost `name` environment. The body is passed raw; callers that
/// need nested handling recurse themselves.
pub fn replace_environment<F>(
    input: &str,
    name: &str,
    max_optional: usize,
    required: usize,
    mut f: F,
) -> String
where
    F: FnMut(&EnvSpan) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    while let Some(span) = find_environment(input, name, cursor, max_optional, required) {
        out.push_str(&input[cursor..span.start]);
        match f(&span) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&input[span.start..span.end]),
        }
        cursor = span.end;
    }
    out.push_str(&input[cursor..]);
    out
}

// =============================================================================
// Delimited Spans
// =============================================================================

/// Find the next unescaped occurrence of `needle` at or after `from`.
fn find_unescaped(input: &str, needle: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while search <= input.len() {
        let pos = search + input[search..].find(needle)?;
        if !is_escaped(input, pos) {
            return Some(pos);
        }
        search = pos + 1;
    }
    None
}

/// Rewrite every `open ... close` span (non-nested, left to right).
pub fn replace_delimited<F>(input: &str, open: &str, close: &str, mut f: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    let mut search = 0usize;
    while let Some(start) = find_unescaped(input, open, search) {
        let body_start = start + open.len();
        let Some(body_end) = find_unescaped(input, close, body_start) else {
            break;
        };
        let end = body_end + close.len();
        if let Some(replacement) = f(&input[body_start..body_end]) {
            out.push_str(&input[cursor..start]);
            out.push_str(&replacement);
            cursor = end;
        }
        search = end;
    }
    out.push_str(&input[cursor..]);
    out
}

/// Rewrite single-dollar inline math. A blank line ends the search for the closing
/// dollar, so a stray `$` never swallows the rest of the document.
pub fn replace_inline_dollars<F>(input: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' => {
                let start = i + 1;
                let mut j = start;
                let mut close = None;
                while j < bytes.len() {
                    match bytes[j] {
                        b'\\' => {
                            j += 2;
                            continue;
                        }
                        b'$' => {
                            close = Some(j);
                            break;
                        }
                        b'\n' if input[j + 1..]
                            .trim_start_matches([' ', '\t'])
                            .starts_with('\n') =>
                        {
                            break
                        }
                        _ => {}
                    }
                    j += 1;
                }
                match close {
                    Some(end) if end > start => {
                        out.push_str(&input[cursor..i]);
                        out.push_str(&f(&input[start..end]));
                        cursor = end + 1;
                        i = end + 1;
                    }
                    _ => i += 1,
                }
            }
            _ => i += 1,
        }
    }
    out.push_str(&input[cursor.min(input.len())..]);
    out
}

/// Whether the end of `prefix` sits inside a math span.
pub fn is_inside_math(prefix: &str) -> bool {
    let bytes = prefix.as_bytes();
    let mut inline = false;
    let mut display = false;
    let mut bracket = false;
    let mut paren = false;
    let mut env_depth = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let rest = &prefix[i..];
                match bytes.get(i + 1) {
                    Some(b'[') => bracket = true,
                    Some(b']') => bracket = false,
                    Some(b'(') => paren = true,
                    Some(b')') => paren = false,
                    _ => {
                        if let Some(caps) = MATH_ENV_TAG.captures(rest) {
                            if &caps[1] == "begin" {
                                env_depth += 1;
                            } else {
                                env_depth = env_depth.saturating_sub(1);
                            }
                        }
                    }
                }
                i += 2;
                continue;
            }
            b'$' => {
                if bytes.get(i + 1) == Some(&b'$') {
                    display = !display;
                    i += 2;
                    continue;
                }
                inline = !inline;
            }
            _ => {}
        }
        i += 1;
    }
    inline || display || bracket || paren || env_depth > 0
}

// =============================================================================
// Comments and Placeholders
// =============================================================================

const VERBATIM_FENCES: &[(&str, &str)] = &[
    ("\\begin{verbatim}", "\\end{verbatim}"),
    ("\\begin{verbatim*}", "\\end{verbatim*}"),
    ("\\begin{Verbatim}", "\\end{Verbatim}"),
    ("\\begin{lstlisting}", "\\end{lstlisting}"),
    ("\\begin{minted}", "\\end{minted}"),
];

/// Strip `%` comments, keeping `\%`, verbatim environments and `\verb` spans intact.
/// A comment also swallows its line break, the way TeX joins the lines.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_verbatim: Option<&'static str> = None;
    for line in input.split_inclusive('\n') {
        if let Some(end) = in_verbatim {
            out.push_str(line);
            if line.contains(end) {
                in_verbatim = None;
            }
            continue;
        }
        if let Some((_, end)) = VERBATIM_FENCES.iter().find(|(begin, _)| line.contains(begin)) {
            out.push_str(line);
            if !line.contains(end) {
                in_verbatim = Some(end);
            }
            continue;
        }
        match comment_start(line) {
            Some(pos) => out.push_str(&line[..pos]),
            None => out.push_str(line),
        }
    }
    out
}

fn comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if line[i + 1..].starts_with("verb") {
                    let mut j = i + 5;
                    if bytes.get(j) == Some(&b'*') {
                        j += 1;
                    }
                    if let Some(&delim) = bytes.get(j) {
                        if !delim.is_ascii_alphabetic() && delim.is_ascii() {
                            if let Some(rel) = line[j + 1..].find(delim as char) {
                                i = j + 1 + rel + 1;
                                continue;
                            }
                        }
                    }
                }
                i += 2;
            }
            b'%' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Break up literal placeholder-looking text in user input so it can never be
/// mistaken for a protected block.
pub fn neutralize_placeholders(input: &str) -> String {
    if input.contains("@@BLOCK") {
        input.replace("@@BLOCK", "@@\u{2060}BLOCK")
    } else {
        input.to_string()
    }
}

// =============================================================================
// Text Processing Utilities
// =============================================================================

/// Collapse all whitespace runs (including newlines) to single spaces.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape the HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Collapse whitespace and cut to `limit` characters, appending `...` when cut.
/// The cut never lands inside a placeholder token.
pub fn truncate_preview(input: &str, limit: usize) -> String {
    let collapsed = collapse_whitespace(input);
    if collapsed.chars().count() <= limit {
        return collapsed;
    }
    let mut cut = collapsed
        .char_indices()
        .nth(limit)
        .map(|(idx, _)| idx)
        .unwrap_or(collapsed.len());
    if let Some(token) = PLACEHOLDER_RE
        .find_iter(&collapsed)
        .find(|m| m.start() < cut && cut < m.end())
    {
        cut = token.start();
    }
    format!("{}...", collapsed[..cut].trim_end())
}

/// Remove leading indentation from every line except nested list items.
pub fn strip_line_indentation(input: &str) -> String {
    LEADING_WS
        .replace_all(input, |caps: &regex::Captures| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Trim leading and trailing spaces, collapse inner space runs and blank-line runs.
pub fn normalize_whitespace(input: &str) -> String {
    let out = strip_line_indentation(input);
    let out = TRAILING_WS.replace_all(&out, "");
    let out = INNER_WS.replace_all(&out, "${1} ");
    BLANK_RUNS.replace_all(&out, "\n\n").into_owned()
}

/// Collapse blank-line runs outside code fences after restoration.
///
/// Leading and trailing newlines are kept so display fragments keep their framing;
/// whitespace-only output becomes empty.
pub fn finalize_whitespace(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(input.len());
    let mut in_fence = false;
    let mut blank_run = 0usize;
    for (idx, line) in input.split('\n').enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            blank_run = 0;
        } else if !in_fence && line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}

/// Convert a LaTeX length to a CSS length.
pub fn convert_dimension(dim: &str) -> String {
    let dim = dim.trim();
    if dim == "\\fill" || dim.starts_with("\\stretch") {
        return "auto".to_string();
    }
    if let Some(caps) = RELATIVE_DIM.captures(dim) {
        let factor = match &caps[1] {
            "" | "." => 1.0,
            num => num.parse::<f64>().unwrap_or(1.0),
        };
        let unit = if caps[2].ends_with("height") { "vh" } else { "%" };
        return format!("{}{}", format_number(factor * 100.0), unit);
    }
    if let Some(caps) = ABSOLUTE_DIM.captures(dim) {
        let unit = if &caps[2] == "bp" { "pt" } else { &caps[2] };
        return format!("{}{}", &caps[1], unit);
    }
    "1em".to_string()
}

fn format_number(value: f64) -> String {
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
