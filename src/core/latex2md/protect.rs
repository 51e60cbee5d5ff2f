//! Protection of verbatim text and link/image targets
//!
//! These run first among the protection passes: nothing inside a code block or a URL
//! may be seen by math detection, tables or symbol normalization.

use lazy_static::lazy_static;
use regex::Regex;

use super::blocks::BlockStore;
use super::context::TranspileContext;
use super::utils::{
    convert_dimension, escape_html, find_command, read_bracketed, replace_command, skip_ws,
    truncate_preview,
};
use crate::data::constants::IMAGE_PREVIEW;

lazy_static! {
    static ref LANGUAGE_OPT: Regex =
        Regex::new(r"language\s*=\s*\{?\s*([A-Za-z0-9+#_-]+)").unwrap();
    static ref WIDTH_OPT: Regex = Regex::new(r"(?:^|,)\s*width\s*=\s*([^,]+)").unwrap();
}

/// Drop blank lines around a verbatim body and its trailing whitespace.
fn trim_blank_lines(content: &str) -> &str {
    let mut start = 0usize;
    for line in content.split_inclusive('\n') {
        if line.trim().is_empty() {
            start += line.len();
        } else {
            break;
        }
    }
    content[start..].trim_end()
}

fn render_code_block(content: &str, lang: &str, preview: bool, limit: usize) -> String {
    if preview {
        let mut excerpt = truncate_preview(content, limit);
        if !excerpt.ends_with("...") {
            excerpt.push_str("...");
        }
        return escape_html(&excerpt);
    }
    format!("\n```{}\n{}\n```\n", lang, trim_blank_lines(content))
}

fn listing_language(options: Option<&str>) -> String {
    options
        .and_then(|opts| LANGUAGE_OPT.captures(opts))
        .map(|caps| caps[1].to_ascii_lowercase())
        .unwrap_or_default()
}

/// Protect verbatim environments and inline `\verb`/`\lstinline`.
pub fn protect_verbatim(input: &str, ctx: &mut TranspileContext) -> String {
    let preview = ctx.options.preview;
    let limit = ctx.options.verbatim_preview_chars;
    let blocks = &mut ctx.blocks;

    let mut out = input.to_string();
    for name in ["verbatim", "verbatim*"] {
        out = blocks.protect_environment(&out, name, 0, 0, |span| {
            Some(render_code_block(&span.body, "", preview, limit))
        });
    }
    for name in ["lstlisting", "Verbatim"] {
        out = blocks.protect_environment(&out, name, 1, 0, |span| {
            let lang = listing_language(span.args.opt(0));
            Some(render_code_block(&span.body, &lang, preview, limit))
        });
    }
    out = blocks.protect_environment(&out, "minted", 1, 1, |span| {
        let lang = span.args.req(0).trim().to_ascii_lowercase();
        Some(render_code_block(&span.body, &lang, preview, limit))
    });

    for name in ["verb", "lstinline"] {
        out = protect_inline_verb(&out, name, blocks);
    }
    out
}

/// `\verb<d>..<d>` with any non-letter delimiter; `\lstinline` also takes `{..}`.
fn protect_inline_verb(input: &str, name: &str, blocks: &mut BlockStore) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    while let Some(pos) = find_command(input, name, cursor) {
        let after_name = pos + 1 + name.len();
        out.push_str(&input[cursor..pos]);
        cursor = after_name;

        let mut j = after_name;
        if input[j..].starts_with('*') {
            j += 1;
        }
        if name == "lstinline" {
            if let Some((_, end)) = read_bracketed(input, skip_ws(input, j)) {
                j = end;
            }
        }
        let Some(delim) = input[j..].chars().next() else {
            out.push_str(&input[pos..after_name]);
            continue;
        };
        if delim.is_alphabetic() || delim.is_whitespace() {
            out.push_str(&input[pos..after_name]);
            continue;
        }
        let close = if delim == '{' { '}' } else { delim };
        let body_start = j + delim.len_utf8();
        let line_end = input[body_start..]
            .find('\n')
            .map(|p| body_start + p)
            .unwrap_or(input.len());
        match input[body_start..line_end].find(close) {
            Some(rel) => {
                let content = &input[body_start..body_start + rel];
                let fragment = format!("<code>{}</code>", escape_html(content));
                out.push_str(&blocks.push(fragment));
                cursor = body_start + rel + close.len_utf8();
            }
            None => out.push_str(&input[pos..after_name]),
        }
    }
    out.push_str(&input[cursor..]);
    out
}

/// Protect URL targets of `\url`/`\href` and `\includegraphics` paths.
pub fn protect_links(input: &str, ctx: &mut TranspileContext) -> String {
    let preview = ctx.options.preview;
    let blocks = &mut ctx.blocks;

    let out = replace_command(input, "url", 0, 1, |args| {
        let url = args.req(0).trim();
        Some(blocks.push(format!("[{}]({})", url, url)))
    });

    // the link text stays in the buffer so it gets the normal inline treatment
    let out = replace_command(&out, "href", 0, 2, |args| {
        let target = blocks.push(args.req(0).trim().to_string());
        Some(format!("[{}]({})", args.req(1).trim(), target))
    });

    replace_command(&out, "includegraphics", 1, 1, |args| {
        if preview {
            return Some(blocks.push(IMAGE_PREVIEW.to_string()));
        }
        Some(blocks.push(render_image(args.req(0).trim(), args.opt(0))))
    })
}

fn render_image(path: &str, options: Option<&str>) -> String {
    let alt = path
        .rsplit('/')
        .next()
        .and_then(|file| file.split('.').next())
        .unwrap_or(path);
    let width = options
        .and_then(|opts| WIDTH_OPT.captures(opts))
        .map(|caps| convert_dimension(&caps[1]));
    match width {
        Some(width) => format!(
            "<img src=\"{}\" alt=\"{}\" style=\"width: {};\">",
            escape_html(path),
            escape_html(alt),
            width
        ),
        None => format!("![{}]({})", alt, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::latex2md::context::TranspileOptions;

    fn ctx(preview: bool) -> TranspileContext {
        TranspileContext::new(TranspileOptions {
            preview,
            ..Default::default()
        })
    }

    #[test]
    fn test_verbatim_block() {
        let mut ctx = ctx(false);
        let out = protect_verbatim("a\n\\begin{verbatim}\n  x -- y\n\\end{verbatim}\nb", &mut ctx);
        assert_eq!(out, "a\n@@BLOCK0@@\nb");
        assert_eq!(ctx.blocks.restore(&out), "a\n\n```\n  x -- y\n```\n\nb");
    }

    #[test]
    fn test_listing_language() {
        let mut ctx = ctx(false);
        let out = protect_verbatim(
            "\\begin{lstlisting}[language=Python]\nprint(1)\n\\end{lstlisting}",
            &mut ctx,
        );
        assert!(ctx.blocks.restore(&out).contains("```python\nprint(1)\n```"));

        let out = protect_verbatim("\\begin{minted}{Rust}\nfn main() {}\n\\end{minted}", &mut ctx);
        assert!(ctx.blocks.restore(&out).contains("```rust\nfn main() {}\n```"));
    }

    #[test]
    fn test_verbatim_preview_is_truncated() {
        let mut ctx = ctx(true);
        let body = "word ".repeat(40);
        let src = format!("\\begin{{verbatim}}\n{}\n\\end{{verbatim}}", body);
        let protected = protect_verbatim(&src, &mut ctx);
        let out = ctx.blocks.restore(&protected);
        assert!(out.ends_with("..."));
        assert!(out.chars().count() <= 83);
    }

    #[test]
    fn test_inline_verb() {
        let mut ctx = ctx(false);
        let out = protect_verbatim(r"use \verb|<a> & b| or \verb+x+ and \lstinline{y}", &mut ctx);
        assert_eq!(
            ctx.blocks.restore(&out),
            "use <code>&lt;a&gt; &amp; b</code> or <code>x</code> and <code>y</code>"
        );
    }

    #[test]
    fn test_links() {
        let mut ctx = ctx(false);
        let out = protect_links(
            r"\url{http://a.com/x_y} \href{http://b.com}{the \textbf{site}}",
            &mut ctx,
        );
        assert!(!out.contains("http"));
        assert!(out.contains(r"[the \textbf{site}](@@BLOCK1@@)"));
        assert_eq!(
            ctx.blocks.restore(&out),
            r"[http://a.com/x_y](http://a.com/x_y) [the \textbf{site}](http://b.com)"
        );
    }

    #[test]
    fn test_includegraphics() {
        let mut ctx = ctx(false);
        let out = protect_links(
            r"\includegraphics[width=0.5\textwidth]{img/plot.png} \includegraphics{a.jpg}",
            &mut ctx,
        );
        let restored = ctx.blocks.restore(&out);
        assert!(restored.contains(r#"<img src="img/plot.png" alt="plot" style="width: 50%;">"#));
        assert!(restored.contains("![a](a.jpg)"));
    }
}
