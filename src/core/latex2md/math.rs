//! Math span handling for LaTeX to Markdown conversion
//!
//! Every math family is cleaned (labels dropped, colors resolved) and protected in
//! its final `$..$` / `$$..$$` form. The body itself is passed through for the
//! downstream math renderer.

use lazy_static::lazy_static;
use regex::Regex;

use super::context::TranspileContext;
use super::labels::LabelMap;
use super::utils::{collapse_whitespace, replace_command};
use crate::data::colors::ColorTable;
use crate::data::constants::EQUATIONS_PREVIEW;

lazy_static! {
    static ref LABEL_RE: Regex = Regex::new(r"\\label\s*\{([^}]*)\}").unwrap();
    static ref NONUMBER_RE: Regex = Regex::new(r"\\(?:nonumber|notag)\b").unwrap();
}

#[derive(Debug, Clone, Copy)]
enum MathForm {
    /// Single display formula
    Display,
    /// Multi-line family rendered through the named group environment
    Group(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct MathEnv {
    name: &'static str,
    form: MathForm,
    /// Braced arguments after `\begin{..}` (alignat's column count)
    required: usize,
    /// Gets a `\tag` when its label resolved
    numbered: bool,
}

const fn math_env(name: &'static str, form: MathForm, required: usize, numbered: bool) -> MathEnv {
    MathEnv {
        name,
        form,
        required,
        numbered,
    }
}

/// Environment families in protection order.
const MATH_ENVIRONMENTS: &[MathEnv] = &[
    math_env("equation", MathForm::Display, 0, true),
    math_env("equation*", MathForm::Display, 0, false),
    math_env("displaymath", MathForm::Display, 0, false),
    math_env("eqnarray", MathForm::Group("aligned"), 0, false),
    math_env("eqnarray*", MathForm::Group("aligned"), 0, false),
    math_env("subeqnarray", MathForm::Group("aligned"), 0, false),
    math_env("align", MathForm::Group("aligned"), 0, false),
    math_env("align*", MathForm::Group("aligned"), 0, false),
    math_env("flalign", MathForm::Group("aligned"), 0, false),
    math_env("flalign*", MathForm::Group("aligned"), 0, false),
    math_env("alignat", MathForm::Group("aligned"), 1, false),
    math_env("alignat*", MathForm::Group("aligned"), 1, false),
    math_env("gather", MathForm::Group("gathered"), 0, false),
    math_env("gather*", MathForm::Group("gathered"), 0, false),
    math_env("multline", MathForm::Group("multline"), 0, false),
    math_env("multline*", MathForm::Group("multline"), 0, false),
];

/// Strip labels and resolve color names against the color table.
pub fn clean_math(body: &str, colors: &ColorTable) -> String {
    let out = LABEL_RE.replace_all(body, "");
    let out = replace_command(&out, "textcolor", 1, 2, |args| {
        Some(format!(
            "\\textcolor{{{}}}{{{}}}",
            colors.resolve_with_model(args.opt(0), args.req(0)),
            args.req(1)
        ))
    });
    let out = replace_command(&out, "colorbox", 1, 2, |args| {
        Some(format!(
            "\\colorbox{{{}}}{{{}}}",
            colors.resolve_with_model(args.opt(0), args.req(0)),
            args.req(1)
        ))
    });
    let out = replace_command(&out, "color", 1, 1, |args| {
        Some(format!(
            "\\color{{{}}}",
            colors.resolve_with_model(args.opt(0), args.req(0))
        ))
    });
    out.trim().to_string()
}

/// `a &=& b` -> `a &= b`: drop the second column separator of every row.
fn collapse_eqnarray_columns(body: &str) -> String {
    body.split("\\\\")
        .map(|row| {
            let bytes = row.as_bytes();
            let mut amps = Vec::new();
            let mut depth = 0usize;
            let mut i = 0usize;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 1,
                    b'{' => depth += 1,
                    b'}' => depth = depth.saturating_sub(1),
                    b'&' if depth == 0 => amps.push(i),
                    _ => {}
                }
                i += 1;
            }
            match amps.get(1) {
                Some(&second) => format!("{}{}", &row[..second], &row[second + 1..]),
                None => row.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\\\\")
}

/// `\tag{n}` for the first resolved label in an equation body.
fn equation_tag(body: &str, labels: &LabelMap) -> Option<String> {
    LABEL_RE
        .captures_iter(body)
        .find_map(|caps| labels.get(caps[1].trim()))
        .map(|value| value.trim_start_matches('(').trim_end_matches(')').to_string())
}

fn render_display(body: &str, tag: Option<&str>, preview: bool) -> String {
    if preview {
        return format!("${}$", collapse_whitespace(body));
    }
    match tag {
        Some(tag) => format!("\n$$\n{} \\tag{{{}}}\n$$\n", body.trim(), tag),
        None => format!("\n$$\n{}\n$$\n", body.trim()),
    }
}

fn render_inline(body: &str) -> String {
    format!("${}$", body.trim())
}

fn render_environment(
    env: &MathEnv,
    body: &str,
    colors: &ColorTable,
    labels: &LabelMap,
    preview: bool,
) -> String {
    let tag = if env.numbered {
        equation_tag(body, labels)
    } else {
        None
    };
    let cleaned = clean_math(body, colors);
    match env.form {
        MathForm::Display => render_display(&cleaned, tag.as_deref(), preview),
        MathForm::Group(group) => {
            if preview {
                return EQUATIONS_PREVIEW.to_string();
            }
            let mut cleaned = NONUMBER_RE.replace_all(&cleaned, "").into_owned();
            if env.name.contains("eqnarray") {
                cleaned = collapse_eqnarray_columns(&cleaned);
            }
            format!(
                "\n$$\n\\begin{{{g}}}\n{}\n\\end{{{g}}}\n$$\n",
                cleaned.trim(),
                g = group
            )
        }
    }
}

/// Protect every math family, display forms first.
pub fn protect_math(input: &str, ctx: &mut TranspileContext) -> String {
    let preview = ctx.options.preview;
    let colors = &ctx.colors;
    let labels = &ctx.labels;
    let blocks = &mut ctx.blocks;

    let mut out = blocks.protect_delimited(input, "\\[", "\\]", |body| {
        Some(render_display(&clean_math(body, colors), None, preview))
    });

    for env in MATH_ENVIRONMENTS {
        out = blocks.protect_environment(&out, env.name, 0, env.required, |span| {
            Some(render_environment(env, &span.body, colors, labels, preview))
        });
    }

    out = blocks.protect_delimited(&out, "$$", "$$", |body| {
        Some(render_display(&clean_math(body, colors), None, preview))
    });
    out = blocks.protect_delimited(&out, "\\(", "\\)", |body| {
        Some(render_inline(&clean_math(body, colors)))
    });
    out = blocks.protect_environment(&out, "math", 0, 0, |span| {
        Some(render_inline(&clean_math(&span.body, colors)))
    });
    blocks.protect_inline_dollars(&out, |body| render_inline(&clean_math(body, colors)))
}
