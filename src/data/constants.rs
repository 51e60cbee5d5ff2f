//! Constants and lookup tables for the structural phases

use phf::phf_map;

/// How far back (in characters) a `\label` looks for a heading command.
pub const LABEL_LOOKBACK_CHARS: usize = 50;

/// Replacement for `\pageref`; pages don't exist in the output.
pub const PAGE_UNRESOLVED: &str = "[p. ?]";
pub const UNRESOLVED_REFERENCE: &str = "??";
pub const UNRESOLVED_CITATION: &str = "?";

// Preview stand-ins
pub const TABLE_PREVIEW: &str = "[tabla]";
pub const ARRAY_PREVIEW: &str = "[matriz]";
pub const EQUATIONS_PREVIEW: &str = "[ecuaciones]";
pub const IMAGE_PREVIEW: &str = "[imagen]";

pub const DEFAULT_VERBATIM_PREVIEW_CHARS: usize = 80;
pub const DEFAULT_ENVIRONMENT_PREVIEW_CHARS: usize = 120;

pub const CAPTION_LABEL: &str = "Caption:";
pub const QED_MARK: &str = "∎";

/// Heading commands and their Markdown level.
pub const HEADING_LEVELS: &[(&str, usize)] = &[
    ("part", 1),
    ("chapter", 1),
    ("section", 1),
    ("subsection", 2),
    ("subsubsection", 3),
    ("paragraph", 4),
    ("subparagraph", 5),
];

/// Display data for a theorem-like environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcademicEnv {
    pub label: &'static str,
    /// Key into the built-in palette
    pub color: &'static str,
    pub italic: bool,
}

const fn env(label: &'static str, color: &'static str, italic: bool) -> AcademicEnv {
    AcademicEnv {
        label,
        color,
        italic,
    }
}

pub static ACADEMIC_ENVIRONMENTS: phf::Map<&'static str, AcademicEnv> = phf_map! {
    "theorem" => env("Teorema", "blue", true),
    "lemma" => env("Lema", "blue", true),
    "corollary" => env("Corolario", "blue", true),
    "proposition" => env("Proposición", "blue", true),
    "conjecture" => env("Conjetura", "blue", true),
    "definition" => env("Definición", "green", false),
    "example" => env("Ejemplo", "green", false),
    "remark" => env("Observación", "gray", false),
    "note" => env("Nota", "gray", false),
    "exercise" => env("Ejercicio", "red", false),
    "problem" => env("Problema", "red", false),
    "solution" => env("Solución", "green", false),
    "proof" => env("Demostración", "gray", false),
    "abstract" => env("Resumen", "gray", false),
    "quote" => env("", "gray", false),
    "quotation" => env("", "gray", false),
    "verse" => env("", "gray", false),
    "tabbing" => env("", "gray", false),
    "thebibliography" => env("Referencias", "gray", false),
};

/// Short names people commonly `\newtheorem` without declaring.
pub static ENVIRONMENT_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "thm" => "theorem",
    "lem" => "lemma",
    "cor" => "corollary",
    "prop" => "proposition",
    "defn" => "definition",
    "dfn" => "definition",
    "ex" => "example",
    "rem" => "remark",
};

/// Font size switches, in points.
pub static SIZE_SCALE: phf::Map<&'static str, u8> = phf_map! {
    "tiny" => 8,
    "scriptsize" => 9,
    "footnotesize" => 10,
    "small" => 11,
    "normalsize" => 12,
    "large" => 14,
    "Large" => 16,
    "LARGE" => 18,
    "huge" => 20,
    "Huge" => 24,
};

/// Inline text style produced by formatting commands and declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Monospace,
    SansSerif,
    SmallCaps,
    Strike,
    Superscript,
    Subscript,
    Plain,
}

impl InlineStyle {
    /// Wrap already-converted text in this style.
    pub fn wrap(self, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }
        match self {
            InlineStyle::Bold => format!("**{}**", text),
            InlineStyle::Italic => format!("*{}*", text),
            InlineStyle::Underline => format!("<u>{}</u>", text),
            InlineStyle::Monospace => format!("<code>{}</code>", text),
            InlineStyle::SansSerif => {
                format!("<span style=\"font-family: sans-serif;\">{}</span>", text)
            }
            InlineStyle::SmallCaps => {
                format!("<span style=\"font-variant: small-caps;\">{}</span>", text)
            }
            InlineStyle::Strike => format!("<del>{}</del>", text),
            InlineStyle::Superscript => format!("<sup>{}</sup>", text),
            InlineStyle::Subscript => format!("<sub>{}</sub>", text),
            InlineStyle::Plain => text.to_string(),
        }
    }

    /// Same as [`wrap`](Self::wrap), for contexts where Markdown isn't parsed
    /// (table cells).
    pub fn wrap_html(self, text: &str) -> String {
        match self {
            InlineStyle::Bold if !text.trim().is_empty() => {
                format!("<strong>{}</strong>", text.trim())
            }
            InlineStyle::Italic if !text.trim().is_empty() => format!("<em>{}</em>", text.trim()),
            _ => self.wrap(text),
        }
    }
}

/// `\textbf{..}`-style commands.
pub static TEXT_FORMAT_COMMANDS: phf::Map<&'static str, InlineStyle> = phf_map! {
    "textbf" => InlineStyle::Bold,
    "textit" => InlineStyle::Italic,
    "emph" => InlineStyle::Italic,
    "textsl" => InlineStyle::Italic,
    "underline" => InlineStyle::Underline,
    "uline" => InlineStyle::Underline,
    "texttt" => InlineStyle::Monospace,
    "textsf" => InlineStyle::SansSerif,
    "textsc" => InlineStyle::SmallCaps,
    "sout" => InlineStyle::Strike,
    "st" => InlineStyle::Strike,
    "textsuperscript" => InlineStyle::Superscript,
    "textsubscript" => InlineStyle::Subscript,
    "textrm" => InlineStyle::Plain,
    "textnormal" => InlineStyle::Plain,
    "textup" => InlineStyle::Plain,
    "textmd" => InlineStyle::Plain,
};

/// `{\bf ..}`-style declarations.
pub static FONT_DECLARATIONS: phf::Map<&'static str, InlineStyle> = phf_map! {
    "bf" => InlineStyle::Bold,
    "bfseries" => InlineStyle::Bold,
    "it" => InlineStyle::Italic,
    "itshape" => InlineStyle::Italic,
    "em" => InlineStyle::Italic,
    "sl" => InlineStyle::Italic,
    "slshape" => InlineStyle::Italic,
    "tt" => InlineStyle::Monospace,
    "ttfamily" => InlineStyle::Monospace,
    "sf" => InlineStyle::SansSerif,
    "sffamily" => InlineStyle::SansSerif,
    "sc" => InlineStyle::SmallCaps,
    "scshape" => InlineStyle::SmallCaps,
    "rm" => InlineStyle::Plain,
    "rmfamily" => InlineStyle::Plain,
    "upshape" => InlineStyle::Plain,
    "normalfont" => InlineStyle::Plain,
    "mdseries" => InlineStyle::Plain,
};
