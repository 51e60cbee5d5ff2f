//! Color handling
//!
//! The built-in palette plus per-call definitions from `\definecolor` and `\colorlet`.

use fxhash::FxHashMap;
use phf::phf_map;

/// Palette used for the academic environment tags and bare color names.
pub static BUILTIN_PALETTE: phf::Map<&'static str, &'static str> = phf_map! {
    "blue" => "#1e88e5",
    "green" => "#43a047",
    "red" => "#e53935",
    "gray" => "#757575",
    "orange" => "#fb8c00",
    "purple" => "#8e24aa",
};

/// Color name -> CSS value table, created fresh for every conversion.
#[derive(Debug, Clone, Default)]
pub struct ColorTable {
    custom: FxHashMap<String, String>,
}

impl ColorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` from a `\definecolor{name}{model}{spec}` triple.
    /// Returns false when the model or spec can't be parsed; the table is unchanged.
    pub fn define(&mut self, name: &str, model: &str, spec: &str) -> bool {
        match parse_color_with_model(model, spec) {
            Some(value) => {
                self.custom.insert(name.trim().to_string(), value);
                true
            }
            None => false,
        }
    }

    /// `\colorlet{name}{other}`
    pub fn alias(&mut self, name: &str, other: &str) {
        let value = self.resolve(other);
        self.custom.insert(name.trim().to_string(), value);
    }

    /// Resolve a color expression. `name!pct` mixes resolve to the base color and
    /// unknown names come back literally.
    pub fn resolve(&self, expr: &str) -> String {
        let expr = expr.trim();
        let base = expr.split('!').next().unwrap_or(expr).trim();
        if let Some(value) = self.custom.get(base) {
            return value.clone();
        }
        if let Some(value) = BUILTIN_PALETTE.get(base) {
            return (*value).to_string();
        }
        base.to_string()
    }

    /// Resolve `[model]{spec}` or `{name}`.
    pub fn resolve_with_model(&self, model: Option<&str>, spec: &str) -> String {
        match model {
            Some(model) => {
                parse_color_with_model(model, spec).unwrap_or_else(|| spec.trim().to_string())
            }
            None => self.resolve(spec),
        }
    }

    /// Number of user-defined colors.
    pub fn len(&self) -> usize {
        self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.custom.is_empty()
    }
}

/// Parse a color given in one of the xcolor models into `#rrggbb`.
pub fn parse_color_with_model(model: &str, spec: &str) -> Option<String> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    match model.trim() {
        "rgb" => {
            let [r, g, b] = parts.as_slice() else {
                return None;
            };
            Some(hex_triplet(
                fraction_to_byte(r)?,
                fraction_to_byte(g)?,
                fraction_to_byte(b)?,
            ))
        }
        "RGB" => {
            let [r, g, b] = parts.as_slice() else {
                return None;
            };
            let channel = |s: &str| s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
            Some(hex_triplet(channel(r)?, channel(g)?, channel(b)?))
        }
        "HTML" | "html" => {
            let hex = spec.trim().trim_start_matches('#');
            if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                Some(format!("#{}", hex.to_ascii_lowercase()))
            } else {
                None
            }
        }
        "gray" => {
            let [g] = parts.as_slice() else {
                return None;
            };
            let v = fraction_to_byte(g)?;
            Some(hex_triplet(v, v, v))
        }
        "cmyk" => {
            let [c, m, y, k] = parts.as_slice() else {
                return None;
            };
            let frac = |s: &str| s.parse::<f64>().ok().map(|v| v.clamp(0.0, 1.0));
            let (c, m, y, k) = (frac(c)?, frac(m)?, frac(y)?, frac(k)?);
            let to_byte = |v: f64| (255.0 * (1.0 - v) * (1.0 - k)).round() as u8;
            Some(hex_triplet(to_byte(c), to_byte(m), to_byte(y)))
        }
        _ => None,
    }
}

fn fraction_to_byte(s: &str) -> Option<u8> {
    s.parse::<f64>()
        .ok()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn hex_triplet(r: u8, g: u8, b: u8) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models() {
        assert_eq!(parse_color_with_model("rgb", "1, 0, 0.5").as_deref(), Some("#ff0080"));
        assert_eq!(parse_color_with_model("RGB", "0,128,255").as_deref(), Some("#0080ff"));
        assert_eq!(parse_color_with_model("HTML", "AABBCC").as_deref(), Some("#aabbcc"));
        assert_eq!(parse_color_with_model("gray", "0.5").as_deref(), Some("#808080"));
        assert_eq!(parse_color_with_model("cmyk", "0,0,0,1").as_deref(), Some("#000000"));
        assert_eq!(parse_color_with_model("hsb", "1,1,1"), None);
        assert_eq!(parse_color_with_model("rgb", "1,0"), None);
    }

    #[test]
    fn test_resolve() {
        let mut colors = ColorTable::new();
        assert!(colors.define("brand", "HTML", "112233"));
        colors.alias("accent", "brand");
        assert_eq!(colors.resolve("brand"), "#112233");
        assert_eq!(colors.resolve("accent"), "#112233");
        assert_eq!(colors.resolve("red!30"), "#e53935");
        assert_eq!(colors.resolve("teal"), "teal");
        assert_eq!(colors.len(), 2);
    }
}
