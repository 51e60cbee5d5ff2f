//! Text-mode symbol and accent tables

use phf::phf_map;

/// Word-like text commands and their rendering.
pub static TEXT_SYMBOLS: phf::Map<&'static str, &'static str> = phf_map! {
    "ldots" => "…",
    "dots" => "…",
    "textellipsis" => "…",
    "S" => "§",
    "P" => "¶",
    "copyright" => "©",
    "textcopyright" => "©",
    "textregistered" => "®",
    "texttrademark" => "™",
    "dag" => "†",
    "dagger" => "†",
    "ddag" => "‡",
    "ddagger" => "‡",
    "ss" => "ß",
    "ae" => "æ",
    "AE" => "Æ",
    "oe" => "œ",
    "OE" => "Œ",
    "aa" => "å",
    "AA" => "Å",
    "o" => "ø",
    "O" => "Ø",
    "l" => "ł",
    "L" => "Ł",
    "i" => "ı",
    "j" => "ȷ",
    "LaTeX" => "LaTeX",
    "LaTeXe" => "LaTeX2ε",
    "TeX" => "TeX",
    "textbackslash" => "&#92;",
    "textasciitilde" => "&#126;",
    "textasciicircum" => "^",
    "textunderscore" => "\\_",
    "textbar" => "|",
    "textless" => "&lt;",
    "textgreater" => "&gt;",
    "textbullet" => "•",
    "textperiodcentered" => "·",
    "textdegree" => "°",
    "textendash" => "&ndash;",
    "textemdash" => "&mdash;",
    "textquoteleft" => "‘",
    "textquoteright" => "’",
    "textquotedblleft" => "“",
    "textquotedblright" => "”",
    "guillemotleft" => "«",
    "guillemotright" => "»",
    "textexclamdown" => "¡",
    "textquestiondown" => "¿",
    "pounds" => "£",
    "textsterling" => "£",
    "euro" => "€",
    "texteuro" => "€",
    "checkmark" => "✓",
    "today" => "",
};

/// Combining marks for accent commands, used when no precomposed form exists.
pub static ACCENT_MARKS: phf::Map<&'static str, &'static str> = phf_map! {
    "'" => "\u{0301}",
    "`" => "\u{0300}",
    "^" => "\u{0302}",
    "\"" => "\u{0308}",
    "~" => "\u{0303}",
    "=" => "\u{0304}",
    "." => "\u{0307}",
    "c" => "\u{0327}",
    "v" => "\u{030C}",
    "u" => "\u{0306}",
    "H" => "\u{030B}",
    "k" => "\u{0328}",
    "r" => "\u{030A}",
};

/// Accent command + base letter -> precomposed character.
pub static PRECOMPOSED: phf::Map<&'static str, &'static str> = phf_map! {
    "'a" => "á", "'e" => "é", "'i" => "í", "'o" => "ó", "'u" => "ú", "'y" => "ý",
    "'A" => "Á", "'E" => "É", "'I" => "Í", "'O" => "Ó", "'U" => "Ú", "'Y" => "Ý",
    "'n" => "ń", "'c" => "ć", "'s" => "ś", "'z" => "ź",
    "`a" => "à", "`e" => "è", "`i" => "ì", "`o" => "ò", "`u" => "ù",
    "`A" => "À", "`E" => "È", "`I" => "Ì", "`O" => "Ò", "`U" => "Ù",
    "^a" => "â", "^e" => "ê", "^i" => "î", "^o" => "ô", "^u" => "û",
    "^A" => "Â", "^E" => "Ê", "^I" => "Î", "^O" => "Ô", "^U" => "Û",
    "\"a" => "ä", "\"e" => "ë", "\"i" => "ï", "\"o" => "ö", "\"u" => "ü", "\"y" => "ÿ",
    "\"A" => "Ä", "\"E" => "Ë", "\"I" => "Ï", "\"O" => "Ö", "\"U" => "Ü",
    "~a" => "ã", "~n" => "ñ", "~o" => "õ",
    "~A" => "Ã", "~N" => "Ñ", "~O" => "Õ",
    "cc" => "ç", "cC" => "Ç", "cs" => "ş", "cS" => "Ş",
    "vs" => "š", "vS" => "Š", "vc" => "č", "vC" => "Č", "vz" => "ž", "vZ" => "Ž",
    "vr" => "ř", "vR" => "Ř", "ve" => "ě", "vE" => "Ě", "vn" => "ň",
    "ra" => "å", "rA" => "Å", "ru" => "ů", "rU" => "Ů",
    "ug" => "ğ", "uG" => "Ğ", "ua" => "ă", "uA" => "Ă",
    "Ho" => "ő", "HO" => "Ő", "Hu" => "ű", "HU" => "Ű",
    "ka" => "ą", "kA" => "Ą", "ke" => "ę", "kE" => "Ę",
    "=a" => "ā", "=e" => "ē", "=i" => "ī", "=o" => "ō", "=u" => "ū",
    ".z" => "ż", ".Z" => "Ż", ".I" => "İ",
};

/// Compose an accent with a base letter.
pub fn compose_accent(accent: &str, letter: &str) -> String {
    let key = format!("{}{}", accent, letter);
    if let Some(composed) = PRECOMPOSED.get(key.as_str()) {
        return (*composed).to_string();
    }
    match ACCENT_MARKS.get(accent) {
        Some(mark) => format!("{}{}", letter, mark),
        None => letter.to_string(),
    }
}
