//! Scalar rendering for injected keys and values.

use once_cell::sync::Lazy;
use regex::Regex;

static PLAIN_SAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_./-]*$").expect("valid regex"));

static NUMERIC_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?[0-9_.:]+([eE][-+]?[0-9]+)?$").expect("valid regex")
});

static INT_PREFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?0[bBoOxX][0-9A-Fa-f_]*$").expect("valid regex"));

/// Words a YAML 1.1 or 1.2 loader resolves to null or a boolean.
const RESERVED_WORDS: &[&str] = &[
    "null", "Null", "NULL", "~", "true", "True", "TRUE", "false", "False", "FALSE", "yes",
    "Yes", "YES", "no", "No", "NO", "on", "On", "ON", "off", "Off", "OFF", "y", "Y", "n", "N",
    ".inf", ".Inf", ".INF", ".nan", ".NaN", ".NAN",
];

/// Whether `s` would be read back as something other than the string `s`.
fn resolves_as_non_string(s: &str) -> bool {
    RESERVED_WORDS.contains(&s)
        || s.parse::<f64>().is_ok()
        || NUMERIC_LIKE.is_match(s)
        || INT_PREFIXED.is_match(s)
}

/// Render `s` as a YAML scalar: plain when that reads back as the same
/// string, double-quoted otherwise.
pub fn render_scalar(s: &str) -> String {
    if PLAIN_SAFE.is_match(s) && !resolves_as_non_string(s) {
        return s.to_string();
    }
    double_quoted(s)
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
