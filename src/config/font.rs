//! Font stack normalization.
//!
//! A font stack is a comma-separated list of families as accepted by the
//! rendering surface. Multi-word family names must be quoted, generic
//! keywords must not be.

/// CSS generic font keywords, compared case-insensitively
const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-monospace",
    "emoji",
    "math",
    "fangsong",
];

/// Normalize a font stack, returning `None` when nothing usable is left.
///
/// `"GoMono Nerd Font Mono, monospace"` becomes
/// `"'GoMono Nerd Font Mono', monospace"`.
pub fn normalize_font_family(raw: &str) -> Option<String> {
    let families: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(quote_family)
        .collect();

    if families.is_empty() {
        None
    } else {
        Some(families.join(", "))
    }
}

fn quote_family(family: &str) -> String {
    if family.starts_with('\'') || family.starts_with('"') {
        return family.to_string();
    }
    if is_generic_family(family) {
        return family.to_string();
    }
    if family.chars().any(char::is_whitespace) {
        return format!("'{}'", family.replace('\'', "\\'"));
    }
    family.to_string()
}

fn is_generic_family(family: &str) -> bool {
    GENERIC_FAMILIES
        .iter()
        .any(|generic| generic.eq_ignore_ascii_case(family))
}
