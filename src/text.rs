//! String cleanup applied cell by cell to text columns.

use std::sync::LazyLock;

use regex::Regex;

static PLURAL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\((s|es)\)").expect("valid regex"));

static FIRST_BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("valid regex"));

pub fn strip_spaces(value: &str) -> String {
    value.trim().to_string()
}

pub fn remove_text(value: &str, literal: &str) -> String {
    if literal.is_empty() {
        return value.to_string();
    }
    value.replace(literal, "")
}

/// `"tablet(s)"` → `"tablet"`, `"box(es)"` → `"box"`.
pub fn clean_bracketed(value: &str) -> String {
    PLURAL_MARKER.replace_all(value, "").trim().to_string()
}

/// `"1 cup (240 ml)"` → `"240 ml"`. `None` if there is no parenthetical.
pub fn extract_bracketed(value: &str) -> Option<String> {
    FIRST_BRACKETED
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Daily-value cells such as `"15%"` lose the percent sign.
pub fn strip_percent(value: &str) -> String {
    value.replace('%', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_spaces() {
        assert_eq!(strip_spaces("  Cola \t"), "Cola");
    }

    #[test]
    fn test_remove_text() {
        assert_eq!(remove_text("12 g per serving", " per serving"), "12 g");
        assert_eq!(remove_text("abc", ""), "abc");
    }

    #[test]
    fn test_clean_bracketed() {
        assert_eq!(clean_bracketed("2 tablet(s)"), "2 tablet");
        assert_eq!(clean_bracketed("1 BOX(ES) "), "1 BOX");
        assert_eq!(clean_bracketed("1 cup (240 ml)"), "1 cup (240 ml)");
    }

    #[test]
    fn test_extract_bracketed() {
        assert_eq!(extract_bracketed("1 cup ( 240 ml )").as_deref(), Some("240 ml"));
        assert_eq!(extract_bracketed("2 (a) (b)").as_deref(), Some("a"));
        assert_eq!(extract_bracketed("no brackets"), None);
    }

    #[test]
    fn test_strip_percent() {
        assert_eq!(strip_percent("15%"), "15");
    }
}
