//! Query text to highlight/filter regex.
//!
//! Free text is escaped, split into whitespace-separated terms and compiled
//! into a case-insensitive alternation `(term1|term2|...)`.
//!
//! An empty or absent query yields the degenerate alternation `()`, which
//! matches at every position. That is kept as "match everything" rather than
//! guessing a stricter intent.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Matches the characters that must be escaped before compiling user text.
static META_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\^$*+?.():|{}\[\]=!,]").expect("metachar class is a valid regex"));

/// Escape regex metacharacters in raw query text.
pub fn escape_query(query: &str) -> String {
    META_CHARS.replace_all(query, r"\$0").into_owned()
}

/// Compile the case-insensitive term alternation for a query.
pub fn build_regex(query: Option<&str>) -> Regex {
    let escaped = escape_query(query.unwrap_or_default());
    let terms: Vec<&str> = escaped.split_whitespace().collect();
    let pattern = format!("({})", terms.join("|"));

    // Every term is escaped, so the pattern always compiles.
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|_| match_all())
}

fn match_all() -> Regex {
    static EMPTY: LazyLock<Regex> = LazyLock::new(|| Regex::new("()").expect("empty group is a valid regex"));
    EMPTY.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_is_literal() {
        let re = build_regex(Some("a.b"));
        assert!(re.is_match("xx a.b yy"));
        assert!(!re.is_match("axb"));
    }

    #[test]
    fn test_terms_are_alternatives() {
        let re = build_regex(Some("foo bar"));
        assert!(re.is_match("only FOO here"));
        assert!(re.is_match("Bar at start"));
        assert!(!re.is_match("baz qux"));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let re = build_regex(Some("  foo   bar "));
        assert_eq!(re.as_str(), "(foo|bar)");
    }

    #[test]
    fn test_all_metachars_escaped() {
        let raw = r"\^$*+?.():|{}[]=!,";
        let re = build_regex(Some(raw));
        assert!(re.is_match(raw));
        assert!(!re.is_match("plain"));
    }

    #[test]
    fn test_escape_query() {
        assert_eq!(escape_query("a+b"), r"a\+b");
        assert_eq!(escape_query("f(x)=1"), r"f\(x\)\=1");
        assert_eq!(escape_query("plain-text"), "plain-text");
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(build_regex(None).is_match("anything"));
        assert!(build_regex(Some("   ")).is_match(""));
    }
}
