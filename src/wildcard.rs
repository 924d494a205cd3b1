//! Case-insensitive `*`/`?` wildcard patterns.
//!
//! Built on `glob::Pattern`, with `[`/`]` escaped so that only `*` and `?`
//! are special.

use glob::{MatchOptions, Pattern, PatternError};

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// True if `text` contains `*` or `?`.
pub fn has_wildcard(text: &str) -> bool {
    text.contains(['*', '?'])
}

/// Compile a wildcard pattern.
pub fn compile(text: &str) -> Result<Pattern, PatternError> {
    let mut escaped = String::with_capacity(text.len());
    let mut previous_star = false;
    for c in text.chars() {
        match c {
            // glob rejects `**` unless it is a whole path component
            '*' if previous_star => continue,
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            _ => escaped.push(c),
        }
        previous_star = c == '*';
    }
    Pattern::new(&escaped)
}

/// Match `candidate` against an already compiled pattern.
pub fn matches(pattern: &Pattern, candidate: &str) -> bool {
    pattern.matches_with(candidate, OPTIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_match(pattern: &str, candidate: &str) -> bool {
        matches(&compile(pattern).unwrap(), candidate)
    }

    #[test]
    fn test_has_wildcard() {
        assert!(has_wildcard("nu*"));
        assert!(has_wildcard("n?get"));
        assert!(!has_wildcard("nuget"));
        assert!(!has_wildcard("[nuget]"));
    }

    #[test]
    fn test_star_and_question_mark() {
        assert!(is_match("*", "anything"));
        assert!(is_match("*", ""));
        assert!(is_match("zl*", "zlib"));
        assert!(is_match("z?ib", "zlib"));
        assert!(!is_match("z?ib", "zlb"));
        assert!(is_match("a**b", "axxb"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_match("ZLIB", "zlib"));
        assert!(is_match("Module\\Name", "module\\name"));
    }

    #[test]
    fn test_brackets_are_literal() {
        assert!(is_match("pkg[1]", "pkg[1]"));
        assert!(!is_match("pkg[1]", "pkg1"));
        assert!(is_match("owner/repo", "owner/repo"));
    }
}
