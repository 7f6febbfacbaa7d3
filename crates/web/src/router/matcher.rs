//! Path pattern matching.
//!
//! A pattern is a `/`-delimited sequence of literal segments and parameter
//! segments written `[name]`. Matching is a single left-to-right pass over
//! equally long segment lists:
//!
//! - the query string of the request path is ignored
//! - the root pattern `/` matches only the path `/`
//! - for other patterns, one trailing `/` of the path is ignored
//! - a parameter segment accepts one or more of `[A-Za-z0-9_-]`
//!
//! Matching never fails with an error: anything that does not line up is
//! simply not a match.

use tracing::trace;

use crate::PathParams;

const ROOT: &str = "/";

/// Returns true if `path` matches `pattern`
pub fn matches(pattern: &str, path: &str) -> bool {
    walk(pattern, path, |_, _| {})
}

/// Matches `path` against `pattern`, returning the captured `[name]` values on success
pub fn capture(pattern: &str, path: &str) -> Option<PathParams> {
    let mut params = PathParams::empty();
    walk(pattern, path, |name, value| params.push(name, value)).then_some(params)
}

/// Returns true if `segment` is an acceptable parameter value
///
/// Only letters, digits, `_` and `-` are allowed, which keeps `..`, encoded
/// slashes and other traversal tricks out of parameters.
pub fn is_valid_param(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn walk<'p, 'r>(pattern: &'p str, path: &'r str, mut on_param: impl FnMut(&'p str, &'r str)) -> bool {
    let path = path.split_once('?').map_or(path, |(path, _query)| path);

    if pattern == ROOT {
        return path == ROOT;
    }

    let path = path.strip_suffix('/').unwrap_or(path);

    if pattern.split('/').count() != path.split('/').count() {
        return false;
    }

    for (expected, actual) in pattern.split('/').zip(path.split('/')) {
        let param = param_name(expected);

        if expected == actual {
            if let Some(name) = param {
                on_param(name, actual);
            }
            continue;
        }

        match param {
            Some(name) if is_valid_param(actual) => on_param(name, actual),
            Some(name) => {
                trace!(pattern, param = name, value = actual, "rejected parameter value");
                return false;
            }
            None => return false,
        }
    }

    true
}

fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('[')?.strip_suffix(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_literal_and_param_segments() {
        assert!(matches("/users/[id]", "/users/42"));
        assert!(matches("/users/[id]/edit", "/users/user_42-a/edit"));
        assert!(matches("/about", "/about"));
        assert!(!matches("/about", "/About"));
        assert!(!matches("/users/[id]/edit", "/users/42/show"));
    }

    #[test]
    fn captures_param_values() {
        let params = capture("/users/[id]", "/users/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);

        assert!(capture("/users/[id]", "/users/42/extra").is_none());
    }

    #[test]
    fn segment_count_must_be_equal() {
        assert!(!matches("/[id]/edit", "/5"));
        assert!(!matches("/users/[id]", "/users/42/extra"));
        assert!(!matches("/users/[id]", "/users"));
    }

    #[test]
    fn root_matches_only_root() {
        assert!(matches("/", "/"));
        assert!(matches("/", "/?page=2"));
        assert!(!matches("/", "//"));
        assert!(!matches("/", ""));
        assert!(!matches("/", "/home"));
    }

    #[test]
    fn one_trailing_slash_is_ignored() {
        assert!(matches("/users/[id]", "/users/42/"));
        assert!(matches("/login", "/login/"));
        assert!(!matches("/login", "/login//"));
        assert!(!matches("/users/[id]", "/users//"));
    }

    #[test]
    fn query_string_is_ignored() {
        assert!(matches("/users/[id]", "/users/42?k=v"));
        assert!(matches("/users/[id]", "/users/42/?k=v"));
        assert!(!matches("/users/[id]", "/users/?id=42"));
    }

    #[test]
    fn param_values_are_restricted() {
        assert!(!matches("/files/[name]", "/files/.."));
        assert!(!matches("/files/[name]", "/files/a.txt"));
        assert!(!matches("/files/[name]", "/files/%2e%2e"));
        assert!(!matches("/files/[name]", "/files/a%2Fb"));
        assert!(!matches("/files/[name]", "/files/über"));
        assert!(!matches("/files/[name]", "/files/a b"));
    }

    #[test]
    fn param_character_class() {
        assert!(is_valid_param("abc-DEF_123"));
        assert!(!is_valid_param(""));
        assert!(!is_valid_param("a/b"));
        assert!(!is_valid_param("a.b"));
    }

    #[test]
    fn malformed_patterns_never_panic() {
        assert!(!matches("/users/[id", "/users/42"));
        assert!(!matches("/users/id]", "/users/42"));
        assert!(matches("/users/[", "/users/["));
        assert!(!matches("", "/users"));
        assert!(matches("/users/[]", "/users/42"));
        assert!(!matches("/users/", "/users/"));
    }

    #[test]
    fn literal_bracket_segment_equal_to_pattern_matches() {
        let params = capture("/tags/[tag]", "/tags/[tag]").unwrap();
        assert_eq!(params.get("tag"), Some("[tag]"));
    }
}
