//! Path patterns with `:name` parameters.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Named path parameters, stringified at insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("path '{pattern}' needs parameter ':{name}'")]
pub struct MissingParameter {
    pub pattern: &'static str,
    pub name: String,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn join(parts: Vec<String>) -> String {
    format!("/{}", parts.join("/"))
}

/// Parameter names in `pattern`, in order.
pub fn parameter_names(pattern: &str) -> Vec<&str> {
    segments(pattern)
        .filter_map(|s| s.strip_prefix(':'))
        .collect()
}

/// Substitutes `:key` tokens from `params`. Tokens with no value are kept
/// verbatim, so the result may still contain `:key`.
pub fn interpolate(pattern: &str, params: &Params) -> String {
    let parts = segments(pattern)
        .map(|seg| match seg.strip_prefix(':') {
            Some(name) => params.get(name).unwrap_or(seg).to_string(),
            None => seg.to_string(),
        })
        .collect();
    join(parts)
}

/// Like [`interpolate`] but refuses to leave a token unfilled.
pub fn interpolate_strict(
    pattern: &'static str,
    params: &Params,
) -> Result<String, MissingParameter> {
    let mut parts = Vec::new();
    for seg in segments(pattern) {
        match seg.strip_prefix(':') {
            Some(name) => match params.get(name) {
                Some(value) if !value.is_empty() => parts.push(value.to_string()),
                _ => {
                    return Err(MissingParameter {
                        pattern,
                        name: name.to_string(),
                    })
                }
            },
            None => parts.push(seg.to_string()),
        }
    }
    Ok(join(parts))
}

/// Matches a concrete path against `pattern`, capturing parameters.
///
/// Query strings and fragments are ignored, as are empty segments
/// (`/posts/` matches `/posts`).
pub fn match_path(pattern: &str, path: &str) -> Option<Params> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut expected = segments(pattern);
    let mut actual = segments(path);
    let mut params = Params::new();
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return Some(params),
            (Some(p), Some(a)) => match p.strip_prefix(':') {
                Some(name) => params.insert(name, a),
                None if p == a => {}
                None => return None,
            },
            _ => return None,
        }
    }
}

/// Count of literal segments; more literal segments means a more specific
/// pattern.
pub fn specificity(pattern: &str) -> usize {
    segments(pattern).filter(|s| !s.starts_with(':')).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn interpolate_fills_tokens() {
        let params = Params::new().with("id", 42);
        assert_eq!(interpolate("/posts/:id", &params), "/posts/42");
        assert_eq!(interpolate("/posts/:id/edit", &params), "/posts/42/edit");
        assert_eq!(interpolate("/", &params), "/");
    }

    #[test]
    fn interpolate_keeps_unfilled_tokens() {
        assert_eq!(interpolate("/posts/:id", &Params::new()), "/posts/:id");
        let unrelated = Params::new().with("idx", 1);
        assert_eq!(interpolate("/posts/:id", &unrelated), "/posts/:id");
    }

    #[test]
    fn strict_reports_missing_token() {
        let err = interpolate_strict("/posts/:id/comments", &Params::new()).unwrap_err();
        assert_eq!(err.name, "id");
        assert_eq!(
            err.to_string(),
            "path '/posts/:id/comments' needs parameter ':id'"
        );
        assert_eq!(
            interpolate_strict("/posts/:id", &Params::new().with("id", 7)).unwrap(),
            "/posts/7"
        );
    }

    #[test]
    fn match_captures_and_rejects() {
        let params = match_path("/posts/:id/edit", "/posts/9/edit").unwrap();
        assert_eq!(params.get("id"), Some("9"));
        assert!(match_path("/posts/:id/edit", "/posts/9").is_none());
        assert!(match_path("/posts", "/comments").is_none());
        assert!(match_path("/", "/").unwrap().is_empty());
        assert!(match_path("/posts", "/posts/?page=2").is_some());
    }

    #[test]
    fn parameter_names_in_order() {
        assert_eq!(parameter_names("/a/:x/b/:y"), vec!["x", "y"]);
        assert!(parameter_names("/posts").is_empty());
    }

    proptest! {
        #[test]
        fn interpolated_path_matches_its_pattern(id in "[a-z0-9]{1,12}") {
            let params = Params::new().with("id", &id);
            for pattern in ["/posts/:id", "/posts/:id/edit", "/posts/:id/comments"] {
                let path = interpolate(pattern, &params);
                let captured = match_path(pattern, &path);
                prop_assert_eq!(captured, Some(params.clone()));
            }
        }
    }
}
