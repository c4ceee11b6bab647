//! Path pattern compilation and matching.

use regex::Regex;

use crate::error::{Result, RouteError};
use crate::request::{ParamValue, PathParams};

/// How a captured parameter is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Any run of non-slash characters, kept as text.
    Str,
    /// Digits only, converted to `i64`.
    Int,
}

impl ParamKind {
    /// Maps a `{name:tag}` tag to a converter. Unknown tags fall back to
    /// [`ParamKind::Str`].
    fn from_tag(tag: &str) -> Self {
        match tag {
            "int" => Self::Int,
            _ => Self::Str,
        }
    }

    fn regex(self) -> &'static str {
        match self {
            Self::Int => r"(\d+)",
            Self::Str => "([^/]+)",
        }
    }

    fn convert(self, raw: &str) -> Option<ParamValue> {
        match self {
            Self::Int => raw.parse().ok().map(ParamValue::Int),
            Self::Str => Some(ParamValue::Str(raw.to_string())),
        }
    }
}

/// A compiled path pattern for matching URLs.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Compiled regex for matching.
    regex: Regex,
    /// Parameters in the order they appear.
    params: Vec<(String, ParamKind)>,
}

impl PathPattern {
    /// Compiles a path template.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/{id}` - Parameter captured as text
    /// - `/users/{id:int}` - Parameter captured as an integer
    ///
    /// # Example
    ///
    /// ```
    /// use pathium::PathPattern;
    ///
    /// let pattern = PathPattern::new("/posts/{id:int}/comments/{slug}").unwrap();
    /// let params = pattern.match_path("/posts/123/comments/first").unwrap();
    /// assert_eq!(params.int("id"), Some(123));
    /// assert_eq!(params.str("slug"), Some("first"));
    /// ```
    ///
    /// # Errors
    ///
    /// Fails on an unterminated `{`, an empty or repeated parameter name.
    pub fn new(pattern: &str) -> Result<Self> {
        let mut params: Vec<(String, ParamKind)> = Vec::new();
        let mut regex_str = String::from("^");
        let mut rest = pattern;

        while let Some(open) = rest.find('{') {
            regex_str.push_str(&regex::escape(&rest[..open]));

            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| RouteError::UnmatchedBrace {
                pattern: pattern.to_string(),
            })?;
            let inner = &after[..close];

            let (name, kind) = match inner.split_once(':') {
                Some((name, tag)) => (name, ParamKind::from_tag(tag)),
                None => (inner, ParamKind::Str),
            };
            if name.is_empty() {
                return Err(RouteError::EmptyParam {
                    pattern: pattern.to_string(),
                });
            }
            if params.iter().any(|(existing, _)| existing == name) {
                return Err(RouteError::DuplicateParam {
                    name: name.to_string(),
                    pattern: pattern.to_string(),
                });
            }

            regex_str.push_str(kind.regex());
            params.push((name.to_string(), kind));
            rest = &after[close + 1..];
        }

        regex_str.push_str(&regex::escape(rest));
        regex_str.push('$');

        Ok(Self {
            pattern: pattern.to_string(),
            regex: Regex::new(&regex_str)?,
            params,
        })
    }

    /// Attempts to match a path against this pattern.
    ///
    /// Returns typed parameters if the whole path matches and every
    /// converter succeeds. A failed conversion is a non-match, not an error.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;

        let mut params = PathParams::new();
        for (i, (name, kind)) in self.params.iter().enumerate() {
            let raw = caps.get(i + 1)?.as_str();
            params.insert(name.clone(), kind.convert(raw)?);
        }

        Some(params)
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parameter names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the parameters with their converters, in declaration order.
    pub fn params(&self) -> &[(String, ParamKind)] {
        &self.params
    }
}
