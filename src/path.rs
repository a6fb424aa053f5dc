//! Path expressions for addressing values inside a source tree.
//!
//! A path is parsed once into a list of accessors and can then be resolved
//! against any number of values. Resolution is total: every path against
//! every value yields either `Some(value)` or `None`, never an error, since
//! missing data is the normal case for heterogeneous ASTs.
//!
//! # Syntax
//!
//! - `title` - field lookup
//! - `data.meta.title` - nested field lookups
//! - `c[2][0]` - field lookup followed by sequence indices
//! - `[0].name` - index the current value directly, then look up a field
//! - `['pandoc-api-version']` - quoted key for names with unusual characters
//! - the empty string denotes the whole current value

use std::fmt;

use serde_json::Value;

use crate::error::PathError;

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpression {
    /// The raw path string
    raw: String,
    /// Parsed accessors, applied left to right
    accessors: Vec<Accessor>,
}

/// A single step of a path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    /// A mapping key (e.g. `name`, `['complex-key']`)
    Field(String),
    /// A sequence position (e.g. `[0]`)
    Index(usize),
}

impl PathExpression {
    /// Parse a path expression.
    ///
    /// # Example
    ///
    /// ```
    /// use treenorm::path::{Accessor, PathExpression};
    ///
    /// let path = PathExpression::parse("c[2].name").unwrap();
    /// assert_eq!(
    ///     path.accessors(),
    ///     &[
    ///         Accessor::Field("c".to_string()),
    ///         Accessor::Index(2),
    ///         Accessor::Field("name".to_string()),
    ///     ]
    /// );
    /// ```
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let accessors = Parser::new(path).parse()?;
        Ok(Self {
            raw: path.to_string(),
            accessors,
        })
    }

    /// The path that denotes the whole current value.
    pub fn root() -> Self {
        Self {
            raw: String::new(),
            accessors: Vec::new(),
        }
    }

    /// Build a path from a single field name without parsing it.
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            raw: name.clone(),
            accessors: vec![Accessor::Field(name)],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub fn is_root(&self) -> bool {
        self.accessors.is_empty()
    }

    /// The first accessor, if any.
    pub fn head(&self) -> Option<&Accessor> {
        self.accessors.first()
    }

    /// Resolve this path against `value`.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        resolve_accessors(&self.accessors, value)
    }

    /// Resolve everything after the first accessor against `value`.
    ///
    /// Used for template placeholders, where the first accessor names the
    /// bound variable and `value` is what the variable is bound to.
    pub fn resolve_tail<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        match self.accessors.split_first() {
            Some((_, rest)) => resolve_accessors(rest, value),
            None => Some(value),
        }
    }
}

fn resolve_accessors<'a>(accessors: &[Accessor], value: &'a Value) -> Option<&'a Value> {
    accessors
        .iter()
        .try_fold(value, |current, accessor| match (accessor, current) {
            (Accessor::Field(name), Value::Object(map)) => map.get(name),
            (Accessor::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        })
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::str::FromStr for PathExpression {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns true when `text` contains characters that only make sense in a
/// path expression.
pub fn has_path_punctuation(text: &str) -> bool {
    text.contains(['.', '[', ']'])
}

// Grammar:
//   path      := '' | (accessor+ | part) ('.' part)*
//   part      := name accessor*
//   accessor  := '[' ws* (digits | quoted) ws* ']'
//   name      := [A-Za-z_$@] [A-Za-z0-9_$@-]*
struct Parser<'a> {
    path: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(path: &'a str) -> Self {
        Self {
            path,
            chars: path.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Vec<Accessor>, PathError> {
        let mut accessors = Vec::new();
        if self.chars.is_empty() {
            return Ok(accessors);
        }

        if self.peek() == Some('[') {
            while self.peek() == Some('[') {
                accessors.push(self.parse_bracket()?);
            }
        } else {
            self.parse_part(&mut accessors)?;
        }

        while self.peek() == Some('.') {
            self.pos += 1;
            self.parse_part(&mut accessors)?;
        }

        if let Some(c) = self.peek() {
            return Err(self.error(format!("unexpected character '{}'", c)));
        }

        Ok(accessors)
    }

    fn parse_part(&mut self, accessors: &mut Vec<Accessor>) -> Result<(), PathError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start(c) => {}
            Some('.') | None => return Err(self.error("empty segment name")),
            Some(c) => return Err(self.error(format!("expected a field name, found '{}'", c))),
        }
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        accessors.push(Accessor::Field(self.chars[start..self.pos].iter().collect()));

        while self.peek() == Some('[') {
            accessors.push(self.parse_bracket()?);
        }
        Ok(())
    }

    fn parse_bracket(&mut self) -> Result<Accessor, PathError> {
        let open = self.pos;
        self.pos += 1;
        self.skip_whitespace();

        let accessor = match self.peek() {
            None => return Err(PathError::new(self.path, open, "unmatched '['")),
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(PathError::new(self.path, start - 1, "unterminated quoted key"));
                }
                let key: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                Accessor::Field(key)
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c != ']' && !c.is_whitespace())
                {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                if text.is_empty() {
                    return Err(PathError::new(self.path, start, "empty index"));
                }
                let index = text.parse::<usize>().map_err(|_| {
                    PathError::new(
                        self.path,
                        start,
                        format!("index '{}' is not a non-negative integer", text),
                    )
                })?;
                Accessor::Index(index)
            }
        };

        self.skip_whitespace();
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(accessor)
            }
            None => Err(PathError::new(self.path, open, "unmatched '['")),
            Some(c) => Err(self.error(format!("expected ']', found '{}'", c))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, reason: impl Into<String>) -> PathError {
        PathError::new(self.path, self.pos, reason)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '_' | '$' | '@')
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '@' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str) -> Accessor {
        Accessor::Field(name.to_string())
    }

    #[test]
    fn test_parse_dotted_path() {
        let path = PathExpression::parse("data.meta.title").unwrap();

        assert_eq!(path.accessors(), &[field("data"), field("meta"), field("title")]);
        assert_eq!(path.as_str(), "data.meta.title");
    }

    #[test]
    fn test_parse_indices() {
        let path = PathExpression::parse("c[0][1][0]").unwrap();

        assert_eq!(
            path.accessors(),
            &[field("c"), Accessor::Index(0), Accessor::Index(1), Accessor::Index(0)]
        );
    }

    #[test]
    fn test_parse_leading_index() {
        let path = PathExpression::parse("[0].name").unwrap();
        assert_eq!(path.accessors(), &[Accessor::Index(0), field("name")]);

        let path = PathExpression::parse("[1][2]").unwrap();
        assert_eq!(path.accessors(), &[Accessor::Index(1), Accessor::Index(2)]);
    }

    #[test]
    fn test_parse_quoted_key_and_whitespace() {
        let path = PathExpression::parse("['pandoc-api-version'][ 0 ]").unwrap();
        assert_eq!(path.accessors(), &[field("pandoc-api-version"), Accessor::Index(0)]);

        let path = PathExpression::parse("meta[\"a key\"]").unwrap();
        assert_eq!(path.accessors(), &[field("meta"), field("a key")]);
    }

    #[test]
    fn test_parse_empty_is_root() {
        let path = PathExpression::parse("").unwrap();
        assert!(path.is_root());

        let value = json!({"a": 1});
        assert_eq!(path.resolve(&value), Some(&value));
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("c[0", "unmatched"),
            ("c[x]", "not a non-negative integer"),
            ("c[-1]", "not a non-negative integer"),
            ("a..b", "empty segment name"),
            ("a.", "empty segment name"),
            (".a", "empty segment name"),
            ("1abc", "expected a field name"),
            ("c]", "unexpected character"),
            ("c[]", "empty index"),
            ("c[2).x", "not a non-negative integer"),
            ("Pandoc Document", "unexpected character"),
            ("c['open", "unterminated"),
        ];

        for (input, fragment) in cases {
            let err = PathExpression::parse(input).unwrap_err();
            assert!(
                err.reason.contains(fragment),
                "path {:?}: expected {:?} in {:?}",
                input,
                fragment,
                err.reason
            );
            assert_eq!(err.path, input);
        }
    }

    #[test]
    fn test_resolve_found_and_missing() {
        let value = json!({
            "t": "Header",
            "c": [1, [], [{"t": "Str", "c": "Hi"}]],
        });

        let path = PathExpression::parse("c[2][0].c").unwrap();
        assert_eq!(path.resolve(&value), Some(&json!("Hi")));

        let path = PathExpression::parse("c[5]").unwrap();
        assert_eq!(path.resolve(&value), None);

        let path = PathExpression::parse("missing.deeper").unwrap();
        assert_eq!(path.resolve(&value), None);
    }

    #[test]
    fn test_resolve_wrong_shapes_are_not_found() {
        let value = json!({"name": "text", "list": [1, 2]});

        assert_eq!(PathExpression::parse("name.length").unwrap().resolve(&value), None);
        assert_eq!(PathExpression::parse("name[0]").unwrap().resolve(&value), None);
        assert_eq!(PathExpression::parse("list.first").unwrap().resolve(&value), None);
        assert_eq!(PathExpression::parse("[0]").unwrap().resolve(&value), None);
        assert_eq!(PathExpression::parse("x").unwrap().resolve(&json!(null)), None);
    }

    #[test]
    fn test_resolve_is_total_over_mixed_values() {
        let paths = ["a", "a.b", "[0]", "a[1].b", "", "['k'][0]"];
        let values = [
            json!(null),
            json!(true),
            json!(3.5),
            json!("s"),
            json!([{"b": 1}, {"b": 2}]),
            json!({"a": [{"b": 1}, {"b": 2}], "k": [7]}),
        ];

        for raw in paths {
            let path = PathExpression::parse(raw).unwrap();
            for value in &values {
                let first = path.resolve(value);
                let second = path.resolve(value);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_field_shorthand_resolves_any_value() {
        for x in [json!(null), json!(1), json!("s"), json!([1]), json!({"k": "v"})] {
            let node = json!({ "name": x.clone() });
            assert_eq!(PathExpression::field("name").resolve(&node), Some(&x));
        }
    }

    #[test]
    fn test_resolve_tail() {
        let path = PathExpression::parse("item.title").unwrap();
        let item = json!({"title": "Intro"});

        assert_eq!(path.resolve_tail(&item), Some(&json!("Intro")));
        assert_eq!(PathExpression::parse("item").unwrap().resolve_tail(&item), Some(&item));
    }

    #[test]
    fn test_has_path_punctuation() {
        assert!(has_path_punctuation("a.b"));
        assert!(has_path_punctuation("c[2)"));
        assert!(!has_path_punctuation("Pandoc Document"));
    }
}
