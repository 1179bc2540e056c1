// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Path queries against stored [`Value`]s.
//!
//! Two syntaxes are understood:
//!
//! - JSONPath-like: optional leading `$`, then any sequence of `.field`,
//!   `[index]` (negative indices count from the end) and `['key']`/`["key"]`
//!   segments, e.g. `$.data.items[0]["display name"]`;
//! - [JSON pointer]: anything starting with `/`, e.g. `/data/items/0`.
//!
//! [JSON pointer]: https://datatracker.ietf.org/doc/html/rfc6901

use derive_more::with_trait::Display;
use serde_json::Value;

/// Single step of a [`Path`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Segment {
    /// Object member.
    #[display(".{_0}")]
    Key(String),

    /// Array element, negative values counting from the end.
    #[display("[{_0}]")]
    Index(i64),
}

/// Parsed path query.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Path(Vec<Segment>);

impl Path {
    /// Parses the `query`.
    ///
    /// # Errors
    ///
    /// With a human-readable reason if the `query` is malformed.
    pub fn parse(query: &str) -> Result<Self, String> {
        let query = query.trim();
        if let Some(pointer) = query.strip_prefix('/') {
            return Ok(Self::from_pointer(pointer));
        }

        let mut segments = Vec::new();
        let rest = query.strip_prefix('$').unwrap_or(query);
        let mut chars = rest.char_indices().peekable();
        let mut first = true;

        while let Some((pos, c)) = chars.next() {
            match c {
                '.' => {
                    let key = take_while(&mut chars, |c| c != '.' && c != '[');
                    if key.is_empty() {
                        return Err(format!("empty field name at {pos}"));
                    }
                    segments.push(Segment::Key(key));
                }
                '[' => {
                    let inner = take_while(&mut chars, |c| c != ']');
                    if chars.next().is_none() {
                        return Err(format!("unclosed `[` at {pos}"));
                    }
                    segments.push(parse_bracket(&inner)?);
                }
                c if first && rest.len() == query.len() => {
                    // Bare leading field without `$.`, like `data.items`.
                    let mut key = c.to_string();
                    key.push_str(&take_while(&mut chars, |c| {
                        c != '.' && c != '['
                    }));
                    segments.push(Segment::Key(key));
                }
                c => return Err(format!("unexpected `{c}` at {pos}")),
            }
            first = false;
        }
        Ok(Self(segments))
    }

    fn from_pointer(pointer: &str) -> Self {
        Self(
            pointer
                .split('/')
                .map(|raw| raw.replace("~1", "/").replace("~0", "~"))
                .map(|token| match token.parse::<i64>() {
                    Ok(i) if i >= 0 => Segment::Index(i),
                    _ => Segment::Key(token),
                })
                .collect(),
        )
    }

    /// Segments of this [`Path`].
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Applies this [`Path`] to the `value`.
    ///
    /// # Errors
    ///
    /// With a reason naming the first segment that couldn't be followed.
    pub fn apply<'v>(&self, value: &'v Value) -> Result<&'v Value, String> {
        self.0.iter().try_fold(value, |current, segment| {
            let next = match (segment, current) {
                (Segment::Key(k), Value::Object(map)) => map.get(k),
                // Pointers don't tell keys from indices.
                (Segment::Index(i), Value::Object(map)) => {
                    map.get(&i.to_string())
                }
                (Segment::Index(i), Value::Array(items)) => {
                    let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                    let idx = if *i < 0 { len + i } else { *i };
                    usize::try_from(idx).ok().and_then(|idx| items.get(idx))
                }
                _ => {
                    return Err(format!(
                        "`{segment}` cannot be applied to {}",
                        kind(current),
                    ));
                }
            };
            next.ok_or_else(|| format!("`{segment}` does not exist"))
        })
    }
}

/// Consumes characters while `pred` holds.
fn take_while(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    pred: impl Fn(char) -> bool,
) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        _ = chars.next();
    }
    out
}

/// Parses the inside of a `[...]` segment.
fn parse_bracket(inner: &str) -> Result<Segment, String> {
    let inner = inner.trim();
    for quote in ['\'', '"'] {
        if let Some(key) = inner
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Ok(Segment::Key(key.to_owned()));
        }
    }
    inner
        .parse::<i64>()
        .map(Segment::Index)
        .map_err(|_| format!("`[{inner}]` is neither an index nor a quoted key"))
}

/// Human-readable JSON kind of the `value`.
const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn query(value: &Value, path: &str) -> Result<Value, String> {
        Path::parse(path)?.apply(value).cloned()
    }

    #[test]
    fn dotted_and_indexed() {
        let v = json!({"data": {"items": [{"id": 7}, {"id": 9}]}});

        assert_eq!(query(&v, "$.data.items[1].id"), Ok(json!(9)));
        assert_eq!(query(&v, "data.items[0].id"), Ok(json!(7)));
        assert_eq!(query(&v, "$.data.items[-1].id"), Ok(json!(9)));
        assert_eq!(query(&v, "$"), Ok(v.clone()));
    }

    #[test]
    fn quoted_keys() {
        let v = json!({"display name": {"it's": true}});

        assert_eq!(query(&v, r#"$["display name"]["it's"]"#), Ok(json!(true)));
        assert_eq!(query(&v, "$['display name']"), Ok(json!({"it's": true})));
    }

    #[test]
    fn json_pointer() {
        let v = json!({"a/b": [1, {"c": "d"}]});

        assert_eq!(query(&v, "/a~1b/1/c"), Ok(json!("d")));
        assert_eq!(query(&v, "/a~1b/0"), Ok(json!(1)));
    }

    #[test]
    fn failures_name_the_segment() {
        let v = json!({"data": {"items": []}});

        assert_eq!(
            query(&v, "$.data.items[0]"),
            Err("`[0]` does not exist".into()),
        );
        assert_eq!(
            query(&v, "$.data.items.id"),
            Err("`.id` cannot be applied to an array".into()),
        );
        assert!(query(&v, "$.data[oops]").is_err());
        assert!(query(&v, "$.data[0").is_err());
        assert!(query(&v, "$..data").is_err());
    }
}
