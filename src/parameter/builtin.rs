// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Built-in parameter types.
//!
//! Registration order matters: it's the order [`detect_type()`] tries them.
//!
//! [`detect_type()`]: super::ParameterRegistry::detect_type

use std::sync::Arc;

use chrono::NaiveDate;
use lazy_regex::{regex, Lazy};
use regex::Regex;

use super::{Argument, ParameterType};

/// Names of all built-in parameter types, in registration order.
pub const NAMES: [&str; 9] = [
    "string", "int", "float", "word", "boolean", "date", "list", "json", "any",
];

/// Name the anonymous `{}` placeholder resolves to.
pub const ANONYMOUS: &str = "any";

/// Creates all built-in [`ParameterType`]s in registration order.
pub(super) fn all() -> Vec<ParameterType> {
    vec![
        builtin(
            "string",
            regex!(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#),
            regex!(r#"^(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')$"#),
            |s| Ok(Argument::Str(unquote(s))),
        )
        .use_for_snippets(true)
        .prefer_for_match(true),
        builtin("int", regex!(r"-?\d+"), regex!(r"^(?:-?\d+)$"), |s| {
            s.parse::<i64>().map(Argument::Int).map_err(|e| e.to_string())
        })
        .use_for_snippets(true)
        .prefer_for_match(true),
        builtin(
            "float",
            regex!(r"-?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][-+]?\d+)?"),
            regex!(r"^(?:-?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][-+]?\d+)?)$"),
            |s| s.parse::<f64>().map(Argument::Float).map_err(|e| e.to_string()),
        )
        .use_for_snippets(true)
        .prefer_for_match(true),
        builtin("word", regex!(r"[^\s]+"), regex!(r"^(?:[^\s]+)$"), |s| {
            Ok(Argument::Str(s.to_owned()))
        }),
        builtin(
            "boolean",
            regex!(r"(?i:true|false|yes|no|on|off)"),
            regex!(r"^(?i:true|false|yes|no|on|off)$"),
            |s| {
                let truthy = ["true", "yes", "on"]
                    .iter()
                    .any(|t| s.eq_ignore_ascii_case(t));
                Ok(Argument::Bool(truthy))
            },
        )
        .prefer_for_match(true),
        builtin(
            "date",
            regex!(r"\d{4}-\d{2}-\d{2}"),
            regex!(r"^(?:\d{4}-\d{2}-\d{2})$"),
            |s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(Argument::Date)
                    .map_err(|e| e.to_string())
            },
        )
        .prefer_for_match(true),
        builtin("list", regex!(r".+?"), regex!(r"^(?:.+?)$"), |s| {
            Ok(Argument::List(
                s.split(',').map(|item| item.trim().to_owned()).collect(),
            ))
        }),
        builtin(
            "json",
            regex!(r"\{.*\}|\[.*\]"),
            regex!(r"^(?:\{.*\}|\[.*\])$"),
            |s| {
                serde_json::from_str(s)
                    .map(Argument::Json)
                    .map_err(|e| e.to_string())
            },
        )
        .prefer_for_match(true),
        builtin(ANONYMOUS, regex!(r".*"), regex!(r"^(?:.*)$"), |s| {
            Ok(Argument::Str(s.to_owned()))
        }),
    ]
}

/// Assembles a built-in [`ParameterType`] from compile-time checked
/// [`Regex`]es.
fn builtin(
    name: &str,
    regex: &Lazy<Regex>,
    anchored: &Lazy<Regex>,
    transform: fn(&str) -> Result<Argument, String>,
) -> ParameterType {
    ParameterType::from_parts(
        name.to_owned(),
        Regex::clone(regex),
        Regex::clone(anchored),
        Arc::new(transform),
    )
}

/// Strips matching surrounding quotes and resolves escaped quotes and
/// backslashes. Unquoted text is returned as is.
fn unquote(s: &str) -> String {
    let quote = match s.chars().next() {
        Some(q @ ('"' | '\'')) if s.len() >= 2 && s.ends_with(q) => q,
        _ => return s.to_owned(),
    };
    let inner = &s[1..s.len() - 1];

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match (c, chars.clone().next()) {
            ('\\', Some(next)) if next == quote || next == '\\' => {
                out.push(next);
                _ = chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(name: &str) -> ParameterType {
        all().into_iter().find(|t| t.name() == name).unwrap()
    }

    #[test]
    fn names_match_registration_order() {
        let names = all().iter().map(|t| t.name().to_owned()).collect::<Vec<_>>();
        assert_eq!(names, NAMES);
    }

    #[test]
    fn string_unquotes() {
        let ty = get("string");
        assert_eq!(ty.apply(r#""abc""#), Ok(Argument::from("abc")));
        assert_eq!(ty.apply("'it\\'s'"), Ok(Argument::from("it's")));
        assert_eq!(ty.apply(r#""a \"b\"""#), Ok(Argument::from(r#"a "b""#)));
        assert_eq!(ty.apply("plain"), Ok(Argument::from("plain")));
    }

    #[test]
    fn int_rejects_non_numeric() {
        let ty = get("int");
        assert_eq!(ty.apply("-42"), Ok(Argument::Int(-42)));
        assert!(ty.apply("4x2").is_err());
        assert!(ty.apply("").is_err());
    }

    #[test]
    fn boolean_is_lenient() {
        let ty = get("boolean");
        for t in ["true", "YES", "On"] {
            assert_eq!(ty.apply(t), Ok(Argument::Bool(true)), "{t}");
        }
        for f in ["false", "no", "OFF"] {
            assert_eq!(ty.apply(f), Ok(Argument::Bool(false)), "{f}");
        }
    }

    #[test]
    fn date_is_iso() {
        let ty = get("date");
        assert_eq!(
            ty.apply("2024-02-29"),
            Ok(Argument::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())),
        );
        assert!(ty.apply("2023-02-29").is_err());
    }

    #[test]
    fn list_trims_items() {
        assert_eq!(
            get("list").apply(" a, b ,c"),
            Ok(Argument::List(vec!["a".into(), "b".into(), "c".into()])),
        );
    }

    #[test]
    fn json_reports_parser_message() {
        let ty = get("json");
        assert_eq!(
            ty.apply(r#"{"a": [1, 2]}"#),
            Ok(Argument::Json(serde_json::json!({"a": [1, 2]}))),
        );
        let err = ty.apply("{a}").unwrap_err();
        assert!(err.contains("key must be a string"), "{err}");
    }
}
