// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step [`Pattern`]s and their compilation into matchers.
//!
//! Expressions follow the cucumber-expression syntax:
//!
//! - `{name}` is a parameter of a registered type, `{}` the anonymous one;
//! - `(text)` is optional text;
//! - `a/b` is an alternation of adjacent words;
//! - `\` escapes any of the above.

use std::iter;

use cucumber_expressions::{
    expand::ParametersProvider, Expression, SingleExpression, Spanned,
};
use derive_more::with_trait::Display;
use regex::Regex;

use crate::{
    error::{PatternError, RegistrationError, UnknownTypeError},
    parameter::ParameterRegistry,
};

/// Pattern a step text is matched against.
#[derive(Clone, Debug, Display)]
pub enum Pattern {
    /// Matches only the exact same text.
    #[display("{_0}")]
    Literal(String),

    /// Raw regular expression. Captures are coerced with auto-detected types.
    #[display("{_0}")]
    Regex(Regex),

    /// Cucumber expression with typed placeholders.
    #[display("{_0}")]
    Expression(String),
}

impl Pattern {
    /// Creates a [`Pattern::Literal`].
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Creates a [`Pattern::Regex`].
    ///
    /// # Errors
    ///
    /// If the `regex` is invalid.
    pub fn regex(regex: &str) -> Result<Self, PatternError> {
        Regex::new(regex)
            .map(Self::Regex)
            .map_err(|e| PatternError::new(regex, e))
    }

    /// Creates a [`Pattern::Expression`]. Validated on registration.
    #[must_use]
    pub fn expression(expr: impl Into<String>) -> Self {
        Self::Expression(expr.into())
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Self::Regex(re)
    }
}

impl From<&str> for Pattern {
    /// Treats the text as an expression.
    fn from(expr: &str) -> Self {
        Self::expression(expr)
    }
}

impl From<String> for Pattern {
    /// Treats the text as an expression.
    fn from(expr: String) -> Self {
        Self::Expression(expr)
    }
}

/// Compiled form of a [`Pattern`].
#[derive(Clone, Debug)]
pub(crate) enum Matcher {
    /// Exact text equality.
    Exact(String),

    /// [`Regex`] with the parameter type of every capture group. [`None`]
    /// means the type is detected from the captured text.
    Captures(Regex, Vec<Option<String>>),
}

impl Matcher {
    /// Compiles the `pattern`, validating every placeholder against the
    /// `parameters`.
    pub(crate) fn compile(
        pattern: &Pattern,
        parameters: &ParameterRegistry,
    ) -> Result<Self, RegistrationError> {
        Ok(match pattern {
            Pattern::Literal(text) => Self::Exact(text.clone()),
            Pattern::Regex(re) => Self::Captures(
                re.clone(),
                iter::repeat(None).take(re.captures_len() - 1).collect(),
            ),
            Pattern::Expression(expr) => {
                let (re, types) = compile_expression(expr, parameters)?;
                Self::Captures(re, types.into_iter().map(Some).collect())
            }
        })
    }

    /// Matches the `text`, returning every capture with its declared type.
    /// Captures of groups that didn't participate are empty.
    pub(crate) fn captures<'t>(
        &self,
        text: &'t str,
    ) -> Option<Vec<(&'t str, Option<&str>)>> {
        match self {
            Self::Exact(expected) => (expected == text).then(Vec::new),
            Self::Captures(re, types) => re.captures(text).map(|caps| {
                types
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| {
                        let found = caps.get(i + 1).map_or("", |m| m.as_str());
                        (found, ty.as_deref())
                    })
                    .collect()
            }),
        }
    }

    /// Declared parameter type of every capture, [`None`] for auto-detected
    /// ones.
    pub(crate) fn parameter_types(&self) -> Vec<Option<&str>> {
        match self {
            Self::Exact(_) => Vec::new(),
            Self::Captures(_, types) => types.iter().map(Option::as_deref).collect(),
        }
    }

    /// Whether the `text` matches, without extracting anything.
    pub(crate) fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == text,
            Self::Captures(re, _) => re.is_match(text),
        }
    }
}

/// [`ParametersProvider`] expanding placeholders into the regexes of a
/// [`ParameterRegistry`], built-in types included.
#[derive(Clone, Copy)]
struct RegistryProvider<'p>(&'p ParameterRegistry);

impl<'p, 's> ParametersProvider<Spanned<'s>> for RegistryProvider<'p> {
    type Item = char;
    type Value = &'p str;

    fn get(&self, input: &Spanned<'s>) -> Option<Self::Value> {
        self.0.get(input.fragment()).map(|ty| ty.regex().as_str())
    }
}

/// Expands the `expr` into an anchored [`Regex`], returning it along with the
/// parameter type name of every capture group.
fn compile_expression(
    expr: &str,
    parameters: &ParameterRegistry,
) -> Result<(Regex, Vec<String>), RegistrationError> {
    let ast = Expression::parse(expr).map_err(|e| PatternError::new(expr, e))?;
    let types = ast
        .0
        .iter()
        .filter_map(|e| match e {
            SingleExpression::Parameter(p) => Some(*p.input.fragment()),
            _ => None,
        })
        .map(|name| {
            parameters
                .get(name)
                .map(|ty| ty.name().to_owned())
                .ok_or_else(|| UnknownTypeError::new(name))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Every registered regex is free of capture groups, so each placeholder
    // expands into exactly one group.
    let re = Expression::regex_with_parameters(expr, RegistryProvider(parameters))
        .map_err(|e| PatternError::new(expr, e))?;
    Ok((re, types))
}
