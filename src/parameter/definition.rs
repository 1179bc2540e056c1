// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`ParameterType`] definition.

use std::{fmt, sync::Arc};

use derive_more::with_trait::Debug;
use regex::Regex;

use crate::error::PatternError;

use super::Argument;

/// Type-erased text to [`Argument`] conversion of a [`ParameterType`].
pub type Transformer =
    Arc<dyn Fn(&str) -> Result<Argument, String> + Send + Sync>;

/// Named parameter type: a [`Regex`] recognising its text and a
/// [`Transformer`] coercing that text into an [`Argument`].
///
/// # Example
///
/// ```rust
/// # use stepwise::{Argument, ParameterType};
/// #
/// let color = ParameterType::new("color", "red|green|blue", |s| {
///     Ok::<_, String>(Argument::Str(s.to_uppercase()))
/// })
/// .unwrap()
/// .use_for_snippets(true);
///
/// assert!(color.is_match("green"));
/// assert!(!color.is_match("greenish"));
/// ```
#[derive(Clone, Debug)]
pub struct ParameterType {
    /// Name used inside `{}` placeholders.
    name: String,

    /// [`Regex`] embedded into step expressions.
    regex: Regex,

    /// Same [`Regex`], anchored on both ends, for type detection.
    anchored: Regex,

    /// Conversion of the matched text.
    #[debug(skip)]
    transform: Transformer,

    /// Whether snippets for unmatched steps suggest this type.
    use_for_snippets: bool,

    /// Whether type detection of untyped captures considers this type.
    prefer_for_match: bool,
}

impl ParameterType {
    /// Creates a new [`ParameterType`] with both flags unset.
    ///
    /// # Errors
    ///
    /// If the `regex` is invalid or contains capture groups, which would shift
    /// the positions of the step arguments.
    pub fn new<F, E>(
        name: impl Into<String>,
        regex: &str,
        transform: F,
    ) -> Result<Self, PatternError>
    where
        F: Fn(&str) -> Result<Argument, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let compiled =
            Regex::new(regex).map_err(|e| PatternError::new(regex, e))?;
        if compiled.captures_len() > 1 {
            return Err(PatternError::new(
                regex,
                "parameter regex must not contain capture groups, use `(?:...)`",
            ));
        }
        let anchored = Regex::new(&format!("^(?:{regex})$"))
            .map_err(|e| PatternError::new(regex, e))?;

        Ok(Self::from_parts(
            name.into(),
            compiled,
            anchored,
            Arc::new(move |s| transform(s).map_err(|e| e.to_string())),
        ))
    }

    /// Assembles a [`ParameterType`] from already validated parts.
    pub(super) fn from_parts(
        name: String,
        regex: Regex,
        anchored: Regex,
        transform: Transformer,
    ) -> Self {
        Self {
            name,
            regex,
            anchored,
            transform,
            use_for_snippets: false,
            prefer_for_match: false,
        }
    }

    /// Sets whether snippets suggest this type.
    #[must_use]
    pub fn use_for_snippets(mut self, yes: bool) -> Self {
        self.use_for_snippets = yes;
        self
    }

    /// Sets whether type detection of untyped captures considers this type.
    #[must_use]
    pub fn prefer_for_match(mut self, yes: bool) -> Self {
        self.prefer_for_match = yes;
        self
    }

    /// Name of this type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unanchored [`Regex`] of this type.
    #[must_use]
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Whether the whole `text` is recognised by this type.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }

    /// Whether snippets suggest this type.
    #[must_use]
    pub const fn is_used_for_snippets(&self) -> bool {
        self.use_for_snippets
    }

    /// Whether type detection considers this type.
    #[must_use]
    pub const fn is_preferred_for_match(&self) -> bool {
        self.prefer_for_match
    }

    /// Runs the transformer.
    pub(super) fn apply(&self, text: &str) -> Result<Argument, String> {
        (self.transform)(text)
    }
}
