// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Applicability filters of hooks.

use std::sync::Arc;

use derive_more::with_trait::Debug;
use gherkin::tagexpr::TagOperation;
use sealed::sealed;

use crate::error::TagExpressionError;

/// Extension of a [`TagOperation`] allowing to evaluate it.
#[sealed]
pub trait Ext {
    /// Evaluates this [`TagOperation`] for the given `tags`, ignoring leading
    /// `@`s on both sides.
    #[must_use]
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone;
}

#[sealed]
impl Ext for TagOperation {
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        match self {
            Self::And(l, r) => l.eval(tags.clone()) & r.eval(tags),
            Self::Or(l, r) => l.eval(tags.clone()) | r.eval(tags),
            Self::Not(t) => !t.eval(tags),
            Self::Tag(t) => {
                let t = t.trim_start_matches('@');
                tags.into_iter()
                    .any(|tag| tag.as_ref().trim_start_matches('@') == t)
            }
        }
    }
}

/// Decides whether a hook applies to a scenario.
#[derive(Clone, Debug, Default)]
pub enum HookFilter {
    /// Applies everywhere.
    #[default]
    Always,

    /// Applies when the tag expression holds for the scenario tags.
    Tags(TagOperation),

    /// Decided by the caller ahead of time.
    Evaluated(bool),

    /// Decided by a custom predicate over the scenario tags.
    #[debug("Predicate(..)")]
    Predicate(Arc<dyn Fn(&[String]) -> bool + Send + Sync>),
}

impl HookFilter {
    /// Parses a tag expression.
    ///
    /// Besides `and`, `or`, `not` and parentheses, `,` is accepted as `and`
    /// and tags may omit their leading `@`.
    ///
    /// # Errors
    ///
    /// If the expression can't be parsed.
    pub fn tags(expression: &str) -> Result<Self, TagExpressionError> {
        normalize(expression)
            .parse::<TagOperation>()
            .map(Self::Tags)
            .map_err(|e| TagExpressionError {
                expression: expression.to_owned(),
                reason: e.to_string(),
            })
    }

    /// Creates a [`HookFilter::Predicate`].
    #[must_use]
    pub fn predicate(
        pred: impl Fn(&[String]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Predicate(Arc::new(pred))
    }

    /// Whether a hook with this filter applies to a scenario with the `tags`.
    #[must_use]
    pub fn applies(&self, tags: &[String]) -> bool {
        match self {
            Self::Always => true,
            Self::Tags(op) => op.eval(tags),
            Self::Evaluated(b) => *b,
            Self::Predicate(pred) => pred(tags),
        }
    }
}

/// Rewrites `,` into `and` and prefixes bare tags with `@`.
fn normalize(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len() * 2);
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut String| {
        if word.is_empty() {
            return;
        }
        if !matches!(word.as_str(), "and" | "or" | "not") && !word.starts_with('@')
        {
            out.push('@');
        }
        out.push_str(word);
        word.clear();
    };

    for c in expression.chars() {
        match c {
            ',' => {
                flush(&mut word, &mut out);
                out.push_str(" and ");
            }
            '(' | ')' => {
                flush(&mut word, &mut out);
                out.push(c);
            }
            c if c.is_whitespace() => {
                flush(&mut word, &mut out);
                out.push(' ');
            }
            c => word.push(c),
        }
    }
    flush(&mut word, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn normalizes_commas_and_bare_tags() {
        assert_eq!(normalize("@smoke,@fast"), "@smoke and @fast");
        assert_eq!(normalize("smoke or not (wip)"), "@smoke or not (@wip)");
    }

    #[test]
    fn evaluates_tag_expressions() {
        let filter = HookFilter::tags("@ui and not @slow").unwrap();

        assert!(filter.applies(&tags(&["ui"])));
        assert!(filter.applies(&tags(&["@ui", "@fast"])));
        assert!(!filter.applies(&tags(&["ui", "slow"])));
        assert!(!filter.applies(&tags(&[])));
    }

    #[test]
    fn comma_means_and() {
        let filter = HookFilter::tags("@api, @auth").unwrap();

        assert!(filter.applies(&tags(&["api", "auth"])));
        assert!(!filter.applies(&tags(&["api"])));
    }

    #[test]
    fn or_expression() {
        let filter = HookFilter::tags("@api or @ui").unwrap();

        assert!(filter.applies(&tags(&["ui"])));
        assert!(!filter.applies(&tags(&["db"])));
    }

    #[test]
    fn rejects_garbage() {
        let err = HookFilter::tags("@a and and").unwrap_err();
        assert_eq!(err.expression, "@a and and");
    }

    #[test]
    fn pre_evaluated_and_predicates() {
        assert!(!HookFilter::Evaluated(false).applies(&tags(&["any"])));
        assert!(HookFilter::Always.applies(&[]));

        let filter = HookFilter::predicate(|tags| tags.len() > 1);
        assert!(filter.applies(&tags(&["a", "b"])));
        assert!(!filter.applies(&tags(&["a"])));
    }
}
