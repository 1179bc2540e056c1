// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Already parsed scenario input handed over by a front end.

use std::sync::atomic::{AtomicU64, Ordering};

use derive_more::with_trait::Display;
use serde::Serialize;

use crate::data_table::DataTable;

/// Keyword a [`Step`] starts with.
///
/// Matching never depends on it.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq, Serialize,
)]
pub enum Keyword {
    /// `Given`.
    #[default]
    Given,

    /// `When`.
    When,

    /// `Then`.
    Then,

    /// `And`.
    And,

    /// `But`.
    But,
}

/// Single step of a [`Scenario`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Step {
    /// Keyword of this step.
    pub keyword: Keyword,

    /// Text matched against step definitions.
    pub text: String,

    /// Tabular argument.
    pub table: Option<DataTable>,

    /// Doc-string argument.
    pub docstring: Option<String>,

    /// Line in the source file, if known.
    pub line: Option<u32>,
}

impl Step {
    /// Creates a new [`Step`] without arguments.
    #[must_use]
    pub fn new(keyword: Keyword, text: impl Into<String>) -> Self {
        Self {
            keyword,
            text: text.into(),
            table: None,
            docstring: None,
            line: None,
        }
    }

    /// Creates a `Given` [`Step`].
    #[must_use]
    pub fn given(text: impl Into<String>) -> Self {
        Self::new(Keyword::Given, text)
    }

    /// Creates a `When` [`Step`].
    #[must_use]
    pub fn when(text: impl Into<String>) -> Self {
        Self::new(Keyword::When, text)
    }

    /// Creates a `Then` [`Step`].
    #[must_use]
    pub fn then(text: impl Into<String>) -> Self {
        Self::new(Keyword::Then, text)
    }

    /// Creates an `And` [`Step`].
    #[must_use]
    pub fn and(text: impl Into<String>) -> Self {
        Self::new(Keyword::And, text)
    }

    /// Attaches a [`DataTable`].
    #[must_use]
    pub fn with_table(mut self, table: impl Into<DataTable>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Attaches a doc-string.
    #[must_use]
    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    /// Sets the source line.
    #[must_use]
    pub const fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// Scenario: an ordered list of [`Step`]s with tags.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Scenario {
    /// Identifier, unique per run.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Tags, with or without a leading `@`.
    pub tags: Vec<String>,

    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Creates a new empty [`Scenario`] with a process-unique id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        /// [`AtomicU64`] ID.
        static ID: AtomicU64 = AtomicU64::new(0);

        Self {
            id: format!("scenario-{}", ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            tags: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Overrides the id allocated by [`Scenario::new()`].
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Appends a [`Step`].
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// Feature: [`Scenario`]s sharing a background and tags.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Feature {
    /// Human-readable name.
    pub name: String,

    /// Tags inherited by every [`Scenario`].
    pub tags: Vec<String>,

    /// [`Step`]s prepended to every [`Scenario`].
    pub background: Vec<Step>,

    /// [`Scenario`]s in execution order.
    pub scenarios: Vec<Scenario>,
}

impl Feature {
    /// Creates a new empty [`Feature`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Appends a background [`Step`].
    #[must_use]
    pub fn background(mut self, step: Step) -> Self {
        self.background.push(step);
        self
    }

    /// Appends a [`Scenario`].
    #[must_use]
    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Expands the `scenario` with the background steps and the feature tags,
    /// exactly as it's executed.
    #[must_use]
    pub fn expand(&self, scenario: &Scenario) -> Scenario {
        let tags = self
            .tags
            .iter()
            .chain(&scenario.tags)
            .fold(Vec::<String>::new(), |mut acc, tag| {
                if !acc.contains(tag) {
                    acc.push(tag.clone());
                }
                acc
            });
        Scenario {
            id: scenario.id.clone(),
            name: scenario.name.clone(),
            tags,
            steps: self
                .background
                .iter()
                .chain(&scenario.steps)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_ids_are_unique() {
        let a = Scenario::new("a");
        let b = Scenario::new("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn expand_prepends_background_and_inherits_tags() {
        let feature = Feature::new("Login")
            .tag("@auth")
            .background(Step::given("the app is running"))
            .scenario(
                Scenario::new("ok")
                    .tag("@smoke")
                    .tag("@auth")
                    .step(Step::when("I log in")),
            );

        let expanded = feature.expand(&feature.scenarios[0]);

        assert_eq!(expanded.tags, ["@auth", "@smoke"]);
        assert_eq!(
            expanded.steps.iter().map(|s| s.text.as_str()).collect::<Vec<_>>(),
            ["the app is running", "I log in"],
        );
        assert_eq!(expanded.id, feature.scenarios[0].id);
    }

    #[test]
    fn step_builders() {
        let step = Step::and("these users exist")
            .with_table(vec![vec!["name"], vec!["alice"]])
            .at_line(7);

        assert_eq!(step.keyword.to_string(), "And");
        assert_eq!(step.table.map(|t| t.rows().len()), Some(1));
        assert_eq!(step.line, Some(7));
    }
}
