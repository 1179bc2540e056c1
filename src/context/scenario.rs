// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`ScenarioContext`]: state shared by the steps of a single scenario.

use std::{any::Any, collections::HashMap};

use chrono::{DateTime, Utc};
use derive_more::with_trait::{Debug, Display};
use serde::Serialize;

use crate::{cli::SessionReuse, store::Scope};

use super::StepSnapshot;

/// Final status of a scenario.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Every step passed and nothing else went wrong.
    #[display("passed")]
    Passed,

    /// A step, a `Before` hook or a soft assertion failed.
    #[display("failed")]
    Failed,

    /// Nothing failed, but at least one step was skipped.
    #[display("skipped")]
    Skipped,

    /// Never started.
    #[display("pending")]
    Pending,
}

/// State of a running scenario.
///
/// Created when a scenario begins and discarded when it ends, keeping only
/// its outcome.
#[derive(Debug)]
pub struct ScenarioContext {
    id: String,
    name: String,
    feature_name: String,
    tags: Vec<String>,
    session_reuse: SessionReuse,
    started_at: DateTime<Utc>,

    /// Typed key-value test data.
    #[debug("{:?}", test_data.keys().collect::<Vec<_>>())]
    test_data: HashMap<String, Box<dyn Any>>,

    /// Text of the step being executed.
    active_step: Option<String>,

    /// Snapshots of the finished steps.
    steps: Vec<StepSnapshot>,

    /// Accumulated soft assertion failures.
    soft_failures: Vec<String>,
}

impl ScenarioContext {
    /// Creates a new [`ScenarioContext`].
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        feature_name: impl Into<String>,
        tags: Vec<String>,
        session_reuse: SessionReuse,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            feature_name: feature_name.into(),
            tags,
            session_reuse,
            started_at: Utc::now(),
            test_data: HashMap::new(),
            active_step: None,
            steps: Vec::new(),
            soft_failures: Vec::new(),
        }
    }

    /// Unique id of the scenario.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the scenario.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the feature.
    #[must_use]
    pub fn feature_name(&self) -> &str {
        &self.feature_name
    }

    /// Tags, feature tags included.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// [`Scope`] of the variables private to this scenario.
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::scenario(self.id.clone())
    }

    /// Session reuse strategy the page-object layer is configured with.
    #[must_use]
    pub const fn session_reuse(&self) -> SessionReuse {
        self.session_reuse
    }

    /// When the scenario began.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Stores test data under the `key`, replacing any previous value.
    pub fn set_test_data<T: Any>(&mut self, key: impl Into<String>, value: T) {
        _ = self.test_data.insert(key.into(), Box::new(value));
    }

    /// Test data under the `key`, if present and of type `T`.
    #[must_use]
    pub fn test_data<T: Any>(&self, key: &str) -> Option<&T> {
        self.test_data.get(key)?.downcast_ref()
    }

    /// Mutable test data under the `key`, if present and of type `T`.
    pub fn test_data_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.test_data.get_mut(key)?.downcast_mut()
    }

    /// Removes and returns test data under the `key` if it's of type `T`.
    /// Values of other types are left in place.
    pub fn take_test_data<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.test_data.get(key)?.is::<T>() {
            return None;
        }
        self.test_data.remove(key)?.downcast().ok().map(|b| *b)
    }

    /// Whether there is test data under the `key`.
    #[must_use]
    pub fn has_test_data(&self, key: &str) -> bool {
        self.test_data.contains_key(key)
    }

    /// Records a failed soft assertion. The scenario fails at its end.
    pub fn add_soft_assertion_failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(scenario = %self.id, %message, "soft assertion failed");
        self.soft_failures.push(message);
    }

    /// Failed soft assertions.
    #[must_use]
    pub fn soft_failures(&self) -> &[String] {
        &self.soft_failures
    }

    /// Text of the step being executed, if any.
    #[must_use]
    pub fn active_step(&self) -> Option<&str> {
        self.active_step.as_deref()
    }

    pub(crate) fn set_active_step(&mut self, text: Option<String>) {
        self.active_step = text;
    }

    /// Snapshots of the steps finished so far.
    #[must_use]
    pub fn steps(&self) -> &[StepSnapshot] {
        &self.steps
    }

    pub(crate) fn record_step(&mut self, snapshot: StepSnapshot) {
        self.steps.push(snapshot);
    }

    pub(crate) fn take_steps(&mut self) -> Vec<StepSnapshot> {
        std::mem::take(&mut self.steps)
    }

    /// Serializable snapshot of the current state.
    #[must_use]
    pub fn export(&self) -> ScenarioSnapshot {
        let mut test_data = self.test_data.keys().cloned().collect::<Vec<_>>();
        test_data.sort();
        ScenarioSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            feature_name: self.feature_name.clone(),
            tags: self.tags.clone(),
            started_at: self.started_at,
            active_step: self.active_step.clone(),
            steps: self.steps.clone(),
            soft_failures: self.soft_failures.clone(),
            test_data,
        }
    }
}

/// Exported state of a [`ScenarioContext`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioSnapshot {
    /// Scenario id.
    pub id: String,

    /// Scenario name.
    pub name: String,

    /// Feature name.
    pub feature_name: String,

    /// Tags.
    pub tags: Vec<String>,

    /// Start time.
    pub started_at: DateTime<Utc>,

    /// Step being executed.
    pub active_step: Option<String>,

    /// Finished steps.
    pub steps: Vec<StepSnapshot>,

    /// Failed soft assertions.
    pub soft_failures: Vec<String>,

    /// Sorted keys of the test data.
    pub test_data: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ScenarioContext {
        ScenarioContext::new(
            "scenario-1",
            "login",
            "Auth",
            vec!["@smoke".into()],
            SessionReuse::PerScenario,
        )
    }

    #[test]
    fn typed_test_data() {
        let mut ctx = context();
        ctx.set_test_data("user", String::from("alice"));
        ctx.set_test_data("attempts", 3_u32);

        assert_eq!(ctx.test_data::<String>("user").map(String::as_str), Some("alice"));
        assert_eq!(ctx.test_data::<u64>("attempts"), None);

        *ctx.test_data_mut::<u32>("attempts").unwrap() += 1;
        assert_eq!(ctx.take_test_data::<String>("attempts"), None);
        assert_eq!(ctx.take_test_data::<u32>("attempts"), Some(4));
        assert!(!ctx.has_test_data("attempts"));
    }

    #[test]
    fn soft_failures_accumulate() {
        let mut ctx = context();
        ctx.add_soft_assertion_failure("title mismatch");
        ctx.add_soft_assertion_failure("footer missing");

        assert_eq!(ctx.soft_failures(), ["title mismatch", "footer missing"]);
    }

    #[test]
    fn scope_is_the_scenario_id() {
        assert_eq!(context().scope(), Scope::scenario("scenario-1"));
    }

    #[test]
    fn export() {
        let mut ctx = context();
        ctx.set_test_data("b", 1);
        ctx.set_test_data("a", 2);
        ctx.set_active_step(Some("I log in".into()));

        let snapshot = ctx.export();
        assert_eq!(snapshot.test_data, ["a", "b"]);
        assert_eq!(snapshot.active_step.as_deref(), Some("I log in"));
        assert_eq!(serde_json::to_value(&snapshot).unwrap()["tags"][0], "@smoke");
    }
}
