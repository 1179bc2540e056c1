// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Results of executed scenarios and features.

use std::time::Duration;

use serde::Serialize;

use crate::{
    context::{
        FeatureContext, FeatureSnapshot, ScenarioOutcome, ScenarioStatus,
        StepSnapshot, StepStatus,
    },
    error::{HookFailureError, WorkerCrashError},
    feature::{Feature, Scenario},
};

/// Outcome of a single scenario, handed over to reporters as plain data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioResult {
    /// Scenario id.
    pub id: String,

    /// Scenario name.
    pub name: String,

    /// Name of the feature the scenario belongs to, empty for standalone
    /// scenarios.
    pub feature: String,

    /// Effective tags, inherited feature ones included.
    pub tags: Vec<String>,

    /// Final status.
    pub status: ScenarioStatus,

    /// Snapshots of the executed steps, in order.
    pub steps: Vec<StepSnapshot>,

    /// Failed soft assertions.
    pub soft_failures: Vec<String>,

    /// Every hook failure, including the ones not affecting the status.
    pub hook_errors: Vec<HookFailureError>,

    /// Whether cancellation cut the scenario short.
    pub interrupted: bool,

    /// Wall-clock duration.
    pub duration: Duration,
}

impl ScenarioResult {
    /// [`ScenarioResult`] of a `scenario` that never ran.
    pub(crate) fn not_run(
        feature: &str,
        scenario: &Scenario,
        status: ScenarioStatus,
    ) -> Self {
        Self {
            id: scenario.id.clone(),
            name: scenario.name.clone(),
            feature: feature.to_owned(),
            tags: scenario.tags.clone(),
            status,
            steps: Vec::new(),
            soft_failures: Vec::new(),
            hook_errors: Vec::new(),
            interrupted: false,
            duration: Duration::ZERO,
        }
    }

    /// Whether the scenario passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    /// Whether the scenario failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == ScenarioStatus::Failed
    }

    /// Steps that ended up [`StepStatus::Failed`].
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepSnapshot> {
        self.steps.iter().filter(|s| s.status == StepStatus::Failed)
    }

    /// [`ScenarioOutcome`] retained by a [`FeatureContext`].
    #[must_use]
    pub fn outcome(&self) -> ScenarioOutcome {
        ScenarioOutcome {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
        }
    }
}

/// Outcome of a whole feature.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureResult {
    /// Feature name.
    pub name: String,

    /// Aggregated status.
    pub status: ScenarioStatus,

    /// Results of every scenario, in order.
    pub scenarios: Vec<ScenarioResult>,

    /// Exported [`FeatureContext`].
    pub snapshot: FeatureSnapshot,

    /// Crash of the worker this feature was assigned to, if it never got to
    /// run it.
    pub crash: Option<WorkerCrashError>,
}

impl FeatureResult {
    pub(crate) fn new(snapshot: FeatureSnapshot, scenarios: Vec<ScenarioResult>) -> Self {
        Self {
            name: snapshot.name.clone(),
            status: snapshot.status,
            scenarios,
            snapshot,
            crash: None,
        }
    }

    /// [`FeatureResult`] of a `feature` whose worker crashed before running
    /// it: every scenario is reported as [`ScenarioStatus::Failed`].
    #[must_use]
    pub fn crashed(feature: &Feature, crash: WorkerCrashError) -> Self {
        let mut result = Self::not_run(feature, ScenarioStatus::Failed);
        result.status = ScenarioStatus::Failed;
        result.crash = Some(crash);
        result
    }

    /// [`FeatureResult`] of a `feature` that never ran, reporting every
    /// scenario with the `status`.
    pub(crate) fn not_run(feature: &Feature, status: ScenarioStatus) -> Self {
        let mut context = FeatureContext::new(&feature.name);
        let scenarios = feature
            .scenarios
            .iter()
            .map(|s| {
                let result = ScenarioResult::not_run(
                    &feature.name,
                    &feature.expand(s),
                    status,
                );
                context.record(result.outcome());
                result
            })
            .collect();
        context.finish();
        Self::new(context.export(), scenarios)
    }

    /// Number of scenarios with the `status`.
    #[must_use]
    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.scenarios.iter().filter(|s| s.status == status).count()
    }
}
