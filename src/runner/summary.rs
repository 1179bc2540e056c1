// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Statistics aggregated over features and workers.

use std::time::Duration;

use serde::Serialize;

use crate::{
    context::{aggregate, ScenarioStatus, StepStatus},
    error::WorkerCrashError,
};

use super::FeatureResult;

/// Number of scenarios or steps per status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Counts {
    /// Passed ones.
    pub passed: usize,

    /// Failed ones.
    pub failed: usize,

    /// Skipped ones.
    pub skipped: usize,

    /// Ones that never reached a terminal status.
    pub pending: usize,
}

impl Counts {
    /// Records a scenario of the `status`.
    pub fn record_scenario(&mut self, status: ScenarioStatus) {
        match status {
            ScenarioStatus::Passed => self.passed += 1,
            ScenarioStatus::Failed => self.failed += 1,
            ScenarioStatus::Skipped => self.skipped += 1,
            ScenarioStatus::Pending => self.pending += 1,
        }
    }

    /// Records a step of the `status`.
    pub fn record_step(&mut self, status: StepStatus) {
        match status {
            StepStatus::Passed => self.passed += 1,
            StepStatus::Failed => self.failed += 1,
            StepStatus::Skipped => self.skipped += 1,
            StepStatus::Pending | StepStatus::Running => self.pending += 1,
        }
    }

    /// Total number of recorded items.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.pending
    }

    fn merge(&mut self, other: Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.pending += other.pending;
    }
}

/// Execution statistics.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Stats {
    /// Scenarios per status.
    pub scenarios: Counts,

    /// Steps per status.
    pub steps: Counts,

    /// Number of hook failures.
    pub hook_errors: usize,

    /// Number of crashed workers.
    pub crashed_workers: usize,
}

impl Stats {
    /// Collects [`Stats`] of the `features`.
    #[must_use]
    pub fn from_features<'f>(
        features: impl IntoIterator<Item = &'f FeatureResult>,
    ) -> Self {
        let mut stats = Self::default();
        for scenario in features.into_iter().flat_map(|f| &f.scenarios) {
            stats.scenarios.record_scenario(scenario.status);
            for step in &scenario.steps {
                stats.steps.record_step(step.status);
            }
            stats.hook_errors += scenario.hook_errors.len();
        }
        stats
    }

    /// Adds the `other` [`Stats`] to these ones.
    pub fn merge(&mut self, other: Self) {
        self.scenarios.merge(other.scenarios);
        self.steps.merge(other.steps);
        self.hook_errors += other.hook_errors;
        self.crashed_workers += other.crashed_workers;
    }

    /// Indicates whether execution has failed.
    #[must_use]
    pub const fn execution_has_failed(&self) -> bool {
        self.scenarios.failed > 0 || self.hook_errors > 0 || self.crashed_workers > 0
    }
}

/// Terminal report of a single worker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkerReport {
    /// Worker index.
    pub worker: usize,

    /// Names of the features assigned to the worker.
    pub features: Vec<String>,

    /// Aggregated status of the assigned features.
    pub status: ScenarioStatus,

    /// Statistics of the assigned features.
    pub stats: Stats,

    /// Why the worker died, if it did.
    pub crash: Option<WorkerCrashError>,

    /// Time the worker ran for.
    pub duration: Duration,
}

impl WorkerReport {
    /// Builds a [`WorkerReport`] out of the `features` results of the
    /// `worker`.
    #[must_use]
    pub fn new<'f>(
        worker: usize,
        features: impl IntoIterator<Item = &'f FeatureResult>,
        crash: Option<WorkerCrashError>,
        duration: Duration,
    ) -> Self {
        let features = features.into_iter().collect::<Vec<_>>();
        let mut stats = Stats::from_features(features.iter().copied());
        stats.crashed_workers = usize::from(crash.is_some());
        let status = if crash.is_some() {
            ScenarioStatus::Failed
        } else {
            aggregate(features.iter().map(|f| f.status))
        };
        Self {
            worker,
            features: features.iter().map(|f| f.name.clone()).collect(),
            status,
            stats,
            crash,
            duration,
        }
    }
}

/// Everything a run produced, as handed to reporters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutionSummary {
    /// Aggregated status of the whole run.
    pub status: ScenarioStatus,

    /// Statistics over every worker.
    pub stats: Stats,

    /// Per-worker reports, by worker index.
    pub workers: Vec<WorkerReport>,

    /// Results of every feature, in input order.
    pub features: Vec<FeatureResult>,

    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl ExecutionSummary {
    /// Aggregates the `features` results and `workers` reports.
    #[must_use]
    pub fn new(
        features: Vec<FeatureResult>,
        workers: Vec<WorkerReport>,
        duration: Duration,
    ) -> Self {
        let mut stats = Stats::from_features(&features);
        stats.crashed_workers = workers.iter().filter(|w| w.crash.is_some()).count();
        let status = if stats.crashed_workers > 0 {
            ScenarioStatus::Failed
        } else {
            aggregate(features.iter().map(|f| f.status))
        };
        Self { status, stats, workers, features, duration }
    }

    /// Indicates whether execution has failed.
    #[must_use]
    pub const fn execution_has_failed(&self) -> bool {
        self.stats.execution_has_failed()
    }

    /// Crashes of every crashed worker.
    pub fn crashes(&self) -> impl Iterator<Item = &WorkerCrashError> {
        self.workers.iter().filter_map(|w| w.crash.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_track_statuses() {
        let mut counts = Counts::default();
        counts.record_scenario(ScenarioStatus::Passed);
        counts.record_scenario(ScenarioStatus::Failed);
        counts.record_step(StepStatus::Running);

        assert_eq!(counts, Counts { passed: 1, failed: 1, skipped: 0, pending: 1 });
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn stats_merge() {
        let mut stats = Stats::default();
        stats.scenarios.passed = 2;
        stats.merge(Stats { hook_errors: 1, crashed_workers: 1, ..Stats::default() });

        assert_eq!(stats.scenarios.passed, 2);
        assert!(stats.execution_has_failed());
    }

    #[test]
    fn empty_summary_has_not_failed() {
        let summary = ExecutionSummary::new(Vec::new(), Vec::new(), Duration::ZERO);
        assert!(!summary.execution_has_failed());
        assert_eq!(summary.stats.scenarios.total(), 0);
    }
}
