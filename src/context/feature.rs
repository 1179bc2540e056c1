// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`FeatureContext`]: aggregated outcomes of a feature's scenarios.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ScenarioStatus;

/// Outcome of a single scenario, as retained after its context is gone.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario id.
    pub id: String,

    /// Scenario name.
    pub name: String,

    /// Final status.
    pub status: ScenarioStatus,
}

/// State of a running feature.
#[derive(Clone, Debug)]
pub struct FeatureContext {
    name: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    outcomes: Vec<ScenarioOutcome>,
}

impl FeatureContext {
    /// Creates a new [`FeatureContext`] starting now.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: Utc::now(),
            ended_at: None,
            outcomes: Vec::new(),
        }
    }

    /// Name of the feature.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records the outcome of a finished scenario.
    pub fn record(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    /// Stamps the end time. Later calls keep the first one.
    pub fn finish(&mut self) {
        _ = self.ended_at.get_or_insert_with(Utc::now);
    }

    /// Outcomes recorded so far.
    #[must_use]
    pub fn outcomes(&self) -> &[ScenarioOutcome] {
        &self.outcomes
    }

    /// Number of recorded scenarios with the `status`.
    #[must_use]
    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Aggregated status: [`ScenarioStatus::Failed`] if any scenario failed,
    /// [`ScenarioStatus::Pending`] if nothing ran or something never
    /// started, [`ScenarioStatus::Skipped`] if anything was skipped,
    /// [`ScenarioStatus::Passed`] otherwise.
    #[must_use]
    pub fn status(&self) -> ScenarioStatus {
        aggregate(self.outcomes.iter().map(|o| o.status))
    }

    /// Wall-clock duration, up to now while unfinished.
    #[must_use]
    pub fn duration(&self) -> Duration {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).to_std().unwrap_or_default()
    }

    /// Serializable snapshot for reporting.
    #[must_use]
    pub fn export(&self) -> FeatureSnapshot {
        FeatureSnapshot {
            name: self.name.clone(),
            status: self.status(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_ms: u64::try_from(self.duration().as_millis())
                .unwrap_or(u64::MAX),
            outcomes: self.outcomes.clone(),
        }
    }
}

/// Folds scenario statuses into one.
#[must_use]
pub fn aggregate(statuses: impl IntoIterator<Item = ScenarioStatus>) -> ScenarioStatus {
    let (mut any, mut failed, mut pending, mut skipped) =
        (false, false, false, false);
    for status in statuses {
        any = true;
        match status {
            ScenarioStatus::Failed => failed = true,
            ScenarioStatus::Pending => pending = true,
            ScenarioStatus::Skipped => skipped = true,
            ScenarioStatus::Passed => {}
        }
    }

    if failed {
        ScenarioStatus::Failed
    } else if pending || !any {
        ScenarioStatus::Pending
    } else if skipped {
        ScenarioStatus::Skipped
    } else {
        ScenarioStatus::Passed
    }
}

/// Exported state of a [`FeatureContext`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FeatureSnapshot {
    /// Feature name.
    pub name: String,

    /// Aggregated status.
    pub status: ScenarioStatus,

    /// Start time.
    pub started_at: DateTime<Utc>,

    /// End time.
    pub ended_at: Option<DateTime<Utc>>,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Outcomes of every scenario.
    pub outcomes: Vec<ScenarioOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: ScenarioStatus) -> ScenarioOutcome {
        ScenarioOutcome { id: "s".into(), name: "s".into(), status }
    }

    #[test]
    fn aggregates_statuses() {
        use ScenarioStatus as S;

        assert_eq!(aggregate([]), S::Pending);
        assert_eq!(aggregate([S::Passed, S::Skipped]), S::Skipped);
        assert_eq!(aggregate([S::Skipped, S::Failed, S::Pending]), S::Failed);
        assert_eq!(aggregate([S::Passed, S::Pending]), S::Pending);
        assert_eq!(aggregate([S::Passed]), S::Passed);
    }

    #[test]
    fn records_and_exports() {
        let mut ctx = FeatureContext::new("Checkout");
        ctx.record(outcome(ScenarioStatus::Passed));
        ctx.record(outcome(ScenarioStatus::Failed));
        ctx.finish();
        let ended = ctx.export().ended_at;
        ctx.finish();

        assert_eq!(ctx.count(ScenarioStatus::Failed), 1);
        let snapshot = ctx.export();
        assert_eq!(snapshot.status, ScenarioStatus::Failed);
        assert_eq!(snapshot.ended_at, ended);
        assert_eq!(snapshot.outcomes.len(), 2);
    }
}
