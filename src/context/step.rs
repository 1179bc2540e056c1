// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`StepContext`]: state of a single step invocation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use derive_more::with_trait::Display;
use linked_hash_map::LinkedHashMap;
use mime::Mime;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{InvalidTransitionError, StepError},
    feature::{Keyword, Step},
};

/// Status of a [`StepContext`].
///
/// Only ever moves `Pending -> Running -> {Passed | Failed | Skipped}`.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not started yet.
    #[default]
    #[display("pending")]
    Pending,

    /// Started, not finished.
    #[display("running")]
    Running,

    /// Finished successfully.
    #[display("passed")]
    Passed,

    /// Finished with an error.
    #[display("failed")]
    Failed,

    /// Didn't run its body.
    #[display("skipped")]
    Skipped,
}

impl StepStatus {
    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }
}

/// Data attached to a [`StepContext`].
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    /// Raw bytes.
    pub data: Vec<u8>,

    /// Media type of the `data`.
    pub media_type: Mime,

    /// When it was attached.
    pub timestamp: DateTime<Utc>,
}

/// Free-text log line of a [`StepContext`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LogEntry {
    /// When it was logged.
    pub timestamp: DateTime<Utc>,

    /// Logged text.
    pub message: String,
}

/// State of a single step invocation.
///
/// Once terminal, its status, timing and error never change. Attachments,
/// logs and metadata may still be added.
#[derive(Debug)]
pub struct StepContext {
    keyword: Keyword,
    text: String,
    scenario_id: String,
    feature_name: String,
    status: StepStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    error: Option<StepError>,
    attachments: LinkedHashMap<String, Attachment>,
    logs: Vec<LogEntry>,
    metadata: LinkedHashMap<String, Value>,
}

impl Clone for StepContext {
    /// Fresh [`StepStatus::Pending`] copy carrying only the identity and the
    /// metadata.
    fn clone(&self) -> Self {
        let mut copy = Self::new(
            self.keyword,
            self.text.clone(),
            self.scenario_id.clone(),
            self.feature_name.clone(),
        );
        copy.metadata = self.metadata.clone();
        copy
    }
}

impl StepContext {
    /// Creates a new [`StepStatus::Pending`] [`StepContext`].
    #[must_use]
    pub fn new(
        keyword: Keyword,
        text: impl Into<String>,
        scenario_id: impl Into<String>,
        feature_name: impl Into<String>,
    ) -> Self {
        Self {
            keyword,
            text: text.into(),
            scenario_id: scenario_id.into(),
            feature_name: feature_name.into(),
            status: StepStatus::Pending,
            started_at: None,
            ended_at: None,
            error: None,
            attachments: LinkedHashMap::new(),
            logs: Vec::new(),
            metadata: LinkedHashMap::new(),
        }
    }

    /// Creates a new [`StepContext`] for the `step`.
    #[must_use]
    pub fn for_step(
        step: &Step,
        scenario_id: impl Into<String>,
        feature_name: impl Into<String>,
    ) -> Self {
        Self::new(step.keyword, step.text.clone(), scenario_id, feature_name)
    }

    fn transition(
        &mut self,
        from: StepStatus,
        to: StepStatus,
    ) -> Result<(), InvalidTransitionError> {
        if self.status != from {
            return Err(InvalidTransitionError { from: self.status, to });
        }
        self.status = to;
        Ok(())
    }

    fn finish(&mut self, to: StepStatus) -> Result<(), InvalidTransitionError> {
        self.transition(StepStatus::Running, to)?;
        self.ended_at = Some(Utc::now());
        debug!(
            step = %self.text,
            status = %to,
            duration = ?self.duration(),
            "step finished",
        );
        Ok(())
    }

    /// Moves from [`StepStatus::Pending`] to [`StepStatus::Running`].
    ///
    /// # Errors
    ///
    /// If this step has already started.
    pub fn mark_started(&mut self) -> Result<(), InvalidTransitionError> {
        self.transition(StepStatus::Pending, StepStatus::Running)?;
        self.started_at = Some(Utc::now());
        debug!(step = %self.text, scenario = %self.scenario_id, "step started");
        Ok(())
    }

    /// Moves from [`StepStatus::Running`] to [`StepStatus::Passed`].
    ///
    /// # Errors
    ///
    /// If this step isn't running.
    pub fn mark_passed(&mut self) -> Result<(), InvalidTransitionError> {
        self.finish(StepStatus::Passed)
    }

    /// Moves from [`StepStatus::Running`] to [`StepStatus::Failed`],
    /// recording the `error`.
    ///
    /// # Errors
    ///
    /// If this step isn't running. The `error` is dropped then.
    pub fn mark_failed(
        &mut self,
        error: StepError,
    ) -> Result<(), InvalidTransitionError> {
        self.finish(StepStatus::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    /// Moves from [`StepStatus::Running`] to [`StepStatus::Skipped`].
    ///
    /// # Errors
    ///
    /// If this step isn't running.
    pub fn mark_skipped(&mut self) -> Result<(), InvalidTransitionError> {
        self.finish(StepStatus::Skipped)
    }

    /// Attaches the `data`, named `attachment_<n>` (1-based position, or the
    /// next free number if that name is taken) when no `name` is given.
    /// Returns the name used.
    pub fn attach(
        &mut self,
        data: impl Into<Vec<u8>>,
        media_type: Mime,
        name: Option<&str>,
    ) -> String {
        let name = name.map_or_else(
            || {
                (self.attachments.len() + 1..)
                    .map(|n| format!("attachment_{n}"))
                    .find(|n| !self.attachments.contains_key(n))
                    .unwrap_or_default()
            },
            ToOwned::to_owned,
        );
        _ = self.attachments.insert(
            name.clone(),
            Attachment {
                data: data.into(),
                media_type,
                timestamp: Utc::now(),
            },
        );
        name
    }

    /// Appends a free-text log line.
    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry { timestamp: Utc::now(), message: message.into() });
    }

    /// Sets a metadata entry, returning the previous value.
    pub fn set_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.metadata.insert(key.into(), value.into())
    }

    /// Keyword of the step.
    #[must_use]
    pub const fn keyword(&self) -> Keyword {
        self.keyword
    }

    /// Text of the step.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Id of the scenario the step belongs to.
    #[must_use]
    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    /// Name of the feature the step belongs to.
    #[must_use]
    pub fn feature_name(&self) -> &str {
        &self.feature_name
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> StepStatus {
        self.status
    }

    /// When the step started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the step reached a terminal status.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Wall-clock duration: `end - start` once finished, `now - start` while
    /// running, zero before start.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.started_at.map_or(Duration::ZERO, |start| {
            let end = self.ended_at.unwrap_or_else(Utc::now);
            (end - start).to_std().unwrap_or_default()
        })
    }

    /// Recorded error of a [`StepStatus::Failed`] step.
    #[must_use]
    pub const fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    /// Attachments in insertion order.
    #[must_use]
    pub const fn attachments(&self) -> &LinkedHashMap<String, Attachment> {
        &self.attachments
    }

    /// Log lines in insertion order.
    #[must_use]
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Metadata entries in insertion order.
    #[must_use]
    pub const fn metadata(&self) -> &LinkedHashMap<String, Value> {
        &self.metadata
    }

    /// Serializable snapshot for reporting.
    #[must_use]
    pub fn export(&self) -> StepSnapshot {
        StepSnapshot {
            keyword: self.keyword,
            text: self.text.clone(),
            scenario_id: self.scenario_id.clone(),
            feature_name: self.feature_name.clone(),
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_ms: u64::try_from(self.duration().as_millis())
                .unwrap_or(u64::MAX),
            error: self.error.as_ref().map(ErrorSummary::from),
            attachments: self.attachments.len(),
            logs: self.logs.len(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Kind and message of a [`StepError`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ErrorSummary {
    /// [`StepError::kind()`].
    pub kind: &'static str,

    /// Rendered error.
    pub message: String,
}

impl From<&StepError> for ErrorSummary {
    fn from(err: &StepError) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }
}

/// Exported state of a [`StepContext`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepSnapshot {
    /// Keyword of the step.
    pub keyword: Keyword,

    /// Text of the step.
    pub text: String,

    /// Id of the owning scenario.
    pub scenario_id: String,

    /// Name of the owning feature.
    pub feature_name: String,

    /// Status at export time.
    pub status: StepStatus,

    /// Start time.
    pub started_at: Option<DateTime<Utc>>,

    /// End time.
    pub ended_at: Option<DateTime<Utc>>,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Error of a failed step.
    pub error: Option<ErrorSummary>,

    /// Number of attachments.
    pub attachments: usize,

    /// Number of log lines.
    pub logs: usize,

    /// Metadata entries.
    pub metadata: LinkedHashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::TimeoutError;

    fn context() -> StepContext {
        StepContext::new(Keyword::When, "I click login", "scenario-1", "Login")
    }

    #[test]
    fn happy_path_transitions() {
        let mut ctx = context();
        assert_eq!(ctx.status(), StepStatus::Pending);
        assert_eq!(ctx.duration(), Duration::ZERO);

        ctx.mark_started().unwrap();
        assert_eq!(ctx.status(), StepStatus::Running);
        assert!(ctx.started_at().is_some());
        assert!(ctx.ended_at().is_none());

        ctx.mark_passed().unwrap();
        assert_eq!(ctx.status(), StepStatus::Passed);
        assert!(ctx.ended_at() >= ctx.started_at());
    }

    #[test]
    fn terminal_status_is_final() {
        let mut ctx = context();
        ctx.mark_started().unwrap();
        ctx.mark_failed(TimeoutError::new("x", Duration::from_secs(1)).into())
            .unwrap();
        let ended = ctx.ended_at();

        assert_eq!(
            ctx.mark_passed(),
            Err(InvalidTransitionError {
                from: StepStatus::Failed,
                to: StepStatus::Passed,
            }),
        );
        assert!(ctx.mark_started().is_err());
        assert!(ctx.mark_skipped().is_err());
        assert_eq!(ctx.status(), StepStatus::Failed);
        assert_eq!(ctx.ended_at(), ended);
        assert_eq!(ctx.error().map(StepError::kind), Some("TimeoutError"));
    }

    #[test]
    fn cannot_finish_before_start() {
        let mut ctx = context();
        assert!(ctx.mark_passed().is_err());
        assert_eq!(ctx.status(), StepStatus::Pending);
    }

    #[test]
    fn attachments_get_positional_names() {
        let mut ctx = context();
        assert_eq!(ctx.attach("a", mime::TEXT_PLAIN, None), "attachment_1");
        assert_eq!(
            ctx.attach(vec![1, 2], mime::IMAGE_PNG, Some("screenshot")),
            "screenshot",
        );
        assert_eq!(ctx.attach("{}", mime::APPLICATION_JSON, None), "attachment_3");

        let names = ctx.attachments().keys().cloned().collect::<Vec<_>>();
        assert_eq!(names, ["attachment_1", "screenshot", "attachment_3"]);
        assert_eq!(ctx.attachments()["screenshot"].media_type, mime::IMAGE_PNG);
    }

    #[test]
    fn generated_names_skip_taken_ones() {
        let mut ctx = context();
        assert_eq!(
            ctx.attach("first", mime::TEXT_PLAIN, Some("attachment_2")),
            "attachment_2",
        );
        assert_eq!(ctx.attach("second", mime::TEXT_PLAIN, None), "attachment_3");

        assert_eq!(ctx.attachments().len(), 2);
        assert_eq!(ctx.attachments()["attachment_2"].data, b"first");
        assert_eq!(ctx.attachments()["attachment_3"].data, b"second");
        assert_eq!(ctx.status(), StepStatus::Pending);
    }

    #[test]
    fn clone_is_fresh_but_keeps_metadata() {
        let mut ctx = context();
        _ = ctx.set_metadata("attempts", 2);
        ctx.log("clicked");
        ctx.mark_started().unwrap();
        ctx.mark_passed().unwrap();

        let copy = ctx.clone();
        assert_eq!(copy.status(), StepStatus::Pending);
        assert!(copy.error().is_none());
        assert!(copy.logs().is_empty());
        assert_eq!(copy.metadata().get("attempts"), Some(&json!(2)));
        assert_eq!(copy.text(), "I click login");
    }

    #[test]
    fn export_is_lowercase_plain_data() {
        let mut ctx = context();
        ctx.mark_started().unwrap();
        ctx.mark_skipped().unwrap();
        ctx.log("not today");

        let json = serde_json::to_value(ctx.export()).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["logs"], 1);
        assert_eq!(json["attachments"], 0);
        assert_eq!(json["keyword"], "When");
        assert!(json["error"].is_null());
    }
}
