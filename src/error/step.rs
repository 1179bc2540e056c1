// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors recorded on a [`StepContext`] while a step runs.
//!
//! Everything here is caught at the step-invocation boundary and never
//! escapes the scenario it happened in.
//!
//! [`StepContext`]: crate::context::StepContext

use std::time::Duration;

use derive_more::with_trait::{Display, Error};
use serde::Serialize;

use crate::{context::StepStatus, hook::HookPhase, step::Location};

use super::{NotFoundError, PathQueryError, StoreError, UnknownTypeError};

/// No registered pattern matches the step text.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq, Serialize)]
#[display(
    "no step definition matches `{text}`{}",
    snippet.as_ref().map(|s| format!(", consider registering `{s}`"))
        .unwrap_or_default(),
)]
pub struct NoMatchingStepError {
    /// Unmatched step text.
    #[error(not(source))]
    pub text: String,

    /// Suggested expression for a new definition.
    pub snippet: Option<String>,
}

/// Captured text can't be coerced into the declared parameter type.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq, Serialize)]
#[display("cannot transform `{text}` into `{type_name}`: {reason}")]
pub struct TransformError {
    /// Target parameter type.
    #[error(not(source))]
    pub type_name: String,

    /// Offending text.
    pub text: String,

    /// Underlying conversion message.
    pub reason: String,
}

/// Error of [`ParameterRegistry::transform()`].
///
/// [`ParameterRegistry::transform()`]: crate::ParameterRegistry::transform
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum ParameterError {
    /// Parameter type isn't registered.
    #[display("{_0}")]
    UnknownType(UnknownTypeError),

    /// Transformer rejected the text.
    #[display("{_0}")]
    Transform(TransformError),
}

impl From<UnknownTypeError> for ParameterError {
    fn from(err: UnknownTypeError) -> Self {
        Self::UnknownType(err)
    }
}

impl From<TransformError> for ParameterError {
    fn from(err: TransformError) -> Self {
        Self::Transform(err)
    }
}

/// Step implementation asked for an argument it can't have.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display(
    "argument #{index} is not a `{expected}`{}",
    actual.map(|a| format!(" (got `{a}`)")).unwrap_or_else(|| " (missing)".into()),
)]
pub struct ArgumentError {
    /// Zero-based argument position.
    #[error(not(source))]
    pub index: usize,

    /// Requested Rust type.
    pub expected: &'static str,

    /// Parameter kind actually present, if any.
    pub actual: Option<&'static str>,
}

/// Step or hook exceeded its time budget.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq, Serialize)]
#[display("`{what}` timed out after {}", humantime::format_duration(*timeout))]
pub struct TimeoutError {
    /// Step text or hook name.
    #[error(not(source))]
    pub what: String,

    /// Budget that was exceeded.
    pub timeout: Duration,
}

impl TimeoutError {
    /// Creates a new [`TimeoutError`].
    #[must_use]
    pub fn new(what: impl Into<String>, timeout: Duration) -> Self {
        Self { what: what.into(), timeout }
    }
}

/// Why a hook failed.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq, Serialize)]
pub enum HookFailureCause {
    /// Hook returned an error.
    #[display("{_0}")]
    Failed(#[error(not(source))] String),

    /// Hook panicked.
    #[display("panicked: {_0}")]
    Panicked(#[error(not(source))] String),

    /// Hook exceeded its timeout.
    #[display("{_0}")]
    TimedOut(TimeoutError),

    /// Hook was force-terminated after a shutdown grace period.
    #[display("cancelled by shutdown")]
    Cancelled,
}

/// Hook failed.
///
/// [`HookPhase::Before`] and [`HookPhase::BeforeStep`] failures abort what
/// they bracket. [`HookPhase::After`] and [`HookPhase::AfterStep`] failures
/// are collected as secondary errors.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq, Serialize)]
#[display(
    "{phase} hook `{hook}`{} failed: {cause}",
    location.map(|l| format!(" ({l})")).unwrap_or_default(),
)]
pub struct HookFailureError {
    /// Phase the hook was registered for.
    #[error(not(source))]
    pub phase: HookPhase,

    /// Hook name.
    pub hook: String,

    /// Where the hook was registered.
    pub location: Option<Location>,

    /// What went wrong.
    #[error(not(source))]
    pub cause: HookFailureCause,
}

/// Bound step references an owner that was never registered.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("no owner instance registered under `{name}`")]
pub struct UnknownOwnerError {
    /// Owner name.
    #[error(not(source))]
    pub name: String,
}

/// Attempt to leave a terminal [`StepStatus`] or to skip a state.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[display("invalid step status transition from `{from}` to `{to}`")]
pub struct InvalidTransitionError {
    /// Current status.
    #[error(not(source))]
    pub from: StepStatus,

    /// Requested status.
    pub to: StepStatus,
}

/// Every reason a step can end up [`StepStatus::Failed`].
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum StepError {
    /// Nothing matched the step text.
    #[display("{_0}")]
    NoMatch(NoMatchingStepError),

    /// Parameter coercion failed.
    #[display("{_0}")]
    Transform(TransformError),

    /// Parameter type vanished between registration and resolution.
    #[display("{_0}")]
    UnknownType(UnknownTypeError),

    /// Implementation requested an argument of a wrong type.
    #[display("{_0}")]
    Argument(ArgumentError),

    /// Variable or response lookup missed.
    #[display("{_0}")]
    NotFound(NotFoundError),

    /// Path query against a stored value failed.
    #[display("{_0}")]
    PathQuery(PathQueryError),

    /// Step exceeded its timeout.
    #[display("{_0}")]
    Timeout(TimeoutError),

    /// A `BeforeStep` hook failed, so the body never ran.
    #[display("{_0}")]
    Hook(HookFailureError),

    /// Bound step owner is missing.
    #[display("{_0}")]
    UnknownOwner(UnknownOwnerError),

    /// Implementation returned an error.
    #[display(
        "{message}{}",
        location.map(|l| format!(" --> {l}")).unwrap_or_default(),
    )]
    Failed {
        /// Rendered error chain.
        #[error(not(source))]
        message: String,

        /// Definition location.
        location: Option<Location>,
    },

    /// Implementation panicked.
    #[display(
        "step panicked: {message}{}",
        location.map(|l| format!(" --> {l}")).unwrap_or_default(),
    )]
    Panicked {
        /// Panic payload rendered as text.
        #[error(not(source))]
        message: String,

        /// Definition location.
        location: Option<Location>,
    },

    /// Implementation was force-terminated after a shutdown grace period.
    #[display("`{text}` was cancelled by shutdown")]
    Cancelled {
        /// Step text.
        #[error(not(source))]
        text: String,
    },
}

impl StepError {
    /// Stable name of this error kind, as handed to reporters.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoMatch(_) => "NoMatchingStepError",
            Self::Transform(_) => "TransformError",
            Self::UnknownType(_) => "UnknownTypeError",
            Self::Argument(_) => "ArgumentError",
            Self::NotFound(_) => "NotFoundError",
            Self::PathQuery(_) => "PathQueryError",
            Self::Timeout(_) => "TimeoutError",
            Self::Hook(_) => "HookFailureError",
            Self::UnknownOwner(_) => "UnknownOwnerError",
            Self::Failed { .. } => "StepFailure",
            Self::Panicked { .. } => "Panic",
            Self::Cancelled { .. } => "Cancelled",
        }
    }

    /// Converts an error returned by a step implementation, recovering the
    /// engine's own error kinds when the implementation just propagated them
    /// with `?`.
    #[must_use]
    pub fn from_implementation(
        err: anyhow::Error,
        location: Option<Location>,
    ) -> Self {
        let err = match err.downcast::<StoreError>() {
            Ok(e) => return e.into(),
            Err(e) => e,
        };
        let err = match err.downcast::<NotFoundError>() {
            Ok(e) => return Self::NotFound(e),
            Err(e) => e,
        };
        let err = match err.downcast::<PathQueryError>() {
            Ok(e) => return Self::PathQuery(e),
            Err(e) => e,
        };
        let err = match err.downcast::<ParameterError>() {
            Ok(e) => return e.into(),
            Err(e) => e,
        };
        let err = match err.downcast::<TransformError>() {
            Ok(e) => return Self::Transform(e),
            Err(e) => e,
        };
        let err = match err.downcast::<ArgumentError>() {
            Ok(e) => return Self::Argument(e),
            Err(e) => e,
        };
        match err.downcast::<TimeoutError>() {
            Ok(e) => Self::Timeout(e),
            Err(e) => Self::Failed { message: format!("{e:#}"), location },
        }
    }
}

impl From<ParameterError> for StepError {
    fn from(err: ParameterError) -> Self {
        match err {
            ParameterError::UnknownType(e) => Self::UnknownType(e),
            ParameterError::Transform(e) => Self::Transform(e),
        }
    }
}

impl From<StoreError> for StepError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(e) => Self::NotFound(e),
            StoreError::PathQuery(e) => Self::PathQuery(e),
            e @ StoreError::Conversion { .. } => {
                Self::Failed { message: e.to_string(), location: None }
            }
        }
    }
}

impl From<NoMatchingStepError> for StepError {
    fn from(err: NoMatchingStepError) -> Self {
        Self::NoMatch(err)
    }
}

impl From<TimeoutError> for StepError {
    fn from(err: TimeoutError) -> Self {
        Self::Timeout(err)
    }
}

impl From<HookFailureError> for StepError {
    fn from(err: HookFailureError) -> Self {
        Self::Hook(err)
    }
}

impl From<ArgumentError> for StepError {
    fn from(err: ArgumentError) -> Self {
        Self::Argument(err)
    }
}

impl From<UnknownOwnerError> for StepError {
    fn from(err: UnknownOwnerError) -> Self {
        Self::UnknownOwner(err)
    }
}
