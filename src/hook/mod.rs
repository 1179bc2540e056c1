// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Hooks running around scenarios and steps.
//!
//! - [`filter`]: tag expression and predicate [`HookFilter`]s
//! - [`scheduler`]: [`HookScheduler`] picking and ordering applicable hooks

pub mod filter;
pub mod scheduler;

use std::{sync::Arc, time::Duration};

use derive_more::with_trait::{Debug, Display};
use futures::future::LocalBoxFuture;
use serde::Serialize;

use crate::{
    context::{ScenarioContext, StepContext},
    error::TagExpressionError,
    resource::Resources,
    step::Location,
    store::VariableStore,
};

pub use self::{
    filter::{Ext as TagOperationExt, HookFilter},
    scheduler::HookScheduler,
};

/// Moment a hook runs at.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
pub enum HookPhase {
    /// Before the first step of a scenario.
    Before,

    /// After the last step of a scenario, whatever happened.
    After,

    /// Before every step.
    BeforeStep,

    /// After every step, whatever happened.
    AfterStep,
}

impl HookPhase {
    /// Whether a failure of this phase aborts what it brackets.
    #[must_use]
    pub const fn is_before(self) -> bool {
        matches!(self, Self::Before | Self::BeforeStep)
    }
}

/// Type-erased hook implementation.
pub type HookFn = Arc<
    dyn for<'a> Fn(HookCall<'a>) -> LocalBoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// Everything a hook implementation gets access to.
#[derive(Debug)]
pub struct HookCall<'a> {
    /// Phase the hook runs in.
    pub phase: HookPhase,

    /// Context of the current scenario.
    pub scenario: &'a mut ScenarioContext,

    /// Context of the bracketed step, for step phases.
    pub step: Option<&'a mut StepContext>,

    /// Variable store of the engine.
    pub store: &'a mut VariableStore,

    /// Acquired resources.
    pub resources: &'a mut Resources,
}

/// Options of a registered hook.
#[derive(Clone, Debug, Default)]
pub struct HookOptions {
    /// Which scenarios the hook applies to.
    pub filter: HookFilter,

    /// Lower runs first. Ties keep registration order.
    pub order: i32,

    /// Overrides the default timeout.
    pub timeout: Option<Duration>,

    /// Name used in errors and logs.
    pub name: Option<String>,

    /// Where the hook was registered.
    pub location: Option<Location>,
}

impl HookOptions {
    /// Creates default [`HookOptions`]: unfiltered, order `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the hook to scenarios matching the tag `expression`.
    ///
    /// # Errors
    ///
    /// If the `expression` can't be parsed.
    pub fn tags(mut self, expression: &str) -> Result<Self, TagExpressionError> {
        self.filter = HookFilter::tags(expression)?;
        Ok(self)
    }

    /// Sets a caller-evaluated applicability.
    #[must_use]
    pub fn when(mut self, applies: bool) -> Self {
        self.filter = HookFilter::Evaluated(applies);
        self
    }

    /// Sets an arbitrary [`HookFilter`].
    #[must_use]
    pub fn filter(mut self, filter: HookFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the order.
    #[must_use]
    pub const fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the location.
    #[must_use]
    pub const fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Registered hook. Immutable once registered.
#[derive(Clone, Debug)]
pub struct Hook {
    /// Phase the hook runs in.
    pub phase: HookPhase,

    /// Name used in errors and logs.
    pub name: String,

    /// Which scenarios the hook applies to.
    pub filter: HookFilter,

    /// Lower runs first.
    pub order: i32,

    /// Overrides the default timeout.
    pub timeout: Option<Duration>,

    /// Where the hook was registered.
    pub location: Option<Location>,

    /// Implementation.
    #[debug(skip)]
    pub implementation: HookFn,
}

impl Hook {
    /// Whether this hook applies to a scenario with the `tags`.
    #[must_use]
    pub fn applies(&self, tags: &[String]) -> bool {
        self.filter.applies(tags)
    }
}
