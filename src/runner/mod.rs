// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scenario and feature execution.
//!
//! - [`Engine`]: registries, store and resources of one pipeline, running
//!   scenarios sequentially
//! - [`result`]: [`ScenarioResult`] and [`FeatureResult`] handed to reporters
//! - [`summary`]: [`ExecutionSummary`] aggregated over features and workers
//! - [`shutdown_on_ctrl_c()`]: cancellation wired to `Ctrl+C`

mod executor;
pub mod result;
pub mod shutdown;
pub mod summary;

use std::any::Any;

use derive_more::with_trait::{Debug, Display, Error};
use futures::future::LocalBoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    cli::Config,
    error::RegistrationError,
    feature::{Feature, Scenario},
    hook::{HookCall, HookOptions, HookPhase, HookScheduler},
    parameter::ParameterType,
    resource::Resources,
    step::{
        Implementation, Owners, Pattern, StepCall, StepMetadata, StepRegistry,
    },
    store::VariableStore,
};

use self::executor::Execution;

#[doc(inline)]
pub use self::{
    result::{FeatureResult, ScenarioResult},
    shutdown::shutdown_on_ctrl_c,
    summary::{Counts, ExecutionSummary, Stats, WorkerReport},
};

/// Marker error making a step [`StepStatus::Skipped`] instead of failed.
///
/// [`StepStatus::Skipped`]: crate::context::StepStatus::Skipped
#[derive(Clone, Copy, Debug, Default, Display, Error)]
#[display("step skipped")]
pub struct Skipped;

/// Returns an error to propagate from a step implementation that wants to be
/// [`StepStatus::Skipped`].
///
/// [`StepStatus::Skipped`]: crate::context::StepStatus::Skipped
#[must_use]
pub fn skip() -> anyhow::Error {
    Skipped.into()
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "opaque panic payload".to_owned()
    }
}

/// Single execution pipeline: step and parameter registries, hooks, owner
/// instances, variable store and acquired resources.
///
/// Registries are populated before running anything and only read
/// afterwards. Every parallel worker builds its own [`Engine`], so nothing
/// here is shared between threads.
///
/// # Example
///
/// ```rust
/// # use futures::FutureExt as _;
/// # use stepwise::{Config, Engine, Implementation, Scenario, Step, StepCall, StepMetadata};
/// #
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> stepwise::Result<()> {
/// let mut engine = Engine::new(Config::default());
/// engine.register_step(
///     "I have {int} cucumbers",
///     Implementation::free(|mut call: StepCall<'_>| {
///         async move {
///             let count = call.arg::<i64>(0)?;
///             call.store("cucumbers", count);
///             anyhow::Ok(())
///         }
///         .boxed_local()
///     }),
///     StepMetadata::new(),
/// )?;
///
/// let scenario = Scenario::new("counting").step(Step::given("I have 5 cucumbers"));
/// let result = engine.run_scenario(&scenario).await;
/// assert!(result.is_passed());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Engine {
    config: Config,
    steps: StepRegistry,
    hooks: HookScheduler,
    owners: Owners,
    store: VariableStore,
    resources: Resources,
    cancellation: CancellationToken,
}

impl Engine {
    /// Creates a new [`Engine`] without any registrations.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            store: VariableStore::new(config.max_store_entries),
            resources: Resources::new(config.session_reuse),
            steps: StepRegistry::new(),
            hooks: HookScheduler::new(),
            owners: Owners::new(),
            cancellation: CancellationToken::new(),
            config,
        }
    }

    /// [`Config`] of this [`Engine`].
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a step definition.
    ///
    /// # Errors
    ///
    /// If the `pattern` is invalid or mentions an unknown parameter type.
    pub fn register_step(
        &mut self,
        pattern: impl Into<Pattern>,
        implementation: Implementation,
        metadata: StepMetadata,
    ) -> Result<&mut Self, RegistrationError> {
        _ = self.steps.register(pattern, implementation, metadata)?;
        Ok(self)
    }

    /// Registers a step invoked on the owner instance registered under the
    /// `owner` name.
    ///
    /// The instance is looked up when the step runs, so it may be registered
    /// later with [`Engine::register_owner_instance()`].
    ///
    /// # Errors
    ///
    /// See [`Engine::register_step()`].
    pub fn register_bound<O, F>(
        &mut self,
        pattern: impl Into<Pattern>,
        owner: impl Into<String>,
        method: F,
        metadata: StepMetadata,
    ) -> Result<&mut Self, RegistrationError>
    where
        O: Any,
        F: for<'a> Fn(&'a mut O, StepCall<'a>) -> LocalBoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        let owner = owner.into();
        self.register_step(
            pattern,
            Implementation::bound::<O, _>(owner.clone(), method),
            metadata.owner(owner),
        )
    }

    /// Registers a hook for the `phase`.
    pub fn register_hook<F>(
        &mut self,
        phase: HookPhase,
        hook: F,
        options: HookOptions,
    ) -> &mut Self
    where
        F: for<'a> Fn(HookCall<'a>) -> LocalBoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.register(phase, hook, options);
        self
    }

    /// Registers the `instance` bound steps of the `name` owner are invoked
    /// on.
    ///
    /// # Errors
    ///
    /// If another instance is already registered under the `name`.
    pub fn register_owner_instance<O: 'static>(
        &mut self,
        name: impl Into<String>,
        instance: O,
    ) -> Result<&mut Self, RegistrationError> {
        let name = name.into();
        debug!(owner = %name, "owner instance registered");
        self.owners.register(name, instance)?;
        Ok(self)
    }

    /// Defines a custom parameter type.
    ///
    /// # Errors
    ///
    /// If the name collides with a built-in type.
    pub fn define_parameter_type(
        &mut self,
        ty: ParameterType,
    ) -> Result<&mut Self, RegistrationError> {
        self.steps.define_parameter_type(ty)?;
        Ok(self)
    }

    /// Owner instance registered under the `name`, if it's an `O`.
    #[must_use]
    pub fn owner<O: 'static>(&self, name: &str) -> Option<&O> {
        self.owners.get(name)
    }

    /// Registered steps.
    #[must_use]
    pub const fn steps(&self) -> &StepRegistry {
        &self.steps
    }

    /// Registered hooks.
    #[must_use]
    pub const fn hooks(&self) -> &HookScheduler {
        &self.hooks
    }

    /// Variable store, for seeding global values before a run.
    pub fn store_mut(&mut self) -> &mut VariableStore {
        &mut self.store
    }

    /// Variable store.
    #[must_use]
    pub const fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Token cancelling this [`Engine`]'s runs.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Replaces the cancellation token, so an external one can stop this
    /// [`Engine`].
    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.cancellation = token;
    }

    /// Runs a standalone `scenario`.
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> ScenarioResult {
        self.execution().run_scenario("", scenario).await
    }

    /// Runs every scenario of the `feature` in order, with its background
    /// prepended and its tags inherited.
    ///
    /// Once cancelled, remaining scenarios aren't started and are reported
    /// as [`ScenarioStatus::Pending`].
    ///
    /// [`ScenarioStatus::Pending`]: crate::context::ScenarioStatus::Pending
    pub async fn run_feature(&mut self, feature: &Feature) -> FeatureResult {
        self.execution().run_feature(feature).await
    }

    /// Runs the `features` one after another.
    pub async fn run_features(&mut self, features: &[Feature]) -> ExecutionSummary {
        let started = std::time::Instant::now();
        let mut results = Vec::with_capacity(features.len());
        for feature in features {
            results.push(self.run_feature(feature).await);
        }
        let report = WorkerReport::new(0, &results, None, started.elapsed());
        ExecutionSummary::new(results, vec![report], started.elapsed())
    }

    /// Releases every acquired resource.
    pub fn release_resources(&mut self) -> usize {
        self.resources.release_all()
    }

    /// Splits the borrows needed to run scenarios.
    fn execution(&mut self) -> Execution<'_> {
        Execution {
            config: &self.config,
            steps: &self.steps,
            hooks: &self.hooks,
            owners: &mut self.owners,
            store: &mut self.store,
            resources: &mut self.resources,
            cancellation: &self.cancellation,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
