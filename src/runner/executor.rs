// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sequential execution of scenarios, their steps and hooks.

use std::{
    panic::AssertUnwindSafe,
    time::{Duration, Instant},
};

use futures::FutureExt as _;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn, Instrument as _};

use crate::{
    cli::{Config, SessionReuse},
    context::{
        FeatureContext, ScenarioContext, ScenarioStatus, StepContext,
        StepSnapshot, StepStatus,
    },
    error::{
        HookFailureCause, HookFailureError, InvalidTransitionError, StepError,
        TimeoutError,
    },
    feature::{Feature, Scenario, Step},
    future::{bounded, Bounded},
    hook::{HookCall, HookPhase, HookScheduler},
    parameter::Argument,
    resource::Resources,
    step::{Implementation, Owners, StepCall, StepDefinition, StepRegistry},
    store::VariableStore,
    tracing::{hook_span, scenario_span, step_span},
};

use super::{panic_message, FeatureResult, ScenarioResult, Skipped};

/// Borrowed parts of an [`Engine`] needed to run scenarios.
///
/// [`Engine`]: super::Engine
pub(super) struct Execution<'e> {
    pub(super) config: &'e Config,
    pub(super) steps: &'e StepRegistry,
    pub(super) hooks: &'e HookScheduler,
    pub(super) owners: &'e mut Owners,
    pub(super) store: &'e mut VariableStore,
    pub(super) resources: &'e mut Resources,
    pub(super) cancellation: &'e CancellationToken,
}

/// How a single attempt of a step body ended.
enum Attempt {
    Passed,
    Skipped,
    Failed(StepError),
}

impl Execution<'_> {
    pub(super) async fn run_feature(&mut self, feature: &Feature) -> FeatureResult {
        let mut context = FeatureContext::new(&feature.name);
        let mut scenarios = Vec::with_capacity(feature.scenarios.len());

        for scenario in &feature.scenarios {
            let result = self.run_scenario(&feature.name, &feature.expand(scenario)).await;
            context.record(result.outcome());
            scenarios.push(result);
        }

        context.finish();
        FeatureResult::new(context.export(), scenarios)
    }

    pub(super) async fn run_scenario(
        &mut self,
        feature: &str,
        scenario: &Scenario,
    ) -> ScenarioResult {
        if self.cancellation.is_cancelled() {
            debug!(scenario = %scenario.id, "cancelled, not starting scenario");
            return ScenarioResult::not_run(feature, scenario, ScenarioStatus::Pending);
        }

        let span = scenario_span(&scenario.id, &scenario.name);
        self.execute_scenario(feature, scenario).instrument(span).await
    }

    async fn execute_scenario(
        &mut self,
        feature: &str,
        scenario: &Scenario,
    ) -> ScenarioResult {
        let started = Instant::now();
        let mut ctx = ScenarioContext::new(
            &scenario.id,
            &scenario.name,
            feature,
            scenario.tags.clone(),
            self.config.session_reuse,
        );
        debug!(tags = ?scenario.tags, "scenario started");

        let mut hook_errors = self.run_hooks(HookPhase::Before, &mut ctx, None).await;
        let before_failed = !hook_errors.is_empty();

        let mut failed = before_failed;
        let mut interrupted = false;
        for step in &scenario.steps {
            if self.cancellation.is_cancelled() {
                interrupted = true;
                break;
            }

            let step_ctx = if before_failed
                || (failed && self.config.fail_scenario_fast)
            {
                skipped(step, &ctx)
            } else {
                let (step_ctx, errors) = self
                    .run_step(&mut ctx, step)
                    .instrument(step_span(&step.text))
                    .await;
                hook_errors.extend(errors);
                step_ctx
            };

            failed |= step_ctx.status() == StepStatus::Failed;
            interrupted |= matches!(step_ctx.error(), Some(StepError::Cancelled { .. }));
            ctx.record_step(step_ctx.export());
            if interrupted {
                break;
            }
        }

        hook_errors.extend(self.run_hooks(HookPhase::After, &mut ctx, None).await);

        let steps = ctx.take_steps();
        let soft_failures = ctx.soft_failures().to_vec();
        let status = if before_failed || !soft_failures.is_empty() {
            ScenarioStatus::Failed
        } else if interrupted {
            last_recorded(&steps)
        } else {
            settled(&steps)
        };

        let cleared = self.store.clear_scope(&ctx.scope());
        if self.config.session_reuse == SessionReuse::PerScenario {
            _ = self.resources.release_all();
        }
        debug!(%status, cleared, interrupted, "scenario finished");

        ScenarioResult {
            id: scenario.id.clone(),
            name: scenario.name.clone(),
            feature: feature.to_owned(),
            tags: scenario.tags.clone(),
            status,
            steps,
            soft_failures,
            hook_errors,
            interrupted,
            duration: started.elapsed(),
        }
    }

    /// Runs the `step` bracketed by its step hooks, returning its terminal
    /// context and the hook failures.
    async fn run_step(
        &mut self,
        scenario: &mut ScenarioContext,
        step: &Step,
    ) -> (StepContext, Vec<HookFailureError>) {
        let mut ctx = StepContext::for_step(step, scenario.id(), scenario.feature_name());
        scenario.set_active_step(Some(step.text.clone()));
        settle(ctx.mark_started());

        let mut hook_errors = self
            .run_hooks(HookPhase::BeforeStep, scenario, Some(&mut ctx))
            .await;
        if let Some(err) = hook_errors.first() {
            settle(ctx.mark_failed(err.clone().into()));
        } else {
            match self.execute(scenario, &mut ctx, step).await {
                Attempt::Passed => settle(ctx.mark_passed()),
                Attempt::Skipped => settle(ctx.mark_skipped()),
                Attempt::Failed(err) => {
                    warn!(%err, "step failed");
                    settle(ctx.mark_failed(err));
                }
            }
        }

        hook_errors.extend(
            self.run_hooks(HookPhase::AfterStep, scenario, Some(&mut ctx)).await,
        );
        scenario.set_active_step(None);
        (ctx, hook_errors)
    }

    /// Resolves and invokes the `step`, re-attempting failures as configured.
    async fn execute(
        &mut self,
        scenario: &mut ScenarioContext,
        ctx: &mut StepContext,
        step: &Step,
    ) -> Attempt {
        let steps = self.steps;
        let resolved = match steps.resolve(&step.text) {
            Ok(resolved) => resolved,
            Err(err) => return Attempt::Failed(err),
        };
        let meta = resolved.definition.metadata();
        let attempts = 1 + meta.retry.unwrap_or(self.config.retry);
        let timeout = meta.timeout.unwrap_or(self.config.step_timeout);

        let mut attempt = 1;
        loop {
            ctx.set_metadata("attempts", attempt);
            let outcome = self
                .attempt(
                    resolved.definition,
                    resolved.args.clone(),
                    scenario,
                    ctx,
                    step,
                    timeout,
                )
                .await;
            match outcome {
                Attempt::Failed(err)
                    if attempt < attempts
                        && is_retriable(&err)
                        && !self.cancellation.is_cancelled() =>
                {
                    debug!(attempt, %err, "retrying step");
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn attempt(
        &mut self,
        definition: &StepDefinition,
        args: Vec<Argument>,
        scenario: &mut ScenarioContext,
        ctx: &mut StepContext,
        step: &Step,
        timeout: Duration,
    ) -> Attempt {
        let location = definition.metadata().location;
        let call = StepCall::new(
            step,
            args,
            scenario,
            ctx,
            &mut *self.store,
            &mut *self.resources,
        );
        let fut = match definition.implementation() {
            Implementation::Free(f) => f(call),
            Implementation::Bound { owner, method } => {
                match self.owners.get_mut(owner) {
                    Ok(instance) => method(instance, call),
                    Err(err) => return Attempt::Failed(err.into()),
                }
            }
        };

        let outcome = bounded(
            AssertUnwindSafe(fut).catch_unwind(),
            timeout,
            self.cancellation,
            self.config.grace_period,
        )
        .await;

        match outcome {
            Bounded::Completed(Ok(Ok(()))) => Attempt::Passed,
            Bounded::Completed(Ok(Err(e))) if e.downcast_ref::<Skipped>().is_some() => {
                Attempt::Skipped
            }
            Bounded::Completed(Ok(Err(e))) => {
                Attempt::Failed(StepError::from_implementation(e, location))
            }
            Bounded::Completed(Err(payload)) => Attempt::Failed(StepError::Panicked {
                message: panic_message(&*payload),
                location,
            }),
            Bounded::TimedOut => {
                Attempt::Failed(TimeoutError::new(&step.text, timeout).into())
            }
            Bounded::Cancelled => {
                Attempt::Failed(StepError::Cancelled { text: step.text.clone() })
            }
        }
    }

    /// Runs the applicable hooks of the `phase` in order.
    ///
    /// Before phases stop at the first failure; after phases run every hook
    /// and collect all the failures.
    async fn run_hooks(
        &mut self,
        phase: HookPhase,
        scenario: &mut ScenarioContext,
        mut step: Option<&mut StepContext>,
    ) -> Vec<HookFailureError> {
        let scheduler = self.hooks;
        let mut errors = Vec::new();

        for hook in scheduler.ordered_hooks(phase, scenario.tags()) {
            let timeout = hook.timeout.unwrap_or(self.config.step_timeout);
            let fut = (hook.implementation)(HookCall {
                phase,
                scenario: &mut *scenario,
                step: step.as_deref_mut(),
                store: &mut *self.store,
                resources: &mut *self.resources,
            });

            let outcome = bounded(
                AssertUnwindSafe(fut).catch_unwind(),
                timeout,
                self.cancellation,
                self.config.grace_period,
            )
            .instrument(hook_span(phase, &hook.name))
            .await;

            let cause = match outcome {
                Bounded::Completed(Ok(Ok(()))) => continue,
                Bounded::Completed(Ok(Err(e))) => HookFailureCause::Failed(format!("{e:#}")),
                Bounded::Completed(Err(payload)) => {
                    HookFailureCause::Panicked(panic_message(&*payload))
                }
                Bounded::TimedOut => {
                    HookFailureCause::TimedOut(TimeoutError::new(&hook.name, timeout))
                }
                Bounded::Cancelled => HookFailureCause::Cancelled,
            };
            let err = HookFailureError {
                phase,
                hook: hook.name.clone(),
                location: hook.location,
                cause,
            };
            warn!(%err, "hook failed");
            errors.push(err);

            if phase.is_before() {
                break;
            }
        }
        errors
    }
}

/// [`StepContext`] of a `step` that wasn't run.
fn skipped(step: &Step, scenario: &ScenarioContext) -> StepContext {
    let mut ctx = StepContext::for_step(step, scenario.id(), scenario.feature_name());
    settle(ctx.mark_started());
    settle(ctx.mark_skipped());
    ctx
}

/// Logs a status transition the engine itself got wrong.
fn settle(transition: Result<(), InvalidTransitionError>) {
    if let Err(err) = transition {
        error!(%err, "step status machine misuse");
    }
}

/// Whether another attempt may succeed after the `err`.
const fn is_retriable(err: &StepError) -> bool {
    !matches!(err, StepError::Cancelled { .. } | StepError::UnknownOwner(_))
}

/// Status of a scenario whose every step reached a terminal status.
fn settled(steps: &[StepSnapshot]) -> ScenarioStatus {
    let has = |status: StepStatus| steps.iter().any(|s| s.status == status);
    if has(StepStatus::Failed) {
        ScenarioStatus::Failed
    } else if has(StepStatus::Skipped) {
        ScenarioStatus::Skipped
    } else {
        ScenarioStatus::Passed
    }
}

/// Status of an interrupted scenario: the one of its last recorded step, or
/// [`ScenarioStatus::Failed`] if nothing was recorded.
fn last_recorded(steps: &[StepSnapshot]) -> ScenarioStatus {
    match steps.last().map(|s| s.status) {
        Some(StepStatus::Passed) => ScenarioStatus::Passed,
        Some(StepStatus::Skipped) => ScenarioStatus::Skipped,
        _ => ScenarioStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_status_follows_last_step() {
        assert_eq!(last_recorded(&[]), ScenarioStatus::Failed);
    }

    #[test]
    fn cancellation_is_not_retried() {
        assert!(!is_retriable(&StepError::Cancelled { text: "x".into() }));
        assert!(is_retriable(&TimeoutError::new("x", Duration::from_secs(1)).into()));
    }
}
