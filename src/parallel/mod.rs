// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parallel execution of features across isolated workers.
//!
//! - [`partition()`]: deterministic round-robin split of the work
//! - [`Coordinator`]: spawns the workers and aggregates their results
//!
//! Every worker is an OS thread with its own current-thread runtime and its
//! own [`Engine`] built by a [`Factory`], so no registry, store or resource
//! is ever shared between workers. The only interaction is sending results
//! back to the [`Coordinator`].

pub mod partition;
mod worker;

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use derive_more::with_trait::Debug;
use tokio::{
    sync::mpsc,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    cli::Config,
    context::ScenarioStatus,
    error::WorkerCrashError,
    feature::Feature,
    runner::{Engine, ExecutionSummary, FeatureResult, WorkerReport},
};

use self::worker::Message;

#[doc(inline)]
pub use self::{partition::partition, worker::Factory};

/// Runs features on [`Config::workers`] parallel workers.
///
/// # Example
///
/// ```rust
/// # use stepwise::{Config, Engine, Feature, parallel::Coordinator};
/// #
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = Config { workers: 2, ..Config::default() };
/// let coordinator = Coordinator::new(config.clone(), move |_worker| {
///     let engine = Engine::new(config.clone());
///     // Register steps and hooks here.
///     Ok(engine)
/// });
///
/// let summary = coordinator.run(vec![Feature::new("a"), Feature::new("b")]).await;
/// assert_eq!(summary.workers.len(), 2);
/// # }
/// ```
#[derive(Debug)]
pub struct Coordinator {
    config: Config,
    #[debug(skip)]
    factory: Factory,
    cancellation: CancellationToken,
}

/// Progress of a single worker as seen by the [`Coordinator`].
#[derive(Debug)]
struct WorkerState {
    worker: usize,

    /// Assigned features not reported yet, by input index.
    pending: BTreeMap<usize, Feature>,

    /// Reported results, by input index.
    results: Vec<(usize, FeatureResult)>,

    crash: Option<WorkerCrashError>,
    duration: Option<Duration>,
}

impl WorkerState {
    fn new(worker: usize, units: &[(usize, Feature)]) -> Self {
        Self {
            worker,
            pending: units.iter().cloned().collect(),
            results: Vec::new(),
            crash: None,
            duration: None,
        }
    }

    const fn is_running(&self) -> bool {
        self.crash.is_none() && self.duration.is_none()
    }

    fn crash(&mut self, err: WorkerCrashError) {
        error!(%err, "worker crashed");
        self.crash = Some(err);
    }
}

impl Coordinator {
    /// Creates a new [`Coordinator`] building each worker's [`Engine`] with
    /// the `factory`.
    pub fn new<F>(config: Config, factory: F) -> Self
    where
        F: Fn(usize) -> crate::Result<Engine> + Send + Sync + 'static,
    {
        Self { config, factory: Arc::new(factory), cancellation: CancellationToken::new() }
    }

    /// Token cancelling every worker.
    ///
    /// Once cancelled, no new workers or scenarios are started and in-flight
    /// steps get [`Config::grace_period`] to finish.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Runs the `features`, returning once every worker finished, crashed or
    /// exceeded [`Config::worker_timeout`].
    ///
    /// Features of a crashed worker it never reported are failed with the
    /// crash attached.
    pub async fn run(&self, features: Vec<Feature>) -> ExecutionSummary {
        let started = std::time::Instant::now();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut states = Vec::new();
        let mut not_started = Vec::new();
        for (worker, units) in partition(features.into_iter().enumerate(), self.config.workers)
            .into_iter()
            .enumerate()
        {
            if units.is_empty() {
                continue;
            }
            if self.cancellation.is_cancelled() {
                not_started.extend(units);
                continue;
            }

            let mut state = WorkerState::new(worker, &units);
            let spawned = worker::spawn(
                worker,
                units,
                Arc::clone(&self.factory),
                self.cancellation.clone(),
                tx.clone(),
            );
            if let Err(e) = spawned {
                state.crash(WorkerCrashError::Startup { worker, message: e.to_string() });
            }
            states.push(state);
        }
        drop(tx);
        debug!(workers = states.len(), "workers spawned");

        let deadline = Instant::now() + self.config.worker_timeout;
        while states.iter().any(WorkerState::is_running) {
            match time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(message)) => Self::handle(&mut states, message),
                Ok(None) => break,
                Err(_) => {
                    for state in states.iter_mut().filter(|s| s.is_running()) {
                        let timeout = self.config.worker_timeout;
                        state.crash(WorkerCrashError::TimedOut { worker: state.worker, timeout });
                    }
                }
            }
        }
        for state in states.iter_mut().filter(|s| s.is_running()) {
            state.crash(WorkerCrashError::Disconnected { worker: state.worker });
        }

        let mut results = not_started
            .iter()
            .map(|(i, f)| (*i, FeatureResult::not_run(f, ScenarioStatus::Pending)))
            .collect::<Vec<_>>();
        let mut reports = Vec::with_capacity(states.len());
        for mut state in states {
            let crash = state.crash.take();
            let leftover = std::mem::take(&mut state.pending);
            let reason = crash
                .clone()
                .unwrap_or(WorkerCrashError::Disconnected { worker: state.worker });
            state.results.extend(
                leftover
                    .into_iter()
                    .map(|(i, f)| (i, FeatureResult::crashed(&f, reason.clone()))),
            );
            state.results.sort_by_key(|(i, _)| *i);

            reports.push(WorkerReport::new(
                state.worker,
                state.results.iter().map(|(_, r)| r),
                crash,
                state.duration.unwrap_or_else(|| started.elapsed()),
            ));
            results.append(&mut state.results);
        }
        results.sort_by_key(|(i, _)| *i);

        ExecutionSummary::new(
            results.into_iter().map(|(_, r)| r).collect(),
            reports,
            started.elapsed(),
        )
    }

    fn handle(states: &mut [WorkerState], message: Message) {
        let worker = match &message {
            Message::Feature { worker, .. } | Message::Finished { worker, .. } => *worker,
            Message::Crashed(err) => err.worker(),
        };
        let Some(state) = states.iter_mut().find(|s| s.worker == worker) else {
            return;
        };

        match message {
            Message::Feature { index, result, .. } => {
                _ = state.pending.remove(&index);
                state.results.push((index, *result));
            }
            Message::Finished { duration, .. } => {
                debug!(worker, ?duration, "worker finished");
                state.duration = Some(duration);
            }
            Message::Crashed(err) => state.crash(err),
        }
    }
}
