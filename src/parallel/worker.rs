// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Single worker thread running its share of features.

use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    error::WorkerCrashError,
    feature::Feature,
    runner::{panic_message, Engine, FeatureResult},
    tracing::worker_span,
};

/// Builds the isolated [`Engine`] of a worker, inside that worker's thread.
pub type Factory = Arc<dyn Fn(usize) -> crate::Result<Engine> + Send + Sync>;

/// Message a worker sends to the coordinator.
#[derive(Debug)]
pub(super) enum Message {
    /// Feature was run.
    Feature {
        worker: usize,
        index: usize,
        result: Box<FeatureResult>,
    },

    /// Every assigned feature was run.
    Finished { worker: usize, duration: Duration },

    /// Worker died.
    Crashed(WorkerCrashError),
}

/// Spawns the `worker` thread running the `units`, each tagged with its
/// input index.
pub(super) fn spawn(
    worker: usize,
    units: Vec<(usize, Feature)>,
    factory: Factory,
    cancellation: CancellationToken,
    tx: mpsc::UnboundedSender<Message>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("stepwise-worker-{worker}"))
        .spawn(move || {
            let started = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                run(worker, units, &factory, &cancellation, &tx)
            }));
            let message = match outcome {
                Ok(Ok(())) => Message::Finished { worker, duration: started.elapsed() },
                Ok(Err(e)) => Message::Crashed(e),
                Err(payload) => Message::Crashed(WorkerCrashError::Panicked {
                    worker,
                    message: panic_message(&*payload),
                }),
            };
            if tx.send(message).is_err() {
                debug!(worker, "coordinator is gone");
            }
        })
}

fn run(
    worker: usize,
    units: Vec<(usize, Feature)>,
    factory: &Factory,
    cancellation: &CancellationToken,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<(), WorkerCrashError> {
    let startup = |message: String| WorkerCrashError::Startup { worker, message };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| startup(format!("failed to create runtime: {e}")))?;
    let mut engine = factory(worker).map_err(|e| startup(e.to_string()))?;
    engine.set_cancellation_token(cancellation.child_token());

    let _entered = worker_span(worker).entered();
    debug!(units = units.len(), "worker started");
    for (index, feature) in units {
        let result = runtime.block_on(engine.run_feature(&feature));
        let message = Message::Feature { worker, index, result: Box::new(result) };
        if tx.send(message).is_err() {
            debug!("coordinator is gone, stopping");
            break;
        }
    }
    Ok(())
}
