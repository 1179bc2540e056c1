// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`tracing`] spans of the engine.
//!
//! Spans are created at [`Level::ERROR`] to minimize the chance of a
//! user-provided filter skipping them, so events emitted by step
//! implementations are always attributed to their scenario and step.
//!
//! [`Level::ERROR`]: tracing::Level::ERROR

use tracing::Span;

use crate::hook::HookPhase;

/// Creates a new [`Span`] for running a scenario.
pub(crate) fn scenario_span(id: &str, name: &str) -> Span {
    tracing::error_span!("scenario", scenario_id = id, name)
}

/// Creates a new [`Span`] for running a step.
pub(crate) fn step_span(text: &str) -> Span {
    tracing::error_span!("step", text)
}

/// Creates a new [`Span`] for running a hook.
pub(crate) fn hook_span(phase: HookPhase, name: &str) -> Span {
    tracing::error_span!("hook", %phase, name)
}

/// Creates a new [`Span`] for a parallel worker.
pub(crate) fn worker_span(worker: usize) -> Span {
    tracing::error_span!("worker", worker)
}
