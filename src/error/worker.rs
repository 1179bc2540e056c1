// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors of parallel workers.

use std::time::Duration;

use derive_more::with_trait::{Display, Error};
use serde::Serialize;

/// A parallel worker died before reporting all of its units.
///
/// Remaining units of that worker are reported as failed; other workers keep
/// running.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum WorkerCrashError {
    /// Worker thread, runtime or engine couldn't be created.
    #[display("worker {worker} failed to start: {message}")]
    Startup {
        /// Worker index.
        #[error(not(source))]
        worker: usize,

        /// Underlying error.
        message: String,
    },

    /// Worker panicked outside of any step or hook.
    #[display("worker {worker} panicked: {message}")]
    Panicked {
        /// Worker index.
        #[error(not(source))]
        worker: usize,

        /// Panic payload rendered as text.
        message: String,
    },

    /// Worker hung up without saying goodbye.
    #[display("worker {worker} terminated unexpectedly")]
    Disconnected {
        /// Worker index.
        #[error(not(source))]
        worker: usize,
    },

    /// Worker didn't finish before the fatal deadline.
    #[display(
        "worker {worker} did not finish within {}",
        humantime::format_duration(*timeout),
    )]
    TimedOut {
        /// Worker index.
        #[error(not(source))]
        worker: usize,

        /// Deadline that was exceeded.
        timeout: Duration,
    },
}

impl WorkerCrashError {
    /// Index of the crashed worker.
    #[must_use]
    pub const fn worker(&self) -> usize {
        match self {
            Self::Startup { worker, .. }
            | Self::Panicked { worker, .. }
            | Self::Disconnected { worker }
            | Self::TimedOut { worker, .. } => *worker,
        }
    }
}
