// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Top-level [`Error`] consolidating every error of this crate.

use derive_more::with_trait::{Display, Error as StdError};

use super::{
    InvalidTransitionError, RegistrationError, StepError, StoreError,
    WorkerCrashError,
};

/// Top-level error type for all engine operations.
#[derive(Clone, Debug, Display, StdError)]
pub enum Error {
    /// Something went wrong while registering steps, hooks, parameter types
    /// or owners.
    #[display("registration failed: {_0}")]
    Registration(RegistrationError),

    /// A step failed. Usually recorded on a [`StepContext`] rather than
    /// returned.
    ///
    /// [`StepContext`]: crate::context::StepContext
    #[display("{_0}")]
    Step(StepError),

    /// Variable or response store operation failed.
    #[display("{_0}")]
    Store(StoreError),

    /// [`StepContext`] status machine was misused.
    ///
    /// [`StepContext`]: crate::context::StepContext
    #[display("{_0}")]
    Transition(InvalidTransitionError),

    /// Parallel worker died.
    #[display("{_0}")]
    Worker(WorkerCrashError),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl From<RegistrationError> for Error {
    fn from(err: RegistrationError) -> Self {
        Self::Registration(err)
    }
}

impl From<StepError> for Error {
    fn from(err: StepError) -> Self {
        Self::Step(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<InvalidTransitionError> for Error {
    fn from(err: InvalidTransitionError) -> Self {
        Self::Transition(err)
    }
}

impl From<WorkerCrashError> for Error {
    fn from(err: WorkerCrashError) -> Self {
        Self::Worker(err)
    }
}
