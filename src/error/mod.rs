// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error taxonomy of the step resolution and execution engine.
//!
//! Errors are grouped by the moment they can occur:
//!
//! - [`registration`] - fatal at registration time (invalid patterns,
//!   redefined built-in parameter types, unknown types, duplicate owners)
//! - [`step`] - recorded on a [`StepContext`] while a step runs
//! - [`store`] - variable and response store lookups
//! - [`worker`] - parallel worker crashes
//!
//! [`core`] ties all of them into a single [`Error`] with a matching
//! [`Result`] alias.
//!
//! [`StepContext`]: crate::context::StepContext

pub mod core;
pub mod registration;
pub mod step;
pub mod store;
pub mod worker;

pub use self::{
    core::{Error, Result},
    registration::{
        AmbiguousRegistrationError, DuplicateBuiltinError, DuplicateOwnerError,
        PatternError, RegistrationError, TagExpressionError, UnknownTypeError,
    },
    step::{
        ArgumentError, HookFailureCause, HookFailureError,
        InvalidTransitionError, NoMatchingStepError, ParameterError,
        StepError, TimeoutError, TransformError, UnknownOwnerError,
    },
    store::{NotFoundError, PathQueryError, StoreError},
    worker::WorkerCrashError,
};
