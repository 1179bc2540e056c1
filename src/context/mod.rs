// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution context hierarchy.
//!
//! - [`FeatureContext`] owns the outcomes of its scenarios;
//! - [`ScenarioContext`] lives while its scenario runs and holds the test
//!   data, the step history and soft assertion failures;
//! - [`StepContext`] is a small state machine, one per step invocation.
//!
//! Every level exports a [`Serialize`]able snapshot for reporting.
//!
//! [`Serialize`]: serde::Serialize

pub mod feature;
pub mod scenario;
pub mod step;

pub use self::{
    feature::{aggregate, FeatureContext, FeatureSnapshot, ScenarioOutcome},
    scenario::{ScenarioContext, ScenarioSnapshot, ScenarioStatus},
    step::{
        Attachment, ErrorSummary, LogEntry, StepContext, StepSnapshot,
        StepStatus,
    },
};
