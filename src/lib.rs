// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Behaviour-driven step resolution and execution engine.
//!
//! Given scenarios already parsed by a front end, [`Engine`] resolves every
//! step text to a registered implementation, coerces captured text into
//! typed [`Argument`]s, runs hooks around scenarios and steps, keeps mutable
//! state isolated per scenario, and reports plain-data results. The
//! [`parallel::Coordinator`] fans features out across isolated workers.
//!
//! # Example
//!
//! ```rust
//! use futures::FutureExt as _;
//! use stepwise::{
//!     Config, Engine, HookOptions, HookPhase, Implementation, Scenario,
//!     ScenarioStatus, Step, StepCall, StepMetadata,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> stepwise::Result<()> {
//! let mut engine = Engine::new(Config::default());
//! engine
//!     .register_step(
//!         "user enters {string} and {int}",
//!         Implementation::free(|mut call: StepCall<'_>| {
//!             async move {
//!                 let name = call.arg::<String>(0)?;
//!                 let age = call.arg::<i64>(1)?;
//!                 call.set_test_data("user", (name, age));
//!                 anyhow::Ok(())
//!             }
//!             .boxed_local()
//!         }),
//!         StepMetadata::at(stepwise::location!()),
//!     )?
//!     .register_hook(
//!         HookPhase::Before,
//!         |mut call| async move {
//!             call.scenario.set_test_data("seeded", true);
//!             anyhow::Ok(())
//!         }
//!         .boxed_local(),
//!         HookOptions::new(),
//!     );
//!
//! let scenario = Scenario::new("sign up")
//!     .step(Step::when(r#"user enters "abc" and 42"#));
//! let result = engine.run_scenario(&scenario).await;
//! assert_eq!(result.status, ScenarioStatus::Passed);
//! # Ok(())
//! # }
//! ```

#![deny(nonstandard_style, trivial_casts, trivial_numeric_casts)]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    clippy::dbg_macro,
    clippy::expect_used,
    clippy::missing_const_for_fn,
    clippy::unwrap_used,
    missing_docs,
    unused_results
)]

pub mod cli;
pub mod context;
pub mod data_table;
pub mod error;
pub mod feature;
mod future;
pub mod hook;
pub mod parallel;
pub mod parameter;
pub mod resource;
pub mod runner;
pub mod step;
pub mod store;
mod tracing;

pub use gherkin::tagexpr::TagOperation;

#[doc(inline)]
pub use self::{
    cli::{Config, SessionReuse},
    context::{ScenarioContext, ScenarioStatus, StepContext, StepStatus},
    data_table::DataTable,
    error::{Error, Result, StepError},
    feature::{Feature, Keyword, Scenario, Step},
    hook::{HookCall, HookFilter, HookOptions, HookPhase},
    parallel::Coordinator,
    parameter::{Argument, FromArgument, ParameterType},
    resource::{Resource, Resources},
    runner::{
        skip, Engine, ExecutionSummary, FeatureResult, ScenarioResult,
        Skipped,
    },
    step::{Implementation, Location, Pattern, StepCall, StepMetadata},
    store::{Scope, VariableStore},
};
