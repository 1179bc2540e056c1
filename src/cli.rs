// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration inputs of the engine.
//!
//! [`Config`] is a [`clap::Args`] so a host binary can flatten it into its
//! own parser:
//!
//! ```rust
//! # use clap::Parser;
//! #
//! #[derive(Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     engine: stepwise::Config,
//! }
//!
//! let cli = Cli::parse_from(["tests", "--workers", "4", "--retry", "1"]);
//! assert_eq!(cli.engine.workers, 4);
//! ```
//!
//! Where the values come from is entirely up to the host.

use std::time::Duration;

use clap::ValueEnum;
use derive_more::with_trait::Display;
use serde::Serialize;
use smart_default::SmartDefault;

/// How an external page-object layer initializes its sessions.
///
/// The engine only uses it to decide when acquired [`Resource`]s are
/// released.
///
/// [`Resource`]: crate::Resource
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq, Serialize,
    ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SessionReuse {
    /// Fresh session for every scenario.
    #[default]
    #[display("per-scenario")]
    PerScenario,

    /// One session per worker, shared by its scenarios.
    #[display("per-worker")]
    PerWorker,
}

/// Options the engine reads.
#[derive(Clone, Debug, SmartDefault, clap::Args)]
#[group(skip)]
pub struct Config {
    /// Maximum number of stored variables per scope before the oldest ones
    /// are evicted.
    #[arg(long, value_name = "int", default_value_t = 1000)]
    #[default(1000)]
    pub max_store_entries: usize,

    /// Default timeout of steps and hooks.
    ///
    /// Duration is represented in a human-readable format like `12min5s`.
    #[arg(
        long,
        value_name = "duration",
        value_parser = humantime::parse_duration,
        default_value = "30s",
    )]
    #[default(Duration::from_secs(30))]
    pub step_timeout: Duration,

    /// Number of times a failed step is re-attempted.
    #[arg(long, value_name = "int", default_value_t = 0)]
    pub retry: usize,

    /// Number of parallel workers.
    #[arg(long, short, value_name = "int", default_value_t = 1)]
    #[default(1)]
    pub workers: usize,

    /// Session reuse strategy of the page-object layer.
    #[arg(long, value_enum, value_name = "strategy", default_value_t)]
    pub session_reuse: SessionReuse,

    /// Skip the remaining steps of a scenario after its first failed step.
    #[arg(long)]
    pub fail_scenario_fast: bool,

    /// Time in-flight steps get to finish after cancellation.
    #[arg(
        long,
        value_name = "duration",
        value_parser = humantime::parse_duration,
        default_value = "5s",
    )]
    #[default(Duration::from_secs(5))]
    pub grace_period: Duration,

    /// Fatal bound on waiting for a parallel worker.
    #[arg(
        long,
        value_name = "duration",
        value_parser = humantime::parse_duration,
        default_value = "10min",
    )]
    #[default(Duration::from_secs(600))]
    pub worker_timeout: Duration,
}
