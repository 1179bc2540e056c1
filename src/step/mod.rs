// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step registry and matcher.
//!
//! - [`pattern`]: literal, regex and cucumber-expression [`Pattern`]s
//! - [`definition`]: [`StepDefinition`]s with their [`Implementation`] and
//!   [`StepMetadata`]
//! - [`registry`]: [`StepRegistry`] resolving step texts first-match-wins
//! - [`call`]: [`StepCall`] handed to implementations
//! - [`owner`]: instances bound implementations are invoked against
//! - [`location`]: source [`Location`]s of definitions

pub mod call;
pub mod definition;
pub mod location;
pub mod owner;
pub mod pattern;
pub mod registry;

pub use self::{
    call::StepCall,
    definition::{BoundStepFn, Implementation, StepDefinition, StepFn, StepMetadata},
    location::Location,
    owner::Owners,
    pattern::Pattern,
    registry::{Resolved, StepRegistry},
};
