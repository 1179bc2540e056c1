// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parameter types: named [`Regex`]es paired with text to [`Argument`]
//! transformers.
//!
//! - [`definition`]: [`ParameterType`] itself
//! - [`builtin`]: `string`, `int`, `float`, `word`, `boolean`, `date`, `list`,
//!   `json` and `any`
//! - [`registry`]: [`ParameterRegistry`] with type detection and memoization
//! - [`value`]: [`Argument`] and [`FromArgument`]
//!
//! [`Regex`]: regex::Regex

pub mod builtin;
pub mod definition;
pub mod registry;
pub mod value;

pub use self::{
    definition::{ParameterType, Transformer},
    registry::ParameterRegistry,
    value::{Argument, FromArgument},
};
