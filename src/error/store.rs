// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors of the [`VariableStore`].
//!
//! [`VariableStore`]: crate::store::VariableStore

use derive_more::with_trait::{Display, Error};

use crate::store::Scope;

/// Nothing stored under an alias, neither in the requested scope nor in the
/// global fallback scope.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("no value stored under `{alias}` in scope `{scope}` or the global scope")]
pub struct NotFoundError {
    /// Requested alias.
    #[error(not(source))]
    pub alias: String,

    /// Scope the lookup started in.
    pub scope: Scope,
}

impl NotFoundError {
    /// Creates a new [`NotFoundError`].
    #[must_use]
    pub fn new(alias: impl Into<String>, scope: Scope) -> Self {
        Self { alias: alias.into(), scope }
    }
}

/// Path query against a stored value failed.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("cannot extract `{path}` from `{alias}`: {reason}")]
pub struct PathQueryError {
    /// Alias of the stored value.
    #[error(not(source))]
    pub alias: String,

    /// Path that was queried.
    pub path: String,

    /// What went wrong.
    pub reason: String,
}

/// Every error of a [`VariableStore`] operation.
///
/// [`VariableStore`]: crate::store::VariableStore
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum StoreError {
    /// Lookup missed.
    #[display("{_0}")]
    NotFound(NotFoundError),

    /// Path query failed.
    #[display("{_0}")]
    PathQuery(PathQueryError),

    /// Stored value isn't of the requested shape.
    #[display("value stored under `{alias}` cannot be read as requested: {reason}")]
    Conversion {
        /// Alias of the stored value.
        #[error(not(source))]
        alias: String,

        /// What went wrong.
        reason: String,
    },
}

impl From<NotFoundError> for StoreError {
    fn from(err: NotFoundError) -> Self {
        Self::NotFound(err)
    }
}

impl From<PathQueryError> for StoreError {
    fn from(err: PathQueryError) -> Self {
        Self::PathQuery(err)
    }
}
