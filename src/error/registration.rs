// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors fatal at registration time.
//!
//! None of these can happen while scenarios run: every pattern, parameter
//! type, tag expression and owner is validated once, when the registry is
//! populated.

use derive_more::with_trait::{Display, Error};

/// Attempt to redefine a built-in parameter type.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("parameter type `{name}` is built in and cannot be redefined")]
pub struct AmbiguousRegistrationError {
    /// Name of the built-in parameter type.
    #[error(not(source))]
    pub name: String,
}

/// Alias naming the only situation [`AmbiguousRegistrationError`] is raised
/// for.
pub type DuplicateBuiltinError = AmbiguousRegistrationError;

impl AmbiguousRegistrationError {
    /// Creates a new [`AmbiguousRegistrationError`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Parameter type referenced by name isn't registered.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("unknown parameter type `{name}`")]
pub struct UnknownTypeError {
    /// Name that was looked up.
    #[error(not(source))]
    pub name: String,
}

impl UnknownTypeError {
    /// Creates a new [`UnknownTypeError`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Step pattern or parameter type regex can't be compiled.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("invalid pattern `{pattern}`: {reason}")]
pub struct PatternError {
    /// Offending pattern source.
    #[error(not(source))]
    pub pattern: String,

    /// Why it was rejected.
    pub reason: String,
}

impl PatternError {
    /// Creates a new [`PatternError`].
    #[must_use]
    pub fn new(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}

/// Hook tag expression can't be parsed.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("invalid tag expression `{expression}`: {reason}")]
pub struct TagExpressionError {
    /// Offending expression.
    #[error(not(source))]
    pub expression: String,

    /// Parser message.
    pub reason: String,
}

/// Owner instance registered twice under the same name.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("owner `{name}` is already registered")]
pub struct DuplicateOwnerError {
    /// Name of the owner.
    #[error(not(source))]
    pub name: String,
}

/// Every error that can happen while populating registries.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum RegistrationError {
    /// Built-in parameter type redefinition.
    #[display("{_0}")]
    DuplicateBuiltin(AmbiguousRegistrationError),

    /// Step expression references an unregistered parameter type.
    #[display("{_0}")]
    UnknownType(UnknownTypeError),

    /// Invalid regex or expression.
    #[display("{_0}")]
    Pattern(PatternError),

    /// Invalid hook tag expression.
    #[display("{_0}")]
    TagExpression(TagExpressionError),

    /// Owner name clash.
    #[display("{_0}")]
    DuplicateOwner(DuplicateOwnerError),
}

impl From<AmbiguousRegistrationError> for RegistrationError {
    fn from(err: AmbiguousRegistrationError) -> Self {
        Self::DuplicateBuiltin(err)
    }
}

impl From<UnknownTypeError> for RegistrationError {
    fn from(err: UnknownTypeError) -> Self {
        Self::UnknownType(err)
    }
}

impl From<PatternError> for RegistrationError {
    fn from(err: PatternError) -> Self {
        Self::Pattern(err)
    }
}

impl From<TagExpressionError> for RegistrationError {
    fn from(err: TagExpressionError) -> Self {
        Self::TagExpression(err)
    }
}

impl From<DuplicateOwnerError> for RegistrationError {
    fn from(err: DuplicateOwnerError) -> Self {
        Self::DuplicateOwner(err)
    }
}
