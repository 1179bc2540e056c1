// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`StepDefinition`]: a pattern, its implementation and metadata.

use std::{
    any::{type_name, Any},
    sync::Arc,
    time::Duration,
};

use anyhow::anyhow;
use derive_more::with_trait::Debug;
use futures::{future::LocalBoxFuture, FutureExt as _};

use super::{pattern::Matcher, Location, Pattern, StepCall};

/// Free step implementation.
pub type StepFn = Arc<
    dyn for<'a> Fn(StepCall<'a>) -> LocalBoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// Step implementation bound to an owner instance, receiving it type-erased.
pub type BoundStepFn = Arc<
    dyn for<'a> Fn(
            &'a mut dyn Any,
            StepCall<'a>,
        ) -> LocalBoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// How a step implementation is invoked.
#[derive(Clone, Debug)]
pub enum Implementation {
    /// Plain function.
    #[debug("Free")]
    Free(StepFn),

    /// Method of a registered owner instance.
    #[debug("Bound({owner:?})")]
    Bound {
        /// Name the owner instance is registered under.
        owner: String,

        /// Method, receiving the owner instance.
        method: BoundStepFn,
    },
}

impl Implementation {
    /// Wraps a plain step function.
    pub fn free<F>(f: F) -> Self
    where
        F: for<'a> Fn(StepCall<'a>) -> LocalBoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        Self::Free(Arc::new(f))
    }

    /// Wraps a method of the `O` owner registered under the `owner` name.
    pub fn bound<O, F>(owner: impl Into<String>, f: F) -> Self
    where
        O: Any,
        F: for<'a> Fn(&'a mut O, StepCall<'a>) -> LocalBoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        Self::Bound {
            owner: owner.into(),
            method: Arc::new(erase(move |owner, call| {
                match owner.downcast_mut::<O>() {
                    Some(owner) => f(owner, call),
                    None => {
                        let expected = type_name::<O>();
                        async move {
                            Err(anyhow!("owner instance is not a `{expected}`"))
                        }
                        .boxed_local()
                    }
                }
            })),
        }
    }

    /// Name of the owner, for bound implementations.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::Free(_) => None,
            Self::Bound { owner, .. } => Some(owner),
        }
    }
}

/// Pins the higher-ranked signature of a type-erased bound method.
fn erase<F>(f: F) -> F
where
    F: for<'a> Fn(
        &'a mut dyn Any,
        StepCall<'a>,
    ) -> LocalBoxFuture<'a, anyhow::Result<()>>,
{
    f
}

/// Metadata of a [`StepDefinition`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StepMetadata {
    /// Where the definition was registered.
    pub location: Option<Location>,

    /// Overrides the default step timeout.
    pub timeout: Option<Duration>,

    /// Overrides the default number of retries.
    pub retry: Option<usize>,

    /// Name of the owner, if any.
    pub owner: Option<String>,
}

impl StepMetadata {
    /// Creates empty [`StepMetadata`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates [`StepMetadata`] pointing at the `location`.
    #[must_use]
    pub fn at(location: Location) -> Self {
        Self { location: Some(location), ..Self::default() }
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the number of retries.
    #[must_use]
    pub const fn retry(mut self, retry: usize) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the owner name.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Registered step. Immutable once registered.
#[derive(Clone, Debug)]
pub struct StepDefinition {
    pattern: Pattern,
    #[debug(skip)]
    matcher: Matcher,
    implementation: Implementation,
    metadata: StepMetadata,
}

impl StepDefinition {
    pub(crate) fn new(
        pattern: Pattern,
        matcher: Matcher,
        implementation: Implementation,
        mut metadata: StepMetadata,
    ) -> Self {
        if let Some(owner) = implementation.owner() {
            metadata.owner = Some(owner.to_owned());
        }
        Self { pattern, matcher, implementation, metadata }
    }

    /// Pattern of this definition.
    #[must_use]
    pub const fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub(crate) const fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Implementation of this definition.
    #[must_use]
    pub const fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    /// Metadata of this definition.
    #[must_use]
    pub const fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    /// Declared parameter type of every argument, in order. [`None`] marks
    /// raw regex captures, whose type is detected from the matched text.
    #[must_use]
    pub fn parameter_types(&self) -> Vec<Option<&str>> {
        self.matcher.parameter_types()
    }
}
