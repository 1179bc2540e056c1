// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`StepCall`]: everything a step implementation receives.

use std::any::Any;

use derive_more::with_trait::Debug;
use mime::Mime;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    context::{ScenarioContext, StepContext},
    data_table::DataTable,
    error::{ArgumentError, StoreError},
    feature::Step,
    parameter::{Argument, FromArgument},
    resource::{Resource, Resources},
    store::{Scope, VariableStore},
};

/// Invocation of a step implementation.
///
/// Contexts are passed explicitly: there is no ambient "current scenario".
///
/// # Example
///
/// ```rust
/// # use futures::FutureExt as _;
/// # use stepwise::{Implementation, StepCall};
/// #
/// let add = Implementation::free(|mut call: StepCall<'_>| {
///     async move {
///         let (a, b) = (call.arg::<i64>(0)?, call.arg::<i64>(1)?);
///         call.set_test_data("sum", a + b);
///         call.store("sum", a + b);
///         anyhow::Ok(())
///     }
///     .boxed_local()
/// });
/// # drop(add);
/// ```
#[derive(Debug)]
pub struct StepCall<'a> {
    step: &'a Step,
    args: Vec<Argument>,
    scenario: &'a mut ScenarioContext,
    context: &'a mut StepContext,
    store: &'a mut VariableStore,
    #[debug(skip)]
    resources: &'a mut Resources,
}

impl<'a> StepCall<'a> {
    pub(crate) fn new(
        step: &'a Step,
        args: Vec<Argument>,
        scenario: &'a mut ScenarioContext,
        context: &'a mut StepContext,
        store: &'a mut VariableStore,
        resources: &'a mut Resources,
    ) -> Self {
        Self { step, args, scenario, context, store, resources }
    }

    /// Step being executed.
    #[must_use]
    pub const fn step(&self) -> &Step {
        self.step
    }

    /// Text of the step.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.step.text
    }

    /// Tabular argument of the step.
    #[must_use]
    pub fn table(&self) -> Option<&DataTable> {
        self.step.table.as_ref()
    }

    /// Doc-string argument of the step.
    #[must_use]
    pub fn docstring(&self) -> Option<&str> {
        self.step.docstring.as_deref()
    }

    /// Arguments extracted from the step text.
    #[must_use]
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// The `index`-th argument converted into `T`.
    ///
    /// # Errors
    ///
    /// If there is no such argument or it can't be converted.
    pub fn arg<T: FromArgument>(&self, index: usize) -> Result<T, ArgumentError> {
        T::extract(&self.args, index)
    }

    /// Context of the current scenario.
    #[must_use]
    pub fn scenario_context(&self) -> &ScenarioContext {
        self.scenario
    }

    /// Mutable context of the current scenario.
    pub fn scenario_context_mut(&mut self) -> &mut ScenarioContext {
        self.scenario
    }

    /// Context of this step invocation.
    #[must_use]
    pub fn step_context(&self) -> &StepContext {
        self.context
    }

    /// Mutable context of this step invocation.
    pub fn step_context_mut(&mut self) -> &mut StepContext {
        self.context
    }

    /// Scenario test data under the `key`, if present and of type `T`.
    #[must_use]
    pub fn test_data<T: Any>(&self, key: &str) -> Option<&T> {
        self.scenario.test_data(key)
    }

    /// Sets scenario test data under the `key`.
    pub fn set_test_data<T: Any>(&mut self, key: impl Into<String>, value: T) {
        self.scenario.set_test_data(key, value);
    }

    /// Records a soft assertion failure unless the `condition` holds.
    pub fn soft_assert(&mut self, condition: bool, message: impl Into<String>) {
        if !condition {
            self.scenario.add_soft_assertion_failure(message);
        }
    }

    /// Attaches `data` to this step. See [`StepContext::attach()`].
    pub fn attach(
        &mut self,
        data: impl Into<Vec<u8>>,
        media_type: Mime,
        name: Option<&str>,
    ) -> String {
        self.context.attach(data, media_type, name)
    }

    /// Appends a log line to this step.
    pub fn log(&mut self, message: impl Into<String>) {
        self.context.log(message);
    }

    /// Whole variable store, for scopes other than the current scenario.
    pub fn variables(&mut self) -> &mut VariableStore {
        self.store
    }

    /// Stores the `value` in the scope of the current scenario.
    pub fn store<T>(&mut self, alias: impl Into<String>, value: T)
    where
        T: Serialize + Any + Send + Sync,
    {
        self.store.store(alias, value, &self.scenario.scope());
    }

    /// Stores the `value` in the global scope.
    pub fn store_global<T>(&mut self, alias: impl Into<String>, value: T)
    where
        T: Serialize + Any + Send + Sync,
    {
        self.store.store(alias, value, &Scope::Global);
    }

    /// Retrieves the value under the `alias` from the current scenario's
    /// scope, falling back to the global one.
    ///
    /// # Errors
    ///
    /// If the `alias` is absent or of another shape.
    pub fn retrieve<T: DeserializeOwned>(&self, alias: &str) -> Result<T, StoreError> {
        self.store.retrieve_as(alias, &self.scenario.scope())
    }

    /// Applies the `path` query to the value under the `alias`.
    ///
    /// # Errors
    ///
    /// See [`VariableStore::extract_value()`].
    pub fn extract_value(&self, alias: &str, path: &str) -> Result<Value, StoreError> {
        self.store.extract_value(alias, path, &self.scenario.scope())
    }

    /// Extracts the `path` out of the `from` alias and stores it under the
    /// `to` alias of the current scenario.
    ///
    /// # Errors
    ///
    /// See [`VariableStore::chain_value()`].
    pub fn chain_value(
        &mut self,
        from: &str,
        path: &str,
        to: impl Into<String>,
    ) -> Result<Value, StoreError> {
        self.store.chain_value(from, path, to, &self.scenario.scope())
    }

    /// Returns the `T` resource, acquiring it on first use.
    ///
    /// # Errors
    ///
    /// If the resource can't be acquired.
    pub async fn acquire<T: Resource>(&mut self) -> anyhow::Result<&mut T> {
        self.resources.acquire::<T>().await
    }
}
