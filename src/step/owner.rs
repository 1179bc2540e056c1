// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Owner instances of bound step implementations.

use std::{any::Any, collections::HashMap};

use derive_more::with_trait::Debug;

use crate::error::{DuplicateOwnerError, UnknownOwnerError};

/// Instances that bound step implementations are invoked against, keyed by
/// name.
#[derive(Debug, Default)]
pub struct Owners {
    #[debug("{:?}", instances.keys().collect::<Vec<_>>())]
    instances: HashMap<String, Box<dyn Any>>,
}

impl Owners {
    /// Creates an empty set of [`Owners`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `instance` under the `name`.
    ///
    /// # Errors
    ///
    /// If the `name` is already taken.
    pub fn register<O: Any>(
        &mut self,
        name: impl Into<String>,
        instance: O,
    ) -> Result<(), DuplicateOwnerError> {
        let name = name.into();
        if self.instances.contains_key(&name) {
            return Err(DuplicateOwnerError { name });
        }
        _ = self.instances.insert(name, Box::new(instance));
        Ok(())
    }

    /// Type-erased instance registered under the `name`.
    ///
    /// # Errors
    ///
    /// If nothing is registered under the `name`.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut dyn Any, UnknownOwnerError> {
        self.instances
            .get_mut(name)
            .map(|b| &mut **b)
            .ok_or_else(|| UnknownOwnerError { name: name.to_owned() })
    }

    /// Instance registered under the `name`, if it's an `O`.
    #[must_use]
    pub fn get<O: Any>(&self, name: &str) -> Option<&O> {
        self.instances.get(name)?.downcast_ref()
    }

    /// Whether anything is registered under the `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// Number of registered instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
