// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Explicitly acquired resources, such as browser pages or API clients.
//!
//! Step implementations call [`StepCall::acquire()`] and get a handle back,
//! creating the resource on first use. There is no transparent lazy
//! initialization: the acquire point is always visible in the step code.
//!
//! [`StepCall::acquire()`]: crate::StepCall::acquire

use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
};

use anyhow::anyhow;
use derive_more::with_trait::Debug;
use futures::future::LocalBoxFuture;
use tracing::debug;

use crate::cli::SessionReuse;

/// Resource created on first [`Resources::acquire()`].
pub trait Resource: Any + Sized {
    /// Creates the resource.
    fn acquire(reuse: SessionReuse) -> LocalBoxFuture<'static, anyhow::Result<Self>>;

    /// Tears the resource down. Called when the resource is released.
    fn release(&mut self) {}
}

/// Acquired resource with its type-erased teardown.
#[derive(Debug)]
struct Slot {
    #[debug(skip)]
    value: Box<dyn Any>,
    name: &'static str,
    #[debug(skip)]
    release: fn(&mut dyn Any),
}

/// Set of acquired [`Resource`]s, at most one per type.
///
/// Everything still held is released on drop.
#[derive(Debug, Default)]
pub struct Resources {
    slots: HashMap<TypeId, Slot>,
    reuse: SessionReuse,
}

impl Resources {
    /// Creates a new empty set of [`Resources`].
    #[must_use]
    pub fn new(reuse: SessionReuse) -> Self {
        Self { slots: HashMap::new(), reuse }
    }

    /// Returns the `T` resource, creating it first if needed.
    ///
    /// # Errors
    ///
    /// If [`Resource::acquire()`] fails.
    pub async fn acquire<T: Resource>(&mut self) -> anyhow::Result<&mut T> {
        let id = TypeId::of::<T>();
        if !self.slots.contains_key(&id) {
            let value = T::acquire(self.reuse).await?;
            debug!(resource = type_name::<T>(), reuse = %self.reuse, "resource acquired");
            _ = self.slots.insert(
                id,
                Slot {
                    value: Box::new(value),
                    name: type_name::<T>(),
                    release: release::<T>,
                },
            );
        }
        self.slots
            .get_mut(&id)
            .and_then(|slot| slot.value.downcast_mut())
            .ok_or_else(|| anyhow!("resource `{}` vanished", type_name::<T>()))
    }

    /// Returns the `T` resource if it's already acquired.
    #[must_use]
    pub fn get<T: Resource>(&self) -> Option<&T> {
        self.slots.get(&TypeId::of::<T>())?.value.downcast_ref()
    }

    /// Whether the `T` resource is acquired.
    #[must_use]
    pub fn is_acquired<T: Resource>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    /// Number of acquired resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is acquired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Releases every acquired resource, returning how many there were.
    pub fn release_all(&mut self) -> usize {
        let count = self.slots.len();
        for (_, mut slot) in self.slots.drain() {
            (slot.release)(&mut *slot.value);
            debug!(resource = slot.name, "resource released");
        }
        count
    }
}

impl Drop for Resources {
    fn drop(&mut self) {
        _ = self.release_all();
    }
}

/// Type-erased [`Resource::release()`].
fn release<T: Resource>(value: &mut dyn Any) {
    if let Some(value) = value.downcast_mut::<T>() {
        value.release();
    }
}
