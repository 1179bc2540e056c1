// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scoped variable and response store.
//!
//! Values are keyed by `(scope, alias)`. Lookups fall back from a scenario
//! [`Scope`] to [`Scope::Global`], never the other way around. Every scope
//! is bounded: once it holds more than the configured maximum of entries, its
//! oldest entries are evicted.

pub mod path;

use std::{any::Any, collections::HashMap, mem, sync::Arc};

use chrono::{DateTime, Utc};
use derive_more::with_trait::{Debug, Display};
use linked_hash_map::LinkedHashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{NotFoundError, PathQueryError, StoreError};

pub use self::path::{Path, Segment};

/// Default maximum number of entries per [`Scope`].
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Isolation boundary of stored values.
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
pub enum Scope {
    /// Visible from every scenario.
    #[display("global")]
    Global,

    /// Private to a single scenario.
    #[display("{_0}")]
    Scenario(String),
}

impl Scope {
    /// Creates a [`Scope::Scenario`] for the scenario `id`.
    #[must_use]
    pub fn scenario(id: impl Into<String>) -> Self {
        Self::Scenario(id.into())
    }
}

/// Value held by a [`VariableStore`].
#[derive(Clone, Debug)]
pub enum StoredValue {
    /// Deep copy of a serializable value.
    Json(Value),

    /// Value that couldn't be serialized, shared by reference.
    #[debug("Shared(..)")]
    Shared(Arc<dyn Any + Send + Sync>),
}

impl StoredValue {
    /// Returns the JSON copy, if this value is serializable.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Shared(_) => None,
        }
    }

    /// Whether this value is held by reference.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

/// Single entry of a [`VariableStore`].
#[derive(Clone, Debug)]
pub struct Entry {
    /// Stored value.
    pub value: StoredValue,

    /// When the value was stored.
    pub timestamp: DateTime<Utc>,

    /// Approximate size of the value in bytes.
    pub size: usize,
}

/// Bounded, scoped key-value store passing data between steps.
///
/// # Example
///
/// ```rust
/// # use serde_json::json;
/// # use stepwise::store::{Scope, VariableStore};
/// #
/// let mut store = VariableStore::default();
/// let scenario = Scope::scenario("scenario-1");
///
/// let mut token = json!({"a": 1});
/// store.store("token", token.clone(), &scenario);
/// token["a"] = json!(2);
///
/// assert_eq!(store.extract_value("token", "$.a", &scenario).unwrap(), 1);
/// assert!(store.retrieve("missing", &scenario).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct VariableStore {
    /// Entries of every scope, oldest first.
    scopes: HashMap<Scope, LinkedHashMap<String, Entry>>,

    /// Maximum number of entries per scope.
    max_entries: usize,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl VariableStore {
    /// Creates a new empty [`VariableStore`] holding at most `max_entries`
    /// per scope (at least one).
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self { scopes: HashMap::new(), max_entries: max_entries.max(1) }
    }

    /// Maximum number of entries per scope.
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Stores a copy of the `value` under the `alias`, replacing any previous
    /// value of that alias in the `scope`.
    ///
    /// Values failing to serialize are kept by reference instead.
    pub fn store<T>(&mut self, alias: impl Into<String>, value: T, scope: &Scope)
    where
        T: Serialize + Any + Send + Sync,
    {
        let alias = alias.into();
        let (value, size) = match serde_json::to_value(&value) {
            Ok(json) => {
                let size = json.to_string().len();
                (StoredValue::Json(json), size)
            }
            Err(e) => {
                warn!(
                    %alias,
                    %scope,
                    error = %e,
                    "value is not serializable, storing it by reference",
                );
                (StoredValue::Shared(Arc::new(value)), mem::size_of::<T>())
            }
        };
        self.insert(alias, value, size, scope);
    }

    /// Stores an already built [`StoredValue`].
    pub fn store_value(
        &mut self,
        alias: impl Into<String>,
        value: StoredValue,
        scope: &Scope,
    ) {
        let size = value.as_json().map_or(0, |v| v.to_string().len());
        self.insert(alias.into(), value, size, scope);
    }

    fn insert(
        &mut self,
        alias: String,
        value: StoredValue,
        size: usize,
        scope: &Scope,
    ) {
        let entries = self.scopes.entry(scope.clone()).or_default();
        // Re-storing makes the alias the newest entry.
        _ = entries.remove(&alias);
        _ = entries.insert(alias, Entry { value, timestamp: Utc::now(), size });

        let len = entries.len();
        if len > self.max_entries {
            let evict = len.div_ceil(10).max(len - self.max_entries);
            for _ in 0..evict {
                if let Some((alias, entry)) = entries.pop_front() {
                    debug!(
                        %alias,
                        %scope,
                        stored_at = %entry.timestamp,
                        "evicted store entry",
                    );
                }
            }
        }
    }

    fn entry(&self, alias: &str, scope: &Scope) -> Option<&Entry> {
        self.scopes.get(scope).and_then(|entries| entries.get(alias))
    }

    /// Looks up the `alias` in the `scope`, then in [`Scope::Global`].
    ///
    /// # Errors
    ///
    /// If the `alias` is absent from both.
    pub fn retrieve(
        &self,
        alias: &str,
        scope: &Scope,
    ) -> Result<&StoredValue, NotFoundError> {
        self.entry(alias, scope)
            .or_else(|| self.entry(alias, &Scope::Global))
            .map(|e| &e.value)
            .ok_or_else(|| NotFoundError::new(alias, scope.clone()))
    }

    /// Looks up the `alias` like [`VariableStore::retrieve()`] and
    /// deserializes it.
    ///
    /// # Errors
    ///
    /// If the `alias` is absent, held by reference or of another shape.
    pub fn retrieve_as<T: DeserializeOwned>(
        &self,
        alias: &str,
        scope: &Scope,
    ) -> Result<T, StoreError> {
        let json = self.retrieve(alias, scope)?.as_json().ok_or_else(|| {
            StoreError::Conversion {
                alias: alias.to_owned(),
                reason: "value is held by reference".into(),
            }
        })?;
        T::deserialize(json).map_err(|e| StoreError::Conversion {
            alias: alias.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Looks up a value stored by reference.
    ///
    /// # Errors
    ///
    /// If the `alias` is absent or holds something else.
    pub fn retrieve_shared<T: Any + Send + Sync>(
        &self,
        alias: &str,
        scope: &Scope,
    ) -> Result<Arc<T>, StoreError> {
        match self.retrieve(alias, scope)? {
            StoredValue::Shared(v) => {
                Arc::clone(v).downcast::<T>().map_err(|_| {
                    StoreError::Conversion {
                        alias: alias.to_owned(),
                        reason: format!(
                            "not a `{}`",
                            std::any::type_name::<T>(),
                        ),
                    }
                })
            }
            StoredValue::Json(_) => Err(StoreError::Conversion {
                alias: alias.to_owned(),
                reason: "value is held as JSON".into(),
            }),
        }
    }

    /// Like [`VariableStore::retrieve_as()`], but returns the `default` if
    /// the `alias` is absent.
    ///
    /// # Errors
    ///
    /// If the stored value is of another shape.
    pub fn retrieve_or<T: DeserializeOwned>(
        &self,
        alias: &str,
        scope: &Scope,
        default: T,
    ) -> Result<T, StoreError> {
        match self.retrieve_as(alias, scope) {
            Err(StoreError::NotFound(_)) => Ok(default),
            res => res,
        }
    }

    /// Whether the `alias` is visible from the `scope`.
    #[must_use]
    pub fn has(&self, alias: &str, scope: &Scope) -> bool {
        self.retrieve(alias, scope).is_ok()
    }

    /// Removes the `alias` from exactly the `scope`, returning whether it was
    /// there.
    pub fn delete(&mut self, alias: &str, scope: &Scope) -> bool {
        self.scopes
            .get_mut(scope)
            .and_then(|entries| entries.remove(alias))
            .is_some()
    }

    /// Removes every entry of the `scope`, returning how many there were.
    pub fn clear_scope(&mut self, scope: &Scope) -> usize {
        self.scopes.remove(scope).map_or(0, |entries| entries.len())
    }

    /// Removes everything from every scope.
    pub fn clear(&mut self) {
        self.scopes.clear();
    }

    /// Number of entries in exactly the `scope`.
    #[must_use]
    pub fn len(&self, scope: &Scope) -> usize {
        self.scopes.get(scope).map_or(0, LinkedHashMap::len)
    }

    /// Whether the `scope` holds nothing.
    #[must_use]
    pub fn is_empty(&self, scope: &Scope) -> bool {
        self.len(scope) == 0
    }

    /// Approximate number of bytes held by the `scope`.
    #[must_use]
    pub fn approximate_size(&self, scope: &Scope) -> usize {
        self.scopes
            .get(scope)
            .map_or(0, |entries| entries.values().map(|e| e.size).sum())
    }

    /// Aliases of the `scope`, oldest first.
    pub fn aliases(&self, scope: &Scope) -> impl Iterator<Item = &str> + '_ {
        self.scopes
            .get(scope)
            .into_iter()
            .flat_map(|entries| entries.keys().map(String::as_str))
    }

    /// Applies the `path` query to the value stored under the `alias`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the `alias` is absent;
    /// - [`StoreError::PathQuery`] naming the `alias` and the `path` if the
    ///   query is malformed or can't be followed.
    pub fn extract_value(
        &self,
        alias: &str,
        path: &str,
        scope: &Scope,
    ) -> Result<Value, StoreError> {
        let error = |reason: String| PathQueryError {
            alias: alias.to_owned(),
            path: path.to_owned(),
            reason,
        };

        let json = self
            .retrieve(alias, scope)?
            .as_json()
            .ok_or_else(|| error("value is held by reference".into()))?;
        let query = Path::parse(path).map_err(error)?;
        Ok(query.apply(json).map_err(error)?.clone())
    }

    /// Extracts the `path` out of the value under the `from` alias and stores
    /// the result under the `to` alias in the `scope`.
    ///
    /// # Errors
    ///
    /// Same as [`VariableStore::extract_value()`].
    pub fn chain_value(
        &mut self,
        from: &str,
        path: &str,
        to: impl Into<String>,
        scope: &Scope,
    ) -> Result<Value, StoreError> {
        let value = self.extract_value(from, path, scope)?;
        self.store(to, value.clone(), scope);
        Ok(value)
    }
}
