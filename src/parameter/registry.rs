// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`ParameterRegistry`] storing built-in and custom [`ParameterType`]s.

use std::{cell::RefCell, collections::HashMap};

use lazy_regex::regex;
use regex::Captures;

use crate::error::{
    AmbiguousRegistrationError, ParameterError, TransformError,
    UnknownTypeError,
};

use super::{builtin, Argument, ParameterType};

/// Maximum number of memoized transformation results. The memo is flushed
/// once full.
pub(crate) const CACHE_CAPACITY: usize = 1024;

/// Registry of [`ParameterType`]s.
///
/// Built-ins are always present and can't be redefined. Custom types are
/// appended in registration order. Transformation results are memoized by
/// `(type name, text)`, holding at most 1024 entries.
#[derive(Debug)]
pub struct ParameterRegistry {
    /// [`ParameterType`]s in registration order.
    types: Vec<ParameterType>,

    /// Index of every type in `types` by name.
    index: HashMap<String, usize>,

    /// Memoized transformation results.
    cache: RefCell<HashMap<(String, String), Argument>>,
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        let types = builtin::all();
        let index = types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_owned(), i))
            .collect();
        Self { types, index, cache: RefCell::default() }
    }
}

impl Clone for ParameterRegistry {
    fn clone(&self) -> Self {
        Self {
            types: self.types.clone(),
            index: self.index.clone(),
            cache: RefCell::default(),
        }
    }
}

impl ParameterRegistry {
    /// Creates a new [`ParameterRegistry`] holding only the built-ins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `name` belongs to a built-in type.
    #[must_use]
    pub fn is_builtin(name: &str) -> bool {
        name.is_empty() || builtin::NAMES.contains(&name)
    }

    /// Defines a custom [`ParameterType`].
    ///
    /// Redefining a custom type replaces it in place, keeping its detection
    /// priority.
    ///
    /// # Errors
    ///
    /// If the name collides with a built-in type.
    pub fn define(
        &mut self,
        ty: ParameterType,
    ) -> Result<(), AmbiguousRegistrationError> {
        let name = ty.name().to_owned();
        if Self::is_builtin(&name) {
            return Err(AmbiguousRegistrationError::new(name));
        }

        if let Some(&i) = self.index.get(&name) {
            self.types[i] = ty;
            self.cache.borrow_mut().retain(|(n, _), _| *n != name);
        } else {
            _ = self.index.insert(name, self.types.len());
            self.types.push(ty);
        }
        Ok(())
    }

    /// Looks up a [`ParameterType`] by its name. An empty name is the
    /// anonymous `{}` type.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterType> {
        let name = if name.is_empty() { builtin::ANONYMOUS } else { name };
        self.index.get(name).map(|&i| &self.types[i])
    }

    /// Names of all types in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.iter().map(ParameterType::name)
    }

    /// Coerces the `text` into an [`Argument`] of the `type_name`.
    ///
    /// # Errors
    ///
    /// - [`ParameterError::UnknownType`] if no such type is registered;
    /// - [`ParameterError::Transform`] if the transformer rejects the `text`.
    pub fn transform(
        &self,
        text: &str,
        type_name: &str,
    ) -> Result<Argument, ParameterError> {
        let ty = self
            .get(type_name)
            .ok_or_else(|| UnknownTypeError::new(type_name))?;

        let key = (ty.name().to_owned(), text.to_owned());
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(hit.clone());
        }

        let value = ty.apply(text).map_err(|reason| TransformError {
            type_name: ty.name().to_owned(),
            text: text.to_owned(),
            reason,
        })?;
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= CACHE_CAPACITY {
            cache.clear();
        }
        _ = cache.insert(key, value.clone());
        Ok(value)
    }

    /// Returns the name of the first type, in registration order, that is
    /// preferred for matching and recognises the whole `text`. Falls back to
    /// `string`.
    #[must_use]
    pub fn detect_type(&self, text: &str) -> &str {
        self.types
            .iter()
            .find(|t| t.is_preferred_for_match() && t.is_match(text))
            .map_or("string", ParameterType::name)
    }

    /// Suggests an expression for an unmatched step `text`, replacing quoted
    /// strings and numbers by the types snippets are generated for.
    #[must_use]
    pub fn snippet(&self, text: &str) -> String {
        regex!(r#""(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?"#)
            .replace_all(text, |caps: &Captures<'_>| {
                let found = &caps[0];
                self.get(self.detect_type(found))
                    .filter(|t| t.is_used_for_snippets())
                    .map_or_else(
                        || found.to_owned(),
                        |t| format!("{{{}}}", t.name()),
                    )
            })
            .into_owned()
    }

    /// Number of memoized transformation results.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn transforms_builtins() {
        let reg = ParameterRegistry::new();

        assert_eq!(reg.transform("42", "int"), Ok(Argument::Int(42)));
        assert_eq!(reg.transform("4.5", "float"), Ok(Argument::Float(4.5)));
        assert_eq!(reg.transform("x", ""), Ok(Argument::from("x")));
    }

    #[test]
    fn int_transform_is_idempotent_and_total() {
        let reg = ParameterRegistry::new();

        for _ in 0..3 {
            assert_eq!(reg.transform("-7", "int"), Ok(Argument::Int(-7)));
            assert!(matches!(
                reg.transform("seven", "int"),
                Err(ParameterError::Transform(TransformError { .. })),
            ));
        }
    }

    #[test]
    fn unknown_type_fails() {
        let reg = ParameterRegistry::new();
        assert_eq!(
            reg.transform("x", "color"),
            Err(UnknownTypeError::new("color").into()),
        );
    }

    #[test]
    fn transform_error_mentions_text_and_type() {
        let reg = ParameterRegistry::new();
        let err = reg.transform("12ab", "int").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("12ab") && msg.contains("int"), "{msg}");
    }

    #[test]
    fn builtins_cannot_be_redefined() {
        let mut reg = ParameterRegistry::new();
        let ty = ParameterType::new("int", r"\d+", |s| {
            Ok::<_, String>(Argument::from(s))
        })
        .unwrap();

        assert_eq!(reg.define(ty), Err(AmbiguousRegistrationError::new("int")));
    }

    #[test]
    fn memoizes_transformations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut reg = ParameterRegistry::new();
        reg.define(
            ParameterType::new("color", "red|blue", move |s| {
                _ = counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Argument::Str(s.to_uppercase()))
            })
            .unwrap(),
        )
        .unwrap();

        for _ in 0..5 {
            assert_eq!(reg.transform("red", "color"), Ok(Argument::from("RED")));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reg.cached(), 1);
    }

    #[test]
    fn memo_stays_bounded() {
        let reg = ParameterRegistry::new();

        for n in (0_i64..).take(CACHE_CAPACITY + 1) {
            assert_eq!(reg.transform(&n.to_string(), "int"), Ok(Argument::Int(n)));
        }
        assert_eq!(reg.cached(), 1);

        assert_eq!(reg.transform("7", "int"), Ok(Argument::Int(7)));
        assert_eq!(reg.cached(), 2);
    }

    #[test]
    fn detects_types_in_registration_order() {
        let reg = ParameterRegistry::new();

        assert_eq!(reg.detect_type("42"), "int");
        assert_eq!(reg.detect_type("4.2"), "float");
        assert_eq!(reg.detect_type("\"quoted\""), "string");
        assert_eq!(reg.detect_type("2024-01-31"), "date");
        assert_eq!(reg.detect_type("yes"), "boolean");
        assert_eq!(reg.detect_type("[1, 2]"), "json");
        assert_eq!(reg.detect_type("plain words"), "string");
    }

    #[test]
    fn custom_types_join_detection() {
        let mut reg = ParameterRegistry::new();
        reg.define(
            ParameterType::new("ticket", r"[A-Z]+-\d+", |s| {
                Ok::<_, String>(Argument::from(s))
            })
            .unwrap()
            .prefer_for_match(true),
        )
        .unwrap();

        assert_eq!(reg.detect_type("ABC-12"), "ticket");
        assert_eq!(reg.names().last(), Some("ticket"));
    }

    #[test]
    fn suggests_snippets() {
        let reg = ParameterRegistry::new();
        assert_eq!(
            reg.snippet(r#"I add "milk" and 3 eggs costing 1.25"#),
            "I add {string} and {int} eggs costing {float}",
        );
    }
}
