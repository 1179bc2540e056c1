// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`HookScheduler`] storing hooks and computing the applicable ones.

use std::sync::Arc;

use futures::future::LocalBoxFuture;
use itertools::Itertools as _;

use super::{Hook, HookCall, HookOptions, HookPhase};

/// Registry of [`Hook`]s.
#[derive(Clone, Debug, Default)]
pub struct HookScheduler {
    hooks: Vec<Hook>,
}

impl HookScheduler {
    /// Creates a new empty [`HookScheduler`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook for the `phase`.
    pub fn register<F>(&mut self, phase: HookPhase, hook: F, options: HookOptions)
    where
        F: for<'a> Fn(HookCall<'a>) -> LocalBoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        let position = self.hooks.iter().filter(|h| h.phase == phase).count() + 1;
        let HookOptions { filter, order, timeout, name, location } = options;
        self.hooks.push(Hook {
            phase,
            name: name.unwrap_or_else(|| format!("{phase} #{position}")),
            filter,
            order,
            timeout,
            location,
            implementation: Arc::new(hook),
        });
    }

    /// Hooks of the `phase` applicable to a scenario with the `tags`, sorted
    /// by ascending order with ties in registration order.
    #[must_use]
    pub fn ordered_hooks(&self, phase: HookPhase, tags: &[String]) -> Vec<&Hook> {
        self.hooks
            .iter()
            .filter(|h| h.phase == phase && h.applies(tags))
            .sorted_by_key(|h| h.order)
            .collect()
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
