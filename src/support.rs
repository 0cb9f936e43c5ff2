// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Library`] of support code: step definitions and hooks.

use std::{fmt, time::Duration};

use crate::{
    hook::{AroundHook, Hook},
    pickle::Pickle,
    step::{Location, Pattern, PatternError, StepDefinition},
    user_code::Invocable,
    world::World,
};

/// Timeout applied to user code unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry of [`StepDefinition`]s and hooks.
///
/// Everything is registered before a run begins and kept in registration
/// order. During a run a [`Library`] is only read.
pub struct Library<W> {
    step_definitions: Vec<StepDefinition<W>>,
    before_hooks: Vec<Hook<W>>,
    after_hooks: Vec<Hook<W>>,
    around_hooks: Vec<AroundHook<W>>,
    default_timeout: Option<Duration>,
}

impl<W> Default for Library<W> {
    fn default() -> Self {
        Self {
            step_definitions: Vec::new(),
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
            around_hooks: Vec::new(),
            default_timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl<W> fmt::Debug for Library<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("step_definitions", &self.step_definitions)
            .field("before_hooks", &self.before_hooks)
            .field("after_hooks", &self.after_hooks)
            .field("around_hooks", &self.around_hooks)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl<W> Library<W> {
    /// Creates a new empty [`Library`] with the [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout applied to user code not overriding it.
    ///
    /// [`None`] disables timeouts.
    #[must_use]
    pub const fn default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Registers a [`StepDefinition`] matching step text with the given
    /// `pattern`.
    #[must_use]
    #[track_caller]
    pub fn step(self, pattern: impl Into<Pattern>, body: Invocable<W>) -> Self {
        let location = Location::caller();
        self.step_definition(StepDefinition::new(pattern, body).at(location))
    }

    /// Registers a [`StepDefinition`] matching step text with the given
    /// [Cucumber Expression][1].
    ///
    /// # Errors
    ///
    /// If the `expression` is malformed.
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions#readme
    #[track_caller]
    pub fn expression(
        self,
        expression: &str,
        body: Invocable<W>,
    ) -> Result<Self, PatternError> {
        let location = Location::caller();
        let def = StepDefinition::new(Pattern::expression(expression)?, body);
        Ok(self.step_definition(def.at(location)))
    }

    /// Registers the given [`StepDefinition`] as is.
    #[must_use]
    pub fn step_definition(mut self, def: StepDefinition<W>) -> Self {
        self.step_definitions.push(def);
        self
    }

    /// Registers an untagged before [`Hook`].
    #[must_use]
    #[track_caller]
    pub fn before(self, body: Invocable<W>) -> Self {
        let location = Location::caller();
        self.before_hook(Hook::new(body).at(location))
    }

    /// Registers the given before [`Hook`].
    #[must_use]
    pub fn before_hook(mut self, hook: Hook<W>) -> Self {
        self.before_hooks.push(hook);
        self
    }

    /// Registers an untagged after [`Hook`].
    #[must_use]
    #[track_caller]
    pub fn after(self, body: Invocable<W>) -> Self {
        let location = Location::caller();
        self.after_hook(Hook::new(body).at(location))
    }

    /// Registers the given after [`Hook`].
    #[must_use]
    pub fn after_hook(mut self, hook: Hook<W>) -> Self {
        self.after_hooks.push(hook);
        self
    }

    /// Registers an untagged [`AroundHook`].
    #[must_use]
    #[track_caller]
    pub fn around(self, before: Invocable<W>, after: Invocable<W>) -> Self {
        let location = Location::caller();
        self.around_hook(AroundHook::new(before, after).at(location))
    }

    /// Registers the given [`AroundHook`].
    #[must_use]
    pub fn around_hook(mut self, hook: AroundHook<W>) -> Self {
        self.around_hooks.push(hook);
        self
    }

    /// Returns the timeout for user code declaring the given `timeout`
    /// override.
    #[must_use]
    pub fn timeout_for(&self, timeout: Option<Duration>) -> Option<Duration> {
        timeout.or(self.default_timeout)
    }

    /// Returns every [`StepDefinition`] matching the given step `text`.
    ///
    /// Empty means an undefined step, more than one an ambiguous one.
    #[must_use]
    pub fn lookup_step_definitions_by_name(
        &self,
        text: &str,
    ) -> Vec<&StepDefinition<W>> {
        self.step_definitions.iter().filter(|d| d.matches(text)).collect()
    }

    /// Returns the before [`Hook`]s applying to the given [`Pickle`].
    #[must_use]
    pub fn lookup_before_hooks_by_scenario(
        &self,
        pickle: &Pickle,
    ) -> Vec<&Hook<W>> {
        self.before_hooks.iter().filter(|h| h.applies_to(pickle)).collect()
    }

    /// Returns the after [`Hook`]s applying to the given [`Pickle`], in
    /// registration order.
    #[must_use]
    pub fn lookup_after_hooks_by_scenario(
        &self,
        pickle: &Pickle,
    ) -> Vec<&Hook<W>> {
        self.after_hooks.iter().filter(|h| h.applies_to(pickle)).collect()
    }

    /// Returns the [`AroundHook`]s applying to the given [`Pickle`].
    #[must_use]
    pub fn lookup_around_hooks_by_scenario(
        &self,
        pickle: &Pickle,
    ) -> Vec<&AroundHook<W>> {
        self.around_hooks.iter().filter(|h| h.applies_to(pickle)).collect()
    }
}

impl<W: World> Library<W> {
    /// Creates a fresh [`World`] for a [`Pickle`] run.
    ///
    /// # Errors
    ///
    /// If [`World::new()`] fails.
    pub async fn instantiate_world(&self) -> Result<W, W::Error> {
        W::new().await
    }
}
