// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Results of [`Pickle`] steps, of whole [`Pickle`]s and of a whole run.

use std::{sync::Arc, time::Duration};

use crate::{
    error::Failure,
    pickle::Pickle,
    runner::Retries,
    status::Status,
    step::{AmbiguousMatchError, TestStep},
};

/// Number of steps (or [`Pickle`]s) per [`Status`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Number of [`Status::Passed`] ones.
    pub passed: usize,

    /// Number of [`Status::Failed`] ones.
    pub failed: usize,

    /// Number of [`Status::Ambiguous`] ones.
    pub ambiguous: usize,

    /// Number of [`Status::Pending`] ones.
    pub pending: usize,

    /// Number of [`Status::Skipped`] ones.
    pub skipped: usize,

    /// Number of [`Status::Undefined`] ones.
    pub undefined: usize,
}

impl Stats {
    /// Creates new [`Stats`] with all counts set to zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            passed: 0,
            failed: 0,
            ambiguous: 0,
            pending: 0,
            skipped: 0,
            undefined: 0,
        }
    }

    /// Counts one more unit with the given [`Status`].
    pub fn add(&mut self, status: Status) {
        *self.get_mut(status) += 1;
    }

    /// Returns the number of units with the given [`Status`].
    #[must_use]
    pub const fn get(&self, status: Status) -> usize {
        match status {
            Status::Passed => self.passed,
            Status::Failed => self.failed,
            Status::Ambiguous => self.ambiguous,
            Status::Pending => self.pending,
            Status::Skipped => self.skipped,
            Status::Undefined => self.undefined,
        }
    }

    /// Returns the total number of counted units.
    #[must_use]
    pub fn total(&self) -> usize {
        Status::ALL.iter().map(|s| self.get(*s)).sum()
    }

    fn get_mut(&mut self, status: Status) -> &mut usize {
        match status {
            Status::Passed => &mut self.passed,
            Status::Failed => &mut self.failed,
            Status::Ambiguous => &mut self.ambiguous,
            Status::Pending => &mut self.pending,
            Status::Skipped => &mut self.skipped,
            Status::Undefined => &mut self.undefined,
        }
    }
}

/// Result of a single [`TestStep`].
#[derive(Clone, Debug)]
pub struct StepResult {
    /// [`TestStep`] this result is for.
    pub step: TestStep,

    /// Terminal [`Status`].
    pub status: Status,

    /// Time the user code took. Zero if it wasn't invoked.
    pub duration: Duration,

    /// [`Failure`] of a [`Status::Failed`] or [`Status::Ambiguous`] step.
    pub failure: Option<Failure>,
}

impl StepResult {
    const fn new(step: TestStep, status: Status) -> Self {
        Self { step, status, duration: Duration::ZERO, failure: None }
    }

    /// [`Status::Passed`] result of user code taking `duration`.
    #[must_use]
    pub const fn successful(step: TestStep, duration: Duration) -> Self {
        Self::new(step, Status::Passed).took(duration)
    }

    /// [`Status::Failed`] result caused by the given [`Failure`].
    #[must_use]
    pub fn failed(step: TestStep, failure: Failure) -> Self {
        Self { failure: Some(failure), ..Self::new(step, Status::Failed) }
    }

    /// [`Status::Ambiguous`] result listing the matched candidates.
    #[must_use]
    pub fn ambiguous(step: TestStep, err: AmbiguousMatchError) -> Self {
        Self {
            failure: Some(Failure::Ambiguous(err)),
            ..Self::new(step, Status::Ambiguous)
        }
    }

    /// [`Status::Pending`] result.
    #[must_use]
    pub const fn pending(step: TestStep) -> Self {
        Self::new(step, Status::Pending)
    }

    /// [`Status::Skipped`] result.
    #[must_use]
    pub const fn skipped(step: TestStep) -> Self {
        Self::new(step, Status::Skipped)
    }

    /// [`Status::Undefined`] result.
    #[must_use]
    pub const fn undefined(step: TestStep) -> Self {
        Self::new(step, Status::Undefined)
    }

    /// Sets the time the user code took.
    #[must_use]
    pub const fn took(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Returns the candidates of a [`Status::Ambiguous`] result.
    #[must_use]
    pub const fn candidates(&self) -> Option<&AmbiguousMatchError> {
        match &self.failure {
            Some(Failure::Ambiguous(err)) => Some(err),
            _ => None,
        }
    }
}

/// Accumulated result of a single [`Pickle`] attempt.
#[derive(Clone, Debug)]
pub struct ScenarioResult {
    /// [`Pickle`] this result is for.
    pub pickle: Arc<Pickle>,

    /// Most severe [`Status`] witnessed so far.
    pub status: Status,

    /// First [`Failure`] witnessed.
    pub failure: Option<Failure>,

    /// Witnessed steps per [`Status`].
    pub steps: Stats,

    /// Total time of the witnessed steps.
    pub duration: Duration,

    /// Retries of this [`Pickle`], if it's retriable at all.
    pub retries: Option<Retries>,

    /// Whether this attempt failed and the [`Pickle`] will be run again.
    pub will_be_retried: bool,
}

impl ScenarioResult {
    /// Creates a new [`Status::Passed`] result of the given [`Pickle`].
    #[must_use]
    pub fn new(pickle: Arc<Pickle>) -> Self {
        Self {
            pickle,
            status: Status::Passed,
            failure: None,
            steps: Stats::new(),
            duration: Duration::ZERO,
            retries: None,
            will_be_retried: false,
        }
    }

    /// Sets the [`Retries`] of this attempt.
    #[must_use]
    pub const fn with_retries(mut self, retries: Option<Retries>) -> Self {
        self.retries = retries;
        self
    }

    /// Accounts the given [`StepResult`].
    ///
    /// The [`Status`] only ever gets more severe, and the first [`Failure`]
    /// is never replaced.
    pub fn witness_step_result(&mut self, result: &StepResult) {
        self.steps.add(result.status);
        self.duration += result.duration;
        if result.status.is_worse_than(self.status) {
            self.status = result.status;
        }
        if self.failure.is_none() {
            self.failure.clone_from(&result.failure);
        }
    }

    /// Indicates whether this result fails a run in the given `strict` mode.
    #[must_use]
    pub const fn is_failing(&self, strict: bool) -> bool {
        self.status.is_failing(strict)
    }

    /// Finalizes this result, deciding whether it will be retried.
    pub fn conclude(&mut self, strict: bool) {
        self.will_be_retried = self.is_failing(strict)
            && self.retries.is_some_and(|r| r.left > 0);
    }
}

/// Accumulated result of a whole run.
#[derive(Clone, Debug)]
pub struct FeaturesResult {
    strict: bool,
    success: bool,

    /// Number of visited features.
    pub features: usize,

    /// Terminal [`Pickle`] attempts per [`Status`].
    pub scenarios: Stats,

    /// Steps of the terminal [`Pickle`] attempts per [`Status`].
    pub steps: Stats,

    /// Number of attempts that were retried.
    pub retried: usize,

    /// Total time of the terminal [`Pickle`] attempts.
    pub duration: Duration,
}

impl FeaturesResult {
    /// Creates a new successful [`FeaturesResult`].
    ///
    /// In `strict` mode [`Status::Pending`] and [`Status::Undefined`] fail
    /// the run.
    #[must_use]
    pub const fn new(strict: bool) -> Self {
        Self {
            strict,
            success: true,
            features: 0,
            scenarios: Stats::new(),
            steps: Stats::new(),
            retried: 0,
            duration: Duration::ZERO,
        }
    }

    /// Indicates whether the run succeeded so far.
    #[must_use]
    pub const fn is_successful(&self) -> bool {
        self.success
    }

    /// Indicates whether this [`FeaturesResult`] is `strict`.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Accounts a visited feature.
    pub fn witness_feature(&mut self) {
        self.features += 1;
    }

    /// Accounts the given [`ScenarioResult`].
    ///
    /// Attempts that will be retried are only counted as retried.
    pub fn witness_scenario_result(&mut self, result: &ScenarioResult) {
        if result.will_be_retried {
            self.retried += 1;
            return;
        }

        self.scenarios.add(result.status);
        for status in Status::ALL {
            *self.steps.get_mut(status) += result.steps.get(status);
        }
        self.duration += result.duration;
        if result.is_failing(self.strict) {
            self.success = false;
        }
    }
}
