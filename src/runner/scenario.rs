// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`ScenarioRunner`] executing a single [`Pickle`] attempt.

use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, info, info_span, Instrument as _};

use crate::{
    broadcaster::EventBroadcaster,
    error::Failure,
    event::{Event, Payload},
    hook::{HookStep, HookType},
    pickle::{Pickle, PickleStep},
    result::{ScenarioResult, StepResult},
    status::Status,
    step::{AmbiguousMatchError, Context, Outcome, TestStep},
    support::Library,
    user_code::{Invocable, UserCodeRunner},
    world::World,
};

use super::{Options, Retries};

/// Unit of work of a [`ScenarioRunner`].
enum Unit<'h, W> {
    /// Synthesized hook.
    Hook(&'h HookStep<W>),

    /// Step of the [`Pickle`].
    Pickle(Arc<PickleStep>),

    /// Placeholder for the [`World`] that couldn't be created.
    WorldFailure(Failure),
}

impl<W> Unit<'_, W> {
    fn test_step(&self) -> TestStep {
        match self {
            Self::Hook(hook) => hook.test_step(),
            Self::Pickle(step) => TestStep::Pickle(Arc::clone(step)),
            Self::WorldFailure(_) => {
                TestStep::Hook { ty: HookType::Before, location: None }
            }
        }
    }
}

/// Runner of a single attempt of a single [`Pickle`].
///
/// Creates a fresh [`World`], runs the before-hooks, the [`Pickle`] steps and
/// the after-hooks in order, broadcasting an around `Step` [`Event`] for each
/// of them, all wrapped into an around `Scenario` [`Event`].
pub struct ScenarioRunner<'r, W> {
    library: &'r Library<W>,
    broadcaster: &'r EventBroadcaster,
    user_code: &'r UserCodeRunner,
    options: &'r Options,
    pickle: Arc<Pickle>,
    result: ScenarioResult,
    world: Option<W>,
}

impl<'r, W: World> ScenarioRunner<'r, W> {
    /// Creates a new [`ScenarioRunner`] of the first attempt of the given
    /// [`Pickle`].
    #[must_use]
    pub fn new(
        library: &'r Library<W>,
        broadcaster: &'r EventBroadcaster,
        user_code: &'r UserCodeRunner,
        options: &'r Options,
        pickle: Arc<Pickle>,
    ) -> Self {
        Self {
            library,
            broadcaster,
            user_code,
            options,
            result: ScenarioResult::new(Arc::clone(&pickle)),
            pickle,
            world: None,
        }
    }

    /// Sets the [`Retries`] of this attempt.
    #[must_use]
    pub fn with_retries(mut self, retries: Option<Retries>) -> Self {
        self.result.retries = retries;
        self
    }

    fn attempt(&self) -> usize {
        self.result.retries.map_or(1, Retries::attempt)
    }

    /// Runs this attempt to the end.
    pub async fn run(mut self) -> ScenarioResult {
        let span = info_span!(
            "scenario",
            name = %self.pickle.name,
            attempt = self.attempt(),
        );
        let event = Event::new(Payload::Scenario {
            pickle: Arc::clone(&self.pickle),
            attempt: self.attempt(),
        });
        let broadcaster = self.broadcaster;
        broadcaster
            .broadcast_around_event(event, self.execute())
            .instrument(span)
            .await;
        self.result
    }

    async fn execute(&mut self) {
        let library = self.library;
        let pickle = Arc::clone(&self.pickle);

        let mut world_failure = None;
        if !self.options.dry_run {
            match library.instantiate_world().await {
                Ok(world) => self.world = Some(world),
                Err(e) => world_failure = Some(Failure::World(e.to_string())),
            }
        }

        let mut before_steps = Vec::new();
        let mut after_steps = VecDeque::new();
        for around in library.lookup_around_hooks_by_scenario(&pickle) {
            let (before, after) = around.steps();
            before_steps.push(before);
            after_steps.push_front(after);
        }
        for hook in library.lookup_before_hooks_by_scenario(&pickle) {
            before_steps.push(hook.step(HookType::Before));
        }
        for hook in library.lookup_after_hooks_by_scenario(&pickle) {
            after_steps.push_front(hook.step(HookType::After));
        }

        if let Some(failure) = world_failure {
            self.run_unit(Unit::WorldFailure(failure)).await;
        }
        for hook in &before_steps {
            self.run_unit(Unit::Hook(hook)).await;
        }
        for step in &pickle.steps {
            self.run_unit(Unit::Pickle(Arc::clone(step))).await;
        }
        for hook in &after_steps {
            self.run_unit(Unit::Hook(hook)).await;
        }
        self.world = None;

        self.result.conclude(self.options.strict);
        info!(
            status = %self.result.status,
            will_be_retried = self.result.will_be_retried,
            "scenario finished",
        );
        self.broadcaster
            .broadcast_event(Event::new(Payload::ScenarioResult(Arc::new(
                self.result.clone(),
            ))))
            .await;
    }

    async fn run_unit(&mut self, unit: Unit<'_, W>) {
        let step = unit.test_step();
        let pickle = Arc::clone(&self.pickle);
        let event = Event::new(Payload::Step {
            pickle: Arc::clone(&pickle),
            step: step.clone(),
        });
        let broadcaster = self.broadcaster;

        broadcaster
            .broadcast_around_event(event, async move {
                let result = Arc::new(self.process_step(unit, step).await);
                debug!(
                    step = %result.step,
                    status = %result.status,
                    "step finished",
                );
                broadcaster
                    .broadcast_event(Event::new(Payload::StepResult {
                        pickle,
                        result: Arc::clone(&result),
                    }))
                    .await;
                self.result.witness_step_result(&result);
            })
            .await;
    }

    /// Indicates whether a previous step left this [`Pickle`] non-passing.
    fn is_skipping(&self) -> bool {
        self.result.status != Status::Passed
    }

    async fn process_step(
        &mut self,
        unit: Unit<'_, W>,
        step: TestStep,
    ) -> StepResult {
        let hook = match unit {
            Unit::WorldFailure(failure) => {
                return StepResult::failed(step, failure);
            }
            Unit::Hook(hook) => hook,
            Unit::Pickle(pickle_step) => {
                return self.process_pickle_step(pickle_step, step).await;
            }
        };

        if self.options.dry_run
            || self.world.is_none()
            || (hook.ty.is_before() && self.is_skipping())
        {
            return StepResult::skipped(step);
        }
        let ctx = self.context();
        self.invoke(&hook.body, &ctx, hook.timeout, step).await
    }

    async fn process_pickle_step(
        &mut self,
        pickle_step: Arc<PickleStep>,
        step: TestStep,
    ) -> StepResult {
        if self.options.dry_run {
            return StepResult::skipped(step);
        }

        let library = self.library;
        let definitions =
            library.lookup_step_definitions_by_name(&pickle_step.text);
        let [definition] = definitions.as_slice() else {
            return if definitions.is_empty() {
                StepResult::undefined(step)
            } else if self.is_skipping() {
                StepResult::skipped(step)
            } else {
                StepResult::ambiguous(
                    step,
                    AmbiguousMatchError::new(
                        definitions.iter().map(|d| d.candidate()).collect(),
                    ),
                )
            };
        };
        if self.is_skipping() {
            return StepResult::skipped(step);
        }

        let matches =
            definition.captures(&pickle_step.text).unwrap_or_default();
        let ctx = self.context().with_step(pickle_step, matches);
        self.invoke(&definition.body, &ctx, definition.timeout, step).await
    }

    fn context(&self) -> Context {
        Context {
            status: self.result.status,
            attempt: self.attempt(),
            faults: self.user_code.faults().reporter(),
            ..Context::new(Arc::clone(&self.pickle))
        }
    }

    async fn invoke(
        &mut self,
        body: &Invocable<W>,
        ctx: &Context,
        timeout: Option<Duration>,
        step: TestStep,
    ) -> StepResult {
        let timeout =
            self.library.timeout_for(timeout.or(self.options.timeout));
        let Some(world) = self.world.as_mut() else {
            return StepResult::skipped(step);
        };

        let started = Instant::now();
        let outcome = self.user_code.run(body, world, ctx, timeout).await;
        let duration = started.elapsed();

        match outcome {
            Ok(Outcome::Passed) => StepResult::successful(step, duration),
            Ok(Outcome::Pending) => StepResult::pending(step).took(duration),
            Ok(Outcome::Skipped) => StepResult::skipped(step).took(duration),
            Err(failure) => StepResult::failed(step, failure).took(duration),
        }
    }
}
