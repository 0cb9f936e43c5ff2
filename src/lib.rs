// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scenario execution engine for [Cucumber]-style BDD test runners.
//!
//! The engine takes already compiled [`Feature`]s (see
//! [`Feature::from_gherkin()`]), resolves every [`PickleStep`] against the
//! step definitions of a [`Library`], runs them along with hooks, timeouts
//! and retries through a [`FeaturesRunner`], and tells [`Listener`]s about
//! every transition via [`Event`]s.
//!
//! ```rust
//! # use cucumber_engine::{
//! #     Feature, FeaturesRunner, Invocable, Library, Outcome, Pickle,
//! # };
//! #[derive(Default)]
//! struct Counter(usize);
//!
//! impl cucumber_engine::World for Counter {
//!     type Error = std::convert::Infallible;
//!
//!     async fn new() -> Result<Self, Self::Error> {
//!         Ok(Self::default())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let library = Library::<Counter>::new()
//!     .step(
//!         regex::Regex::new(r"^I add (\d+)$").unwrap(),
//!         Invocable::Sync(|counter, ctx| {
//!             let n = ctx.get_capture(1).unwrap_or("0");
//!             counter.0 += n.parse::<usize>()?;
//!             Ok(Outcome::Passed)
//!         }),
//!     );
//! let feature = Feature::new("Adding")
//!     .with_pickle(Pickle::new("twice").step("I add 2").step("I add 3"));
//!
//! let result = FeaturesRunner::new(library)
//!     .with_features([feature])
//!     .execute()
//!     .await;
//! assert!(result.is_successful());
//! assert_eq!(result.steps.passed, 2);
//! # }
//! ```
//!
//! [Cucumber]: https://cucumber.io

pub mod broadcaster;
pub mod error;
pub mod event;
pub mod fault;
pub mod filter;
pub mod hook;
pub mod listener;
pub mod pickle;
pub mod result;
pub mod runner;
pub mod status;
pub mod step;
pub mod support;
pub mod tag;
pub mod user_code;
pub mod world;

pub use gherkin;

#[doc(inline)]
pub use self::{
    broadcaster::{EventBroadcaster, Listener},
    error::Failure,
    event::Event,
    fault::{Fault, FaultChannel, FaultReporter},
    filter::PickleFilter,
    hook::{AroundHook, Hook, HookType},
    pickle::{Argument, Feature, Pickle, PickleStep},
    result::{FeaturesResult, ScenarioResult, Stats, StepResult},
    runner::{FeaturesRunner, Options, ScenarioRunner},
    status::Status,
    step::{Context, Location, Outcome, Pattern, StepDefinition, TestStep},
    support::Library,
    user_code::{Done, Invocable, UserCodeRunner},
    world::World,
};
