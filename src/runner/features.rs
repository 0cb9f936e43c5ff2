// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`FeaturesRunner`] executing a whole run.

use std::sync::Arc;

use tracing::{info_span, warn, Instrument as _};

use crate::{
    broadcaster::{EventBroadcaster, Listener},
    event::{Event, Payload},
    fault::FaultChannel,
    filter::PickleFilter,
    pickle::{Feature, Pickle},
    result::FeaturesResult,
    support::Library,
    user_code::UserCodeRunner,
    world::World,
};

use super::{Options, RetryOptions, ScenarioRunner};

/// Runner of all the [`Pickle`]s of all the [`Feature`]s, one at a time.
///
/// # Example
///
/// ```rust
/// # use cucumber_engine::{Feature, FeaturesRunner, Library, Pickle};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let feature = Feature::new("empty").with_pickle(Pickle::new("no steps"));
/// let passed = FeaturesRunner::new(Library::<()>::new())
///     .with_features([feature])
///     .run()
///     .await;
/// assert!(passed);
/// # }
/// ```
pub struct FeaturesRunner<W> {
    features: Vec<Feature>,
    library: Library<W>,
    broadcaster: EventBroadcaster,
    user_code: UserCodeRunner,
    filter: PickleFilter,
    options: Options,
}

impl<W: World> FeaturesRunner<W> {
    /// Creates a new [`FeaturesRunner`] of the given [`Library`] without any
    /// [`Feature`]s.
    #[must_use]
    pub fn new(library: Library<W>) -> Self {
        Self {
            features: Vec::new(),
            library,
            broadcaster: EventBroadcaster::new(),
            user_code: UserCodeRunner::new(FaultChannel::new()),
            filter: PickleFilter::new(),
            options: Options::default(),
        }
    }

    /// Adds [`Feature`]s to run.
    #[must_use]
    pub fn with_features(
        mut self,
        features: impl IntoIterator<Item = Feature>,
    ) -> Self {
        self.features.extend(features);
        self
    }

    /// Registers a [`Listener`] of the run [`Event`]s.
    #[must_use]
    pub fn with_listener(mut self, listener: impl Listener + 'static) -> Self {
        self.broadcaster = self.broadcaster.with_listener(listener);
        self
    }

    /// Sets the [`PickleFilter`] deciding which [`Pickle`]s run.
    #[must_use]
    pub fn with_filter(mut self, filter: PickleFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the [`Options`] of the run.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Sets the [`FaultChannel`] user code may report uncaught faults to.
    #[must_use]
    pub fn with_fault_channel(mut self, faults: FaultChannel) -> Self {
        self.user_code = UserCodeRunner::new(faults);
        self
    }

    /// Executes the run, returning whether it succeeded.
    pub async fn run(&self) -> bool {
        self.execute().await.is_successful()
    }

    /// Executes the run, returning its [`FeaturesResult`].
    ///
    /// [`Feature`]s left without [`Pickle`]s by the [`PickleFilter`] are not
    /// visited at all.
    pub async fn execute(&self) -> FeaturesResult {
        let features = self
            .features
            .iter()
            .filter_map(|feature| {
                let pickles = feature
                    .pickles
                    .iter()
                    .filter(|p| self.filter.matches(p))
                    .cloned()
                    .collect::<Vec<_>>();
                (!pickles.is_empty()).then(|| {
                    Arc::new(Feature { pickles, ..feature.clone() })
                })
            })
            .collect::<Arc<[_]>>();

        let mut result = FeaturesResult::new(self.options.strict);
        let event = Event::new(Payload::Features(Arc::clone(&features)));
        self.broadcaster
            .broadcast_around_event(event, async {
                for feature in features.iter() {
                    if self.is_failed_fast(&result) {
                        warn!(feature = %feature.name, "skipped by fail-fast");
                        continue;
                    }
                    self.run_feature(feature, &mut result).await;
                }
            })
            .await;

        self.broadcaster
            .broadcast_event(Event::new(Payload::FeaturesResult(Arc::new(
                result.clone(),
            ))))
            .await;
        result
    }

    fn is_failed_fast(&self, result: &FeaturesResult) -> bool {
        self.options.fail_fast && !result.is_successful()
    }

    async fn run_feature(
        &self,
        feature: &Arc<Feature>,
        result: &mut FeaturesResult,
    ) {
        let span = info_span!("feature", name = %feature.name);
        let event = Event::new(Payload::Feature(Arc::clone(feature)));
        self.broadcaster
            .broadcast_around_event(event, async {
                result.witness_feature();
                for pickle in &feature.pickles {
                    if self.is_failed_fast(result) {
                        warn!(scenario = %pickle.name, "skipped by fail-fast");
                        continue;
                    }
                    self.run_pickle(pickle, result).await;
                }
            })
            .instrument(span)
            .await;
    }

    /// Runs attempts of the given [`Pickle`] until one isn't retried.
    async fn run_pickle(
        &self,
        pickle: &Arc<Pickle>,
        result: &mut FeaturesResult,
    ) {
        let mut retry = RetryOptions::parse_from_tags(pickle, &self.options);
        loop {
            let attempt = ScenarioRunner::new(
                &self.library,
                &self.broadcaster,
                &self.user_code,
                &self.options,
                Arc::clone(pickle),
            )
            .with_retries(retry.map(|r| r.retries))
            .run()
            .await;
            result.witness_scenario_result(&attempt);

            if !attempt.will_be_retried {
                break;
            }
            let Some(next) = retry.and_then(RetryOptions::next_try) else {
                break;
            };
            warn!(
                scenario = %pickle.name,
                attempt = next.retries.attempt(),
                left = next.retries.left,
                "retrying scenario",
            );
            if let Some(after) = next.after {
                tokio::time::sleep(after).await;
            }
            retry = Some(next);
        }
    }
}
