// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lifecycle [`Event`]s broadcast to [`Listener`]s.
//!
//! Around events are doubled into a [`Phase::Before`] and a [`Phase::After`]
//! replica of the same [`Payload`]:
//!
//! ```text
//! BeforeFeatures
//!     BeforeFeature
//!         BeforeScenario
//!             BeforeStep
//!             StepResult
//!             AfterStep
//!             ...
//!             ScenarioResult
//!         AfterScenario
//!         ...
//!     AfterFeature
//!     ...
//! AfterFeatures
//! FeaturesResult
//! ```
//!
//! [`Listener`]: crate::Listener

use std::{sync::Arc, time::SystemTime};

use derive_more::with_trait::{AsRef, Deref, Display};

use crate::{
    pickle::{Feature, Pickle},
    result::{FeaturesResult, ScenarioResult, StepResult},
    step::TestStep,
};

/// Name of an [`Event`], without its [`Phase`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Name {
    /// Whole run.
    Features,

    /// Single [`Feature`].
    Feature,

    /// Single [`Pickle`] attempt.
    Scenario,

    /// Single [`TestStep`].
    Step,

    /// [`StepResult`] became known.
    StepResult,

    /// [`ScenarioResult`] became known.
    ScenarioResult,

    /// [`FeaturesResult`] became known.
    FeaturesResult,
}

/// Phase of an around [`Event`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Phase {
    /// Before the wrapped action.
    Before,

    /// After the wrapped action.
    After,
}

/// Data an [`Event`] carries, keyed by the entity it's about.
#[derive(Clone, Debug)]
pub enum Payload {
    /// [`Feature`]s to be run.
    Features(Arc<[Arc<Feature>]>),

    /// [`Feature`] being run.
    Feature(Arc<Feature>),

    /// [`Pickle`] attempt being run.
    Scenario {
        /// [`Pickle`] being run.
        pickle: Arc<Pickle>,

        /// Attempt number, starting from `1`.
        attempt: usize,
    },

    /// [`TestStep`] being run.
    Step {
        /// [`Pickle`] the [`TestStep`] belongs to.
        pickle: Arc<Pickle>,

        /// [`TestStep`] being run.
        step: TestStep,
    },

    /// [`StepResult`] of a [`TestStep`].
    StepResult {
        /// [`Pickle`] the [`TestStep`] belongs to.
        pickle: Arc<Pickle>,

        /// [`StepResult`] itself.
        result: Arc<StepResult>,
    },

    /// Final [`ScenarioResult`] of a [`Pickle`] attempt.
    ScenarioResult(Arc<ScenarioResult>),

    /// [`FeaturesResult`] of the whole run.
    FeaturesResult(Arc<FeaturesResult>),
}

impl Payload {
    /// Returns the [`Name`] of [`Event`]s carrying this [`Payload`].
    #[must_use]
    pub const fn name(&self) -> Name {
        match self {
            Self::Features(_) => Name::Features,
            Self::Feature(_) => Name::Feature,
            Self::Scenario { .. } => Name::Scenario,
            Self::Step { .. } => Name::Step,
            Self::StepResult { .. } => Name::StepResult,
            Self::ScenarioResult(_) => Name::ScenarioResult,
            Self::FeaturesResult(_) => Name::FeaturesResult,
        }
    }
}

/// Lifecycle event.
#[derive(AsRef, Clone, Debug, Deref, Display)]
#[display("{}{name}", phase.map(|p| p.to_string()).unwrap_or_default())]
pub struct Event {
    /// [`Name`] of this [`Event`].
    pub name: Name,

    /// [`Phase`] of an around [`Event`].
    pub phase: Option<Phase>,

    /// [`SystemTime`] when this [`Event`] has happened.
    pub at: SystemTime,

    /// Actual value of this [`Event`].
    #[as_ref]
    #[deref]
    pub payload: Payload,
}

impl Event {
    /// Creates a new phase-less [`Event`] out of the given [`Payload`].
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self {
            name: payload.name(),
            phase: None,
            at: SystemTime::now(),
            payload,
        }
    }

    /// Returns the [`Phase::Before`] replica of this [`Event`].
    #[must_use]
    pub fn before(&self) -> Self {
        self.replicate(Phase::Before)
    }

    /// Returns the [`Phase::After`] replica of this [`Event`].
    #[must_use]
    pub fn after(&self) -> Self {
        self.replicate(Phase::After)
    }

    fn replicate(&self, phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            at: SystemTime::now(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicas_are_name_prefixed() {
        let event = Event::new(Payload::Feature(Arc::new(Feature::new("f"))));

        assert_eq!(event.to_string(), "Feature");
        assert_eq!(event.before().to_string(), "BeforeFeature");
        assert_eq!(event.after().to_string(), "AfterFeature");
        assert_eq!(event.after().name, Name::Feature);
    }

    #[test]
    fn replicas_share_payload() {
        let pickle = Arc::new(Pickle::new("p"));
        let event = Event::new(Payload::Scenario {
            pickle: Arc::clone(&pickle),
            attempt: 1,
        });

        let before = event.before();
        let Payload::Scenario { pickle: replica, .. } = &before.payload else {
            panic!("wrong payload");
        };
        assert!(Arc::ptr_eq(replica, &pickle));
    }
}
