// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step definitions and the units of work a [`Pickle`] is executed as.
//!
//! [`Pickle`]: crate::Pickle

pub mod context;
pub mod definition;
pub mod error;
pub mod location;
pub mod regex;

use std::sync::Arc;

use derive_more::with_trait::Display;

use crate::{hook::HookType, pickle::PickleStep};

pub use self::{
    context::{CaptureName, Context},
    definition::{Pattern, PatternError, StepDefinition},
    error::AmbiguousMatchError,
    location::Location,
    regex::HashableRegex,
};

/// Successful outcome of user code.
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum Outcome {
    /// Completed.
    #[default]
    #[display("passed")]
    Passed,

    /// Not implemented yet.
    #[display("pending")]
    Pending,

    /// Decided at runtime not to run.
    #[display("skipped")]
    Skipped,
}

/// Single unit of work of a [`Pickle`]: either one of its [`PickleStep`]s, or
/// a hook synthesized for it.
///
/// [`Pickle`]: crate::Pickle
#[derive(Clone, Debug, Display)]
pub enum TestStep {
    /// Hook of the given [`HookType`].
    #[display("{ty} hook")]
    Hook {
        /// Kind of the hook.
        ty: HookType,

        /// Where the hook was registered, if known.
        location: Option<Location>,
    },

    /// [`PickleStep`] of the [`Pickle`].
    ///
    /// [`Pickle`]: crate::Pickle
    #[display("{} {}", _0.keyword, _0.text)]
    Pickle(Arc<PickleStep>),
}

impl TestStep {
    /// Indicates whether this is a hook.
    #[must_use]
    pub const fn is_hook(&self) -> bool {
        matches!(self, Self::Hook { .. })
    }

    /// Returns the [`PickleStep`], if this isn't a hook.
    #[must_use]
    pub fn pickle_step(&self) -> Option<&Arc<PickleStep>> {
        match self {
            Self::Pickle(step) => Some(step),
            Self::Hook { .. } => None,
        }
    }
}
