// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Context`] passed to user code.

use std::sync::Arc;

use crate::{
    fault::FaultReporter,
    pickle::{Argument, Pickle, PickleStep},
    status::Status,
};

/// Name of a capturing group, if it has one.
pub type CaptureName = Option<String>;

/// Everything user code knows about the unit it's invoked for.
#[derive(Clone, Debug)]
pub struct Context {
    /// [`Pickle`] being executed.
    pub pickle: Arc<Pickle>,

    /// [`PickleStep`] being executed, or [`None`] for a hook.
    pub step: Option<Arc<PickleStep>>,

    /// Captures of the step text, the whole match first.
    ///
    /// Empty for hooks.
    pub matches: Vec<(CaptureName, String)>,

    /// [`Status`] of the [`Pickle`] so far.
    ///
    /// Lets after-hooks react to failures.
    pub status: Status,

    /// Attempt number, starting from `1`.
    pub attempt: usize,

    /// Reporter of faults escaping asynchronous user code.
    pub faults: FaultReporter,
}

impl Context {
    /// Creates a new [`Context`] for a hook of the given [`Pickle`].
    #[must_use]
    pub fn new(pickle: Arc<Pickle>) -> Self {
        Self {
            pickle,
            step: None,
            matches: Vec::new(),
            status: Status::Passed,
            attempt: 1,
            faults: FaultReporter::default(),
        }
    }

    /// Makes this [`Context`] describe the given [`PickleStep`] with its
    /// captured `matches`.
    #[must_use]
    pub fn with_step(
        mut self,
        step: Arc<PickleStep>,
        matches: Vec<(CaptureName, String)>,
    ) -> Self {
        self.step = Some(step);
        self.matches = matches;
        self
    }

    /// Returns the [`Argument`] of the current [`PickleStep`], if any.
    #[must_use]
    pub fn argument(&self) -> Option<&Argument> {
        self.step.as_ref()?.argument.as_ref()
    }

    /// Returns the value of a named capture group, if it exists.
    #[must_use]
    pub fn get_named_capture(&self, name: &str) -> Option<&str> {
        self.matches
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the value of a capture group by index (0 is the whole match).
    #[must_use]
    pub fn get_capture(&self, index: usize) -> Option<&str> {
        self.matches.get(index).map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_captures_and_argument() {
        let step = PickleStep::new("I have 5 cucumbers")
            .with_argument(Argument::DocString("doc".into()));
        let ctx = Context::new(Arc::new(Pickle::new("eating"))).with_step(
            Arc::new(step),
            vec![
                (None, "I have 5 cucumbers".into()),
                (Some("count".into()), "5".into()),
            ],
        );

        assert_eq!(ctx.get_capture(0), Some("I have 5 cucumbers"));
        assert_eq!(ctx.get_named_capture("count"), Some("5"));
        assert_eq!(ctx.get_named_capture("missing"), None);
        assert_eq!(ctx.argument(), Some(&Argument::DocString("doc".into())));
    }

    #[test]
    fn hook_context_has_no_step() {
        let ctx = Context::new(Arc::new(Pickle::new("eating")));

        assert!(ctx.step.is_none());
        assert!(ctx.argument().is_none());
        assert_eq!(ctx.attempt, 1);
    }
}
