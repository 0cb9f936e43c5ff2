// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Hooks running before, after and around [`Pickle`]s.

use std::{fmt, time::Duration};

use derive_more::with_trait::Display;
use gherkin::tagexpr::TagOperation;

use crate::{
    pickle::Pickle,
    step::{Location, TestStep},
    tag,
    user_code::Invocable,
};

/// Kind of a [`HookStep`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum HookType {
    /// [`Hook`] running before the [`Pickle`] steps.
    #[display("Before")]
    Before,

    /// [`Hook`] running after the [`Pickle`] steps.
    #[display("After")]
    After,

    /// First half of an [`AroundHook`].
    #[display("Around (before)")]
    AroundBefore,

    /// Second half of an [`AroundHook`].
    #[display("Around (after)")]
    AroundAfter,
}

impl HookType {
    /// Indicates whether this [`HookType`] runs before the [`Pickle`] steps.
    #[must_use]
    pub const fn is_before(self) -> bool {
        matches!(self, Self::Before | Self::AroundBefore)
    }
}

/// Registered before or after [`Hook`].
pub struct Hook<W> {
    /// User code to run.
    pub body: Invocable<W>,

    /// Tag expression restricting the [`Pickle`]s this [`Hook`] applies to.
    pub tags: Option<TagOperation>,

    /// Where this [`Hook`] was registered.
    pub location: Option<Location>,

    /// Timeout overriding the [`Library`] default one.
    ///
    /// [`Library`]: crate::Library
    pub timeout: Option<Duration>,
}

/// Registered hook wrapping a [`Pickle`]: its `before` half runs first of all
/// the before-steps, its `after` half runs last of all the after-steps.
pub struct AroundHook<W> {
    /// User code to run before the [`Pickle`] steps.
    pub before: Invocable<W>,

    /// User code to run after the [`Pickle`] steps.
    pub after: Invocable<W>,

    /// Tag expression restricting the [`Pickle`]s this [`AroundHook`]
    /// applies to.
    pub tags: Option<TagOperation>,

    /// Where this [`AroundHook`] was registered.
    pub location: Option<Location>,

    /// Timeout overriding the [`Library`] default one.
    ///
    /// [`Library`]: crate::Library
    pub timeout: Option<Duration>,
}

impl<W> Hook<W> {
    /// Creates a new [`Hook`] applying to every [`Pickle`].
    #[must_use]
    pub const fn new(body: Invocable<W>) -> Self {
        Self { body, tags: None, location: None, timeout: None }
    }

    /// Restricts this [`Hook`] to [`Pickle`]s matching the given tag
    /// expression.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<Option<TagOperation>>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Sets the [`Location`] of this [`Hook`].
    #[must_use]
    pub const fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Overrides the default timeout for this [`Hook`].
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Indicates whether this [`Hook`] applies to the given [`Pickle`].
    #[must_use]
    pub fn applies_to(&self, pickle: &Pickle) -> bool {
        tag::matches(self.tags.as_ref(), &pickle.tags)
    }

    /// Synthesizes a [`HookStep`] of the given [`HookType`] out of this
    /// [`Hook`].
    #[must_use]
    pub const fn step(&self, ty: HookType) -> HookStep<W> {
        HookStep {
            ty,
            body: self.body,
            location: self.location,
            timeout: self.timeout,
        }
    }
}

impl<W> AroundHook<W> {
    /// Creates a new [`AroundHook`] applying to every [`Pickle`].
    #[must_use]
    pub const fn new(before: Invocable<W>, after: Invocable<W>) -> Self {
        Self { before, after, tags: None, location: None, timeout: None }
    }

    /// Restricts this [`AroundHook`] to [`Pickle`]s matching the given tag
    /// expression.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<Option<TagOperation>>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Sets the [`Location`] of this [`AroundHook`].
    #[must_use]
    pub const fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Overrides the default timeout for this [`AroundHook`].
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Indicates whether this [`AroundHook`] applies to the given
    /// [`Pickle`].
    #[must_use]
    pub fn applies_to(&self, pickle: &Pickle) -> bool {
        tag::matches(self.tags.as_ref(), &pickle.tags)
    }

    /// Synthesizes the `(before, after)` [`HookStep`]s of this
    /// [`AroundHook`].
    #[must_use]
    pub fn steps(&self) -> (HookStep<W>, HookStep<W>) {
        let step = |ty, body| HookStep {
            ty,
            body,
            location: self.location,
            timeout: self.timeout,
        };
        (
            step(HookType::AroundBefore, self.before),
            step(HookType::AroundAfter, self.after),
        )
    }
}

/// Hook synthesized as a step of a single [`Pickle`] run.
pub struct HookStep<W> {
    /// Kind of this [`HookStep`].
    pub ty: HookType,

    /// User code to run.
    pub body: Invocable<W>,

    /// Where the hook was registered.
    pub location: Option<Location>,

    /// Timeout overriding the [`Library`] default one.
    ///
    /// [`Library`]: crate::Library
    pub timeout: Option<Duration>,
}

impl<W> HookStep<W> {
    /// Describes this [`HookStep`] as a [`TestStep`].
    #[must_use]
    pub const fn test_step(&self) -> TestStep {
        TestStep::Hook { ty: self.ty, location: self.location }
    }
}

macro_rules! impl_debug {
    ($($ty:ident { $($field:ident),* $(,)? }),* $(,)?) => {$(
        impl<W> fmt::Debug for $ty<W> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))*
                    .finish()
            }
        }
    )*};
}

impl_debug! {
    Hook { body, tags, location, timeout },
    AroundHook { before, after, tags, location, timeout },
    HookStep { ty, body, location, timeout },
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{Context, Outcome, UserCodeRunner};

    use super::*;

    fn noop() -> Invocable<()> {
        Invocable::Sync(|_, _| Ok(Outcome::Passed))
    }

    #[test]
    fn untagged_hook_applies_to_everything() {
        let hook = Hook::new(noop());

        assert!(hook.applies_to(&Pickle::new("plain")));
        assert!(hook.applies_to(&Pickle::new("tagged").with_tags(["wip"])));
    }

    #[test]
    fn tagged_hook_applies_to_matching_pickles() {
        let hook = AroundHook::new(noop(), noop())
            .with_tags("@db and not @slow".parse::<TagOperation>().unwrap());

        assert!(hook.applies_to(&Pickle::new("db").with_tags(["db"])));
        assert!(
            !hook.applies_to(&Pickle::new("slow").with_tags(["db", "slow"])),
        );
        assert!(!hook.applies_to(&Pickle::new("plain")));
    }

    #[test]
    fn around_hook_splits_into_two_steps() {
        let location = Location::new("src/hooks.rs", 3, 1);
        let (before, after) =
            AroundHook::new(noop(), noop()).at(location).steps();

        assert_eq!(before.ty, HookType::AroundBefore);
        assert_eq!(after.ty, HookType::AroundAfter);
        assert!(before.ty.is_before());
        assert!(!after.ty.is_before());
        assert_eq!(after.location, Some(location));
    }

    #[tokio::test]
    async fn around_hook_steps_run_their_own_half() {
        let (before, after) = AroundHook::new(
            Invocable::Sync(|_, _| Ok(Outcome::Pending)),
            Invocable::Sync(|_, _| Ok(Outcome::Skipped)),
        )
        .steps();
        let runner = UserCodeRunner::default();
        let ctx = Context::new(Arc::new(Pickle::new("around")));

        let outcome = runner.run(&before.body, &mut (), &ctx, None).await;
        assert_eq!(outcome.unwrap(), Outcome::Pending);
        let outcome = runner.run(&after.body, &mut (), &ctx, None).await;
        assert_eq!(outcome.unwrap(), Outcome::Skipped);
    }
}
