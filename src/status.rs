// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Terminal [`Status`] of an executed [`Step`], hook or [`Scenario`].
//!
//! [`Scenario`]: crate::Pickle
//! [`Step`]: crate::PickleStep

use derive_more::with_trait::Display;

/// Outcome of executing (or not executing) a single unit of work.
///
/// Statuses are aggregated by their [`Status::severity()`]: a [`Scenario`]
/// has the status of its most severe [`Step`].
///
/// [`Scenario`]: crate::Pickle
/// [`Step`]: crate::PickleStep
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Status {
    /// User code completed successfully.
    #[display("passed")]
    Passed,

    /// User code failed, panicked or timed out.
    #[display("failed")]
    Failed,

    /// More than one step definition matched.
    #[display("ambiguous")]
    Ambiguous,

    /// User code reported itself as not implemented yet.
    #[display("pending")]
    Pending,

    /// User code wasn't invoked at all.
    #[display("skipped")]
    Skipped,

    /// No step definition matched.
    #[display("undefined")]
    Undefined,
}

impl Status {
    /// All the [`Status`]es in order of increasing [`severity()`].
    ///
    /// [`severity()`]: Status::severity
    pub const ALL: [Self; 6] = [
        Self::Passed,
        Self::Skipped,
        Self::Undefined,
        Self::Pending,
        Self::Failed,
        Self::Ambiguous,
    ];

    /// Returns the aggregation weight of this [`Status`].
    ///
    /// `Passed < Skipped < Undefined < Pending < Failed == Ambiguous`
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::Skipped => 1,
            Self::Undefined => 2,
            Self::Pending => 3,
            Self::Failed | Self::Ambiguous => 4,
        }
    }

    /// Indicates whether this [`Status`] is strictly more severe than the
    /// `other` one.
    #[must_use]
    pub const fn is_worse_than(self, other: Self) -> bool {
        self.severity() > other.severity()
    }

    /// Indicates whether this [`Status`] fails a run.
    ///
    /// [`Failed`] and [`Ambiguous`] always do, [`Pending`] and [`Undefined`]
    /// only in `strict` mode.
    ///
    /// [`Ambiguous`]: Status::Ambiguous
    /// [`Failed`]: Status::Failed
    /// [`Pending`]: Status::Pending
    /// [`Undefined`]: Status::Undefined
    #[must_use]
    pub const fn is_failing(self, strict: bool) -> bool {
        match self {
            Self::Failed | Self::Ambiguous => true,
            Self::Pending | Self::Undefined => strict,
            Self::Passed | Self::Skipped => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        let severities = Status::ALL.map(Status::severity);
        assert!(severities.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(Status::Failed.severity(), Status::Ambiguous.severity());
    }

    #[test]
    fn worse_is_strict() {
        assert!(Status::Pending.is_worse_than(Status::Undefined));
        assert!(!Status::Ambiguous.is_worse_than(Status::Failed));
        assert!(!Status::Failed.is_worse_than(Status::Ambiguous));
        assert!(!Status::Passed.is_worse_than(Status::Passed));
    }

    #[test]
    fn failing_depends_on_strict() {
        for strict in [false, true] {
            assert!(Status::Failed.is_failing(strict));
            assert!(Status::Ambiguous.is_failing(strict));
            assert!(!Status::Passed.is_failing(strict));
            assert!(!Status::Skipped.is_failing(strict));
        }
        assert!(!Status::Pending.is_failing(false));
        assert!(Status::Pending.is_failing(true));
        assert!(!Status::Undefined.is_failing(false));
        assert!(Status::Undefined.is_failing(true));
    }

    #[test]
    fn displays_lowercase() {
        assert_eq!(Status::Ambiguous.to_string(), "ambiguous");
        assert_eq!(Status::Passed.to_string(), "passed");
    }
}
