// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error of a step text matching several step definitions.

use std::fmt;

use derive_more::with_trait::Error;
use itertools::Itertools as _;

use super::{definition::Pattern, location::Location};

/// Step text matched more than one [`StepDefinition`].
///
/// [`StepDefinition`]: super::StepDefinition
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub struct AmbiguousMatchError {
    /// [`Pattern`]s the step text matches, in registration order.
    pub possible_matches: Vec<(Pattern, Option<Location>)>,
}

impl AmbiguousMatchError {
    /// Creates a new [`AmbiguousMatchError`] with the given possible matches.
    #[must_use]
    pub const fn new(
        possible_matches: Vec<(Pattern, Option<Location>)>,
    ) -> Self {
        Self { possible_matches }
    }

    /// Returns the number of possible matches.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.possible_matches.len()
    }

    /// Returns the possible matches sorted by their [`Pattern`]s.
    #[must_use]
    pub fn sorted_matches(&self) -> Vec<(Pattern, Option<Location>)> {
        self.possible_matches.iter().cloned().sorted().collect()
    }
}

impl fmt::Display for AmbiguousMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Possible matches:")?;
        for (pattern, loc) in &self.possible_matches {
            write!(f, "\n{pattern}")?;
            if let Some(loc) = loc {
                write!(f, " --> {loc}")?;
            }
        }
        Ok(())
    }
}
