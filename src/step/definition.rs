// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`StepDefinition`]s and the [`Pattern`]s they are matched by.

use std::{fmt, time::Duration};

use cucumber_expressions::Expression;
use derive_more::with_trait::{Display, Error};
use regex::Regex;

use crate::user_code::Invocable;

use super::{context::CaptureName, location::Location, regex::HashableRegex};

/// Pattern a [`StepDefinition`] matches step text with.
#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Pattern {
    /// Plain regular expression.
    #[display("{_0}")]
    Regex(HashableRegex),

    /// [Cucumber Expression][1], compiled into a regular expression.
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions#readme
    #[display("{expression}")]
    Expression {
        /// Original expression.
        expression: String,

        /// Regular expression it was compiled into.
        regex: HashableRegex,
    },
}

impl Pattern {
    /// Parses the given [Cucumber Expression][1].
    ///
    /// # Errors
    ///
    /// If the `expression` is malformed.
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions#readme
    pub fn expression(expression: &str) -> Result<Self, PatternError> {
        let regex = Expression::regex(expression).map_err(|e| PatternError {
            expression: expression.to_owned(),
            message: e.to_string(),
        })?;
        Ok(Self::Expression {
            expression: expression.to_owned(),
            regex: regex.into(),
        })
    }

    /// Returns the [`Regex`] step text is matched with.
    #[must_use]
    pub const fn regex(&self) -> &HashableRegex {
        match self {
            Self::Regex(re) | Self::Expression { regex: re, .. } => re,
        }
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Self::Regex(re.into())
    }
}

/// Error of parsing a [`Pattern::Expression`].
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("Invalid Cucumber Expression `{expression}`: {message}")]
pub struct PatternError {
    /// Malformed expression.
    pub expression: String,

    /// Description of what's wrong with it.
    pub message: String,
}

/// Registered step body along with the [`Pattern`] selecting it.
pub struct StepDefinition<W> {
    /// [`Pattern`] matched against step text.
    pub pattern: Pattern,

    /// User code to run.
    pub body: Invocable<W>,

    /// Where this [`StepDefinition`] was registered.
    pub location: Option<Location>,

    /// Timeout overriding the [`Library`] default one.
    ///
    /// [`Library`]: crate::Library
    pub timeout: Option<Duration>,
}

impl<W> Clone for StepDefinition<W> {
    fn clone(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            body: self.body,
            location: self.location,
            timeout: self.timeout,
        }
    }
}

impl<W> fmt::Debug for StepDefinition<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("pattern", &self.pattern)
            .field("body", &self.body)
            .field("location", &self.location)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<W> StepDefinition<W> {
    /// Creates a new [`StepDefinition`] without location or timeout.
    #[must_use]
    pub fn new(pattern: impl Into<Pattern>, body: Invocable<W>) -> Self {
        Self { pattern: pattern.into(), body, location: None, timeout: None }
    }

    /// Sets the [`Location`] of this [`StepDefinition`].
    #[must_use]
    pub const fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Overrides the default timeout for this [`StepDefinition`].
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Number of parameters captured from the step text.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.pattern.regex().captures_len() - 1
    }

    /// Indicates whether the given step `text` matches this
    /// [`StepDefinition`].
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.regex().is_match(text)
    }

    /// Captures the parameters of the given step `text`.
    ///
    /// The first capture is always the whole match. Returns [`None`] if the
    /// `text` doesn't match.
    #[must_use]
    pub fn captures(&self, text: &str) -> Option<Vec<(CaptureName, String)>> {
        let re = self.pattern.regex();
        let caps = re.captures(text)?;

        Some(
            re.capture_names()
                .map(|name| name.map(str::to_owned))
                .zip(caps.iter().map(|m| {
                    m.map_or_else(String::new, |m| m.as_str().to_owned())
                }))
                .collect(),
        )
    }

    /// Returns the `(pattern, location)` pair describing this
    /// [`StepDefinition`] in an [`AmbiguousMatchError`].
    ///
    /// [`AmbiguousMatchError`]: super::AmbiguousMatchError
    #[must_use]
    pub fn candidate(&self) -> (Pattern, Option<Location>) {
        (self.pattern.clone(), self.location)
    }
}

#[cfg(test)]
mod tests {
    use crate::Outcome;

    use super::*;

    fn definition(pattern: impl Into<Pattern>) -> StepDefinition<()> {
        StepDefinition::new(
            pattern,
            Invocable::Sync(|_, _| Ok(Outcome::Passed)),
        )
    }

    #[test]
    fn captures_indexed_and_named_groups() {
        let def = definition(
            Regex::new(r"^I have (\d+) (?P<item>\w+)(?: in (\w+))?$").unwrap(),
        );

        assert_eq!(def.parameter_count(), 3);
        assert_eq!(
            def.captures("I have 5 cucumbers").unwrap(),
            [
                (None, "I have 5 cucumbers".to_owned()),
                (None, "5".to_owned()),
                (Some("item".to_owned()), "cucumbers".to_owned()),
                (None, String::new()),
            ],
        );
        assert!(def.captures("I have none").is_none());
    }

    #[test]
    fn compiles_cucumber_expressions() {
        let def =
            definition(Pattern::expression("I have {int} cucumbers").unwrap());

        assert!(def.matches("I have 42 cucumbers"));
        assert!(!def.matches("I have many cucumbers"));
        assert_eq!(def.pattern.to_string(), "I have {int} cucumbers");
        assert_eq!(def.captures("I have 42 cucumbers").unwrap()[1].1, "42");
    }

    #[test]
    fn rejects_malformed_expressions() {
        let err = Pattern::expression("I have {int cucumbers").unwrap_err();

        assert_eq!(err.expression, "I have {int cucumbers");
        assert!(err.to_string().starts_with("Invalid Cucumber Expression"));
    }
}
