// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runners executing [`Pickle`]s and [`Feature`]s, and their [`Options`].
//!
//! [`Feature`]: crate::Feature

pub mod features;
pub mod scenario;

use std::time::Duration;

use gherkin::tagexpr::TagOperation;

use crate::{pickle::Pickle, tag::Ext as _};

pub use self::{features::FeaturesRunner, scenario::ScenarioRunner};

/// Options of a run, parsable as CLI arguments.
#[derive(Clone, Debug, Default, clap::Args)]
#[group(skip)]
pub struct Options {
    /// Check that every step is wired up without running any user code.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Run tests until the first failure.
    #[arg(long, global = true, visible_alias = "ff")]
    pub fail_fast: bool,

    /// Fail the run on pending or undefined steps.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Number of times a scenario will be retried in case of a failure.
    #[arg(long, value_name = "int", global = true)]
    pub retry: Option<usize>,

    /// Delay between each scenario retry attempt.
    ///
    /// Enables a single retry on its own, unless `--retry` is given.
    ///
    /// Duration is represented in a human-readable format like `12min5s`.
    /// Supported suffixes:
    /// - `nsec`, `ns` - nanoseconds.
    /// - `usec`, `us` - microseconds.
    /// - `msec`, `ms` - milliseconds.
    /// - `seconds`, `second`, `sec`, `s` - seconds.
    /// - `minutes`, `minute`, `min`, `m` - minutes.
    #[arg(
        long,
        value_name = "duration",
        value_parser = humantime::parse_duration,
        verbatim_doc_comment,
        global = true,
    )]
    pub retry_after: Option<Duration>,

    /// Tag expression to filter retried scenarios.
    #[arg(long, value_name = "tagexpr", global = true)]
    pub retry_tag_filter: Option<TagOperation>,

    /// Timeout of a single step or hook, overriding the default one.
    #[arg(
        long,
        value_name = "duration",
        value_parser = humantime::parse_duration,
        global = true,
    )]
    pub timeout: Option<Duration>,
}

impl Options {
    /// Enables or disables the dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, yes: bool) -> Self {
        self.dry_run = yes;
        self
    }

    /// Enables or disables the fail-fast mode.
    #[must_use]
    pub const fn fail_fast(mut self, yes: bool) -> Self {
        self.fail_fast = yes;
        self
    }

    /// Enables or disables the strict mode.
    #[must_use]
    pub const fn strict(mut self, yes: bool) -> Self {
        self.strict = yes;
        self
    }

    /// Sets the number of retries of failed [`Pickle`]s.
    #[must_use]
    pub const fn retry(mut self, retries: usize) -> Self {
        self.retry = Some(retries);
        self
    }

    /// Sets the delay before each retry attempt.
    #[must_use]
    pub const fn retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Restricts retries to [`Pickle`]s matching the given tag expression.
    #[must_use]
    pub fn retry_tag_filter(
        mut self,
        filter: impl Into<Option<TagOperation>>,
    ) -> Self {
        self.retry_tag_filter = filter.into();
        self
    }

    /// Overrides the default timeout of user code.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Retries of a [`Pickle`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Retries {
    /// Current retry attempt, `0` for the initial one.
    pub current: usize,

    /// Available retries left.
    pub left: usize,
}

impl Retries {
    /// Creates initial [`Retries`].
    #[must_use]
    pub const fn initial(left: usize) -> Self {
        Self { left, current: 0 }
    }

    /// Returns [`Some`], in case next retry attempt is available, or [`None`]
    /// otherwise.
    #[must_use]
    pub fn next_try(self) -> Option<Self> {
        self.left
            .checked_sub(1)
            .map(|left| Self { left, current: self.current + 1 })
    }

    /// Returns the attempt number, starting from `1`.
    #[must_use]
    pub const fn attempt(self) -> usize {
        self.current + 1
    }
}

/// [`Retries`] of a [`Pickle`] along with the delay between attempts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryOptions {
    /// Number of [`Retries`].
    pub retries: Retries,

    /// Delay before next retry attempt will be executed.
    pub after: Option<Duration>,
}

impl RetryOptions {
    /// Returns [`Some`], in case next retry attempt is available, or [`None`]
    /// otherwise.
    #[must_use]
    pub fn next_try(self) -> Option<Self> {
        self.retries
            .next_try()
            .map(|num| Self { retries: num, after: self.after })
    }

    /// Resolves the [`RetryOptions`] of the given [`Pickle`] out of its
    /// `@retry(n)` / `@retry(n).after(duration)` tag and the [`Options`].
    ///
    /// Tag values take precedence. Without a tag, [`Options::retry`] and
    /// [`Options::retry_after`] apply to the [`Pickle`]s matching
    /// [`Options::retry_tag_filter`] (to all of them if there is no filter).
    /// Either of them enables retrying, once unless [`Options::retry`] says
    /// otherwise.
    #[must_use]
    pub fn parse_from_tags(pickle: &Pickle, opts: &Options) -> Option<Self> {
        let from_tag = pickle.tags.iter().rev().find_map(|tag| {
            let retries = crate::tag::normalize(tag).strip_prefix("retry")?;
            if !(retries.is_empty()
                || retries.starts_with('(')
                || retries.starts_with('.'))
            {
                return None;
            }
            let (num, rest) = retries
                .strip_prefix('(')
                .and_then(|s| {
                    let (num, rest) = s.split_once(')')?;
                    num.parse::<usize>().ok().map(|num| (Some(num), rest))
                })
                .unwrap_or((None, retries));
            let after = rest.strip_prefix(".after").and_then(|after| {
                let (dur, _) = after.strip_prefix('(')?.split_once(')')?;
                humantime::parse_duration(dur).ok()
            });
            Some((num, after))
        });

        if let Some((num, after)) = from_tag {
            return Some(Self {
                retries: Retries::initial(num.or(opts.retry).unwrap_or(1)),
                after: after.or(opts.retry_after),
            });
        }

        let wanted = opts
            .retry_tag_filter
            .as_ref()
            .map_or(opts.retry.is_some() || opts.retry_after.is_some(), |op| {
                op.eval(&pickle.tags)
            });
        wanted.then(|| Self {
            retries: Retries::initial(opts.retry.unwrap_or(1)),
            after: opts.retry_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_count_down() {
        let first = Retries::initial(2);
        let second = first.next_try().unwrap();
        let third = second.next_try().unwrap();

        assert_eq!(first.attempt(), 1);
        assert_eq!(third, Retries { current: 2, left: 0 });
        assert_eq!(third.next_try(), None);
    }

    #[test]
    fn retry_tag_takes_precedence() {
        let pickle = Pickle::new("flaky").with_tags(["retry(3).after(5ms)"]);
        let opts = Options::default().retry(1);

        let retry = RetryOptions::parse_from_tags(&pickle, &opts).unwrap();
        assert_eq!(retry.retries, Retries::initial(3));
        assert_eq!(retry.after, Some(Duration::from_millis(5)));

        let bare = Pickle::new("flaky").with_tags(["@retry"]);
        let retry = RetryOptions::parse_from_tags(&bare, &opts).unwrap();
        assert_eq!(retry.retries, Retries::initial(1));

        let unrelated = Pickle::new("retryable").with_tags(["retryable"]);
        let retry = RetryOptions::parse_from_tags(&unrelated, &opts).unwrap();
        assert_eq!(retry.after, None, "falls back to the options");
    }

    #[test]
    fn cli_retries_respect_tag_filter() {
        let opts = Options::default()
            .retry(2)
            .retry_tag_filter("@flaky".parse::<TagOperation>().unwrap());

        let flaky = Pickle::new("flaky").with_tags(["flaky"]);
        let stable = Pickle::new("stable");

        assert_eq!(
            RetryOptions::parse_from_tags(&flaky, &opts).unwrap().retries,
            Retries::initial(2),
        );
        assert!(RetryOptions::parse_from_tags(&stable, &opts).is_none());
        assert!(
            RetryOptions::parse_from_tags(&stable, &Options::default())
                .is_none(),
        );
    }

    #[test]
    fn cli_retry_delay_alone_retries_once() {
        let opts = Options::default().retry_after(Duration::from_secs(1));

        assert_eq!(
            RetryOptions::parse_from_tags(&Pickle::new("flaky"), &opts),
            Some(RetryOptions {
                retries: Retries::initial(1),
                after: Some(Duration::from_secs(1)),
            }),
        );
    }
}
