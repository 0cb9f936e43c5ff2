// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`PickleFilter`] deciding which [`Pickle`]s run at all.

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    str::FromStr,
};

use derive_more::with_trait::{Display, Error};
use gherkin::tagexpr::TagOperation;
use lazy_regex::regex;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{pickle::Pickle, tag};

/// Predicate over [`Pickle`]s combining a line, a name and a tag filter.
///
/// A [`Pickle`] passes only if it passes all three.
#[derive(Clone, Debug, Default)]
pub struct PickleFilter {
    lines: HashMap<PathBuf, HashSet<usize>>,
    names: Vec<Regex>,
    tags: Option<TagOperation>,
}

impl PickleFilter {
    /// Creates a new [`PickleFilter`] letting everything through.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the [`Pickle`]s of the [`Selector::path`] file to the ones
    /// declared on the [`Selector::lines`].
    ///
    /// A [`Selector`] without lines doesn't restrict anything.
    #[must_use]
    pub fn with_selector(mut self, selector: Selector) -> Self {
        if !selector.lines.is_empty() {
            self.lines.entry(selector.path).or_default().extend(selector.lines);
        }
        self
    }

    /// Adds a pattern the [`Pickle::name`] may match.
    #[must_use]
    pub fn with_name(mut self, name: Regex) -> Self {
        self.names.push(name);
        self
    }

    /// Sets the tag expression the [`Pickle::tags`] must satisfy.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<Option<TagOperation>>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Indicates whether the given [`Pickle`] should run.
    #[must_use]
    pub fn matches(&self, pickle: &Pickle) -> bool {
        self.matches_lines(pickle)
            && self.matches_names(pickle)
            && tag::matches(self.tags.as_ref(), &pickle.tags)
    }

    fn matches_lines(&self, pickle: &Pickle) -> bool {
        let Some(uri) = &pickle.uri else {
            return true;
        };
        self.lines
            .iter()
            .filter(|(path, _)| uri.ends_with(path))
            .all(|(_, lines)| pickle.lines.iter().any(|l| lines.contains(l)))
    }

    fn matches_names(&self, pickle: &Pickle) -> bool {
        self.names.is_empty()
            || self.names.iter().any(|re| re.is_match(&pickle.name))
    }
}

/// `path[:line...]` selector of a `.feature` file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selector {
    /// Path to the `.feature` file.
    pub path: PathBuf,

    /// Lines of the requested [`Pickle`]s.
    pub lines: Vec<usize>,
}

/// Error of parsing a [`Selector`].
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("Invalid `path[:line...]` selector `{_0}`")]
pub struct SelectorError(#[error(not(source))] pub String);

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static SELECTOR: &Lazy<Regex> = regex!(r"^(.*?)((?::\d+)*)$");

        let err = || SelectorError(s.to_owned());
        let caps = SELECTOR.captures(s).ok_or_else(err)?;
        let path = caps.get(1).map_or("", |m| m.as_str());
        if path.is_empty() {
            return Err(err());
        }
        let lines = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .split(':')
            .filter(|l| !l.is_empty())
            .map(|l| l.parse().map_err(|_| err()))
            .collect::<Result<_, _>>()?;

        Ok(Self { path: path.into(), lines })
    }
}

/// CLI options of a [`PickleFilter`].
#[derive(Clone, Debug, Default, clap::Args)]
#[group(skip)]
pub struct Cli {
    /// Regex to filter scenarios by their name. May be repeated.
    #[arg(
        id = "name",
        long = "name",
        short = 'n',
        value_name = "regex",
        visible_alias = "scenario-name",
        global = true
    )]
    pub names: Vec<Regex>,

    /// Tag expression to filter scenarios by.
    ///
    /// Note: Tags from Feature, Rule and Scenario are merged together on
    /// filtering, so be careful about conflicting tags on different levels.
    #[arg(
        id = "tags",
        long = "tags",
        short = 't',
        value_name = "tagexpr",
        global = true
    )]
    pub tags: Option<TagOperation>,

    /// `.feature` files to run, optionally restricted to the scenarios
    /// declared on the given lines.
    #[arg(value_name = "path[:line...]")]
    pub selectors: Vec<Selector>,
}

impl From<Cli> for PickleFilter {
    fn from(cli: Cli) -> Self {
        let filter = cli
            .selectors
            .into_iter()
            .fold(Self::new(), Self::with_selector);
        cli.names
            .into_iter()
            .fold(filter, Self::with_name)
            .with_tags(cli.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tags: &[&str]) -> Pickle {
        Pickle::new("tagged").with_tags(tags.iter().copied())
    }

    #[test]
    fn tag_expression_requires_every_operand() {
        let filter = PickleFilter::new()
            .with_tags("@a and @b".parse::<TagOperation>().unwrap());

        assert!(filter.matches(&tagged(&["@a", "@b"])));
        assert!(!filter.matches(&tagged(&["@a"])));
        assert!(!filter.matches(&tagged(&["@b"])));
        assert!(!filter.matches(&tagged(&[])));
    }

    #[test]
    fn names_match_any_pattern() {
        let filter = PickleFilter::new()
            .with_name(Regex::new("^eat").unwrap())
            .with_name(Regex::new("sleep").unwrap());

        assert!(filter.matches(&Pickle::new("eating")));
        assert!(filter.matches(&Pickle::new("deep sleep")));
        assert!(!filter.matches(&Pickle::new("running")));
        assert!(PickleFilter::new().matches(&Pickle::new("anything")));
    }

    #[test]
    fn lines_filter_only_the_selected_file() {
        let filter = PickleFilter::new()
            .with_selector("features/eat.feature:3:12".parse().unwrap());

        let at = |file: &str, line| Pickle::new("p").located(file, line);
        assert!(filter.matches(&at("features/eat.feature", 3)));
        assert!(filter.matches(&at("/abs/features/eat.feature", 12)));
        assert!(!filter.matches(&at("features/eat.feature", 7)));
        assert!(filter.matches(&at("features/sleep.feature", 7)));
        assert!(filter.matches(&Pickle::new("nowhere")));
    }

    #[test]
    fn outline_rows_are_selectable_by_their_line() {
        let filter = PickleFilter::new()
            .with_selector("eat.feature:14".parse().unwrap());
        let mut row = Pickle::new("row").located("eat.feature", 5);
        row.lines.push(14);

        assert!(filter.matches(&row));
    }

    #[test]
    fn parses_selectors() {
        assert_eq!(
            "a/b.feature:1:20".parse::<Selector>(),
            Ok(Selector { path: "a/b.feature".into(), lines: vec![1, 20] }),
        );
        assert_eq!(
            "a/b.feature".parse::<Selector>(),
            Ok(Selector { path: "a/b.feature".into(), lines: vec![] }),
        );
        assert_eq!(
            r"C:\b.feature:3".parse::<Selector>(),
            Ok(Selector { path: r"C:\b.feature".into(), lines: vec![3] }),
        );
        assert!(":3".parse::<Selector>().is_err());
        assert!("".parse::<Selector>().is_err());
    }
}
