// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Flattened, ready-to-run [`Scenario`]s ("pickles").
//!
//! A [`Pickle`] is a [`Scenario`] with its [`Background`] steps prepended, its
//! [`Examples`] expanded and its tags inherited, so the execution engine never
//! needs to look at the [Gherkin] syntax tree again.
//!
//! [`Background`]: gherkin::Background
//! [`Examples`]: gherkin::Examples
//! [`Scenario`]: gherkin::Scenario
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use derive_more::with_trait::{Display, Error, From};
use lazy_regex::regex;
use once_cell::sync::Lazy;
use regex::Regex;

/// Unique ID of a [`Pickle`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PickleId(pub u64);

impl PickleId {
    /// Creates a new unique [`PickleId`].
    #[must_use]
    pub fn new() -> Self {
        /// [`AtomicU64`] ID.
        static ID: AtomicU64 = AtomicU64::new(0);

        Self(ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for PickleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Argument attached to a [`PickleStep`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Argument {
    /// [Doc string][1].
    ///
    /// [1]: https://cucumber.io/docs/gherkin/reference#doc-strings
    DocString(String),

    /// [Data table][1] rows.
    ///
    /// [1]: https://cucumber.io/docs/gherkin/reference#data-tables
    DataTable(Vec<Vec<String>>),
}

/// Single executable line of a [`Pickle`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PickleStep {
    /// Keyword the step was written with (`Given`, `And`, `*`, ...).
    pub keyword: String,

    /// Text being matched against step definitions.
    pub text: String,

    /// Optional doc string or data table.
    pub argument: Option<Argument>,

    /// Position in the source file.
    pub position: gherkin::LineCol,
}

impl PickleStep {
    /// Creates a new [`PickleStep`] with the given `text` and no argument.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            keyword: "*".to_owned(),
            text: text.into(),
            argument: None,
            position: gherkin::LineCol { line: 0, col: 0 },
        }
    }

    /// Attaches the given [`Argument`] to this [`PickleStep`].
    #[must_use]
    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.argument = Some(argument);
        self
    }

    /// Sets the source line of this [`PickleStep`].
    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.position.line = line;
        self
    }

    fn from_gherkin<F>(
        step: &gherkin::Step,
        mut substitute: F,
    ) -> Result<Self, ExpandExamplesError>
    where
        F: FnMut(&str, gherkin::LineCol) -> Result<String, ExpandExamplesError>,
    {
        let argument = if let Some(doc) = &step.docstring {
            Some(Argument::DocString(substitute(doc, step.position)?))
        } else if let Some(table) = &step.table {
            let rows = table
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| substitute(cell, step.position))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(Argument::DataTable(rows))
        } else {
            None
        };

        Ok(Self {
            keyword: step.keyword.trim().to_owned(),
            text: substitute(&step.value, step.position)?,
            argument,
            position: step.position,
        })
    }
}

/// Fully resolved [`Scenario`] instance.
///
/// [`Scenario`]: gherkin::Scenario
#[derive(Clone, Debug)]
pub struct Pickle {
    /// Unique ID of this [`Pickle`].
    pub id: PickleId,

    /// Name of the [`Scenario`] (with [`Examples`] values substituted).
    ///
    /// [`Examples`]: gherkin::Examples
    /// [`Scenario`]: gherkin::Scenario
    pub name: String,

    /// Path to the `.feature` file, if known.
    pub uri: Option<PathBuf>,

    /// Tags inherited from the `Feature`, `Rule`, `Scenario` and `Examples`.
    pub tags: Vec<String>,

    /// Steps to execute, [`Background`] ones first.
    ///
    /// [`Background`]: gherkin::Background
    pub steps: Vec<Arc<PickleStep>>,

    /// Position of the [`Scenario`] keyword.
    ///
    /// [`Scenario`]: gherkin::Scenario
    pub position: gherkin::LineCol,

    /// Source lines identifying this [`Pickle`]: the [`Scenario`] line, and
    /// the [`Examples`] row line for an expanded outline.
    ///
    /// [`Examples`]: gherkin::Examples
    /// [`Scenario`]: gherkin::Scenario
    pub lines: Vec<usize>,
}

impl Pickle {
    /// Creates a new step-less, tag-less [`Pickle`] with the given `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PickleId::new(),
            name: name.into(),
            uri: None,
            tags: Vec::new(),
            steps: Vec::new(),
            position: gherkin::LineCol { line: 0, col: 0 },
            lines: Vec::new(),
        }
    }

    /// Appends a [`PickleStep`] with the given `text`.
    #[must_use]
    pub fn step(self, text: impl Into<String>) -> Self {
        self.with_step(PickleStep::new(text))
    }

    /// Appends the given [`PickleStep`].
    #[must_use]
    pub fn with_step(mut self, step: PickleStep) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Adds the given `tags`.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Places this [`Pickle`] at the given `line` of the given file.
    #[must_use]
    pub fn located(mut self, uri: impl Into<PathBuf>, line: usize) -> Self {
        self.uri = Some(uri.into());
        self.position.line = line;
        self.lines = vec![line];
        self
    }
}

/// [`Pickle`]s compiled out of a single [`gherkin::Feature`].
#[derive(Clone, Debug)]
pub struct Feature {
    /// Name of the [`gherkin::Feature`].
    pub name: String,

    /// Path to the `.feature` file, if known.
    pub uri: Option<PathBuf>,

    /// Tags of the [`gherkin::Feature`] itself.
    pub tags: Vec<String>,

    /// Compiled [`Pickle`]s, in declaration order.
    pub pickles: Vec<Arc<Pickle>>,
}

impl Feature {
    /// Creates a new empty [`Feature`] with the given `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: None,
            tags: Vec::new(),
            pickles: Vec::new(),
        }
    }

    /// Appends the given [`Pickle`].
    #[must_use]
    pub fn with_pickle(mut self, pickle: Pickle) -> Self {
        self.pickles.push(Arc::new(pickle));
        self
    }

    /// Parses a `.feature` file and compiles it.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or parsed, or its [`Examples`] cannot be
    /// expanded.
    ///
    /// [`Examples`]: gherkin::Examples
    pub fn parse_path(path: impl AsRef<Path>) -> Result<Self, CompileError> {
        let feature =
            gherkin::Feature::parse_path(path, gherkin::GherkinEnv::default())?;
        Ok(Self::from_gherkin(&feature)?)
    }

    /// Compiles the given [`gherkin::Feature`] into [`Pickle`]s.
    ///
    /// # Errors
    ///
    /// If an [`Examples`] placeholder has no matching column.
    /// See [`ExpandExamplesError`] for details.
    ///
    /// [`Examples`]: gherkin::Examples
    pub fn from_gherkin(
        feature: &gherkin::Feature,
    ) -> Result<Self, ExpandExamplesError> {
        let path = feature.path.as_ref();
        let background = feature
            .background
            .iter()
            .flat_map(|b| &b.steps)
            .collect::<Vec<_>>();

        let mut pickles = Vec::new();
        for scenario in &feature.scenarios {
            pickles.extend(compile_scenario(
                scenario,
                &feature.tags,
                &background,
                path,
            )?);
        }
        for rule in &feature.rules {
            let tags = feature
                .tags
                .iter()
                .chain(&rule.tags)
                .cloned()
                .collect::<Vec<_>>();
            let background = background
                .iter()
                .copied()
                .chain(rule.background.iter().flat_map(|b| &b.steps))
                .collect::<Vec<_>>();
            for scenario in &rule.scenarios {
                pickles.extend(compile_scenario(
                    scenario,
                    &tags,
                    &background,
                    path,
                )?);
            }
        }

        Ok(Self {
            name: feature.name.clone(),
            uri: feature.path.clone(),
            tags: feature.tags.clone(),
            pickles: pickles.into_iter().map(Arc::new).collect(),
        })
    }
}

/// Compiles a single [`gherkin::Scenario`], expanding its [`Examples`], if any.
///
/// [`Examples`]: gherkin::Examples
fn compile_scenario(
    scenario: &gherkin::Scenario,
    inherited_tags: &[String],
    background: &[&gherkin::Step],
    path: Option<&PathBuf>,
) -> Result<Vec<Pickle>, ExpandExamplesError> {
    let background = background
        .iter()
        .map(|s| PickleStep::from_gherkin(s, |v, _| Ok(v.to_owned())))
        .map(|s| s.map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;
    let tags = inherited_tags
        .iter()
        .chain(&scenario.tags)
        .cloned()
        .collect::<Vec<_>>();

    if scenario.examples.is_empty() {
        let steps = scenario
            .steps
            .iter()
            .map(|s| PickleStep::from_gherkin(s, |v, _| Ok(v.to_owned())))
            .map(|s| s.map(Arc::new));
        return Ok(vec![Pickle {
            id: PickleId::new(),
            name: scenario.name.clone(),
            uri: path.cloned(),
            tags,
            steps: background
                .into_iter()
                .map(Ok)
                .chain(steps)
                .collect::<Result<_, _>>()?,
            position: scenario.position,
            lines: vec![scenario.position.line],
        }]);
    }

    scenario
        .examples
        .iter()
        .filter_map(|ex| {
            ex.table
                .as_ref()?
                .rows
                .split_first()
                .map(|(header, rows)| (header, rows, ex))
        })
        .flat_map(|(header, rows, example)| {
            rows.iter()
                .enumerate()
                .map(move |(id, row)| (header, id, row, example))
        })
        .map(|(header, id, row, example)| {
            let values = header.iter().zip(row).collect::<Vec<_>>();
            let substitute =
                |s: &str, pos| substitute_placeholders(s, &values, pos, path);

            // Examples keyword, then the header row, then the values.
            let row_line = example.position.line + id + 2;

            let steps = background
                .iter()
                .cloned()
                .map(Ok)
                .chain(scenario.steps.iter().map(|s| {
                    PickleStep::from_gherkin(s, substitute).map(Arc::new)
                }))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Pickle {
                id: PickleId::new(),
                name: substitute(&scenario.name, scenario.position)?,
                uri: path.cloned(),
                tags: tags.iter().chain(&example.tags).cloned().collect(),
                steps,
                position: scenario.position,
                lines: vec![scenario.position.line, row_line],
            })
        })
        .collect()
}

/// Replaces every `<name>` in `s` with the matching [`Examples`] value.
///
/// [`Examples`]: gherkin::Examples
fn substitute_placeholders(
    s: &str,
    values: &[(&String, &String)],
    pos: gherkin::LineCol,
    path: Option<&PathBuf>,
) -> Result<String, ExpandExamplesError> {
    /// [`Regex`] matching placeholders [`Examples`] should expand into.
    ///
    /// [`Examples`]: gherkin::Examples
    static TEMPLATE_REGEX: &Lazy<Regex> = regex!(r"<([^>\s]+)>");

    let mut err = None;
    let replaced = TEMPLATE_REGEX
        .replace_all(s, |cap: &regex::Captures<'_>| {
            let name = cap.get(1).map_or("", |m| m.as_str());
            values
                .iter()
                .find_map(|(k, v)| (k.as_str() == name).then_some(v.as_str()))
                .unwrap_or_else(|| {
                    err = Some(ExpandExamplesError {
                        pos,
                        name: name.to_owned(),
                        path: path.cloned(),
                    });
                    ""
                })
        })
        .into_owned();

    err.map_or(Ok(replaced), Err)
}

/// Error of [`Scenario Outline`][1] expansion encountering an unknown template.
///
/// [1]: https://cucumber.io/docs/gherkin/reference#scenario-outline
#[derive(Clone, Debug, Display, Error)]
#[display(
    "Failed to resolve <{name}> at {}:{}:{}",
    path.as_deref().and_then(Path::to_str).unwrap_or_default(),
    pos.line,
    pos.col,
)]
pub struct ExpandExamplesError {
    /// Position of the unknown template.
    pub pos: gherkin::LineCol,

    /// Name of the unknown template.
    pub name: String,

    /// [`Path`] to the `.feature` file, if present.
    pub path: Option<PathBuf>,
}

/// Error of turning a `.feature` file into a [`Feature`].
#[derive(Debug, Display, Error, From)]
pub enum CompileError {
    /// File couldn't be read or parsed.
    #[display("Failed to parse feature: {_0}")]
    Parse(gherkin::ParseFileError),

    /// [`Examples`] couldn't be expanded.
    ///
    /// [`Examples`]: gherkin::Examples
    #[display("{_0}")]
    Expand(ExpandExamplesError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> gherkin::Feature {
        gherkin::Feature::parse(src, gherkin::GherkinEnv::default()).unwrap()
    }

    #[test]
    fn prepends_background_and_inherits_tags() {
        let feature = parse(
            "@feat\n\
             Feature: Eating\n\
             \n\
             \x20 Background:\n\
             \x20   Given a basket\n\
             \n\
             \x20 @sc\n\
             \x20 Scenario: one\n\
             \x20   When I eat\n",
        );
        let feature = Feature::from_gherkin(&feature).unwrap();

        assert_eq!(feature.pickles.len(), 1);
        let pickle = &feature.pickles[0];
        assert_eq!(pickle.name, "one");
        let texts =
            pickle.steps.iter().map(|s| s.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, ["a basket", "I eat"]);
        assert_eq!(pickle.tags, ["feat", "sc"]);
        assert_eq!(pickle.lines, [8]);
    }

    #[test]
    fn expands_outline_examples() {
        let feature = parse(
            "Feature: Hungry\n\
             \n\
             \x20 Scenario Outline: eating <eat>\n\
             \x20   Given there are <start> cucumbers\n\
             \x20   When I eat <eat> cucumbers\n\
             \n\
             \x20   @ex\n\
             \x20   Examples:\n\
             \x20     | start | eat |\n\
             \x20     |    12 |   5 |\n\
             \x20     |    20 |   4 |\n",
        );
        let feature = Feature::from_gherkin(&feature).unwrap();

        assert_eq!(feature.pickles.len(), 2);
        let first = &feature.pickles[0];
        assert_eq!(first.name, "eating 5");
        assert_eq!(first.steps[0].text, "there are 12 cucumbers");
        assert_eq!(first.tags, ["ex"]);
        assert_eq!(first.lines, [3, 10]);
        assert_eq!(feature.pickles[1].steps[1].text, "I eat 4 cucumbers");
        assert_eq!(feature.pickles[1].lines, [3, 11]);
        assert_ne!(first.id, feature.pickles[1].id);
    }

    #[test]
    fn unknown_placeholder_errors() {
        let feature = parse(
            "Feature: Hungry\n\
             \n\
             \x20 Scenario Outline: eating\n\
             \x20   Given there are <missing> cucumbers\n\
             \n\
             \x20   Examples:\n\
             \x20     | start |\n\
             \x20     |    12 |\n",
        );
        let err = Feature::from_gherkin(&feature).unwrap_err();

        assert_eq!(err.name, "missing");
        assert!(err.to_string().starts_with("Failed to resolve <missing>"));
    }

    #[test]
    fn builder_locates_pickle() {
        let pickle = Pickle::new("p").step("a").located("a.feature", 4);

        assert_eq!(pickle.lines, [4]);
        assert_eq!(pickle.uri.as_deref(), Some(Path::new("a.feature")));
    }
}
