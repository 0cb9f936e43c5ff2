// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Summary`] [`Listener`] printing the totals of a run.

use std::{borrow::Cow, io};

use async_trait::async_trait;
use itertools::Itertools as _;
use smart_default::SmartDefault;

use crate::{
    broadcaster::Listener,
    event::{Event, Payload},
    result::{FeaturesResult, Stats},
    status::Status,
};

use super::out::{Coloring, Styles, WriteStrExt as _};

/// CLI options of a [`Summary`] [`Listener`].
#[derive(Clone, Copy, Debug, SmartDefault, clap::Args)]
#[group(skip)]
pub struct Cli {
    /// Coloring policy for a console output.
    #[arg(
        long,
        value_name = "auto|always|never",
        default_value = "auto",
        global = true
    )]
    #[default(Coloring::Auto)]
    pub color: Coloring,
}

/// [`Listener`] printing a `[Summary]` block once it hears the
/// [`FeaturesResult`] of a run.
#[derive(Debug)]
pub struct Summary<Out: io::Write = io::Stdout> {
    output: Out,
    styles: Styles,
}

impl Summary {
    /// Creates a new [`Summary`] printing to [`io::Stdout`].
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<Out: io::Write> Summary<Out> {
    /// Creates a new [`Summary`] printing to the given `output`.
    #[must_use]
    pub fn new(output: Out) -> Self {
        Self { output, styles: Styles::new() }
    }

    /// Applies the given [`Cli`] options.
    #[must_use]
    pub fn with_cli(self, cli: Cli) -> Self {
        self.with_coloring(cli.color)
    }

    /// Applies the given [`Coloring`] policy.
    #[must_use]
    pub fn with_coloring(mut self, color: Coloring) -> Self {
        self.styles.apply_coloring(color);
        self
    }

    /// Returns the `output` this [`Summary`] prints to.
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }

    /// Renders the `[Summary]` block of the given [`FeaturesResult`].
    #[must_use]
    pub fn render(&self, result: &FeaturesResult) -> String {
        let styles = &self.styles;
        let features = self.maybe_plural("feature", result.features);
        let scenarios =
            self.maybe_plural("scenario", result.scenarios.total());
        let scenarios_stats = self.format_stats(&result.scenarios);
        let retries = if result.retried > 0 {
            let retries = format!(
                " with {} retr{}",
                result.retried,
                if result.retried == 1 { "y" } else { "ies" },
            );
            styles.bold(styles.retry(retries))
        } else {
            "".into()
        };
        let steps = self.maybe_plural("step", result.steps.total());
        let steps_stats = self.format_stats(&result.steps);

        format!(
            "{summary}\n{features}\n{scenarios}{scenarios_stats}{retries}\n\
             {steps}{steps_stats}",
            summary = styles.bold(styles.header("[Summary]")),
        )
    }

    fn format_stats(&self, stats: &Stats) -> Cow<'static, str> {
        let styles = &self.styles;
        let formatted = Status::ALL
            .into_iter()
            .filter(|&status| stats.get(status) > 0)
            .map(|status| {
                let s = format!("{} {status}", stats.get(status));
                styles.bold(match status {
                    Status::Passed => styles.ok(s),
                    Status::Skipped => styles.skipped(s),
                    Status::Undefined | Status::Pending => styles.pending(s),
                    Status::Failed | Status::Ambiguous => styles.err(s),
                })
            })
            .join(&styles.bold(", "));

        if formatted.is_empty() {
            "".into()
        } else {
            format!(" {}{formatted}{}", styles.bold("("), styles.bold(")"))
                .into()
        }
    }

    fn maybe_plural(
        &self,
        singular: &'static str,
        num: usize,
    ) -> Cow<'static, str> {
        self.styles.bold(format!(
            "{num} {singular}{}",
            if num == 1 { "" } else { "s" },
        ))
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Listener for Summary<Out> {
    async fn hear(&mut self, event: &Event) {
        if let Payload::FeaturesResult(result) = &event.payload {
            let summary = self.render(result);
            if let Err(e) = self.output.write_line(summary) {
                tracing::error!("failed to write summary: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        result::ScenarioResult,
        step::TestStep,
        Pickle, PickleStep, StepResult,
    };

    use super::*;

    fn scenario(status: Status, will_be_retried: bool) -> ScenarioResult {
        let step = TestStep::Pickle(Arc::new(PickleStep::new("a step")));
        let mut result = ScenarioResult::new(Arc::new(Pickle::new("p")));
        result.witness_step_result(&match status {
            Status::Failed => StepResult::failed(
                step,
                anyhow::anyhow!("boom").into(),
            ),
            Status::Skipped => StepResult::skipped(step),
            _ => StepResult::successful(step, Default::default()),
        });
        result.will_be_retried = will_be_retried;
        result
    }

    fn never() -> Summary<Vec<u8>> {
        Summary::new(Vec::new()).with_coloring(Coloring::Never)
    }

    #[tokio::test]
    async fn prints_on_features_result_only() {
        let mut result = FeaturesResult::new(false);
        result.witness_feature();
        result.witness_scenario_result(&scenario(Status::Failed, true));
        result.witness_scenario_result(&scenario(Status::Passed, false));
        result.witness_scenario_result(&scenario(Status::Skipped, false));

        let mut summary = never();
        summary
            .hear(&Event::new(Payload::Features(Vec::new().into())))
            .await;
        assert!(summary.output().is_empty());

        summary
            .hear(&Event::new(Payload::FeaturesResult(Arc::new(result))))
            .await;
        assert_eq!(
            String::from_utf8_lossy(summary.output()),
            "[Summary]\n\
             1 feature\n\
             2 scenarios (1 passed, 1 skipped) with 1 retry\n\
             2 steps (1 passed, 1 skipped)\n",
        );
    }

    #[test]
    fn renders_empty_run() {
        assert_eq!(
            never().render(&FeaturesResult::new(true)),
            "[Summary]\n0 features\n0 scenarios\n0 steps",
        );
    }
}
