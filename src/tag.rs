// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Evaluation of [tag expressions][1] against a [`Pickle`]'s tags.
//!
//! [`Pickle`]: crate::Pickle
//! [1]: https://cucumber.io/docs/cucumber/api#tag-expressions

use gherkin::tagexpr::TagOperation;
use sealed::sealed;

/// Extension of a [`TagOperation`] allowing to evaluate it.
#[sealed]
pub trait Ext {
    /// Evaluates this [`TagOperation`] for the given `tags`.
    ///
    /// A leading `@` is insignificant on both sides, so `@wip` and `wip`
    /// denote the same tag.
    #[must_use]
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone;
}

#[sealed]
impl Ext for TagOperation {
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        match self {
            Self::And(l, r) => l.eval(tags.clone()) & r.eval(tags),
            Self::Or(l, r) => l.eval(tags.clone()) | r.eval(tags),
            Self::Not(t) => !t.eval(tags),
            Self::Tag(t) => {
                let t = normalize(t);
                tags.into_iter().any(|tag| normalize(tag.as_ref()) == t)
            }
        }
    }
}

/// Strips the leading `@` of a tag, if any.
#[must_use]
pub fn normalize(tag: &str) -> &str {
    tag.strip_prefix('@').unwrap_or(tag)
}

/// Evaluates an optional [`TagOperation`], treating its absence as a match.
#[must_use]
pub fn matches<I, S>(op: Option<&TagOperation>, tags: I) -> bool
where
    S: AsRef<str>,
    I: IntoIterator<Item = S> + Clone,
{
    op.map_or(true, |op| op.eval(tags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(s: &str) -> TagOperation {
        s.parse().unwrap()
    }

    #[test]
    fn and_requires_both() {
        let op = op("@a and @b");
        assert!(op.eval(["@a", "@b"]));
        assert!(!op.eval(["@a"]));
        assert!(!op.eval(["@b"]));
        assert!(!op.eval(Vec::<String>::new()));
    }

    #[test]
    fn or_not_and_parentheses() {
        let op = op("(@a or @b) and not @c");
        assert!(op.eval(["@a"]));
        assert!(op.eval(["@b", "@d"]));
        assert!(!op.eval(["@a", "@c"]));
        assert!(!op.eval(["@d"]));
    }

    #[test]
    fn at_sign_is_insignificant() {
        assert!(op("@wip").eval(["wip"]));
        assert_eq!(normalize("@wip"), "wip");
        assert_eq!(normalize("wip"), "wip");
    }

    #[test]
    fn absent_expression_matches() {
        assert!(matches(None, Vec::<String>::new()));
        assert!(!matches(Some(&op("@a")), ["@b"]));
    }
}
