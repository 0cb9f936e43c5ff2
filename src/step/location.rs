// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Source location of a step definition or hook registration.

use std::panic;

use derive_more::with_trait::Display;

/// Location a step definition or hook was registered at.
///
/// Captured with `#[track_caller]` by the registration methods of a
/// [`Library`].
///
/// [`Library`]: crate::Library
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{path}:{line}:{column}")]
pub struct Location {
    /// Path to the file.
    pub path: &'static str,

    /// Line in the file.
    pub line: u32,

    /// Column in the line.
    pub column: u32,
}

impl Location {
    /// Creates a new [`Location`] with the given path, line, and column.
    #[must_use]
    pub const fn new(path: &'static str, line: u32, column: u32) -> Self {
        Self { path, line, column }
    }

    /// Returns the [`Location`] of the caller of the `#[track_caller]`
    /// function this is invoked in.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let loc = panic::Location::caller();
        Self::new(loc.file(), loc.line(), loc.column())
    }

    /// Returns the file name part of the [`Location::path`].
    #[must_use]
    pub fn filename(&self) -> &'static str {
        self.path
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(self.path)
    }

    /// Returns a short `filename:line:column` representation.
    #[must_use]
    pub fn short(&self) -> String {
        format!("{}:{}:{}", self.filename(), self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_full_path() {
        let location = Location::new("src/test.rs", 42, 10);

        assert_eq!(location.to_string(), "src/test.rs:42:10");
    }

    #[test]
    fn short_uses_filename_only() {
        let unix = Location::new("src/step/test.rs", 42, 10);
        let windows = Location::new("src\\step\\test.rs", 1, 1);

        assert_eq!(unix.short(), "test.rs:42:10");
        assert_eq!(windows.filename(), "test.rs");
        assert_eq!(Location::new("test.rs", 1, 1).filename(), "test.rs");
    }

    #[test]
    fn caller_points_at_call_site() {
        #[track_caller]
        fn register() -> Location {
            Location::caller()
        }

        let expected_line = line!() + 1;
        let location = register();

        assert!(location.path.ends_with("location.rs"));
        assert_eq!(location.line, expected_line);
    }
}
