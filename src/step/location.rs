// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Source [`Location`] of step and hook definitions.

use derive_more::with_trait::{Debug, Display};
use serde::Serialize;

/// Location of a step or hook definition, usually captured with the
/// [`location!`] macro at the registration site.
///
/// [`location!`]: crate::location
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[display("{path}:{line}:{column}")]
pub struct Location {
    /// Path to the file of the definition.
    pub path: &'static str,

    /// Line of the definition.
    pub line: u32,

    /// Column of the definition.
    pub column: u32,
}

impl Location {
    /// Creates a new [`Location`].
    #[must_use]
    pub const fn new(path: &'static str, line: u32, column: u32) -> Self {
        Self { path, line, column }
    }

    /// File name without its directories.
    #[must_use]
    pub fn filename(&self) -> &'static str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(self.path)
    }

    /// Short `filename:line:column` representation.
    #[must_use]
    pub fn short(&self) -> String {
        format!("{}:{}:{}", self.filename(), self.line, self.column)
    }
}

/// Captures the [`Location`] of the macro invocation.
#[macro_export]
macro_rules! location {
    () => {
        $crate::step::Location::new(
            ::std::file!(),
            ::std::line!(),
            ::std::column!(),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_full_path() {
        let loc = Location::new("tests/steps/login.rs", 42, 10);
        assert_eq!(loc.to_string(), "tests/steps/login.rs:42:10");
    }

    #[test]
    fn shortens_unix_and_windows_paths() {
        assert_eq!(Location::new("src/step/test.rs", 1, 2).short(), "test.rs:1:2");
        assert_eq!(Location::new("src\\step\\test.rs", 1, 1).filename(), "test.rs");
        assert_eq!(Location::new("test.rs", 1, 1).filename(), "test.rs");
    }

    #[test]
    fn macro_captures_this_file() {
        let loc = crate::location!();
        assert!(loc.path.ends_with("location.rs"), "{loc}");
        assert!(loc.line > 0);
    }

    #[test]
    fn orders_by_path_then_line_then_column() {
        let a = Location::new("a.rs", 1, 1);
        assert!(a < Location::new("b.rs", 1, 1));
        assert!(a < Location::new("a.rs", 2, 1));
        assert!(a < Location::new("a.rs", 1, 2));
    }
}
