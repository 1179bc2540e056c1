// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tabular step arguments.

use std::collections::HashMap;

use serde::Serialize;

/// Data table attached to a [`Step`].
///
/// # Example
///
/// ```rust
/// # use stepwise::DataTable;
/// #
/// let table = DataTable::from(vec![
///     vec!["name", "age"],
///     vec!["Alice", "30"],
///     vec!["Bob", "25"],
/// ]);
///
/// assert_eq!(table.hashes()[1]["age"], "25");
/// assert_eq!(table.column("name"), Some(vec!["Alice", "Bob"]));
/// ```
///
/// [`Step`]: crate::Step
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DataTable {
    rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Creates a new [`DataTable`] out of its `rows`, header row included.
    #[must_use]
    pub const fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// All rows, header row included.
    #[must_use]
    pub fn raw(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Rows without the header row.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Header row, if any.
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows without the header row, keyed by the header cells.
    #[must_use]
    pub fn hashes(&self) -> Vec<HashMap<String, String>> {
        let Some(header) = self.header() else {
            return Vec::new();
        };
        self.rows()
            .iter()
            .map(|row| header.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    /// Two-column table as a map from the first column to the second one.
    ///
    /// [`None`] if any row doesn't have exactly two cells.
    #[must_use]
    pub fn rows_hash(&self) -> Option<HashMap<String, String>> {
        self.rows
            .iter()
            .map(|row| match row.as_slice() {
                [k, v] => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    /// Table with rows and columns swapped. Missing cells of ragged rows
    /// become empty.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let width = self.rows.iter().map(Vec::len).max().unwrap_or_default();
        Self::new(
            (0..width)
                .map(|col| {
                    self.rows
                        .iter()
                        .map(|row| row.get(col).cloned().unwrap_or_default())
                        .collect()
                })
                .collect(),
        )
    }

    /// Cells of the column with the `name` in the header, header excluded.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.header()?.iter().position(|h| h == name)?;
        Some(
            self.rows()
                .iter()
                .map(|row| row.get(idx).map_or("", String::as_str))
                .collect(),
        )
    }

    /// Whether the table has no rows at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<S: Into<String>> From<Vec<Vec<S>>> for DataTable {
    fn from(rows: Vec<Vec<S>>) -> Self {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> DataTable {
        DataTable::from(vec![
            vec!["name", "age"],
            vec!["Alice", "30"],
            vec!["Bob", "25"],
        ])
    }

    #[test]
    fn rows_skip_header() {
        let table = people();

        assert_eq!(table.raw().len(), 3);
        assert_eq!(table.rows(), &[vec!["Alice", "30"], vec!["Bob", "25"]]);
        assert!(DataTable::default().rows().is_empty());
    }

    #[test]
    fn hashes_use_header() {
        let hashes = people().hashes();

        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0]["name"], "Alice");
        assert_eq!(hashes[1]["age"], "25");
    }

    #[test]
    fn rows_hash_needs_two_columns() {
        let settings =
            DataTable::from(vec![vec!["timeout", "30"], vec!["retries", "3"]]);
        assert_eq!(settings.rows_hash().unwrap()["retries"], "3");

        let ragged = DataTable::from(vec![vec!["a", "b", "c"]]);
        assert_eq!(ragged.rows_hash(), None);
    }

    #[test]
    fn transposes() {
        let t = people().transpose();

        assert_eq!(t.raw(), &[vec!["name", "Alice", "Bob"], vec!["age", "30", "25"]]);
        assert_eq!(t.transpose(), people());
    }

    #[test]
    fn column_by_header() {
        assert_eq!(people().column("age"), Some(vec!["30", "25"]));
        assert_eq!(people().column("email"), None);
    }
}
