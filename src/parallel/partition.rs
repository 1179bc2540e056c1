// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Deterministic partitioning of work across workers.

use std::iter;

/// Splits the `units` across `workers` round-robin: unit `i` lands in
/// partition `i % workers`.
///
/// Always returns `workers` partitions (at least one), some possibly empty.
/// Partitions are disjoint, their union is exactly the `units`, and every
/// partition keeps the input order.
#[must_use]
pub fn partition<T>(units: impl IntoIterator<Item = T>, workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    let mut partitions = iter::repeat_with(Vec::new).take(workers).collect::<Vec<_>>();
    for (i, unit) in units.into_iter().enumerate() {
        if let Some(partition) = partitions.get_mut(i % workers) {
            partition.push(unit);
        }
    }
    partitions
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn round_robin() {
        assert_eq!(
            partition(1..=5, 2),
            vec![vec![1, 3, 5], vec![2, 4]],
        );
        assert_eq!(
            partition(Vec::<u8>::new(), 3),
            vec![Vec::<u8>::new(), Vec::new(), Vec::new()],
        );
        assert_eq!(partition([1, 2], 0), vec![vec![1, 2]]);
    }

    proptest! {
        #[test]
        fn partitions_are_total_and_disjoint(n in 0_usize..200, workers in 1_usize..16) {
            let parts = partition(0..n, workers);
            prop_assert_eq!(parts.len(), workers);

            let mut seen = parts.concat();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }
    }
}
