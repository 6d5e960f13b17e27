//! Partition ownership and the substrate that runs partitions.

use std::ops::Range;

use rayon::prelude::*;

/// Identifiers of a population of `population` owned by `partition`.
///
/// Partitions own contiguous ranges `[n*p/P, n*(p+1)/P)`, which together
/// cover `0..population` exactly once.
#[expect(
    clippy::integer_division,
    reason = "Truncating division places partition boundaries."
)]
pub(crate) fn owned_range(population: u64, partition: usize, partition_count: usize) -> Range<u64> {
    let bound = |index: usize| {
        let scaled = u128::from(population) * index as u128 / partition_count.max(1) as u128;
        // `scaled <= population` because `index <= partition_count`.
        u64::try_from(scaled).unwrap_or(population)
    };
    bound(partition)..bound(partition + 1)
}

/// Runs one task per partition and collects the results in partition order.
///
/// This is the contract a distributed substrate has to satisfy: partitions
/// are independent, so they may run anywhere and in any order.
pub trait PartitionExecutor {
    /// Applies `task` to every index in `0..partitions`.
    fn execute<T, F>(&self, partitions: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync;
}

/// Runs partitions in parallel on the current rayon pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct RayonExecutor;

impl PartitionExecutor for RayonExecutor {
    fn execute<T, F>(&self, partitions: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..partitions).into_par_iter().map(task).collect()
    }
}

/// Runs partitions one after another on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialExecutor;

impl PartitionExecutor for SequentialExecutor {
    fn execute<T, F>(&self, partitions: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..partitions).map(task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::suite_proptest_config;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 3, vec![0..3, 3..6, 6..10])]
    #[case(2, 4, vec![0..0, 0..1, 1..1, 1..2])]
    #[case(0, 2, vec![0..0, 0..0])]
    #[case(5, 1, vec![0..5])]
    fn ranges_are_contiguous_and_balanced(
        #[case] population: u64,
        #[case] partitions: usize,
        #[case] expected: Vec<Range<u64>>,
    ) {
        let ranges: Vec<_> = (0..partitions)
            .map(|p| owned_range(population, p, partitions))
            .collect();
        assert_eq!(ranges, expected);
    }

    #[test]
    fn executors_preserve_partition_order() {
        let squares = |p: usize| p * p;
        assert_eq!(RayonExecutor.execute(5, squares), [0, 1, 4, 9, 16]);
        assert_eq!(SequentialExecutor.execute(5, squares), [0, 1, 4, 9, 16]);
    }

    proptest! {
        #![proptest_config(suite_proptest_config(256))]

        #[test]
        fn ranges_cover_the_population_exactly_once(
            population in 0_u64..100_000,
            partitions in 1_usize..64,
        ) {
            let mut next = 0;
            for partition in 0..partitions {
                let range = owned_range(population, partition, partitions);
                prop_assert_eq!(range.start, next);
                prop_assert!(range.end >= range.start);
                next = range.end;
            }
            prop_assert_eq!(next, population);
        }
    }
}
