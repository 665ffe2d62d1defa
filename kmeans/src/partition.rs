//! Range-partitioned fork-join primitives
//!
//! Both helpers split a slice into at most `workers` contiguous ranges and run
//! each range on its own task inside the given pool. Every call joins all of
//! its tasks before returning, so consecutive phases never overlap.

use std::sync::Mutex;

use rayon::{ThreadPool, prelude::*};

use crate::error::{KMeansError, Result};

/// Length of each range when `len` items are shared by `workers` workers
pub fn chunk_len(len: usize, workers: usize) -> usize {
    len.div_ceil(workers.max(1)).max(1)
}

/// Associative reduction with private per-worker accumulators
///
/// Every worker folds its range into a fresh accumulator from `identity`, then
/// adds that accumulator into a shared target inside a critical section. The
/// contended part of the work is therefore `O(workers)` combines rather than
/// one write per item.
///
/// # Arguments
/// * `pool` - Worker pool the ranges are scheduled on
/// * `items` - Read-only input, split into contiguous ranges
/// * `workers` - Number of ranges
/// * `identity` - Builds an empty accumulator (may fail to allocate)
/// * `fold` - Adds one item, given its global index, into an accumulator
/// * `combine` - Adds a finished accumulator into the shared target
///
/// # Returns
/// * The combined accumulator. If any worker fails, the whole phase fails and
///   the partially combined target is dropped.
pub fn reduce_partitioned<T, A, I, F, C>(
    pool: &ThreadPool,
    items: &[T],
    workers: usize,
    identity: I,
    fold: F,
    combine: C,
) -> Result<A>
where
    T: Sync,
    A: Send,
    I: Fn() -> Result<A> + Sync,
    F: Fn(&mut A, usize, &T) -> Result<()> + Sync,
    C: Fn(&mut A, &A) + Sync,
{
    let shared = Mutex::new(identity()?);
    let size = chunk_len(items.len(), workers);

    pool.install(|| {
        items
            .par_chunks(size)
            .enumerate()
            .try_for_each(|(chunk_id, chunk)| -> Result<()> {
                let offset = chunk_id * size;
                let mut local = identity()?;
                for (i, item) in chunk.iter().enumerate() {
                    fold(&mut local, offset + i, item)?;
                }
                let mut target = shared.lock().map_err(|_| KMeansError::WorkerPoisoned)?;
                combine(&mut *target, &local);
                Ok(())
            })
    })?;

    shared.into_inner().map_err(|_| KMeansError::WorkerPoisoned)
}

/// Disjoint mutable ranges, one per worker, with a summed result
///
/// `op` receives the global index of the first item and exclusive access to
/// its range. The per-range counts are added together as a reduction.
pub fn map_partitioned_mut<T, F>(
    pool: &ThreadPool,
    items: &mut [T],
    workers: usize,
    op: F,
) -> Result<usize>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<usize> + Sync,
{
    let size = chunk_len(items.len(), workers);

    pool.install(|| {
        items
            .par_chunks_mut(size)
            .enumerate()
            .map(|(chunk_id, chunk)| op(chunk_id * size, chunk))
            .try_reduce(|| 0, |a, b| Ok(a + b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::ThreadPoolBuilder;

    fn pool(n: usize) -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(n).build().unwrap()
    }

    #[test]
    fn chunk_len_covers_everything() {
        assert_eq!(chunk_len(10, 4), 3);
        assert_eq!(chunk_len(8, 4), 2);
        assert_eq!(chunk_len(3, 8), 1);
        assert_eq!(chunk_len(0, 4), 1);
        assert_eq!(chunk_len(5, 0), 5);
    }

    #[test]
    fn reduction_sees_every_item_once() {
        let items: Vec<usize> = (0..1001).collect();
        for workers in [1, 2, 4, 8] {
            let p = pool(workers);
            let (sum, seen) = reduce_partitioned(
                &p,
                &items,
                workers,
                || Ok((0usize, 0usize)),
                |acc, index, item| {
                    assert_eq!(index, *item);
                    acc.0 += item;
                    acc.1 += 1;
                    Ok(())
                },
                |target, local| {
                    target.0 += local.0;
                    target.1 += local.1;
                },
            )
            .unwrap();
            assert_eq!(sum, 1000 * 1001 / 2);
            assert_eq!(seen, 1001);
        }
    }

    #[test]
    fn failing_worker_aborts_reduction() {
        let items: Vec<usize> = (0..64).collect();
        let p = pool(4);
        let result = reduce_partitioned(
            &p,
            &items,
            4,
            || Ok(0usize),
            |acc, _, item| {
                if *item == 40 {
                    return Err(KMeansError::InvalidLabel { index: 40, group: 9, k: 2 });
                }
                *acc += 1;
                Ok(())
            },
            |target, local| *target += local,
        );
        assert!(matches!(result, Err(KMeansError::InvalidLabel { index: 40, .. })));
    }

    #[test]
    fn mutable_ranges_are_disjoint() {
        let mut items = vec![0usize; 37];
        let p = pool(4);
        let touched = map_partitioned_mut(&p, &mut items, 4, |offset, chunk| {
            for (i, item) in chunk.iter_mut().enumerate() {
                *item += offset + i;
            }
            Ok(chunk.len())
        })
        .unwrap();
        assert_eq!(touched, 37);
        assert!(items.iter().enumerate().all(|(i, v)| i == *v));
    }
}
