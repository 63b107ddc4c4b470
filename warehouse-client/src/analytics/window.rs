//! Partition-then-scan primitives shared by the reports.
//!
//! Every windowed report follows the same shape: group rows by a partition
//! key, order each partition, then walk it once with an accumulator.

use std::collections::BTreeMap;

/// Sum `value` over rows sharing `key`. Keys come back in ascending order.
pub fn sum_by<T, K, F, V>(rows: &[T], key: F, value: V) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&T) -> K,
    V: Fn(&T) -> f64,
{
    let mut sums = BTreeMap::new();
    for row in rows {
        *sums.entry(key(row)).or_insert(0.0) += value(row);
    }
    sums
}

/// Group items by partition key, keeping encounter order inside a partition.
pub fn partition_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> BTreeMap<K, Vec<T>>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut partitions: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for item in items {
        partitions.entry(key(&item)).or_default().push(item);
    }
    partitions
}

/// Mean over the current value and up to `width - 1` preceding values.
///
/// At the head of the sequence fewer values are available and the mean is
/// taken over those alone. Each frame is summed afresh so a large value
/// leaving the window does not linger as rounding error. `width` must be
/// non-zero.
pub fn trailing_means(values: &[f64], width: usize) -> Vec<f64> {
    debug_assert!(width > 0);
    (0..values.len())
        .map(|i| {
            let frame = &values[(i + 1).saturating_sub(width)..=i];
            frame.iter().sum::<f64>() / frame.len() as f64
        })
        .collect()
}

/// Competition ranks (1, 1, 3) for values already sorted best-first.
pub fn competition_ranks(values: &[f64]) -> Vec<i64> {
    let mut ranks = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        let rank = if i > 0 && values[i - 1] == *v {
            ranks[i - 1]
        } else {
            i as i64 + 1
        };
        ranks.push(rank);
    }
    ranks
}

/// Dense ranks (1, 1, 2) for values already sorted best-first.
pub fn dense_ranks(values: &[f64]) -> Vec<i64> {
    let mut ranks = Vec::with_capacity(values.len());
    let mut current = 0;
    for (i, v) in values.iter().enumerate() {
        if i == 0 || values[i - 1] != *v {
            current += 1;
        }
        ranks.push(current);
    }
    ranks
}

/// Running sum where equal neighbouring values (peers) all receive the sum
/// through the end of their peer group.
pub fn peer_running_sums(values: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    let mut sum = 0.0;
    let mut start = 0;
    while start < values.len() {
        let mut end = start;
        while end < values.len() && values[end] == values[start] {
            sum += values[end];
            end += 1;
        }
        for slot in &mut out[start..end] {
            *slot = sum;
        }
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_means_shrink_at_partition_head() {
        assert_eq!(trailing_means(&[10.0, 20.0, 30.0], 3), vec![10.0, 15.0, 20.0]);
        assert_eq!(
            trailing_means(&[10.0, 20.0, 30.0, 40.0], 2),
            vec![10.0, 15.0, 25.0, 35.0]
        );
        assert!(trailing_means(&[], 5).is_empty());
    }

    #[test]
    fn large_value_leaves_frame_without_residue() {
        assert_eq!(trailing_means(&[1e17, 1.0, 1.0], 2), vec![1e17, 5e16, 1.0]);
    }

    #[test]
    fn competition_ranks_skip_after_ties() {
        assert_eq!(competition_ranks(&[9.0, 7.0, 7.0, 3.0]), vec![1, 2, 2, 4]);
    }

    #[test]
    fn dense_ranks_do_not_skip() {
        assert_eq!(dense_ranks(&[9.0, 7.0, 7.0, 3.0]), vec![1, 2, 2, 3]);
    }

    #[test]
    fn peers_share_running_sum() {
        assert_eq!(
            peer_running_sums(&[5.0, 3.0, 3.0, 1.0]),
            vec![5.0, 11.0, 11.0, 12.0]
        );
    }

    #[test]
    fn partition_keeps_encounter_order() {
        let parts = partition_by(vec![("b", 1), ("a", 2), ("b", 3)], |(k, _)| *k);
        assert_eq!(parts["a"], vec![("a", 2)]);
        assert_eq!(parts["b"], vec![("b", 1), ("b", 3)]);
    }
}
