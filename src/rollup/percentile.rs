use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 75th percentile, used for warehouse cost-per-query outliers.
pub fn p75() -> Decimal {
    Decimal::new(75, 2)
}

/// 90th percentile, used for user and AI cost outliers.
pub fn p90() -> Decimal {
    Decimal::new(90, 2)
}

/// Percentile of `values` using linear interpolation between the two nearest
/// ranks of the sorted sample (rank = q * (n - 1)).
///
/// `q` is clamped to `[0, 1]`. Returns `None` for an empty sample.
pub fn percentile(values: &[Decimal], q: Decimal) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort();

    let q = q.max(Decimal::ZERO).min(Decimal::ONE);
    let rank = q * Decimal::from(sorted.len() - 1);
    let lower_rank = rank.floor();
    let fraction = rank - lower_rank;

    let lower = lower_rank.to_usize().unwrap_or(0).min(sorted.len() - 1);
    let upper = (lower + 1).min(sorted.len() - 1);

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Items whose key strictly exceeds the `q` percentile of all keys.
///
/// The cutoff is computed from the full population passed in, every call.
pub fn above_percentile<T, F>(items: &[T], q: Decimal, key: F) -> Vec<&T>
where
    F: Fn(&T) -> Decimal,
{
    let keys: Vec<Decimal> = items.iter().map(&key).collect();
    let Some(cutoff) = percentile(&keys, q) else {
        return Vec::new();
    };

    items.iter().filter(|item| key(item) > cutoff).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimals(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_p90_of_one_to_ten() {
        let values = decimals(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(percentile(&values, p90()), Some(Decimal::new(91, 1)));
    }

    #[test]
    fn test_p90_flags_only_top_value() {
        let values = decimals(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let flagged = above_percentile(&values, p90(), |v| *v);
        assert_eq!(flagged, vec![&Decimal::from(10)]);
    }

    #[test]
    fn test_p75_interpolates_between_ranks() {
        // rank = 0.75 * 4 = 3 -> exactly the fourth sorted value
        let values = decimals(&[40, 10, 30, 20, 50]);
        assert_eq!(percentile(&values, p75()), Some(Decimal::from(40)));

        // rank = 0.75 * 3 = 2.25 -> 30 + (40 - 30) * 0.25
        let values = decimals(&[10, 20, 30, 40]);
        assert_eq!(percentile(&values, p75()), Some(Decimal::new(325, 1)));
    }

    #[test]
    fn test_unsorted_input_gives_same_cutoff() {
        let sorted = decimals(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let shuffled = decimals(&[7, 3, 10, 1, 9, 2, 8, 4, 6, 5]);
        assert_eq!(percentile(&sorted, p90()), percentile(&shuffled, p90()));
    }

    #[test]
    fn test_empty_and_single_samples() {
        assert_eq!(percentile(&[], p90()), None);
        assert!(above_percentile(&Vec::<Decimal>::new(), p90(), |v| *v).is_empty());

        let single = decimals(&[4]);
        assert_eq!(percentile(&single, p90()), Some(Decimal::from(4)));
        // nothing strictly exceeds its own value
        assert!(above_percentile(&single, p90(), |v| *v).is_empty());
    }

    #[test]
    fn test_quantile_is_clamped() {
        let values = decimals(&[1, 2, 3]);
        assert_eq!(percentile(&values, Decimal::from(5)), Some(Decimal::from(3)));
        assert_eq!(percentile(&values, Decimal::from(-1)), Some(Decimal::from(1)));
    }
}
