#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted random selection over insertion-ordered tables.

use horde_core::WeightTable;
use rand::Rng;
use thiserror::Error;

/// Raised when a table offers nothing to pick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("weight table is empty or every weight is zero")]
pub struct EmptyTableError;

/// Picks a key with probability proportional to its weight.
///
/// A uniform draw in `[0, total)` is matched against the cumulative weights
/// in insertion order, so zero-weight entries are never picked and a fixed
/// RNG stream always yields the same key.
pub fn pick<'a, K, R>(table: &'a WeightTable<K>, rng: &mut R) -> Result<&'a K, EmptyTableError>
where
    R: Rng + ?Sized,
{
    let total = table.total_weight();
    if total == 0 {
        return Err(EmptyTableError);
    }

    let draw = rng.gen_range(0..total);
    let mut cumulative = 0_u64;
    for (key, weight) in table.iter() {
        cumulative += u64::from(weight);
        if draw < cumulative {
            return Ok(key);
        }
    }
    Err(EmptyTableError)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::mock::StepRng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn empty_and_zero_tables_fail() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let empty: WeightTable<&str> = WeightTable::new();
        assert_eq!(pick(&empty, &mut rng), Err(EmptyTableError));

        let zeros = WeightTable::from_entries(vec![("A", 0), ("B", 0)]);
        assert_eq!(pick(&zeros, &mut rng), Err(EmptyTableError));
    }

    #[test]
    fn zero_weight_entries_are_skipped() {
        let table = WeightTable::from_entries(vec![("A", 0), ("B", 2), ("C", 0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..100 {
            assert_eq!(pick(&table, &mut rng), Ok(&"B"));
        }
    }

    #[test]
    fn lowest_draw_selects_first_weighted_entry() {
        let table = WeightTable::from_entries(vec![("A", 1), ("B", 3)]);
        let mut rng = StepRng::new(0, 0);
        assert_eq!(pick(&table, &mut rng), Ok(&"A"));
    }
}
