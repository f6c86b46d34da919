use std::collections::HashMap;

use horde_core::{EntityKey, WeightTable};
use horde_system_selection::pick;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn draw_counts(table: &WeightTable<EntityKey>, draws: usize, seed: u64) -> HashMap<String, usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut counts = HashMap::new();
    for _ in 0..draws {
        let key = pick(table, &mut rng).expect("table has weight");
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

#[test]
fn one_to_three_table_converges_over_four_thousand_draws() {
    let table: WeightTable<EntityKey> = vec![(EntityKey::parse("A"), 1), (EntityKey::parse("B"), 3)]
        .into_iter()
        .collect();

    let counts = draw_counts(&table, 4_000, 0x5eed_0001);
    let a = counts.get("A").copied().unwrap_or(0);
    let b = counts.get("B").copied().unwrap_or(0);

    // Within five percent of the draw count.
    assert_eq!(a + b, 4_000);
    assert!(a.abs_diff(1_000) <= 200, "A drawn {a} times");
    assert!(b.abs_diff(3_000) <= 200, "B drawn {b} times");
}

#[test]
fn frequencies_track_weights_for_mixed_keys() {
    let table: WeightTable<EntityKey> = vec![
        (EntityKey::parse("26"), 5),
        (EntityKey::parse("Goblin Shaman"), 2),
        (EntityKey::parse("29"), 3),
    ]
    .into_iter()
    .collect();

    let draws = 20_000;
    let counts = draw_counts(&table, draws, 42);
    for (key, weight) in table.iter() {
        let expected = draws as f64 * f64::from(weight) / 10.0;
        let observed = counts.get(&key.to_string()).copied().unwrap_or(0) as f64;
        assert!(
            (observed - expected).abs() / expected < 0.05,
            "{key}: observed {observed}, expected {expected}"
        );
    }
}

#[test]
fn fixed_seed_repeats_the_same_sequence() {
    let table: WeightTable<EntityKey> = vec![(EntityKey::parse("A"), 1), (EntityKey::parse("B"), 1)]
        .into_iter()
        .collect();
    let mut first = ChaCha8Rng::seed_from_u64(3);
    let mut second = ChaCha8Rng::seed_from_u64(3);
    for _ in 0..64 {
        assert_eq!(pick(&table, &mut first), pick(&table, &mut second));
    }
}
