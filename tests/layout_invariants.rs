//! Randomized checks of the binning and leveling invariants through the
//! public API.

use std::collections::{BTreeMap, HashMap};

use genoview::coverage::StrandCoverage as StrandDepths;
use genoview::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_features(rng: &mut SmallRng, n: usize) -> Vec<(u64, u64, Strand)> {
    let mut features: Vec<(u64, u64, Strand)> = (0..n)
        .map(|_| {
            let start = rng.gen_range(0..10_000);
            let end = start + rng.gen_range(1..800);
            let strand = match rng.gen_range(0..3) {
                0 => Strand::Plus,
                1 => Strand::Minus,
                _ => Strand::Unstranded,
            };
            (start, end, strand)
        })
        .collect();
    features.sort();
    features
}

#[test]
fn test_placed_features_never_collide() {
    let mut rng = SmallRng::seed_from_u64(7);

    for offset in [0u64, 10, 57] {
        let features = random_features(&mut rng, 400);
        let mut leveler = FeatureLeveler::new(LevelConfig::default().with_offset(offset).with_max_depth(20));

        let mut by_level: HashMap<i32, Vec<PlacedFeature>> = HashMap::new();
        for (i, &(start, end, strand)) in features.iter().enumerate() {
            if let Some(placed) = leveler.place(&format!("f{}", i), start, end, strand) {
                match strand {
                    Strand::Plus => assert!(placed.level >= 1),
                    Strand::Minus => assert!(placed.level <= -1),
                    Strand::Unstranded => assert_eq!(placed.level, 0),
                }
                by_level.entry(placed.level).or_default().push(placed);
            }
        }

        // level 0 holds the unstranded features, which may overlap
        for (_, placed) in by_level.iter().filter(|(level, _)| **level != 0) {
            for pair in placed.windows(2) {
                assert!(
                    pair[0].end + offset < pair[1].start,
                    "{:?} and {:?} collide with offset {}",
                    pair[0],
                    pair[1],
                    offset
                );
            }
        }

        let counts = leveler.counts();
        assert_eq!(counts.placed() + counts.saturated, features.len() as u64);
        assert!(leveler.max_level().unwrap_or(0) <= 20);
        assert!(leveler.min_level().unwrap_or(0) >= -20);
    }
}

#[test]
fn test_levels_are_lowest_free() {
    let mut rng = SmallRng::seed_from_u64(11);
    let features = random_features(&mut rng, 200);
    let mut leveler = FeatureLeveler::new(LevelConfig::default().with_offset(0));
    let mut last_end: BTreeMap<i32, u64> = BTreeMap::new();

    for (i, &(start, end, strand)) in features.iter().enumerate() {
        let Some(placed) = leveler.place(&format!("f{}", i), start, end, strand) else {
            continue;
        };
        // every level closer to zero must have been occupied
        let sign = placed.level.signum();
        for level in 1..placed.level.abs() {
            let occupied = last_end[&(sign * level)];
            assert!(occupied >= start);
        }
        last_end.insert(placed.level, end);
    }
}

#[test]
fn test_bins_partition_the_window() {
    let mut rng = SmallRng::seed_from_u64(3);
    let mut plus = StrandDepths::new();
    for _ in 0..500 {
        plus.insert(rng.gen_range(0..5_000u64), rng.gen_range(1..100u32));
    }
    let minus = StrandDepths::new();
    let total: f64 = plus.values().map(|&d| d as f64).sum();

    for _ in 0..50 {
        let bins = rng.gen_range(1..700usize);
        let window = bin_coverage(&plus, &minus, 0, 5_000, bins, Reducer::Sum).unwrap();

        assert_eq!(window.len(), bins);
        assert_eq!(window[0].start, 0);
        for pair in window.windows(2) {
            assert!(pair[0].start < pair[1].start);
        }
        let summed: f64 = window.iter().map(|b| b.plus).sum();
        assert_eq!(summed, total);
        assert!(window.iter().all(|b| b.minus == 0.0));
    }
}

#[test]
fn test_bins_clamp_to_window_length() {
    let plus = [(2u64, 4u32), (3, 6)].into_iter().collect::<StrandDepths>();
    let minus = StrandDepths::new();

    let window = bin_coverage(&plus, &minus, 0, 5, 500, Reducer::Max).unwrap();
    let starts: Vec<u64> = window.iter().map(|b| b.start).collect();
    assert_eq!(starts, vec![0, 1, 2, 3, 4]);
    assert_eq!(window[3].plus, 6.0);
}
