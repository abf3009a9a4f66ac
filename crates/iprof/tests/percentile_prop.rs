use iprof::Percentiles;
use proptest::prelude::*;

proptest! {
    #[test]
    fn percentiles_are_monotonic(
        values in proptest::collection::vec(0.0f64..1.0e6, 1..500),
        a in 0.0f64..=100.0,
        b in 0.0f64..=100.0,
    ) {
        let p = Percentiles::new(values).unwrap();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(p.percentile(lo) <= p.percentile(hi));
    }

    #[test]
    fn percentiles_stay_within_bounds(
        values in proptest::collection::vec(-1.0e3f64..1.0e6, 1..500),
        q in -50.0f64..150.0,
    ) {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let p = Percentiles::new(values).unwrap();

        let v = p.percentile(q);
        prop_assert!(v >= min && v <= max);
        prop_assert_eq!(p.percentile(0.0), min);
        prop_assert_eq!(p.percentile(100.0), max);
    }

    #[test]
    fn input_order_does_not_matter(mut values in proptest::collection::vec(0.0f64..1.0e4, 1..200)) {
        let forward = Percentiles::new(values.clone()).unwrap();
        values.reverse();
        let backward = Percentiles::new(values).unwrap();
        prop_assert_eq!(forward, backward);
    }
}
