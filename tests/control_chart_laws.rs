use chrono::{Duration, NaiveDate, NaiveDateTime};
use extruder_spc::{classify, compute, Category, Sample, TimeSeries, Window};
use proptest::prelude::*;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn series(values: &[f64]) -> TimeSeries {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Sample::new(t0() + Duration::seconds(10 * i as i64), v))
        .collect()
}

fn at(i: usize) -> NaiveDateTime {
    t0() + Duration::seconds(10 * i as i64)
}

proptest! {
    #[test]
    fn constant_series_has_no_violations(v in 0.0f64..1000.0, n in 1usize..60) {
        let s = series(&vec![v; n]);
        let stats = compute(&s, &s.full_range().unwrap()).unwrap();
        prop_assert!((stats.mean - v).abs() < 1e-9 * v.max(1.0));
        prop_assert!(stats.stddev < 1e-9 * v.max(1.0));
        prop_assert_eq!(stats.above_count, 0);
        prop_assert_eq!(stats.below_count, 0);
    }

    #[test]
    fn counts_and_percentage_are_bounded(values in prop::collection::vec(-50.0f64..500.0, 1..200)) {
        let s = series(&values);
        let stats = compute(&s, &s.full_range().unwrap()).unwrap();
        prop_assert!(stats.above_count + stats.below_count <= stats.total_count);
        prop_assert!((0.0..=100.0).contains(&stats.pct_out_of_control));
        prop_assert_eq!(stats.total_count, values.len());
    }

    #[test]
    fn clamped_lcl_is_never_negative(values in prop::collection::vec(-50.0f64..500.0, 2..200)) {
        let s = series(&values);
        let stats = compute(&s, &s.full_range().unwrap()).unwrap();
        let raw_lcl = stats.mean - 3.0 * stats.stddev;
        if raw_lcl < 0.0 {
            prop_assert!(stats.lcl_clamped);
            prop_assert!(stats.lcl >= 0.0);
        } else {
            prop_assert_eq!(stats.lcl, raw_lcl);
        }
    }

    #[test]
    fn compute_is_deterministic(values in prop::collection::vec(0.0f64..500.0, 1..100)) {
        let s = series(&values);
        let window = s.full_range().unwrap();
        let a = compute(&s, &window).unwrap();
        let b = compute(&s, &window).unwrap();
        prop_assert_eq!(a.mean.to_bits(), b.mean.to_bits());
        prop_assert_eq!(a.stddev.to_bits(), b.stddev.to_bits());
        prop_assert_eq!(a.lcl.to_bits(), b.lcl.to_bits());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn sub_window_never_counts_more_samples(
        values in prop::collection::vec(0.0f64..500.0, 2..120),
        a in 0usize..120,
        b in 0usize..120,
    ) {
        let s = series(&values);
        let (lo, hi) = (a.min(b) % values.len(), a.max(b) % values.len());
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        let full = compute(&s, &s.full_range().unwrap()).unwrap();
        let part = compute(&s, &Window::new(at(lo), at(hi))).unwrap();
        prop_assert!(full.total_count >= part.total_count);
        prop_assert_eq!(part.total_count, hi - lo + 1);
    }

    #[test]
    fn classification_matches_counts(values in prop::collection::vec(0.0f64..500.0, 1..150)) {
        let s = series(&values);
        let stats = compute(&s, &s.full_range().unwrap()).unwrap();
        let tags: Vec<Category> = classify(&s, &stats).map(|c| c.category).collect();
        prop_assert_eq!(tags.len(), stats.total_count);
        prop_assert_eq!(tags.iter().filter(|&&c| c == Category::AboveUcl).count(), stats.above_count);
        prop_assert_eq!(tags.iter().filter(|&&c| c == Category::BelowLcl).count(), stats.below_count);
    }
}
