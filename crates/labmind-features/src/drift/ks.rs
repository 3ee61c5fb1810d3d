//! Two-sample Kolmogorov–Smirnov statistic.

/// Max absolute difference between the two empirical CDFs, evaluated over the
/// sorted union of both samples.
///
/// Returns a value in [0, 1]: 0 for identical distributions, 1 for fully
/// separated ones. Callers handle empty samples before calling; an empty
/// side here contributes a degenerate CDF and the result is meaningless.
pub fn ks_statistic(baseline: &[f64], comparison: &[f64]) -> f64 {
    let mut base: Vec<f64> = baseline.to_vec();
    let mut cmp: Vec<f64> = comparison.to_vec();
    base.sort_by(|a, b| a.total_cmp(b));
    cmp.sort_by(|a, b| a.total_cmp(b));

    let mut union: Vec<f64> = base.iter().chain(cmp.iter()).copied().collect();
    union.sort_by(|a, b| a.total_cmp(b));
    union.dedup();

    let n_base = base.len() as f64;
    let n_cmp = cmp.len() as f64;

    let mut max_diff = 0.0f64;
    for &value in &union {
        let cdf_base = base.partition_point(|&x| x <= value) as f64 / n_base;
        let cdf_cmp = cmp.partition_point(|&x| x <= value) as f64 / n_cmp;
        max_diff = max_diff.max((cdf_base - cdf_cmp).abs());
    }
    max_diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_samples_score_zero() {
        let xs: Vec<f64> = (0..50).map(|i| i as f64 / 10.0).collect();
        assert_eq!(ks_statistic(&xs, &xs), 0.0);
    }

    #[test]
    fn disjoint_samples_score_one() {
        let low: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let high: Vec<f64> = (100..120).map(|i| i as f64).collect();
        assert!((ks_statistic(&low, &high) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn shifted_samples_score_between() {
        let base: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let shifted: Vec<f64> = base.iter().map(|x| x + 0.3).collect();
        let d = ks_statistic(&base, &shifted);
        assert!(d > 0.2 && d < 0.5, "got {d}");
    }

    #[test]
    fn statistic_is_symmetric() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![2.5, 3.5, 4.5];
        assert_eq!(ks_statistic(&a, &b), ks_statistic(&b, &a));
    }

    #[test]
    fn sampled_normals_separate_when_means_differ() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        use rand_distr::{Distribution, Normal};

        let mut rng = StdRng::seed_from_u64(42);
        let near = Normal::new(0.85, 0.02).expect("valid normal");
        let far = Normal::new(0.70, 0.02).expect("valid normal");

        let base: Vec<f64> = (0..200).map(|_| near.sample(&mut rng)).collect();
        let same: Vec<f64> = (0..200).map(|_| near.sample(&mut rng)).collect();
        let shifted: Vec<f64> = (0..200).map(|_| far.sample(&mut rng)).collect();

        assert!(ks_statistic(&base, &same) < 0.2, "same distribution stays low");
        assert!(
            ks_statistic(&base, &shifted) > 0.9,
            "7.5-sigma mean shift is near-total separation"
        );
    }
}
