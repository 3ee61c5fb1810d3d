//! Population Stability Index for categorical features.

use std::collections::{BTreeMap, BTreeSet};

/// Frequency floor substituted for categories absent from one side, so the
/// log-ratio stays finite.
pub const ZERO_FREQUENCY_FLOOR: f64 = 0.0001;

/// PSI between two categorical samples:
/// `Σ (p_cmp − p_base) · ln(p_cmp / p_base)` over the category union.
///
/// Categories missing from one side take the [`ZERO_FREQUENCY_FLOOR`]
/// proportion. Identical distributions score 0; larger scores mean a bigger
/// shift. Callers handle empty samples before calling.
pub fn population_stability_index(baseline: &[String], comparison: &[String]) -> f64 {
    let base_counts = count(baseline);
    let cmp_counts = count(comparison);

    let categories: BTreeSet<&String> = base_counts.keys().chain(cmp_counts.keys()).copied().collect();
    let n_base = baseline.len() as f64;
    let n_cmp = comparison.len() as f64;

    let mut psi = 0.0;
    for category in categories {
        let p_base = proportion(&base_counts, category, n_base);
        let p_cmp = proportion(&cmp_counts, category, n_cmp);
        psi += (p_cmp - p_base) * (p_cmp / p_base).ln();
    }
    psi
}

fn count(sample: &[String]) -> BTreeMap<&String, usize> {
    let mut counts = BTreeMap::new();
    for value in sample {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

fn proportion(counts: &BTreeMap<&String, usize>, category: &String, total: f64) -> f64 {
    match counts.get(category) {
        Some(&c) if c > 0 => c as f64 / total,
        _ => ZERO_FREQUENCY_FLOOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(spec: &[(&str, usize)]) -> Vec<String> {
        spec.iter()
            .flat_map(|(cat, n)| std::iter::repeat(cat.to_string()).take(*n))
            .collect()
    }

    #[test]
    fn identical_distributions_score_zero() {
        let a = sample(&[("carbon_felt", 30), ("graphite", 20)]);
        let psi = population_stability_index(&a, &a);
        assert!(psi.abs() < 1e-12);
    }

    #[test]
    fn shifted_distribution_scores_positive() {
        let base = sample(&[("carbon_felt", 50), ("graphite", 50)]);
        let shifted = sample(&[("carbon_felt", 90), ("graphite", 10)]);
        let psi = population_stability_index(&base, &shifted);
        assert!(psi > 0.1, "got {psi}");
    }

    #[test]
    fn new_category_uses_floor_not_infinity() {
        let base = sample(&[("carbon_felt", 50)]);
        let cmp = sample(&[("carbon_felt", 25), ("stainless_steel", 25)]);
        let psi = population_stability_index(&base, &cmp);
        assert!(psi.is_finite());
        assert!(psi > 0.0);
    }

    #[test]
    fn psi_is_symmetric_under_sample_swap() {
        let base = sample(&[("a", 80), ("b", 20)]);
        let cmp = sample(&[("a", 20), ("b", 80)]);
        let forward = population_stability_index(&base, &cmp);
        let backward = population_stability_index(&cmp, &base);
        assert!(forward > 0.0);
        assert!((forward - backward).abs() < 1e-9);
    }
}
