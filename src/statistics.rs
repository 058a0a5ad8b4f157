use crate::error::{GprimeError, Result};

/// Calculate the G-statistic from a 2x2 table of allele depths.
///
/// Contingency table:
///                 Low bulk   |  High bulk
/// REF allele:     low_ref    |  high_ref
/// ALT allele:     low_alt    |  high_alt
///
/// Returns `None` when all four depths are zero (G is undefined).
pub fn calculate_g_statistic(low_ref: u32, high_ref: u32, low_alt: u32, high_alt: u32) -> Option<f64> {
    let n1 = low_ref as f64;
    let n2 = high_ref as f64;
    let n3 = low_alt as f64;
    let n4 = high_alt as f64;

    let total = n1 + n2 + n3 + n4;
    if total == 0.0 {
        return None;
    }

    // Expected counts under independence of bulk and allele
    let e1 = (n1 + n2) * (n1 + n3) / total;
    let e2 = (n1 + n2) * (n2 + n4) / total;
    let e3 = (n1 + n3) * (n3 + n4) / total;
    let e4 = (n3 + n4) * (n2 + n4) / total;

    // lim(x→0) x*ln(x) = 0
    let term = |observed: f64, expected: f64| -> f64 {
        if observed == 0.0 {
            0.0
        } else {
            observed * (observed / expected).ln()
        }
    };

    let g = 2.0 * (term(n1, e1) + term(n2, e2) + term(n3, e3) + term(n4, e4));

    // Rounding can leave a tiny negative value when observed == expected
    Some(g.max(0.0))
}

/// Compute G for every SNP from four parallel depth columns.
pub fn compute_g(low_ref: &[u32], high_ref: &[u32], low_alt: &[u32], high_alt: &[u32]) -> Result<Vec<f64>> {
    let n = low_ref.len();
    if high_ref.len() != n || low_alt.len() != n || high_alt.len() != n {
        return Err(GprimeError::InvalidInput(format!(
            "allele depth columns differ in length: LowRef={}, HighRef={}, LowAlt={}, HighAlt={}",
            n,
            high_ref.len(),
            low_alt.len(),
            high_alt.len()
        )));
    }

    (0..n)
        .map(|i| {
            calculate_g_statistic(low_ref[i], high_ref[i], low_alt[i], high_alt[i]).ok_or_else(|| {
                GprimeError::InvalidInput(format!("allele depths sum to zero at SNP index {}", i))
            })
        })
        .collect()
}

/// Calculate SNP index for a bulk
/// SNP_index = ALT / (REF + ALT)
pub fn snp_index(ref_depth: u32, alt_depth: u32) -> f64 {
    let total = ref_depth as u64 + alt_depth as u64;
    if total == 0 {
        f64::NAN
    } else {
        alt_depth as f64 / total as f64
    }
}

/// Calculate delta SNP index
/// Δ(SNP-index) = SNP_index_high - SNP_index_low
pub fn delta_snp_index(high_ref: u32, high_alt: u32, low_ref: u32, low_alt: u32) -> f64 {
    let si_high = snp_index(high_ref, high_alt);
    let si_low = snp_index(low_ref, low_alt);

    if si_high.is_nan() || si_low.is_nan() {
        f64::NAN
    } else {
        si_high - si_low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_association() {
        // Low bulk: all REF, High bulk: all ALT
        let g = calculate_g_statistic(100, 0, 0, 100).unwrap();
        assert!(g > 100.0);
        // 2 * 200 * ln(2)
        assert_relative_eq!(g, 400.0 * 2f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn test_no_association() {
        assert_eq!(calculate_g_statistic(50, 50, 50, 50), Some(0.0));
        // Same REF fraction (1/4) in both bulks
        let g = calculate_g_statistic(10, 20, 30, 60).unwrap();
        assert_relative_eq!(g, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_cell_does_not_produce_nan() {
        let g = calculate_g_statistic(0, 12, 7, 3).unwrap();
        assert!(g.is_finite());
        assert!(g > 0.0);
    }

    #[test]
    fn test_all_zeros_is_undefined() {
        assert_eq!(calculate_g_statistic(0, 0, 0, 0), None);
    }

    #[test]
    fn test_non_negative() {
        for &(a, b, c, d) in &[(1, 2, 3, 4), (40, 3, 5, 60), (7, 7, 8, 9), (1, 1, 1, 100)] {
            assert!(calculate_g_statistic(a, b, c, d).unwrap() >= 0.0);
        }
    }

    #[test]
    fn test_symmetric_under_bulk_swap() {
        for &(lr, hr, la, ha) in &[(12, 30, 25, 8), (3, 9, 40, 11), (60, 61, 2, 70)] {
            let g = calculate_g_statistic(lr, hr, la, ha).unwrap();
            let swapped = calculate_g_statistic(hr, lr, ha, la).unwrap();
            assert_relative_eq!(g, swapped, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_compute_g_vectors() {
        let g = compute_g(&[100, 50], &[0, 50], &[0, 50], &[100, 50]).unwrap();
        assert_eq!(g.len(), 2);
        assert!(g[0] > 100.0);
        assert_eq!(g[1], 0.0);
    }

    #[test]
    fn test_compute_g_zero_depth_names_index() {
        let err = compute_g(&[1, 0], &[1, 0], &[1, 0], &[1, 0]).unwrap_err();
        assert!(matches!(err, GprimeError::InvalidInput(_)));
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_compute_g_length_mismatch() {
        assert!(compute_g(&[1, 2], &[1], &[1, 2], &[1, 2]).is_err());
    }

    #[test]
    fn test_snp_index() {
        assert_relative_eq!(snp_index(50, 50), 0.5, epsilon = 0.001);
        assert_relative_eq!(snp_index(100, 0), 0.0, epsilon = 0.001);
        assert_relative_eq!(snp_index(0, 100), 1.0, epsilon = 0.001);
        assert!(snp_index(0, 0).is_nan());
    }

    #[test]
    fn test_delta_snp_index() {
        // high bulk 3/4 ALT, low bulk 1/4 ALT
        assert_relative_eq!(delta_snp_index(10, 30, 30, 10), 0.5, epsilon = 1e-12);
        assert!(delta_snp_index(0, 0, 5, 5).is_nan());
    }
}
