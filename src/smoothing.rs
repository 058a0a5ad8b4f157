//! Window counting and tricube smoothing along one chromosome.
//!
//! Both operations take the positions of a single chromosome in
//! ascending order. Grouping by chromosome is the caller's job (see
//! `pipeline`), so nothing here can read across a chromosome boundary.

use crate::config::validate_window_size;
use crate::error::{GprimeError, Result};

/// Tricube kernel: w(u) = (1 - |u|^3)^3 for |u| < 1, else 0
fn tricube(u: f64) -> f64 {
    let abs_u = u.abs();
    if abs_u >= 1.0 {
        0.0
    } else {
        let t = 1.0 - abs_u.powi(3);
        t.powi(3)
    }
}

fn check_ascending(positions: &[u64]) -> Result<()> {
    if let Some(w) = positions.windows(2).find(|w| w[1] <= w[0]) {
        return Err(GprimeError::InvalidInput(format!(
            "positions must be strictly ascending within a chromosome, found {} followed by {}",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// Count SNPs within `window_size / 2` bp on either side of each SNP,
/// including the SNP itself. Both window ends are inclusive.
///
/// Uses a two-pointer sliding window, O(n) per chromosome.
pub fn count_snps_in_window(positions: &[u64], window_size: f64) -> Result<Vec<usize>> {
    validate_window_size(window_size)?;
    check_ascending(positions)?;

    let n = positions.len();
    let half = window_size / 2.0;
    let mut counts = Vec::with_capacity(n);

    let mut left = 0;
    let mut right = 0;

    for &pos in positions {
        let center = pos as f64;

        while left < n && (positions[left] as f64) < center - half {
            left += 1;
        }
        while right < n && (positions[right] as f64) <= center + half {
            right += 1;
        }

        counts.push(right - left);
    }

    Ok(counts)
}

/// Locally weighted average (degree-0 local regression) of `stat` with a
/// tricube kernel of bandwidth `window_size`.
///
/// Stat'(i) = Σ w(dⱼ)·Statⱼ / Σ w(dⱼ), w(d) = (1 - (|d|/h)³)³ for |d| < h.
pub fn tricube_smooth(positions: &[u64], stat: &[f64], window_size: f64) -> Result<Vec<f64>> {
    validate_window_size(window_size)?;
    if positions.len() != stat.len() {
        return Err(GprimeError::InvalidInput(format!(
            "{} positions but {} statistic values",
            positions.len(),
            stat.len()
        )));
    }
    check_ascending(positions)?;

    let n = positions.len();
    let bw = window_size;
    let mut smoothed = Vec::with_capacity(n);

    // Two-pointer window bounds, [left, right) holds every SNP with |d| < bw
    let mut left = 0;
    let mut right = 0;

    for &pos in positions {
        let center = pos as f64;

        while left < n && (positions[left] as f64) <= center - bw {
            left += 1;
        }
        while right < n && (positions[right] as f64) < center + bw {
            right += 1;
        }

        let mut sum_ws = 0.0;
        let mut sum_w = 0.0;

        for j in left..right {
            let w = tricube((positions[j] as f64 - center) / bw);
            sum_ws += w * stat[j];
            sum_w += w;
        }

        // The focal SNP always carries weight 1
        smoothed.push(sum_ws / sum_w);
    }

    Ok(smoothed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tricube_at_zero() {
        assert_relative_eq!(tricube(0.0), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_tricube_at_boundary() {
        assert_relative_eq!(tricube(1.0), 0.0, epsilon = 1e-10);
        assert_relative_eq!(tricube(-1.0), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_tricube_outside() {
        assert_eq!(tricube(1.5), 0.0);
        assert_eq!(tricube(-2.0), 0.0);
    }

    #[test]
    fn test_tricube_half() {
        // (1 - 0.125)^3
        assert_relative_eq!(tricube(0.5), 0.669921875, epsilon = 1e-12);
    }

    #[test]
    fn test_window_counts_unit_spacing() {
        let positions: Vec<u64> = (0..10).collect();
        let counts = count_snps_in_window(&positions, 2.0).unwrap();
        assert_eq!(counts[0], 2);
        assert_eq!(counts[9], 2);
        for c in &counts[1..9] {
            assert_eq!(*c, 3);
        }
    }

    #[test]
    fn test_window_counts_sparse() {
        // ±500, 100 and 600 sit exactly on each other's window edge
        let positions = vec![100, 150, 600, 10_000];
        let counts = count_snps_in_window(&positions, 1_000.0).unwrap();
        assert_eq!(counts, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_window_counts_rejects_unsorted() {
        let err = count_snps_in_window(&[5, 3], 10.0).unwrap_err();
        assert!(err.to_string().contains("5 followed by 3"));
        assert!(count_snps_in_window(&[5, 5], 10.0).is_err());
    }

    #[test]
    fn test_window_counts_rejects_bad_window() {
        assert!(matches!(
            count_snps_in_window(&[1, 2], 0.0),
            Err(GprimeError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_single_snp() {
        let smoothed = tricube_smooth(&[100], &[5.0], 1_000_000.0).unwrap();
        assert_relative_eq!(smoothed[0], 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_uniform_values_unchanged() {
        let positions = vec![3, 10, 11, 500, 90_000, 1_200_000, 1_200_001];
        let stat = vec![3.25; positions.len()];
        for ws in [1.0, 50.0, 1e6, 1e9] {
            let smoothed = tricube_smooth(&positions, &stat, ws).unwrap();
            for s in &smoothed {
                assert_relative_eq!(*s, 3.25, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_smoothing_reduces_spike() {
        let positions = vec![100, 200, 300, 400, 500];
        let stat = vec![1.0, 1.0, 100.0, 1.0, 1.0];
        let smoothed = tricube_smooth(&positions, &stat, 1_000_000.0).unwrap();
        assert!(smoothed[2] < 100.0);
        assert!(smoothed[2] > 1.0);
    }

    #[test]
    fn test_weights_match_kernel() {
        // Neighbour at half the bandwidth gets weight tricube(0.5)
        let smoothed = tricube_smooth(&[0, 50], &[0.0, 1.0], 100.0).unwrap();
        let w = tricube(0.5);
        assert_relative_eq!(smoothed[0], w / (1.0 + w), epsilon = 1e-12);
        assert_relative_eq!(smoothed[1], 1.0 / (1.0 + w), epsilon = 1e-12);
    }

    #[test]
    fn test_neighbour_at_bandwidth_is_ignored() {
        let smoothed = tricube_smooth(&[0, 100], &[2.0, 8.0], 100.0).unwrap();
        assert_relative_eq!(smoothed[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(smoothed[1], 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_length_mismatch() {
        assert!(matches!(
            tricube_smooth(&[1, 2, 3], &[1.0], 10.0),
            Err(GprimeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_smooth_rejects_negative_window() {
        assert!(matches!(
            tricube_smooth(&[1], &[1.0], -1.0),
            Err(GprimeError::InvalidConfiguration(_))
        ));
    }
}
