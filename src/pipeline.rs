//! G' analysis in two phases.
//!
//! 1. Per chromosome (parallel): window counts, G, tricube-smoothed
//!    deltaSNP and G'. Each chromosome owns its slice of the table.
//! 2. Genome-wide on the merged columns: null distribution, p-values,
//!    BH q-values.

use crate::config::AnalysisConfig;
use crate::error::{GprimeError, Result};
use crate::significance;
use crate::smoothing;
use crate::statistics;
use crate::types::{GprimeResult, NullDistributionParams, SnpRecord};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Per-chromosome columns, in ascending position order.
struct ChromosomeStats {
    indices: Vec<usize>,
    n_snps: Vec<usize>,
    g: Vec<f64>,
    tricube_delta_snp: Vec<f64>,
    g_prime: Vec<f64>,
}

/// Restrict the SNP set to the listed chromosomes, keeping input order.
pub fn subset_chromosomes(snps: &[SnpRecord], chromosomes: &[String]) -> Result<Vec<SnpRecord>> {
    let present: HashSet<&str> = snps.iter().map(|s| s.chrom.as_str()).collect();
    if let Some(missing) = chromosomes.iter().find(|c| !present.contains(c.as_str())) {
        return Err(GprimeError::UnknownChromosome(missing.clone()));
    }

    let wanted: HashSet<&str> = chromosomes.iter().map(|c| c.as_str()).collect();
    Ok(snps
        .iter()
        .filter(|s| wanted.contains(s.chrom.as_str()))
        .cloned()
        .collect())
}

/// Group record indices by chromosome (first-appearance order), each
/// group sorted by position.
fn group_by_chromosome(snps: &[SnpRecord]) -> Result<Vec<(String, Vec<usize>)>> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, snp) in snps.iter().enumerate() {
        groups
            .entry(snp.chrom.as_str())
            .or_insert_with(|| {
                order.push(snp.chrom.clone());
                Vec::new()
            })
            .push(i);
    }

    order
        .into_iter()
        .map(|chrom| {
            let mut indices = groups.remove(chrom.as_str()).unwrap_or_default();
            indices.sort_by_key(|&i| snps[i].pos);
            if let Some(w) = indices.windows(2).find(|w| snps[w[0]].pos == snps[w[1]].pos) {
                return Err(GprimeError::InvalidInput(format!(
                    "duplicate position {}:{}",
                    chrom, snps[w[0]].pos
                )));
            }
            Ok((chrom, indices))
        })
        .collect()
}

fn analyze_chromosome(
    chrom: &str,
    indices: Vec<usize>,
    snps: &[SnpRecord],
    window_size: f64,
) -> Result<ChromosomeStats> {
    let positions: Vec<u64> = indices.iter().map(|&i| snps[i].pos).collect();

    let delta: Vec<f64> = indices
        .iter()
        .map(|&i| {
            let snp = &snps[i];
            if snp.delta_snp.is_finite() {
                Ok(snp.delta_snp)
            } else {
                Err(GprimeError::InvalidInput(format!(
                    "deltaSNP is {} at {}:{}",
                    snp.delta_snp, snp.chrom, snp.pos
                )))
            }
        })
        .collect::<Result<_>>()?;

    let g: Vec<f64> = indices
        .iter()
        .map(|&i| {
            let snp = &snps[i];
            statistics::calculate_g_statistic(snp.ad_ref_low, snp.ad_ref_high, snp.ad_alt_low, snp.ad_alt_high)
                .ok_or_else(|| GprimeError::ZeroDepth {
                    chrom: snp.chrom.clone(),
                    pos: snp.pos,
                })
        })
        .collect::<Result<_>>()?;

    let n_snps = smoothing::count_snps_in_window(&positions, window_size)?;
    let tricube_delta_snp = smoothing::tricube_smooth(&positions, &delta, window_size)?;
    let g_prime = smoothing::tricube_smooth(&positions, &g, window_size)?;

    log::debug!("{}: {} SNPs smoothed", chrom, indices.len());

    Ok(ChromosomeStats {
        indices,
        n_snps,
        g,
        tricube_delta_snp,
        g_prime,
    })
}

/// Run the full G' analysis on a SNP set.
///
/// Returns one result per input record, in input order. Fails on the
/// first invalid option or SNP; nothing is skipped.
pub fn run_gprime_analysis(snps: &[SnpRecord], config: &AnalysisConfig) -> Result<Vec<GprimeResult>> {
    config.validate()?;
    if snps.is_empty() {
        return Err(GprimeError::InvalidInput("the SNP set is empty".to_string()));
    }

    let groups = group_by_chromosome(snps)?;
    log::info!(
        "Counting SNPs in window, computing G and tricube smoothing for {} chromosome(s)...",
        groups.len()
    );

    // Phase 1: per chromosome
    let per_chrom: Vec<ChromosomeStats> = groups
        .into_par_iter()
        .map(|(chrom, indices)| analyze_chromosome(&chrom, indices, snps, config.window_size))
        .collect::<Result<_>>()?;

    // Merge back into input order
    let n = snps.len();
    let mut n_snps = vec![0usize; n];
    let mut g = vec![0.0f64; n];
    let mut tricube_delta_snp = vec![0.0f64; n];
    let mut g_prime = vec![0.0f64; n];
    for stats in per_chrom {
        for (k, &i) in stats.indices.iter().enumerate() {
            n_snps[i] = stats.n_snps[k];
            g[i] = stats.g[k];
            tricube_delta_snp[i] = stats.tricube_delta_snp[k];
            g_prime[i] = stats.g_prime[k];
        }
    }

    // Phase 2: genome-wide
    log::info!("Estimating null distribution ({} outlier filter)...", config.outlier_filter);
    let null: NullDistributionParams = significance::estimate_null_params(
        &g_prime,
        Some(&tricube_delta_snp),
        config.outlier_filter,
        config.filter_threshold,
        config.mode_estimation_bandwidth,
    )?;
    log::info!("Null distribution: muE={:.4}, varE={:.4}", null.mu_e, null.var_e);

    log::info!("Calculating p-values and q-values...");
    let p_values = significance::compute_p_values(&g_prime, &null)?;
    let q_values = significance::adjust_p_values(&p_values);

    Ok(snps
        .iter()
        .enumerate()
        .map(|(i, record)| GprimeResult {
            record: record.clone(),
            n_snps: n_snps[i],
            tricube_delta_snp: tricube_delta_snp[i],
            g: g[i],
            g_prime: g_prime[i],
            p_value: p_values[i],
            neg_log10_pval: -p_values[i].log10(),
            q_value: q_values[i],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutlierFilter;

    fn snp(chrom: &str, pos: u64, low_alt: u32, high_alt: u32) -> SnpRecord {
        SnpRecord::from_depths(chrom, pos, 40 - low_alt, 40 - high_alt, low_alt, high_alt)
    }

    /// A few hundred SNPs with varied, mildly skewed depths.
    fn small_set() -> Vec<SnpRecord> {
        let mut snps = Vec::new();
        for (c, chrom) in ["chr1", "chr2"].iter().enumerate() {
            for i in 0..150u32 {
                let low_alt = 14 + (i * 7 + c as u32) % 13;
                let high_alt = 14 + (i * 11 + 3) % 13;
                snps.push(snp(chrom, (i as u64 + 1) * 1_000, low_alt, high_alt));
            }
        }
        snps
    }

    fn hampel_config() -> AnalysisConfig {
        AnalysisConfig {
            window_size: 5_000.0,
            outlier_filter: OutlierFilter::Hampel,
            ..Default::default()
        }
    }

    #[test]
    fn test_subset_chromosomes() {
        let snps = small_set();
        let sub = subset_chromosomes(&snps, &["chr2".to_string()]).unwrap();
        assert_eq!(sub.len(), 150);
        assert!(sub.iter().all(|s| s.chrom == "chr2"));
    }

    #[test]
    fn test_subset_unknown_chromosome() {
        let err = subset_chromosomes(&small_set(), &["chr9".to_string()]).unwrap_err();
        assert!(matches!(err, GprimeError::UnknownChromosome(ref c) if c == "chr9"));
    }

    #[test]
    fn test_group_by_chromosome_sorts_positions() {
        let snps = vec![snp("b", 30, 20, 20), snp("a", 5, 20, 20), snp("b", 10, 20, 20)];
        let groups = group_by_chromosome(&snps).unwrap();
        assert_eq!(groups[0], ("b".to_string(), vec![2, 0]));
        assert_eq!(groups[1], ("a".to_string(), vec![1]));
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let snps = vec![snp("a", 5, 20, 21), snp("a", 5, 19, 20)];
        let err = run_gprime_analysis(&snps, &hampel_config()).unwrap_err();
        assert!(err.to_string().contains("a:5"));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let mut snps = small_set();
        snps[7] = SnpRecord { ad_ref_low: 0, ad_alt_low: 0, ad_ref_high: 0, ad_alt_high: 0, ..snps[7].clone() };
        let err = run_gprime_analysis(&snps, &hampel_config()).unwrap_err();
        assert!(matches!(err, GprimeError::ZeroDepth { pos: 8_000, .. }));
    }

    #[test]
    fn test_non_finite_delta_snp_rejected() {
        let mut snps = small_set();
        snps[160].delta_snp = f64::NAN;
        let err = run_gprime_analysis(&snps, &hampel_config()).unwrap_err();
        assert!(matches!(err, GprimeError::InvalidInput(_)));
        assert!(err.to_string().contains("NaN at chr2:11000"), "{}", err);
    }

    #[test]
    fn test_wide_delta_snp_accepted() {
        let mut snps = small_set();
        snps[3].delta_snp = 0.9;
        snps[4].delta_snp = -1.0;
        let results = run_gprime_analysis(&snps, &hampel_config()).unwrap();
        assert_eq!(results[3].record.delta_snp, 0.9);
        assert!(results.iter().all(|r| r.tricube_delta_snp.is_finite()));
    }

    #[test]
    fn test_invalid_config_fails_first() {
        let cfg = AnalysisConfig { window_size: -1.0, ..Default::default() };
        assert!(matches!(
            run_gprime_analysis(&[], &cfg),
            Err(GprimeError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            run_gprime_analysis(&[], &AnalysisConfig::default()),
            Err(GprimeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_output_columns() {
        let snps = small_set();
        let results = run_gprime_analysis(&snps, &hampel_config()).unwrap();
        assert_eq!(results.len(), snps.len());

        for (r, s) in results.iter().zip(&snps) {
            assert_eq!(&r.record, s);
            assert!(r.n_snps >= 1);
            assert!(r.g >= 0.0);
            assert!(r.g_prime > 0.0);
            assert!((0.0..=1.0).contains(&r.p_value));
            assert!((0.0..=1.0).contains(&r.q_value));
            assert_eq!(r.neg_log10_pval, -r.p_value.log10());
        }

        // ±2.5 kb at 1 kb spacing
        assert_eq!(results[0].n_snps, 3);
        assert_eq!(results[10].n_snps, 5);
    }

    #[test]
    fn test_input_order_preserved() {
        let mut snps = small_set();
        snps.reverse();
        let results = run_gprime_analysis(&snps, &hampel_config()).unwrap();
        for (r, s) in results.iter().zip(&snps) {
            assert_eq!(r.record.pos, s.pos);
            assert_eq!(r.record.chrom, s.chrom);
        }
    }
}
