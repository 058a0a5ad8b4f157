use crate::config::{validate_alpha, validate_filter_threshold, validate_mode_bandwidth, OutlierFilter};
use crate::error::{GprimeError, Result};
use crate::types::NullDistributionParams;
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, LogNormal};

/// Hampel's rule cut-off, in left-MAD units above the median of ln(G')
const HAMPEL_CUTOFF: f64 = 5.2;

/// Estimate the log-normal null distribution of G' non-parametrically.
///
/// Putative QTL regions are trimmed first, either by the (smoothed)
/// delta-SNP index or by Hampel's rule on ln(G'). From the trimmed set:
///
/// * `mu_e  = ln(median)`
/// * `var_e = |mu_e - ln(mode)|`, mode from the half-sample method
pub fn estimate_null_params(
    g_prime: &[f64],
    delta_snp: Option<&[f64]>,
    outlier_filter: OutlierFilter,
    filter_threshold: f64,
    mode_bandwidth: f64,
) -> Result<NullDistributionParams> {
    validate_mode_bandwidth(mode_bandwidth)?;
    check_positive(g_prime)?;

    let trimmed = match outlier_filter {
        OutlierFilter::DeltaSnp => {
            validate_filter_threshold(filter_threshold)?;
            let delta = delta_snp.ok_or_else(|| {
                GprimeError::InvalidInput("the deltaSNP outlier filter needs a deltaSNP column".to_string())
            })?;
            log::info!(
                "Using deltaSNP-index to filter outlier regions with a threshold of {}",
                filter_threshold
            );
            trim_by_delta_snp(g_prime, delta, filter_threshold)?
        }
        OutlierFilter::Hampel => {
            log::info!("Using Hampel's rule to filter outlier regions");
            trim_by_hampel(g_prime)
        }
    };

    if trimmed.is_empty() {
        return Err(GprimeError::EstimationFailure(format!(
            "no SNPs left after {} outlier filtering of {} values",
            outlier_filter,
            g_prime.len()
        )));
    }
    log::debug!("{} of {} SNPs kept for null estimation", trimmed.len(), g_prime.len());

    let mut sorted = trimmed;
    sorted.sort_by(f64::total_cmp);

    let median_trim = compute_median(&sorted);
    log::info!("Estimating the mode of the trimmed G' set with the half-sample method");
    let mode_trim = half_sample_mode(&sorted, mode_bandwidth)?;

    let mu_e = median_trim.ln();
    let var_e = (mu_e - mode_trim.ln()).abs();

    if !mu_e.is_finite() || !var_e.is_finite() {
        return Err(GprimeError::EstimationFailure(format!(
            "non-finite null parameters (median={}, mode={})",
            median_trim, mode_trim
        )));
    }

    Ok(NullDistributionParams { mu_e, var_e })
}

fn check_positive(g_prime: &[f64]) -> Result<()> {
    match g_prime.iter().position(|&g| !(g > 0.0 && g.is_finite())) {
        Some(index) => Err(GprimeError::NonPositiveGprime { index, value: g_prime[index] }),
        None => Ok(()),
    }
}

/// Keep G' where |deltaSNP| < |filter_threshold|.
fn trim_by_delta_snp(g_prime: &[f64], delta_snp: &[f64], filter_threshold: f64) -> Result<Vec<f64>> {
    if delta_snp.len() != g_prime.len() {
        return Err(GprimeError::InvalidInput(format!(
            "{} Gprime values but {} deltaSNP values",
            g_prime.len(),
            delta_snp.len()
        )));
    }
    let limit = filter_threshold.abs();
    Ok(g_prime
        .iter()
        .zip(delta_snp)
        .filter(|(_, d)| d.abs() < limit)
        .map(|(&g, _)| g)
        .collect())
}

/// Keep G' where ln(G') - median ≤ 5.2 × left-MAD.
///
/// The MAD only looks below the median: QTL inflate G' upward, so the
/// lower half is the uncontaminated side.
fn trim_by_hampel(g_prime: &[f64]) -> Vec<f64> {
    let log_g: Vec<f64> = g_prime.iter().map(|g| g.ln()).collect();

    let mut sorted = log_g.clone();
    sorted.sort_by(f64::total_cmp);
    let median = compute_median(&sorted);
    let left_mad = compute_left_mad(&sorted, median);
    let threshold = HAMPEL_CUTOFF * left_mad;

    g_prime
        .iter()
        .zip(&log_g)
        .filter(|(_, &l)| l - median <= threshold)
        .map(|(&g, _)| g)
        .collect()
}

/// Median of an already sorted slice; NaN when empty.
fn compute_median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => f64::NAN,
        len if len % 2 == 1 => sorted[mid],
        _ => 0.5 * (sorted[mid - 1] + sorted[mid]),
    }
}

fn compute_left_mad(sorted: &[f64], median: f64) -> f64 {
    let mut deviations: Vec<f64> = sorted
        .iter()
        .filter(|&&x| x <= median)
        .map(|&x| median - x)
        .collect();
    deviations.sort_by(f64::total_cmp);
    compute_median(&deviations)
}

/// Half-sample mode (Bickel & Frühwirth).
///
/// Repeatedly keeps the `ceil(bandwidth * n)` consecutive sorted values
/// spanning the shortest interval until three or fewer remain.
pub fn half_sample_mode(values: &[f64], bandwidth: f64) -> Result<f64> {
    validate_mode_bandwidth(bandwidth)?;
    if values.is_empty() {
        return Err(GprimeError::EstimationFailure(
            "half-sample mode of an empty sample".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut y: &[f64] = &sorted;

    while y.len() >= 4 {
        let n = y.len();
        let k = (bandwidth * n as f64).ceil() as usize;
        if k >= n {
            return Err(GprimeError::EstimationFailure(format!(
                "half-sample mode does not converge: bandwidth {} keeps all {} values",
                bandwidth, n
            )));
        }

        let widths: Vec<f64> = (0..=n - k).map(|i| y[i + k - 1] - y[i]).collect();
        let min_width = widths.iter().copied().fold(f64::INFINITY, f64::min);
        let tied: Vec<usize> = widths
            .iter()
            .enumerate()
            .filter(|(_, &w)| w == min_width)
            .map(|(i, _)| i)
            .collect();

        let start = if tied.len() == 1 {
            tied[0]
        } else {
            let (first, last) = (tied[0], tied[tied.len() - 1]);
            if (last - first) as f64 > 0.05 * n as f64 {
                log::warn!(
                    "Tie in half-sample mode spans {} of {} values; the distribution could be multimodal",
                    last - first,
                    n
                );
            }
            tied.iter().sum::<usize>() / tied.len()
        };

        y = &y[start..start + k];
    }

    let mode = match y.len() {
        3 => {
            let z = 2.0 * y[1] - y[0] - y[2];
            if z < 0.0 {
                (y[0] + y[1]) / 2.0
            } else if z > 0.0 {
                (y[1] + y[2]) / 2.0
            } else {
                y[1]
            }
        }
        len => y.iter().sum::<f64>() / len as f64,
    };

    Ok(mode)
}

/// Compute p-values from smoothed G' values and null distribution parameters.
///
/// p_value = 1 - CDF(G') under LogNormal(mu_e, sqrt(var_e))
pub fn compute_p_values(g_prime: &[f64], null: &NullDistributionParams) -> Result<Vec<f64>> {
    check_positive(g_prime)?;
    let dist = LogNormal::new(null.mu_e, null.sigma()).map_err(|e| {
        GprimeError::EstimationFailure(format!(
            "invalid log-normal null (muE={}, varE={}): {}",
            null.mu_e, null.var_e, e
        ))
    })?;

    Ok(g_prime.par_iter().map(|&gp| 1.0 - dist.cdf(gp)).collect())
}

/// BH q-values, returned in input order.
///
/// q(i) = min over ranks r ≥ rank(i) of min(1, p(r) · m / r)
pub fn adjust_p_values(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let mut q_values = vec![0.0; m];
    let mut running_min = 1.0f64;

    // Step-up: walk ranks from the largest p-value down
    for (rank0, &snp) in order.iter().enumerate().rev() {
        let scaled = p_values[snp] * m as f64 / (rank0 + 1) as f64;
        running_min = running_min.min(scaled);
        q_values[snp] = running_min;
    }

    q_values
}

/// Largest raw p-value whose BH-adjusted value is below `alpha`.
///
/// Returns `None` when no p-value qualifies.
pub fn fdr_threshold(p_values: &[f64], alpha: f64) -> Result<Option<f64>> {
    validate_alpha(alpha)?;

    let mut sorted = p_values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let adjusted = adjust_p_values(&sorted);

    let threshold = adjusted.iter().rposition(|&q| q < alpha).map(|i| sorted[i]);
    if threshold.is_none() {
        log::warn!("No p-value passes the FDR threshold at alpha = {}", alpha);
    }
    Ok(threshold)
}
