use crate::error::{GprimeError, Result};
use std::fmt;
use std::str::FromStr;

/// How putative QTL regions are trimmed before the null distribution is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierFilter {
    /// Keep SNPs with |deltaSNP| < |filter_threshold|
    DeltaSnp,
    /// Hampel's rule on ln(G') with a left-sided MAD
    Hampel,
}

impl FromStr for OutlierFilter {
    type Err = GprimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deltasnp" => Ok(OutlierFilter::DeltaSnp),
            "hampel" => Ok(OutlierFilter::Hampel),
            other => Err(GprimeError::InvalidConfiguration(format!(
                "unknown outlier filter '{}'. Use 'deltaSNP' or 'Hampel'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutlierFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierFilter::DeltaSnp => write!(f, "deltaSNP"),
            OutlierFilter::Hampel => write!(f, "Hampel"),
        }
    }
}

/// Options recognized by the G' analysis.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Window size in bp. Window counts use +/- window_size/2, the
    /// tricube kernel uses window_size as its bandwidth.
    pub window_size: f64,
    pub outlier_filter: OutlierFilter,
    /// Only consulted by the deltaSNP filter
    pub filter_threshold: f64,
    /// Sample fraction kept at each half-sample mode step
    pub mode_estimation_bandwidth: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            window_size: 1e6,
            outlier_filter: OutlierFilter::DeltaSnp,
            filter_threshold: 0.1,
            mode_estimation_bandwidth: 0.5,
        }
    }
}

impl AnalysisConfig {
    /// Reject unusable options before any computation starts.
    pub fn validate(&self) -> Result<()> {
        validate_window_size(self.window_size)?;
        if self.outlier_filter == OutlierFilter::DeltaSnp {
            validate_filter_threshold(self.filter_threshold)?;
        }
        validate_mode_bandwidth(self.mode_estimation_bandwidth)?;
        Ok(())
    }
}

pub(crate) fn validate_window_size(window_size: f64) -> Result<()> {
    if !window_size.is_finite() || window_size <= 0.0 {
        return Err(GprimeError::InvalidConfiguration(format!(
            "windowSize must be a positive number of bp, got {}",
            window_size
        )));
    }
    Ok(())
}

pub(crate) fn validate_filter_threshold(filter_threshold: f64) -> Result<()> {
    if !filter_threshold.is_finite() || filter_threshold.abs() >= 0.5 {
        return Err(GprimeError::InvalidConfiguration(format!(
            "filterThreshold must be less than 0.5 in absolute value, got {}",
            filter_threshold
        )));
    }
    Ok(())
}

pub(crate) fn validate_mode_bandwidth(bandwidth: f64) -> Result<()> {
    if !(bandwidth > 0.0 && bandwidth < 1.0) {
        return Err(GprimeError::InvalidConfiguration(format!(
            "modeEstimationBandwidth must lie in (0, 1), got {}",
            bandwidth
        )));
    }
    Ok(())
}

pub(crate) fn validate_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(GprimeError::InvalidConfiguration(format!(
            "alpha must lie in (0, 1), got {}",
            alpha
        )));
    }
    Ok(())
}
