//! Bulk segregant analysis with the G' statistic.
//!
//! Per-SNP G from allele depths, tricube smoothing along each
//! chromosome, a non-parametric log-normal null for G', and BH
//! q-values. See [`pipeline::run_gprime_analysis`] for the entry point.

pub mod config;
pub mod csv_reader;
pub mod error;
pub mod output;
pub mod peaks;
pub mod pipeline;
pub mod significance;
pub mod smoothing;
pub mod statistics;
pub mod types;

pub use config::{AnalysisConfig, OutlierFilter};
pub use error::{GprimeError, Result};
pub use pipeline::{run_gprime_analysis, subset_chromosomes};
pub use significance::fdr_threshold;
pub use types::{GprimeResult, NullDistributionParams, SnpRecord};
