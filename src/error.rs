use thiserror::Error;

#[derive(Error, Debug)]
pub enum GprimeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid input: allele depths sum to zero at {chrom}:{pos}, G is undefined")]
    ZeroDepth { chrom: String, pos: u64 },
    #[error("Invalid input: Gprime must be positive and finite, found {value} at index {index}")]
    NonPositiveGprime { index: usize, value: f64 },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid input: required column '{0}' is missing")]
    MissingColumn(String),
    #[error("Invalid input: chromosome '{0}' not found in the SNP set")]
    UnknownChromosome(String),
    #[error("Null distribution estimation failed: {0}")]
    EstimationFailure(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GprimeError>;
