use crate::statistics;

/// One row of the input SNP table.
///
/// Depths follow the bulk naming of the input table: `LOW` is the bulk
/// selected for the low trait extreme, `HIGH` the other one.
#[derive(Debug, Clone, PartialEq)]
pub struct SnpRecord {
    pub chrom: String,
    pub pos: u64,

    // Low bulk
    pub ad_ref_low: u32,
    pub ad_alt_low: u32,

    // High bulk
    pub ad_ref_high: u32,
    pub ad_alt_high: u32,

    pub delta_snp: f64,
}

impl SnpRecord {
    /// Build a record whose deltaSNP is derived from its own depths
    /// (SNP-index of the high bulk minus SNP-index of the low bulk).
    pub fn from_depths(
        chrom: &str,
        pos: u64,
        ad_ref_low: u32,
        ad_ref_high: u32,
        ad_alt_low: u32,
        ad_alt_high: u32,
    ) -> Self {
        SnpRecord {
            chrom: chrom.to_string(),
            pos,
            ad_ref_low,
            ad_alt_low,
            ad_ref_high,
            ad_alt_high,
            delta_snp: statistics::delta_snp_index(ad_ref_high, ad_alt_high, ad_ref_low, ad_alt_low),
        }
    }

    pub fn total_depth(&self) -> u64 {
        self.ad_ref_low as u64
            + self.ad_ref_high as u64
            + self.ad_alt_low as u64
            + self.ad_alt_high as u64
    }
}

/// Parameters of the estimated log-normal null distribution of G'.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullDistributionParams {
    pub mu_e: f64,  // log of the trimmed G' median
    pub var_e: f64, // |mu_e - ln(mode of trimmed G')|
}

impl NullDistributionParams {
    pub fn sigma(&self) -> f64 {
        self.var_e.sqrt()
    }
}

/// Input record augmented with every column the analysis derives.
#[derive(Debug, Clone)]
pub struct GprimeResult {
    pub record: SnpRecord,
    pub n_snps: usize,
    pub tricube_delta_snp: f64,
    pub g: f64,
    pub g_prime: f64,
    pub p_value: f64,
    pub neg_log10_pval: f64,
    pub q_value: f64,
}
