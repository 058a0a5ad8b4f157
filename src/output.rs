use crate::csv_reader::{
    COL_AD_ALT_HIGH, COL_AD_ALT_LOW, COL_AD_REF_HIGH, COL_AD_REF_LOW, COL_CHROM, COL_DELTA_SNP, COL_POS,
};
use crate::error::Result;
use crate::types::GprimeResult;
use csv::Writer;
use std::path::Path;

/// Write the augmented SNP table: the input columns followed by the
/// derived ones.
pub fn write_results(results: &[GprimeResult], path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record([
        COL_CHROM,
        COL_POS,
        COL_AD_REF_LOW,
        COL_AD_REF_HIGH,
        COL_AD_ALT_LOW,
        COL_AD_ALT_HIGH,
        COL_DELTA_SNP,
        "nSNPs",
        "tricubeDeltaSNP",
        "G",
        "Gprime",
        "pvalue",
        "negLog10Pval",
        "qvalue",
    ])?;

    for result in results {
        let snp = &result.record;
        wtr.write_record([
            &snp.chrom,
            &snp.pos.to_string(),
            &snp.ad_ref_low.to_string(),
            &snp.ad_ref_high.to_string(),
            &snp.ad_alt_low.to_string(),
            &snp.ad_alt_high.to_string(),
            &format!("{:.6}", snp.delta_snp),
            &result.n_snps.to_string(),
            &format!("{:.6}", result.tricube_delta_snp),
            &format!("{:.6}", result.g),
            &format!("{:.6}", result.g_prime),
            &format!("{:.6e}", result.p_value),
            &format!("{:.6}", result.neg_log10_pval),
            &format!("{:.6e}", result.q_value),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
