use crate::error::{GprimeError, Result};
use crate::types::SnpRecord;
use std::path::Path;
use std::str::FromStr;

pub const COL_CHROM: &str = "CHROM";
pub const COL_POS: &str = "POS";
pub const COL_AD_REF_LOW: &str = "AD_REF.LOW";
pub const COL_AD_REF_HIGH: &str = "AD_REF.HIGH";
pub const COL_AD_ALT_LOW: &str = "AD_ALT.LOW";
pub const COL_AD_ALT_HIGH: &str = "AD_ALT.HIGH";
pub const COL_DELTA_SNP: &str = "deltaSNP";

/// Column positions of the required fields, located by header name.
struct ColumnIndex {
    chrom: usize,
    pos: usize,
    ad_ref_low: usize,
    ad_ref_high: usize,
    ad_alt_low: usize,
    ad_alt_high: usize,
    delta_snp: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| GprimeError::MissingColumn(name.to_string()))
        };

        Ok(ColumnIndex {
            chrom: find(COL_CHROM)?,
            pos: find(COL_POS)?,
            ad_ref_low: find(COL_AD_REF_LOW)?,
            ad_ref_high: find(COL_AD_REF_HIGH)?,
            ad_alt_low: find(COL_AD_ALT_LOW)?,
            ad_alt_high: find(COL_AD_ALT_HIGH)?,
            delta_snp: find(COL_DELTA_SNP)?,
        })
    }
}

fn parse_field<T: FromStr>(record: &csv::StringRecord, idx: usize, column: &str, row: usize) -> Result<T> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse().map_err(|_| {
        GprimeError::InvalidInput(format!("row {}: cannot parse {} value '{}'", row, column, raw))
    })
}

/// Read an SNP table (comma-separated, with a header row).
///
/// Extra columns are ignored; the required ones are found by name.
pub fn load_snp_table(path: &Path) -> Result<Vec<SnpRecord>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let columns = ColumnIndex::from_headers(rdr.headers()?)?;

    let mut snps = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        snps.push(SnpRecord {
            chrom: parse_field(&record, columns.chrom, COL_CHROM, row)?,
            pos: parse_field(&record, columns.pos, COL_POS, row)?,
            ad_ref_low: parse_field(&record, columns.ad_ref_low, COL_AD_REF_LOW, row)?,
            ad_alt_low: parse_field(&record, columns.ad_alt_low, COL_AD_ALT_LOW, row)?,
            ad_ref_high: parse_field(&record, columns.ad_ref_high, COL_AD_REF_HIGH, row)?,
            ad_alt_high: parse_field(&record, columns.ad_alt_high, COL_AD_ALT_HIGH, row)?,
            delta_snp: parse_field(&record, columns.delta_snp, COL_DELTA_SNP, row)?,
        });
    }

    log::info!("Loaded {} SNPs from {}", snps.len(), path.display());
    Ok(snps)
}
