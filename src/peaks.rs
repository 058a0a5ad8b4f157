use crate::error::Result;
use crate::types::GprimeResult;
use csv::Writer;
use std::path::Path;

/// A run of SNPs passing the FDR cut-off on one chromosome.
#[derive(Debug, Clone)]
pub struct QtlRegion {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub length: u64,
    pub n_snps: u64,
    pub max_g_prime: f64,
    pub max_neg_log10_p: f64,
    pub mean_tricube_delta_snp: f64,
}

/// Identify significant regions from the augmented SNP table.
///
/// SNPs with `q_value < alpha` are grouped per chromosome, merging hits
/// within `merge_distance` bp of the previous one.
pub fn identify_regions(results: &[GprimeResult], alpha: f64, merge_distance: u64) -> Vec<QtlRegion> {
    let mut chroms: Vec<&str> = Vec::new();
    for r in results {
        let c = r.record.chrom.as_str();
        if !chroms.contains(&c) {
            chroms.push(c);
        }
    }
    chroms.sort_by(|a, b| natural_chrom_cmp(a, b));

    let mut regions = Vec::new();

    for chrom in chroms {
        let mut hits: Vec<&GprimeResult> = results
            .iter()
            .filter(|r| r.record.chrom == chrom && r.q_value < alpha)
            .collect();
        hits.sort_by_key(|r| r.record.pos);

        let mut clusters: Vec<Vec<&GprimeResult>> = Vec::new();
        for r in hits {
            match clusters.last_mut() {
                Some(cluster) if r.record.pos <= cluster[cluster.len() - 1].record.pos.saturating_add(merge_distance) => {
                    cluster.push(r)
                }
                _ => clusters.push(vec![r]),
            }
        }

        for cluster in clusters {
            let start = cluster[0].record.pos;
            let end = cluster[cluster.len() - 1].record.pos;

            regions.push(QtlRegion {
                chrom: chrom.to_string(),
                start,
                end,
                length: end - start,
                n_snps: cluster.len() as u64,
                max_g_prime: cluster.iter().map(|r| r.g_prime).fold(f64::NEG_INFINITY, f64::max),
                max_neg_log10_p: cluster.iter().map(|r| r.neg_log10_pval).fold(f64::NEG_INFINITY, f64::max),
                mean_tricube_delta_snp: cluster.iter().map(|r| r.tricube_delta_snp).sum::<f64>()
                    / cluster.len() as f64,
            });
        }
    }

    // Strongest first
    regions.sort_by(|a, b| b.max_neg_log10_p.total_cmp(&a.max_neg_log10_p));

    regions
}

/// Write QTL regions to a CSV file.
pub fn write_regions_csv(regions: &[QtlRegion], path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record([
        "CHROM",
        "start",
        "end",
        "length",
        "nSNPs",
        "maxGprime",
        "maxNegLog10Pval",
        "meanTricubeDeltaSNP",
    ])?;

    for region in regions {
        wtr.write_record([
            &region.chrom,
            &region.start.to_string(),
            &region.end.to_string(),
            &region.length.to_string(),
            &region.n_snps.to_string(),
            &format!("{:.4}", region.max_g_prime),
            &format!("{:.4}", region.max_neg_log10_p),
            &format!("{:.6}", region.mean_tricube_delta_snp),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Print a formatted summary table of QTL regions to stderr.
pub fn report_regions(regions: &[QtlRegion], alpha: f64) {
    eprintln!();
    eprintln!("{}", "=".repeat(90));
    eprintln!("Significant regions (q < {})", alpha);
    eprintln!("{}", "=".repeat(90));
    eprintln!();

    if regions.is_empty() {
        eprintln!("No significant regions found.");
        eprintln!();
        eprintln!("{}", "=".repeat(90));
        return;
    }

    eprintln!("Found {} region(s):", regions.len());
    eprintln!();

    eprintln!(
        "{:<12} {:>12} {:>12} {:>12} {:>8} {:>16} {:>12} {:>12}",
        "CHROM", "start", "end", "length", "nSNPs", "-log10(p)_max", "Gprime_max", "mean_dSNP"
    );
    eprintln!("{}", "-".repeat(90));

    for region in regions {
        eprintln!(
            "{:<12} {:>12} {:>12} {:>12} {:>8} {:>16.2} {:>12.2} {:>12.4}",
            region.chrom,
            region.start,
            region.end,
            region.length,
            region.n_snps,
            region.max_neg_log10_p,
            region.max_g_prime,
            region.mean_tricube_delta_snp,
        );
    }

    eprintln!();
    eprintln!("{}", "=".repeat(90));
}

/// Natural chromosome sort: chr1 < chr2 < ... < chr10 < chr11 < chrX
fn natural_chrom_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    let a_num = extract_chrom_number(a);
    let b_num = extract_chrom_number(b);

    match (a_num, b_num) {
        (Some(an), Some(bn)) => an.cmp(&bn),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn extract_chrom_number(chrom: &str) -> Option<u64> {
    let stripped = chrom
        .strip_prefix("chr")
        .or_else(|| chrom.strip_prefix("Chr"))
        .or_else(|| chrom.strip_prefix("CHR"))
        .unwrap_or(chrom);
    stripped.parse::<u64>().ok()
}
