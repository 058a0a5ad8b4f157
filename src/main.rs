use anyhow::{Context, Result};
use clap::Parser;
use gprime_analysis::{csv_reader, output, peaks, pipeline, significance, AnalysisConfig, OutlierFilter};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gprime-analysis")]
#[command(version)]
#[command(about = "Tricube-smoothed G' analysis for bulk segregant sequencing", long_about = None)]
struct Args {
    /// Input SNP table (CSV with CHROM, POS, AD_REF.LOW, AD_REF.HIGH, AD_ALT.LOW, AD_ALT.HIGH, deltaSNP)
    #[arg(short, long)]
    input: String,

    /// Output CSV file path
    #[arg(short, long)]
    output: Option<String>,

    /// Output directory (file auto-named from input)
    #[arg(long)]
    output_dir: Option<String>,

    /// Window size in base pairs
    #[arg(long, default_value = "1000000")]
    window_size: f64,

    /// Outlier filter used before estimating the null: "deltaSNP" or "Hampel"
    #[arg(long, default_value = "deltaSNP")]
    outlier_filter: OutlierFilter,

    /// |deltaSNP| cut-off for the deltaSNP outlier filter (must be < 0.5)
    #[arg(long, default_value = "0.1", allow_negative_numbers = true)]
    filter_threshold: f64,

    /// Sample fraction kept at each step of the half-sample mode estimate
    #[arg(long, default_value = "0.5")]
    mode_bandwidth: f64,

    /// FDR level for the threshold report and region calling
    #[arg(long, default_value = "0.01")]
    alpha: f64,

    /// Only analyze these chromosomes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    chromosomes: Vec<String>,

    /// Merge significant SNPs closer than this many bp into one region (defaults to window size)
    #[arg(long)]
    merge_distance: Option<u64>,

    /// Write significant regions to a CSV file
    #[arg(long)]
    regions_csv: Option<String>,

    /// Number of threads for parallel processing
    #[arg(long, default_value_t = num_cpus())]
    threads: usize,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

macro_rules! progress {
    ($quiet:expr) => {
        if !$quiet {
            eprintln!();
        }
    };
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

fn make_spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("  {spinner} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn resolve_output_path(args: &Args) -> Result<String> {
    match (&args.output, &args.output_dir) {
        (Some(output), _) => Ok(output.clone()),
        (None, Some(dir)) => {
            let stem = Path::new(&args.input)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "snps".to_string());
            let dir_path = Path::new(dir);
            std::fs::create_dir_all(dir_path)
                .with_context(|| format!("Failed to create output directory {}", dir))?;
            Ok(dir_path
                .join(format!("{}_gprime.csv", stem))
                .to_string_lossy()
                .to_string())
        }
        (None, None) => anyhow::bail!("Either --output or --output-dir must be specified"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .context("Failed to configure thread pool")?;

    let config = AnalysisConfig {
        window_size: args.window_size,
        outlier_filter: args.outlier_filter,
        filter_threshold: args.filter_threshold,
        mode_estimation_bandwidth: args.mode_bandwidth,
    };
    config.validate()?;
    if !(args.alpha > 0.0 && args.alpha < 1.0) {
        anyhow::bail!("Invalid --alpha {}. Must lie in (0, 1)", args.alpha);
    }

    let input = Path::new(&args.input);
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", args.input);
    }
    let output_path = resolve_output_path(&args)?;

    progress!(args.quiet, "G' Analysis");
    progress!(args.quiet, "=========================================");
    progress!(args.quiet, "Input table: {}", args.input);
    progress!(args.quiet, "Output CSV: {}", output_path);
    progress!(args.quiet, "  Window size: {} bp", config.window_size);
    progress!(args.quiet, "  Outlier filter: {}", config.outlier_filter);
    if config.outlier_filter == OutlierFilter::DeltaSnp {
        progress!(args.quiet, "  Filter threshold: {}", config.filter_threshold);
    }
    progress!(args.quiet, "  Mode estimation bandwidth: {}", config.mode_estimation_bandwidth);
    progress!(args.quiet, "  FDR level: {}", args.alpha);
    progress!(args.quiet, "Threads: {}", args.threads);
    progress!(args.quiet);

    let mut snps = csv_reader::load_snp_table(input)
        .with_context(|| format!("Failed to load SNP table {}", args.input))?;
    if !args.chromosomes.is_empty() {
        snps = pipeline::subset_chromosomes(&snps, &args.chromosomes)?;
        progress!(args.quiet, "Kept {} SNPs on {} chromosome(s)", snps.len(), args.chromosomes.len());
    }

    let pb = make_spinner(args.quiet)?;
    pb.set_message("running G' analysis");
    let results = pipeline::run_gprime_analysis(&snps, &config)?;
    pb.finish_and_clear();

    output::write_results(&results, Path::new(&output_path))
        .with_context(|| format!("Failed to write {}", output_path))?;

    let p_values: Vec<f64> = results.iter().map(|r| r.p_value).collect();
    match significance::fdr_threshold(&p_values, args.alpha)? {
        Some(threshold) => progress!(
            args.quiet,
            "FDR threshold (alpha = {}): p <= {:.3e}, -log10(p) >= {:.3}",
            args.alpha,
            threshold,
            -threshold.log10()
        ),
        None => progress!(args.quiet, "FDR threshold (alpha = {}): none", args.alpha),
    }

    let n_significant = results.iter().filter(|r| r.q_value < args.alpha).count();
    progress!(args.quiet, "Significant SNPs (q < {}): {} / {}", args.alpha, n_significant, results.len());

    let merge_distance = args.merge_distance.unwrap_or(config.window_size as u64);
    let regions = peaks::identify_regions(&results, args.alpha, merge_distance);
    if !args.quiet {
        peaks::report_regions(&regions, args.alpha);
    }

    if let Some(ref regions_path) = args.regions_csv {
        peaks::write_regions_csv(&regions, Path::new(regions_path))
            .with_context(|| format!("Failed to write {}", regions_path))?;
        progress!(args.quiet, "Region summary written to: {}", regions_path);
    }

    progress!(args.quiet);
    progress!(args.quiet, "Done! Results written to: {}", output_path);

    Ok(())
}
