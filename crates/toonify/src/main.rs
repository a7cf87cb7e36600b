//! toonify: turn a photograph into a cartoon from the command line.
//!
//! Reads an image, runs the cartoon filter with the given parameters,
//! and writes the result as PNG. Optionally writes a side-by-side
//! comparison and prints per-stage diagnostics.
//!
//! # Usage
//!
//! ```text
//! toonify [OPTIONS] <INPUT> --output <OUTPUT>
//! ```
//!
//! Progress goes through the `log` facade (set `RUST_LOG` to adjust,
//! default `info`). Diagnostics reports and JSON go to stdout.

#![allow(clippy::print_stdout)]

mod controls;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use toonify_export::ExportError;
use toonify_pipeline::{
    DecodeCache, FilterParameters, PipelineDiagnostics, PipelineError, RgbImage, SystemClock,
};

use crate::controls::{Controls, Knob};

/// Turn a photograph into cartoon-style artwork.
///
/// Edges come from an adaptive threshold of the blurred luma; colors
/// come from a bilateral filter. Outline pixels are painted black.
#[derive(Parser, Debug)]
#[command(name = "toonify", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Where to write the cartoon PNG.
    #[arg(short, long)]
    output: PathBuf,

    /// Scale chroma after compositing.
    #[arg(long)]
    boost_color: bool,

    /// Run the edge-preserving soft-edge pass on the smoothed colors.
    #[arg(long)]
    soft_edges: bool,

    /// Bilateral filter diameter (1-25, odd).
    #[arg(long, default_value_t = FilterParameters::DEFAULT_DIAMETER)]
    diameter: i32,

    /// Bilateral filter color sigma (1-300).
    #[arg(long, default_value_t = FilterParameters::DEFAULT_SIGMA_COLOR)]
    sigma_color: i32,

    /// Bilateral filter spatial sigma (1-300).
    #[arg(long, default_value_t = FilterParameters::DEFAULT_SIGMA_SPACE)]
    sigma_space: i32,

    /// Median blur kernel before edge extraction (1-15, odd).
    #[arg(long, default_value_t = FilterParameters::DEFAULT_MEDIAN_KERNEL)]
    median_kernel: i32,

    /// Adaptive threshold block size (3-51, odd).
    #[arg(long, default_value_t = FilterParameters::DEFAULT_BLOCK_SIZE)]
    block_size: i32,

    /// Constant subtracted from the neighborhood mean (-20 to 20).
    #[arg(long, default_value_t = FilterParameters::DEFAULT_THRESHOLD_C, allow_negative_numbers = true)]
    threshold_c: i32,

    /// Full parameter set as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored and the
    /// values are passed to the filter unadjusted. Missing fields take
    /// their defaults.
    #[arg(long, conflicts_with = "reset")]
    config_json: Option<String>,

    /// Ignore every parameter flag and use the defaults.
    #[arg(long)]
    reset: bool,

    /// Also write the original and the cartoon side by side to this path.
    #[arg(long, value_name = "PATH")]
    compare: Option<PathBuf>,

    /// Print a per-stage timing report.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Number of times to run the filter.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,
}

impl Cli {
    const fn wants_diagnostics(&self) -> bool {
        self.diagnostics || self.json
    }

    /// The value given (or defaulted) for `knob`'s flag.
    const fn requested(&self, knob: Knob) -> i32 {
        match knob {
            Knob::Diameter => self.diameter,
            Knob::SigmaColor => self.sigma_color,
            Knob::SigmaSpace => self.sigma_space,
            Knob::MedianKernel => self.median_kernel,
            Knob::BlockSize => self.block_size,
            Knob::ThresholdC => self.threshold_c,
        }
    }
}

/// Everything that can stop a run.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("could not read {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not write {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid --config-json: {0}")]
    ConfigJson(serde_json::Error),

    #[error("could not serialize diagnostics: {0}")]
    DiagnosticsJson(serde_json::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Resolve the parameters to run with.
///
/// `--reset` wins over everything, `--config-json` is taken verbatim,
/// and individual flags go through [`Controls`] so they land on a
/// selectable slider value.
fn parameters_from_cli(cli: &Cli) -> Result<FilterParameters, AppError> {
    let mut controls = Controls::new();
    if cli.reset {
        controls.reset_to_defaults();
        return Ok(controls.parameters());
    }
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(AppError::ConfigJson);
    }

    controls.set_boost_color(cli.boost_color);
    controls.set_soft_edges(cli.soft_edges);
    for knob in Knob::ALL {
        let requested = cli.requested(knob);
        let stored = controls.set(knob, requested);
        if stored != requested {
            log::warn!("{} {requested} adjusted to {stored}", knob.label());
        }
        log::debug!("{}: {}", knob.label(), controls.get(knob));
    }
    Ok(controls.parameters())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    std::fs::write(path, bytes).map_err(|source| AppError::WriteOutput {
        path: path.to_path_buf(),
        source,
    })
}

fn print_diagnostics(diagnostics: &PipelineDiagnostics, json: bool) -> Result<(), AppError> {
    if json {
        let text =
            serde_json::to_string_pretty(diagnostics).map_err(AppError::DiagnosticsJson)?;
        println!("{text}");
    } else {
        println!("{}", diagnostics.report());
    }
    Ok(())
}

/// Print mean per-stage durations across runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all: &[PipelineDiagnostics]) {
    if all.is_empty() {
        return;
    }

    let totals: Vec<f64> = all
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();
    let min = totals.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = totals.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = totals.iter().sum::<f64>() / totals.len() as f64;

    println!();
    println!("Summary ({} runs)\n{}", all.len(), "=".repeat(60));
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let mut order = Vec::new();
    let mut per_stage: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for diagnostics in all {
        for (name, stage) in diagnostics.stages() {
            let samples = per_stage.entry(name).or_insert_with(|| {
                order.push(name);
                Vec::new()
            });
            samples.push(stage.duration.as_secs_f64() * 1000.0);
        }
    }
    for name in order {
        if let Some(samples) = per_stage.get(name) {
            let stage_mean = samples.iter().sum::<f64>() / samples.len() as f64;
            println!("{name:<24} {stage_mean:>10.3}ms");
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let params = parameters_from_cli(cli)?;
    params.validate()?;
    log::debug!("parameters: {params:?}");

    log::info!("Reading image {}", cli.input.display());
    let image_bytes = std::fs::read(&cli.input).map_err(|source| AppError::ReadInput {
        path: cli.input.clone(),
        source,
    })?;

    let mut cache = DecodeCache::default();
    let mut all_diagnostics = Vec::new();
    let mut cartoon: Option<RgbImage> = None;

    for run in 0..cli.runs {
        if cli.runs > 1 {
            log::info!("Run {}/{}", run + 1, cli.runs);
        }
        if cli.wants_diagnostics() {
            let (staged, diagnostics) = toonify_pipeline::process_cached_with_diagnostics(
                &image_bytes,
                &params,
                &SystemClock,
                &mut cache,
            )?;
            print_diagnostics(&diagnostics, cli.json)?;
            all_diagnostics.push(diagnostics);
            cartoon = Some(staged.into_final_image());
        } else {
            let original = cache.load(&image_bytes)?;
            cartoon = Some(toonify_pipeline::cartoonize(&original, &params)?);
        }
    }
    log::debug!(
        "decode cache: {} hits, {} misses",
        cache.hits(),
        cache.misses()
    );

    if cli.runs > 1 && cli.wants_diagnostics() {
        print_multi_run_summary(&all_diagnostics);
    }

    let Some(cartoon) = cartoon else {
        return Ok(());
    };

    log::info!("Saving to {}", cli.output.display());
    write_file(&cli.output, &toonify_export::encode_png(&cartoon)?)?;

    if let Some(ref compare_path) = cli.compare {
        let original = cache.load(&image_bytes)?;
        let comparison = toonify_export::side_by_side(&original, &cartoon)?;
        log::info!("Saving comparison to {}", compare_path.display());
        write_file(compare_path, &toonify_export::encode_png(&comparison)?)?;
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["toonify", "in.png", "-o", "out.png"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_flags() {
        let params = parameters_from_cli(&parse(&[])).unwrap();
        assert_eq!(params, FilterParameters::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--boost-color",
            "--median-kernel",
            "3",
            "--threshold-c",
            "-5",
        ]);
        let params = parameters_from_cli(&cli).unwrap();
        assert!(params.boost_color);
        assert!(!params.soft_edges);
        assert_eq!(params.median_kernel, 3);
        assert_eq!(params.threshold_c, -5);
    }

    #[test]
    fn flags_snap_to_slider_values() {
        let cli = parse(&["--block-size", "4", "--sigma-color", "999"]);
        let params = parameters_from_cli(&cli).unwrap();
        assert_eq!(params.block_size, 5);
        assert_eq!(params.sigma_color, 300);
        params.validate().unwrap();
    }

    #[test]
    fn every_knob_reads_its_own_flag() {
        let cli = parse(&[
            "--diameter",
            "5",
            "--sigma-color",
            "11",
            "--sigma-space",
            "12",
            "--median-kernel",
            "9",
            "--block-size",
            "13",
            "--threshold-c",
            "-3",
        ]);
        let params = parameters_from_cli(&cli).unwrap();
        let mut controls = Controls::new();
        for knob in Knob::ALL {
            controls.set(knob, cli.requested(knob));
        }
        assert_eq!(controls.parameters(), params);
        assert_eq!(
            Knob::ALL.map(|k| controls.get(k)),
            [5, 11, 12, 9, 13, -3]
        );
    }

    #[test]
    fn reset_ignores_flags() {
        let cli = parse(&["--reset", "--soft-edges", "--diameter", "3"]);
        assert_eq!(
            parameters_from_cli(&cli).unwrap(),
            FilterParameters::DEFAULTS
        );
    }

    #[test]
    fn config_json_is_taken_verbatim() {
        let cli = parse(&["--config-json", r#"{"block_size": 4}"#, "--diameter", "3"]);
        let params = parameters_from_cli(&cli).unwrap();
        assert_eq!(params.block_size, 4);
        assert_eq!(params.diameter, FilterParameters::DEFAULT_DIAMETER);
        assert!(params.validate().is_err());
    }

    #[test]
    fn bad_config_json_is_an_error() {
        let cli = parse(&["--config-json", "{not json"]);
        assert!(matches!(
            parameters_from_cli(&cli),
            Err(AppError::ConfigJson(_))
        ));
    }

    #[test]
    fn json_implies_diagnostics() {
        assert!(parse(&["--json"]).wants_diagnostics());
        assert!(!parse(&[]).wants_diagnostics());
    }

    #[test]
    fn zero_runs_rejected() {
        assert!(Cli::try_parse_from(["toonify", "in.png", "-o", "o.png", "--runs", "0"]).is_err());
    }

    #[test]
    fn decode_failure_message() {
        let err = AppError::from(PipelineError::EmptyInput);
        assert!(err.to_string().contains("could not read image"), "{err}");
    }
}
