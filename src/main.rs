use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use rayon::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pngsqueeze::job::{self, JobOptions};

/// Lossy PNG pre-compressor.
///
/// Nudges pixel values within a bounded quality envelope so the rewritten
/// file compresses substantially better, while staying visually close to
/// the original.
#[derive(Parser)]
#[command(name = "pngsqueeze", version)]
struct Cli {
    /// How much quality to sacrifice, from 0 (lossless) to 255
    #[arg(short, long, default_value_t = 26)]
    strength: u8,

    /// Dithering attenuation: 1 is full error diffusion, larger is weaker
    #[arg(short, long, default_value_t = 2)]
    bleed: i16,

    /// Overwrite existing output files
    #[arg(short, long)]
    force: bool,

    /// Destination path ("-" for stdout); requires exactly one input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suffix replacing ".png" in derived output names
    #[arg(long, default_value = "-squeeze.png", conflicts_with = "output")]
    ext: String,

    /// Only write outputs that are smaller than their input
    #[arg(long)]
    skip_if_larger: bool,

    /// Worker threads for multiple files (0 = one per core)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Print per-file and per-row progress
    #[arg(short, long)]
    verbose: bool,

    /// Silence status messages (overrides --verbose)
    #[arg(short, long)]
    quiet: bool,

    /// Input PNG files; a single "-" reads stdin and writes stdout
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose && !cli.quiet;

    // Status goes to stderr; stdout may carry PNG bytes.
    let default_filter = if verbose {
        "pngsqueeze=debug,rowloss=debug"
    } else if cli.quiet {
        "pngsqueeze=error"
    } else {
        "pngsqueeze=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();

    if cli.bleed < 1 {
        bail!("bleed divider must be in the range 1-32767");
    }

    let options = JobOptions {
        strength: cli.strength,
        bleed_divider: cli.bleed,
        force: cli.force,
        skip_if_larger: cli.skip_if_larger,
        extension: cli.ext.clone(),
        verbose,
    };

    let stdin_mode = cli.files.len() == 1 && cli.files[0] == PathBuf::from("-");
    if !stdin_mode && cli.files.iter().any(|f| f == &PathBuf::from("-")) {
        bail!("\"-\" (stdin) cannot be combined with other inputs");
    }
    if cli.output.is_some() && cli.files.len() != 1 {
        bail!("--output requires exactly one input file");
    }

    // stdin -> stdout
    if stdin_mode {
        let outcome = job::squeeze_to_stdout(None, &options)?;
        report_summary(verbose, &[("stdin".into(), Ok(outcome))]);
        return Ok(());
    }

    // single file to an explicit destination (possibly stdout)
    if let Some(output) = &cli.output {
        let input = &cli.files[0];
        let result = if output == &PathBuf::from("-") {
            job::squeeze_to_stdout(Some(input), &options)
        } else {
            job::squeeze_file(input, Some(output), &options)
        };
        let failed = report_summary(verbose, &[(input.display().to_string(), result)]);
        if failed > 0 {
            bail!("1 file failed");
        }
        return Ok(());
    }

    // many files, derived names, processed in parallel
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build()?;
    let results: Vec<_> = pool.install(|| {
        cli.files
            .par_iter()
            .map(|file| {
                (
                    file.display().to_string(),
                    job::squeeze_file(file, None, &options),
                )
            })
            .collect()
    });

    let failed = report_summary(verbose, &results);
    if failed > 0 {
        bail!("{failed} file(s) failed");
    }
    Ok(())
}

/// Log per-file errors, count outcomes, and emit one summary line.
/// Returns the number of failures.
fn report_summary(
    verbose: bool,
    results: &[(String, Result<job::Outcome, pngsqueeze::error::SqueezeError>)],
) -> usize {
    let mut compressed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    for (name, result) in results {
        match result {
            Ok(outcome) if outcome.skipped => skipped += 1,
            Ok(_) => compressed += 1,
            Err(err) => {
                failed += 1;
                tracing::error!(file = %name, %err, "failed");
            }
        }
    }
    if verbose {
        tracing::info!(compressed, skipped, failed, "done");
    }
    failed
}
