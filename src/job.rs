//! Per-file squeeze pipeline: read, optimize, encode, write.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::SqueezeError;
use crate::png_io::{decode_rgba, encode_rgba};

/// Settings for one squeeze run, derived from the CLI.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub strength: u8,
    pub bleed_divider: i16,
    pub force: bool,
    pub skip_if_larger: bool,
    /// Suffix replacing ".png" when deriving output names.
    pub extension: String,
    pub verbose: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            strength: 26,
            bleed_divider: 2,
            force: false,
            skip_if_larger: false,
            extension: "-squeeze.png".to_string(),
            verbose: false,
        }
    }
}

/// What happened to one file.
#[derive(Debug)]
pub struct Outcome {
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// True when `--skip-if-larger` suppressed the write.
    pub skipped: bool,
}

/// Derive the output path: replace a trailing `.png`/`.PNG` with the
/// configured suffix, or append the suffix when there is no extension.
pub fn output_path(input: &Path, extension: &str) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(".png")
        .or_else(|| name.strip_suffix(".PNG"))
        .unwrap_or(&name);
    input.with_file_name(format!("{stem}{extension}"))
}

/// Run the whole pipeline on in-memory PNG bytes.
pub fn squeeze_bytes(data: &[u8], options: &JobOptions) -> Result<Vec<u8>, SqueezeError> {
    let mut image = decode_rgba(data)?;

    let core_options = rowloss::Options::new()
        .strength(options.strength)
        .bleed_divider(options.bleed_divider)
        .verbose(options.verbose);
    let mut filters = vec![0u8; image.height as usize];
    rowloss::optimize_rgba(
        &mut image.pixels,
        image.width,
        image.height,
        &core_options,
        Some(&mut filters),
    )?;

    if options.verbose {
        let mut counts = [0usize; 5];
        for &f in &filters {
            counts[f as usize] += 1;
        }
        tracing::debug!(
            none = counts[0],
            sub = counts[1],
            up = counts[2],
            average = counts[3],
            paeth = counts[4],
            "row filter distribution"
        );
    }

    encode_rgba(&image)
}

/// Squeeze one file on disk into its derived (or explicit) output path.
pub fn squeeze_file(
    input: &Path,
    explicit_output: Option<&Path>,
    options: &JobOptions,
) -> Result<Outcome, SqueezeError> {
    let dest = explicit_output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_path(input, &options.extension));
    if !options.force && dest.exists() {
        return Err(SqueezeError::NotOverwriting(dest));
    }

    let data = fs::read(input)?;
    let encoded = squeeze_bytes(&data, options)?;

    if options.skip_if_larger && encoded.len() >= data.len() {
        tracing::info!(
            input = %input.display(),
            in_bytes = data.len(),
            out_bytes = encoded.len(),
            "result not smaller, skipping"
        );
        return Ok(Outcome {
            input_bytes: data.len(),
            output_bytes: encoded.len(),
            skipped: true,
        });
    }

    write_atomic(&dest, &encoded)?;
    tracing::info!(
        input = %input.display(),
        output = %dest.display(),
        in_bytes = data.len(),
        out_bytes = encoded.len(),
        percent = format!("{:.1}", 100.0 * encoded.len() as f64 / data.len().max(1) as f64),
        "wrote compressed image"
    );
    Ok(Outcome {
        input_bytes: data.len(),
        output_bytes: encoded.len(),
        skipped: false,
    })
}

/// Squeeze stdin (or a single named file) to stdout.
///
/// When `--skip-if-larger` applies, the original bytes are emitted
/// instead so the consumer always receives a complete PNG.
pub fn squeeze_to_stdout(input: Option<&Path>, options: &JobOptions) -> Result<Outcome, SqueezeError> {
    let data = match input {
        Some(path) => fs::read(path)?,
        None => {
            let mut data = Vec::new();
            std::io::stdin().lock().read_to_end(&mut data)?;
            data
        }
    };
    let encoded = squeeze_bytes(&data, options)?;

    let skipped = options.skip_if_larger && encoded.len() >= data.len();
    let payload = if skipped { &data } else { &encoded };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(payload)?;
    stdout.flush()?;

    Ok(Outcome {
        input_bytes: data.len(),
        output_bytes: encoded.len(),
        skipped,
    })
}

/// Write via a sibling temp file and rename, so a crash mid-write never
/// leaves a truncated PNG at the destination.
fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), SqueezeError> {
    let mut tmp = dest.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    if let Err(err) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}
