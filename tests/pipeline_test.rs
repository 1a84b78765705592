//! End-to-end pipeline tests: real PNG bytes in, real PNG files out.

use std::fs;
use std::io::Cursor;

use pretty_assertions::assert_eq;

use pngsqueeze::error::SqueezeError;
use pngsqueeze::job::{output_path, squeeze_bytes, squeeze_file, JobOptions};
use pngsqueeze::png_io::{decode_rgba, encode_rgba, RgbaImage};

/// A 16x16 RGBA test card: color gradient with an opaque alpha channel.
fn test_card() -> RgbaImage {
    let pixels = (0..16u32 * 16)
        .flat_map(|i| {
            let x = i % 16;
            let y = i / 16;
            [(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8, 255]
        })
        .collect();
    RgbaImage {
        width: 16,
        height: 16,
        pixels,
    }
}

#[test]
fn test_squeeze_file_respects_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("card.png");
    let source = test_card();
    fs::write(&input, encode_rgba(&source).unwrap()).unwrap();

    let options = JobOptions {
        strength: 8,
        ..JobOptions::default()
    };
    let outcome = squeeze_file(&input, None, &options).unwrap();
    assert!(!outcome.skipped);

    let dest = dir.path().join("card-squeeze.png");
    assert!(dest.exists(), "derived output name should be card-squeeze.png");

    let decoded = decode_rgba(Cursor::new(fs::read(&dest).unwrap())).unwrap();
    assert_eq!(decoded.width, 16);
    assert_eq!(decoded.height, 16);
    for (out, src) in decoded.pixels.iter().zip(source.pixels.iter()) {
        assert!(
            (*out as i16 - *src as i16).abs() <= 8,
            "pipeline broke the quality envelope: {src} -> {out}"
        );
    }
}

#[test]
fn test_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("card.png");
    fs::write(&input, encode_rgba(&test_card()).unwrap()).unwrap();
    let dest = dir.path().join("card-squeeze.png");
    fs::write(&dest, b"precious").unwrap();

    let options = JobOptions::default();
    assert!(matches!(
        squeeze_file(&input, None, &options),
        Err(SqueezeError::NotOverwriting(_))
    ));
    assert_eq!(fs::read(&dest).unwrap(), b"precious");

    let options = JobOptions {
        force: true,
        ..JobOptions::default()
    };
    squeeze_file(&input, None, &options).unwrap();
    assert_ne!(fs::read(&dest).unwrap(), b"precious");
}

#[test]
fn test_skip_if_larger_suppresses_write() {
    // At strength 0 the pixels are untouched, so re-encoding with the
    // same settings reproduces the input byte for byte. "Not smaller"
    // must mean no output file.
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("card.png");
    fs::write(&input, encode_rgba(&test_card()).unwrap()).unwrap();

    let options = JobOptions {
        strength: 0,
        skip_if_larger: true,
        ..JobOptions::default()
    };
    let outcome = squeeze_file(&input, None, &options).unwrap();
    assert!(outcome.skipped);
    assert_eq!(outcome.input_bytes, outcome.output_bytes);
    assert!(
        !dir.path().join("card-squeeze.png").exists(),
        "skipped run must not leave an output file"
    );
}

#[test]
fn test_explicit_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let dest = dir.path().join("elsewhere.png");
    fs::write(&input, encode_rgba(&test_card()).unwrap()).unwrap();

    let options = JobOptions::default();
    squeeze_file(&input, Some(&dest), &options).unwrap();
    assert!(dest.exists());
    assert!(!dir.path().join("in-squeeze.png").exists());
}

#[test]
fn test_squeeze_bytes_rejects_non_png() {
    let options = JobOptions::default();
    assert!(matches!(
        squeeze_bytes(b"JFIF not a png", &options),
        Err(SqueezeError::Decode(_))
    ));
}

#[test]
fn test_output_is_valid_png_with_same_geometry() {
    let source = test_card();
    let options = JobOptions {
        strength: 26,
        ..JobOptions::default()
    };
    let out = squeeze_bytes(&encode_rgba(&source).unwrap(), &options).unwrap();
    let decoded = decode_rgba(Cursor::new(out)).unwrap();
    assert_eq!(decoded.width, source.width);
    assert_eq!(decoded.height, source.height);
    assert_eq!(decoded.pixels.len(), source.pixels.len());
}

#[test]
fn test_output_path_derivation() {
    use std::path::Path;
    assert_eq!(
        output_path(Path::new("shot.png"), "-squeeze.png"),
        Path::new("shot-squeeze.png")
    );
    assert_eq!(
        output_path(Path::new("shot"), "-squeeze.png"),
        Path::new("shot-squeeze.png")
    );
}
