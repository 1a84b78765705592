//! PNG decode/encode for the squeeze pipeline.
//!
//! Decoding normalizes everything to 8-bit RGBA so the optimizer's format
//! adapter can decide for itself how narrow the working image really is.
//! Encoding always uses adaptive per-row filtering: the optimizer gates
//! its output on the same minimum-sum heuristic, so the encoder lands on
//! exactly the filters the rows were shaped for.

use std::io::{Cursor, Read, Write};

use crate::error::SqueezeError;

/// A decoded image, always 8-bit RGBA.
#[derive(Debug, Clone)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode a PNG stream into 8-bit RGBA.
///
/// Palette and sub-byte images are expanded, 16-bit channels are
/// stripped to 8, and tRNS transparency becomes an alpha channel.
pub fn decode_rgba(reader: impl Read) -> Result<RgbaImage, SqueezeError> {
    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    if info.bit_depth != png::BitDepth::Eight {
        return Err(SqueezeError::Unsupported(
            "bit depth other than 8 after expansion",
        ));
    }

    let pixels = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Indexed => {
            // EXPAND turns palettes into RGB(A); seeing this means the
            // decoder transformation was not applied.
            return Err(SqueezeError::Unsupported("palette image was not expanded"));
        }
    };

    Ok(RgbaImage {
        width: info.width,
        height: info.height,
        pixels,
    })
}

/// Encode 8-bit RGBA with maximum compression and adaptive filtering.
pub fn encode_rgba(image: &RgbaImage) -> Result<Vec<u8>, SqueezeError> {
    let mut out = Cursor::new(Vec::new());
    write_rgba(&mut out, image)?;
    Ok(out.into_inner())
}

fn write_rgba(writer: impl Write, image: &RgbaImage) -> Result<(), SqueezeError> {
    let mut encoder = png::Encoder::new(writer, image.width, image.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Best);
    encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.pixels)?;
    writer.finish()?;
    Ok(())
}
