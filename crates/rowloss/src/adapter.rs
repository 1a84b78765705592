//! Pixel-format adapter.
//!
//! Callers hand the optimizer plain RGBA, but many PNGs are really
//! grayscale or fully opaque underneath. Running the core on a packed 1-,
//! 2- or 3-channel representation both speeds it up and lets the symbol
//! statistics match what a narrow-format encode would see. This is a pure
//! shape adapter — no color conversion happens here.

use crate::driver::optimize_rows;
use crate::error::OptimizeError;
use crate::options::Options;

/// Channel layout of the packed working image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Single gray channel.
    Gray,
    /// Gray plus alpha.
    GrayAlpha,
    /// Three color channels, implicitly opaque.
    Rgb,
    /// Full four-channel color.
    Rgba,
}

impl PixelLayout {
    /// Bytes per pixel in this layout.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::GrayAlpha => 2,
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
        }
    }
}

/// Scan an RGBA buffer and pick the narrowest equivalent layout.
///
/// Detection is a fast-path optimization only; an image that is neither
/// grayscale nor opaque simply stays RGBA.
fn detect_layout(pixels: &[u8]) -> PixelLayout {
    let mut grayscale = true;
    let mut opaque = true;
    for pixel in pixels.chunks_exact(4) {
        if pixel[0] != pixel[1] || pixel[1] != pixel[2] {
            grayscale = false;
        }
        if pixel[3] != 255 {
            opaque = false;
        }
        if !grayscale && !opaque {
            break;
        }
    }
    match (grayscale, opaque) {
        (true, true) => PixelLayout::Gray,
        (true, false) => PixelLayout::GrayAlpha,
        (false, true) => PixelLayout::Rgb,
        (false, false) => PixelLayout::Rgba,
    }
}

/// Optimize a contiguous RGBA8 buffer in place.
///
/// The buffer must hold `width * height` four-byte pixels. Internally the
/// image may be packed to fewer channels when it is grayscale and/or
/// fully opaque; callers always get RGBA back. See
/// [`optimize_rows`](crate::optimize_rows) for the core contract.
pub fn optimize_rgba(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    options: &Options,
    row_filters: Option<&mut [u8]>,
) -> Result<(), OptimizeError> {
    let w = width as usize;
    let h = height as usize;
    if pixels.len() != w * h * 4 {
        return Err(OptimizeError::InternalInvariant {
            what: "buffer length does not match width * height * 4",
        });
    }
    if w == 0 || h == 0 {
        return Ok(());
    }

    let layout = detect_layout(pixels);
    if layout == PixelLayout::Rgba {
        let mut rows: Vec<&mut [u8]> = collect_rows(pixels, w * 4, h)?;
        return optimize_rows(&mut rows, width, height, layout, options, row_filters);
    }

    let bytes_per_pixel = layout.bytes_per_pixel();
    let mut packed = Vec::new();
    packed
        .try_reserve_exact(w * h * bytes_per_pixel)
        .map_err(|_| OptimizeError::oom("packed pixel buffer"))?;
    for pixel in pixels.chunks_exact(4) {
        match layout {
            PixelLayout::Gray => packed.push(pixel[0]),
            PixelLayout::GrayAlpha => packed.extend_from_slice(&[pixel[0], pixel[3]]),
            PixelLayout::Rgb => packed.extend_from_slice(&pixel[..3]),
            PixelLayout::Rgba => unreachable!(),
        }
    }

    {
        let mut rows = collect_rows(&mut packed, w * bytes_per_pixel, h)?;
        optimize_rows(&mut rows, width, height, layout, options, row_filters)?;
    }

    // Expand the optimized result back so callers always see RGBA.
    for (pixel, narrow) in pixels
        .chunks_exact_mut(4)
        .zip(packed.chunks_exact(bytes_per_pixel))
    {
        match layout {
            PixelLayout::Gray => {
                pixel[0] = narrow[0];
                pixel[1] = narrow[0];
                pixel[2] = narrow[0];
                pixel[3] = 255;
            }
            PixelLayout::GrayAlpha => {
                pixel[0] = narrow[0];
                pixel[1] = narrow[0];
                pixel[2] = narrow[0];
                pixel[3] = narrow[1];
            }
            PixelLayout::Rgb => {
                pixel[..3].copy_from_slice(narrow);
                pixel[3] = 255;
            }
            PixelLayout::Rgba => unreachable!(),
        }
    }

    Ok(())
}

/// Split a flat buffer into row slices without giving up on allocation
/// failure.
fn collect_rows(buffer: &mut [u8], stride: usize, height: usize) -> Result<Vec<&mut [u8]>, OptimizeError> {
    let mut rows = Vec::new();
    rows.try_reserve_exact(height)
        .map_err(|_| OptimizeError::oom("row pointer table"))?;
    rows.extend(buffer.chunks_mut(stride));
    Ok(rows)
}
