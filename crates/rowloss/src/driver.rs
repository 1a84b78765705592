//! The outer row loop.
//!
//! For each row, all five filters are tried at the configured strength; a
//! candidate survives only if the adaptive gate agrees that an MSAD
//! encoder would pick the filter it was optimized for. If every filter is
//! rejected the strength is lowered and the row retried — at strength 0 a
//! row reproduces its source bytes, whose MSAD pick is by construction
//! among the candidates, so the loop always terminates.

use crate::adaptive::adaptive_filter_for_row;
use crate::adapter::PixelLayout;
use crate::error::OptimizeError;
use crate::filter::RowFilter;
use crate::frequency::OriginalFrequency;
use crate::options::Options;
use crate::state::{OptimizeState, RowPass};

/// Optimize packed rows in place.
///
/// `rows` must hold `height` rows of `width * layout.bytes_per_pixel()`
/// bytes each. On return every row has been rewritten with values at most
/// `options.strength` away from the source (transparent pixels excepted —
/// they are preserved bit-exact), chosen so that a PNG encoder with
/// adaptive per-row filtering compresses the image noticeably better.
///
/// When `row_filters` is provided it receives the PNG filter type byte
/// (0–4) an adaptive encoder will pick for each committed row.
pub fn optimize_rows(
    rows: &mut [&mut [u8]],
    width: u32,
    height: u32,
    layout: PixelLayout,
    options: &Options,
    mut row_filters: Option<&mut [u8]>,
) -> Result<(), OptimizeError> {
    let bytes_per_pixel = layout.bytes_per_pixel();
    let width = width as usize;
    let height = height as usize;

    if rows.len() != height {
        return Err(OptimizeError::InternalInvariant {
            what: "row count does not match height",
        });
    }
    if rows.iter().any(|row| row.len() != width * bytes_per_pixel) {
        return Err(OptimizeError::InternalInvariant {
            what: "row length does not match width and pixel layout",
        });
    }
    if let Some(filters) = &row_filters {
        if filters.len() != height {
            return Err(OptimizeError::InternalInvariant {
                what: "filter vector length does not match height",
            });
        }
    }
    if width == 0 || height == 0 {
        return Ok(());
    }

    let bleed_divider = options.bleed_divider.max(1);
    let original_freq = OriginalFrequency::from_rows(rows, bytes_per_pixel)?;

    let mut state = OptimizeState::new(width, bytes_per_pixel)?;
    let mut best = state.clone();
    let mut scratch = state.clone();

    for y in 0..height {
        let mut strength = options.strength;
        let (filter, pass, used_strength) = loop {
            let mut best_cost = u64::MAX;
            let mut best_filter = None;
            let mut best_pass = RowPass::default();
            for filter in RowFilter::ALL {
                scratch.copy_from(&state);
                let outcome = scratch.run_row(
                    rows,
                    bytes_per_pixel,
                    width,
                    &original_freq,
                    filter,
                    strength,
                    bleed_divider,
                    true,
                );
                if let Some(pass) = outcome {
                    if pass.cost < best_cost {
                        best_cost = pass.cost;
                        best_filter = Some(filter);
                        best_pass = pass;
                        best.copy_from(&scratch);
                    }
                }
            }

            if let Some(filter) = best_filter {
                break (filter, best_pass, strength);
            }

            if strength == 0 {
                // Should be unreachable; keep a non-fatal escape hatch
                // that commits the row unchanged instead of giving up on
                // the whole image.
                tracing::warn!(y, "no filter accepted at zero strength, keeping row unchanged");
                let above: Option<&[u8]> = if y > 0 { Some(&rows[y - 1]) } else { None };
                let filter = adaptive_filter_for_row(above, &rows[y], bytes_per_pixel);
                scratch.copy_from(&state);
                let Some(pass) = scratch.run_row(
                    rows,
                    bytes_per_pixel,
                    width,
                    &original_freq,
                    filter,
                    0,
                    bleed_divider,
                    false,
                ) else {
                    return Err(OptimizeError::InternalInvariant {
                        what: "ungated zero-strength row pass rejected",
                    });
                };
                best.copy_from(&scratch);
                break (filter, pass, 0);
            }
            strength -= 1;
        };

        rows[y].copy_from_slice(best.pixels());
        state.copy_from(&best);
        if let Some(filters) = row_filters.as_deref_mut() {
            filters[y] = filter.png_id();
        }
        if options.verbose {
            tracing::debug!(
                y,
                filter = %filter,
                strength = used_strength,
                cost = pass.cost,
                distortion = pass.distortion,
                "row committed"
            );
        }
    }

    if options.verbose {
        tracing::info!(width, height, bytes_per_pixel, "optimization complete");
    }

    Ok(())
}
