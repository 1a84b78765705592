//! Adaptive filter prediction.
//!
//! Replicates the minimum-sum-of-absolute-differences heuristic that
//! libpng (and the `png` crate's adaptive mode) uses to choose a row
//! filter. The quantizer runs it as an acceptance gate: a candidate row is
//! only kept when the filter it was optimized for is the one a downstream
//! encoder would rediscover from the row's final bytes.

use crate::filter::RowFilter;

/// Magnitude of a filtered byte interpreted as signed: values at or above
/// 128 count as `256 - v`.
#[inline]
fn signed_magnitude(byte: u8) -> u32 {
    if byte < 128 {
        byte as u32
    } else {
        256 - byte as u32
    }
}

/// Predict which filter a minimum-sum encoder will pick for `row`.
///
/// `above` is the previous scanline (already committed output), or `None`
/// for the first row of the image. Ties resolve in PNG filter order
/// (None, Sub, Up, Average, Paeth), matching libpng's heuristic.
pub fn adaptive_filter_for_row(
    above: Option<&[u8]>,
    row: &[u8],
    bytes_per_pixel: usize,
) -> RowFilter {
    let mut none_sum = 0u32;
    let mut sub_sum = 0u32;
    let mut up_sum = 0u32;
    let mut average_sum = 0u32;
    let mut paeth_sum = 0u32;

    for (i, &here) in row.iter().enumerate() {
        let mut left = 0;
        let mut diag = 0;
        let mut above_byte = 0;
        if i >= bytes_per_pixel {
            left = row[i - bytes_per_pixel];
            if let Some(above) = above {
                diag = above[i - bytes_per_pixel];
            }
        }
        if let Some(above) = above {
            above_byte = above[i];
        }

        none_sum += signed_magnitude(here);
        sub_sum += signed_magnitude(here.wrapping_sub(left));
        up_sum += signed_magnitude(here.wrapping_sub(above_byte));
        average_sum += signed_magnitude(
            here.wrapping_sub(RowFilter::Average.predict(above_byte, diag, left)),
        );
        paeth_sum += signed_magnitude(
            here.wrapping_sub(RowFilter::Paeth.predict(above_byte, diag, left)),
        );
    }

    let min_sum = none_sum
        .min(sub_sum)
        .min(up_sum)
        .min(average_sum)
        .min(paeth_sum);

    if min_sum >= none_sum {
        RowFilter::None
    } else if min_sum >= sub_sum {
        RowFilter::Sub
    } else if min_sum >= up_sum {
        RowFilter::Up
    } else if min_sum >= average_sum {
        RowFilter::Average
    } else {
        RowFilter::Paeth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_magnitude_folds_high_values() {
        assert_eq!(signed_magnitude(0), 0);
        assert_eq!(signed_magnitude(127), 127);
        assert_eq!(signed_magnitude(128), 128);
        assert_eq!(signed_magnitude(255), 1);
    }

    #[test]
    fn test_flat_row_prefers_sub() {
        // A constant row filters to zeros everywhere except the first pixel
        // under Sub, which beats None's raw values.
        let row = [90u8; 12];
        assert_eq!(adaptive_filter_for_row(None, &row, 3), RowFilter::Sub);
    }

    #[test]
    fn test_identical_rows_prefer_up() {
        let above = [17u8, 200, 3, 17, 200, 3, 17, 200, 3];
        let row = above;
        assert_eq!(
            adaptive_filter_for_row(Some(&above), &row, 3),
            RowFilter::Up,
            "zero vertical difference should give Up a zero sum"
        );
    }

    #[test]
    fn test_small_values_prefer_none() {
        // Residual-like data near zero: every other filter only adds noise.
        let above = [0u8, 1, 0, 2, 0, 1, 0, 2];
        let row = [1u8, 0, 2, 0, 1, 0, 2, 0];
        assert_eq!(adaptive_filter_for_row(Some(&above), &row, 1), RowFilter::None);
    }

    #[test]
    fn test_tie_breaks_in_png_order() {
        // With a single black pixel every sum is zero; None wins the tie.
        let row = [0u8, 0, 0];
        assert_eq!(adaptive_filter_for_row(None, &row, 3), RowFilter::None);
    }

    #[test]
    fn test_horizontal_gradient_prefers_sub() {
        let row: Vec<u8> = (0..32).map(|x| (x * 4) as u8).collect();
        assert_eq!(adaptive_filter_for_row(None, &row, 1), RowFilter::Sub);
    }
}
