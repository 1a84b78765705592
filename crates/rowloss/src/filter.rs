//! PNG scanline filters.
//!
//! The five predictors defined by PNG 1.2 section 6.1. Each one maps the
//! three already-decoded neighbour bytes of a channel (above, diagonal,
//! left) to a predicted byte; the filtered byte stored in the stream is
//! `value - prediction` modulo 256.

/// One of the five PNG row filters.
///
/// The discriminant order matches the PNG filter type byte, so
/// [`png_id`](Self::png_id) is a plain cast. Filters are tried by the row
/// driver in this order, and MSAD ties in the adaptive picker resolve in
/// this order too, matching libpng.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowFilter {
    /// No prediction; the raw byte is the symbol.
    None,
    /// Predict from the byte one pixel to the left.
    Sub,
    /// Predict from the byte directly above.
    Up,
    /// Predict from the floor average of left and above.
    Average,
    /// Paeth predictor: whichever of left/above/diagonal is closest to
    /// `left + above - diagonal`.
    Paeth,
}

impl RowFilter {
    /// All five filters in PNG order.
    pub const ALL: [RowFilter; 5] = [
        RowFilter::None,
        RowFilter::Sub,
        RowFilter::Up,
        RowFilter::Average,
        RowFilter::Paeth,
    ];

    /// The PNG filter type byte (`0..=4`).
    #[inline]
    pub fn png_id(self) -> u8 {
        self as u8
    }

    /// Predict one channel byte from its three neighbours.
    ///
    /// Neighbours outside the image are zero, per the PNG specification.
    #[inline]
    pub fn predict(self, above: u8, diag: u8, left: u8) -> u8 {
        match self {
            RowFilter::None => 0,
            RowFilter::Sub => left,
            RowFilter::Up => above,
            RowFilter::Average => ((above as u16 + left as u16) / 2) as u8,
            RowFilter::Paeth => paeth(above, diag, left),
        }
    }
}

impl std::fmt::Display for RowFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RowFilter::None => "none",
            RowFilter::Sub => "sub",
            RowFilter::Up => "up",
            RowFilter::Average => "average",
            RowFilter::Paeth => "paeth",
        };
        f.write_str(name)
    }
}

/// Paeth predictor with the tie order mandated by PNG: left, then above,
/// then diagonal.
#[inline]
fn paeth(above: u8, diag: u8, left: u8) -> u8 {
    let p = above as i16 - diag as i16;
    let q = left as i16 - diag as i16;
    let to_left = p.abs();
    let to_above = q.abs();
    let to_diag = (p + q).abs();
    if to_left <= to_above && to_left <= to_diag {
        left
    } else if to_above <= to_diag {
        above
    } else {
        diag
    }
}

/// Predict the byte at `offset` in the current row.
///
/// `left` is the committed byte of the previous pixel's same channel (the
/// quantizer has already rewritten it); above and diagonal come from the
/// previous row, which holds committed output once row 0 is done.
#[inline]
pub(crate) fn predict_channel(
    filter: RowFilter,
    above_row: Option<&[u8]>,
    offset: usize,
    bytes_per_pixel: usize,
    left: u8,
) -> u8 {
    let mut above = 0;
    let mut diag = 0;
    if let Some(row) = above_row {
        above = row[offset];
        if offset >= bytes_per_pixel {
            diag = row[offset - bytes_per_pixel];
        }
    }
    filter.predict(above, diag, left)
}
