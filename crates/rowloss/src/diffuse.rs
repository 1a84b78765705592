//! Error diffusion.
//!
//! Quantization error is spread over unprocessed neighbours with a
//! Sierra-shaped three-row stencil. The window keeps only the rows the
//! stencil can reach, sliding down the image as rows are committed, and is
//! padded on both sides so the stencil never needs bounds checks at the
//! row ends.

use crate::delta::ColorDelta;
use crate::error::OptimizeError;

/// Number of rows the stencil reaches, including the current one.
pub const DITHER_ROWS: usize = 3;

/// Horizontal extent of the stencil in columns.
pub const FILTER_WIDTH: usize = 5;

/// Sliding window of pending color error.
///
/// Row 0 holds error destined for the rest of the current row, rows 1 and
/// 2 for the next two rows. Columns are offset by `FILTER_WIDTH / 2`: the
/// error pending for pixel `x` lives at column `x + 2`, which leaves two
/// padding columns on each side for the stencil's widest reach.
#[derive(Debug, Clone)]
pub(crate) struct ErrorWindow {
    cells: Vec<ColorDelta>,
    stride: usize,
}

impl ErrorWindow {
    pub fn new(width: usize) -> Result<Self, OptimizeError> {
        let stride = width + FILTER_WIDTH - 1;
        let len = DITHER_ROWS * stride;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| OptimizeError::oom("error window"))?;
        cells.resize(len, [0; 4]);
        Ok(Self { cells, stride })
    }

    /// Error waiting for pixel `x` of the current row, one lane.
    #[inline]
    pub fn pending(&self, x: usize, lane: usize) -> i16 {
        self.cells[x + FILTER_WIDTH / 2][lane]
    }

    /// Spread `difference` from the just-committed pixel at column `x`.
    ///
    /// The stencil, centred on the pixel (`d`), with weights out of 32:
    ///
    /// ```text
    ///     .  .  d  3  .
    ///     2  4  5  4  2
    ///     .  2  3  2  .
    /// ```
    ///
    /// The shares are peeled off the running residual as floor divisions
    /// (2/16, then 3/8 of the rest, and so on), with whatever remains
    /// going to the immediate right neighbour, so the total distributed
    /// stays equal to `difference / bleed_divider` despite the integer
    /// truncation. The uneven share sizes this produces are part of the
    /// output contract.
    pub fn diffuse(&mut self, x: usize, difference: ColorDelta, bleed_divider: i16) {
        let stride = self.stride;
        for (lane, &delta) in difference.iter().enumerate() {
            let mut d = delta / bleed_divider;

            let twos = d / 16;
            d -= twos * 4;
            self.cells[stride + x][lane] += twos;
            self.cells[stride + x + 4][lane] += twos;
            self.cells[2 * stride + x + 1][lane] += twos;
            self.cells[2 * stride + x + 3][lane] += twos;

            let threes = d / 8;
            d -= threes * 2;
            self.cells[x + 4][lane] += threes;
            self.cells[2 * stride + x + 2][lane] += threes;

            let fours = d * 2 / 9;
            d -= fours * 2;
            self.cells[stride + x + 1][lane] += fours;
            self.cells[stride + x + 3][lane] += fours;

            let five = d / 2;
            d -= five;
            self.cells[stride + x + 2][lane] += five;

            self.cells[x + 3][lane] += d;
        }
    }

    /// Slide the window down one row: row 1 becomes the current row and a
    /// zeroed row is appended at the bottom.
    pub fn advance_row(&mut self) {
        self.cells.copy_within(self.stride.., 0);
        let tail = (DITHER_ROWS - 1) * self.stride;
        self.cells[tail..].fill([0; 4]);
    }

    /// Overwrite this window with another of the same width. No
    /// allocation; used for candidate snapshots inside the row loop.
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert_eq!(self.stride, other.stride);
        self.cells.copy_from_slice(&other.cells);
    }
}
