//! Symbol frequency model.
//!
//! DEFLATE rewards reusing byte values it has already seen, so the
//! quantizer steers every post-filter byte toward symbols that are
//! already common. Two tables drive that choice: a running histogram of
//! everything committed so far, and a static table of what the untouched
//! image would have produced under each filter, used only to break ties.

use crate::error::OptimizeError;
use crate::filter::{predict_channel, RowFilter};

/// Number of distinct post-filter byte values.
pub(crate) const SYMBOL_COUNT: usize = 256;

/// Running histogram of committed post-filter bytes across the image.
#[derive(Debug, Clone)]
pub(crate) struct SymbolHistogram {
    counts: Vec<u32>,
    total: u64,
}

impl SymbolHistogram {
    pub fn new() -> Result<Self, OptimizeError> {
        let mut counts = Vec::new();
        counts
            .try_reserve_exact(SYMBOL_COUNT)
            .map_err(|_| OptimizeError::oom("symbol histogram"))?;
        counts.resize(SYMBOL_COUNT, 0);
        Ok(Self { counts, total: 0 })
    }

    #[inline]
    pub fn record(&mut self, symbol: u8) {
        self.counts[symbol as usize] += 1;
        self.total += 1;
    }

    #[inline]
    pub fn count(&self, symbol: u8) -> u32 {
        self.counts[symbol as usize]
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Cheap Huffman-length proxy: `floor(log2(total / count))`. Rare
    /// symbols cost more bits; a symbol making up half the stream costs
    /// one.
    #[inline]
    pub fn cost(&self, symbol: u8) -> u32 {
        let count = self.count(symbol).max(1) as u64;
        (self.total.max(1) / count).max(1).ilog2()
    }

    /// Overwrite this histogram with another. No allocation.
    pub fn copy_from(&mut self, other: &Self) {
        self.counts.copy_from_slice(&other.counts);
        self.total = other.total;
    }

    #[cfg(test)]
    pub fn counts_sum(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

/// Post-filter byte frequencies of the *unmodified* image under each of
/// the five filters. Computed once before optimization and read-only
/// afterwards; consulted only when the running histogram ties.
#[derive(Debug)]
pub(crate) struct OriginalFrequency {
    tables: Vec<u32>,
}

impl OriginalFrequency {
    /// Walk the original image once per filter and histogram the
    /// residual bytes it would produce.
    pub fn from_rows(rows: &[&mut [u8]], bytes_per_pixel: usize) -> Result<Self, OptimizeError> {
        let mut tables = Vec::new();
        tables
            .try_reserve_exact(RowFilter::ALL.len() * SYMBOL_COUNT)
            .map_err(|_| OptimizeError::oom("original frequency table"))?;
        tables.resize(RowFilter::ALL.len() * SYMBOL_COUNT, 0);

        for (f, filter) in RowFilter::ALL.into_iter().enumerate() {
            let table = &mut tables[f * SYMBOL_COUNT..(f + 1) * SYMBOL_COUNT];
            for y in 0..rows.len() {
                let row: &[u8] = &rows[y];
                let above: Option<&[u8]> = if y > 0 { Some(&rows[y - 1]) } else { None };
                for offset in 0..row.len() {
                    let left = if offset >= bytes_per_pixel {
                        row[offset - bytes_per_pixel]
                    } else {
                        0
                    };
                    let predicted = predict_channel(filter, above, offset, bytes_per_pixel, left);
                    let filtered = row[offset].wrapping_sub(predicted);
                    table[filtered as usize] += 1;
                }
            }
        }

        Ok(Self { tables })
    }

    #[inline]
    pub fn count(&self, filter: RowFilter, symbol: u8) -> u32 {
        self.tables[filter.png_id() as usize * SYMBOL_COUNT + symbol as usize]
    }
}
