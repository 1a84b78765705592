//! Optimizer working state.
//!
//! [`OptimizeState`] is the mutable working set carried across rows: the
//! committed bytes of the row in progress, the sliding error window, and
//! the running symbol histogram. The row driver keeps three of these
//! (base, best candidate, scratch) and moves between them with
//! allocation-free copies, so trying a `(filter, strength)` candidate is a
//! bounded memcpy rather than a full-image snapshot.

use crate::adaptive::adaptive_filter_for_row;
use crate::delta::{color_difference, color_distance, delta_lane};
use crate::diffuse::ErrorWindow;
use crate::error::OptimizeError;
use crate::filter::{predict_channel, RowFilter};
use crate::frequency::{OriginalFrequency, SymbolHistogram};

/// Cost and distortion of one accepted row pass.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RowPass {
    /// Huffman-proxy bit cost of the committed row, swept after the whole
    /// row is in place so every symbol is priced against the same
    /// histogram.
    pub cost: u64,
    /// Sum of squared color deltas introduced by quantization.
    pub distortion: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct OptimizeState {
    x: usize,
    y: usize,
    /// Committed output bytes for the row in progress; valid up to the
    /// write cursor.
    pixels: Vec<u8>,
    error: ErrorWindow,
    histogram: SymbolHistogram,
}

/// Strength for one channel. Green (and gray, which renders as green-ish
/// luminance) gets half the radius: the eye notices green shifts first.
#[inline]
fn channel_strength(bytes_per_pixel: usize, channel: usize, strength: u8) -> u8 {
    let sensitive = match bytes_per_pixel {
        2 => channel == 0,
        3 | 4 => channel == 1,
        _ => false,
    };
    if sensitive {
        strength / 2
    } else {
        strength
    }
}

impl OptimizeState {
    pub fn new(width: usize, bytes_per_pixel: usize) -> Result<Self, OptimizeError> {
        let len = width * bytes_per_pixel;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| OptimizeError::oom("row pixel buffer"))?;
        pixels.resize(len, 0);
        Ok(Self {
            x: 0,
            y: 0,
            pixels,
            error: ErrorWindow::new(width)?,
            histogram: SymbolHistogram::new()?,
        })
    }

    /// Allocation-free overwrite from a same-shaped state.
    pub fn copy_from(&mut self, other: &Self) {
        self.x = other.x;
        self.y = other.y;
        self.pixels.copy_from_slice(&other.pixels);
        self.error.copy_from(&other.error);
        self.histogram.copy_from(&other.histogram);
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn symbols_recorded(&self) -> u64 {
        self.histogram.total()
    }

    #[cfg(test)]
    pub fn histogram_consistent(&self) -> bool {
        self.histogram.counts_sum() == self.histogram.total()
    }

    /// Quantize every channel of the pixel at the cursor, commit the
    /// result, and diffuse the introduced error. Returns the squared
    /// color delta of this pixel.
    fn quantize_pixel(
        &mut self,
        rows: &[&mut [u8]],
        bytes_per_pixel: usize,
        original_freq: &OriginalFrequency,
        filter: RowFilter,
        strength: u8,
        bleed_divider: i16,
    ) -> u32 {
        let row: &[u8] = &rows[self.y];
        let above: Option<&[u8]> = if self.y > 0 { Some(&rows[self.y - 1]) } else { None };
        let base = self.x * bytes_per_pixel;
        let transparent = bytes_per_pixel % 2 == 0 && row[base + bytes_per_pixel - 1] == 0;

        let mut here = [0i16; 4];
        let mut back = [0i16; 4];

        for c in 0..bytes_per_pixel {
            let offset = base + c;
            let orig = row[offset];
            let left = if self.x > 0 {
                self.pixels[offset - bytes_per_pixel]
            } else {
                0
            };
            let lane = delta_lane(bytes_per_pixel, c);

            if transparent {
                // Invisible pixels pass through bit-exact. The symbol may
                // be expensive but artifacts behind soft alpha edges are
                // worse, and editors expect hidden color to survive.
                let predicted = predict_channel(filter, above, offset, bytes_per_pixel, left);
                self.pixels[offset] = orig;
                self.histogram.record(orig.wrapping_sub(predicted));
                here[lane] = orig as i16;
                back[lane] = orig as i16;
                continue;
            }

            let mut predicted = predict_channel(filter, above, offset, bytes_per_pixel, left) as i16;

            // The stored residual wraps modulo 256. Shift the predictor so
            // the residual of the source byte sits in [-128, 127]; the
            // symbol search then works in a contiguous signed range.
            let mut original = orig as i16 - predicted;
            if original < -128 {
                predicted -= 256;
                original = orig as i16 - predicted;
            } else if original > 127 {
                predicted += 256;
                original = orig as i16 - predicted;
            }

            let here_value = orig as i16 + self.error.pending(self.x, lane);
            let filtered = here_value - predicted;
            let strength = channel_strength(bytes_per_pixel, c, strength) as i16;

            // Assigned band: the aligned cell of width strength+1 that
            // contains the dithered target.
            let mut min;
            let mut max;
            if filtered < 0 {
                let magnitude = -filtered;
                max = -(magnitude - magnitude % (strength + 1));
                min = max - strength;
            } else {
                min = filtered - filtered % (strength + 1);
                max = min + strength;
            }

            // Committed bytes must stay representable.
            if min + predicted < 0 {
                min = -predicted;
            }
            if max + predicted > 255 {
                max = 255 - predicted;
            }
            if max < min {
                // The dithered target itself is out of range; collapse
                // onto the nearer boundary.
                if filtered + predicted > 255 {
                    min = 255 - predicted;
                    max = min;
                }
                if filtered + predicted < 0 {
                    min = -predicted;
                    max = min;
                }
            }

            // The band follows the dithered value, which may have drifted
            // into the next cell; the quality envelope is relative to the
            // source byte and wins.
            min = min.max(original - strength);
            max = max.min(original + strength);
            if max < min {
                min = original;
                max = original;
            }

            let mut found = false;
            let mut best_frequency = 0u32;
            let mut best_symbol = 0u8;
            let mut best_back = 0i16;
            for symbol in min..=max {
                let byte = symbol as u8;
                let frequency = self.histogram.count(byte);
                let mut take = false;
                if !found {
                    take = true;
                } else if best_frequency < frequency {
                    take = true;
                } else if best_frequency == frequency {
                    let best_original = original_freq.count(filter, best_symbol);
                    let this_original = original_freq.count(filter, byte);
                    if best_original < this_original {
                        take = true;
                    } else if best_original == this_original && symbol == original {
                        // Never drift off the source byte without a reason;
                        // flat regions stay put.
                        take = true;
                    }
                }
                if take {
                    found = true;
                    best_frequency = frequency;
                    best_symbol = byte;
                    best_back = symbol + predicted;
                }
            }
            debug_assert!(found, "quantization band is never empty");
            debug_assert!((0..=255).contains(&best_back));

            self.pixels[offset] = best_back as u8;
            self.histogram.record(best_symbol);
            here[lane] = here_value;
            back[lane] = best_back;
        }

        let difference = color_difference(bytes_per_pixel, &back, &here);
        self.error.diffuse(self.x, difference, bleed_divider);
        self.x += 1;
        color_distance(difference)
    }

    /// Run one `(filter, strength)` candidate across the current row.
    ///
    /// Returns `None` when `adaptive` is set and the finished row would
    /// make an MSAD encoder pick a different filter than the one the row
    /// was optimized for. On success the cursor advances to the next row
    /// and the error window slides down.
    #[allow(clippy::too_many_arguments)]
    pub fn run_row(
        &mut self,
        rows: &[&mut [u8]],
        bytes_per_pixel: usize,
        width: usize,
        original_freq: &OriginalFrequency,
        filter: RowFilter,
        strength: u8,
        bleed_divider: i16,
        adaptive: bool,
    ) -> Option<RowPass> {
        let mut distortion = 0u64;
        while self.x < width {
            distortion += self.quantize_pixel(
                rows,
                bytes_per_pixel,
                original_freq,
                filter,
                strength,
                bleed_divider,
            ) as u64;
        }

        let above: Option<&[u8]> = if self.y > 0 { Some(&rows[self.y - 1]) } else { None };
        if adaptive && adaptive_filter_for_row(above, &self.pixels, bytes_per_pixel) != filter {
            return None;
        }

        // Price the committed row in a second sweep: symbols early in the
        // row were chosen against a smaller histogram, so only the final
        // counts give comparable candidate costs.
        let mut cost = 0u64;
        for offset in 0..width * bytes_per_pixel {
            let left = if offset >= bytes_per_pixel {
                self.pixels[offset - bytes_per_pixel]
            } else {
                0
            };
            let predicted = predict_channel(filter, above, offset, bytes_per_pixel, left);
            let symbol = self.pixels[offset].wrapping_sub(predicted);
            cost += self.histogram.cost(symbol) as u64;
        }

        self.error.advance_row();
        self.x = 0;
        self.y += 1;
        Some(RowPass { cost, distortion })
    }
}
