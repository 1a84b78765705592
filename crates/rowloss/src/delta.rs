//! Channel-wise color deltas.
//!
//! Differences between working colors are always carried in a fixed
//! 4-lane vector (R, G, B, A) regardless of the pixel format, so the
//! error-diffusion buffer never needs to know how many channels the image
//! has. Narrow formats map into the lanes as follows: a gray difference
//! is replicated into lanes 0..=2 and alpha always lives in lane 3.

/// A signed per-lane color difference. Lane order is R, G, B, A.
pub type ColorDelta = [i16; 4];

/// Map a channel index of a `bytes_per_pixel`-wide format to its delta
/// lane. Only gray+alpha diverges: its alpha channel (index 1) occupies
/// lane 3.
#[inline]
pub(crate) fn delta_lane(bytes_per_pixel: usize, channel: usize) -> usize {
    if bytes_per_pixel == 2 && channel == 1 {
        3
    } else {
        channel
    }
}

/// Compute `here - back` lane-wise for the given pixel format.
///
/// `back` and `here` are working colors already stored at their delta-lane
/// positions (see [`delta_lane`]); gray values are replicated so that the
/// diffusion below treats a 1-channel image exactly like a neutral RGB
/// one.
pub fn color_difference(bytes_per_pixel: usize, back: &[i16; 4], here: &[i16; 4]) -> ColorDelta {
    match bytes_per_pixel {
        1 => {
            let d = here[0] - back[0];
            [d, d, d, 0]
        }
        2 => {
            let d = here[0] - back[0];
            [d, d, d, here[3] - back[3]]
        }
        3 => [
            here[0] - back[0],
            here[1] - back[1],
            here[2] - back[2],
            0,
        ],
        _ => [
            here[0] - back[0],
            here[1] - back[1],
            here[2] - back[2],
            here[3] - back[3],
        ],
    }
}

/// Squared Euclidean length of a delta, summed over all four lanes.
pub fn color_distance(difference: ColorDelta) -> u32 {
    let mut total = 0u32;
    for d in difference {
        total += (d as i32 * d as i32) as u32;
    }
    total
}
