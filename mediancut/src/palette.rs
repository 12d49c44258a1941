//! Palette reduction: turns the final cubes into palette colors and maps every color to one.

use tracing::debug;

use crate::{
    colorspace::{expand, Channel, QuantizedColor},
    cube::ColorCube,
    histogram::{PaletteIndex, PixelCounts},
};

/// How colors are assigned to palette entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingMode {
    /// Every color maps to the cube it ended up in after splitting.
    #[default]
    Fast,
    /// Every color maps to the nearest cube mean by squared RGB distance, measured in 5-bit
    /// units.
    Exact,
}

/// Computes the pixel-weighted mean color of each cube, in 5-bit units (truncated).
pub fn mean_colors(
    cubes: &[ColorCube],
    colors: &[QuantizedColor],
    counts: &PixelCounts,
) -> Vec<[u8; 3]> {
    cubes
        .iter()
        .map(|cube| {
            let mut sums = [0u64; 3];
            for &color in &colors[cube.range()] {
                let weight = u64::from(counts.count(color));
                for (sum, channel) in sums.iter_mut().zip(Channel::ALL) {
                    *sum += u64::from(color.channel(channel)) * weight;
                }
            }
            sums.map(|sum| (sum / cube.count) as u8)
        })
        .collect()
}

/// Widens 5-bit cube means to the 8-bit palette colors written to output.
pub fn representative_colors(means: &[[u8; 3]]) -> Vec<[u8; 3]> {
    means.iter().map(|mean| mean.map(expand)).collect()
}

fn distance_squared(a: [u8; 3], b: [u8; 3]) -> u32 {
    let dr = a[0].abs_diff(b[0]) as u32;
    let dg = a[1].abs_diff(b[1]) as u32;
    let db = a[2].abs_diff(b[2]) as u32;
    dr * dr + dg * dg + db * db
}

/// Finds the palette entry closest to `color`; both must be in the same units. An exact match
/// ends the search immediately, otherwise the first of several equally close entries wins.
pub fn find_closest_color(color: [u8; 3], palette: &[[u8; 3]]) -> usize {
    let (mut min_index, mut min_distance) = (0, u32::MAX);
    for (i, &entry) in palette.iter().enumerate() {
        let distance = distance_squared(color, entry);
        if distance == 0 {
            return i;
        }
        if distance < min_distance {
            min_distance = distance;
            min_index = i;
        }
    }
    min_index
}

/// Builds the palette and the color → palette index map for the final set of cubes.
///
/// Consumes the pixel counts; the returned index map lives in the same storage. `cubes` must hold
/// at most 256 cubes.
pub fn reduce(
    cubes: &[ColorCube],
    colors: &[QuantizedColor],
    counts: PixelCounts,
    mode: MappingMode,
) -> (Vec<[u8; 3]>, PaletteIndex) {
    debug_assert!(cubes.len() <= usize::from(u8::MAX) + 1);

    let means = mean_colors(cubes, colors, &counts);
    let mut index = counts.into_palette_index();

    match mode {
        MappingMode::Fast => {
            for (k, cube) in cubes.iter().enumerate() {
                for &color in &colors[cube.range()] {
                    index.assign(color, k as u8);
                }
            }
        }
        MappingMode::Exact => {
            for cube in cubes {
                for &color in &colors[cube.range()] {
                    let closest = find_closest_color(color.channels(), &means);
                    index.assign(color, closest as u8);
                }
            }
        }
    }
    debug!(colors = means.len(), ?mode, "assigned palette indices");

    (representative_colors(&means), index)
}
