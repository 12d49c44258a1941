//! Median cut: partitions the active colors of an image into boxes of roughly equal pixel weight.

use tracing::{debug, trace};

use crate::{
    colorspace::QuantizedColor,
    cube::ColorCube,
    histogram::PixelCounts,
};

/// Splits `colors` into at most `max_cubes` cubes.
///
/// Cubes are split shallowest-first, each along the longest side of its bounding box at the
/// weighted median. `colors` is reordered in place and every returned cube owns a disjoint range
/// of it. Fewer than `max_cubes` cubes are returned when every cube is down to a single color.
pub fn split(
    colors: &mut [QuantizedColor],
    counts: &PixelCounts,
    total: u64,
    max_cubes: usize,
) -> Vec<ColorCube> {
    if colors.is_empty() || max_cubes == 0 {
        return vec![];
    }

    let mut cubes = Vec::with_capacity(max_cubes);
    cubes.push(ColorCube::new(colors, 0, colors.len() - 1, total, 0));

    while cubes.len() < max_cubes {
        let Some(splitpos) = select_cube(&cubes) else {
            debug!(cubes = cubes.len(), "every cube holds a single color, stopping early");
            break;
        };

        let (a, b) = split_cube(&cubes[splitpos], colors, counts);
        trace!(
            level = a.level,
            lower = a.len(),
            upper = b.len(),
            "split cube {splitpos}"
        );
        cubes[splitpos] = a;
        cubes.push(b);
    }

    cubes
}

/// Picks the splittable cube with the lowest level, preferring earlier cubes on ties.
fn select_cube(cubes: &[ColorCube]) -> Option<usize> {
    cubes
        .iter()
        .enumerate()
        .filter(|(_, cube)| !cube.is_leaf())
        .min_by_key(|(_, cube)| cube.level)
        .map(|(index, _)| index)
}

fn split_cube(
    cube: &ColorCube,
    colors: &mut [QuantizedColor],
    counts: &PixelCounts,
) -> (ColorCube, ColorCube) {
    let channel = cube.bounds.longest_channel();
    colors[cube.range()].sort_by_key(|color| color.channel(channel));

    // The median is the first position whose inclusion brings the lower half to at least half
    // of the cube's weight. Both halves end up non-empty since every color has a count of at
    // least 1 and a splittable cube holds at least two colors.
    let half = cube.count / 2;
    let mut weight = 0;
    let mut median = cube.lower;
    while median < cube.upper && weight < half {
        weight += u64::from(counts.count(colors[median]));
        median += 1;
    }
    debug_assert!(median > cube.lower && median <= cube.upper);

    let level = cube.level + 1;
    let a = ColorCube::new(colors, cube.lower, median - 1, weight, level);
    let b = ColorCube::new(colors, median, cube.upper, cube.count - weight, level);
    (a, b)
}
