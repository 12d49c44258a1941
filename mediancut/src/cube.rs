//! Color cubes: ranges of the active color list together with their bounding box.

use std::ops::RangeInclusive;

use crate::colorspace::{Channel, QuantizedColor};

/// Tight bounding box over a set of quantized colors, in 5-bit channel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl Bounds {
    pub fn of(colors: &[QuantizedColor]) -> Self {
        let mut min = [u8::MAX; 3];
        let mut max = [0; 3];
        for &color in colors {
            for (i, channel) in Channel::ALL.into_iter().enumerate() {
                let value = color.channel(channel);
                min[i] = min[i].min(value);
                max[i] = max[i].max(value);
            }
        }
        Self { min, max }
    }

    pub fn extent(&self, channel: Channel) -> u8 {
        let i = channel as usize;
        self.max[i] - self.min[i]
    }

    /// The channel along which the box is longest. Ties go to red, then green.
    pub fn longest_channel(&self) -> Channel {
        let [r, g, b] = Channel::ALL.map(|channel| self.extent(channel));
        if r >= g && r >= b {
            Channel::Red
        } else if g >= b {
            Channel::Green
        } else {
            Channel::Blue
        }
    }
}

/// A box in color space, represented as an inclusive range `lower..=upper` into the shared active
/// color list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCube {
    pub lower: usize,
    pub upper: usize,
    /// Sum of the pixel counts of every color in range.
    pub count: u64,
    /// Split depth; the root cube is at level 0.
    pub level: u32,
    pub bounds: Bounds,
}

impl ColorCube {
    pub fn new(
        colors: &[QuantizedColor],
        lower: usize,
        upper: usize,
        count: u64,
        level: u32,
    ) -> Self {
        let mut cube = Self {
            lower,
            upper,
            count,
            level,
            bounds: Bounds {
                min: [0; 3],
                max: [0; 3],
            },
        };
        cube.shrink(colors);
        cube
    }

    pub fn range(&self) -> RangeInclusive<usize> {
        self.lower..=self.upper
    }

    /// Number of distinct colors in the cube.
    pub fn len(&self) -> usize {
        self.upper - self.lower + 1
    }

    /// A cube holding a single color cannot be split.
    pub fn is_leaf(&self) -> bool {
        self.lower == self.upper
    }

    /// Recomputes the bounding box from the colors currently in range.
    pub fn shrink(&mut self, colors: &[QuantizedColor]) {
        self.bounds = Bounds::of(&colors[self.range()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_tight() {
        let colors = [
            QuantizedColor::pack(16, 200, 40),
            QuantizedColor::pack(80, 8, 40),
            QuantizedColor::pack(24, 64, 255),
        ];
        let bounds = Bounds::of(&colors);
        assert_eq!(bounds.min, [2, 1, 5]);
        assert_eq!(bounds.max, [10, 25, 31]);
        assert_eq!(bounds.extent(Channel::Green), 24);
        assert_eq!(bounds.longest_channel(), Channel::Blue);
    }

    #[test]
    fn longest_channel_prefers_red_then_green() {
        let equal = Bounds {
            min: [0; 3],
            max: [4, 4, 4],
        };
        assert_eq!(equal.longest_channel(), Channel::Red);

        let green_blue = Bounds {
            min: [0; 3],
            max: [1, 4, 4],
        };
        assert_eq!(green_blue.longest_channel(), Channel::Green);
    }

    #[test]
    fn shrink_follows_range() {
        let colors = [
            QuantizedColor::pack(0, 0, 0),
            QuantizedColor::pack(64, 64, 64),
            QuantizedColor::pack(128, 128, 128),
        ];
        let mut cube = ColorCube::new(&colors, 0, 2, 3, 0);
        assert_eq!(cube.bounds.max, [16, 16, 16]);
        assert_eq!(cube.len(), 3);

        cube.lower = 1;
        cube.upper = 1;
        cube.shrink(&colors);
        assert!(cube.is_leaf());
        assert_eq!(cube.bounds.min, [8, 8, 8]);
        assert_eq!(cube.bounds.max, [8, 8, 8]);
    }
}
