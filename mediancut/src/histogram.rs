//! Color histogram over the quantized color space.
//!
//! The same 32768-slot table first holds pixel counts and, once the palette is known, the
//! palette index assigned to each color. The two phases are separate types ([`PixelCounts`] and
//! [`PaletteIndex`]) sharing one allocation, so counts cannot be read after assignment begins.

use std::marker::PhantomData;

use image::{Rgb, RgbImage};
use tracing::debug;

use crate::colorspace::{QuantizedColor, COLOR_COUNT};

/// Phase marker for a table holding pixel counts.
#[derive(Debug)]
pub enum Counts {}

/// Phase marker for a table holding palette indices.
#[derive(Debug)]
pub enum Indices {}

/// A dense table with one slot per quantized color.
#[derive(Debug)]
pub struct ColorTable<P> {
    slots: Vec<u32>,
    phase: PhantomData<P>,
}

pub type PixelCounts = ColorTable<Counts>;
pub type PaletteIndex = ColorTable<Indices>;

impl PixelCounts {
    fn zeroed() -> Self {
        Self {
            slots: vec![0; COLOR_COUNT],
            phase: PhantomData,
        }
    }

    /// Number of pixels of the given color.
    pub fn count(&self, color: QuantizedColor) -> u32 {
        self.slots[color.index()]
    }

    /// Ends the counting phase, reusing the storage for the color → palette index map.
    ///
    /// Slots of colors that never occurred in the image are zero; every occurring color must be
    /// [assigned](PaletteIndex::assign) before the map is used.
    pub fn into_palette_index(self) -> PaletteIndex {
        ColorTable {
            slots: self.slots,
            phase: PhantomData,
        }
    }
}

impl PaletteIndex {
    pub fn assign(&mut self, color: QuantizedColor, index: u8) {
        self.slots[color.index()] = u32::from(index);
    }

    /// The palette index assigned to `color`.
    pub fn get(&self, color: QuantizedColor) -> u8 {
        // Only values written by `assign` or zeroes are ever stored in this phase.
        self.slots[color.index()] as u8
    }
}

/// The result of scanning an image: per-color pixel counts plus the list of colors that occur.
#[derive(Debug)]
pub struct Histogram {
    pub counts: PixelCounts,
    /// Every color with a non-zero count, in ascending order. The splitter permutes this list in
    /// place; cubes own disjoint ranges of it.
    pub colors: Vec<QuantizedColor>,
    /// Total pixel weight, i.e. the number of pixels in the image.
    pub total: u64,
}

impl Histogram {
    pub fn from_image(image: &RgbImage) -> Self {
        let mut counts = PixelCounts::zeroed();
        for &Rgb(pixel) in image.pixels() {
            counts.slots[QuantizedColor::from_array(pixel).index()] += 1;
        }

        let mut colors = vec![];
        let mut total = 0;
        for (index, &count) in counts.slots.iter().enumerate() {
            if count != 0 {
                colors.push(QuantizedColor::from_index(index));
                total += u64::from(count);
            }
        }
        debug!(
            distinct_colors = colors.len(),
            pixels = total,
            "built histogram"
        );

        Self {
            counts,
            colors,
            total,
        }
    }
}
