//! The quantization pipeline: histogram, median cut, palette reduction and remapping.

use std::path::Path;

use image::{Rgb, RgbImage};
use tracing::debug;

use crate::{
    codec,
    colorspace::QuantizedColor,
    error::Error,
    histogram::{Histogram, PaletteIndex},
    image::Image,
    median_cut,
    palette::{self, MappingMode},
};

/// The largest palette an 8-bit index plane can address.
pub const MAX_COLORS: usize = 256;

/// An image made of palette indices, along with its palette.
///
/// Every index is in bounds of the palette. Only the quantizer builds these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedImage {
    indices: Image<u8>,
    palette: Vec<[u8; 3]>,
}

impl PalettedImage {
    pub(crate) fn from_parts(indices: Image<u8>, palette: Vec<[u8; 3]>) -> Self {
        debug_assert!(indices
            .pixels
            .iter()
            .all(|&index| usize::from(index) < palette.len()));
        Self { indices, palette }
    }

    pub fn indices(&self) -> &Image<u8> {
        &self.indices
    }

    /// `[R, G, B]` colors, in cube order.
    pub fn palette(&self) -> &[[u8; 3]] {
        &self.palette
    }

    pub fn width(&self) -> usize {
        self.indices.width
    }

    pub fn height(&self) -> usize {
        self.indices.height
    }

    pub fn color_at(&self, x: usize, y: usize) -> [u8; 3] {
        self.palette[usize::from(self.indices[(x, y)])]
    }

    /// Expands the image back to true color.
    pub fn to_rgb(&self) -> Result<RgbImage, Error> {
        let too_large = || Error::TooLarge {
            width: self.width(),
            height: self.height(),
        };
        let width = u32::try_from(self.width()).map_err(|_| too_large())?;
        let height = u32::try_from(self.height()).map_err(|_| too_large())?;
        let pixels = self
            .indices
            .pixels
            .iter()
            .flat_map(|&index| self.palette[usize::from(index)])
            .collect();
        RgbImage::from_vec(width, height, pixels).ok_or_else(too_large)
    }
}

/// Remaps every pixel of `image` through the color → palette index map.
pub fn materialize(image: &RgbImage, index: &PaletteIndex, palette: Vec<[u8; 3]>) -> PalettedImage {
    let pixels = image
        .pixels()
        .map(|&Rgb(pixel)| index.get(QuantizedColor::from_array(pixel)))
        .collect();
    let indices = Image {
        width: image.width() as usize,
        height: image.height() as usize,
        pixels,
    };
    PalettedImage::from_parts(indices, palette)
}

/// Median cut quantizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    max_colors: usize,
    mode: MappingMode,
}

impl Quantizer {
    /// Creates a quantizer producing at most `max_colors` colors (`1..=256`).
    pub fn new(max_colors: usize, mode: MappingMode) -> Result<Self, Error> {
        if !(1..=MAX_COLORS).contains(&max_colors) {
            return Err(Error::InvalidColorCount(max_colors));
        }
        Ok(Self { max_colors, mode })
    }

    /// Quantizes a decoded image. The palette may come out smaller than requested when the image
    /// has fewer distinct colors.
    pub fn quantize(&self, image: &RgbImage) -> Result<PalettedImage, Error> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::EmptyImage);
        }

        let Histogram {
            counts,
            mut colors,
            total,
        } = Histogram::from_image(image);
        let cubes = median_cut::split(&mut colors, &counts, total, self.max_colors);
        debug!(
            requested = self.max_colors,
            mode = ?self.mode,
            cubes = cubes.len(),
            "median cut complete"
        );
        let (palette, index) = palette::reduce(&cubes, &colors, counts, self.mode);

        Ok(materialize(image, &index, palette))
    }

    /// Decodes an encoded image and quantizes it.
    pub fn quantize_bytes(&self, bytes: &[u8]) -> Result<PalettedImage, Error> {
        self.quantize(&codec::decode(bytes)?)
    }

    pub fn quantize_file(&self, path: &Path) -> Result<PalettedImage, Error> {
        self.quantize(&codec::decode_file(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_color_counts() {
        assert!(matches!(
            Quantizer::new(0, MappingMode::Fast),
            Err(Error::InvalidColorCount(0))
        ));
        assert!(matches!(
            Quantizer::new(257, MappingMode::Exact),
            Err(Error::InvalidColorCount(257))
        ));
        assert!(Quantizer::new(1, MappingMode::Fast).is_ok());
        assert!(Quantizer::new(256, MappingMode::Fast).is_ok());
    }

    #[test]
    fn rejects_empty_images() {
        let quantizer = Quantizer::new(4, MappingMode::Fast).unwrap();
        assert!(matches!(
            quantizer.quantize(&RgbImage::new(0, 3)),
            Err(Error::EmptyImage)
        ));
    }

    #[test]
    fn black_and_white_checkerboard() {
        let image = RgbImage::from_vec(
            2,
            2,
            [[0, 0, 0], [255, 255, 255], [255, 255, 255], [0, 0, 0]].concat(),
        )
        .unwrap();
        for mode in [MappingMode::Fast, MappingMode::Exact] {
            let quantized = Quantizer::new(2, mode).unwrap().quantize(&image).unwrap();

            assert_eq!(quantized.palette(), [[0, 0, 0], [255, 255, 255]]);
            for (x, y, &Rgb(pixel)) in image.enumerate_pixels() {
                assert_eq!(quantized.color_at(x as usize, y as usize), pixel);
            }
        }
    }

    #[test]
    fn single_color_stops_early() {
        let image = RgbImage::from_pixel(4, 4, Rgb([90, 180, 45]));
        let quantized = Quantizer::new(16, MappingMode::Fast)
            .unwrap()
            .quantize(&image)
            .unwrap();

        assert_eq!(quantized.palette().len(), 1);
        assert_eq!(quantized.palette()[0], QuantizedColor::pack(90, 180, 45).to_array());
        assert!(quantized.indices().pixels.iter().all(|&index| index == 0));
    }

    #[test]
    fn quantizes_encoded_bytes() {
        let image = RgbImage::from_fn(10, 10, |x, y| Rgb([(x * 25) as u8, (y * 25) as u8, 0]));
        let source = Quantizer::new(256, MappingMode::Fast)
            .unwrap()
            .quantize(&image)
            .unwrap();
        let bytes = codec::encode_png(&source).unwrap();

        let quantized = Quantizer::new(4, MappingMode::Exact)
            .unwrap()
            .quantize_bytes(&bytes)
            .unwrap();
        assert_eq!((quantized.width(), quantized.height()), (10, 10));
        assert_eq!(quantized.palette().len(), 4);
    }

    #[test]
    fn to_rgb_expands_palette() {
        let paletted = PalettedImage::from_parts(
            Image {
                width: 2,
                height: 1,
                pixels: vec![1, 0],
            },
            vec![[1, 2, 3], [4, 5, 6]],
        );
        let rgb = paletted.to_rgb().unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([4, 5, 6]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn to_rgb_rejects_dimensions_beyond_u32() {
        let paletted = PalettedImage::from_parts(
            Image {
                width: usize::MAX,
                height: 0,
                pixels: vec![],
            },
            vec![[0, 0, 0]],
        );
        assert!(matches!(paletted.to_rgb(), Err(Error::TooLarge { .. })));
    }

    #[test]
    fn quantized_indices_stay_within_palette() {
        let image = RgbImage::from_fn(20, 20, |x, y| Rgb([(x * 13) as u8, (y * 13) as u8, 200]));
        for mode in [MappingMode::Fast, MappingMode::Exact] {
            let quantized = Quantizer::new(5, mode).unwrap().quantize(&image).unwrap();
            let palette = quantized.palette();
            assert!(quantized
                .indices()
                .pixels
                .iter()
                .all(|&index| usize::from(index) < palette.len()));
            let rgb = quantized.to_rgb().unwrap();
            for (x, y, &Rgb(pixel)) in rgb.enumerate_pixels() {
                assert_eq!(quantized.color_at(x as usize, y as usize), pixel);
            }
        }
    }
}
