//! Decoding of source images and encoding of paletted output.

use std::{borrow::Cow, path::Path};

use image::RgbImage;
use png::{BitDepth, ColorType};

use crate::{error::Error, quantize::PalettedImage};

/// Decodes any format supported by the `image` crate. Alpha is discarded.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, Error> {
    let image = image::load_from_memory(bytes).map_err(Error::Decode)?;
    Ok(image.to_rgb8())
}

pub fn decode_file(path: &Path) -> Result<RgbImage, Error> {
    let image = image::open(path).map_err(Error::Decode)?;
    Ok(image.to_rgb8())
}

fn flat_palette(palette: &[[u8; 3]]) -> Vec<u8> {
    palette.iter().copied().flatten().collect()
}

fn too_large(image: &PalettedImage) -> Error {
    Error::TooLarge {
        width: image.width(),
        height: image.height(),
    }
}

/// Encodes the image as an indexed-color PNG whose palette is the image's palette.
pub fn encode_png(image: &PalettedImage) -> Result<Vec<u8>, Error> {
    let width = u32::try_from(image.width()).map_err(|_| too_large(image))?;
    let height = u32::try_from(image.height()).map_err(|_| too_large(image))?;

    let mut output = vec![];
    {
        let mut encoder = png::Encoder::new(&mut output, width, height);
        encoder.set_color(ColorType::Indexed);
        encoder.set_depth(BitDepth::Eight);
        encoder.set_palette(flat_palette(image.palette()));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.indices().pixels)?;
        writer.finish()?;
    }
    Ok(output)
}

pub fn encode_png_to_file(image: &PalettedImage, path: &Path) -> Result<(), Error> {
    std::fs::write(path, encode_png(image)?)?;
    Ok(())
}

/// Encodes the image as a single-frame GIF with the palette as its global color table.
pub fn encode_gif(image: &PalettedImage) -> Result<Vec<u8>, Error> {
    let width = u16::try_from(image.width()).map_err(|_| too_large(image))?;
    let height = u16::try_from(image.height()).map_err(|_| too_large(image))?;

    let mut output = vec![];
    {
        let palette = flat_palette(image.palette());
        let mut encoder = gif::Encoder::new(&mut output, width, height, &palette)?;
        let frame = gif::Frame {
            width,
            height,
            buffer: Cow::Borrowed(&image.indices().pixels),
            ..Default::default()
        };
        encoder.write_frame(&frame)?;
    }
    Ok(output)
}

pub fn encode_gif_to_file(image: &PalettedImage, path: &Path) -> Result<(), Error> {
    std::fs::write(path, encode_gif(image)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;
    use crate::image::Image;

    fn sample() -> PalettedImage {
        PalettedImage::from_parts(
            Image {
                width: 3,
                height: 2,
                pixels: vec![0, 1, 2, 2, 1, 0],
            },
            vec![[255, 0, 0], [0, 255, 0], [0, 0, 255]],
        )
    }

    #[test]
    fn png_keeps_pixels() {
        let bytes = encode_png(&sample()).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(decoded.get_pixel(2, 0), &Rgb([0, 0, 255]));
        assert_eq!(decoded.get_pixel(1, 1), &Rgb([0, 255, 0]));
    }

    #[test]
    fn png_is_indexed() {
        let bytes = encode_png(&sample()).unwrap();
        let decoder = png::Decoder::new(bytes.as_slice());
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!(info.color_type, ColorType::Indexed);
        assert_eq!(info.palette.as_deref(), Some(&flat_palette(sample().palette())[..]));
    }

    #[test]
    fn gif_keeps_pixels() {
        let bytes = encode_gif(&sample()).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(decoded.get_pixel(0, 1), &Rgb([0, 0, 255]));
    }

    #[test]
    fn gif_rejects_oversized_images() {
        let image = PalettedImage::from_parts(Image::filled(70_000, 1, 0), vec![[0, 0, 0]]);
        assert!(matches!(encode_gif(&image), Err(Error::TooLarge { .. })));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(decode(b"not an image"), Err(Error::Decode(_))));
    }
}
