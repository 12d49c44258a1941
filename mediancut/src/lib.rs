//! Median cut color quantization.
//!
//! Reduces a true-color image to a palette of at most 256 colors:
//!
//! 1. every pixel is bucketed into a 15-bit color space ([`colorspace`]) and counted
//!    ([`histogram`]),
//! 2. the occurring colors are split into boxes of roughly equal pixel weight ([`median_cut`]),
//! 3. each box becomes one palette entry and every color is mapped to an entry ([`palette`]),
//! 4. the image is rewritten as palette indices ([`quantize`]).
//!
//! ```no_run
//! use mediancut::{MappingMode, Quantizer};
//!
//! # fn main() -> Result<(), mediancut::Error> {
//! let quantizer = Quantizer::new(16, MappingMode::Exact)?;
//! let paletted = quantizer.quantize_file("input.jpg".as_ref())?;
//! mediancut::encode_png_to_file(&paletted, "output.png".as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod colorspace;
pub mod cube;
pub mod error;
pub mod histogram;
pub mod image;
pub mod median_cut;
pub mod palette;
pub mod quantize;

pub use crate::{
    codec::{
        decode, decode_file, encode_gif, encode_gif_to_file, encode_png, encode_png_to_file,
    },
    error::Error,
    palette::MappingMode,
    quantize::{PalettedImage, Quantizer, MAX_COLORS},
};
