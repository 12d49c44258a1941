use image::ImageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error while decoding image: {0}")]
    Decode(#[source] ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PNG encoding error: {0}")]
    PngEncode(#[from] png::EncodingError),
    #[error("GIF encoding error: {0}")]
    GifEncode(#[from] gif::EncodingError),

    #[error("Palette size must be between 1 and 256 colors (got {0})")]
    InvalidColorCount(usize),
    #[error("Image has no pixels")]
    EmptyImage,
    #[error("Image of size {width}x{height} is too big for the output format")]
    TooLarge { width: usize, height: usize },
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by a failure while
    /// producing output.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::Decode(_)
            | Self::InvalidColorCount(_)
            | Self::EmptyImage
            | Self::TooLarge { .. } => true,
            Self::Io(_) | Self::PngEncode(_) | Self::GifEncode(_) => false,
        }
    }
}
