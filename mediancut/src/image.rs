//! Image utilities.

use std::ops::Index;

/// A row-major 2-D buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image<T> {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<T>,
}

impl<T> Image<T>
where
    T: Clone,
{
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
        }
    }
}

impl<T> Image<T> {
    pub fn pixel_index(&self, (x, y): (usize, usize)) -> usize {
        x + y * self.width
    }
}

impl<T> Index<(usize, usize)> for Image<T> {
    type Output = T;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.pixels[self.pixel_index(index)]
    }
}
