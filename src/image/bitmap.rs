/// The three colours a red/black/white e-paper panel can show. The discriminants match the
/// panel's channel numbering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Ink {
    White = 0,
    /// Primary ink, used for labels and icons.
    Black = 1,
    /// Accent ink, used for temperatures.
    Red = 2,
}

/// A finished, palette-indexed frame, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<Ink>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Ink::White; width * height],
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Ink>) -> Option<Self> {
        if pixels.len() == width * height {
            Some(Self {
                width,
                height,
                pixels,
            })
        } else {
            None
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[cfg(test)]
    pub(crate) fn get(&self, x: usize, y: usize) -> Option<Ink> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, ink: Ink) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = ink;
        }
    }

    pub fn pixels(&self) -> &[Ink] {
        &self.pixels[..]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Ink]> {
        self.pixels.chunks(self.width.max(1))
    }

    /// Turn the frame upside down, for panels mounted inverted.
    pub fn rotate_180(mut self) -> Self {
        self.pixels.reverse();
        self
    }

    pub fn count(&self, ink: Ink) -> usize {
        self.pixels.iter().filter(|&&pixel| pixel == ink).count()
    }
}
