use std::fmt;

use crate::image::{Bitmap, Ink};

pub mod inky;

pub use inky::InkyWhat;

/// A panel that shows finished frames. Calls come in the order `set_border`, `set_image`, `show`;
/// nothing reaches the glass before `show`.
pub trait Display {
    type Err: fmt::Display + fmt::Debug;

    /// Colour of the area around the active pixels.
    fn set_border(&mut self, border: Ink);

    /// Stage a frame. The bitmap must match [`Display::dimensions`].
    fn set_image(&mut self, image: &Bitmap) -> Result<(), Self::Err>;

    /// Push the staged frame to the panel and wait for the refresh to finish.
    fn show(&mut self) -> Result<(), Self::Err>;

    /// Get the dimensions of the display in pixels (width, height).
    fn dimensions(&self) -> (usize, usize);
}
