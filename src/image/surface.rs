use dither::ditherer::Dither;
use piet::kurbo::{Point, Rect};
use piet::{Color, FontFamily, RenderContext, Text, TextLayout, TextLayoutBuilder};

use super::bitmap::{Bitmap, Ink};
use super::icons::Icon;
use crate::error::RenderError;

/// Where a piece of text hangs from its position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
}

/// Something the layout can draw onto and turn into a panel frame.
pub trait Surface: Sized {
    fn create(width: usize, height: usize, font_family: &str) -> Result<Self, RenderError>;

    fn draw_text(&mut self, text: &str, position: Point, anchor: Anchor, size: f64, ink: Ink);

    /// Like [`Surface::draw_text`], but shrinks the font until the text is at most `max_width`
    /// wide.
    fn draw_text_fitted(
        &mut self,
        text: &str,
        position: Point,
        anchor: Anchor,
        size: f64,
        max_width: f64,
        ink: Ink,
    );

    /// Paste a rasterized icon with its top-left corner at `position`.
    fn paste(&mut self, icon: &Icon, position: Point);

    fn into_bitmap(self) -> Result<Bitmap, RenderError>;
}

enum Operation {
    Text {
        text: String,
        position: Point,
        anchor: Anchor,
        size: f64,
        max_width: Option<f64>,
        ink: Ink,
    },
    Image {
        icon: Icon,
        position: Point,
    },
}

/// Draws with piet onto an offscreen bitmap, then reduces the result to the panel's palette.
///
/// Operations are queued and replayed in one go because the piet render context borrows the
/// bitmap target it draws into.
pub struct PietSurface {
    width: usize,
    height: usize,
    font_family: String,
    operations: Vec<Operation>,
}

impl Surface for PietSurface {
    fn create(width: usize, height: usize, font_family: &str) -> Result<Self, RenderError> {
        Ok(Self {
            width,
            height,
            font_family: font_family.to_string(),
            operations: Vec::new(),
        })
    }

    fn draw_text(&mut self, text: &str, position: Point, anchor: Anchor, size: f64, ink: Ink) {
        self.operations.push(Operation::Text {
            text: text.to_string(),
            position,
            anchor,
            size,
            max_width: None,
            ink,
        });
    }

    fn draw_text_fitted(
        &mut self,
        text: &str,
        position: Point,
        anchor: Anchor,
        size: f64,
        max_width: f64,
        ink: Ink,
    ) {
        self.operations.push(Operation::Text {
            text: text.to_string(),
            position,
            anchor,
            size,
            max_width: Some(max_width),
            ink,
        });
    }

    fn paste(&mut self, icon: &Icon, position: Point) {
        self.operations.push(Operation::Image {
            icon: icon.clone(),
            position,
        });
    }

    fn into_bitmap(self) -> Result<Bitmap, RenderError> {
        let mut device = piet_common::Device::new()?;
        let mut bitmap_target = device.bitmap_target(self.width, self.height, 1.)?;

        {
            let mut ctx = bitmap_target.render_context();
            ctx.clear(None, Color::WHITE);

            let font_family = ctx
                .text()
                .font_family(&self.font_family)
                .unwrap_or_else(|| {
                    log::debug!("Font {:?} not found, using serif", self.font_family);
                    FontFamily::SERIF
                });

            for operation in &self.operations {
                match operation {
                    Operation::Text {
                        text,
                        position,
                        anchor,
                        size,
                        max_width,
                        ink,
                    } => {
                        let mut layout = ctx
                            .text()
                            .new_text_layout(text.clone())
                            .font(font_family.clone(), *size)
                            .text_color(color(*ink))
                            .build()?;

                        if let Some(max_width) = max_width {
                            let natural = layout.size().width;
                            if natural > *max_width {
                                layout = ctx
                                    .text()
                                    .new_text_layout(text.clone())
                                    .font(font_family.clone(), size * max_width / natural)
                                    .text_color(color(*ink))
                                    .build()?;
                            }
                        }

                        let width = layout.size().width;
                        let x = match anchor {
                            Anchor::TopLeft => position.x,
                            Anchor::TopCenter => position.x - width / 2.,
                            Anchor::TopRight => position.x - width,
                        };
                        ctx.draw_text(&layout, (x, position.y));
                    }
                    Operation::Image { icon, position } => {
                        let image = ctx.make_image(
                            icon.width,
                            icon.height,
                            &icon.pixels[..],
                            piet::ImageFormat::RgbaPremul,
                        )?;
                        ctx.draw_image(
                            &image,
                            Rect::from_origin_size(
                                *position,
                                (icon.width as f64, icon.height as f64),
                            ),
                            piet::InterpolationMode::NearestNeighbor,
                        );
                    }
                }
            }

            ctx.finish()?;
        }

        let image = bitmap_target.to_image_buf(piet::ImageFormat::RgbaPremul)?;
        quantize(self.width, self.height, image.raw_pixels())
    }
}

fn color(ink: Ink) -> Color {
    match ink {
        Ink::White => Color::WHITE,
        Ink::Black => Color::BLACK,
        Ink::Red => Color::rgb8(0xFF, 0x00, 0x00),
    }
}

fn is_red(r: u8, g: u8, b: u8) -> bool {
    r > 0xA0 && g < 0x80 && b < 0x80
}

/// Reduce an opaque RGBA buffer to the panel palette: clearly red pixels keep the accent ink and
/// everything else is Floyd-Steinberg dithered to black and white.
pub(crate) fn quantize(width: usize, height: usize, rgba: &[u8]) -> Result<Bitmap, RenderError> {
    if rgba.len() != width * height * 4 {
        return Err(RenderError::Quantize(format!(
            "expected {} bytes for {}x{}, got {}",
            width * height * 4,
            width,
            height,
            rgba.len()
        )));
    }

    let red: Vec<bool> = rgba
        .chunks_exact(4)
        .map(|pixel| is_red(pixel[0], pixel[1], pixel[2]))
        .collect();

    // Red pixels count as white so their luminance doesn't bleed into the black plane.
    let luminance = dither::prelude::Img::new(
        rgba.chunks_exact(4).zip(&red).map(|(pixel, &red)| {
            if red {
                255.
            } else {
                dither::color::RGB(pixel[0] as f64, pixel[1] as f64, pixel[2] as f64)
                    .to_chroma_corrected_black_and_white()
            }
        }),
        width as u32,
    )
    .ok_or_else(|| RenderError::Quantize("empty image".to_string()))?;

    let quantize_1_bit = dither::create_quantize_n_bits_func(1)
        .map_err(|e| RenderError::Quantize(e.to_string()))?;

    let pixels = dither::ditherer::FLOYD_STEINBERG
        .dither(luminance, quantize_1_bit)
        .iter()
        .zip(&red)
        .map(|(level, &red)| match (red, *level < 128.) {
            (true, _) => Ink::Red,
            (false, true) => Ink::Black,
            (false, false) => Ink::White,
        })
        .collect();

    Bitmap::from_pixels(width, height, pixels)
        .ok_or_else(|| RenderError::Quantize("dithered image has the wrong size".to_string()))
}

/// Records what was drawn and paints rough boxes instead of glyphs, so layouts can be checked
/// without a font backend.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    pub width: usize,
    pub height: usize,
    pub texts: Vec<(String, Rect, Ink)>,
    pub icons: Vec<Rect>,
}

#[cfg(test)]
impl RecordingSurface {
    /// Approximate text box: half an em per character.
    fn text_box(text: &str, position: Point, anchor: Anchor, size: f64) -> Rect {
        let width = text.chars().count() as f64 * size / 2.;
        let x = match anchor {
            Anchor::TopLeft => position.x,
            Anchor::TopCenter => position.x - width / 2.,
            Anchor::TopRight => position.x - width,
        };
        Rect::from_origin_size((x, position.y), (width, size))
    }

    fn fill(bitmap: &mut Bitmap, area: Rect, ink: Ink) {
        let area = area.intersect(Rect::new(
            0.,
            0.,
            bitmap.width() as f64,
            bitmap.height() as f64,
        ));
        for y in area.y0 as usize..area.y1 as usize {
            for x in area.x0 as usize..area.x1 as usize {
                bitmap.set(x, y, ink);
            }
        }
    }
}

#[cfg(test)]
impl Surface for RecordingSurface {
    fn create(width: usize, height: usize, _font_family: &str) -> Result<Self, RenderError> {
        Ok(Self {
            width,
            height,
            ..Self::default()
        })
    }

    fn draw_text(&mut self, text: &str, position: Point, anchor: Anchor, size: f64, ink: Ink) {
        self.texts.push((
            text.to_string(),
            Self::text_box(text, position, anchor, size),
            ink,
        ));
    }

    fn draw_text_fitted(
        &mut self,
        text: &str,
        position: Point,
        anchor: Anchor,
        size: f64,
        max_width: f64,
        ink: Ink,
    ) {
        let natural = Self::text_box(text, position, anchor, size).width();
        let size = if natural > max_width {
            size * max_width / natural
        } else {
            size
        };
        self.draw_text(text, position, anchor, size, ink);
    }

    fn paste(&mut self, icon: &Icon, position: Point) {
        self.icons.push(Rect::from_origin_size(
            position,
            (icon.width as f64, icon.height as f64),
        ));
    }

    fn into_bitmap(self) -> Result<Bitmap, RenderError> {
        let mut bitmap = Bitmap::new(self.width, self.height);
        for area in &self.icons {
            Self::fill(&mut bitmap, *area, Ink::Black);
        }
        for (_, area, ink) in &self.texts {
            Self::fill(&mut bitmap, *area, *ink);
        }
        Ok(bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(pixels: &[[u8; 3]]) -> Vec<u8> {
        pixels
            .iter()
            .flat_map(|[r, g, b]| vec![*r, *g, *b, 0xFF])
            .collect()
    }

    #[test]
    fn quantize_keeps_pure_colours() {
        let bitmap = quantize(
            4,
            1,
            &rgba(&[[0xFF, 0xFF, 0xFF], [0x00, 0x00, 0x00], [0xFF, 0x00, 0x00], [0xFF, 0xFF, 0xFF]]),
        )
        .unwrap();

        assert_eq!(
            &[Ink::White, Ink::Black, Ink::Red, Ink::White],
            bitmap.pixels()
        );
    }

    #[test]
    fn quantize_dithers_grey_to_a_mix() {
        let bitmap = quantize(8, 8, &rgba(&[[0x80, 0x80, 0x80]; 64])).unwrap();

        assert_eq!(0, bitmap.count(Ink::Red));
        assert!(bitmap.count(Ink::Black) > 16);
        assert!(bitmap.count(Ink::White) > 16);
    }

    #[test]
    fn quantize_rejects_short_buffers() {
        assert!(quantize(2, 2, &[0xFF; 12]).is_err());
    }

    #[test]
    fn fitted_text_shrinks_to_width() {
        let mut surface = RecordingSurface::create(100, 100, "serif").unwrap();
        surface.draw_text_fitted("104°", Point::new(100., 0.), Anchor::TopRight, 60., 80., Ink::Red);
        surface.draw_text_fitted("7°", Point::new(100., 50.), Anchor::TopRight, 20., 80., Ink::Red);

        assert_eq!(Rect::new(20., 0., 100., 40.), surface.texts[0].1);
        assert_eq!(Rect::new(80., 50., 100., 70.), surface.texts[1].1);
    }

    #[test]
    fn recording_surface_anchors_text() {
        let mut surface = RecordingSurface::create(100, 50, "serif").unwrap();
        surface.draw_text("abcd", Point::new(50., 0.), Anchor::TopCenter, 10., Ink::Black);
        surface.draw_text("ab", Point::new(100., 20.), Anchor::TopRight, 10., Ink::Red);

        assert_eq!(Rect::new(40., 0., 60., 10.), surface.texts[0].1);
        assert_eq!(Rect::new(90., 20., 100., 30.), surface.texts[1].1);

        let bitmap = surface.into_bitmap().unwrap();
        assert_eq!(Some(Ink::Black), bitmap.get(45, 5));
        assert_eq!(Some(Ink::Red), bitmap.get(95, 25));
        assert_eq!(100, bitmap.count(Ink::Red));
    }
}
