//! Turns a [`WeatherSnapshot`] into a panel frame.

use piet::kurbo::{Point, Rect};

use crate::normalize::{CurrentSummary, ForecastSlot, IconCategory, WeatherSnapshot};

pub mod bitmap;
pub mod icons;
pub mod surface;

pub use bitmap::{Bitmap, Ink};
pub use icons::{Icon, IconLibrary};
pub use surface::{Anchor, PietSurface, Surface};

use crate::error::RenderError;

/// Fixed layout of the 400x300 panel: a full-width banner on top and three cards below it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CardGeometry {
    pub width: usize,
    pub height: usize,
    pub banner_height: f64,
    pub card_width: f64,
    pub card_height: f64,
    pub card_x: [f64; 3],
    pub card_y: f64,
}

pub const GEOMETRY: CardGeometry = CardGeometry {
    width: 400,
    height: 300,
    banner_height: 85.,
    card_width: 130.,
    card_height: 210.,
    card_x: [0., 135., 270.],
    card_y: 90.,
};

impl CardGeometry {
    #[cfg(test)]
    pub(crate) fn canvas(&self) -> Rect {
        Rect::new(0., 0., self.width as f64, self.height as f64)
    }

    pub fn banner(&self) -> Rect {
        Rect::new(0., 0., self.width as f64, self.banner_height)
    }

    pub fn card(&self, index: usize) -> Rect {
        Rect::from_origin_size(
            (self.card_x[index], self.card_y),
            (self.card_width, self.card_height),
        )
    }

    /// Left column of the banner, holding the timestamp and subtitle.
    pub fn banner_label(&self) -> Rect {
        Rect::new(10., 0., 205., self.banner_height)
    }

    /// Box the current temperature is right-aligned in, between the label column and the icon.
    pub fn banner_temperature(&self) -> Rect {
        Rect::new(215., 6., 300., 66.)
    }
}

const BANNER_SUBTITLE: &str = "Currently (F)";
const CARD_PADDING: f64 = 5.;

/// Render `snapshot` and turn the result upside down, ready for the inverted panel.
pub fn render<S: Surface>(
    snapshot: &WeatherSnapshot,
    icons: &IconLibrary,
    font_family: &str,
) -> Result<Bitmap, RenderError> {
    let mut surface = S::create(GEOMETRY.width, GEOMETRY.height, font_family)?;
    compose(&mut surface, snapshot, icons);

    let bitmap = surface.into_bitmap()?;
    log::debug!(
        "Rendered {}x{} frame: {} black, {} red",
        bitmap.width(),
        bitmap.height(),
        bitmap.count(Ink::Black),
        bitmap.count(Ink::Red)
    );

    Ok(bitmap.rotate_180())
}

/// Draw the banner and the three forecast cards.
pub fn compose<S: Surface>(surface: &mut S, snapshot: &WeatherSnapshot, icons: &IconLibrary) {
    draw_banner(surface, &snapshot.current, icons, GEOMETRY.banner());

    for (index, slot) in snapshot.forecast.iter().enumerate() {
        draw_card(surface, slot, icons, GEOMETRY.card(index));
    }
}

fn draw_banner<S: Surface>(
    surface: &mut S,
    current: &CurrentSummary,
    icons: &IconLibrary,
    position: Rect,
) {
    let label = GEOMETRY.banner_label();
    surface.draw_text_fitted(
        &current.label,
        (label.x0, position.y0 + 8.).into(),
        Anchor::TopLeft,
        20.,
        label.width(),
        Ink::Black,
    );
    surface.draw_text_fitted(
        BANNER_SUBTITLE,
        (label.x0, position.y0 + 40.).into(),
        Anchor::TopLeft,
        16.,
        label.width(),
        Ink::Black,
    );

    // Grows to the left from the icon, shrinking rather than crossing into the label column.
    let temperature = GEOMETRY.banner_temperature();
    surface.draw_text_fitted(
        &format_temperature(current.temperature),
        (temperature.x1, temperature.y0).into(),
        Anchor::TopRight,
        temperature.height(),
        temperature.width(),
        Ink::Red,
    );

    draw_icon(
        surface,
        icons,
        current.icon,
        (position.x0 + 310., position.y0 + 5.).into(),
        75,
    );
}

fn draw_card<S: Surface>(surface: &mut S, slot: &ForecastSlot, icons: &IconLibrary, position: Rect) {
    let center = position.center().x;

    surface.draw_text(
        &slot.date_label(),
        (center, position.y0 + 6.).into(),
        Anchor::TopCenter,
        20.,
        Ink::Black,
    );
    surface.draw_text(
        slot.descriptor.label(),
        (center, position.y0 + 30.).into(),
        Anchor::TopCenter,
        16.,
        Ink::Black,
    );
    surface.draw_text(
        slot.subtitle,
        (center, position.y0 + 52.).into(),
        Anchor::TopCenter,
        14.,
        Ink::Black,
    );
    surface.draw_text_fitted(
        &format!("{}°", slot.temperature),
        (center, position.y0 + 70.).into(),
        Anchor::TopCenter,
        44.,
        position.width() - 2. * CARD_PADDING,
        Ink::Red,
    );

    draw_icon(
        surface,
        icons,
        slot.icon,
        (position.x0 + 25., position.y0 + 122.).into(),
        80,
    );
}

/// A missing or broken icon leaves its area blank rather than failing the frame.
fn draw_icon<S: Surface>(
    surface: &mut S,
    icons: &IconLibrary,
    category: IconCategory,
    position: Point,
    side: u32,
) {
    match icons.rasterize(category, side) {
        Ok(icon) => surface.paste(&icon, position),
        Err(e) => log::error!("Skipping {} icon: {}", category.name(), e),
    }
}

fn format_temperature(fahrenheit: f32) -> String {
    // Round first so -0.4 doesn't come out as "-0".
    format!("{}°", fahrenheit.round() as i32)
}
