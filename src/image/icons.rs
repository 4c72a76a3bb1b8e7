use std::collections::HashMap;
use std::fs;
use std::path::Path;

use resvg::tiny_skia;

use crate::error::{AssetMissingError, RenderError};
use crate::normalize::IconCategory;

/// A rasterized icon, premultiplied RGBA.
#[derive(Clone, Debug, PartialEq)]
pub struct Icon {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

/// Parsed SVG assets, one per icon category, named `<category>.svg`.
#[derive(Default)]
pub struct IconLibrary {
    trees: HashMap<IconCategory, usvg::Tree>,
}

impl IconLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every category's icon from `dir`. Missing or broken files are only warned about here;
    /// the layout reports them again each time it needs one.
    pub fn load(dir: &Path) -> Self {
        let mut library = Self::new();

        for category in IconCategory::ALL.iter().copied() {
            let path = dir.join(format!("{}.svg", category.name()));

            match fs::read(&path) {
                Ok(data) => {
                    if let Err(e) = library.insert(category, &data) {
                        log::warn!("Ignoring {}: {}", path.display(), e);
                    }
                }
                Err(e) => log::warn!("Unable to read {}: {}", path.display(), e),
            }
        }

        log::info!(
            "Loaded {} of {} icons from {}",
            library.trees.len(),
            IconCategory::ALL.len(),
            dir.display()
        );

        library
    }

    pub fn insert(&mut self, category: IconCategory, svg: &[u8]) -> Result<(), RenderError> {
        let tree = usvg::Tree::from_data(svg, &usvg::Options::default())
            .map_err(|e| RenderError::Icon(e.to_string()))?;
        self.trees.insert(category, tree);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, category: IconCategory) -> bool {
        self.trees.contains_key(&category)
    }

    /// Render the icon for `category` into a `side`×`side` square, centred and scaled to fit.
    pub fn rasterize(&self, category: IconCategory, side: u32) -> Result<Icon, RenderError> {
        let tree = self
            .trees
            .get(&category)
            .ok_or(AssetMissingError { category })?;

        let size = tree.size();
        let scale = side as f32 / size.width().max(size.height());
        let transform = tiny_skia::Transform::from_scale(scale, scale).post_translate(
            (side as f32 - size.width() * scale) / 2.,
            (side as f32 - size.height() * scale) / 2.,
        );

        let mut pixmap = tiny_skia::Pixmap::new(side, side)
            .ok_or_else(|| RenderError::Icon(format!("Invalid icon size {}.", side)))?;
        resvg::render(tree, transform, &mut pixmap.as_mut());

        Ok(Icon {
            width: side as usize,
            height: side as usize,
            pixels: pixmap.take(),
        })
    }
}

#[cfg(test)]
pub(crate) const SQUARE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10" viewBox="0 0 20 10">
    <rect x="0" y="0" width="20" height="10" fill="black"/>
</svg>"#;
