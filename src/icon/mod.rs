use std::{borrow::Cow, path::Path};

use anyhow::{anyhow, Error};
use common::{color_name, Color};
use image::RgbaImage;
use log::warn;
use resvg::{tiny_skia, usvg};
use rust_embed::RustEmbed;

/// Token in the template that is replaced by the color's `#rrggbb` text
pub const COLOR_PLACEHOLDER: &str = "$color";

const TEMPLATE_NAME: &str = "color.svg";

#[derive(RustEmbed)]
#[folder = "src/icon/assets"]
struct IconAsset;

/// A rendered preset swatch.
#[derive(Clone, Debug, PartialEq)]
pub struct Icon {
    image: RgbaImage,
}

impl Icon {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Straight (not premultiplied) RGBA value of a pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|pixel| pixel.0)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn save_png(&self, path: &Path) -> Result<(), Error> {
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// SVG source that every preset icon is rendered from.
///
/// A template that could not be loaded is kept as an empty source. Rendering
/// from it produces no icons instead of failing the caller.
#[derive(Clone, Debug)]
pub struct IconTemplate {
    source: Option<Cow<'static, [u8]>>,
}

impl IconTemplate {
    /// The template shipped inside the binary
    pub fn embedded() -> Self {
        let source = IconAsset::get(TEMPLATE_NAME).map(|file| file.data);
        if source.is_none() {
            warn!("Icon template {} is not embedded", TEMPLATE_NAME);
        }
        Self { source }
    }

    pub fn from_file(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(data) => Self {
                source: Some(Cow::Owned(data)),
            },
            Err(e) => {
                warn!("Failed to read icon template {}: {}", path.display(), e);
                Self::missing()
            }
        }
    }

    pub fn from_svg(svg: impl Into<String>) -> Self {
        Self {
            source: Some(Cow::Owned(svg.into().into_bytes())),
        }
    }

    /// A template that never renders anything
    pub fn missing() -> Self {
        Self { source: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    /// Render the icon for a color, or `None` if the template is unusable.
    pub fn render(&self, color: Color) -> Option<Icon> {
        let source = self.source.as_ref()?;

        match rasterize(source, color) {
            Ok(icon) => Some(icon),
            Err(e) => {
                warn!("Failed to render icon for {}: {}", color_name(color), e);
                None
            }
        }
    }
}

impl Default for IconTemplate {
    fn default() -> Self {
        Self::embedded()
    }
}

fn rasterize(source: &[u8], color: Color) -> Result<Icon, Error> {
    let svg = String::from_utf8_lossy(source).replace(COLOR_PLACEHOLDER, &color_name(color));

    let tree = usvg::Tree::from_data(svg.as_bytes(), &usvg::Options::default())?;

    // Render at the document's own size onto a transparent canvas
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow!("template has an empty canvas"))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    let data = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let pixel = pixel.demultiply();
            [pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()]
        })
        .collect();

    let image = RgbaImage::from_raw(size.width(), size.height(), data)
        .ok_or_else(|| anyhow!("pixel buffer does not match the canvas size"))?;

    Ok(Icon { image })
}
