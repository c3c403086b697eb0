//! Status bar label and icon rendering
//!
//! The status item shows a text title, an icon, or both depending on
//! `menuBarOption`. Icons are rendered to straight RGBA here so the tray
//! adapter only wraps bytes.

use anyhow::{Context, Result};

use crate::preferences::MenuBarOption;

/// Title shown in text mode
pub const STATUS_TITLE: &str = "Apps";

/// Edge length of the status bar icon in pixels
pub const STATUS_ICON_SIZE: u32 = 16;

/// Edge length of application icons inside the menu
pub const MENU_ICON_SIZE: f64 = 20.0;

/// Grid of app tiles, monochrome so it renders as a template image
const STATUS_ICON_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="black" stroke-width="2" stroke-linecap="round" stroke-linejoin="round">
  <path d="M4 5a1 1 0 0 1 1 -1h4a1 1 0 0 1 1 1v4a1 1 0 0 1 -1 1h-4a1 1 0 0 1 -1 -1z"/>
  <path d="M4 15a1 1 0 0 1 1 -1h4a1 1 0 0 1 1 1v4a1 1 0 0 1 -1 1h-4a1 1 0 0 1 -1 -1z"/>
  <path d="M14 15a1 1 0 0 1 1 -1h4a1 1 0 0 1 1 1v4a1 1 0 0 1 -1 1h-4a1 1 0 0 1 -1 -1z"/>
  <path d="M14 7l6 0"/>
  <path d="M17 4l0 6"/>
</svg>"#;

/// What the status item displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLabel {
    pub title: Option<&'static str>,
    pub show_icon: bool,
}

impl StatusLabel {
    pub fn for_option(option: MenuBarOption) -> Self {
        match option {
            MenuBarOption::Text => Self {
                title: Some(STATUS_TITLE),
                show_icon: false,
            },
            MenuBarOption::Icon => Self {
                title: None,
                show_icon: true,
            },
            MenuBarOption::TextAndIcon => Self {
                title: Some(STATUS_TITLE),
                show_icon: true,
            },
        }
    }
}

/// Decoded RGBA pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterIcon {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RasterIcon {
    /// Render the embedded status icon
    pub fn status_icon() -> Result<Self> {
        Self::from_svg(STATUS_ICON_SVG, STATUS_ICON_SIZE)
    }

    /// Render an SVG document scaled to a `size`×`size` square.
    pub fn from_svg(svg: &str, size: u32) -> Result<Self> {
        let opts = usvg::Options::default();
        let tree = usvg::Tree::from_str(svg, &opts).context("Failed to parse SVG")?;

        let mut pixmap = tiny_skia::Pixmap::new(size, size).context("Failed to create pixmap")?;

        let svg_size = tree.size();
        let transform = tiny_skia::Transform::from_scale(
            size as f32 / svg_size.width(),
            size as f32 / svg_size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // Template images only use alpha, so premultiplied vs straight
        // colour does not matter here
        Ok(Self {
            rgba: pixmap.take(),
            width: size,
            height: size,
        })
    }

    /// Decode PNG bytes, as produced for application icons
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .context("Failed to decode PNG")?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            rgba: image.into_raw(),
            width,
            height,
        })
    }
}
