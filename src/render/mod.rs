mod font;
mod geom;
mod layout;
mod overlay;
mod style;
mod text;

pub use font::{FontFace, TextExtent};
pub use geom::{Axis, Region, margin_percentage, margin_pixels};
pub use layout::{FontRange, LayoutRequest, PlacedLine, TextLayout, fit_text_to_box};
pub use overlay::{alpha_composite, draw_rect};
pub use style::{RenderStyle, style_region};
pub use text::draw_text;

use anyhow::Result;
use image::RgbaImage;

/// Everything needed to put a quote block on one image.
pub struct QuoteCard<'a> {
    pub text: &'a str,
    pub style: RenderStyle,
    pub font: &'a FontFace,
    pub overlay_color: [u8; 3],
    pub overlay_transparency: f32,
    pub overlay_margin: f32,
    pub text_margin: f32,
    pub text_color: [u8; 3],
    pub target_percentage: f32,
    pub tab_space: usize,
    pub font_range: FontRange,
}

/// Draws the translucent overlay for `card.style`, then fits and draws the
/// text inside it. Returns the layout that was drawn.
pub fn render_card(image: &mut RgbaImage, card: &QuoteCard<'_>) -> Result<TextLayout> {
    let (width, height) = image.dimensions();
    let image_region = Region::from_size(width, height)?;
    let overlay_region = style_region(&image_region, card.style, card.overlay_margin)?;
    draw_rect(
        image,
        &overlay_region,
        card.overlay_color,
        card.overlay_transparency,
    )?;

    let text_region = margin_percentage(&overlay_region, card.text_margin)?;
    let layout = fit_text_to_box(&LayoutRequest {
        region: text_region,
        text: card.text,
        font: card.font,
        target_percentage: card.target_percentage,
        tab_space: card.tab_space,
        font_range: card.font_range,
    })?;
    draw_text(image, &layout, card.font, card.text_color)?;
    Ok(layout)
}
