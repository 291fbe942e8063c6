use anyhow::{Context, Result, anyhow};
use image::{Rgba, RgbaImage};
use resvg::render;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use super::font::FontFace;
use super::layout::TextLayout;
use super::overlay::alpha_composite;

/// Rasterises `layout` with `font` and composites it over `image`.
pub fn draw_text(
    image: &mut RgbaImage,
    layout: &TextLayout,
    font: &FontFace,
    color: [u8; 3],
) -> Result<()> {
    let (width, height) = image.dimensions();
    let svg = build_text_svg(width, height, layout, font.family(), color);
    let layer = rasterize_svg(&svg, font.data(), font.family())?;
    alpha_composite(image, &layer)
}

pub(crate) fn build_text_svg(
    width: u32,
    height: u32,
    layout: &TextLayout,
    family: &str,
    color: [u8; 3],
) -> String {
    let [r, g, b] = color;
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    for line in &layout.placed {
        if line.text.trim().is_empty() {
            continue;
        }
        svg.push_str(&format!(
            r#"<text xml:space="preserve" x="{x}" y="{y}" font-family="{family}" font-size="{size}" fill="rgb({r},{g},{b})">{text}</text>"#,
            x = line.x,
            y = line.baseline,
            family = escape_xml(family),
            size = layout.font_size,
            text = escape_xml(&line.text)
        ));
    }
    svg.push_str("</svg>");
    svg
}

fn rasterize_svg(svg: &str, font_data: &[u8], family: &str) -> Result<RgbaImage> {
    let mut db = fontdb::Database::new();
    db.load_font_data(font_data.to_vec());
    // the only loaded face also answers generic family lookups
    db.set_serif_family(family);
    db.set_sans_serif_family(family);
    let options = Options {
        font_family: family.to_string(),
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse text SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    let mut layer = RgbaImage::new(size.width(), size.height());
    for (out, pixel) in layer.pixels_mut().zip(pixmap.pixels()) {
        let color = pixel.demultiply();
        *out = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    Ok(layer)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
