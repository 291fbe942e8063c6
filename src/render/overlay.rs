use anyhow::{Result, ensure};
use image::{Rgba, RgbaImage};

use super::geom::Region;

/// Paints `region` in `color` at the given transparency (0 = invisible,
/// 1 = opaque) by compositing a transparent layer over `image`.
pub fn draw_rect(
    image: &mut RgbaImage,
    region: &Region,
    color: [u8; 3],
    transparency: f32,
) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&transparency),
        "transparency must be within [0, 1], got {}",
        transparency
    );
    let (width, height) = image.dimensions();
    let alpha = (255.0 * transparency).round() as u8;
    let [r, g, b] = color;

    let mut overlay = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 0]));
    let x2 = region.x2().min(width);
    let y2 = region.y2().min(height);
    for y in region.y().min(y2)..y2 {
        for x in region.x().min(x2)..x2 {
            overlay.put_pixel(x, y, Rgba([r, g, b, alpha]));
        }
    }

    alpha_composite(image, &overlay)
}

/// Porter-Duff "over" of `src` onto `dst`, both straight (non-premultiplied)
/// RGBA of identical size. Fully transparent source pixels leave `dst` as is.
pub fn alpha_composite(dst: &mut RgbaImage, src: &RgbaImage) -> Result<()> {
    ensure!(
        dst.dimensions() == src.dimensions(),
        "cannot composite {}x{} layer onto {}x{} image",
        src.width(),
        src.height(),
        dst.width(),
        dst.height()
    );
    for (out, layer) in dst.pixels_mut().zip(src.pixels()) {
        *out = blend_over(*out, *layer);
    }
    Ok(())
}

fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src_alpha = src[3];
    if src_alpha == 0 {
        return dst;
    }
    if src_alpha == 255 {
        return src;
    }
    let sa = src_alpha as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut result = [0u8; 4];
    for channel in 0..3 {
        let sc = src[channel] as f32;
        let dc = dst[channel] as f32;
        let value = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        result[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    result[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(result)
}
