use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::Face;
use ttf_parser::name_id;

/// A parsed outline font plus the metrics the layout needs. The raw bytes are
/// kept so the same face can be handed to the rasteriser.
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    line_gap: i16,
    space_advance: u16,
    family: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

impl FontFace {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        Self::from_data(data)
            .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
    }

    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        for index in 0..count {
            let Ok(face) = Face::parse(&data, index) else {
                continue;
            };
            let units_per_em = face.units_per_em().max(1);
            let space_advance = face
                .glyph_index(' ')
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(units_per_em / 2);
            let family = extract_family_name(&face).unwrap_or_else(|| "sans-serif".to_string());
            let (ascender, descender, line_gap) =
                (face.ascender(), face.descender(), face.line_gap());
            return Ok(Self {
                data: Arc::new(data),
                face_index: index,
                units_per_em,
                ascender,
                descender,
                line_gap,
                space_advance,
                family,
            });
        }
        Err(anyhow!("failed to parse font data"))
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.units_per_em as f32
    }

    pub fn ascender_px(&self, font_size: f32) -> f32 {
        self.ascender as f32 * self.scale(font_size)
    }

    /// Negative for fonts whose descent sits below the baseline.
    pub fn descender_px(&self, font_size: f32) -> f32 {
        self.descender as f32 * self.scale(font_size)
    }

    pub fn line_height_px(&self, font_size: f32) -> f32 {
        (self.ascender as f32 - self.descender as f32 + self.line_gap as f32)
            * self.scale(font_size)
    }

    fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, self.face_index)
            .map_err(|err| anyhow!("failed to parse font face: {}", err))
    }

    /// Sum of horizontal advances. Newlines are skipped; spaces and missing
    /// glyphs use the space advance.
    pub fn advance_width(&self, text: &str, font_size: f32) -> Result<f32> {
        let face = self.face()?;
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            advance = advance.saturating_add(self.glyph_advance(&face, ch) as u32);
        }
        Ok(advance as f32 * self.scale(font_size))
    }

    /// Ink bounding box of the glyph run. Runs without any ink (only spaces)
    /// report their advance width and zero height.
    pub fn measure(&self, text: &str, font_size: f32) -> Result<TextExtent> {
        let face = self.face()?;
        let mut pen = 0i64;
        let mut ink: Option<(i64, i64, i64, i64)> = None;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            if let Some(rect) = face.glyph_index(ch).and_then(|id| face.glyph_bounding_box(id)) {
                let x_min = pen.saturating_add(rect.x_min as i64);
                let x_max = pen.saturating_add(rect.x_max as i64);
                let (y_min, y_max) = (rect.y_min as i64, rect.y_max as i64);
                ink = Some(match ink {
                    Some((a, b, c, d)) => (a.min(x_min), b.min(y_min), c.max(x_max), d.max(y_max)),
                    None => (x_min, y_min, x_max, y_max),
                });
            }
            pen = pen.saturating_add(self.glyph_advance(&face, ch) as i64);
        }
        let scale = self.scale(font_size);
        Ok(match ink {
            Some((x_min, y_min, x_max, y_max)) => TextExtent {
                width: (x_max - x_min) as f32 * scale,
                height: (y_max - y_min) as f32 * scale,
            },
            None => TextExtent {
                width: pen.max(0) as f32 * scale,
                height: 0.0,
            },
        })
    }

    fn glyph_advance(&self, face: &Face<'_>, ch: char) -> u16 {
        if ch == ' ' {
            return self.space_advance;
        }
        face.glyph_index(ch)
            .and_then(|glyph| face.glyph_hor_advance(glyph))
            .unwrap_or(self.space_advance)
    }
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
