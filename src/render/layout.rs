use anyhow::{Result, ensure};
use tracing::debug;

use super::font::FontFace;
use super::geom::Region;

const REFERENCE_GLYPH: &str = "c";

/// Half-open range of integer font sizes to scan, `min..max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontRange {
    pub min: u32,
    pub max: u32,
}

impl FontRange {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        ensure!(min >= 1, "font size range must start at 1 or above, got {}", min);
        ensure!(
            min < max,
            "font size range is empty: min {} must be below max {}",
            min,
            max
        );
        Ok(Self { min, max })
    }
}

#[derive(Clone, Copy)]
pub struct LayoutRequest<'a> {
    pub region: Region,
    pub text: &'a str,
    pub font: &'a FontFace,
    /// Fraction of the region a single reference glyph may occupy.
    pub target_percentage: f32,
    pub tab_space: usize,
    pub font_range: FontRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: u32,
    pub reference_size: u32,
    /// Width of the reference glyph at `reference_size`, the per-character
    /// estimate used while wrapping.
    pub char_width: f32,
    /// Wrapped lines as produced by the greedy pass, break markers included.
    pub lines: Vec<String>,
    /// The assembled block: indentation followed by every wrapped line.
    pub text: String,
    pub placed: Vec<PlacedLine>,
}

pub fn fit_text_to_box(request: &LayoutRequest<'_>) -> Result<TextLayout> {
    let LayoutRequest {
        region,
        text,
        font,
        target_percentage,
        tab_space,
        font_range,
    } = *request;
    ensure!(!text.trim().is_empty(), "cannot lay out empty text");
    ensure!(
        target_percentage > 0.0 && target_percentage <= 1.0,
        "target percentage must be within (0, 1], got {}",
        target_percentage
    );
    let FontRange { min, max } = font_range;
    ensure!(min >= 1 && min < max, "invalid font range {}..{}", min, max);

    let box_w = region.width() as f32;
    let box_h = region.height() as f32;

    let reference_size = search_font_size(font_range, |size| {
        let extent = font.measure(REFERENCE_GLYPH, size)?;
        Ok(extent.width > box_w * target_percentage || extent.height > box_h * target_percentage)
    })?;
    let char_width = font.measure(REFERENCE_GLYPH, reference_size as f32)?.width;

    let lines = wrap_words(text, char_width, box_w);
    let mut assembled = " ".repeat(tab_space);
    for line in &lines {
        assembled.push_str(line);
    }

    let longest = longest_line(&lines);
    let font_size = search_font_size(font_range, |size| {
        let extent = font.measure(longest, size)?;
        Ok(extent.width > box_w || extent.height > box_h)
    })?;
    debug!(
        reference_size,
        char_width,
        font_size,
        lines = lines.len(),
        "fitted text to {}x{} box",
        region.width(),
        region.height()
    );

    let placed = place_lines(&assembled, font, font_size as f32, &region)?;
    Ok(TextLayout {
        font_size,
        reference_size,
        char_width,
        lines,
        text: assembled,
        placed,
    })
}

/// Scans `range` upward and returns the size just below the first one that
/// `exceeds` reports as too large, clamped to `range.min`. If nothing in
/// the range exceeds, the largest size in the range wins.
pub(crate) fn search_font_size<F>(range: FontRange, mut exceeds: F) -> Result<u32>
where
    F: FnMut(f32) -> Result<bool>,
{
    for size in range.min..range.max {
        if exceeds(size as f32)? {
            return Ok(size.saturating_sub(1).max(range.min));
        }
    }
    Ok(range.max - 1)
}

/// Greedy wrap on single spaces using a fixed per-character width estimate.
///
/// Lines closed because of width carry a trailing `\n`. A word holding an
/// explicit newline closes the current line too; when the word starts with
/// the newline, that newline is the break and nothing is appended.
pub(crate) fn wrap_words(text: &str, char_width: f32, max_width: f32) -> Vec<String> {
    let mut words = text.split(' ').filter(|word| !word.is_empty());
    let Some(first) = words.next() else {
        return vec![String::new()];
    };

    let mut lines = Vec::new();
    let mut buffer = first.to_string();
    for word in words {
        let has_newline = word.contains('\n');
        let candidate = format!("{} {}", buffer, word);
        let too_wide = visible_len(&candidate) as f32 * char_width > max_width;
        if too_wide || has_newline {
            if !word.starts_with('\n') {
                buffer.push('\n');
            }
            lines.push(std::mem::replace(&mut buffer, word.to_string()));
        } else {
            buffer = candidate;
        }
    }
    lines.push(buffer);
    lines
}

fn visible_len(line: &str) -> usize {
    line.chars().filter(|ch| *ch != '\n').count()
}

/// Longest line by character count; the first one wins ties.
fn longest_line(lines: &[String]) -> &str {
    let mut best: &str = "";
    let mut best_len = 0;
    for line in lines {
        let len = visible_len(line);
        if len > best_len {
            best = line;
            best_len = len;
        }
    }
    best
}

/// Centers the block on the region: lines are left aligned at the block's
/// left edge and stacked at the font's natural line height.
fn place_lines(
    text: &str,
    font: &FontFace,
    font_size: f32,
    region: &Region,
) -> Result<Vec<PlacedLine>> {
    let physical: Vec<&str> = text.split('\n').collect();
    let mut block_w = 0.0f32;
    for line in &physical {
        block_w = block_w.max(font.advance_width(line, font_size)?);
    }
    let ascender = font.ascender_px(font_size);
    let line_height = font.line_height_px(font_size);
    let glyph_height = ascender - font.descender_px(font_size);
    let block_h = (physical.len() as f32 - 1.0) * line_height + glyph_height;

    let (center_x, center_y) = region.center();
    let left = center_x - block_w / 2.0;
    let top = center_y - block_h / 2.0;
    Ok(physical
        .iter()
        .enumerate()
        .map(|(idx, line)| PlacedLine {
            text: line.to_string(),
            x: left,
            baseline: top + ascender + idx as f32 * line_height,
        })
        .collect())
}
