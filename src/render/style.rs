use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::geom::{Axis, Region, margin_percentage};

/// Which part of the image the overlay covers. `Auto` is always the last
/// variant and never part of a selection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStyle {
    Full,
    Bottom,
    Top,
    Left,
    Right,
    QuarterTopLeft,
    QuarterTopRight,
    QuarterBottomRight,
    QuarterBottomLeft,
    Auto,
}

impl RenderStyle {
    pub const ALL: [RenderStyle; 10] = [
        RenderStyle::Full,
        RenderStyle::Bottom,
        RenderStyle::Top,
        RenderStyle::Left,
        RenderStyle::Right,
        RenderStyle::QuarterTopLeft,
        RenderStyle::QuarterTopRight,
        RenderStyle::QuarterBottomRight,
        RenderStyle::QuarterBottomLeft,
        RenderStyle::Auto,
    ];

    /// Every concrete style, in declaration order.
    pub fn selectable() -> &'static [RenderStyle] {
        &Self::ALL[..Self::ALL.len() - 1]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStyle::Full => "full",
            RenderStyle::Bottom => "bottom",
            RenderStyle::Top => "top",
            RenderStyle::Left => "left",
            RenderStyle::Right => "right",
            RenderStyle::QuarterTopLeft => "quarter-top-left",
            RenderStyle::QuarterTopRight => "quarter-top-right",
            RenderStyle::QuarterBottomRight => "quarter-bottom-right",
            RenderStyle::QuarterBottomLeft => "quarter-bottom-left",
            RenderStyle::Auto => "auto",
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, RenderStyle::Auto)
    }
}

impl fmt::Display for RenderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderStyle {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|style| style.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|style| style.as_str()).collect();
                anyhow!(
                    "unknown render style '{}' (expected one of: {})",
                    trimmed,
                    names.join(", ")
                )
            })
    }
}

/// Sub-region of `image` covered by `style`, inset by `margin` percent.
pub fn style_region(image: &Region, style: RenderStyle, margin: f32) -> Result<Region> {
    let area = match style {
        RenderStyle::Full => *image,
        RenderStyle::Top => image.halve(Axis::Y)?.0,
        RenderStyle::Bottom => image.halve(Axis::Y)?.1,
        RenderStyle::Left => image.halve(Axis::X)?.0,
        RenderStyle::Right => image.halve(Axis::X)?.1,
        RenderStyle::QuarterTopLeft => image.halve(Axis::Y)?.0.halve(Axis::X)?.0,
        RenderStyle::QuarterTopRight => image.halve(Axis::Y)?.0.halve(Axis::X)?.1,
        RenderStyle::QuarterBottomLeft => image.halve(Axis::Y)?.1.halve(Axis::X)?.0,
        RenderStyle::QuarterBottomRight => image.halve(Axis::Y)?.1.halve(Axis::X)?.1,
        RenderStyle::Auto => bail!("render style 'auto' must be resolved before layout"),
    };
    margin_percentage(&area, margin)
}
