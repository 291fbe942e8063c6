use anyhow::{Result, bail, ensure};
use serde::Serialize;

/// Axis-aligned pixel rectangle. `x < x2` and `y < y2` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    x: u32,
    y: u32,
    x2: u32,
    y2: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Region {
    pub fn new(x: u32, y: u32, x2: u32, y2: u32) -> Result<Self> {
        ensure!(x < x2, "invalid region: x ({}) must be less than x2 ({})", x, x2);
        ensure!(y < y2, "invalid region: y ({}) must be less than y2 ({})", y, y2);
        Ok(Self { x, y, x2, y2 })
    }

    pub fn from_size(width: u32, height: u32) -> Result<Self> {
        Self::new(0, 0, width, height)
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn x2(&self) -> u32 {
        self.x2
    }

    pub fn y2(&self) -> u32 {
        self.y2
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width() as f32 / 2.0,
            self.y as f32 + self.height() as f32 / 2.0,
        )
    }

    /// Inclusive on every edge: touching regions overlap.
    pub fn overlaps(&self, other: &Region) -> bool {
        let x_overlaps = self.x2 >= other.x && other.x2 >= self.x;
        let y_overlaps = self.y2 >= other.y && other.y2 >= self.y;
        x_overlaps && y_overlaps
    }

    /// Strict on every edge: a region does not contain itself.
    pub fn contains(&self, other: &Region) -> bool {
        let x_contains = self.x2 > other.x2 && self.x < other.x;
        let y_contains = self.y2 > other.y2 && self.y < other.y;
        x_contains && y_contains
    }

    /// Splits at the midpoint of `axis`. Both halves share the midline.
    pub fn halve(&self, axis: Axis) -> Result<(Region, Region)> {
        match axis {
            Axis::X => {
                ensure!(self.width() >= 2, "region too narrow to halve: {:?}", self);
                let mid = self.x + self.width() / 2;
                Ok((
                    Region { x2: mid, ..*self },
                    Region { x: mid, ..*self },
                ))
            }
            Axis::Y => {
                ensure!(self.height() >= 2, "region too short to halve: {:?}", self);
                let mid = self.y + self.height() / 2;
                Ok((
                    Region { y2: mid, ..*self },
                    Region { y: mid, ..*self },
                ))
            }
        }
    }
}

pub fn margin_percentage(region: &Region, percent: f32) -> Result<Region> {
    ensure!(
        (0.0..=1.0).contains(&percent),
        "margin percentage must be within [0, 1], got {}",
        percent
    );
    let margin_x = (region.width() as f32 * percent).floor() as u32;
    let margin_y = (region.height() as f32 * percent).floor() as u32;
    margin_pixels(region, margin_x, margin_y)
}

pub fn margin_pixels(region: &Region, margin_x: u32, margin_y: u32) -> Result<Region> {
    if margin_x == 0 && margin_y == 0 {
        return Ok(*region);
    }
    let (Some(x2), Some(y2)) = (
        region.x2.checked_sub(margin_x),
        region.y2.checked_sub(margin_y),
    ) else {
        bail!(
            "margin ({}, {}) exceeds region {:?}",
            margin_x,
            margin_y,
            region
        );
    };
    let inner = Region::new(region.x + margin_x, region.y + margin_y, x2, y2)?;
    ensure!(
        region.contains(&inner),
        "margin ({}, {}) does not leave a region strictly inside {:?}",
        margin_x,
        margin_y,
        region
    );
    Ok(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: u32, y: u32, x2: u32, y2: u32) -> Region {
        Region::new(x, y, x2, y2).expect("region")
    }

    #[test]
    fn rejects_inverted_or_empty_regions() {
        assert!(Region::new(10, 0, 10, 5).is_err());
        assert!(Region::new(0, 6, 4, 5).is_err());
        assert!(Region::from_size(0, 10).is_err());
    }

    #[test]
    fn derived_dimensions() {
        let r = region(10, 20, 110, 70);
        assert_eq!(r.width(), 100);
        assert_eq!(r.height(), 50);
        assert_eq!(r.center(), (60.0, 45.0));
    }

    #[test]
    fn contains_is_strict_and_overlaps_is_inclusive() {
        let outer = region(0, 0, 100, 100);
        let inner = region(10, 10, 90, 90);
        let touching = region(100, 100, 150, 150);
        let apart = region(101, 0, 150, 50);

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&outer));
        assert!(!outer.contains(&region(0, 10, 90, 90)));

        assert!(outer.overlaps(&touching));
        assert!(touching.overlaps(&outer));
        assert!(!outer.overlaps(&apart));
    }

    #[test]
    fn halves_share_the_midline() {
        let r = region(10, 0, 111, 40);
        let (left, right) = r.halve(Axis::X).expect("halve x");
        assert_eq!(left, region(10, 0, 60, 40));
        assert_eq!(right, region(60, 0, 111, 40));
        assert_eq!(left.x2(), right.x());

        let (top, bottom) = r.halve(Axis::Y).expect("halve y");
        assert_eq!(top, region(10, 0, 111, 20));
        assert_eq!(bottom, region(10, 20, 111, 40));
    }

    #[test]
    fn halving_a_sliver_fails() {
        assert!(region(0, 0, 1, 10).halve(Axis::X).is_err());
        assert!(region(0, 0, 10, 1).halve(Axis::Y).is_err());
    }

    #[test]
    fn zero_margin_is_identity() {
        let r = region(3, 4, 300, 400);
        assert_eq!(margin_percentage(&r, 0.0).expect("margin"), r);
        assert_eq!(margin_pixels(&r, 0, 0).expect("margin"), r);
    }

    #[test]
    fn margin_floors_pixel_amounts() {
        let r = region(0, 0, 1000, 500);
        let inner = margin_percentage(&r, 0.05).expect("margin");
        assert_eq!(inner, region(50, 25, 950, 475));

        let r = region(0, 0, 99, 19);
        let inner = margin_percentage(&r, 0.1).expect("margin");
        assert_eq!(inner, region(9, 1, 90, 18));
    }

    #[test]
    fn margin_rejects_out_of_range_percentages() {
        let r = region(0, 0, 100, 100);
        assert!(margin_percentage(&r, -0.1).is_err());
        assert!(margin_percentage(&r, 1.5).is_err());
        assert!(margin_percentage(&r, 0.5).is_err());
    }

    #[test]
    fn margin_fails_only_when_the_region_degenerates() {
        assert!(margin_percentage(&region(0, 0, 2, 2), 0.5).is_err());
        let r = region(0, 0, 3, 3);
        assert_eq!(margin_percentage(&r, 0.4).expect("margin"), region(1, 1, 2, 2));
        assert!(margin_pixels(&r, 2, 0).is_err());
        assert!(margin_pixels(&r, 5, 5).is_err());
    }

    #[test]
    fn repeated_margins_shrink_monotonically() {
        let mut current = region(0, 0, 640, 480);
        for _ in 0..8 {
            let next = margin_percentage(&current, 0.1).expect("margin");
            assert!(current.contains(&next));
            assert!(next.width() <= current.width());
            assert!(next.height() <= current.height());
            current = next;
        }
    }

    #[test]
    fn margin_on_offset_region_stays_inside() {
        for (x, y, w, h, p) in [
            (5, 7, 10, 10, 0.2),
            (100, 100, 37, 81, 0.33),
            (0, 50, 400, 3, 0.34),
            (12, 0, 9, 9, 0.49),
        ] {
            let r = region(x, y, x + w, y + h);
            match margin_percentage(&r, p) {
                Ok(inner) => assert!(r.contains(&inner), "{:?} -> {:?}", r, inner),
                Err(_) => {
                    let mx = (w as f32 * p).floor() as u32;
                    let my = (h as f32 * p).floor() as u32;
                    assert!(mx == 0 || my == 0 || 2 * mx >= w || 2 * my >= h);
                }
            }
        }
    }
}
