use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUPPORTED_IMAGE_FORMATS: &[&str] = &["jpg", "png"];
pub const SUPPORTED_FONT_FORMATS: &[&str] = &["ttf"];

/// Image files directly inside `dir`, sorted by file name.
pub fn load_image_names(dir: &Path) -> Result<Vec<PathBuf>> {
    scan_dir(dir, SUPPORTED_IMAGE_FORMATS)
}

/// Font files directly inside `dir`, sorted by file name.
pub fn load_fonts(dir: &Path) -> Result<Vec<PathBuf>> {
    scan_dir(dir, SUPPORTED_FONT_FORMATS)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn scan_dir(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let matcher = extension_matcher(extensions)?;
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list directory: {}", dir.display()))?;
    let mut results = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read directory entry: {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name() {
            if matcher.is_match(name) {
                results.push(path);
            }
        }
    }
    results.sort();
    Ok(results)
}

fn extension_matcher(extensions: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for ext in extensions {
        let glob = GlobBuilder::new(&format!("*.{}", ext))
            .case_insensitive(true)
            .build()
            .with_context(|| format!("invalid extension pattern: {}", ext))?;
        builder.add(glob);
    }
    builder.build().with_context(|| "failed to build extension matcher")
}

/// Decodes an image, applies its EXIF orientation and converts it to RGBA.
pub fn open_image(path: &Path) -> Result<RgbaImage> {
    let mut decoder = ImageReader::open(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to detect image format: {}", path.display()))?
        .into_decoder()
        .with_context(|| format!("failed to decode image: {}", path.display()))?;
    let orientation = decoder
        .orientation()
        .with_context(|| format!("failed to read image orientation: {}", path.display()))?;
    let mut image = DynamicImage::from_decoder(decoder)
        .with_context(|| format!("failed to decode image: {}", path.display()))?;
    image.apply_orientation(orientation);
    Ok(image.to_rgba8())
}
