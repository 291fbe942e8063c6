use anyhow::{Context, Result, bail, ensure};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::classifier::{FeatureCache, StyleClassifier};
use crate::images::{
    SUPPORTED_FONT_FORMATS, SUPPORTED_IMAGE_FORMATS, file_name, load_fonts, load_image_names,
    open_image,
};
use crate::quotes::{self, QuoteRow};
use crate::render::{FontFace, FontRange, QuoteCard, RenderStyle, render_card};
use crate::settings::Settings;

const JPEG_QUALITY: u8 = 95;
const HASH_PREFIX_LEN: usize = 6;

/// Appended between the quote and its source before layout.
const SOURCE_SEPARATOR: &str = " \n\n";

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub images_dir: PathBuf,
    pub output_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub input_csv: PathBuf,
    pub render_style: RenderStyle,
    pub escape: Option<u8>,
    pub font: String,
    pub font_size: u32,
    pub tab_width: usize,
    pub force: bool,
    pub seed: Option<u64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("output"),
            fonts_dir: PathBuf::from("fonts"),
            input_csv: PathBuf::from("input.csv"),
            render_style: RenderStyle::Full,
            escape: None,
            font: "ArchivoBlack-Regular.ttf".to_string(),
            font_size: 200,
            tab_width: 4,
            force: false,
            seed: None,
        }
    }
}

/// `<first 6 hex chars of md5(source)>.jpg`
pub fn output_file_name(quote_source: &str) -> String {
    let digest = format!("{:x}", md5::compute(quote_source.as_bytes()));
    format!("{}.jpg", &digest[..HASH_PREFIX_LEN])
}

/// Where a row's style comes from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleSource {
    Override,
    Row,
    Classifier,
    Random,
}

/// Picks the style for one row: a concrete command-line style wins, then the
/// row's own style, then the classifier, then a uniform pick that never
/// yields `auto`.
pub fn resolve_style<R, F>(
    requested: RenderStyle,
    row_style: Option<&str>,
    classifier: Option<&dyn StyleClassifier>,
    features: F,
    rng: &mut R,
) -> Result<(RenderStyle, StyleSource)>
where
    R: Rng,
    F: FnOnce() -> Result<Vec<f32>>,
{
    if !requested.is_auto() {
        return Ok((requested, StyleSource::Override));
    }
    if let Some(value) = row_style {
        let style: RenderStyle = value.parse()?;
        if !style.is_auto() {
            return Ok((style, StyleSource::Row));
        }
    }
    if let Some(classifier) = classifier {
        let features = features()?;
        return Ok((classifier.predict(&features)?, StyleSource::Classifier));
    }
    let pool = RenderStyle::selectable();
    let style = pool[rng.gen_range(0..pool.len())];
    Ok((style, StyleSource::Random))
}

/// Renders every row of the input CSV onto its image and writes one JPEG per
/// row into the output directory. The first failing row aborts the batch.
pub fn render(
    options: &RenderOptions,
    settings: &Settings,
    classifier: Option<&dyn StyleClassifier>,
    cache: &mut FeatureCache,
) -> Result<Vec<PathBuf>> {
    for dir in [&options.images_dir, &options.output_dir, &options.fonts_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }

    let images: Vec<String> = load_image_names(&options.images_dir)?
        .iter()
        .map(|path| file_name(path))
        .collect();
    if images.is_empty() {
        bail!(
            "no images found in {} (supported formats: {})",
            options.images_dir.display(),
            SUPPORTED_IMAGE_FORMATS.join(", ")
        );
    }

    let fonts: Vec<String> = load_fonts(&options.fonts_dir)?
        .iter()
        .map(|path| file_name(path))
        .collect();
    if fonts.is_empty() {
        bail!(
            "no fonts found in {} (supported formats: {})",
            options.fonts_dir.display(),
            SUPPORTED_FONT_FORMATS.join(", ")
        );
    }
    ensure!(
        fonts.contains(&options.font),
        "font {} not found in {} (available: {})",
        options.font,
        options.fonts_dir.display(),
        fonts.join(", ")
    );

    let rows = quotes::read_rows(&options.input_csv, options.escape)?;
    ensure!(
        !rows.is_empty(),
        "no quotes found in: {}",
        options.input_csv.display()
    );
    let font = FontFace::load(&options.fonts_dir.join(&options.font))?;
    let font_range = FontRange::new(1, options.font_size)?;

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut warned_random = false;
    let mut written = Vec::with_capacity(rows.len());

    for row in &rows {
        let image_name = match row.image.as_deref() {
            Some(name) => name.to_string(),
            None => images.choose(&mut rng).cloned().unwrap_or_default(),
        };
        let image_path = options.images_dir.join(&image_name);
        let mut canvas = open_image(&image_path)?;

        let (style, source) = resolve_style(
            options.render_style,
            row.style.as_deref(),
            classifier,
            || Ok(cache.features_for_image(&image_path, &canvas).to_vec()),
            &mut rng,
        )?;
        if source == StyleSource::Random && !warned_random {
            warn!("no style model loaded; picking overlay styles at random");
            warned_random = true;
        }
        debug!(image = %image_name, style = %style, ?source, "resolved style");

        let output_path = options.output_dir.join(output_file_name(&row.quote_source));
        ensure!(
            options.force || !output_path.exists(),
            "output already exists (use --force to overwrite): {}",
            output_path.display()
        );

        let text = card_text(row);
        render_card(
            &mut canvas,
            &QuoteCard {
                text: &text,
                style,
                font: &font,
                overlay_color: settings.overlay_color,
                overlay_transparency: settings.overlay_transparency,
                overlay_margin: settings.overlay_margin,
                text_margin: settings.text_margin,
                text_color: settings.text_color,
                target_percentage: settings.target_percentage,
                tab_space: options.tab_width,
                font_range,
            },
        )
        .with_context(|| format!("failed to render quote by {}", row.quote_source))?;

        let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
        write_jpeg(&rgb, &output_path, options.force)?;
        info!(image = %image_name, style = %style, "wrote {}", output_path.display());
        written.push(output_path);
    }

    info!(count = written.len(), "rendered quotes into {}", options.output_dir.display());
    Ok(written)
}

fn card_text(row: &QuoteRow) -> String {
    format!("{}{}{}", row.quote_text(), SOURCE_SEPARATOR, row.quote_source)
}

fn write_jpeg(image: &image::RgbImage, path: &Path, force: bool) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in: {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        image
            .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))
            .with_context(|| format!("failed to encode JPEG: {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to write JPEG: {}", path.display()))?;
    }
    let persisted = if force {
        temp.persist(path)
    } else {
        temp.persist_noclobber(path)
    };
    persisted
        .map(|_| ())
        .map_err(|err| err.error)
        .with_context(|| format!("failed to write output: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Fixed(RenderStyle);

    impl StyleClassifier for Fixed {
        fn predict(&self, _features: &[f32]) -> Result<RenderStyle> {
            Ok(self.0)
        }
    }

    fn no_features() -> Result<Vec<f32>> {
        panic!("features should not be computed")
    }

    #[test]
    fn output_names_use_md5_prefix_of_source() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(output_file_name(""), "d41d8c.jpg");
        assert_eq!(output_file_name("Seneca"), output_file_name("Seneca"));
        assert_ne!(output_file_name("Seneca"), output_file_name("Rumi"));
    }

    #[test]
    fn command_line_style_overrides_everything() {
        let mut rng = StdRng::seed_from_u64(1);
        let classifier = Fixed(RenderStyle::Left);
        let resolved = resolve_style(
            RenderStyle::Top,
            Some("bottom"),
            Some(&classifier),
            no_features,
            &mut rng,
        )
        .expect("style");
        assert_eq!(resolved, (RenderStyle::Top, StyleSource::Override));
    }

    #[test]
    fn row_style_beats_classifier() {
        let mut rng = StdRng::seed_from_u64(1);
        let classifier = Fixed(RenderStyle::Left);
        let resolved = resolve_style(
            RenderStyle::Auto,
            Some("quarter-bottom-left"),
            Some(&classifier),
            no_features,
            &mut rng,
        )
        .expect("style");
        assert_eq!(resolved, (RenderStyle::QuarterBottomLeft, StyleSource::Row));
    }

    #[test]
    fn auto_row_style_defers_to_classifier() {
        let mut rng = StdRng::seed_from_u64(1);
        let classifier = Fixed(RenderStyle::Right);
        let resolved = resolve_style(
            RenderStyle::Auto,
            Some("auto"),
            Some(&classifier),
            || Ok(vec![0.0; 4]),
            &mut rng,
        )
        .expect("style");
        assert_eq!(resolved, (RenderStyle::Right, StyleSource::Classifier));
    }

    #[test]
    fn random_fallback_never_picks_auto() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let (style, source) =
                resolve_style(RenderStyle::Auto, None, None, no_features, &mut rng).expect("style");
            assert_eq!(source, StyleSource::Random);
            assert!(!style.is_auto());
        }
    }

    #[test]
    fn unknown_row_style_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(
            resolve_style(RenderStyle::Auto, Some("diagonal"), None, no_features, &mut rng)
                .is_err()
        );
    }

    #[test]
    fn card_text_joins_quote_and_source() {
        let row = QuoteRow {
            image: None,
            quote_source: "Lao Tzu".to_string(),
            quote: "A journey\\nbegins".to_string(),
            style: None,
        };
        assert_eq!(card_text(&row), "A journey\nbegins \n\nLao Tzu");
    }

    #[test]
    fn render_reports_missing_inputs() {
        let dir = tempdir().expect("tempdir");
        let options = RenderOptions {
            images_dir: dir.path().join("images"),
            output_dir: dir.path().join("output"),
            fonts_dir: dir.path().join("fonts"),
            input_csv: dir.path().join("input.csv"),
            ..RenderOptions::default()
        };
        let mut cache = FeatureCache::new();
        let err = render(&options, &Settings::default(), None, &mut cache)
            .err()
            .expect("error");
        assert!(err.to_string().contains("no images found"));
        assert!(options.output_dir.is_dir());
        assert!(options.fonts_dir.is_dir());
    }
}
