use anyhow::{Context, Result, anyhow, bail, ensure};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::images::open_image;
use crate::quotes;
use crate::render::RenderStyle;

const THUMBNAIL_SIZE: u32 = 8;
pub const FEATURE_LEN: usize = (THUMBNAIL_SIZE * THUMBNAIL_SIZE * 3) as usize;

/// Predicts an overlay style from an image feature vector.
pub trait StyleClassifier {
    fn predict(&self, features: &[f32]) -> Result<RenderStyle>;
}

/// Downsamples to an 8x8 RGB thumbnail and flattens it to `[0, 1]` values.
pub fn extract_features(image: &RgbaImage) -> Vec<f32> {
    let thumb = imageops::resize(image, THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle);
    let mut features = Vec::with_capacity(FEATURE_LEN);
    for pixel in thumb.pixels() {
        let [r, g, b, _] = pixel.0;
        features.push(r as f32 / 255.0);
        features.push(g as f32 / 255.0);
        features.push(b as f32 / 255.0);
    }
    features
}

/// Feature vectors keyed by image path. Grows for the whole session and is
/// never evicted.
#[derive(Debug, Default)]
pub struct FeatureCache {
    map: HashMap<PathBuf, Vec<f32>>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Features for an image already decoded by the caller.
    pub fn features_for_image(&mut self, path: &Path, image: &RgbaImage) -> &[f32] {
        self.map
            .entry(path.to_path_buf())
            .or_insert_with(|| extract_features(image))
    }

    pub fn features_for(&mut self, path: &Path) -> Result<&[f32]> {
        if !self.map.contains_key(path) {
            let image = open_image(path)?;
            self.map.insert(path.to_path_buf(), extract_features(&image));
        }
        self.map
            .get(path)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("feature cache lost entry for {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleCentroid {
    pub style: RenderStyle,
    pub mean: Vec<f32>,
    pub samples: usize,
}

/// Nearest-centroid model: one mean feature vector per style seen in
/// training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidModel {
    pub feature_len: usize,
    pub centroids: Vec<StyleCentroid>,
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub features: Vec<f32>,
    pub style: RenderStyle,
}

impl CentroidModel {
    pub fn train(samples: &[Sample]) -> Result<Self> {
        let Some(first) = samples.first() else {
            bail!("cannot train a style model without samples");
        };
        let feature_len = first.features.len();
        ensure!(feature_len > 0, "samples have empty feature vectors");

        let mut sums: HashMap<RenderStyle, (Vec<f32>, usize)> = HashMap::new();
        for sample in samples {
            ensure!(
                !sample.style.is_auto(),
                "style 'auto' cannot be used as a training label"
            );
            ensure!(
                sample.features.len() == feature_len,
                "feature length mismatch: expected {}, got {}",
                feature_len,
                sample.features.len()
            );
            let (sum, count) = sums
                .entry(sample.style)
                .or_insert_with(|| (vec![0.0; feature_len], 0));
            for (acc, value) in sum.iter_mut().zip(&sample.features) {
                *acc += value;
            }
            *count += 1;
        }

        let centroids = RenderStyle::selectable()
            .iter()
            .filter_map(|style| {
                let (sum, count) = sums.remove(style)?;
                let mean = sum.into_iter().map(|value| value / count as f32).collect();
                Some(StyleCentroid {
                    style: *style,
                    mean,
                    samples: count,
                })
            })
            .collect();
        Ok(Self {
            feature_len,
            centroids,
        })
    }

    /// Fraction of samples whose predicted style matches their label.
    pub fn evaluate(&self, samples: &[Sample]) -> Result<f32> {
        ensure!(!samples.is_empty(), "cannot evaluate without samples");
        let mut correct = 0usize;
        for sample in samples {
            if self.predict(&sample.features)? == sample.style {
                correct += 1;
            }
        }
        Ok(correct as f32 / samples.len() as f32)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read style model: {}", path.display()))?;
        let model: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse style model: {}", path.display()))?;
        ensure!(
            !model.centroids.is_empty(),
            "style model has no centroids: {}",
            path.display()
        );
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write style model: {}", path.display()))
    }
}

impl StyleClassifier for CentroidModel {
    fn predict(&self, features: &[f32]) -> Result<RenderStyle> {
        ensure!(
            features.len() == self.feature_len,
            "feature length mismatch: model expects {}, got {}",
            self.feature_len,
            features.len()
        );
        let mut best: Option<(RenderStyle, f32)> = None;
        for centroid in &self.centroids {
            let distance: f32 = centroid
                .mean
                .iter()
                .zip(features)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((centroid.style, distance));
            }
        }
        best.map(|(style, _)| style)
            .ok_or_else(|| anyhow!("style model has no centroids"))
    }
}

/// Loads labelled samples from a quotes CSV. Rows without an image or a
/// concrete style are skipped.
pub fn samples_from_csv(
    csv_path: &Path,
    images_dir: &Path,
    escape: Option<u8>,
    cache: &mut FeatureCache,
) -> Result<Vec<Sample>> {
    let rows = quotes::read_rows(csv_path, escape)?;
    let mut samples = Vec::new();
    for row in rows {
        let (Some(image), Some(style)) = (row.image.as_deref(), row.style.as_deref()) else {
            debug!(source = %row.quote_source, "skipping row without image or style");
            continue;
        };
        let style: RenderStyle = style.parse()?;
        if style.is_auto() {
            debug!(source = %row.quote_source, "skipping row labelled auto");
            continue;
        }
        let features = cache.features_for(&images_dir.join(image))?.to_vec();
        samples.push(Sample { features, style });
    }
    Ok(samples)
}

pub struct TrainReport {
    pub model: CentroidModel,
    pub train_accuracy: f32,
    pub holdout_accuracy: Option<f32>,
    pub train_samples: usize,
    pub holdout_samples: usize,
}

/// Trains on the leading share of `samples` and evaluates on the trailing
/// `holdout` fraction.
pub fn train_with_holdout(samples: &[Sample], holdout: f32) -> Result<TrainReport> {
    ensure!(
        (0.0..1.0).contains(&holdout),
        "holdout fraction must be within [0, 1), got {}",
        holdout
    );
    let holdout_count = (samples.len() as f32 * holdout).floor() as usize;
    let split = samples.len() - holdout_count;
    let (train, test) = samples.split_at(split);
    let model = CentroidModel::train(train)?;
    let train_accuracy = model.evaluate(train)?;
    let holdout_accuracy = if test.is_empty() {
        None
    } else {
        Some(model.evaluate(test)?)
    };
    info!(
        train = train.len(),
        holdout = test.len(),
        train_accuracy,
        ?holdout_accuracy,
        "trained style model"
    );
    Ok(TrainReport {
        model,
        train_accuracy,
        holdout_accuracy,
        train_samples: train.len(),
        holdout_samples: test.len(),
    })
}

pub fn train_from_csv(
    csv_path: &Path,
    images_dir: &Path,
    escape: Option<u8>,
    holdout: f32,
    cache: &mut FeatureCache,
) -> Result<TrainReport> {
    let samples = samples_from_csv(csv_path, images_dir, escape, cache)?;
    ensure!(
        !samples.is_empty(),
        "no labelled rows with images in: {}",
        csv_path.display()
    );
    train_with_holdout(&samples, holdout)
}
