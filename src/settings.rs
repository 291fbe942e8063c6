use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub overlay_color: [u8; 3],
    pub overlay_transparency: f32,
    pub overlay_margin: f32,
    pub text_margin: f32,
    pub text_color: [u8; 3],
    pub target_percentage: f32,
    pub tab_width: usize,
    pub model_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overlay_color: [0, 0, 0],
            overlay_transparency: 0.45,
            overlay_margin: 0.05,
            text_margin: 0.1,
            text_color: [255, 255, 255],
            target_percentage: 0.055,
            tab_width: 4,
            model_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    overlay: Option<OverlaySettings>,
    text: Option<TextSettings>,
    classifier: Option<ClassifierSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    color: Option<String>,
    transparency: Option<f32>,
    margin: Option<f32>,
    text_margin: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct TextSettings {
    color: Option<String>,
    target_percentage: Option<f32>,
    tab_width: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ClassifierSettings {
    model_path: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(base) = paths::base_dir() {
        ordered_paths.push(base.join("settings.toml"));
        ordered_paths.push(base.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn model_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(paths::default_model_path)
    }

    fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(overlay) = incoming.overlay {
            if let Some(color) = overlay.color.as_deref().and_then(parse_setting_color) {
                self.overlay_color = color;
            }
            if let Some(value) = overlay.transparency.and_then(unit_interval("overlay.transparency")) {
                self.overlay_transparency = value;
            }
            if let Some(value) = overlay.margin.and_then(unit_interval("overlay.margin")) {
                self.overlay_margin = value;
            }
            if let Some(value) = overlay.text_margin.and_then(unit_interval("overlay.text_margin")) {
                self.text_margin = value;
            }
        }
        if let Some(text) = incoming.text {
            if let Some(color) = text.color.as_deref().and_then(parse_setting_color) {
                self.text_color = color;
            }
            if let Some(value) = text
                .target_percentage
                .filter(|value| *value > 0.0)
                .and_then(unit_interval("text.target_percentage"))
            {
                self.target_percentage = value;
            }
            if let Some(width) = text.tab_width {
                self.tab_width = width;
            }
        }
        if let Some(classifier) = incoming.classifier {
            if let Some(path) = classifier.model_path.as_deref().and_then(paths::expand_path) {
                self.model_path = Some(path);
            }
        }
    }
}

fn unit_interval(key: &'static str) -> impl Fn(f32) -> Option<f32> {
    move |value| {
        if (0.0..=1.0).contains(&value) {
            Some(value)
        } else {
            warn!("ignoring {} = {}: must be within [0, 1]", key, value);
            None
        }
    }
}

fn parse_setting_color(value: &str) -> Option<[u8; 3]> {
    if value.trim().is_empty() {
        return None;
    }
    match parse_hex_color(value) {
        Ok(color) => Some(color),
        Err(err) => {
            warn!("ignoring color setting: {}", err);
            None
        }
    }
}

/// Parses `#rrggbb` (the leading `#` is optional).
pub fn parse_hex_color(value: &str) -> Result<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(anyhow!("invalid color '{}': expected #rrggbb", value));
    }
    let channel = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16);
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(base) = paths::base_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&base)
        .with_context(|| format!("failed to create settings directory: {}", base.display()))?;
    let path = base.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}
