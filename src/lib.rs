pub mod classifier;
pub mod generator;
pub mod images;
pub mod logging;
pub mod pipeline;
pub mod quotes;
pub mod render;
pub mod settings;

mod paths;
#[cfg(test)]
mod test_util;

pub use classifier::{CentroidModel, FeatureCache, StyleClassifier};
pub use generator::{DataGenerator, PseudoRandomSelector, Selector};
pub use pipeline::{RenderOptions, render};
pub use quotes::QuoteRow;
pub use render::{RenderStyle, TextLayout, fit_text_to_box};
pub use settings::{Settings, load_settings};
