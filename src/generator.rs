use anyhow::{Result, bail, ensure};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::images::{file_name, load_image_names};
use crate::quotes::{self, QuoteRow};
use crate::render::RenderStyle;

/// Internal seeds are kept below this bound so they print as at most 32
/// decimal digits.
const SEED_MODULUS: u128 = 100_000_000_000_000_000_000_000_000_000_000;

/// Chooses an image and an overlay style for each generated quote.
pub trait Selector {
    fn select_image(&mut self, images: &[String], source: &str, quote: &str) -> Option<String>;
    fn select_style(&mut self, images: &[String], source: &str, quote: &str) -> RenderStyle;
}

/// Deterministic selector. Every call hashes the quote together with the
/// current internal seed, draws from a generator seeded by that hash and
/// carries the generator's next value forward as the new internal seed, so
/// a fresh selector with the same seed replays the same sequence.
#[derive(Debug, Clone)]
pub struct PseudoRandomSelector {
    seed: u128,
    internal_seed: u128,
}

impl PseudoRandomSelector {
    pub fn new(seed: u128) -> Self {
        Self {
            seed,
            internal_seed: seed,
        }
    }

    pub fn seed(&self) -> u128 {
        self.seed
    }

    pub fn internal_seed(&self) -> u128 {
        self.internal_seed
    }

    fn next_rng(&self, source: &str, quote: &str) -> StdRng {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(quote.as_bytes());
        hasher.update(self.internal_seed.to_string().as_bytes());
        StdRng::from_seed(hasher.finalize().into())
    }

    fn advance(&mut self, rng: &mut StdRng) {
        self.internal_seed = rng.r#gen::<u128>() % SEED_MODULUS;
    }
}

impl Selector for PseudoRandomSelector {
    fn select_image(&mut self, images: &[String], source: &str, quote: &str) -> Option<String> {
        if images.is_empty() {
            return None;
        }
        let mut rng = self.next_rng(source, quote);
        let selected = images[rng.gen_range(0..images.len())].clone();
        self.advance(&mut rng);
        Some(selected)
    }

    fn select_style(&mut self, _images: &[String], source: &str, quote: &str) -> RenderStyle {
        let pool = RenderStyle::selectable();
        let mut rng = self.next_rng(source, quote);
        let selected = pool[rng.gen_range(0..pool.len())];
        self.advance(&mut rng);
        selected
    }
}

/// Builds quotes CSVs for training from a stream of `(source, quote)` pairs.
pub struct DataGenerator {
    images_dir: PathBuf,
    max_data: usize,
    fallback_seed: u64,
}

impl DataGenerator {
    pub fn new(images_dir: impl Into<PathBuf>, max_data: usize) -> Self {
        Self {
            images_dir: images_dir.into(),
            max_data,
            fallback_seed: 0,
        }
    }

    /// Seeds the image pick used when the selector returns none.
    pub fn with_fallback_seed(mut self, seed: u64) -> Self {
        self.fallback_seed = seed;
        self
    }

    pub fn generate<S, I>(&self, selector: &mut S, texts: I) -> Result<Vec<QuoteRow>>
    where
        S: Selector + ?Sized,
        I: IntoIterator<Item = (String, String)>,
    {
        let images: Vec<String> = load_image_names(&self.images_dir)?
            .iter()
            .map(|path| file_name(path))
            .collect();
        if images.is_empty() {
            bail!("no images found in: {}", self.images_dir.display());
        }

        let mut fallback = StdRng::seed_from_u64(self.fallback_seed);
        let mut rows = Vec::new();
        for (source, quote) in texts.into_iter().take(self.max_data) {
            let image = selector.select_image(&images, &source, &quote);
            let style = selector.select_style(&images, &source, &quote);
            let image = match image {
                Some(image) => image,
                None => images
                    .choose(&mut fallback)
                    .cloned()
                    .unwrap_or_default(),
            };
            ensure!(
                images.contains(&image),
                "selected image is not in {}: {}",
                self.images_dir.display(),
                image
            );
            rows.push(QuoteRow {
                image: Some(image),
                quote_source: source,
                quote,
                style: Some(style.to_string()),
            });
        }
        Ok(rows)
    }

    pub fn generate_csv<S, I>(&self, output: &Path, selector: &mut S, texts: I) -> Result<usize>
    where
        S: Selector + ?Sized,
        I: IntoIterator<Item = (String, String)>,
    {
        let rows = self.generate(selector, texts)?;
        quotes::write_rows(output, &rows)?;
        info!(rows = rows.len(), "wrote {}", output.display());
        Ok(rows.len())
    }
}

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Grace", "Linus", "Marie", "Nikola", "Rosalind", "Carl", "Hedy", "Isaac",
    "Katherine", "Leonardo", "Mary", "Niels", "Octavia", "Rachel", "Sofia", "Tim", "Yuri", "Zora",
];

const LAST_NAMES: &[&str] = &[
    "Lovelace", "Turing", "Hopper", "Pauling", "Curie", "Tesla", "Franklin", "Sagan", "Lamarr",
    "Newton", "Johnson", "Vinci", "Shelley", "Bohr", "Butler", "Carson", "Kovalevskaya", "Berners",
    "Gagarin", "Hurston",
];

const WORDS: &[&str] = &[
    "light", "morning", "hope", "river", "quiet", "strength", "patience", "journey", "kind",
    "heart", "mountain", "steady", "courage", "grow", "bloom", "listen", "begin", "again", "small",
    "steps", "shine", "gentle", "wonder", "brave", "today", "tomorrow", "path", "open", "trust",
    "rest", "breathe", "forward", "season", "rise", "learn", "give", "simple", "joy", "home",
    "wild",
];

/// Seeded stand-in for a fake-text generator: random names and short
/// paragraphs from fixed word lists.
pub struct LoremTextSource {
    rng: StdRng,
    sentences: usize,
}

impl LoremTextSource {
    pub fn new(seed: u64, sentences: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sentences: sentences.max(1),
        }
    }

    fn pick(&mut self, list: &[&'static str]) -> &'static str {
        list[self.rng.gen_range(0..list.len())]
    }

    fn sentence(&mut self) -> String {
        let count = self.rng.gen_range(4..10);
        let mut words: Vec<&str> = (0..count).map(|_| self.pick(WORDS)).collect();
        let mut first = words.remove(0).to_string();
        if let Some(ch) = first.get_mut(0..1) {
            ch.make_ascii_uppercase();
        }
        words.insert(0, &first);
        format!("{}.", words.join(" "))
    }
}

impl Iterator for LoremTextSource {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        let name = format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES));
        let paragraph: Vec<String> = (0..self.sentences).map(|_| self.sentence()).collect();
        Some((name, paragraph.join(" ")))
    }
}

/// Endless `(source, quote)` pairs drawn uniformly from an existing quotes
/// CSV.
pub struct CsvTextSource {
    rows: Vec<(String, String)>,
    rng: StdRng,
}

impl CsvTextSource {
    pub fn load(path: &Path, escape: Option<u8>, seed: u64) -> Result<Self> {
        let rows: Vec<(String, String)> = quotes::read_rows(path, escape)?
            .into_iter()
            .map(|row| (row.quote_source, row.quote))
            .collect();
        ensure!(!rows.is_empty(), "no quotes found in: {}", path.display());
        Ok(Self {
            rows,
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Iterator for CsvTextSource {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.choose(&mut self.rng).cloned()
    }
}
