use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use enlighten::classifier::{self, CentroidModel, FeatureCache, StyleClassifier};
use enlighten::generator::{CsvTextSource, DataGenerator, LoremTextSource, PseudoRandomSelector};
use enlighten::pipeline::{self, RenderOptions};
use enlighten::render::RenderStyle;
use enlighten::settings::{self, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "enlighten",
    version,
    about = "Render quotes onto images inside a translucent, auto-fitted text box"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Read extra settings from a local TOML file
    #[arg(long = "read-settings", global = true)]
    read_settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every row of a quotes CSV into a JPEG
    Render(RenderArgs),
    /// Generate a synthetic quotes CSV with seeded image/style picks
    Generate(GenerateArgs),
    /// Train the style model from a labelled quotes CSV
    Train(TrainArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long = "images-fpath", default_value = "images")]
    images: PathBuf,

    #[arg(long = "output-fpath", default_value = "output")]
    output: PathBuf,

    #[arg(long = "fonts-fpath", default_value = "fonts")]
    fonts: PathBuf,

    #[arg(short = 'i', long = "input-csv", default_value = "input.csv")]
    input_csv: PathBuf,

    /// Escape character for quotes inside quoted CSV fields. There is no
    /// backslash default: unset means doubled quotes, pass `-x '\'` for
    /// backslash-escaped files.
    #[arg(short = 'x', long = "escape-char")]
    escape_char: Option<char>,

    /// Font file name inside the fonts directory
    #[arg(short = 'f', long = "font", default_value = "ArchivoBlack-Regular.ttf")]
    font: String,

    /// Exclusive upper bound of the font size search
    #[arg(long = "font-size", default_value_t = 200)]
    font_size: u32,

    /// Spaces prepended to every wrapped line (defaults to settings)
    #[arg(long = "tab-width")]
    tab_width: Option<usize>,

    /// Overwrite existing outputs
    #[arg(long = "force")]
    force: bool,

    /// Overlay style; "auto" uses the CSV, then the style model, then a random pick
    #[arg(short = 'r', long = "render-style", default_value = "full")]
    render_style: RenderStyle,

    /// Style model JSON (defaults to settings [classifier] model_path)
    #[arg(long = "model")]
    model: Option<PathBuf>,

    /// Seed for random image and style fallbacks
    #[arg(long = "seed")]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long = "images-fpath", default_value = "images")]
    images: PathBuf,

    #[arg(long = "output-csv", default_value = "generated.csv")]
    output_csv: PathBuf,

    #[arg(long = "seed", default_value_t = 0)]
    seed: u64,

    #[arg(long = "max-data", default_value_t = 256)]
    max_data: usize,

    /// Draw quotes from this CSV instead of generated text
    #[arg(long = "text-csv")]
    text_csv: Option<PathBuf>,

    #[arg(short = 'x', long = "escape-char")]
    escape_char: Option<char>,
}

#[derive(Args, Debug)]
struct TrainArgs {
    #[arg(short = 'i', long = "input-csv", default_value = "input.csv")]
    input_csv: PathBuf,

    #[arg(long = "images-fpath", default_value = "images")]
    images: PathBuf,

    /// Output model JSON (defaults to settings [classifier] model_path)
    #[arg(long = "model")]
    model: Option<PathBuf>,

    /// Trailing fraction of rows held out for evaluation
    #[arg(long = "holdout", default_value_t = 0.2)]
    holdout: f32,

    #[arg(short = 'x', long = "escape-char")]
    escape_char: Option<char>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    enlighten::logging::init(cli.verbose)?;
    let settings = settings::load_settings(cli.read_settings.as_deref())?;

    match cli.command {
        Commands::Render(args) => run_render(args, &settings),
        Commands::Generate(args) => run_generate(args),
        Commands::Train(args) => run_train(args, &settings),
    }
}

fn run_render(args: RenderArgs, settings: &Settings) -> Result<()> {
    let options = RenderOptions {
        images_dir: args.images,
        output_dir: args.output,
        fonts_dir: args.fonts,
        input_csv: args.input_csv,
        render_style: args.render_style,
        escape: escape_byte(args.escape_char)?,
        font: args.font,
        font_size: args.font_size,
        tab_width: args.tab_width.unwrap_or(settings.tab_width),
        force: args.force,
        seed: args.seed,
    };
    let model_path = args.model.unwrap_or_else(|| settings.model_path());
    let model = load_model(&model_path);
    let classifier = model.as_ref().map(|model| model as &dyn StyleClassifier);

    let mut cache = FeatureCache::new();
    let written = pipeline::render(&options, settings, classifier, &mut cache)?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let generator = DataGenerator::new(&args.images, args.max_data).with_fallback_seed(args.seed);
    let mut selector = PseudoRandomSelector::new(u128::from(args.seed));
    let count = match args.text_csv {
        Some(path) => {
            let texts = CsvTextSource::load(&path, escape_byte(args.escape_char)?, args.seed)?;
            generator.generate_csv(&args.output_csv, &mut selector, texts)?
        }
        None => {
            let texts = LoremTextSource::new(args.seed, 3);
            generator.generate_csv(&args.output_csv, &mut selector, texts)?
        }
    };
    println!("{} rows -> {}", count, args.output_csv.display());
    Ok(())
}

fn run_train(args: TrainArgs, settings: &Settings) -> Result<()> {
    let mut cache = FeatureCache::new();
    let report = classifier::train_from_csv(
        &args.input_csv,
        &args.images,
        escape_byte(args.escape_char)?,
        args.holdout,
        &mut cache,
    )?;
    let model_path = args.model.unwrap_or_else(|| settings.model_path());
    report.model.save(&model_path)?;
    info!("saved style model to {}", model_path.display());

    println!(
        "train accuracy: {:.3} ({} samples)",
        report.train_accuracy, report.train_samples
    );
    match report.holdout_accuracy {
        Some(accuracy) => println!(
            "holdout accuracy: {:.3} ({} samples)",
            accuracy, report.holdout_samples
        ),
        None => println!("holdout accuracy: n/a"),
    }
    Ok(())
}

fn load_model(path: &Path) -> Option<CentroidModel> {
    if !path.exists() {
        warn!(
            "style model not found at {}; auto styles fall back to random picks",
            path.display()
        );
        return None;
    }
    match CentroidModel::load(path) {
        Ok(model) => Some(model),
        Err(err) => {
            warn!("ignoring style model: {:#}", err);
            None
        }
    }
}

fn escape_byte(value: Option<char>) -> Result<Option<u8>> {
    value
        .map(|ch| {
            u8::try_from(ch).map_err(|_| anyhow!("escape character must be ASCII: {:?}", ch))
        })
        .transpose()
}
