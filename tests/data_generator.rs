use std::fs;

use enlighten::generator::{DataGenerator, LoremTextSource, PseudoRandomSelector};
use enlighten::quotes;
use enlighten::render::RenderStyle;

fn images_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["sunrise.jpg", "forest.png", "harbor.JPG", "notes.txt"] {
        fs::write(dir.path().join(name), b"placeholder").expect("write");
    }
    dir
}

fn generate(images: &std::path::Path, output: &std::path::Path, seed: u64) -> usize {
    let generator = DataGenerator::new(images, 12);
    let mut selector = PseudoRandomSelector::new(u128::from(seed));
    generator
        .generate_csv(output, &mut selector, LoremTextSource::new(seed, 2))
        .expect("generate")
}

#[test]
fn same_seed_writes_identical_csv() {
    let images = images_dir();
    let out = tempfile::tempdir().expect("tempdir");
    let first = out.path().join("first.csv");
    let second = out.path().join("second.csv");
    let other = out.path().join("other.csv");

    assert_eq!(generate(images.path(), &first, 2024), 12);
    assert_eq!(generate(images.path(), &second, 2024), 12);
    generate(images.path(), &other, 2025);

    let first = fs::read(&first).expect("read");
    assert_eq!(first, fs::read(&second).expect("read"));
    assert_ne!(first, fs::read(&other).expect("read"));
}

#[test]
fn generated_rows_read_back_with_images_and_styles() {
    let images = images_dir();
    let out = tempfile::tempdir().expect("tempdir");
    let path = out.path().join("generated.csv");
    generate(images.path(), &path, 5);

    let header = fs::read_to_string(&path)
        .expect("read")
        .lines()
        .next()
        .map(str::to_string)
        .expect("header");
    insta::assert_snapshot!(header, @"image,quote_source,quote,style");

    let rows = quotes::read_rows(&path, None).expect("rows");
    assert_eq!(rows.len(), 12);
    for row in rows {
        let image = row.image.expect("image");
        assert!(["forest.png", "harbor.JPG", "sunrise.jpg"].contains(&image.as_str()));
        let style: RenderStyle = row.style.expect("style").parse().expect("style");
        assert!(!style.is_auto());
        assert!(!row.quote_source.is_empty());
        assert!(row.quote.ends_with('.'));
    }
}
