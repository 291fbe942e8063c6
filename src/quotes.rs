use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::{Read, Write};
use std::path::Path;

pub const FIELDS: [&str; 4] = ["image", "quote_source", "quote", "style"];

const IMAGE_COLUMN: usize = 0;
const SOURCE_COLUMN: usize = 1;
const QUOTE_COLUMN: usize = 2;
const STYLE_COLUMN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRow {
    pub image: Option<String>,
    pub quote_source: String,
    pub quote: String,
    pub style: Option<String>,
}

impl QuoteRow {
    /// Quote text with literal `\n` escapes turned into real newlines.
    pub fn quote_text(&self) -> String {
        self.quote.replace("\\n", "\n")
    }
}

/// Reads positional quote rows after a header line. With `escape`, quotes
/// inside quoted fields are escaped by that byte instead of being doubled.
pub fn read_rows(path: &Path, escape: Option<u8>) -> Result<Vec<QuoteRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open CSV: {}", path.display()))?;
    read_rows_from(file, escape).with_context(|| format!("failed to read CSV: {}", path.display()))
}

pub fn read_rows_from<R: Read>(reader: R, escape: Option<u8>) -> Result<Vec<QuoteRow>> {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).flexible(true);
    if let Some(escape) = escape {
        builder.escape(Some(escape)).double_quote(false);
    }
    let mut reader = builder.from_reader(reader);

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        let record = record.with_context(|| format!("malformed CSV row {}", line))?;
        rows.push(parse_record(&record, line)?);
    }
    Ok(rows)
}

fn parse_record(record: &StringRecord, line: usize) -> Result<QuoteRow> {
    let quote_source = optional_field(record, SOURCE_COLUMN)
        .ok_or_else(|| anyhow!("row {}: missing quote_source", line))?;
    let quote = optional_field(record, QUOTE_COLUMN)
        .ok_or_else(|| anyhow!("row {}: missing quote", line))?;
    Ok(QuoteRow {
        image: optional_field(record, IMAGE_COLUMN),
        quote_source,
        quote,
        style: optional_field(record, STYLE_COLUMN),
    })
}

/// Empty cells and pandas' `nan` both mean "not provided".
fn optional_field(record: &StringRecord, column: usize) -> Option<String> {
    let value = record.get(column)?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return None;
    }
    Some(value.to_string())
}

pub fn write_rows(path: &Path, rows: &[QuoteRow]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create CSV: {}", path.display()))?;
    write_rows_to(file, rows).with_context(|| format!("failed to write CSV: {}", path.display()))
}

pub fn write_rows_to<W: Write>(writer: W, rows: &[QuoteRow]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(FIELDS)?;
    for row in rows {
        writer.write_record([
            row.image.as_deref().unwrap_or(""),
            row.quote_source.as_str(),
            row.quote.as_str(),
            row.style.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_positional_columns_and_optional_cells() {
        let data = "image,quote_source,quote,style\n\
                    sunrise.jpg,Seneca,\"Luck is what happens, when preparation meets opportunity.\",top\n\
                    ,Anonymous,Keep going,\n\
                    nan,Rumi,Be still,auto\n";
        let rows = read_rows_from(data.as_bytes(), None).expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].image.as_deref(), Some("sunrise.jpg"));
        assert_eq!(
            rows[0].quote,
            "Luck is what happens, when preparation meets opportunity."
        );
        assert_eq!(rows[0].style.as_deref(), Some("top"));
        assert_eq!(rows[1].image, None);
        assert_eq!(rows[1].style, None);
        assert_eq!(rows[2].image, None);
        assert_eq!(rows[2].style.as_deref(), Some("auto"));
    }

    #[test]
    fn short_rows_leave_style_empty() {
        let data = "image,quote_source,quote,style\na.jpg,Ada,Compute\n";
        let rows = read_rows_from(data.as_bytes(), None).expect("rows");
        assert_eq!(rows[0].style, None);
    }

    #[test]
    fn missing_quote_reports_row_number() {
        let data = "image,quote_source,quote,style\na.jpg,Ada,Compute,full\nb.jpg,Bob,,full\n";
        let err = read_rows_from(data.as_bytes(), None).err().expect("error");
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn honours_custom_escape_character() {
        let data = "image,quote_source,quote,style\n,Ada,\"She said \\\"compute\\\"\",\n";
        let rows = read_rows_from(data.as_bytes(), Some(b'\\')).expect("rows");
        assert_eq!(rows[0].quote, "She said \"compute\"");
    }

    #[test]
    fn converts_literal_newline_escapes() {
        let row = QuoteRow {
            image: None,
            quote_source: "x".to_string(),
            quote: "line one\\nline two".to_string(),
            style: None,
        };
        assert_eq!(row.quote_text(), "line one\nline two");
    }

    #[test]
    fn written_rows_read_back_unchanged() {
        let rows = vec![
            QuoteRow {
                image: Some("a.jpg".to_string()),
                quote_source: "Ada, Countess".to_string(),
                quote: "Multi\nline \"quoted\" text".to_string(),
                style: Some("left".to_string()),
            },
            QuoteRow {
                image: None,
                quote_source: "Bob".to_string(),
                quote: "plain".to_string(),
                style: None,
            },
        ];
        let mut buffer = Vec::new();
        write_rows_to(&mut buffer, &rows).expect("write");
        let text = String::from_utf8(buffer.clone()).expect("utf8");
        assert!(text.starts_with("image,quote_source,quote,style\n"));
        let back = read_rows_from(buffer.as_slice(), None).expect("read");
        assert_eq!(back, rows);
    }
}
