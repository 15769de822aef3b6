//! Loading the raw transaction log using Polars

use anyhow::Context;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

/// Load a comma-delimited transaction log into a data frame
///
/// The file is decoded as ISO-8859-1 so that stray non-UTF-8 bytes in product
/// descriptions never abort the read. Columns are kept as found in the file.
///
/// # Arguments
/// * `path` - Path to the CSV file
///
/// # Returns
/// * The raw transactions, one row per line of the file
pub fn load_data(path: impl AsRef<Path>) -> crate::Result<DataFrame> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read transaction log {}", path.display()))?;
    let text = decode_latin1(&bytes);

    // Infer over the whole file: cancellations ("C536379") can first show up
    // far below the default inference window.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()
        .with_context(|| format!("failed to parse transaction log {}", path.display()))?;

    log::info!(
        "load: {} rows, {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Latin-1 maps every byte to the code point of the same value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
