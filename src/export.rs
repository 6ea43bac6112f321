//! Full-table CSV export.

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::info;

use crate::{
    cli::ExportArgs, config::FULL_ROW_LIMIT, encoding, extract, model::TableData, resolve_format,
    resolve_options,
};

pub fn execute(args: &ExportArgs) -> Result<()> {
    let options = resolve_options(&args.source)?;
    let output_encoding = match &args.output_encoding {
        Some(label) => encoding::resolve_label(label)?,
        None => UTF_8,
    };
    let input = &args.source.input;
    let format = resolve_format(&args.source)?;
    let limit = args.limit.unwrap_or(FULL_ROW_LIMIT);
    let data = extract::read_table_with(
        input,
        format,
        &args.table,
        limit,
        &options.mdb_tools(),
        &options,
    )
    .with_context(|| format!("Reading table '{}' from {input:?}", args.table))?;

    let bytes = encode(&to_csv(&data)?, output_encoding)?;
    write_output(args.output.as_deref(), &bytes)?;
    info!(
        "Exported {} row(s) of '{}'{}",
        data.rows.len(),
        args.table,
        if data.truncated { " (row limit reached)" } else { "" }
    );
    Ok(())
}

/// Renders `data` as CSV with a header row. Null cells are written empty.
pub fn to_csv(data: &TableData) -> Result<String> {
    let headers = data.headers();
    let mut writer = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .from_writer(Vec::new());
    writer
        .write_record(&headers)
        .context("Writing CSV header")?;
    for (idx, row) in data.rows.iter().enumerate() {
        let cells = headers.iter().map(|key| match row.get(key) {
            Some(value) if !value.is_null() => value.as_display(),
            _ => String::new(),
        });
        writer
            .write_record(cells)
            .with_context(|| format!("Writing row {}", idx + 1))?;
    }
    let bytes = writer.into_inner().map_err(|err| anyhow!("{}", err.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn encode(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>> {
    if encoding == UTF_8 {
        return Ok(text.as_bytes().to_vec());
    }
    let (encoded, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(anyhow!(
            "Table contains characters that cannot be encoded as {}",
            encoding.name()
        ));
    }
    Ok(encoded.into_owned())
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("Writing output file {path:?}"))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush().context("Flushing stdout")
        }
    }
}
