use anyhow::{Context, Result};
use log::info;

use crate::{cli::PreviewArgs, extract, resolve_format, resolve_options, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let options = resolve_options(&args.source)?;
    let input = &args.source.input;
    let format = resolve_format(&args.source)?;
    let data = extract::read_table_with(
        input,
        format,
        &args.table,
        args.rows,
        &options.mdb_tools(),
        &options,
    )
    .with_context(|| format!("Reading table '{}' from {input:?}", args.table))?;

    print!("{}", table::render_table(&data, args.rows));
    info!(
        "Displayed {} row(s) of '{}' from {:?}",
        data.rows.len(),
        args.table,
        input
    );
    Ok(())
}
