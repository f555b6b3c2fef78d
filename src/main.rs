use std::fs;

use anyhow::Context;

use man_index::cli::Cli;
use man_index::parser::XmlLoader;
use man_index::{index, render, serialize};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let loader = XmlLoader::new().with_entities_file(&cli.entities_file);

    if cli.verbose {
        for input in &cli.inputs {
            eprintln!("indexing {}", input.display());
        }
    }

    // Assemble fully before touching the output path, so a failing run never
    // leaves a truncated index behind.
    let index = index::build_index(&loader, &cli.inputs)?;
    let doc = render::render_index(&loader, &index)?;
    let bytes = serialize::to_bytes(&doc);

    fs::write(&cli.output, &bytes)
        .with_context(|| format!("cannot write {}", cli.output.display()))?;

    if cli.verbose {
        let (entries, pages) = index::totals(&index);
        eprintln!(
            "{}: {} entries, {} manual pages",
            cli.output.display(),
            entries,
            pages
        );
    }

    Ok(())
}
