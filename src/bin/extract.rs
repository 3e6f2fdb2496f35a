use std::{
    fs::File,
    io::{self, BufReader, BufWriter},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser;
use rbsp::{
    cli::{self, LogArgs},
    emit::JsonLines,
    Bsp, LumpSelector, TrailingBytes,
};
use tracing::info;

/// Print the entities or shaders of an RBSP map as JSON Lines.
#[derive(Parser)]
#[command(name = "extract", version)]
struct Cli {
    /// Path to the .bsp file
    filename: PathBuf,

    /// Lump to extract: ents, entities or shaders
    lump: String,

    /// Fail on a shaders lump whose length is not a whole number of records
    #[arg(long)]
    strict: bool,

    #[command(flatten)]
    log: LogArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    cli.log.init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            cli::report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    // Reject bad lump names before touching the file
    let selector: LumpSelector = cli.lump.parse()?;
    let trailing = if cli.strict {
        TrailingBytes::Reject
    } else {
        TrailingBytes::Ignore
    };

    let file = File::open(&cli.filename)
        .with_context(|| format!("unable to read BSP {}", cli.filename.display()))?;
    let mut bsp = Bsp::open(BufReader::new(file)).context("unable to parse BSP header")?;

    let records = bsp
        .extract(selector, trailing)
        .with_context(|| format!("unable to parse {} lump", selector.kind()))?;

    let mut sink = JsonLines::new(BufWriter::new(io::stdout().lock()));
    let count = records.emit(&mut sink).context("unable to write records")?;
    sink.into_inner().context("unable to write records")?;

    info!(lump = %selector.kind(), count, "extracted records");
    Ok(())
}
