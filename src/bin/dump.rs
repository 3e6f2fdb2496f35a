use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser;
use rbsp::{
    cli::{self, LogArgs},
    emit::JsonLines,
    Bsp,
};
use serde::Serialize;

/// Print the lump directory of an RBSP map as JSON Lines.
#[derive(Parser)]
#[command(name = "dump", version)]
struct Cli {
    /// Path to the .bsp file
    filename: PathBuf,

    #[command(flatten)]
    log: LogArgs,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryEntry {
    index: usize,
    lump: &'static str,
    file_offset: u32,
    file_length: u32,
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
    let file = File::open(&cli.filename)
        .with_context(|| format!("unable to read BSP {}", cli.filename.display()))?;
    let bsp = Bsp::open(BufReader::new(file)).context("unable to parse BSP header")?;

    let mut sink = JsonLines::new(io::stdout().lock());
    for (kind, lump) in bsp.header().lumps() {
        sink.emit(&DirectoryEntry {
            index: kind.index(),
            lump: kind.name(),
            file_offset: lump.offset(),
            file_length: lump.length(),
        })?;
    }
    sink.into_inner()?;
    Ok(())
}
