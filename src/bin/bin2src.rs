//! Turn a binary file into a Rust byte-slice literal.
//!
//! ```text
//! bin2src --var CREDENTIALS -o src/credentials_data.rs credentials.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use gdownload::codegen::{self, Format, Options};

#[derive(Parser, Debug)]
#[command(
    name = "bin2src",
    version,
    about = "Generate a Rust byte-slice literal from a binary file"
)]
struct Cli {
    /// File to embed
    #[arg(value_name = "FILENAME")]
    input: PathBuf,

    /// Wrap the declaration in `pub mod NAME`
    #[arg(long, value_name = "NAME")]
    package: Option<String>,

    /// Variable name
    #[arg(long = "var", value_name = "NAME", default_value = "DATA")]
    var_name: String,

    /// Number of bytes per line
    #[arg(
        long,
        value_name = "NUMBER",
        default_value_t = 16,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    step: u32,

    /// Byte representation: hexx, hex, dec, shexx, or shex
    #[arg(long, default_value_t = Format::Hexx)]
    format: Format,

    /// No declaration of the variable, initializer expression only
    #[arg(long = "init-only")]
    init_only: bool,

    /// Output file name (default: standard output)
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = Options {
        package: cli.package,
        var_name: cli.var_name,
        step: cli.step as usize,
        format: cli.format,
        init_only: cli.init_only,
    };

    let source = codegen::generate_file(&cli.input, &options)
        .with_context(|| format!("Could not read input file {}", cli.input.display()))?;

    match &cli.output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Could not open output file {}", path.display()))?;
            file.write_all(source.as_bytes())?;
        }
        None => std::io::stdout().lock().write_all(source.as_bytes())?,
    }
    Ok(())
}
