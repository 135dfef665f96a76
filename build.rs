//! Build script writing the `panictrace(1)` manual page for the demo binary.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
#[allow(dead_code, reason = "only the command definition is needed here")]
mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let out_dir = Path::new("target/generated-man");
    std::fs::create_dir_all(out_dir)?;

    let mut page = BufWriter::new(File::create(out_dir.join("panictrace.1"))?);
    Man::new(cli::Cli::command()).render(&mut page)?;
    page.flush()?;
    Ok(())
}
