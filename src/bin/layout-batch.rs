use anyhow::{Context, Result};
use clap::Parser;
use smiles_layout::*;

#[derive(Parser)]
#[command(
    name = "layout-batch",
    about = "Lay out every molecule of a name,smiles CSV file and write atom coordinates"
)]
struct Cli {
    /// Input CSV with a header row and `name,smiles` columns
    input: String,

    /// Output CSV (`name,atom,element,x,y`)
    #[arg(short, long, default_value = "coordinates.csv")]
    output: String,

    /// Set an option, e.g. `--set overlap_resolution_iterations=5`; repeatable
    #[arg(long = "set", value_name = "KEY=VALUE", action = clap::ArgAction::Append)]
    set: Vec<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let options = Options::from_assignments(cli.set.iter().map(String::as_str))
        .context("invalid --set option")?;
    let engine = LayoutEngine::new(options);
    let summary = layout_csv_database(&engine, &cli.input, &cli.output)?;
    if !summary.failed.is_empty() {
        eprintln!("{} molecule(s) failed: {}", summary.failed.len(), summary.failed.join(", "));
    }
    Ok(())
}
