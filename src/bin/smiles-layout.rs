use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use smiles_layout::*;

/// Output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// SVG document
    Svg,
    /// Graphviz DOT with pinned positions
    Dot,
    /// PNG rendered through Graphviz `neato`
    Png,
    /// Plain atom coordinates
    Coords,
}

#[derive(Parser)]
#[command(
    name = "smiles-layout",
    about = "Lay out a SMILES string as a 2D structure diagram",
    version
)]
struct Cli {
    /// The SMILES string to draw
    smiles: String,

    /// Output file (stdout if omitted; required for png)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "svg")]
    format: Format,

    /// Set an option, e.g. `--set bond_length=25`; repeatable
    #[arg(long = "set", value_name = "KEY=VALUE", action = clap::ArgAction::Append)]
    set: Vec<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let options = Options::from_assignments(cli.set.iter().map(String::as_str))
        .context("invalid --set option")?;
    let engine = LayoutEngine::new(options);
    let layout = engine
        .layout_smiles(&cli.smiles)
        .with_context(|| format!("failed to lay out '{}'", cli.smiles))?;

    let text = match cli.format {
        Format::Svg => {
            let mut painter = SvgPainter::for_layout(&layout, engine.options().bond_length);
            render(&layout, engine.options(), &mut painter);
            painter.finish()
        }
        Format::Dot => generate_dot(&layout).context("failed to format DOT output")?,
        Format::Coords => layout
            .atoms
            .iter()
            .filter(|a| a.drawn)
            .map(|a| format!("{}\t{}\t{:.4}\t{:.4}\n", a.id, a.element, a.position.x, a.position.y))
            .collect(),
        Format::Png => {
            let image = cli.output.as_ref().context("png output needs --output")?;
            let dot = image.with_extension("dot");
            visualize_layout(&layout, &dot.to_string_lossy(), Some(&image.to_string_lossy()))?;
            return Ok(());
        }
    };

    match &cli.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", text),
    }
    Ok(())
}
