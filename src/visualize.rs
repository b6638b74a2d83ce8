use std::fmt::Write as FmtWrite;
use std::io::Write;

use anyhow::{bail, Context};
use tracing::info;

use crate::draw::charge_suffix;
use crate::graph::{BondType, WedgeKind};
use crate::layout::{Layout, LayoutBond};

/// Exports a layout to Graphviz DOT with every atom pinned to its computed
/// position, and optionally renders it to PNG.
///
/// # Arguments
///
/// * `layout` - The finished layout.
/// * `output_dot` - The path to save the DOT file.
/// * `output_image` - Optional path to save the rendered image (e.g., "molecule.png").
///
/// Rendering runs `neato -n`, so Graphviz keeps the positions instead of
/// computing its own.
pub fn visualize_layout(layout: &Layout, output_dot: &str, output_image: Option<&str>) -> anyhow::Result<()> {
    let dot_string = generate_dot(layout).context("failed to format DOT output")?;

    let mut file = std::fs::File::create(output_dot)
        .with_context(|| format!("failed to create DOT file {}", output_dot))?;
    file.write_all(dot_string.as_bytes())
        .with_context(|| format!("failed to write DOT file {}", output_dot))?;
    info!(path = output_dot, "DOT file saved");

    if let Some(image_path) = output_image {
        let status = std::process::Command::new("neato")
            .args(["-n", "-Tpng", output_dot, "-o", image_path])
            .status()
            .context("failed to execute Graphviz 'neato'; is Graphviz installed?")?;
        if !status.success() {
            bail!("Graphviz 'neato' failed with status: {}", status);
        }
        info!(path = image_path, "image rendered");
    }

    Ok(())
}

/// The DOT representation of a layout: one pinned node per drawn atom, one
/// edge statement per drawn line.
pub fn generate_dot(layout: &Layout) -> Result<String, std::fmt::Error> {
    let mut dot_output = String::new();
    write_dot(&mut dot_output, layout)?;
    Ok(dot_output)
}

fn write_dot(out: &mut String, layout: &Layout) -> std::fmt::Result {
    writeln!(out, "graph Molecule {{")?;
    writeln!(out, "    layout=neato; splines=false; outputorder=edgesfirst;")?;
    writeln!(
        out,
        "    bb=\"0,0,{:.2},{:.2}\";",
        layout.width, layout.height
    )?;
    writeln!(
        out,
        "    node [shape=circle, fixedsize=true, width=0.25, fontsize=10, style=filled, fillcolor=white, color=white];"
    )?;

    for atom in layout.atoms.iter().filter(|a| a.drawn) {
        let label = match &atom.pseudo_label {
            Some(label) => label.clone(),
            None if atom.element == "C" && atom.charge == 0 && atom.degree > 0 => String::new(),
            None => format!("{}{}", atom.element, charge_suffix(atom.charge as i32)),
        };
        writeln!(
            out,
            "    {} [label=\"{}\", pos=\"{:.2},{:.2}!\"];",
            atom.id, label, atom.position.x, atom.position.y
        )?;
    }

    for bond in &layout.bonds {
        if !layout.atom(bond.source).drawn || !layout.atom(bond.target).drawn || bond.source == bond.target {
            continue;
        }
        let (style, penwidth, count) = bond_to_style(bond);
        for _ in 0..count {
            writeln!(
                out,
                "    {} -- {} [style={}, penwidth={}];",
                bond.source, bond.target, style, penwidth
            )?;
        }
    }

    writeln!(out, "}}")
}

/// Maps a bond to its Graphviz style, pen width and number of parallel edges.
fn bond_to_style(bond: &LayoutBond) -> (&'static str, f64, usize) {
    if let Some(stereo) = bond.stereo {
        return match stereo.kind {
            WedgeKind::Wedge => ("bold", 4.0, 1),
            WedgeKind::Hash => ("dashed", 2.0, 1),
        };
    }
    match bond.bond_type {
        BondType::Single | BondType::Up | BondType::Down => ("solid", 2.0, 1),
        BondType::Double => ("solid", 2.0, 2),
        BondType::Triple => ("solid", 2.0, 3),
        BondType::Quadruple => ("solid", 2.0, 4),
        BondType::Aromatic => ("dashed", 2.0, 1),
    }
}
