//! Laying out a whole CSV file of molecules.

use std::fs::File;
use std::io::{Read, Write};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};
use tracing::{info, warn};

use crate::engine::LayoutEngine;

/// How a batch run went.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub molecules: usize,
    pub atoms: usize,
    /// Names of the molecules that could not be laid out.
    pub failed: Vec<String>,
}

/// Reads `name,smiles` records. A header row is expected; rows with fewer
/// than two fields are skipped.
pub fn read_molecules(csv_data: &str) -> Result<Vec<(String, String)>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let mut molecules = Vec::new();
    for result in rdr.records() {
        let record = result.context("malformed CSV record")?;
        if let (Some(name), Some(smiles)) = (record.get(0), record.get(1)) {
            molecules.push((name.to_string(), smiles.to_string()));
        }
    }
    Ok(molecules)
}

/// Lays out every molecule and writes one row per drawn atom:
/// `name,atom,element,x,y`. Molecules that fail are logged and listed in the
/// summary, the rest of the batch carries on.
pub fn write_coordinates<W: Write>(
    engine: &LayoutEngine,
    molecules: &[(String, String)],
    output: W,
) -> Result<BatchSummary> {
    let mut wtr = Writer::from_writer(output);
    wtr.write_record(["name", "atom", "element", "x", "y"])?;

    let mut summary = BatchSummary::default();
    for (name, smiles) in molecules {
        let layout = match engine.layout_smiles(smiles) {
            Ok(layout) => layout,
            Err(error) => {
                warn!(name = %name, %error, "skipping molecule");
                summary.failed.push(name.clone());
                continue;
            }
        };
        for atom in layout.atoms.iter().filter(|a| a.drawn) {
            wtr.write_record([
                name.clone(),
                atom.id.to_string(),
                atom.element.clone(),
                format!("{:.4}", atom.position.x),
                format!("{:.4}", atom.position.y),
            ])?;
            summary.atoms += 1;
        }
        summary.molecules += 1;
    }
    wtr.flush()?;
    Ok(summary)
}

/// Reads `input_csv`, lays out every molecule and writes the coordinates
/// to `output_csv`.
pub fn layout_csv_database(engine: &LayoutEngine, input_csv: &str, output_csv: &str) -> Result<BatchSummary> {
    let mut csv = File::open(input_csv).with_context(|| format!("failed to open {}", input_csv))?;
    let mut csv_data = String::new();
    csv.read_to_string(&mut csv_data)?;
    let molecules = read_molecules(&csv_data)?;

    let file = File::create(output_csv).with_context(|| format!("failed to create {}", output_csv))?;
    let summary = write_coordinates(engine, &molecules, file)?;
    info!(
        molecules = summary.molecules,
        failed = summary.failed.len(),
        "coordinates written to {}",
        output_csv
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = "name,smiles\nethanol,CCO\nbroken,C1CC\nbenzene,c1ccccc1\n";

    #[test]
    fn test_read_molecules() {
        let molecules = read_molecules(DATA).unwrap();
        assert_eq!(molecules.len(), 3);
        assert_eq!(molecules[0], ("ethanol".to_string(), "CCO".to_string()));
    }

    #[test]
    fn test_write_coordinates() {
        let molecules = read_molecules(DATA).unwrap();
        let mut out = Vec::new();
        let summary = write_coordinates(&LayoutEngine::default(), &molecules, &mut out).unwrap();
        assert_eq!(summary.molecules, 2);
        assert_eq!(summary.atoms, 9);
        assert_eq!(summary.failed, vec!["broken".to_string()]);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name,atom,element,x,y");
        assert_eq!(lines.len(), 10);
        assert!(lines[1].starts_with("ethanol,0,C,"));
    }
}
