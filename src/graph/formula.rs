use std::collections::BTreeMap;

use crate::element::{atomic_mass, WILDCARD};
use crate::graph::MolecularGraph;

impl MolecularGraph {
    /// Element counts including implicit and bracket hydrogens.
    pub fn element_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for vertex in self.vertices() {
            let atom = &vertex.atom;
            if atom.element != WILDCARD {
                *counts.entry(atom.element.clone()).or_insert(0) += 1;
            }
            let hydrogens = atom.hydrogen_count() as usize;
            if hydrogens > 0 {
                *counts.entry("H".to_string()).or_insert(0) += hydrogens;
            }
        }
        counts
    }

    /// Molecular formula in Hill order: carbon, hydrogen, then the rest
    /// alphabetically; strictly alphabetical when there is no carbon.
    pub fn molecular_formula(&self) -> String {
        let mut counts = self.element_counts();
        let mut formula = String::new();
        let mut push = |symbol: &str, count: usize| {
            formula.push_str(symbol);
            if count > 1 {
                formula.push_str(&count.to_string());
            }
        };

        if let Some(carbon) = counts.remove("C") {
            push("C", carbon);
            if let Some(hydrogen) = counts.remove("H") {
                push("H", hydrogen);
            }
        }
        for (symbol, count) in &counts {
            push(symbol.as_str(), *count);
        }
        formula
    }

    /// Sum of standard atomic weights, in g/mol.
    pub fn molecular_weight(&self) -> f64 {
        self.element_counts()
            .iter()
            .map(|(symbol, count)| atomic_mass(symbol).unwrap_or(0.0) * *count as f64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Options;
    use crate::graph::GraphBuilder;
    use crate::parse::parse_smiles;

    fn formula(smiles: &str) -> String {
        let tree = parse_smiles(smiles).unwrap();
        let graph = GraphBuilder::new(&Options::default()).build(&tree).unwrap();
        graph.molecular_formula()
    }

    #[test]
    fn test_hill_formula() {
        assert_eq!(formula("CCO"), "C2H6O");
        assert_eq!(formula("c1ccccc1"), "C6H6");
        assert_eq!(formula("O"), "H2O");
        assert_eq!(formula("[Na+].[Cl-]"), "ClNa");
        assert_eq!(formula("CC(=O)O"), "C2H4O2");
        assert_eq!(formula("c1cc[nH]c1"), "C4H5N");
    }

    #[test]
    fn test_molecular_weight() {
        let tree = parse_smiles("CCO").unwrap();
        let graph = GraphBuilder::new(&Options::default()).build(&tree).unwrap();
        assert!((graph.molecular_weight() - 46.069).abs() < 0.01);
    }
}
