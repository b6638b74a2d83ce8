use tracing::{debug, info, info_span};

use crate::config::Options;
use crate::error::{Error, StructuralError};
use crate::graph::GraphBuilder;
use crate::layout::{Layout, OverlapResolver, SpanningTreeLayout};
use crate::parse::{parse_smiles, ParseNode};
use crate::rings::RingPerception;
use crate::stereo::StereochemistryAssigner;

/// Runs the whole pipeline for one molecule at a time: graph, rings,
/// coordinates, overlap resolution, stereo, normalization.
///
/// The engine only holds its options, so one engine can lay out any number
/// of molecules and separate engines can run on separate threads.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    options: Options,
}

impl LayoutEngine {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Read a SMILES string and lay it out.
    ///
    /// # Arguments
    ///
    /// * `smiles` - The SMILES text, e.g. `"c1ccccc1O"`.
    ///
    /// # Returns
    ///
    /// * `Result<Layout, Error>` - The normalized layout, or the first
    ///   syntax or structural problem found.
    pub fn layout_smiles(&self, smiles: &str) -> Result<Layout, Error> {
        let smiles = smiles.trim();
        if smiles.is_empty() {
            return Err(StructuralError::EmptyMolecule.into());
        }
        let tree = parse_smiles(smiles)?;
        self.layout(&tree)
    }

    /// Lay out an already parsed molecule.
    pub fn layout(&self, tree: &ParseNode) -> Result<Layout, Error> {
        let span = info_span!("layout", atoms = tree.atom_count());
        let _guard = span.enter();

        let mut graph = GraphBuilder::new(&self.options).build(tree)?;
        let mut rings = RingPerception::new().perceive(&mut graph)?;
        debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            rings = rings.len(),
            systems = rings.systems.len(),
            "perceived rings"
        );

        SpanningTreeLayout::new(&self.options).run(&mut graph, &mut rings);
        let resolver = OverlapResolver::new(&self.options);
        let overlap = resolver.run(&mut graph, &mut rings);
        let stereo = StereochemistryAssigner::new(&self.options).run(&mut graph, &mut rings);
        // Cis/trans corrections may have mirrored part of the drawing.
        let score = if stereo.mirrored > 0 {
            resolver.score(&graph)
        } else {
            overlap.score
        };

        let layout = Layout::finalize(&mut graph, &rings, score, &self.options);
        info!(
            formula = %layout.formula,
            overlap = score,
            wedges = stereo.wedges,
            mirrored = stereo.mirrored,
            "laid out molecule"
        );
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;

    #[test]
    fn test_blank_input_is_empty_molecule() {
        let engine = LayoutEngine::default();
        assert_eq!(
            engine.layout_smiles("   "),
            Err(Error::Structural(StructuralError::EmptyMolecule))
        );
    }

    #[test]
    fn test_syntax_errors_pass_through() {
        let engine = LayoutEngine::default();
        match engine.layout_smiles("CC(C") {
            Err(Error::Syntax(SyntaxError { position, .. })) => assert_eq!(position, 4),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_structural_errors_pass_through() {
        let engine = LayoutEngine::default();
        assert_eq!(
            engine.layout_smiles("C1CC"),
            Err(Error::Structural(StructuralError::UnclosedRing { label: 1 }))
        );
    }

    #[test]
    fn test_ethanol() {
        let engine = LayoutEngine::default();
        let layout = engine.layout_smiles("CCO").unwrap();
        assert_eq!(layout.atoms.len(), 3);
        assert_eq!(layout.bonds.len(), 2);
        assert!(layout.rings.is_empty());
        assert_eq!(layout.formula, "C2H6O");
        for bond in &layout.bonds {
            let length = layout.atoms[bond.source]
                .position
                .distance(layout.atoms[bond.target].position);
            assert!((length - 30.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_engine_is_reusable() {
        let engine = LayoutEngine::new(Options::default().with_bond_length(20.0));
        let first = engine.layout_smiles("c1ccccc1").unwrap();
        let _ = engine.layout_smiles("CC(=O)O").unwrap();
        let again = engine.layout_smiles("c1ccccc1").unwrap();
        assert_eq!(first, again);
        assert!((first.rings[0].radius - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_score_follows_cis_correction() {
        // Written cis, first drawn trans; the tert-butyl groups meet once mirrored.
        let smiles = "CC(C)(C)/C=C\\C(C)(C)C";
        let options = Options::default();
        let tree = parse_smiles(smiles).unwrap();
        let mut graph = GraphBuilder::new(&options).build(&tree).unwrap();
        let mut rings = RingPerception::new().perceive(&mut graph).unwrap();
        SpanningTreeLayout::new(&options).run(&mut graph, &mut rings);
        let resolver = OverlapResolver::new(&options);
        let resolved = resolver.run(&mut graph, &mut rings);
        let stereo = StereochemistryAssigner::new(&options).run(&mut graph, &mut rings);
        assert_eq!(resolved.score, 0.0);
        assert_eq!(stereo.mirrored, 1);

        let layout = LayoutEngine::new(options.clone()).layout_smiles(smiles).unwrap();
        assert!(layout.overlap_score > 0.0);
        assert_eq!(layout.overlap_score, resolver.score(&graph));
    }
}
