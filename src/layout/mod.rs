//! Coordinate assignment and the finished, normalized [`Layout`].
//!
//! [`SpanningTreeLayout`] gives every vertex an initial position,
//! [`OverlapResolver`] untangles the result, and [`Layout::finalize`] turns
//! the graph into the plain data a painter consumes.

mod overlap;
mod tree;

pub use overlap::*;
pub use tree::*;

use crate::config::Options;
use crate::graph::{BondStereo, BondType, CisTrans, EdgeId, MolecularGraph, VertexId};
use crate::math::{centroid, Vector2};
use crate::parse::ChiralityTag;
use crate::rings::RingSet;

/// Axis-aligned box around a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min: Vector2,
    pub max: Vector2,
}

impl Bounds {
    /// The smallest box containing every point, `None` when there are none.
    pub fn of<I: IntoIterator<Item = Vector2>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Bounds {
            min: first,
            max: first,
        };
        for p in points {
            bounds.min = Vector2::new(bounds.min.x.min(p.x), bounds.min.y.min(p.y));
            bounds.max = Vector2::new(bounds.max.x.max(p.x), bounds.max.y.max(p.y));
        }
        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutAtom {
    pub id: VertexId,
    pub element: String,
    pub position: Vector2,
    pub hydrogens: u8,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Condensed label such as `CF3` when neighbours were folded into this atom.
    pub pseudo_label: Option<String>,
    pub drawn: bool,
    pub aromatic: bool,
    pub degree: usize,
    pub chirality: Option<ChiralityTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBond {
    pub id: EdgeId,
    pub source: VertexId,
    pub target: VertexId,
    pub bond_type: BondType,
    pub order: f64,
    pub aromatic: bool,
    pub stereo: Option<BondStereo>,
    pub cis_trans: Option<CisTrans>,
    pub in_ring: bool,
    /// Draw a double bond as two lines straddling the axis.
    pub centered: bool,
    /// Center of the smallest ring holding this bond; the inner line of a
    /// ring double bond is drawn towards it.
    pub ring_center: Option<Vector2>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRing {
    pub members: Vec<VertexId>,
    pub center: Vector2,
    pub aromatic: bool,
    pub radius: f64,
}

/// Final coordinates and drawing attributes of one molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub atoms: Vec<LayoutAtom>,
    pub bonds: Vec<LayoutBond>,
    pub rings: Vec<LayoutRing>,
    pub overlap_score: f64,
    /// Box around the drawn atoms after normalization.
    pub bounds: Bounds,
    /// Canvas size: the fit box when one was configured, otherwise the
    /// bounds plus padding on every side.
    pub width: f64,
    pub height: f64,
    /// Factor applied to every length while fitting the canvas.
    pub scale: f64,
    pub formula: String,
    pub weight: f64,
}

impl Layout {
    /// Normalize the coordinates of a laid out graph and collect everything a
    /// painter needs.
    ///
    /// The drawing is translated so its box starts at `(padding, padding)`.
    /// With a fit box configured it is scaled down, never up, and centered.
    pub fn finalize(
        graph: &mut MolecularGraph,
        rings: &RingSet,
        overlap_score: f64,
        options: &Options,
    ) -> Layout {
        mark_centered_double_bonds(graph);

        let drawn = graph.vertices().filter(|v| v.atom.drawn).map(|v| v.position);
        let source = Bounds::of(drawn)
            .or_else(|| Bounds::of(graph.vertices().map(|v| v.position)))
            .unwrap_or_default();

        let padding = options.padding;
        let mut scale: f64 = 1.0;
        if let Some(width) = options.width {
            let room = width - 2.0 * padding;
            if room > 0.0 && source.width() > room {
                scale = scale.min(room / source.width());
            }
        }
        if let Some(height) = options.height {
            let room = height - 2.0 * padding;
            if room > 0.0 && source.height() > room {
                scale = scale.min(room / source.height());
            }
        }

        let content = Vector2::new(source.width() * scale, source.height() * scale);
        let width = options.width.unwrap_or(content.x + 2.0 * padding);
        let height = options.height.unwrap_or(content.y + 2.0 * padding);
        let offset = Vector2::new(
            padding + ((width - 2.0 * padding - content.x) / 2.0).max(0.0),
            padding + ((height - 2.0 * padding - content.y) / 2.0).max(0.0),
        );
        let place = |p: Vector2| (p - source.min) * scale + offset;

        let atoms: Vec<LayoutAtom> = graph
            .vertices()
            .map(|v| LayoutAtom {
                id: v.id,
                element: v.atom.element.clone(),
                position: place(v.position),
                hydrogens: v.atom.hydrogen_count(),
                charge: v.atom.charge(),
                isotope: v.atom.isotope(),
                pseudo_label: v.atom.pseudo_label(),
                drawn: v.atom.drawn,
                aromatic: v.atom.aromatic,
                degree: v.degree(),
                chirality: v.atom.chirality(),
            })
            .collect();

        let layout_rings: Vec<LayoutRing> = rings
            .rings
            .iter()
            .map(|ring| {
                let center = place(ring.center);
                let radius = ring
                    .members
                    .iter()
                    .map(|m| atoms[*m].position.distance(center))
                    .sum::<f64>()
                    / ring.size() as f64;
                LayoutRing {
                    members: ring.members.clone(),
                    center,
                    aromatic: ring.aromatic,
                    radius,
                }
            })
            .collect();

        let bonds = graph
            .edges()
            .map(|e| {
                let ring_center = e
                    .in_ring
                    .then(|| {
                        rings
                            .rings
                            .iter()
                            .find(|r| r.are_adjacent(e.source, e.target))
                            .map(|r| layout_rings[r.id].center)
                    })
                    .flatten();
                LayoutBond {
                    id: e.id,
                    source: e.source,
                    target: e.target,
                    bond_type: e.bond_type,
                    order: e.weight,
                    aromatic: e.is_part_of_aromatic_ring,
                    stereo: e.stereo,
                    cis_trans: e.cis_trans,
                    in_ring: e.in_ring,
                    centered: e.center,
                    ring_center,
                }
            })
            .collect();

        let bounds = Bounds::of(atoms.iter().filter(|a| a.drawn).map(|a| a.position))
            .or_else(|| Bounds::of(atoms.iter().map(|a| a.position)))
            .unwrap_or_default();

        Layout {
            atoms,
            bonds,
            rings: layout_rings,
            overlap_score,
            bounds,
            width,
            height,
            scale,
            formula: graph.molecular_formula(),
            weight: graph.molecular_weight(),
        }
    }

    pub fn atom(&self, id: VertexId) -> &LayoutAtom {
        &self.atoms[id]
    }

    /// Geometric center of the drawn atoms.
    pub fn center(&self) -> Vector2 {
        centroid(self.atoms.iter().filter(|a| a.drawn).map(|a| a.position)).unwrap_or_default()
    }
}

/// Double bonds outside rings are drawn centered when one end carries
/// nothing else and the other end branches, as in a carbonyl, or when both
/// ends are terminal.
fn mark_centered_double_bonds(graph: &mut MolecularGraph) {
    let centered: Vec<EdgeId> = graph
        .edges()
        .filter(|e| e.bond_type == BondType::Double && !e.in_ring)
        .filter(|e| {
            let (a, b) = (graph.vertex(e.source).degree(), graph.vertex(e.target).degree());
            (a == 1 && b == 1) || (a == 1 && b >= 3) || (b == 1 && a >= 3)
        })
        .map(|e| e.id)
        .collect();
    for edge in centered {
        graph.edge_mut(edge).center = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::parse::parse_smiles;
    use crate::rings::RingPerception;

    fn finalize(smiles: &str, options: &Options) -> Layout {
        let tree = parse_smiles(smiles).unwrap();
        let mut graph = GraphBuilder::new(options).build(&tree).unwrap();
        let mut rings = RingPerception::new().perceive(&mut graph).unwrap();
        SpanningTreeLayout::new(options).run(&mut graph, &mut rings);
        Layout::finalize(&mut graph, &rings, 0.0, options)
    }

    #[test]
    fn test_translated_to_padding() {
        let options = Options::default();
        let layout = finalize("CCCC", &options);
        assert!((layout.bounds.min.x - 20.0).abs() < 1e-9);
        assert!((layout.bounds.min.y - 20.0).abs() < 1e-9);
        assert!((layout.width - (layout.bounds.width() + 40.0)).abs() < 1e-9);
        assert_eq!(layout.scale, 1.0);
    }

    #[test]
    fn test_never_scaled_up() {
        let options = Options::default().with_size(1000.0, 1000.0);
        let layout = finalize("CC", &options);
        assert_eq!(layout.scale, 1.0);
        let length = layout.atoms[0].position.distance(layout.atoms[1].position);
        assert!((length - 30.0).abs() < 1e-9);
        // Centered in the fit box.
        let center = layout.center();
        assert!((center.x - 500.0).abs() < 1e-9);
        assert!((center.y - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_scaled_down_to_fit() {
        let options = Options::default().with_size(100.0, 100.0);
        let layout = finalize("CCCCCCCCCCCC", &options);
        assert!(layout.scale < 1.0);
        assert!(layout.bounds.width() <= 60.0 + 1e-9);
        assert!(layout.bounds.min.x >= 20.0 - 1e-9);
        assert!(layout.bounds.max.x <= 80.0 + 1e-9);
    }

    #[test]
    fn test_ring_data_is_carried_over() {
        let options = Options::default();
        let layout = finalize("c1ccccc1", &options);
        assert_eq!(layout.rings.len(), 1);
        assert!(layout.rings[0].aromatic);
        assert!((layout.rings[0].radius - 30.0).abs() < 1e-6);
        assert!(layout.bonds.iter().all(|b| b.aromatic && b.ring_center.is_some()));
        assert_eq!(layout.formula, "C6H6");
    }

    #[test]
    fn test_carbonyl_is_centered() {
        let options = Options::default();
        let layout = finalize("CC(=O)C", &options);
        let carbonyl = layout
            .bonds
            .iter()
            .find(|b| b.bond_type == BondType::Double)
            .unwrap();
        assert!(carbonyl.centered);

        let layout = finalize("CC=CC", &options);
        assert!(layout.bonds.iter().all(|b| !b.centered));
    }
}
