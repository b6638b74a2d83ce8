//! Wedge and hash bonds for tetrahedral centers, and cis/trans markers for
//! double bonds. A double bond written with `/` and `\` is also drawn the
//! way it was written.
//!
//! Substituents are ranked by a simplified CIP comparison: atomic numbers
//! sphere by sphere outward from the center, each sphere sorted descending,
//! with multiple bonds contributing duplicate entries. Anything the ranking
//! cannot tell apart is left unannotated.

use std::cmp::Reverse;
use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::config::Options;
use crate::graph::{BondStereo, BondType, CisTrans, EdgeId, MolecularGraph, VertexId, WedgeKind};
use crate::math::{determinant3, parity, PlaneExt, Vector2, EPSILON};
use crate::parse::ChiralityTag;
use crate::rings::RingSet;

/// Atomic numbers met in each sphere around a substituent, highest first.
type SphereKey = Vec<Vec<u8>>;

/// What the stereo stage annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StereoReport {
    pub centers: usize,
    pub wedges: usize,
    pub double_bonds: usize,
    /// Tagged centers or marked double bonds left without annotation.
    pub skipped: usize,
    /// Double bonds whose drawing was mirrored to match the written relation.
    pub mirrored: usize,
}

pub struct StereochemistryAssigner<'a> {
    options: &'a Options,
}

impl<'a> StereochemistryAssigner<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    pub fn run(&self, graph: &mut MolecularGraph, rings: &mut RingSet) -> StereoReport {
        let mut report = StereoReport::default();
        if !self.options.isomeric {
            return report;
        }

        let tagged: Vec<VertexId> = graph
            .vertices()
            .filter(|v| v.atom.chirality().is_some())
            .map(|v| v.id)
            .collect();
        for center in tagged {
            report.centers += 1;
            if self.assign_center(graph, center) {
                report.wedges += 1;
            } else {
                report.skipped += 1;
            }
        }

        let doubles: Vec<EdgeId> = graph
            .edges()
            .filter(|e| e.bond_type == BondType::Double && !e.in_ring && e.source != e.target)
            .map(|e| e.id)
            .collect();
        for edge in doubles {
            match self.assign_double_bond(graph, rings, edge, &mut report.mirrored) {
                Some(_) => report.double_bonds += 1,
                None if has_directional_bonds(graph, edge) => report.skipped += 1,
                None => {}
            }
        }

        debug!(
            centers = report.centers,
            wedges = report.wedges,
            double_bonds = report.double_bonds,
            skipped = report.skipped,
            mirrored = report.mirrored,
            "assigned stereochemistry"
        );
        report
    }

    /// Flag one bond of a tetrahedral center as wedge or hash. Returns false
    /// when the center has to be skipped.
    fn assign_center(&self, graph: &mut MolecularGraph, center: VertexId) -> bool {
        let Some(tag) = graph.atom(center).chirality() else {
            return false;
        };
        let substituents: Vec<Option<VertexId>> = graph.atom(center).stereo_neighbours().to_vec();
        let hydrogens = substituents.iter().filter(|s| s.is_none()).count();
        if substituents.len() != 4 || hydrogens > 1 {
            trace!(center, count = substituents.len(), "not a tetrahedral center");
            return false;
        }

        let keys: Vec<SphereKey> = substituents
            .iter()
            .map(|s| sphere_key(graph, center, *s))
            .collect();
        // Rank 0 is the highest priority.
        let mut ranked: Vec<usize> = (0..4).collect();
        ranked.sort_by(|a, b| keys[*b].cmp(&keys[*a]));
        if ranked.windows(2).any(|w| keys[w[0]] == keys[w[1]]) {
            trace!(center, "substituents cannot be ranked");
            return false;
        }
        for (rank, index) in ranked.iter().enumerate() {
            if let Some(neighbour) = substituents[*index] {
                graph.atom_mut(neighbour).priority = rank;
            }
        }

        // The tag describes the substituents in written order; restate it
        // for the ranked order.
        let tag = if parity(&ranked) < 0 { tag.inverted() } else { tag };

        let mut bonds: Vec<(usize, VertexId, EdgeId)> = ranked
            .iter()
            .enumerate()
            .filter_map(|(rank, index)| substituents[*index].map(|n| (rank, n)))
            .filter_map(|(rank, n)| graph.edge_between(center, n).map(|e| (rank, n, e)))
            .filter(|(_, n, e)| graph.edge(*e).stereo.is_none() && graph.atom(*n).drawn)
            .collect();
        bonds.sort_by_key(|(rank, n, e)| {
            (
                graph.edge(*e).in_ring,
                graph.atom(*n).chirality().is_some(),
                Reverse(*rank),
            )
        });

        let origin = graph.position(center);
        let planar: Vec<Option<Vector2>> = ranked
            .iter()
            .map(|index| substituents[*index].map(|n| (graph.position(n) - origin).normalize_or_zero()))
            .collect();

        for (rank, _, edge) in bonds {
            let volume = signed_volume(&planar, rank);
            if volume.abs() < EPSILON {
                continue;
            }
            let anticlockwise = volume < 0.0;
            let kind = if anticlockwise == (tag == ChiralityTag::Anticlockwise) {
                WedgeKind::Wedge
            } else {
                WedgeKind::Hash
            };
            graph.edge_mut(edge).stereo = Some(BondStereo { kind, origin: center });
            graph.atom_mut(center).is_stereo_center = true;
            trace!(center, edge, ?kind, "placed stereo bond");
            return true;
        }
        trace!(center, "no usable bond for a wedge");
        false
    }

    /// Mark a double bond with the relation of its top ranked substituents
    /// as drawn. When both ends carry `/` or `\` and the drawing disagrees
    /// with what was written, one side is mirrored first.
    fn assign_double_bond(
        &self,
        graph: &mut MolecularGraph,
        rings: &mut RingSet,
        edge: EdgeId,
        mirrored: &mut usize,
    ) -> Option<CisTrans> {
        let (a, b) = {
            let e = graph.edge(edge);
            (e.source, e.target)
        };
        let top_a = top_substituent(graph, a, b)?;
        let top_b = top_substituent(graph, b, a)?;

        if let Some(written) = written_relation(graph, a, b, top_a, top_b) {
            if geometry(graph, a, b, top_a, top_b)? != written {
                self.mirror_side(graph, rings, edge, a, b);
                *mirrored += 1;
            }
        }
        let drawn = geometry(graph, a, b, top_a, top_b)?;
        graph.edge_mut(edge).cis_trans = Some(drawn);
        trace!(edge, ?drawn, "marked double bond");
        Some(drawn)
    }

    /// Reflect the smaller half of the molecule across the double bond axis.
    fn mirror_side(&self, graph: &mut MolecularGraph, rings: &mut RingSet, edge: EdgeId, a: VertexId, b: VertexId) {
        let (Some(side_a), Some(side_b)) = (graph.side(edge, a), graph.side(edge, b)) else {
            return;
        };
        let side = if side_b.len() <= side_a.len() { side_b } else { side_a };
        let (pa, pb) = (graph.position(a), graph.position(b));
        for vertex in &side {
            let mirrored = graph.position(*vertex).reflect_across(pa, pb);
            graph.vertex_mut(*vertex).position = mirrored;
        }
        for ring in rings.rings.iter_mut() {
            if ring.members.iter().all(|m| side.binary_search(m).is_ok()) {
                ring.center = ring.center.reflect_across(pa, pb);
            }
        }
    }
}

/// Outward spheres of atomic numbers starting at `start`, seen from
/// `center`. Hydrogens count as atomic number 1.
fn sphere_key(graph: &MolecularGraph, center: VertexId, start: Option<VertexId>) -> SphereKey {
    let Some(start) = start else {
        return vec![vec![1]];
    };
    let mut seen = vec![false; graph.vertex_count()];
    seen[center] = true;
    seen[start] = true;
    let mut spheres = vec![vec![graph.atom(start).atomic_number()]];
    let mut frontier = VecDeque::from([start]);

    while !frontier.is_empty() {
        // Atoms of earlier spheres, the center included.
        let known = seen.clone();
        let mut sphere = Vec::new();
        let mut next = VecDeque::new();
        for vertex in frontier {
            for _ in 0..graph.atom(vertex).hydrogen_count() {
                sphere.push(1);
            }
            for e in graph.incident_edges(vertex) {
                let edge = graph.edge(e);
                let other = edge.other(vertex);
                if other == vertex || known[other] {
                    continue;
                }
                for _ in 0..edge.bond_type.valence().max(1) {
                    sphere.push(graph.atom(other).atomic_number());
                }
                if !seen[other] {
                    seen[other] = true;
                    next.push_back(other);
                }
            }
        }
        if sphere.is_empty() {
            break;
        }
        sphere.sort_unstable_by(|a, b| b.cmp(a));
        spheres.push(sphere);
        frontier = next;
    }
    spheres
}

/// Determinant of the tetrahedron spanned by the ranked substituents, with
/// the substituent at `raised` lifted towards the viewer and an implicit
/// hydrogen pushed away behind the others.
fn signed_volume(planar: &[Option<Vector2>], raised: usize) -> f64 {
    let sum = planar
        .iter()
        .flatten()
        .fold(Vector2::ZERO, |acc, v| acc + *v);
    let points: Vec<[f64; 3]> = planar
        .iter()
        .enumerate()
        .map(|(rank, v)| match v {
            Some(v) if rank == raised => [v.x, v.y, 1.0],
            Some(v) => [v.x, v.y, 0.0],
            None => {
                let opposite = (-sum).normalize_or_zero();
                [opposite.x, opposite.y, -1.0]
            }
        })
        .collect();
    let relative = |i: usize| {
        [
            points[i][0] - points[0][0],
            points[i][1] - points[0][1],
            points[i][2] - points[0][2],
        ]
    };
    determinant3(relative(1), relative(2), relative(3))
}

fn has_directional_bonds(graph: &MolecularGraph, edge: EdgeId) -> bool {
    let e = graph.edge(edge);
    directional_substituent(graph, e.source, e.target).is_some()
        && directional_substituent(graph, e.target, e.source).is_some()
}

/// The first neighbour of `end` (other than `across`) joined by `/` or `\`,
/// with that bond.
fn directional_substituent(graph: &MolecularGraph, end: VertexId, across: VertexId) -> Option<(VertexId, EdgeId)> {
    graph
        .incident_edges(end)
        .into_iter()
        .map(|e| (graph.edge(e).other(end), e))
        .filter(|(n, _)| *n != across && *n != end)
        .find(|(_, e)| matches!(graph.edge(*e).bond_type, BondType::Up | BondType::Down))
}

/// The highest ranked neighbour of `end` other than `across`. `None` when
/// there is none or two of them tie.
fn top_substituent(graph: &MolecularGraph, end: VertexId, across: VertexId) -> Option<VertexId> {
    let mut ranked: Vec<(SphereKey, VertexId)> = graph
        .neighbours(end)
        .iter()
        .copied()
        .filter(|n| *n != across && *n != end)
        .map(|n| (sphere_key(graph, end, Some(n)), n))
        .collect();
    if ranked.is_empty() || ranked.len() > 2 {
        return None;
    }
    ranked.sort_by(|x, y| y.0.cmp(&x.0));
    if ranked.len() == 2 && ranked[0].0 == ranked[1].0 {
        return None;
    }
    Some(ranked[0].1)
}

/// The relation of `top_a` and `top_b` spelled out by the `/` and `\`
/// bonds around `a=b`, if both ends have one.
fn written_relation(
    graph: &MolecularGraph,
    a: VertexId,
    b: VertexId,
    top_a: VertexId,
    top_b: VertexId,
) -> Option<CisTrans> {
    let (marked_a, bond_a) = directional_substituent(graph, a, b)?;
    let (marked_b, bond_b) = directional_substituent(graph, b, a)?;

    // Bond symbols as read left to right through the double bond.
    let symbol_a = written_direction(graph, bond_a, marked_a, a);
    let symbol_b = written_direction(graph, bond_b, b, marked_b);
    let mut written = if symbol_a == symbol_b {
        CisTrans::Trans
    } else {
        CisTrans::Cis
    };
    if marked_a != top_a {
        written = flip(written);
    }
    if marked_b != top_b {
        written = flip(written);
    }
    Some(written)
}

/// Direction of `edge` as if written from `first` to `second`.
fn written_direction(graph: &MolecularGraph, edge: EdgeId, first: VertexId, second: VertexId) -> BondType {
    let e = graph.edge(edge);
    let reversed = e.source == second && e.target == first;
    match (e.bond_type, reversed) {
        (BondType::Up, true) => BondType::Down,
        (BondType::Down, true) => BondType::Up,
        (bond, _) => bond,
    }
}

/// How `x` (on `a`) and `y` (on `b`) sit relative to the axis `a`-`b`.
fn geometry(graph: &MolecularGraph, a: VertexId, b: VertexId, x: VertexId, y: VertexId) -> Option<CisTrans> {
    let (pa, pb) = (graph.position(a), graph.position(b));
    let axis = pb - pa;
    let side_x = axis.perp_dot(graph.position(x) - pa);
    let side_y = axis.perp_dot(graph.position(y) - pa);
    if side_x.abs() < EPSILON || side_y.abs() < EPSILON {
        return None;
    }
    Some(if side_x.signum() == side_y.signum() {
        CisTrans::Cis
    } else {
        CisTrans::Trans
    })
}

fn flip(relation: CisTrans) -> CisTrans {
    match relation {
        CisTrans::Cis => CisTrans::Trans,
        CisTrans::Trans => CisTrans::Cis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::layout::SpanningTreeLayout;
    use crate::parse::parse_smiles;
    use crate::rings::RingPerception;

    fn assign(smiles: &str, options: &Options) -> (MolecularGraph, StereoReport) {
        let tree = parse_smiles(smiles).unwrap();
        let mut graph = GraphBuilder::new(options).build(&tree).unwrap();
        let mut rings = RingPerception::new().perceive(&mut graph).unwrap();
        SpanningTreeLayout::new(options).run(&mut graph, &mut rings);
        let report = StereochemistryAssigner::new(options).run(&mut graph, &mut rings);
        (graph, report)
    }

    fn stereo_bonds(graph: &MolecularGraph) -> Vec<(EdgeId, BondStereo)> {
        graph
            .edges()
            .filter_map(|e| e.stereo.map(|s| (e.id, s)))
            .collect()
    }

    #[test]
    fn test_single_wedge_per_center() {
        let options = Options::default();
        let (graph, report) = assign("F[C@H](Cl)Br", &options);
        let bonds = stereo_bonds(&graph);
        assert_eq!(bonds.len(), 1);
        assert_eq!(bonds[0].1.origin, 1);
        assert_eq!(report.wedges, 1);
        assert!(graph.atom(1).is_stereo_center);
        // Fluorine is the lowest ranked heavy substituent.
        assert_eq!(graph.edge(bonds[0].0).other(1), 0);
    }

    #[test]
    fn test_opposite_tags_flip_the_wedge() {
        let options = Options::default();
        let (left, _) = assign("F[C@H](Cl)Br", &options);
        let (right, _) = assign("F[C@@H](Cl)Br", &options);
        let (left, right) = (stereo_bonds(&left), stereo_bonds(&right));
        assert_eq!(left[0].0, right[0].0);
        assert_ne!(left[0].1.kind, right[0].1.kind);
    }

    #[test]
    fn test_equivalent_writings_agree() {
        let options = Options::default();
        // Swapping two substituents and the tag describes the same molecule.
        let (a, _) = assign("F[C@H](Cl)Br", &options);
        let (b, _) = assign("F[C@@H](Br)Cl", &options);
        let wedge = |g: &MolecularGraph| {
            let (edge, stereo) = stereo_bonds(g)[0];
            (g.atom(g.edge(edge).other(1)).element.clone(), stereo.kind)
        };
        let (element_a, kind_a) = wedge(&a);
        let (element_b, kind_b) = wedge(&b);
        assert_eq!(element_a, element_b);
        // Cl and Br swap places in the drawing, so the same bond shows the
        // other face.
        assert_ne!(kind_a, kind_b);
    }

    #[test]
    fn test_priorities_are_recorded() {
        let options = Options::default();
        let (graph, _) = assign("F[C@H](Cl)Br", &options);
        assert_eq!(graph.atom(3).priority, 0); // Br
        assert_eq!(graph.atom(2).priority, 1); // Cl
        assert_eq!(graph.atom(0).priority, 2); // F
    }

    #[test]
    fn test_tied_substituents_are_skipped() {
        let options = Options::default();
        let (graph, report) = assign("C[C@H](C)Cl", &options);
        assert!(stereo_bonds(&graph).is_empty());
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_deeper_spheres_break_ties() {
        let options = Options::default();
        let (graph, report) = assign("CC[C@H](C)O", &options);
        assert_eq!(report.wedges, 1);
        assert_eq!(stereo_bonds(&graph).len(), 1);
    }

    #[test]
    fn test_sphere_key_counts_bond_order() {
        let options = Options::default();
        let tree = parse_smiles("OC(=O)C").unwrap();
        let graph = GraphBuilder::new(&options).build(&tree).unwrap();
        let key = sphere_key(&graph, 3, Some(1));
        // The hydroxyl hydrogen shows up one sphere further out.
        assert_eq!(key, vec![vec![6], vec![8, 8, 8], vec![1]]);
    }

    #[test]
    fn test_trans_double_bond() {
        let options = Options::default();
        let (graph, report) = assign("C/C=C/C", &options);
        assert_eq!(report.double_bonds, 1);
        let double = graph.edges().find(|e| e.bond_type == BondType::Double).unwrap();
        assert_eq!(double.cis_trans, Some(CisTrans::Trans));
    }

    #[test]
    fn test_cis_double_bond_is_drawn_cis() {
        let options = Options::default();
        let (graph, _) = assign("C/C=C\\C", &options);
        let double = graph.edges().find(|e| e.bond_type == BondType::Double).unwrap();
        assert_eq!(double.cis_trans, Some(CisTrans::Cis));
        assert_eq!(geometry(&graph, 1, 2, 0, 3), Some(CisTrans::Cis));
    }

    #[test]
    fn test_unmarked_double_bond_follows_the_drawing() {
        let options = Options::default();
        // The zig-zag chain puts the two methyls on opposite sides.
        let (graph, report) = assign("CC=CC", &options);
        assert_eq!(report.double_bonds, 1);
        let double = graph.edges().find(|e| e.bond_type == BondType::Double).unwrap();
        assert_eq!(double.cis_trans, Some(CisTrans::Trans));
        assert_eq!(report.skipped, 0);

        // Nothing to compare on a terminal carbon or a carbonyl.
        let (graph, report) = assign("CC=C", &options);
        assert_eq!(report.double_bonds, 0);
        assert!(graph.edges().all(|e| e.cis_trans.is_none()));
        let (_, report) = assign("CC(=O)C", &options);
        assert_eq!(report.double_bonds, 0);
    }

    #[test]
    fn test_disabled_when_not_isomeric() {
        let options = Options::default().with_isomeric(false);
        let (graph, report) = assign("F[C@H](Cl)Br", &options);
        assert_eq!(report, StereoReport::default());
        assert!(stereo_bonds(&graph).is_empty());
    }
}
