use std::f64::consts::PI;

use tracing::{debug, trace, warn};

use crate::config::Options;
use crate::graph::{EdgeId, MolecularGraph, RingId, VertexId};
use crate::math::{segments_cross, PlaneExt, Vector2, EPSILON};
use crate::rings::RingSet;

/// Rotation tried in each direction when moving a subtree.
pub const ROTATION_STEP: f64 = PI / 9.0;

/// Score added for every pair of bonds that cross each other.
const CROSSING_PENALTY: f64 = 1.0;

/// Outcome of overlap resolution. `score` never exceeds `initial`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OverlapReport {
    pub initial: f64,
    pub score: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// A bond that is not part of any ring, with the smaller side that can be
/// swung around `pivot`.
#[derive(Debug, Clone)]
struct Candidate {
    edge: EdgeId,
    pivot: VertexId,
    child: VertexId,
    subtree: Vec<VertexId>,
    /// Rings lying entirely inside the subtree.
    rings: Vec<RingId>,
}

#[derive(Debug, Clone, Copy)]
enum Move {
    Reflect,
    Rotate(f64),
}

struct Penalties {
    total: f64,
    per_vertex: Vec<f64>,
}

/// Greedy local search that reflects and rotates acyclic subtrees while the
/// overlap score strictly improves.
pub struct OverlapResolver<'a> {
    options: &'a Options,
}

impl<'a> OverlapResolver<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    /// The current overlap score of `graph`.
    pub fn score(&self, graph: &MolecularGraph) -> f64 {
        self.penalties(graph).total
    }

    pub fn run(&self, graph: &mut MolecularGraph, rings: &mut RingSet) -> OverlapReport {
        let initial = self.score(graph);
        let mut score = initial;
        let mut iterations = 0;
        let candidates = candidates(graph, rings);

        while iterations < self.options.overlap_resolution_iterations && score > 0.0 {
            iterations += 1;
            let mut visited = vec![false; candidates.len()];
            let mut improved = false;

            while score > 0.0 {
                let penalties = self.penalties(graph);
                let worst = candidates
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !visited[*i])
                    .map(|(i, c)| {
                        let load: f64 = c.subtree.iter().map(|v| penalties.per_vertex[*v]).sum();
                        (i, load)
                    })
                    .filter(|(_, load)| *load > 0.0)
                    .fold(None, |best: Option<(usize, f64)>, (i, load)| match best {
                        Some((_, top)) if top >= load => best,
                        _ => Some((i, load)),
                    });
                let Some((index, load)) = worst else {
                    break;
                };
                visited[index] = true;

                let candidate = &candidates[index];
                for step in [Move::Reflect, Move::Rotate(ROTATION_STEP), Move::Rotate(-ROTATION_STEP)] {
                    let snapshot = Snapshot::take(graph, rings, candidate);
                    apply(graph, rings, candidate, step);
                    let trial = self.score(graph);
                    if trial < score {
                        trace!(edge = candidate.edge, ?step, load, from = score, to = trial, "accepted move");
                        score = trial;
                        improved = true;
                        break;
                    }
                    snapshot.restore(graph, rings);
                }
            }

            if !improved {
                break;
            }
        }

        let converged = score <= 0.0;
        if !converged {
            warn!(initial, score, iterations, "overlap resolution did not converge");
        }
        debug!(initial, score, iterations, candidates = candidates.len(), "resolved overlaps");
        OverlapReport {
            initial,
            score,
            iterations,
            converged,
        }
    }

    /// Close-contact and crossing penalties, in total and attributed to the
    /// vertices involved.
    fn penalties(&self, graph: &MolecularGraph) -> Penalties {
        let threshold = self.options.overlap_threshold();
        let limit = threshold * threshold;
        let mut per_vertex = vec![0.0; graph.vertex_count()];
        let mut total = 0.0;

        let mut drawn: Vec<(VertexId, Vector2)> = graph
            .vertices()
            .filter(|v| v.atom.drawn)
            .map(|v| (v.id, v.position))
            .collect();
        drawn.sort_by(|a, b| a.1.x.total_cmp(&b.1.x).then(a.0.cmp(&b.0)));
        for (i, (a, pa)) in drawn.iter().enumerate() {
            for (b, pb) in drawn[i + 1..].iter() {
                if pb.x - pa.x >= threshold {
                    break;
                }
                let d2 = pa.distance_squared(*pb);
                if d2 < limit {
                    let penalty = limit / d2.max(EPSILON) - 1.0;
                    total += penalty;
                    per_vertex[*a] += penalty;
                    per_vertex[*b] += penalty;
                }
            }
        }

        let mut segments: Vec<(VertexId, VertexId, Vector2, Vector2)> = graph
            .edges()
            .filter(|e| e.source != e.target)
            .filter(|e| graph.atom(e.source).drawn && graph.atom(e.target).drawn)
            .map(|e| (e.source, e.target, graph.position(e.source), graph.position(e.target)))
            .collect();
        segments.sort_by(|a, b| a.2.x.min(a.3.x).total_cmp(&b.2.x.min(b.3.x)));
        for (i, (s1, t1, a1, a2)) in segments.iter().enumerate() {
            let right = a1.x.max(a2.x);
            for (s2, t2, b1, b2) in segments[i + 1..].iter() {
                if b1.x.min(b2.x) > right {
                    break;
                }
                let shares = s1 == s2 || s1 == t2 || t1 == s2 || t1 == t2;
                if !shares && segments_cross(*a1, *a2, *b1, *b2) {
                    total += CROSSING_PENALTY;
                    for v in [s1, t1, s2, t2] {
                        per_vertex[*v] += CROSSING_PENALTY / 2.0;
                    }
                }
            }
        }

        Penalties { total, per_vertex }
    }
}

/// Every acyclic bond, oriented so that the smaller side moves. On a tie
/// the target side moves.
fn candidates(graph: &MolecularGraph, rings: &RingSet) -> Vec<Candidate> {
    let mut result = Vec::new();
    for edge in graph.edges() {
        if edge.in_ring || edge.source == edge.target {
            continue;
        }
        let Some(target_side) = graph.side(edge.id, edge.target) else {
            continue;
        };
        let component = graph
            .vertices()
            .filter(|v| v.component == graph.vertex(edge.source).component)
            .count();

        let (pivot, child, subtree) = if target_side.len() * 2 <= component {
            (edge.source, edge.target, target_side)
        } else {
            match graph.side(edge.id, edge.source) {
                Some(source_side) => (edge.target, edge.source, source_side),
                None => continue,
            }
        };
        let moved: Vec<RingId> = rings
            .rings
            .iter()
            .filter(|r| r.anchors().iter().all(|a| subtree.binary_search(a).is_ok()))
            .map(|r| r.id)
            .collect();
        result.push(Candidate {
            edge: edge.id,
            pivot,
            child,
            subtree,
            rings: moved,
        });
    }
    result
}

fn apply(graph: &mut MolecularGraph, rings: &mut RingSet, candidate: &Candidate, step: Move) {
    let pivot = graph.position(candidate.pivot);
    let child = graph.position(candidate.child);
    let transform = |point: Vector2| match step {
        Move::Reflect => point.reflect_across(pivot, child),
        Move::Rotate(angle) => point.rotate_around(pivot, angle),
    };
    for vertex in &candidate.subtree {
        let moved = transform(graph.position(*vertex));
        graph.vertex_mut(*vertex).position = moved;
    }
    for ring in &candidate.rings {
        let ring = rings.ring_mut(*ring);
        ring.center = transform(ring.center);
    }
}

/// Positions touched by a trial move, restored verbatim on rejection.
struct Snapshot {
    vertices: Vec<(VertexId, Vector2)>,
    centers: Vec<(RingId, Vector2)>,
}

impl Snapshot {
    fn take(graph: &MolecularGraph, rings: &RingSet, candidate: &Candidate) -> Self {
        Self {
            vertices: candidate
                .subtree
                .iter()
                .map(|v| (*v, graph.position(*v)))
                .collect(),
            centers: candidate
                .rings
                .iter()
                .map(|r| (*r, rings.ring(*r).center))
                .collect(),
        }
    }

    fn restore(self, graph: &mut MolecularGraph, rings: &mut RingSet) {
        for (vertex, position) in self.vertices {
            graph.vertex_mut(vertex).position = position;
        }
        for (ring, center) in self.centers {
            rings.ring_mut(ring).center = center;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::layout::SpanningTreeLayout;
    use crate::math::centroid;
    use crate::parse::parse_smiles;
    use crate::rings::RingPerception;

    fn prepare(smiles: &str, options: &Options) -> (MolecularGraph, RingSet) {
        let tree = parse_smiles(smiles).unwrap();
        let mut graph = GraphBuilder::new(options).build(&tree).unwrap();
        let mut rings = RingPerception::new().perceive(&mut graph).unwrap();
        SpanningTreeLayout::new(options).run(&mut graph, &mut rings);
        (graph, rings)
    }

    /// Butane with the last carbon folded back onto the first.
    fn folded_butane() -> (MolecularGraph, RingSet) {
        let options = Options::default();
        let (mut graph, rings) = prepare("CCCC", &options);
        graph.set_position(0, Vector2::new(0.0, 0.0));
        graph.set_position(1, Vector2::new(30.0, 0.0));
        graph.set_position(2, Vector2::new(30.0, 30.0));
        graph.set_position(3, Vector2::new(1.0, 0.0));
        (graph, rings)
    }

    #[test]
    fn test_ethane_has_nothing_to_resolve() {
        let options = Options::default();
        let (mut graph, mut rings) = prepare("CC", &options);
        let report = OverlapResolver::new(&options).run(&mut graph, &mut rings);
        assert_eq!(report.initial, 0.0);
        assert_eq!(report.score, 0.0);
        assert_eq!(report.iterations, 0);
        assert!(report.converged);
    }

    #[test]
    fn test_close_contact_is_penalized() {
        let options = Options::default();
        let (graph, _) = folded_butane();
        let resolver = OverlapResolver::new(&options);
        let threshold = options.overlap_threshold();
        // 0 and 3 are one unit apart.
        assert!(resolver.score(&graph) >= threshold * threshold - 1.0);
    }

    #[test]
    fn test_folded_chain_improves() {
        let options = Options::default();
        let (mut graph, mut rings) = folded_butane();
        let report = OverlapResolver::new(&options).run(&mut graph, &mut rings);
        assert!(report.score < report.initial);
        assert_eq!(report.iterations, 1);
        assert!(graph.position(0).distance(graph.position(3)) > 1.0);
    }

    #[test]
    fn test_zero_budget_changes_nothing() {
        let options = Options::default().with_overlap_resolution_iterations(0);
        let (mut graph, mut rings) = folded_butane();
        let before: Vec<Vector2> = graph.vertices().map(|v| v.position).collect();
        let report = OverlapResolver::new(&options).run(&mut graph, &mut rings);
        let after: Vec<Vector2> = graph.vertices().map(|v| v.position).collect();
        assert_eq!(before, after);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.score, report.initial);
        assert!(!report.converged);
    }

    #[test]
    fn test_score_never_increases() {
        let options = Options::default().with_overlap_resolution_iterations(5);
        for smiles in [
            "CC(C)(C)C(C)(C)C(C)(C)C",
            "c1ccccc1C(c1ccccc1)(c1ccccc1)c1ccccc1",
            "CCCCCCCCCCCCCCCCCC",
            "OC(=O)C1=CC=CC=C1OC(C)=O",
        ] {
            let (mut graph, mut rings) = prepare(smiles, &options);
            let report = OverlapResolver::new(&options).run(&mut graph, &mut rings);
            assert!(report.score <= report.initial, "{}", smiles);
            assert!(graph.vertices().all(|v| v.position.is_finite()));
        }
    }

    #[test]
    fn test_candidates_move_the_smaller_side() {
        let options = Options::default();
        let (graph, rings) = prepare("c1ccccc1CCCCCCCC", &options);
        let candidates = candidates(&graph, &rings);
        // Ring bonds never move.
        assert!(candidates.iter().all(|c| !graph.edge(c.edge).in_ring));
        let link = candidates
            .iter()
            .find(|c| graph.edge(c.edge).connects(5, 6))
            .unwrap();
        assert_eq!(link.pivot, 6);
        assert_eq!(link.subtree, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(link.rings, vec![0]);
    }

    #[test]
    fn test_moved_ring_keeps_its_center() {
        let options = Options::default();
        let (mut graph, mut rings) = prepare("c1ccccc1CCCCCCCC", &options);
        let candidates = candidates(&graph, &rings);
        let link = candidates
            .iter()
            .find(|c| graph.edge(c.edge).connects(5, 6))
            .unwrap();
        apply(&mut graph, &mut rings, link, Move::Rotate(ROTATION_STEP));
        let members = centroid(rings.ring(0).members.iter().map(|v| graph.position(*v))).unwrap();
        assert!(members.distance(rings.ring(0).center) < 1e-6);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let options = Options::default().with_overlap_resolution_iterations(3);
        let smiles = "CC(C)(C)c1cc(C(C)(C)C)c(O)c(C(C)(C)C)c1";
        let run = || {
            let (mut graph, mut rings) = prepare(smiles, &options);
            let report = OverlapResolver::new(&options).run(&mut graph, &mut rings);
            let positions: Vec<Vector2> = graph.vertices().map(|v| v.position).collect();
            (report, positions)
        };
        assert_eq!(run(), run());
    }
}
