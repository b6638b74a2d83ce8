//! Ring perception: one ring per ring-closure bond, relaxed to the smallest
//! rings of fused systems, then classified into fused, spiro and bridged
//! connections and grouped into ring systems.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::unionfind::UnionFind;
use tracing::{debug, trace};

use crate::error::StructuralError;
use crate::graph::{BondType, EdgeId, MolecularGraph, RingId, VertexId};
use crate::math::Vector2;

#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub id: RingId,
    /// Members in cyclic order, starting at the lowest vertex id.
    pub members: Vec<VertexId>,
    /// Bonds of the ring, ascending.
    pub edges: Vec<EdgeId>,
    pub aromatic: bool,
    pub center: Vector2,
    pub positioned: bool,
    /// The ring-closure bond this ring was derived from.
    pub closure: EdgeId,
    /// Index into [`RingSet::systems`].
    pub system: usize,
}

impl Ring {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        self.members.contains(&vertex)
    }

    /// Vertices whose movement carries the ring center along.
    pub fn anchors(&self) -> &[VertexId] {
        &self.members
    }

    pub fn position_of(&self, vertex: VertexId) -> Option<usize> {
        self.members.iter().position(|v| *v == vertex)
    }

    /// Whether `a` and `b` follow each other in the cyclic order.
    pub fn are_adjacent(&self, a: VertexId, b: VertexId) -> bool {
        let n = self.members.len();
        match (self.position_of(a), self.position_of(b)) {
            (Some(i), Some(j)) => (i + 1) % n == j || (j + 1) % n == i,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingConnectionKind {
    /// Two rings sharing one bond.
    Fused,
    /// Two rings sharing a single atom.
    Spiro,
    /// Two rings sharing a path of atoms, or two atoms that are not bonded.
    Bridged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConnection {
    pub id: usize,
    pub rings: (RingId, RingId),
    /// Shared vertices, ordered along the first ring.
    pub shared: Vec<VertexId>,
    pub kind: RingConnectionKind,
    pub bridgeheads: Option<(VertexId, VertexId)>,
    /// Shared vertices from bridgehead to bridgehead; empty unless bridged.
    pub bridge_path: Vec<VertexId>,
}

impl RingConnection {
    pub fn involves(&self, ring: RingId) -> bool {
        self.rings.0 == ring || self.rings.1 == ring
    }

    pub fn other(&self, ring: RingId) -> RingId {
        if self.rings.0 == ring {
            self.rings.1
        } else {
            self.rings.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingSet {
    pub rings: Vec<Ring>,
    pub connections: Vec<RingConnection>,
    /// Ring ids of each ring system, ascending.
    pub systems: Vec<Vec<RingId>>,
}

impl RingSet {
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn ring(&self, id: RingId) -> &Ring {
        &self.rings[id]
    }

    pub fn ring_mut(&mut self, id: RingId) -> &mut Ring {
        &mut self.rings[id]
    }

    /// Connections of `ring`, ordered by the id of the other ring.
    pub fn connections_of(&self, ring: RingId) -> Vec<&RingConnection> {
        let mut connections: Vec<&RingConnection> = self
            .connections
            .iter()
            .filter(|c| c.involves(ring))
            .collect();
        connections.sort_by_key(|c| c.other(ring));
        connections
    }

    pub fn connection_between(&self, a: RingId, b: RingId) -> Option<&RingConnection> {
        self.connections
            .iter()
            .find(|c| c.involves(a) && c.involves(b) && a != b)
    }
}

/// Finds the rings of a freshly built graph and records ring membership on
/// its atoms and bonds.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingPerception;

/// A ring before ids are assigned.
#[derive(Debug, Clone)]
struct Cycle {
    members: Vec<VertexId>,
    edges: BTreeSet<EdgeId>,
    closure: EdgeId,
}

impl RingPerception {
    pub fn new() -> Self {
        Self
    }

    pub fn perceive(&self, graph: &mut MolecularGraph) -> Result<RingSet, StructuralError> {
        let mut cycles = fundamental_cycles(graph)?;
        relax(graph, &mut cycles);

        cycles.sort_by_key(|c| (c.members.len(), c.closure));
        let mut seen: BTreeSet<Vec<VertexId>> = BTreeSet::new();
        cycles.retain(|c| {
            let mut key = c.members.clone();
            key.sort_unstable();
            seen.insert(key)
        });

        let mut rings: Vec<Ring> = cycles
            .into_iter()
            .enumerate()
            .map(|(id, cycle)| Ring {
                id,
                members: cycle.members,
                edges: cycle.edges.into_iter().collect(),
                aromatic: false,
                center: Vector2::ZERO,
                positioned: false,
                closure: cycle.closure,
                system: 0,
            })
            .collect();

        mark_membership(graph, &mut rings);
        let connections = connect(graph, &rings);
        let systems = group_systems(&mut rings, &connections);

        debug!(
            rings = rings.len(),
            connections = connections.len(),
            systems = systems.len(),
            "perceived rings"
        );
        Ok(RingSet {
            rings,
            connections,
            systems,
        })
    }
}

/// One cycle per ring-closure bond: the bond plus the spanning-tree path
/// between its ends.
fn fundamental_cycles(graph: &MolecularGraph) -> Result<Vec<Cycle>, StructuralError> {
    let n = graph.vertex_count();
    let mut tree: Vec<Vec<(VertexId, EdgeId)>> = vec![Vec::new(); n];
    for edge in graph.edges().filter(|e| !e.is_ring_closure) {
        tree[edge.source].push((edge.target, edge.id));
        tree[edge.target].push((edge.source, edge.id));
    }

    let mut cycles = Vec::with_capacity(graph.ring_closures().len());
    for &closure in graph.ring_closures() {
        let edge = graph.edge(closure);
        let (members, mut edges) = tree_path(&tree, edge.source, edge.target);
        if members.len() < 3 {
            return Err(StructuralError::RingTooSmall {
                size: members.len(),
                members,
            });
        }
        edges.insert(closure);
        trace!(closure, size = members.len(), "fundamental cycle");
        cycles.push(Cycle {
            members: normalize_cycle(&members),
            edges,
            closure,
        });
    }
    Ok(cycles)
}

/// Breadth-first path between two vertices of the same spanning tree.
fn tree_path(
    tree: &[Vec<(VertexId, EdgeId)>],
    from: VertexId,
    to: VertexId,
) -> (Vec<VertexId>, BTreeSet<EdgeId>) {
    let mut previous: BTreeMap<VertexId, (VertexId, EdgeId)> = BTreeMap::new();
    let mut queue = VecDeque::from([from]);
    let mut visited = BTreeSet::from([from]);
    while let Some(vertex) = queue.pop_front() {
        if vertex == to {
            break;
        }
        for &(next, edge) in &tree[vertex] {
            if visited.insert(next) {
                previous.insert(next, (vertex, edge));
                queue.push_back(next);
            }
        }
    }

    let mut members = vec![to];
    let mut edges = BTreeSet::new();
    let mut current = to;
    while let Some(&(prev, edge)) = previous.get(&current) {
        members.push(prev);
        edges.insert(edge);
        current = prev;
    }
    members.reverse();
    (members, edges)
}

/// Replace rings by smaller ones obtained from their symmetric difference
/// with a smaller ring, until no ring can shrink.
fn relax(graph: &MolecularGraph, cycles: &mut [Cycle]) {
    loop {
        cycles.sort_by_key(|c| (c.edges.len(), c.closure));
        let mut changed = false;

        'search: for i in 0..cycles.len() {
            for j in 0..i {
                let (smaller, larger) = (&cycles[j], &cycles[i]);
                if smaller.edges.len() >= larger.edges.len()
                    || smaller.edges.is_disjoint(&larger.edges)
                {
                    continue;
                }
                let difference: BTreeSet<EdgeId> = larger
                    .edges
                    .symmetric_difference(&smaller.edges)
                    .copied()
                    .collect();
                if difference.len() >= larger.edges.len() {
                    continue;
                }
                if let Some(members) = simple_cycle(graph, &difference) {
                    trace!(
                        closure = cycles[i].closure,
                        from = cycles[i].members.len(),
                        to = members.len(),
                        "shrinking ring"
                    );
                    cycles[i].members = members;
                    cycles[i].edges = difference;
                    changed = true;
                    break 'search;
                }
            }
        }

        if !changed {
            break;
        }
    }
}

/// The members of `edges` in cyclic order when the edges form exactly one
/// simple cycle.
fn simple_cycle(graph: &MolecularGraph, edges: &BTreeSet<EdgeId>) -> Option<Vec<VertexId>> {
    let mut adjacency: BTreeMap<VertexId, Vec<VertexId>> = BTreeMap::new();
    for &id in edges {
        let edge = graph.edge(id);
        adjacency.entry(edge.source).or_default().push(edge.target);
        adjacency.entry(edge.target).or_default().push(edge.source);
    }
    if adjacency.len() < 3 || adjacency.values().any(|n| n.len() != 2) {
        return None;
    }

    let (&start, _) = adjacency.iter().next()?;
    let mut members = vec![start];
    let mut previous = start;
    let mut current = adjacency[&start][0];
    while current != start {
        members.push(current);
        let next = adjacency[&current]
            .iter()
            .copied()
            .find(|n| *n != previous)?;
        previous = current;
        current = next;
    }
    // A single cycle visits every vertex of the edge set.
    (members.len() == adjacency.len()).then(|| normalize_cycle(&members))
}

/// Rotate a cyclic vertex list to start at its lowest id and continue
/// towards the lower of that vertex's two ring neighbours.
fn normalize_cycle(members: &[VertexId]) -> Vec<VertexId> {
    let n = members.len();
    let Some((start, _)) = members.iter().enumerate().min_by_key(|(_, v)| **v) else {
        return Vec::new();
    };
    let forward = members[(start + 1) % n];
    let backward = members[(start + n - 1) % n];
    if forward <= backward {
        (0..n).map(|k| members[(start + k) % n]).collect()
    } else {
        (0..n).map(|k| members[(start + n - k) % n]).collect()
    }
}

/// Record ring ids on atoms and ring flags on bonds, and decide aromaticity.
fn mark_membership(graph: &mut MolecularGraph, rings: &mut [Ring]) {
    for ring in rings.iter_mut() {
        let bonds_aromatic = ring
            .edges
            .iter()
            .all(|e| graph.edge(*e).bond_type == BondType::Aromatic);
        let atoms_aromatic = ring.members.iter().all(|v| graph.atom(*v).aromatic);
        ring.aromatic = bonds_aromatic || atoms_aromatic;

        for &vertex in &ring.members {
            graph.atom_mut(vertex).rings.push(ring.id);
        }
        for &edge in &ring.edges {
            let edge = graph.edge_mut(edge);
            edge.in_ring = true;
            edge.is_part_of_aromatic_ring |= ring.aromatic;
        }
    }

    // Two aromatic atoms joined outside any ring, as in biphenyl written
    // without a bond symbol, are joined by a single bond.
    let demoted: Vec<EdgeId> = graph
        .edges()
        .filter(|e| e.bond_type == BondType::Aromatic && !e.in_ring)
        .filter(|e| graph.atom(e.source).is_in_ring() && graph.atom(e.target).is_in_ring())
        .map(|e| e.id)
        .collect();
    for id in demoted {
        let (source, target) = {
            let edge = graph.edge_mut(id);
            edge.bond_type = BondType::Single;
            edge.weight = BondType::Single.weight();
            (edge.source, edge.target)
        };
        for (child, parent) in [(source, target), (target, source)] {
            if graph.vertex(child).parent == Some(parent) {
                graph.atom_mut(child).bond_type = Some(BondType::Single);
            }
        }
    }
}

fn connect(graph: &mut MolecularGraph, rings: &[Ring]) -> Vec<RingConnection> {
    let mut connections = Vec::new();
    for (i, first) in rings.iter().enumerate() {
        for second in &rings[i + 1..] {
            let shared: Vec<VertexId> = first
                .members
                .iter()
                .copied()
                .filter(|v| second.contains(*v))
                .collect();
            if shared.is_empty() {
                continue;
            }

            let mut connection = RingConnection {
                id: connections.len(),
                rings: (first.id, second.id),
                shared: shared.clone(),
                kind: RingConnectionKind::Bridged,
                bridgeheads: None,
                bridge_path: Vec::new(),
            };
            if shared.len() == 1 {
                connection.kind = RingConnectionKind::Spiro;
            } else if shared.len() == 2
                && first.are_adjacent(shared[0], shared[1])
                && second.are_adjacent(shared[0], shared[1])
            {
                connection.kind = RingConnectionKind::Fused;
            } else {
                let path = bridge_path(first, &shared);
                if let (Some(&head), Some(&tail)) = (path.first(), path.last()) {
                    connection.bridgeheads = Some((head, tail));
                    graph.atom_mut(head).is_bridge_node = true;
                    graph.atom_mut(tail).is_bridge_node = true;
                }
                for &vertex in path.iter().skip(1).take(path.len().saturating_sub(2)) {
                    graph.atom_mut(vertex).is_bridge = true;
                }
                connection.bridge_path = path;
            }

            trace!(
                rings = ?connection.rings,
                kind = ?connection.kind,
                shared = ?connection.shared,
                "ring connection"
            );
            connections.push(connection);
        }
    }
    connections
}

/// Shared vertices in the ring's cyclic order, starting right after the
/// largest run of unshared members.
fn bridge_path(ring: &Ring, shared: &[VertexId]) -> Vec<VertexId> {
    let n = ring.size();
    let positions: Vec<usize> = ring
        .members
        .iter()
        .enumerate()
        .filter(|(_, v)| shared.contains(*v))
        .map(|(i, _)| i)
        .collect();
    let k = positions.len();
    if k == 0 {
        return Vec::new();
    }

    let mut start = 0;
    let mut widest = 0;
    for m in 0..k {
        let gap = (positions[(m + 1) % k] + n - positions[m]) % n;
        let gap = if gap == 0 { n } else { gap };
        if gap > widest {
            widest = gap;
            start = (m + 1) % k;
        }
    }
    (0..k)
        .map(|offset| ring.members[positions[(start + offset) % k]])
        .collect()
}

fn group_systems(rings: &mut [Ring], connections: &[RingConnection]) -> Vec<Vec<RingId>> {
    let mut union = UnionFind::<usize>::new(rings.len());
    for connection in connections {
        union.union(connection.rings.0, connection.rings.1);
    }

    let mut numbering: BTreeMap<usize, usize> = BTreeMap::new();
    let mut systems: Vec<Vec<RingId>> = Vec::new();
    for ring in rings.iter_mut() {
        let representative = union.find(ring.id);
        let next = numbering.len();
        let system = *numbering.entry(representative).or_insert(next);
        if system == systems.len() {
            systems.push(Vec::new());
        }
        systems[system].push(ring.id);
        ring.system = system;
    }
    systems
}
