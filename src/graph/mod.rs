//! The molecular graph: atoms wrapped in vertices, bonds as edges, stored in
//! a `petgraph` arena whose indices double as stable ids.

use std::collections::VecDeque;

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::math::Vector2;

mod atom;
pub use atom::*;

mod builder;
pub use builder::*;

mod formula;

pub type VertexId = usize;
pub type EdgeId = usize;
pub type RingId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondType {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
    /// Directional single bond `/`.
    Up,
    /// Directional single bond `\`.
    Down,
}

impl BondType {
    /// Bond order, 1.5 for aromatic bonds.
    pub fn weight(self) -> f64 {
        match self {
            Self::Single | Self::Up | Self::Down => 1.0,
            Self::Double => 2.0,
            Self::Triple => 3.0,
            Self::Quadruple => 4.0,
            Self::Aromatic => 1.5,
        }
    }

    /// Valence consumed on each end; aromatic bonds count one.
    pub fn valence(self) -> u8 {
        match self {
            Self::Single | Self::Up | Self::Down | Self::Aromatic => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Quadruple => 4,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Single => "-",
            Self::Double => "=",
            Self::Triple => "#",
            Self::Quadruple => "$",
            Self::Aromatic => ":",
            Self::Up => "/",
            Self::Down => "\\",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WedgeKind {
    /// Solid wedge, the bond points towards the viewer.
    Wedge,
    /// Hashed wedge, the bond points away from the viewer.
    Hash,
}

/// A wedge or hash on a bond, drawn narrow at `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BondStereo {
    pub kind: WedgeKind,
    pub origin: VertexId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CisTrans {
    Cis,
    Trans,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: VertexId,
    pub target: VertexId,
    pub bond_type: BondType,
    pub weight: f64,
    pub is_ring_closure: bool,
    pub is_part_of_aromatic_ring: bool,
    /// Set by ring perception for bonds on a perceived ring.
    pub in_ring: bool,
    pub stereo: Option<BondStereo>,
    pub cis_trans: Option<CisTrans>,
    /// Double bond drawn as two lines centered on the bond axis.
    pub center: bool,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        source: VertexId,
        target: VertexId,
        bond_type: BondType,
        is_ring_closure: bool,
    ) -> Self {
        Self {
            id,
            source,
            target,
            bond_type,
            weight: bond_type.weight(),
            is_ring_closure,
            is_part_of_aromatic_ring: false,
            in_ring: false,
            stereo: None,
            cis_trans: None,
            center: false,
        }
    }

    /// The endpoint that is not `vertex`.
    pub fn other(&self, vertex: VertexId) -> VertexId {
        if self.source == vertex {
            self.target
        } else {
            self.source
        }
    }

    pub fn connects(&self, a: VertexId, b: VertexId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub atom: Atom,
    pub position: Vector2,
    pub positioned: bool,
    pub parent: Option<VertexId>,
    pub children: Vec<VertexId>,
    /// All bonded neighbours in bond creation order.
    pub neighbours: Vec<VertexId>,
    /// Direction of the bond from the parent, in radians.
    pub angle: f64,
    pub subtree_depth: usize,
    pub component: usize,
}

impl Vertex {
    pub fn new(id: VertexId, atom: Atom) -> Self {
        Self {
            id,
            atom,
            position: Vector2::ZERO,
            positioned: false,
            parent: None,
            children: Vec::new(),
            neighbours: Vec::new(),
            angle: 0.0,
            subtree_depth: 0,
            component: 0,
        }
    }

    pub fn degree(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.neighbours.len() <= 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct MolecularGraph {
    graph: UnGraph<Vertex, Edge>,
    ring_closures: Vec<EdgeId>,
    component_count: usize,
}

impl MolecularGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, atom: Atom) -> VertexId {
        let id = self.graph.node_count();
        self.graph.add_node(Vertex::new(id, atom)).index()
    }

    pub fn add_edge(
        &mut self,
        source: VertexId,
        target: VertexId,
        bond_type: BondType,
        is_ring_closure: bool,
    ) -> EdgeId {
        let id = self.graph.edge_count();
        let edge = Edge::new(id, source, target, bond_type, is_ring_closure);
        self.graph
            .add_edge(NodeIndex::new(source), NodeIndex::new(target), edge);
        if source != target {
            self.vertex_mut(source).neighbours.push(target);
            self.vertex_mut(target).neighbours.push(source);
        }
        if is_ring_closure {
            self.ring_closures.push(id);
        }
        id
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.graph[NodeIndex::new(id)]
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.graph[NodeIndex::new(id)]
    }

    pub fn atom(&self, id: VertexId) -> &Atom {
        &self.vertex(id).atom
    }

    pub fn atom_mut(&mut self, id: VertexId) -> &mut Atom {
        &mut self.vertex_mut(id).atom
    }

    pub fn position(&self, id: VertexId) -> Vector2 {
        self.vertex(id).position
    }

    pub fn set_position(&mut self, id: VertexId, position: Vector2) {
        let vertex = self.vertex_mut(id);
        vertex.position = position;
        vertex.positioned = true;
    }

    /// Vertices in id order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights()
    }

    pub fn vertices_mut(&mut self) -> impl Iterator<Item = &mut Vertex> {
        self.graph.node_weights_mut()
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.graph[EdgeIndex::new(id)]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.graph[EdgeIndex::new(id)]
    }

    /// Edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.graph.edge_weights_mut()
    }

    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|e| e.index())
    }

    /// Ids of the edges touching `vertex`, ascending.
    pub fn incident_edges(&self, vertex: VertexId) -> Vec<EdgeId> {
        let mut edges: Vec<EdgeId> = self
            .graph
            .edges(NodeIndex::new(vertex))
            .map(|e| e.id().index())
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    pub fn neighbours(&self, vertex: VertexId) -> &[VertexId] {
        &self.vertex(vertex).neighbours
    }

    pub fn ring_closures(&self) -> &[EdgeId] {
        &self.ring_closures
    }

    pub fn component_count(&self) -> usize {
        self.component_count
    }

    pub(crate) fn set_component_count(&mut self, count: usize) {
        self.component_count = count;
    }

    /// The lowest vertex id of every connected component, in component order.
    pub fn component_roots(&self) -> Vec<VertexId> {
        let mut roots: Vec<Option<VertexId>> = vec![None; self.component_count];
        for vertex in self.vertices() {
            if let Some(slot) = roots.get_mut(vertex.component) {
                slot.get_or_insert(vertex.id);
            }
        }
        roots.into_iter().flatten().collect()
    }

    /// Bond-order sum of the bonds at `vertex`, each bond counted by its valence.
    pub fn bond_valence(&self, vertex: VertexId) -> u32 {
        self.incident_edges(vertex)
            .into_iter()
            .map(|e| {
                let edge = self.edge(e);
                // A self-loop uses two bonding positions.
                let ends = if edge.source == edge.target { 2 } else { 1 };
                edge.bond_type.valence() as u32 * ends
            })
            .sum()
    }

    /// The vertices reachable from `start` without crossing `edge`, sorted.
    /// `None` when `edge` lies on a cycle, so the graph does not split there.
    pub fn side(&self, edge: EdgeId, start: VertexId) -> Option<Vec<VertexId>> {
        let blocked = self.edge(edge).other(start);
        let mut seen = vec![false; self.vertex_count()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        let mut reached = Vec::new();
        while let Some(vertex) = queue.pop_front() {
            reached.push(vertex);
            for e in self.graph.edges(NodeIndex::new(vertex)) {
                if e.id().index() == edge {
                    continue;
                }
                let next = if e.source().index() == vertex {
                    e.target().index()
                } else {
                    e.source().index()
                };
                if next == blocked {
                    return None;
                }
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        reached.sort_unstable();
        Some(reached)
    }
}
