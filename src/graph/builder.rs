use std::collections::BTreeMap;

use petgraph::unionfind::UnionFind;
use tracing::{debug, trace};

use crate::config::Options;
use crate::element;
use crate::error::StructuralError;
use crate::graph::{Atom, BondType, MolecularGraph, VertexId};
use crate::parse::{BondSymbol, ParseNode};

/// A ring-closure label that has been opened but not yet closed.
#[derive(Debug, Clone, Copy)]
struct OpenRing {
    vertex: VertexId,
    bond: Option<BondSymbol>,
    /// Index reserved in the opener's stereo neighbour list.
    slot: usize,
}

/// Turns a parse tree into a [`MolecularGraph`] with a spanning tree,
/// ring-closure edges, hydrogen counts and pseudo-groups.
pub struct GraphBuilder<'a> {
    options: &'a Options,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    pub fn build(&self, root: &ParseNode) -> Result<MolecularGraph, StructuralError> {
        let mut graph = MolecularGraph::new();
        let mut open: BTreeMap<u16, OpenRing> = BTreeMap::new();
        // Fragment (spanning tree) of every vertex; fragments joined by a
        // ring bond end up in the same component.
        let mut fragment_of: Vec<usize> = Vec::new();
        let mut fragments = UnionFind::<usize>::new(root.atom_count());
        let mut fragment_count = 0;

        let mut stack: Vec<(&ParseNode, Option<VertexId>)> = vec![(root, None)];
        while let Some((node, parent)) = stack.pop() {
            let atom = Atom::from_spec(&node.atom)?;
            let parent = match node.bond {
                BondSymbol::NoBond => None,
                _ => parent,
            };
            let id = graph.add_vertex(atom);

            match parent {
                Some(parent) => {
                    fragment_of.push(fragment_of[parent]);
                    let bond_type = resolve_bond(node.bond, graph.atom(parent), graph.atom(id));
                    graph.add_edge(parent, id, bond_type, false);
                    graph.vertex_mut(parent).children.push(id);
                    graph.atom_mut(parent).stereo_neighbours.push(Some(id));

                    let vertex = graph.vertex_mut(id);
                    vertex.parent = Some(parent);
                    vertex.atom.bond_type = Some(bond_type);
                    vertex.atom.stereo_neighbours.push(Some(parent));
                }
                None => {
                    fragment_of.push(fragment_count);
                    fragment_count += 1;
                }
            }

            let hydrogens = node.atom.bracket.as_ref().map_or(0, |b| b.hcount);
            for _ in 0..hydrogens {
                graph.atom_mut(id).stereo_neighbours.push(None);
            }

            for closure in &node.ring_closures {
                let Some(opening) = open.remove(&closure.label) else {
                    let slot = graph.atom(id).stereo_neighbours.len();
                    graph.atom_mut(id).stereo_neighbours.push(None);
                    open.insert(
                        closure.label,
                        OpenRing {
                            vertex: id,
                            bond: closure.bond,
                            slot,
                        },
                    );
                    continue;
                };

                let symbol = match (opening.bond, closure.bond) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(StructuralError::RingBondConflict {
                            label: closure.label,
                        })
                    }
                    (a, b) => a.or(b).unwrap_or_default(),
                };
                if symbol == BondSymbol::NoBond {
                    return Err(StructuralError::InvalidRingBond {
                        label: closure.label,
                    });
                }
                let bond_type = resolve_bond(symbol, graph.atom(opening.vertex), graph.atom(id));

                // A closure between two separate trees is an ordinary bond
                // joining them, not a ring.
                let a = fragments.find(fragment_of[opening.vertex]);
                let b = fragments.find(fragment_of[id]);
                let is_ring_closure = a == b;
                if !is_ring_closure {
                    fragments.union(a, b);
                }
                trace!(label = closure.label, from = opening.vertex, to = id, is_ring_closure, "closing ring bond");

                graph.add_edge(opening.vertex, id, bond_type, is_ring_closure);
                graph.atom_mut(opening.vertex).stereo_neighbours[opening.slot] = Some(id);
                graph.atom_mut(id).stereo_neighbours.push(Some(opening.vertex));
            }

            if let Some(next) = &node.next {
                stack.push((next, Some(id)));
            }
            for branch in node.branches.iter().rev() {
                stack.push((branch, Some(id)));
            }
        }

        if let Some(label) = open.keys().next() {
            return Err(StructuralError::UnclosedRing { label: *label });
        }

        assign_components(&mut graph, &fragment_of, &mut fragments);
        compute_subtree_depths(&mut graph);
        assign_hydrogens(&mut graph)?;
        if self.options.compact_drawing {
            aggregate_pseudo_elements(&mut graph);
        }

        debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            ring_closures = graph.ring_closures().len(),
            components = graph.component_count(),
            "built molecular graph"
        );
        Ok(graph)
    }
}

fn resolve_bond(symbol: BondSymbol, a: &Atom, b: &Atom) -> BondType {
    match symbol {
        BondSymbol::Implicit | BondSymbol::NoBond => {
            if a.aromatic && b.aromatic {
                BondType::Aromatic
            } else {
                BondType::Single
            }
        }
        BondSymbol::Single => BondType::Single,
        BondSymbol::Double => BondType::Double,
        BondSymbol::Triple => BondType::Triple,
        BondSymbol::Quadruple => BondType::Quadruple,
        BondSymbol::Aromatic => BondType::Aromatic,
        BondSymbol::Up => BondType::Up,
        BondSymbol::Down => BondType::Down,
    }
}

/// Number components by their lowest vertex id.
fn assign_components(
    graph: &mut MolecularGraph,
    fragment_of: &[usize],
    fragments: &mut UnionFind<usize>,
) {
    let mut numbering: BTreeMap<usize, usize> = BTreeMap::new();
    for (vertex, fragment) in fragment_of.iter().enumerate() {
        let representative = fragments.find(*fragment);
        let next = numbering.len();
        let component = *numbering.entry(representative).or_insert(next);
        graph.vertex_mut(vertex).component = component;
    }
    graph.set_component_count(numbering.len());
}

/// Children always have larger ids than their parent, so a reverse id sweep
/// is a post-order.
fn compute_subtree_depths(graph: &mut MolecularGraph) {
    for id in (0..graph.vertex_count()).rev() {
        let depth = graph
            .vertex(id)
            .children
            .iter()
            .map(|child| graph.vertex(*child).subtree_depth + 1)
            .max()
            .unwrap_or(0);
        graph.vertex_mut(id).subtree_depth = depth;
    }
}

/// Check every atom against its element's valences and fill in the implicit
/// hydrogens of organic-subset atoms.
fn assign_hydrogens(graph: &mut MolecularGraph) -> Result<(), StructuralError> {
    for id in 0..graph.vertex_count() {
        let atom = graph.atom(id);
        let Some(data) = element::element(&atom.element) else {
            continue;
        };
        let bonds = graph.bond_valence(id);
        let explicit = atom.bracket.as_ref().map_or(0, |b| b.hcount as u32);

        if let Some(capacity) = data.capacity() {
            let capacity = capacity as u32 + atom.charge().unsigned_abs() as u32;
            let has_aromatic_bond = graph
                .incident_edges(id)
                .iter()
                .any(|e| graph.edge(*e).bond_type == BondType::Aromatic);
            // The pi electron of an aromatic atom only counts when there is
            // room for it; furan's oxygen has none.
            let pi = u32::from(atom.aromatic && has_aromatic_bond && bonds + explicit < capacity);
            let used = bonds + explicit + pi;
            if used > capacity {
                return Err(StructuralError::ValenceExceeded {
                    vertex: id,
                    element: atom.element.clone(),
                    valence: used,
                    capacity,
                });
            }
        }

        if atom.bracket.is_some() {
            continue;
        }
        let implicit = if atom.aromatic {
            data.valences
                .first()
                .map_or(0, |v| (*v as u32).saturating_sub(bonds + 1))
        } else {
            data.valences
                .iter()
                .map(|v| *v as u32)
                .find(|v| *v >= bonds)
                .map_or(0, |v| v - bonds)
        };
        graph.atom_mut(id).implicit_hydrogens = implicit as u8;
    }
    Ok(())
}

/// Fold terminal heteroatoms into their neighbour's label, `C(F)(F)F`
/// becoming a single `CF3` text.
fn aggregate_pseudo_elements(graph: &mut MolecularGraph) {
    for id in 0..graph.vertex_count() {
        let vertex = graph.vertex(id);
        if vertex.degree() < 3 || vertex.atom.aromatic || vertex.atom.chirality().is_some() {
            continue;
        }

        let (absorbed, kept): (Vec<VertexId>, Vec<VertexId>) =
            vertex.neighbours.iter().partition(|n| {
                let neighbour = graph.vertex(**n);
                neighbour.is_terminal()
                    && neighbour.atom.is_hetero_atom()
                    && neighbour.atom.element != element::WILDCARD
                    && neighbour.atom.drawn
                    && !neighbour.atom.has_pseudo_elements()
            });
        if kept.len() > 1 || absorbed.len() < 2 {
            continue;
        }

        for neighbour in absorbed {
            let atom = graph.atom(neighbour);
            let (symbol, hydrogens, charge) =
                (atom.element.clone(), atom.hydrogen_count(), atom.charge());
            graph.atom_mut(neighbour).drawn = false;
            graph.atom_mut(id).attach_pseudo_element(&symbol, hydrogens, charge);
        }
        trace!(vertex = id, label = ?graph.atom(id).pseudo_label(), "aggregated pseudo-group");
    }
}
