use std::cmp::Reverse;
use std::collections::{BTreeSet, VecDeque};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_6, PI};

use tracing::{debug, trace};

use crate::config::Options;
use crate::graph::{BondType, MolecularGraph, RingId, VertexId};
use crate::math::{
    central_angle, centroid, polygon_circumradius, wrap_angle, PlaneExt, Vector2, EPSILON,
};
use crate::rings::{RingConnectionKind, RingSet};

/// Incoming direction assumed for the root of a chain, so its first bond
/// points at 30 degrees above the x axis.
const ROOT_ANGLE: f64 = -FRAC_PI_6;

/// Closest two unbonded atoms of a relaxed ring system may get, in bond lengths.
const CLEARANCE: f64 = 0.6;

const RELAX_ROUNDS: usize = 500;

/// Placement misfits closer than this, in bond lengths, count as a tie.
const FIT_TOLERANCE: f64 = 1e-6;

/// Per-vertex traversal state.
struct Walk {
    /// Which way the next single-child bond turns, `1` or `-1`.
    side: Vec<f64>,
    queued: Vec<bool>,
    from: Vec<Option<VertexId>>,
}

/// Initial coordinates: zig-zag chains grown from the root, rings placed as
/// regular polygons one ring system at a time.
pub struct SpanningTreeLayout<'a> {
    options: &'a Options,
}

impl<'a> SpanningTreeLayout<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    pub fn run(&self, graph: &mut MolecularGraph, rings: &mut RingSet) {
        let n = graph.vertex_count();
        let mut walk = Walk {
            side: vec![1.0; n],
            queued: vec![false; n],
            from: vec![None; n],
        };
        for root in graph.component_roots() {
            self.layout_component(graph, rings, &mut walk, root);
        }
        if graph.component_count() > 1 {
            self.arrange_components(graph, rings);
        }
        debug!(
            vertices = n,
            rings = rings.len(),
            components = graph.component_count(),
            "placed initial coordinates"
        );
    }

    fn layout_component(
        &self,
        graph: &mut MolecularGraph,
        rings: &mut RingSet,
        walk: &mut Walk,
        root: VertexId,
    ) {
        graph.set_position(root, Vector2::ZERO);
        graph.vertex_mut(root).angle = ROOT_ANGLE;
        walk.queued[root] = true;

        let mut stack = vec![root];
        while let Some(vertex) = stack.pop() {
            if !graph.vertex(vertex).positioned {
                if let Some(from) = walk.from[vertex] {
                    let step = Vector2::from_angle(graph.vertex(vertex).angle) * self.options.bond_length;
                    let position = graph.position(from) + step;
                    graph.set_position(vertex, position);
                }
            }

            let unplaced_ring = graph
                .atom(vertex)
                .rings
                .iter()
                .copied()
                .find(|r| !rings.ring(*r).positioned);
            if let Some(ring) = unplaced_ring {
                let direction = match walk.from[vertex] {
                    Some(_) => graph.vertex(vertex).angle,
                    None => FRAC_PI_2,
                };
                let system = rings.ring(ring).system;
                let attached = walk.from[vertex].is_some();
                self.place_ring_system(graph, rings, system, ring, vertex, direction, attached);

                for member in system_members(rings, system).into_iter().rev() {
                    if !walk.queued[member] {
                        walk.queued[member] = true;
                        stack.push(member);
                    }
                }
            }

            self.expand(graph, rings, walk, vertex, &mut stack);
        }
    }

    /// Assign directions to the unplaced neighbours of `vertex` and queue them.
    fn expand(
        &self,
        graph: &mut MolecularGraph,
        rings: &RingSet,
        walk: &mut Walk,
        vertex: VertexId,
        stack: &mut Vec<VertexId>,
    ) {
        let mut children: Vec<VertexId> = graph
            .neighbours(vertex)
            .iter()
            .copied()
            .filter(|n| !graph.vertex(*n).positioned && !walk.queued[*n])
            .collect();
        if children.is_empty() {
            return;
        }
        children.sort_by_key(|c| (Reverse(graph.vertex(*c).subtree_depth), *c));

        let placements = if graph.atom(vertex).is_in_ring() {
            self.ring_substituent_angles(graph, rings, vertex, children.len())
        } else {
            self.chain_angles(graph, walk, vertex, &children)
        };

        for (child, (angle, side)) in children.iter().zip(placements) {
            graph.vertex_mut(*child).angle = angle;
            walk.side[*child] = side;
            walk.from[*child] = Some(vertex);
            walk.queued[*child] = true;
        }
        for child in children.iter().rev() {
            stack.push(*child);
        }
        trace!(vertex, children = ?children, "expanded");
    }

    /// Directions and zig-zag sides for the children of a chain atom,
    /// deepest child first.
    fn chain_angles(
        &self,
        graph: &MolecularGraph,
        walk: &Walk,
        vertex: VertexId,
        children: &[VertexId],
    ) -> Vec<(f64, f64)> {
        let incoming = graph.vertex(vertex).angle;
        let side = walk.side[vertex];
        let k = children.len();
        let from = walk.from[vertex];

        if k == 1 {
            if is_linear(graph, from, vertex, children[0]) {
                return vec![(incoming, side)];
            }
            return vec![(incoming + side * FRAC_PI_3, -side)];
        }

        if from.is_none() && k >= 3 {
            let step = 2.0 * PI / k as f64;
            return (0..k)
                .map(|i| {
                    let angle = FRAC_PI_6 + i as f64 * step;
                    (angle, if i % 2 == 0 { -1.0 } else { 1.0 })
                })
                .collect();
        }

        // Evenly fill the directions left free by the incoming bond; the
        // straightest one goes to the deepest child, turning towards `side`
        // on a tie.
        let mut offsets: Vec<f64> = (0..k)
            .map(|i| wrap_angle(PI + (i + 1) as f64 * 2.0 * PI / (k + 1) as f64))
            .collect();
        offsets.sort_by(|a, b| {
            let key_a = (round(a.abs()), -round(a * side));
            let key_b = (round(b.abs()), -round(b * side));
            key_a.partial_cmp(&key_b).unwrap_or(std::cmp::Ordering::Equal)
        });
        offsets
            .into_iter()
            .map(|offset| {
                let child_side = if offset.abs() < EPSILON {
                    -side
                } else {
                    -offset.signum()
                };
                (incoming + offset, child_side)
            })
            .collect()
    }

    /// Directions for substituents of a ring atom: away from the centers of
    /// its rings, fanned out when there are several.
    fn ring_substituent_angles(
        &self,
        graph: &MolecularGraph,
        rings: &RingSet,
        vertex: VertexId,
        count: usize,
    ) -> Vec<(f64, f64)> {
        let position = graph.position(vertex);
        let centers = graph
            .atom(vertex)
            .rings
            .iter()
            .map(|r| rings.ring(*r))
            .filter(|r| r.positioned)
            .map(|r| r.center);
        let outward = match centroid(centers) {
            Some(mean) if (position - mean).length() > EPSILON => (position - mean).to_angle(),
            _ => graph.vertex(vertex).angle,
        };

        let offsets: Vec<f64> = match count {
            1 => vec![0.0],
            2 => vec![FRAC_PI_6, -FRAC_PI_6],
            _ => (0..count)
                .map(|i| -FRAC_PI_3 + 2.0 * FRAC_PI_3 * i as f64 / (count - 1) as f64)
                .collect(),
        };
        offsets
            .into_iter()
            .map(|offset| {
                let side = if offset > EPSILON { -1.0 } else { 1.0 };
                (outward + offset, side)
            })
            .collect()
    }

    /// Place every ring of `system`, starting with `first` entered at `entry`
    /// from `direction`, then spreading along ring connections. `attached`
    /// is set when the entry atom hangs off an atom placed before it.
    #[allow(clippy::too_many_arguments)]
    fn place_ring_system(
        &self,
        graph: &mut MolecularGraph,
        rings: &mut RingSet,
        system: usize,
        first: RingId,
        entry: VertexId,
        direction: f64,
        attached: bool,
    ) {
        let radius = polygon_circumradius(self.options.bond_length, rings.ring(first).size());
        let center = graph.position(entry) + Vector2::from_angle(direction) * radius;
        self.place_polygon(graph, rings, first, center, entry);

        let mut queue = VecDeque::from([first]);
        while let Some(ring) = queue.pop_front() {
            let neighbours: Vec<RingId> = rings
                .connections_of(ring)
                .into_iter()
                .map(|c| c.other(ring))
                .collect();
            for other in neighbours {
                if rings.ring(other).positioned {
                    continue;
                }
                self.place_connected(graph, rings, other, ring);
                queue.push_back(other);
            }
        }

        self.relax(graph, rings, system, entry);
        if attached {
            self.orient(graph, rings, system, entry);
        }
        trace!(system, rings = ?rings.systems[system], "placed ring system");
    }

    /// Regular polygon around `center`, counter-clockwise from `start`.
    fn place_polygon(
        &self,
        graph: &mut MolecularGraph,
        rings: &mut RingSet,
        ring: RingId,
        center: Vector2,
        start: VertexId,
    ) {
        let members = rings.ring(ring).members.clone();
        let n = members.len();
        let radius = polygon_circumradius(self.options.bond_length, n);
        let offset = members.iter().position(|v| *v == start).unwrap_or(0);
        let theta = (graph.position(start) - center).to_angle();
        for k in 1..n {
            let member = members[(offset + k) % n];
            if !graph.vertex(member).positioned {
                let angle = theta + k as f64 * central_angle(n);
                graph.set_position(member, center + Vector2::from_angle(angle) * radius);
            }
        }
        let ring = rings.ring_mut(ring);
        ring.center = center;
        ring.positioned = true;
    }

    /// Place `ring` against the already positioned `previous` ring it is
    /// connected to.
    fn place_connected(
        &self,
        graph: &mut MolecularGraph,
        rings: &mut RingSet,
        ring: RingId,
        previous: RingId,
    ) {
        let members = rings.ring(ring).members.clone();
        let n = members.len();
        let radius = polygon_circumradius(self.options.bond_length, n);
        let previous_center = rings.ring(previous).center;
        let placed: Vec<usize> = (0..n)
            .filter(|i| graph.vertex(members[*i]).positioned)
            .collect();
        let fused_only = rings
            .connections_of(ring)
            .into_iter()
            .filter(|c| rings.ring(c.other(ring)).positioned)
            .all(|c| c.kind == RingConnectionKind::Fused);
        let shared_bond = placed.iter().copied().find(|i| placed.contains(&((i + 1) % n)));

        match placed.len() {
            0 => {
                // Not actually attached; start a fresh polygon beside the previous one.
                let center = previous_center + Vector2::new(2.0 * radius, 0.0);
                graph.set_position(members[0], center - Vector2::new(radius, 0.0));
                self.place_polygon(graph, rings, ring, center, members[0]);
            }
            1 => {
                let spiro = members[placed[0]];
                let mut outward = (graph.position(spiro) - previous_center).normalize_or_zero();
                if outward == Vector2::ZERO {
                    outward = Vector2::X;
                }
                let center = graph.position(spiro) + outward * radius;
                self.place_polygon(graph, rings, ring, center, spiro);
            }
            k if k == n => {
                let center = centroid(members.iter().map(|v| graph.position(*v)))
                    .unwrap_or(previous_center);
                let ring = rings.ring_mut(ring);
                ring.center = center;
                ring.positioned = true;
            }
            _ => match shared_bond {
                Some(i) if fused_only => self.fill_polygon(graph, rings, ring, previous_center, i),
                _ => self.place_bridged(graph, rings, ring),
            },
        }
    }

    /// Complete `ring` as a regular polygon on the placed bond from member
    /// `i` to member `i + 1`. The center goes on the side of that bond that
    /// agrees with every member placed so far, away from `previous_center`
    /// when both sides fit equally.
    fn fill_polygon(
        &self,
        graph: &mut MolecularGraph,
        rings: &mut RingSet,
        ring: RingId,
        previous_center: Vector2,
        i: usize,
    ) {
        let members = rings.ring(ring).members.clone();
        let n = members.len();
        let radius = polygon_circumradius(self.options.bond_length, n);
        let (u, v) = (graph.position(members[i]), graph.position(members[(i + 1) % n]));

        let mid = u.lerp(v, 0.5);
        let normal = (v - u).perp().normalize_or_zero();
        let half = u.distance(v) / 2.0;
        let height = (radius * radius - half * half).max(0.0).sqrt();
        let (ahead, behind) = (mid + normal * height, mid - normal * height);

        let misfit = |center: Vector2| -> f64 {
            members
                .iter()
                .filter(|m| graph.vertex(**m).positioned)
                .map(|m| (graph.position(*m).distance(center) - radius).abs())
                .sum()
        };
        let (misfit_ahead, misfit_behind) = (misfit(ahead), misfit(behind));
        let center = if (misfit_ahead - misfit_behind).abs() > FIT_TOLERANCE * self.options.bond_length {
            if misfit_ahead < misfit_behind {
                ahead
            } else {
                behind
            }
        } else if normal.dot(mid - previous_center) >= 0.0 {
            ahead
        } else {
            behind
        };

        let theta = (u - center).to_angle();
        let toward_v = (u - center).perp_dot(v - center).signum();
        let step = central_angle(n);
        for k in 2..n {
            let member = members[(i + k) % n];
            if !graph.vertex(member).positioned {
                let angle = theta + toward_v * k as f64 * step;
                graph.set_position(member, center + Vector2::from_angle(angle) * radius);
            }
        }
        let ring = rings.ring_mut(ring);
        ring.center = center;
        ring.positioned = true;
    }

    /// Lay out each unplaced stretch of a bridged ring on a circular arc
    /// between its placed ends.
    fn place_bridged(&self, graph: &mut MolecularGraph, rings: &mut RingSet, ring: RingId) {
        let members = rings.ring(ring).members.clone();
        let n = members.len();
        let placed: Vec<bool> = members
            .iter()
            .map(|v| graph.vertex(*v).positioned)
            .collect();

        for start in 0..n {
            if !placed[start] || placed[(start + 1) % n] {
                continue;
            }
            let mut run = Vec::new();
            let mut index = (start + 1) % n;
            while !placed[index] {
                run.push(members[index]);
                index = (index + 1) % n;
            }
            let (a, b) = (members[start], members[index]);
            self.place_arc(graph, &run, a, b);
        }

        let center = centroid(members.iter().map(|v| graph.position(*v))).unwrap_or_default();
        let ring = rings.ring_mut(ring);
        ring.center = center;
        ring.positioned = true;
    }

    /// Place `run` between the placed vertices `a` and `b` with every bond
    /// of the path `a, run.., b` one bond length long. The arc bulges away
    /// from the side holding more of the component unless the other side
    /// leaves it more room.
    fn place_arc(&self, graph: &mut MolecularGraph, run: &[VertexId], a: VertexId, b: VertexId) {
        let (pa, pb) = (graph.position(a), graph.position(b));
        let chord = pb - pa;
        let component = graph.vertex(a).component;
        let others: Vec<Vector2> = graph
            .vertices()
            .filter(|v| v.positioned && v.id != a && v.id != b && v.component == component)
            .map(|v| v.position)
            .collect();

        let crowding: f64 = others
            .iter()
            .map(|p| chord.perp_dot(*p - pa))
            .filter(|side| side.abs() > EPSILON)
            .map(f64::signum)
            .sum();
        let mut normal = chord.perp().normalize_or_zero();
        if crowding > 0.0 {
            normal = -normal;
        }

        let clearance = |points: &[Vector2]| {
            points
                .iter()
                .flat_map(|p| others.iter().map(move |q| p.distance(*q)))
                .fold(f64::INFINITY, f64::min)
        };
        let preferred = self.arc(pa, pb, run.len(), normal);
        let flipped = self.arc(pa, pb, run.len(), -normal);
        let points = if clearance(&flipped) > clearance(&preferred) + EPSILON {
            flipped
        } else {
            preferred
        };
        for (vertex, point) in run.iter().zip(points) {
            graph.set_position(*vertex, point);
        }
    }

    /// `count` points from `pa` to `pb`, one bond length apart, on a circular
    /// arc bulging along `normal`.
    fn arc(&self, pa: Vector2, pb: Vector2, count: usize, normal: Vector2) -> Vec<Vector2> {
        let length = self.options.bond_length;
        let segments = (count + 1) as f64;
        let chord = pb - pa;
        let distance = chord.length();

        if distance >= segments * length - EPSILON {
            return (1..=count).map(|k| pa + chord * (k as f64 / segments)).collect();
        }
        if distance < EPSILON {
            let step = 2.0 * PI / segments;
            let radius = length / (2.0 * (step / 2.0).sin());
            let outward = if normal == Vector2::ZERO { Vector2::Y } else { normal };
            let center = pa + outward * radius;
            let theta = (pa - center).to_angle();
            return (1..=count)
                .map(|k| center + Vector2::from_angle(theta + k as f64 * step) * radius)
                .collect();
        }

        // Find the angle per segment so that `segments` chords of `length`
        // span the distance between the ends.
        let ratio = distance / length;
        let span = |phi: f64| (segments * phi / 2.0).sin() / (phi / 2.0).sin();
        let (mut low, mut high) = (EPSILON, 2.0 * PI / segments);
        for _ in 0..64 {
            let mid = (low + high) / 2.0;
            if span(mid) > ratio {
                low = mid;
            } else {
                high = mid;
            }
        }
        let phi = (low + high) / 2.0;
        let radius = length / (2.0 * (phi / 2.0).sin());
        let total = segments * phi;
        let midpoint = pa.lerp(pb, 0.5);
        let center = midpoint - normal * (radius * (total / 2.0).cos());

        let theta = (pa - center).to_angle();
        let apex = center + Vector2::from_angle(theta + total / 2.0) * radius;
        let direction = if (apex - midpoint).dot(normal) < 0.0 { -1.0 } else { 1.0 };
        (1..=count)
            .map(|k| center + Vector2::from_angle(theta + direction * k as f64 * phi) * radius)
            .collect()
    }

    /// Restore bond lengths in a system whose arcs came out strained or
    /// crowded: atoms closer than the clearance are pushed apart and bonds
    /// pulled back to one bond length, alternately, then the system is
    /// shifted so `entry` stays put. Regular systems are left untouched.
    fn relax(&self, graph: &mut MolecularGraph, rings: &mut RingSet, system: usize, entry: VertexId) {
        let length = self.options.bond_length;
        let clearance = CLEARANCE * length;
        let tolerance = EPSILON * length;
        let members = system_members(rings, system);
        let inside = |v: VertexId| members.binary_search(&v).is_ok();
        let bonds: Vec<(VertexId, VertexId)> = graph
            .edges()
            .filter(|e| e.source != e.target && inside(e.source) && inside(e.target))
            .map(|e| (e.source, e.target))
            .collect();
        let pairs: Vec<(VertexId, VertexId)> = members
            .iter()
            .enumerate()
            .flat_map(|(i, a)| members[i + 1..].iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| graph.edge_between(*a, *b).is_none())
            .collect();

        let strained = |p: &[Vector2]| {
            bonds
                .iter()
                .any(|(s, t)| (p[*s].distance(p[*t]) - length).abs() > tolerance)
        };
        let crowded = |p: &[Vector2]| {
            pairs
                .iter()
                .any(|(a, b)| p[*a].distance(p[*b]) < clearance - tolerance)
        };

        let mut positions: Vec<Vector2> = graph.vertices().map(|v| v.position).collect();
        if !strained(&positions) && !crowded(&positions) {
            return;
        }
        let anchor = positions[entry];

        let mut rounds = 0;
        while rounds < RELAX_ROUNDS {
            rounds += 1;
            for (a, b) in &pairs {
                if positions[*a].distance(positions[*b]) < clearance {
                    set_distance(&mut positions, *a, *b, clearance);
                }
            }
            for (s, t) in &bonds {
                set_distance(&mut positions, *s, *t, length);
            }
            if !strained(&positions) && !crowded(&positions) {
                break;
            }
        }
        for _ in 0..RELAX_ROUNDS {
            if !strained(&positions) {
                break;
            }
            for (s, t) in &bonds {
                set_distance(&mut positions, *s, *t, length);
            }
        }

        let shift = anchor - positions[entry];
        for member in &members {
            graph.set_position(*member, positions[*member] + shift);
        }
        for ring in rings.systems[system].clone() {
            let center = centroid(rings.ring(ring).members.iter().map(|v| graph.position(*v)));
            rings.ring_mut(ring).center = center.unwrap_or_default();
        }
        debug!(system, rounds, crowded = crowded(&positions), "relaxed ring system");
    }

    /// Turn a system about its entry atom so the rings holding that atom lie
    /// straight ahead along the bond it was reached through.
    fn orient(&self, graph: &mut MolecularGraph, rings: &mut RingSet, system: usize, entry: VertexId) {
        let position = graph.position(entry);
        let centers = graph.atom(entry).rings.iter().map(|r| rings.ring(*r).center);
        let Some(mean) = centroid(centers) else {
            return;
        };
        if position.distance(mean) < EPSILON {
            return;
        }
        let turn = wrap_angle(graph.vertex(entry).angle - (mean - position).to_angle());
        if turn.abs() < EPSILON {
            return;
        }

        for member in system_members(rings, system) {
            if member != entry {
                let rotated = graph.position(member).rotate_around(position, turn);
                graph.set_position(member, rotated);
            }
        }
        for ring in rings.systems[system].clone() {
            let center = rings.ring(ring).center.rotate_around(position, turn);
            rings.ring_mut(ring).center = center;
        }
        trace!(system, entry, turn, "oriented ring system");
    }

    /// Line fragments up left to right, one bond length apart, centered on y = 0.
    fn arrange_components(&self, graph: &mut MolecularGraph, rings: &mut RingSet) {
        let mut cursor = 0.0;
        for component in 0..graph.component_count() {
            let positions: Vec<Vector2> = graph
                .vertices()
                .filter(|v| v.component == component)
                .map(|v| v.position)
                .collect();
            let Some(first) = positions.first() else {
                continue;
            };
            let (mut min, mut max) = (*first, *first);
            for p in &positions {
                min = Vector2::new(min.x.min(p.x), min.y.min(p.y));
                max = Vector2::new(max.x.max(p.x), max.y.max(p.y));
            }

            let shift = Vector2::new(cursor - min.x, -(min.y + max.y) / 2.0);
            for vertex in graph.vertices_mut().filter(|v| v.component == component) {
                vertex.position += shift;
            }
            for ring in rings.rings.iter_mut() {
                if graph.vertex(ring.members[0]).component == component {
                    ring.center += shift;
                }
            }
            cursor += max.x - min.x + self.options.bond_length;
        }
    }
}

/// Members of every ring in `system`, in id order.
fn system_members(rings: &RingSet, system: usize) -> Vec<VertexId> {
    let members: BTreeSet<VertexId> = rings.systems[system]
        .iter()
        .flat_map(|r| rings.ring(*r).members.iter().copied())
        .collect();
    members.into_iter().collect()
}

/// Move `u` and `v` by equal amounts along the line joining them until they
/// are `target` apart.
fn set_distance(positions: &mut [Vector2], u: VertexId, v: VertexId, target: f64) {
    let delta = positions[v] - positions[u];
    let distance = delta.length();
    let direction = if distance < EPSILON {
        Vector2::from_angle(0.5 + 0.7 * (u + 3 * v) as f64)
    } else {
        delta / distance
    };
    let correction = direction * ((distance - target) / 2.0);
    positions[u] += correction;
    positions[v] -= correction;
}

/// Triple bonds and cumulated double bonds keep the chain straight.
fn is_linear(graph: &MolecularGraph, from: Option<VertexId>, vertex: VertexId, child: VertexId) -> bool {
    let bond = |a: VertexId, b: VertexId| graph.edge_between(a, b).map(|e| graph.edge(e).bond_type);
    let incoming = from.and_then(|f| bond(f, vertex));
    let outgoing = bond(vertex, child);
    incoming == Some(BondType::Triple)
        || outgoing == Some(BondType::Triple)
        || (incoming == Some(BondType::Double) && outgoing == Some(BondType::Double))
}

fn round(value: f64) -> f64 {
    (value * 1e9).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::math::apothem_from_side_length;
    use crate::parse::parse_smiles;
    use crate::rings::RingPerception;

    fn layout(smiles: &str) -> (MolecularGraph, RingSet) {
        let options = Options::default();
        let tree = parse_smiles(smiles).unwrap();
        let mut graph = GraphBuilder::new(&options).build(&tree).unwrap();
        let mut rings = RingPerception::new().perceive(&mut graph).unwrap();
        SpanningTreeLayout::new(&options).run(&mut graph, &mut rings);
        (graph, rings)
    }

    fn bond_lengths(graph: &MolecularGraph) -> Vec<f64> {
        graph
            .edges()
            .map(|e| graph.position(e.source).distance(graph.position(e.target)))
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn closest_pair(graph: &MolecularGraph) -> f64 {
        let positions: Vec<Vector2> = graph.vertices().map(|v| v.position).collect();
        let mut closest = f64::INFINITY;
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                closest = closest.min(a.distance(*b));
            }
        }
        closest
    }

    #[test]
    fn test_single_atom_at_origin() {
        let (graph, _) = layout("C");
        assert_eq!(graph.position(0), Vector2::ZERO);
        assert!(graph.vertex(0).positioned);
    }

    #[test]
    fn test_ethanol_zig_zag() {
        let (graph, rings) = layout("CCO");
        assert!(rings.is_empty());
        assert!(bond_lengths(&graph).iter().all(|l| close(*l, 30.0)));
        // 120 degrees at the middle atom.
        let span = graph.position(0).distance(graph.position(2));
        assert!(close(span, 60.0 * (PI / 3.0).sin()));
    }

    #[test]
    fn test_long_chain_alternates() {
        let (graph, _) = layout("CCCCCC");
        for i in 0..4 {
            let span = graph.position(i).distance(graph.position(i + 2));
            assert!(close(span, 60.0 * (PI / 3.0).sin()));
        }
        // Zig-zag, not a spiral: every other atom shares a y coordinate.
        assert!(close(graph.position(0).y, graph.position(2).y));
        assert!(close(graph.position(1).y, graph.position(3).y));
    }

    #[test]
    fn test_triple_bond_is_linear() {
        let (graph, _) = layout("CC#CC");
        assert!(close(graph.position(0).distance(graph.position(3)), 90.0));
    }

    #[test]
    fn test_branch_point_spreads_evenly() {
        let (graph, _) = layout("CC(C)C");
        let center = graph.position(1);
        let directions: Vec<f64> = [0, 2, 3]
            .iter()
            .map(|v| (graph.position(*v) - center).to_angle())
            .collect();
        for (i, a) in directions.iter().enumerate() {
            for b in directions.iter().skip(i + 1) {
                let between = wrap_angle(a - b).abs();
                assert!(close(between, 2.0 * PI / 3.0));
            }
        }
    }

    #[test]
    fn test_benzene_is_regular_hexagon() {
        let (graph, rings) = layout("c1ccccc1");
        let ring = rings.ring(0);
        assert!(ring.positioned);
        for (k, member) in ring.members.iter().enumerate() {
            assert!(close(graph.position(*member).distance(ring.center), 30.0));
            let next = ring.members[(k + 1) % 6];
            let a = (graph.position(*member) - ring.center).to_angle();
            let b = (graph.position(next) - ring.center).to_angle();
            assert!(close(wrap_angle(b - a).abs(), central_angle(6)));
        }
    }

    #[test]
    fn test_naphthalene_shares_an_edge() {
        let (graph, rings) = layout("c1ccc2ccccc2c1");
        assert!(bond_lengths(&graph).iter().all(|l| close(*l, 30.0)));
        let distance = rings.ring(0).center.distance(rings.ring(1).center);
        assert!(close(distance, 2.0 * apothem_from_side_length(30.0, 6)));
        for ring in &rings.rings {
            for member in &ring.members {
                assert!(close(graph.position(*member).distance(ring.center), 30.0));
            }
        }
    }

    #[test]
    fn test_bridged_bonds_keep_length() {
        let (graph, rings) = layout("C1CC2CCC1C2");
        assert!(rings.rings.iter().all(|r| r.positioned));
        assert!(graph.vertices().all(|v| v.positioned && v.position.is_finite()));
        assert!(bond_lengths(&graph).iter().all(|l| close(*l, 30.0)));
        // The two-carbon bridge does not land on top of the other one.
        assert!(graph.position(3).distance(graph.position(1)) > 15.0);
        assert!(graph.position(4).distance(graph.position(0)) > 15.0);
    }

    #[test]
    fn test_cage_systems_keep_bonds_and_spacing() {
        for smiles in ["C1CC2CCC1CC2", "C1C2CC3CC1CC(C2)C3", "C1CC2CC1C2", "CC1(C)C2CCC1(C)C(=O)C2"] {
            let (graph, rings) = layout(smiles);
            assert!(rings.rings.iter().all(|r| r.positioned), "{}", smiles);
            for length in bond_lengths(&graph) {
                assert!(close(length, 30.0), "{}: bond of {}", smiles, length);
            }
            let closest = closest_pair(&graph);
            assert!(closest >= 15.0, "{}: atoms {} apart", smiles, closest);
        }
    }

    #[test]
    fn test_pericondensed_rings_stay_regular() {
        let (graph, rings) = layout("c1cc2ccc3ccc4ccc5ccc6ccc1c7c2c3c4c5c67");
        assert_eq!(rings.len(), 7);
        assert!(bond_lengths(&graph).iter().all(|l| close(*l, 30.0)));
        for ring in &rings.rings {
            for member in &ring.members {
                assert!(close(graph.position(*member).distance(ring.center), 30.0));
            }
        }
        assert!(closest_pair(&graph) > 29.0);
    }

    #[test]
    fn test_fused_system_continues_incoming_bond() {
        // The methyl enters the steroid core at a fusion atom shared by two rings.
        let (graph, rings) = layout("CC12CCC3C(CCC4CC(O)CCC34C)C1CCC2O");
        let entry = graph.position(1);
        let incoming = entry - graph.position(0);
        let centers = graph.atom(1).rings.iter().map(|r| rings.ring(*r).center);
        let ahead = centroid(centers).unwrap() - entry;
        assert!(wrap_angle(ahead.to_angle() - incoming.to_angle()).abs() < 1e-6);
        assert!(bond_lengths(&graph).iter().all(|l| close(*l, 30.0)));
    }

    #[test]
    fn test_spiro_rings_sit_apart() {
        let (graph, rings) = layout("C1CCC2(CC1)CCC2");
        let (a, b) = (rings.ring(0), rings.ring(1));
        let expected = polygon_circumradius(30.0, a.size()) + polygon_circumradius(30.0, b.size());
        assert!(close(a.center.distance(b.center), expected));
        assert!(bond_lengths(&graph).iter().all(|l| close(*l, 30.0)));
    }

    #[test]
    fn test_substituent_points_outward() {
        let (graph, rings) = layout("c1ccccc1C");
        let ring = rings.ring(0);
        let methyl = graph.position(6);
        let anchor = graph.position(5);
        assert!(close(methyl.distance(anchor), 30.0));
        assert!(close(methyl.distance(ring.center), 60.0));
    }

    #[test]
    fn test_fragments_are_side_by_side() {
        let (graph, _) = layout("C.C");
        assert!(close(graph.position(1).x - graph.position(0).x, 30.0));
        assert!(close(graph.position(0).y, graph.position(1).y));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let smiles = "CC(C)Cc1ccc(cc1)C(C)C(=O)O";
        let (first, _) = layout(smiles);
        let (second, _) = layout(smiles);
        let a: Vec<Vector2> = first.vertices().map(|v| v.position).collect();
        let b: Vec<Vector2> = second.vertices().map(|v| v.position).collect();
        assert_eq!(a, b);
    }
}
