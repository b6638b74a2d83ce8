//! Turning a [`Layout`] into drawing primitives.
//!
//! A backend implements [`Painter`]; [`render`] decides which lines, wedges,
//! circles and labels make up the picture and hands them over one by one.

mod svg;
pub use svg::*;

use crate::config::{AtomVisualization, Options};
use crate::graph::{BondType, WedgeKind};
use crate::layout::{Layout, LayoutAtom, LayoutBond};
use crate::math::{apothem, Vector2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// Text shown at an atom position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomLabel {
    /// Element symbol or condensed group such as `CF3`.
    pub text: String,
    pub hydrogens: u8,
    pub charge: i32,
    pub isotope: Option<u16>,
}

impl AtomLabel {
    /// Plain-text rendering, e.g. `NH2`, `O-` or `13CH3`.
    pub fn plain(&self) -> String {
        let mut label = String::new();
        if let Some(isotope) = self.isotope {
            label.push_str(&isotope.to_string());
        }
        label.push_str(&self.text);
        match self.hydrogens {
            0 => {}
            1 => label.push('H'),
            n => label.push_str(&format!("H{}", n)),
        }
        label.push_str(&charge_suffix(self.charge));
        label
    }
}

/// `+`, `2-` and the like; empty for a neutral atom.
pub fn charge_suffix(charge: i32) -> String {
    match charge {
        0 => String::new(),
        1 => "+".to_string(),
        -1 => "-".to_string(),
        c if c > 0 => format!("{}+", c),
        c => format!("{}-", -c),
    }
}

/// A drawing backend.
pub trait Painter {
    fn draw_line(&mut self, from: Vector2, to: Vector2, style: LineStyle);
    /// A wedge whose narrow end sits at `from`.
    fn draw_wedge(&mut self, from: Vector2, to: Vector2, kind: WedgeKind);
    fn draw_ball(&mut self, at: Vector2, element: &str);
    fn draw_text(&mut self, at: Vector2, label: &AtomLabel);
    fn draw_ring(&mut self, center: Vector2, radius: f64);
}

/// Draw a whole layout with `painter`.
pub fn render<P: Painter>(layout: &Layout, options: &Options, painter: &mut P) {
    let spacing = options.bond_spacing * layout.scale;
    let circled: Vec<bool> = {
        let mut circled = vec![false; layout.bonds.len()];
        for ring in layout.rings.iter().filter(|r| r.aromatic) {
            for bond in &layout.bonds {
                if ring.members.contains(&bond.source) && ring.members.contains(&bond.target) {
                    circled[bond.id] = true;
                }
            }
        }
        circled
    };

    for bond in &layout.bonds {
        let (a, b) = (layout.atom(bond.source), layout.atom(bond.target));
        if !a.drawn || !b.drawn || bond.source == bond.target {
            continue;
        }
        let (from, to) = trim(a, b, layout, options);

        if let Some(stereo) = bond.stereo {
            if stereo.origin == bond.source {
                painter.draw_wedge(from, to, stereo.kind);
            } else {
                painter.draw_wedge(to, from, stereo.kind);
            }
            continue;
        }

        match bond.bond_type {
            BondType::Single | BondType::Up | BondType::Down => {
                painter.draw_line(from, to, LineStyle::Solid)
            }
            BondType::Aromatic if circled[bond.id] => painter.draw_line(from, to, LineStyle::Solid),
            BondType::Aromatic => {
                painter.draw_line(from, to, LineStyle::Solid);
                let (inner_from, inner_to) = inner_line(bond, layout, from, to, spacing, options);
                painter.draw_line(inner_from, inner_to, LineStyle::Dashed);
            }
            BondType::Double if bond.centered => {
                let shift = normal(from, to) * (spacing / 2.0);
                painter.draw_line(from + shift, to + shift, LineStyle::Solid);
                painter.draw_line(from - shift, to - shift, LineStyle::Solid);
            }
            BondType::Double => {
                painter.draw_line(from, to, LineStyle::Solid);
                let (inner_from, inner_to) = inner_line(bond, layout, from, to, spacing, options);
                painter.draw_line(inner_from, inner_to, LineStyle::Solid);
            }
            BondType::Triple => {
                let shift = normal(from, to) * spacing;
                painter.draw_line(from, to, LineStyle::Solid);
                painter.draw_line(from + shift, to + shift, LineStyle::Solid);
                painter.draw_line(from - shift, to - shift, LineStyle::Solid);
            }
            BondType::Quadruple => {
                let shift = normal(from, to) * (spacing / 2.0);
                for k in [-3.0, -1.0, 1.0, 3.0] {
                    painter.draw_line(from + shift * k, to + shift * k, LineStyle::Solid);
                }
            }
        }
    }

    for ring in layout.rings.iter().filter(|r| r.aromatic) {
        let radius = apothem(ring.radius, ring.members.len()) - spacing;
        if radius > 0.0 {
            painter.draw_ring(ring.center, radius);
        }
    }

    for atom in layout.atoms.iter().filter(|a| a.drawn) {
        match options.atom_visualization {
            AtomVisualization::Balls => painter.draw_ball(atom.position, &atom.element),
            AtomVisualization::Default => {
                if let Some(label) = label(atom, options) {
                    painter.draw_text(atom.position, &label);
                }
            }
        }
    }
}

/// The label for an atom, `None` for a plain skeletal carbon.
pub fn label(atom: &LayoutAtom, options: &Options) -> Option<AtomLabel> {
    let shown = atom.element != "C"
        || atom.charge != 0
        || atom.isotope.is_some()
        || atom.pseudo_label.is_some()
        || atom.degree == 0
        || (options.terminal_carbons && atom.degree == 1);
    if !shown {
        return None;
    }
    Some(match &atom.pseudo_label {
        // The condensed label already lists the hydrogens.
        Some(text) => AtomLabel {
            text: text.clone(),
            hydrogens: 0,
            charge: atom.charge as i32,
            isotope: atom.isotope,
        },
        None => AtomLabel {
            text: atom.element.clone(),
            hydrogens: atom.hydrogens,
            charge: atom.charge as i32,
            isotope: atom.isotope,
        },
    })
}

/// Bond end points, pulled back from labelled atoms so lines do not run
/// into the text.
fn trim(a: &LayoutAtom, b: &LayoutAtom, layout: &Layout, options: &Options) -> (Vector2, Vector2) {
    let gap = 0.25 * options.bond_length * layout.scale;
    let direction = (b.position - a.position).normalize_or_zero();
    let labelled = |atom: &LayoutAtom| {
        options.atom_visualization == AtomVisualization::Default && label(atom, options).is_some()
    };
    let from = if labelled(a) { a.position + direction * gap } else { a.position };
    let to = if labelled(b) { b.position - direction * gap } else { b.position };
    (from, to)
}

/// Unit normal of the segment, rotated counter-clockwise.
fn normal(from: Vector2, to: Vector2) -> Vector2 {
    (to - from).perp().normalize_or_zero()
}

/// The shortened second line of a double bond, on the ring side for ring
/// bonds and otherwise on the side with more substituents.
fn inner_line(
    bond: &LayoutBond,
    layout: &Layout,
    from: Vector2,
    to: Vector2,
    spacing: f64,
    options: &Options,
) -> (Vector2, Vector2) {
    let mut shift = normal(from, to);
    let towards = match bond.ring_center {
        Some(center) => (center - from).dot(shift),
        None => layout
            .bonds
            .iter()
            .filter(|other| other.id != bond.id)
            .filter_map(|other| {
                let shared = [bond.source, bond.target]
                    .into_iter()
                    .find(|v| *v == other.source || *v == other.target)?;
                let far = if other.source == shared { other.target } else { other.source };
                Some((layout.atom(far).position - from).dot(shift).signum())
            })
            .sum::<f64>(),
    };
    if towards < 0.0 {
        shift = -shift;
    }
    let shorten = (to - from) * ((1.0 - options.short_bond_length_ratio) / 2.0);
    (from + shorten + shift * spacing, to - shorten + shift * spacing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LayoutEngine;

    #[derive(Debug, Default)]
    struct Recorder {
        lines: Vec<(Vector2, Vector2, LineStyle)>,
        wedges: Vec<WedgeKind>,
        balls: Vec<String>,
        labels: Vec<String>,
        rings: usize,
    }

    impl Painter for Recorder {
        fn draw_line(&mut self, from: Vector2, to: Vector2, style: LineStyle) {
            self.lines.push((from, to, style));
        }
        fn draw_wedge(&mut self, _from: Vector2, _to: Vector2, kind: WedgeKind) {
            self.wedges.push(kind);
        }
        fn draw_ball(&mut self, _at: Vector2, element: &str) {
            self.balls.push(element.to_string());
        }
        fn draw_text(&mut self, _at: Vector2, label: &AtomLabel) {
            self.labels.push(label.plain());
        }
        fn draw_ring(&mut self, _center: Vector2, _radius: f64) {
            self.rings += 1;
        }
    }

    fn record(smiles: &str, options: Options) -> Recorder {
        let engine = LayoutEngine::new(options);
        let layout = engine.layout_smiles(smiles).unwrap();
        let mut recorder = Recorder::default();
        render(&layout, engine.options(), &mut recorder);
        recorder
    }

    #[test]
    fn test_aromatic_ring_gets_a_circle() {
        let recorder = record("c1ccccc1", Options::default());
        assert_eq!(recorder.lines.len(), 6);
        assert_eq!(recorder.rings, 1);
        assert!(recorder.labels.is_empty());
    }

    #[test]
    fn test_kekule_ring_draws_inner_lines() {
        let recorder = record("C1=CC=CC=C1", Options::default());
        assert_eq!(recorder.lines.len(), 9);
        assert_eq!(recorder.rings, 0);
    }

    #[test]
    fn test_bond_multiplicity() {
        assert_eq!(record("C#C", Options::default()).lines.len(), 3);
        let acetaldehyde = record("CC=O", Options::default());
        assert_eq!(acetaldehyde.lines.len(), 3);
        assert_eq!(acetaldehyde.labels, vec!["O".to_string()]);
    }

    #[test]
    fn test_labels() {
        let recorder = record("C[NH3+]", Options::default());
        assert_eq!(recorder.labels, vec!["NH3+".to_string()]);
        let recorder = record("CCO", Options::default().with_terminal_carbons(true));
        assert_eq!(recorder.labels, vec!["CH3".to_string(), "OH".to_string()]);
        let recorder = record("C", Options::default());
        assert_eq!(recorder.labels, vec!["CH4".to_string()]);
    }

    #[test]
    fn test_condensed_group_label() {
        let recorder = record("c1ccccc1C(F)(F)F", Options::default());
        assert_eq!(recorder.labels, vec!["CF3".to_string()]);
        // The three C-F bonds disappear with the fluorines.
        assert_eq!(recorder.lines.len(), 7);
    }

    #[test]
    fn test_wedge_is_drawn() {
        let recorder = record("F[C@H](Cl)Br", Options::default());
        assert_eq!(recorder.wedges.len(), 1);
        assert_eq!(recorder.lines.len(), 2);
    }

    #[test]
    fn test_balls() {
        let options = Options::default().with_atom_visualization(AtomVisualization::Balls);
        let recorder = record("CCO", options);
        assert_eq!(recorder.balls, vec!["C", "C", "O"]);
        assert!(recorder.labels.is_empty());
    }

    #[test]
    fn test_charge_suffix() {
        assert_eq!(charge_suffix(0), "");
        assert_eq!(charge_suffix(1), "+");
        assert_eq!(charge_suffix(-2), "2-");
    }
}
