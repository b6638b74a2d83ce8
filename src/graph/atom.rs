use std::collections::BTreeMap;

use crate::element::{self, normalize_symbol};
use crate::error::StructuralError;
use crate::graph::{BondType, RingId, VertexId};
use crate::parse::{AtomSpec, Bracket, ChiralityTag};

/// A terminal atom folded into its neighbour's label, e.g. the three
/// fluorines of a `CF3` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoElement {
    pub element: String,
    pub count: usize,
    pub hydrogens: usize,
    pub charge: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Canonical symbol, e.g. `C`, `Cl`, `*`.
    pub element: String,
    pub aromatic: bool,
    pub bracket: Option<Bracket>,
    /// Bond through which the spanning tree reached this atom.
    pub bond_type: Option<BondType>,
    pub rings: Vec<RingId>,
    pub is_bridge: bool,
    pub is_bridge_node: bool,
    /// Rank among the substituents of the last stereocenter that ranked it,
    /// 0 being the highest priority.
    pub priority: usize,
    pub implicit_hydrogens: u8,
    pub pseudo_elements: BTreeMap<String, PseudoElement>,
    /// False once the atom is folded into a neighbour's pseudo-group.
    pub drawn: bool,
    pub is_stereo_center: bool,
    /// Neighbours in the order SMILES lists them; `None` is the implicit or
    /// bracket hydrogen.
    pub(crate) stereo_neighbours: Vec<Option<VertexId>>,
}

impl Atom {
    pub fn new(element: &str, aromatic: bool) -> Self {
        Self {
            element: element.to_string(),
            aromatic,
            bracket: None,
            bond_type: None,
            rings: Vec::new(),
            is_bridge: false,
            is_bridge_node: false,
            priority: 0,
            implicit_hydrogens: 0,
            pseudo_elements: BTreeMap::new(),
            drawn: true,
            is_stereo_center: false,
            stereo_neighbours: Vec::new(),
        }
    }

    pub fn from_spec(spec: &AtomSpec) -> Result<Self, StructuralError> {
        let (element, aromatic) =
            normalize_symbol(&spec.element).ok_or_else(|| StructuralError::UnknownElement {
                symbol: spec.element.clone(),
            })?;
        let mut atom = Self::new(&element, aromatic || spec.aromatic);
        atom.bracket = spec.bracket.clone();
        Ok(atom)
    }

    pub fn atomic_number(&self) -> u8 {
        element::atomic_number(&self.element).unwrap_or(0)
    }

    pub fn is_hetero_atom(&self) -> bool {
        self.element != "C" && self.element != "H"
    }

    pub fn charge(&self) -> i8 {
        self.bracket.as_ref().map_or(0, |b| b.charge)
    }

    pub fn isotope(&self) -> Option<u16> {
        self.bracket.as_ref().and_then(|b| b.isotope)
    }

    pub fn chirality(&self) -> Option<ChiralityTag> {
        self.bracket.as_ref().and_then(|b| b.chirality)
    }

    /// Explicit bracket hydrogens, or the computed implicit ones.
    pub fn hydrogen_count(&self) -> u8 {
        match &self.bracket {
            Some(bracket) => bracket.hcount,
            None => self.implicit_hydrogens,
        }
    }

    pub fn is_in_ring(&self) -> bool {
        !self.rings.is_empty()
    }

    pub fn stereo_neighbours(&self) -> &[Option<VertexId>] {
        &self.stereo_neighbours
    }

    pub fn has_pseudo_elements(&self) -> bool {
        !self.pseudo_elements.is_empty()
    }

    pub fn attach_pseudo_element(&mut self, element: &str, hydrogens: u8, charge: i8) {
        let entry = self
            .pseudo_elements
            .entry(element.to_string())
            .or_insert_with(|| PseudoElement {
                element: element.to_string(),
                count: 0,
                hydrogens: 0,
                charge: 0,
            });
        entry.count += 1;
        entry.hydrogens += hydrogens as usize;
        entry.charge += charge as i32;
    }

    /// Label of a compacted group such as `CF3` or `SO3H`.
    pub fn pseudo_label(&self) -> Option<String> {
        if self.pseudo_elements.is_empty() {
            return None;
        }
        let mut label = self.element.clone();
        push_count(&mut label, "H", self.hydrogen_count() as usize);
        for pseudo in self.pseudo_elements.values() {
            push_count(&mut label, &pseudo.element, pseudo.count);
            push_count(&mut label, "H", pseudo.hydrogens);
        }
        Some(label)
    }

    /// Net charge of the atom together with its pseudo-group.
    pub fn total_charge(&self) -> i32 {
        self.charge() as i32 + self.pseudo_elements.values().map(|p| p.charge).sum::<i32>()
    }
}

fn push_count(label: &mut String, symbol: &str, count: usize) {
    match count {
        0 => {}
        1 => label.push_str(symbol),
        n => {
            label.push_str(symbol);
            label.push_str(&n.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_from_spec() {
        let atom = Atom::from_spec(&AtomSpec::organic("c")).unwrap();
        assert_eq!(atom.element, "C");
        assert!(atom.aromatic);
        assert_eq!(atom.atomic_number(), 6);

        let err = Atom::from_spec(&AtomSpec::organic("Xy")).unwrap_err();
        assert_eq!(err, StructuralError::UnknownElement { symbol: "Xy".to_string() });
    }

    #[test]
    fn test_pseudo_label() {
        let mut carbon = Atom::new("C", false);
        for _ in 0..3 {
            carbon.attach_pseudo_element("F", 0, 0);
        }
        assert_eq!(carbon.pseudo_label().as_deref(), Some("CF3"));

        let mut sulfur = Atom::new("S", false);
        sulfur.attach_pseudo_element("O", 0, 0);
        sulfur.attach_pseudo_element("O", 0, 0);
        sulfur.attach_pseudo_element("O", 1, 0);
        assert_eq!(sulfur.pseudo_label().as_deref(), Some("SO3H"));

        assert_eq!(Atom::new("N", false).pseudo_label(), None);
    }
}
