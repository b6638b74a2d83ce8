//! The parse tree consumed by the graph builder, and a SMILES reader that
//! produces it.

mod smiles;
pub use smiles::*;

/// Bond token between two atoms as written in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BondSymbol {
    /// No symbol written; single or aromatic depending on the atoms.
    #[default]
    Implicit,
    /// `.`, the next atom starts a disconnected fragment.
    NoBond,
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
    /// `/`
    Up,
    /// `\`
    Down,
}

impl BondSymbol {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::NoBond),
            '-' => Some(Self::Single),
            '=' => Some(Self::Double),
            '#' => Some(Self::Triple),
            '$' => Some(Self::Quadruple),
            ':' => Some(Self::Aromatic),
            '/' => Some(Self::Up),
            '\\' => Some(Self::Down),
            _ => None,
        }
    }
}

/// Tetrahedral chirality as written: `@` or `@@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChiralityTag {
    /// `@`: looking from the first neighbour, the rest run anticlockwise.
    Anticlockwise,
    /// `@@`
    Clockwise,
}

impl ChiralityTag {
    pub fn inverted(self) -> Self {
        match self {
            Self::Anticlockwise => Self::Clockwise,
            Self::Clockwise => Self::Anticlockwise,
        }
    }
}

/// Attributes only expressible inside `[...]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bracket {
    pub isotope: Option<u16>,
    pub chirality: Option<ChiralityTag>,
    pub hcount: u8,
    pub charge: i8,
    pub class: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomSpec {
    /// Symbol as written, lowercase for aromatic atoms.
    pub element: String,
    pub aromatic: bool,
    pub bracket: Option<Bracket>,
}

impl AtomSpec {
    pub fn organic(element: &str) -> Self {
        Self {
            element: element.to_string(),
            aromatic: element.starts_with(|c: char| c.is_ascii_lowercase()),
            bracket: None,
        }
    }

    pub fn bracket(element: &str, bracket: Bracket) -> Self {
        Self {
            bracket: Some(bracket),
            ..Self::organic(element)
        }
    }
}

/// A ring-closure digit attached to an atom, with the optional bond symbol
/// written in front of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingClosure {
    pub label: u16,
    pub bond: Option<BondSymbol>,
}

/// One atom of the parse tree with its incoming bond, ring closures,
/// parenthesized branches and the next atom of its chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    pub atom: AtomSpec,
    pub bond: BondSymbol,
    pub ring_closures: Vec<RingClosure>,
    pub branches: Vec<ParseNode>,
    pub next: Option<Box<ParseNode>>,
}

impl ParseNode {
    pub fn new(atom: AtomSpec) -> Self {
        Self {
            atom,
            bond: BondSymbol::Implicit,
            ring_closures: Vec::new(),
            branches: Vec::new(),
            next: None,
        }
    }

    /// Number of atoms in the tree, counted without recursion.
    pub fn atom_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.branches.iter());
            if let Some(next) = &node.next {
                stack.push(next);
            }
        }
        count
    }
}

impl Drop for ParseNode {
    // Long chains are linked through `next`; unlink them one at a time so a
    // chain of many thousands of atoms cannot overflow the stack.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
    }
}
