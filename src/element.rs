//! Static per-element data: atomic numbers, standard atomic weights and the
//! default valences used for implicit hydrogens and valence checking.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

/// Symbols in atomic-number order, paired with their standard atomic weight.
const PERIODIC_TABLE: [(&str, f64); 118] = [
    ("H", 1.008), ("He", 4.0026), ("Li", 6.94), ("Be", 9.0122), ("B", 10.81),
    ("C", 12.011), ("N", 14.007), ("O", 15.999), ("F", 18.998), ("Ne", 20.180),
    ("Na", 22.990), ("Mg", 24.305), ("Al", 26.982), ("Si", 28.085), ("P", 30.974),
    ("S", 32.06), ("Cl", 35.45), ("Ar", 39.948), ("K", 39.098), ("Ca", 40.078),
    ("Sc", 44.956), ("Ti", 47.867), ("V", 50.942), ("Cr", 51.996), ("Mn", 54.938),
    ("Fe", 55.845), ("Co", 58.933), ("Ni", 58.693), ("Cu", 63.546), ("Zn", 65.38),
    ("Ga", 69.723), ("Ge", 72.630), ("As", 74.922), ("Se", 78.971), ("Br", 79.904),
    ("Kr", 83.798), ("Rb", 85.468), ("Sr", 87.62), ("Y", 88.906), ("Zr", 91.224),
    ("Nb", 92.906), ("Mo", 95.95), ("Tc", 98.0), ("Ru", 101.07), ("Rh", 102.91),
    ("Pd", 106.42), ("Ag", 107.87), ("Cd", 112.41), ("In", 114.82), ("Sn", 118.71),
    ("Sb", 121.76), ("Te", 127.60), ("I", 126.90), ("Xe", 131.29), ("Cs", 132.91),
    ("Ba", 137.33), ("La", 138.91), ("Ce", 140.12), ("Pr", 140.91), ("Nd", 144.24),
    ("Pm", 145.0), ("Sm", 150.36), ("Eu", 151.96), ("Gd", 157.25), ("Tb", 158.93),
    ("Dy", 162.50), ("Ho", 164.93), ("Er", 167.26), ("Tm", 168.93), ("Yb", 173.05),
    ("Lu", 174.97), ("Hf", 178.49), ("Ta", 180.95), ("W", 183.84), ("Re", 186.21),
    ("Os", 190.23), ("Ir", 192.22), ("Pt", 195.08), ("Au", 196.97), ("Hg", 200.59),
    ("Tl", 204.38), ("Pb", 207.2), ("Bi", 208.98), ("Po", 209.0), ("At", 210.0),
    ("Rn", 222.0), ("Fr", 223.0), ("Ra", 226.0), ("Ac", 227.0), ("Th", 232.04),
    ("Pa", 231.04), ("U", 238.03), ("Np", 237.0), ("Pu", 244.0), ("Am", 243.0),
    ("Cm", 247.0), ("Bk", 247.0), ("Cf", 251.0), ("Es", 252.0), ("Fm", 257.0),
    ("Md", 258.0), ("No", 259.0), ("Lr", 266.0), ("Rf", 267.0), ("Db", 268.0),
    ("Sg", 269.0), ("Bh", 270.0), ("Hs", 277.0), ("Mt", 278.0), ("Ds", 281.0),
    ("Rg", 282.0), ("Cn", 285.0), ("Nh", 286.0), ("Fl", 289.0), ("Mc", 290.0),
    ("Lv", 293.0), ("Ts", 294.0), ("Og", 294.0),
];

/// Default valences, lowest first. Elements missing here are not
/// valence-checked and never receive implicit hydrogens.
const DEFAULT_VALENCES: [(&str, &[u8]); 17] = [
    ("H", &[1]),
    ("B", &[3]),
    ("C", &[4]),
    ("N", &[3, 5]),
    ("O", &[2]),
    ("F", &[1]),
    ("Si", &[4]),
    ("P", &[3, 5]),
    ("S", &[2, 4, 6]),
    ("Cl", &[1]),
    ("Ge", &[4]),
    ("As", &[3, 5]),
    ("Se", &[2, 4, 6]),
    ("Br", &[1]),
    ("Sn", &[4]),
    ("Te", &[2, 4, 6]),
    ("I", &[1, 3, 5]),
];

/// Symbols that may be written in lowercase to mark aromaticity.
const AROMATIC_SYMBOLS: [&str; 9] = ["b", "c", "n", "o", "p", "s", "se", "as", "te"];

/// The wildcard atom `*`.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub symbol: &'static str,
    pub atomic_number: u8,
    pub mass: f64,
    pub valences: &'static [u8],
}

impl ElementData {
    /// The largest default valence, if the element has any.
    pub fn capacity(&self) -> Option<u8> {
        self.valences.iter().copied().max()
    }
}

lazy_static! {
    static ref ELEMENTS: BTreeMap<&'static str, ElementData> = {
        let valences: BTreeMap<&str, &'static [u8]> = DEFAULT_VALENCES.iter().copied().collect();
        let mut elements = BTreeMap::new();
        for (index, (symbol, mass)) in PERIODIC_TABLE.iter().enumerate() {
            elements.insert(
                *symbol,
                ElementData {
                    symbol: *symbol,
                    atomic_number: index as u8 + 1,
                    mass: *mass,
                    valences: valences.get(symbol).copied().unwrap_or(&[]),
                },
            );
        }
        elements.insert(
            WILDCARD,
            ElementData {
                symbol: WILDCARD,
                atomic_number: 0,
                mass: 0.0,
                valences: &[],
            },
        );
        elements
    };
}

/// Look up an element by its canonical (capitalized) symbol.
pub fn element(symbol: &str) -> Option<&'static ElementData> {
    ELEMENTS.get(symbol)
}

pub fn atomic_number(symbol: &str) -> Option<u8> {
    element(symbol).map(|data| data.atomic_number)
}

pub fn atomic_mass(symbol: &str) -> Option<f64> {
    element(symbol).map(|data| data.mass)
}

/// Turn a symbol as written in SMILES into its canonical form plus the
/// aromatic flag: `c` becomes `("C", true)`, `Cl` stays `("Cl", false)`.
/// Returns `None` for anything that is not a known element.
pub fn normalize_symbol(written: &str) -> Option<(String, bool)> {
    if written == WILDCARD {
        return Some((WILDCARD.to_string(), false));
    }

    let mut chars = written.chars();
    let first = chars.next()?;
    let aromatic = first.is_ascii_lowercase();
    if aromatic && !AROMATIC_SYMBOLS.contains(&written) {
        return None;
    }

    let canonical: String = first.to_ascii_uppercase().to_string() + chars.as_str();
    element(&canonical).map(|data| (data.symbol.to_string(), aromatic))
}
