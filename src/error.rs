use thiserror::Error;

use crate::graph::VertexId;

/// Malformed SMILES text, reported by the reader before any graph exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at position {position}: {message}")]
pub struct SyntaxError {
    pub position: usize,
    pub message: String,
}

/// A parse tree that cannot describe a molecule. Raised by the graph builder
/// and by ring perception; the whole layout is aborted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("ring closure {label} is opened but never closed")]
    UnclosedRing { label: u16 },
    #[error("ring closure {label} specifies two different bond types")]
    RingBondConflict { label: u16 },
    #[error("ring closure {label} carries a bond symbol that cannot close a ring")]
    InvalidRingBond { label: u16 },
    #[error("ring through vertices {members:?} has size {size}, rings need at least 3 atoms")]
    RingTooSmall { size: usize, members: Vec<VertexId> },
    #[error("atom {vertex} ({element}) has valence {valence}, the maximum is {capacity}")]
    ValenceExceeded {
        vertex: VertexId,
        element: String,
        valence: u32,
        capacity: u32,
    },
    #[error("unrecognized element symbol '{symbol}'")]
    UnknownElement { symbol: String },
    #[error("the molecule has no atoms")]
    EmptyMolecule,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("invalid value '{value}' for option '{key}'")]
    InvalidValue { key: String, value: String },
    #[error("expected 'key=value', got '{0}'")]
    Malformed(String),
}

/// Everything that can stop a molecule from being laid out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
