//! Two-dimensional structure diagrams from SMILES.
//!
//! A SMILES string is read into a parse tree, turned into a molecular graph,
//! searched for rings, given coordinates by growing zig-zag chains and
//! regular ring polygons, untangled, annotated with wedges and cis/trans
//! markers, and finally normalized into a [`Layout`] that any [`Painter`]
//! can draw.
//!
//! ```
//! use smiles_layout::*;
//!
//! let engine = LayoutEngine::new(Options::default());
//! let layout = engine.layout_smiles("c1ccccc1O").unwrap();
//! assert_eq!(layout.formula, "C6H6O");
//!
//! let mut painter = SvgPainter::for_layout(&layout, engine.options().bond_length);
//! render(&layout, engine.options(), &mut painter);
//! assert!(painter.finish().starts_with("<svg"));
//! ```

mod batch;
pub use batch::*;

mod config;
pub use config::*;

mod draw;
pub use draw::*;

mod element;
pub use element::*;

mod engine;
pub use engine::*;

mod error;
pub use error::*;

mod graph;
pub use graph::*;

mod layout;
pub use layout::*;

mod logging;
pub use logging::*;

mod math;
pub use math::*;

mod parse;
pub use parse::*;

mod rings;
pub use rings::*;

mod stereo;
pub use stereo::*;

mod visualize;
pub use visualize::*;
