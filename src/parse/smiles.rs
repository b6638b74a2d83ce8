//! A SMILES reader built from `nom` combinators.
//!
//! Grammar (OpenSMILES, minus the non-tetrahedral chirality classes):
//!
//! ```text
//! chain          := branched_atom ((bond | '.')? branched_atom)*
//! branched_atom  := atom ring_bond* branch*
//! ring_bond      := bond? (digit | '%' digit digit)
//! branch         := '(' (bond | '.')? chain ')'
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{cut, map, map_res, opt, recognize, value},
    error::VerboseError,
    multi::many0,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use tracing::trace;

use super::{AtomSpec, BondSymbol, Bracket, ChiralityTag, ParseNode, RingClosure};
use crate::error::SyntaxError;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Parses a SMILES string into a parse tree.
///
/// # Arguments
///
/// * `smiles` - The SMILES string. Surrounding whitespace is ignored.
///
/// # Returns
///
/// * `Result<ParseNode, SyntaxError>` - The root atom, or the position of the
///   first character that could not be read.
pub fn parse_smiles(smiles: &str) -> Result<ParseNode, SyntaxError> {
    let input = smiles.trim();
    match chain(input) {
        Ok(("", root)) => {
            trace!(atoms = root.atom_count(), "parsed {input}");
            Ok(root)
        }
        Ok((remaining, _)) => Err(syntax_error(input, remaining)),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            // The deepest failure is the most useful one to report.
            let remaining = e
                .errors
                .iter()
                .map(|(rest, _)| *rest)
                .min_by_key(|rest| rest.len())
                .unwrap_or(input);
            Err(syntax_error(input, remaining))
        }
        Err(nom::Err::Incomplete(_)) => Err(syntax_error(input, "")),
    }
}

fn syntax_error(input: &str, remaining: &str) -> SyntaxError {
    let position = input.len() - remaining.len();
    let message = match remaining.chars().next() {
        Some(c) => format!("unexpected character '{c}'"),
        None => "unexpected end of input".to_string(),
    };
    SyntaxError { position, message }
}

fn bond(input: &str) -> Res<BondSymbol> {
    alt((
        value(BondSymbol::Single, char('-')),
        value(BondSymbol::Double, char('=')),
        value(BondSymbol::Triple, char('#')),
        value(BondSymbol::Quadruple, char('$')),
        value(BondSymbol::Aromatic, char(':')),
        value(BondSymbol::Up, char('/')),
        value(BondSymbol::Down, char('\\')),
    ))(input)
}

fn bond_or_dot(input: &str) -> Res<BondSymbol> {
    alt((bond, value(BondSymbol::NoBond, char('.'))))(input)
}

fn number<T: std::str::FromStr>(input: &str) -> Res<T> {
    map_res(digit1, str::parse)(input)
}

fn single_digit(input: &str) -> Res<u8> {
    map(satisfy(|c| c.is_ascii_digit()), |c| c as u8 - b'0')(input)
}

fn organic_atom(input: &str) -> Res<AtomSpec> {
    map(
        alt((tag("Cl"), tag("Br"), recognize(one_of("BCNOPSFIbcnops*")))),
        AtomSpec::organic,
    )(input)
}

fn bracket_symbol(input: &str) -> Res<&str> {
    alt((
        tag("se"),
        tag("as"),
        tag("te"),
        recognize(one_of("bcnops*")),
        recognize(pair(
            satisfy(|c| c.is_ascii_uppercase()),
            opt(satisfy(|c| c.is_ascii_lowercase())),
        )),
    ))(input)
}

fn chirality(input: &str) -> Res<ChiralityTag> {
    alt((
        value(ChiralityTag::Clockwise, tag("@@")),
        value(ChiralityTag::Anticlockwise, tag("@TH1")),
        value(ChiralityTag::Clockwise, tag("@TH2")),
        value(ChiralityTag::Anticlockwise, tag("@")),
    ))(input)
}

fn hydrogen_count(input: &str) -> Res<u8> {
    map(preceded(char('H'), opt(single_digit)), |count| {
        count.unwrap_or(1)
    })(input)
}

fn charge(input: &str) -> Res<i8> {
    alt((
        value(2, tag("++")),
        value(-2, tag("--")),
        map(pair(one_of("+-"), opt(single_digit)), |(sign, magnitude)| {
            let magnitude = magnitude.unwrap_or(1) as i8;
            if sign == '-' {
                -magnitude
            } else {
                magnitude
            }
        }),
    ))(input)
}

fn bracket_atom(input: &str) -> Res<AtomSpec> {
    map(
        preceded(
            char('['),
            cut(terminated(
                tuple((
                    opt(number::<u16>),
                    bracket_symbol,
                    opt(chirality),
                    opt(hydrogen_count),
                    opt(charge),
                    opt(preceded(char(':'), number::<u16>)),
                )),
                char(']'),
            )),
        ),
        |(isotope, symbol, chirality, hcount, charge, class)| {
            AtomSpec::bracket(
                symbol,
                Bracket {
                    isotope,
                    chirality,
                    hcount: hcount.unwrap_or(0),
                    charge: charge.unwrap_or(0),
                    class,
                },
            )
        },
    )(input)
}

fn atom(input: &str) -> Res<AtomSpec> {
    alt((bracket_atom, organic_atom))(input)
}

fn ring_label(input: &str) -> Res<u16> {
    alt((
        map(single_digit, u16::from),
        preceded(
            char('%'),
            map_res(
                recognize(pair(
                    satisfy(|c| c.is_ascii_digit()),
                    satisfy(|c| c.is_ascii_digit()),
                )),
                str::parse,
            ),
        ),
    ))(input)
}

fn ring_bond(input: &str) -> Res<RingClosure> {
    map(pair(opt(bond), ring_label), |(bond, label)| RingClosure {
        label,
        bond,
    })(input)
}

fn branch(input: &str) -> Res<ParseNode> {
    map(
        preceded(
            char('('),
            cut(terminated(pair(opt(bond_or_dot), chain), char(')'))),
        ),
        |(bond, mut node)| {
            node.bond = bond.unwrap_or_default();
            node
        },
    )(input)
}

fn branched_atom(input: &str) -> Res<ParseNode> {
    map(
        tuple((atom, many0(ring_bond), many0(branch))),
        |(atom, ring_closures, branches)| {
            let mut node = ParseNode::new(atom);
            node.ring_closures = ring_closures;
            node.branches = branches;
            node
        },
    )(input)
}

fn chain(input: &str) -> Res<ParseNode> {
    map(
        pair(branched_atom, many0(pair(opt(bond_or_dot), branched_atom))),
        |(mut first, rest)| {
            // Link the chain back to front so no node is visited twice.
            let mut tail: Option<Box<ParseNode>> = None;
            for (bond, mut node) in rest.into_iter().rev() {
                node.bond = bond.unwrap_or_default();
                node.next = tail;
                tail = Some(Box::new(node));
            }
            first.next = tail;
            first
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk the main chain, returning the written symbols.
    fn chain_symbols(root: &ParseNode) -> Vec<String> {
        let mut symbols = vec![root.atom.element.clone()];
        let mut node = root;
        while let Some(next) = &node.next {
            symbols.push(next.atom.element.clone());
            node = &**next;
        }
        symbols
    }

    #[test]
    fn test_parse_ethanol() {
        let root = parse_smiles("CCO").unwrap();
        assert_eq!(chain_symbols(&root), vec!["C", "C", "O"]);
        assert_eq!(root.atom_count(), 3);
        assert_eq!(root.bond, BondSymbol::Implicit);
    }

    #[test]
    fn test_parse_branches_and_bonds() {
        let root = parse_smiles("CC(=O)O").unwrap();
        assert_eq!(root.atom_count(), 4);
        let second = root.next.as_ref().unwrap();
        assert_eq!(second.branches.len(), 1);
        assert_eq!(second.branches[0].bond, BondSymbol::Double);
        assert_eq!(second.branches[0].atom.element, "O");
        assert_eq!(second.next.as_ref().unwrap().atom.element, "O");
    }

    #[test]
    fn test_parse_ring_closures() {
        let root = parse_smiles("c1ccccc1").unwrap();
        assert_eq!(root.atom_count(), 6);
        assert!(root.atom.aromatic);
        assert_eq!(root.ring_closures, vec![RingClosure { label: 1, bond: None }]);

        let root = parse_smiles("C=1CC%12CC1C%12").unwrap();
        assert_eq!(
            root.ring_closures,
            vec![RingClosure { label: 1, bond: Some(BondSymbol::Double) }]
        );
        let third = root.next.as_ref().unwrap().next.as_ref().unwrap();
        assert_eq!(third.ring_closures[0].label, 12);
    }

    #[test]
    fn test_parse_bracket_atom() {
        let root = parse_smiles("[13CH3-:7]").unwrap();
        let bracket = root.atom.bracket.clone().unwrap();
        assert_eq!(root.atom.element, "C");
        assert_eq!(bracket.isotope, Some(13));
        assert_eq!(bracket.hcount, 3);
        assert_eq!(bracket.charge, -1);
        assert_eq!(bracket.class, Some(7));

        let root = parse_smiles("F[C@@H](Cl)Br").unwrap();
        let center = root.next.as_ref().unwrap();
        let bracket = center.atom.bracket.clone().unwrap();
        assert_eq!(bracket.chirality, Some(ChiralityTag::Clockwise));
        assert_eq!(bracket.hcount, 1);

        let root = parse_smiles("[nH]1cccc1").unwrap();
        assert!(root.atom.aromatic);
        assert_eq!(root.atom.element, "n");

        let root = parse_smiles("[Fe++]").unwrap();
        assert_eq!(root.atom.bracket.as_ref().unwrap().charge, 2);
    }

    #[test]
    fn test_parse_fragments() {
        let root = parse_smiles("[Na+].[Cl-]").unwrap();
        let second = root.next.as_ref().unwrap();
        assert_eq!(second.bond, BondSymbol::NoBond);
        assert_eq!(second.atom.element, "Cl");
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_smiles("CC(C").unwrap_err();
        assert_eq!(err.position, 4);

        let err = parse_smiles("C[Zz").unwrap_err();
        assert!(err.position >= 1);

        let err = parse_smiles("").unwrap_err();
        assert_eq!(err.position, 0);
        assert_eq!(err.message, "unexpected end of input");

        let err = parse_smiles("CC)C").unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(err.message, "unexpected character ')'");
    }

    #[test]
    fn test_parse_long_chain_without_recursion() {
        let smiles = "C".repeat(50_000);
        let root = parse_smiles(&smiles).unwrap();
        assert_eq!(root.atom_count(), 50_000);
    }
}
