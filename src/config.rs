use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, rest},
    sequence::{delimited, separated_pair},
    IResult,
};

use crate::error::ConfigError;

/// How atoms are drawn by [`crate::draw::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtomVisualization {
    /// Element labels on heteroatoms, bare vertices for carbon.
    #[default]
    Default,
    /// A ball on every atom.
    Balls,
}

/// Drawing and layout options shared by every stage of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub bond_length: f64,
    pub short_bond_length_ratio: f64,
    pub bond_spacing: f64,
    pub overlap_resolution_iterations: usize,
    pub overlap_sensitivity: f64,
    pub padding: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub compact_drawing: bool,
    pub terminal_carbons: bool,
    pub isomeric: bool,
    pub atom_visualization: AtomVisualization,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bond_length: 30.0,
            short_bond_length_ratio: 0.8,
            bond_spacing: 0.17 * 30.0,
            overlap_resolution_iterations: 1,
            overlap_sensitivity: 0.42,
            padding: 20.0,
            width: None,
            height: None,
            compact_drawing: true,
            terminal_carbons: false,
            isomeric: true,
            atom_visualization: AtomVisualization::Default,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also rescales the bond spacing so parallel lines keep their proportion.
    pub fn with_bond_length(mut self, bond_length: f64) -> Self {
        self.bond_spacing = self.bond_spacing / self.bond_length * bond_length;
        self.bond_length = bond_length;
        self
    }

    pub fn with_bond_spacing(mut self, bond_spacing: f64) -> Self {
        self.bond_spacing = bond_spacing;
        self
    }

    pub fn with_overlap_resolution_iterations(mut self, iterations: usize) -> Self {
        self.overlap_resolution_iterations = iterations;
        self
    }

    pub fn with_overlap_sensitivity(mut self, sensitivity: f64) -> Self {
        self.overlap_sensitivity = sensitivity;
        self
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Fit the final drawing into a `width` by `height` box.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_compact_drawing(mut self, compact: bool) -> Self {
        self.compact_drawing = compact;
        self
    }

    pub fn with_terminal_carbons(mut self, terminal_carbons: bool) -> Self {
        self.terminal_carbons = terminal_carbons;
        self
    }

    pub fn with_isomeric(mut self, isomeric: bool) -> Self {
        self.isomeric = isomeric;
        self
    }

    pub fn with_atom_visualization(mut self, visualization: AtomVisualization) -> Self {
        self.atom_visualization = visualization;
        self
    }

    /// Threshold distance below which two atoms count as overlapping.
    pub fn overlap_threshold(&self) -> f64 {
        self.overlap_sensitivity * self.bond_length
    }

    /// Apply a single `key=value` assignment, e.g. `bond_length=25`.
    /// Keys may be written in snake_case or camelCase.
    pub fn apply(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (key, value) = match all_consuming(key_value)(assignment) {
            Ok((_, pair)) => pair,
            Err(_) => return Err(ConfigError::Malformed(assignment.to_string())),
        };

        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let number = || value.parse::<f64>().ok().filter(|n| n.is_finite()).ok_or_else(invalid);
        let positive = || number().and_then(|n| if n > 0.0 { Ok(n) } else { Err(invalid()) });
        let flag = || match boolean(value) {
            Ok((_, b)) => Ok(b),
            Err(_) => Err(invalid()),
        };

        match normalize_key(key).as_str() {
            "bond_length" => *self = self.clone().with_bond_length(positive()?),
            "short_bond_length_ratio" => self.short_bond_length_ratio = positive()?,
            "bond_spacing" => self.bond_spacing = number()?,
            "overlap_resolution_iterations" => {
                self.overlap_resolution_iterations = value.parse().map_err(|_| invalid())?
            }
            "overlap_sensitivity" => self.overlap_sensitivity = positive()?,
            "padding" => self.padding = number()?,
            "width" => self.width = Some(positive()?),
            "height" => self.height = Some(positive()?),
            "compact_drawing" => self.compact_drawing = flag()?,
            "terminal_carbons" => self.terminal_carbons = flag()?,
            "isomeric" => self.isomeric = flag()?,
            "atom_visualization" => {
                self.atom_visualization = match value.to_ascii_lowercase().as_str() {
                    "default" => AtomVisualization::Default,
                    "balls" => AtomVisualization::Balls,
                    _ => return Err(invalid()),
                }
            }
            _ => return Err(ConfigError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    /// Build options from a list of `key=value` assignments on top of the defaults.
    pub fn from_assignments<'a, I>(assignments: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut options = Self::default();
        for assignment in assignments {
            options.apply(assignment)?;
        }
        Ok(options)
    }
}

fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        delimited(
            multispace0,
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            multispace0,
        ),
        char('='),
        map(rest, str::trim),
    )(input)
}

fn boolean(input: &str) -> IResult<&str, bool> {
    all_consuming(alt((
        map(alt((tag("true"), tag("yes"), tag("on"), tag("1"))), |_| true),
        map(alt((tag("false"), tag("no"), tag("off"), tag("0"))), |_| false),
    )))(input)
}

/// `bondLength` and `bond_length` name the same option.
fn normalize_key(key: &str) -> String {
    let mut normalized = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            normalized.push('_');
            normalized.push(c.to_ascii_lowercase());
        } else {
            normalized.push(c);
        }
    }
    normalized
}
