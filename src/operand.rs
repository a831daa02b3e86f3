//! Operand classification and number parsing.
//!
//! An operand in source is one of: a register (`GR0`..`GR7`), a number
//! (decimal or `#`-prefixed hex), a label reference, or a literal (`=`
//! followed by a number, allocated out of the literal pool).

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::words;

lazy_static! {
    static ref LABEL: Regex = Regex::new(r"^[A-Z][0-9A-Za-z]{0,7}$").unwrap();
    static ref DEC: Regex = Regex::new(r"^-?[0-9]+$").unwrap();
    static ref HEX: Regex = Regex::new(r"^#[0-9A-Fa-f]{1,4}$").unwrap();
}

/// One of the eight general registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Reg {
    Gr0 = 0,
    Gr1,
    Gr2,
    Gr3,
    Gr4,
    Gr5,
    Gr6,
    Gr7,
}

impl Reg {
    pub fn nibble(self) -> u16 {
        self as u16
    }

    /// Register for an already-validated nibble.
    pub fn from_nibble(nibble: u16) -> Option<Reg> {
        Some(match nibble {
            0 => Reg::Gr0,
            1 => Reg::Gr1,
            2 => Reg::Gr2,
            3 => Reg::Gr3,
            4 => Reg::Gr4,
            5 => Reg::Gr5,
            6 => Reg::Gr6,
            7 => Reg::Gr7,
            _ => return None,
        })
    }
}

impl FromStr for Reg {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GR0" => Ok(Reg::Gr0),
            "GR1" => Ok(Reg::Gr1),
            "GR2" => Ok(Reg::Gr2),
            "GR3" => Ok(Reg::Gr3),
            "GR4" => Ok(Reg::Gr4),
            "GR5" => Ok(Reg::Gr5),
            "GR6" => Ok(Reg::Gr6),
            "GR7" => Ok(Reg::Gr7),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GR{}", self.nibble())
    }
}

/// Parse a decimal or `#`-hex number into a word, wrapping modulo 2^16.
pub fn parse_number(text: &str) -> Option<u16> {
    if let Some(hex) = text.strip_prefix('#') {
        if HEX.is_match(text) {
            return u16::from_str_radix(hex, 16).ok();
        }
        return None;
    }
    if DEC.is_match(text) {
        // Decimal accepts the full signed and unsigned ranges and wraps.
        return text.parse::<i32>().ok().map(words::to_unsigned);
    }
    None
}

/// Whether `text` is a well-formed label name.
pub fn is_label(text: &str) -> bool {
    LABEL.is_match(text)
}

/// Whether `text` is a literal operand (`=` prefix).
pub fn is_literal(text: &str) -> bool {
    text.starts_with('=')
}

pub fn parse_register(text: &str) -> Option<Reg> {
    Reg::from_str(text).ok()
}
