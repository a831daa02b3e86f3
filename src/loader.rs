//! Object-file reader.
//!
//! Only three shapes of line matter: the `COMET <hex>` header, the word
//! rows, and the entries under `DEFINED LABELS`. Everything else in the
//! stream (the listing banner, source text after the tab) is skipped.

use lazy_static::lazy_static;
use log::debug;
use miette::Result;
use regex::Regex;

use crate::error;
use crate::symbol::ReverseTable;

lazy_static! {
    static ref HEADER: Regex = Regex::new(r"^COMET\s+([0-9A-Fa-f]+)").unwrap();
    static ref WORD_ROW: Regex =
        Regex::new(r"^\s*\d+\s+([0-9A-Fa-f]{4})(?:\s+([0-9A-Fa-f]{4}))?(?:\t|\s*$)").unwrap();
    static ref LABEL_ROW: Regex =
        Regex::new(r"^\s*(\S+):(\d+)\s+([0-9A-Fa-f]{1,4})\s+(\S+)\s*$").unwrap();
}

/// A parsed object: words in emission order (address 0 upward), the entry
/// address, and the reverse label map for disassembly.
pub struct Object {
    pub start: u16,
    pub words: Vec<u16>,
    pub labels: ReverseTable,
}

impl Object {
    /// Last address occupied by the program image.
    pub fn end(&self) -> u16 {
        (self.words.len() as u16).saturating_sub(1)
    }
}

/// Parse the textual object stream. `path` is only used in diagnostics.
pub fn parse(path: &str, text: &str) -> Result<Object> {
    let mut lines = text.lines();
    let header = lines.next().unwrap_or("");
    let start = HEADER
        .captures(header)
        .and_then(|cap| u16::from_str_radix(&cap[1], 16).ok())
        .ok_or_else(|| error::bad_object_header(path))?;

    let mut words = Vec::new();
    let mut labels = ReverseTable::new();
    let mut in_labels = false;
    for line in lines {
        if line.trim() == "DEFINED LABELS" {
            in_labels = true;
            continue;
        }
        if in_labels {
            if let Some(cap) = LABEL_ROW.captures(line) {
                if let Ok(addr) = u16::from_str_radix(&cap[3], 16) {
                    labels.insert(addr, &cap[4]);
                }
            }
        } else if let Some(cap) = WORD_ROW.captures(line) {
            // Leader rows carry (addr, word); continuation rows only the word
            let word = cap.get(2).unwrap_or_else(|| cap.get(1).unwrap());
            words.push(u16::from_str_radix(word.as_str(), 16).unwrap());
        }
    }
    debug!("loaded {}: start={:04x} words={}", path, start, words.len());

    Ok(Object {
        start,
        words,
        labels,
    })
}
