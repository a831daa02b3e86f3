//! The two-pass driver.
//!
//! Pass 1 walks the source line by line: labels are registered at the
//! current address and code is emitted with symbolic addresses left
//! pending. Pass 2 resolves every pending payload against the label table
//! (literals included) and renders the object text.

use std::fmt::Write as _;

use log::debug;
use miette::{Report, Result};

use crate::emit::Emitter;
use crate::error::{self, SrcSpan};
use crate::memory::Payload;
use crate::parser::{self, Directive, Op, RawLine};
use crate::symbol::SourceLoc;

/// A finished assembly: the object text (which doubles as the listing) and
/// the resolved entry address.
#[derive(Debug)]
pub struct Assembly {
    pub text: String,
    pub start: u16,
    /// Non-fatal diagnostics, in source order.
    pub warnings: Vec<Report>,
}

/// Assemble one source file.
pub fn assemble(file: &str, src: &str) -> Result<Assembly> {
    let mut emitter = Emitter::new(file, src);
    let mut in_block = false;
    let mut entry: Option<(Payload, SourceLoc)> = None;
    let mut offset = 0;

    // Pass 1
    for (idx, text) in src.lines().enumerate() {
        let raw = RawLine {
            num: idx + 1,
            offset,
            text,
        };
        offset += text.len() + 1;
        let Some(stmt) = parser::parse_line(file, src, raw)? else {
            continue;
        };

        // The label column defines a symbol at the current address
        if let Some(name) = &stmt.label {
            let span = SrcSpan {
                offset: raw.offset,
                len: name.len(),
            };
            let loc = SourceLoc {
                file: file.to_string(),
                line: raw.num,
            };
            debug!("label {} = {:04x}", name, emitter.cursor());
            if let Err(original) = emitter.labels.define(name, emitter.cursor(), loc) {
                return Err(error::duplicate_label(file, src, span, name, &original));
            }
        }

        match stmt.op {
            Op::Dir(Directive::Start) => {
                if in_block {
                    return Err(error::nested_start(file, src, stmt.span));
                }
                if stmt.label.is_none() {
                    return Err(error::start_label_missing(file, src, stmt.span));
                }
                if stmt.operands.len() > 1 {
                    return Err(error::operand_count(
                        file, src, stmt.span, "START", "at most one label operand",
                    ));
                }
                in_block = true;
                // First block fixes the entry point
                if entry.is_none() {
                    let loc = SourceLoc {
                        file: file.to_string(),
                        line: raw.num,
                    };
                    let payload = match stmt.operands.first() {
                        None => Payload::Resolved(emitter.cursor()),
                        Some(op) if crate::operand::is_label(&op.text) => {
                            Payload::Pending(op.text.clone())
                        }
                        Some(op) => {
                            return Err(error::bad_operand(
                                file,
                                src,
                                op.span,
                                &format!("`{}` is not a label", op.text),
                            ))
                        }
                    };
                    entry = Some((payload, loc));
                }
            }
            Op::Dir(Directive::End) => {
                if !in_block {
                    return Err(error::before_start(file, src, stmt.span));
                }
                if !stmt.operands.is_empty() {
                    return Err(error::operand_count(
                        file, src, stmt.span, "END", "no operands",
                    ));
                }
                in_block = false;
            }
            _ if !in_block => {
                return Err(error::before_start(file, src, stmt.span));
            }
            Op::Dir(Directive::Ds) => emitter.ds(raw, &stmt)?,
            Op::Dir(Directive::Dc) => emitter.dc(raw, &stmt)?,
            Op::Dir(Directive::In) => emitter.io_macro(raw, &stmt, 1)?,
            Op::Dir(Directive::Out) => emitter.io_macro(raw, &stmt, 2)?,
            Op::Dir(Directive::Rpush) => emitter.rpush(raw, &stmt)?,
            Op::Dir(Directive::Rpop) => emitter.rpop(raw, &stmt)?,
            Op::Machine(mnemonic) => {
                let form = parser::infer_form(file, src, &stmt, mnemonic)?;
                emitter.machine(raw, &stmt, mnemonic, form)?;
            }
        }
    }

    if in_block {
        return Err(error::end_missing(file));
    }
    let Some((entry, entry_loc)) = entry else {
        return Err(error::start_missing(file));
    };
    emitter.allocate_literals()?;

    // Pass 2: reduce every Pending payload to Resolved
    let labels = &emitter.labels;
    for word in emitter.image.iter_mut() {
        if let Payload::Pending(name) = &word.payload {
            match labels.lookup(name) {
                Some(addr) => {
                    debug!("resolve {} -> {:04x}", name, addr);
                    word.payload = Payload::Resolved(addr);
                }
                None => return Err(error::unresolved_label(name, &word.origin.loc)),
            }
        }
    }
    let start = match entry {
        Payload::Resolved(addr) => addr,
        Payload::Pending(name) => labels
            .lookup(&name)
            .ok_or_else(|| error::unresolved_label(&name, &entry_loc))?,
    };

    Ok(Assembly {
        text: render_object(file, start, &emitter),
        start,
        warnings: emitter.warnings,
    })
}

/// Render the textual object stream: header, one row per emitted word
/// (address column only on the first word of a source line), then the
/// label section.
fn render_object(file: &str, start: u16, emitter: &Emitter) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "COMET {:04x}", start);
    let _ = writeln!(out, "CASL LISTING {}", file);
    for (addr, word) in emitter.image.iter().enumerate() {
        let Payload::Resolved(value) = &word.payload else {
            unreachable!("pass 2 resolved every payload");
        };
        if word.origin.leader {
            let _ = writeln!(
                out,
                "  {:4} {:04x} {:04x}\t{}",
                word.origin.loc.line, addr, value, word.origin.text
            );
        } else {
            let _ = writeln!(out, "  {:4}      {:04x}", word.origin.loc.line, value);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "DEFINED LABELS");
    for (name, addr, loc) in emitter.labels.iter() {
        let _ = writeln!(out, "               {}\t{:04x} {}", loc, addr, name);
    }
    out
}
