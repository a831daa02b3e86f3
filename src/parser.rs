//! Line parser for CASL source: splits one line into (label, operation,
//! operands) and infers the addressing form from operand shape.
//!
//! A line is `^(label)? op (operands)?$`. The label column starts at column
//! 0; the operation is uppercase letters; operands are comma-separated. A
//! `DC` string operand is single-quoted and may contain commas, semicolons,
//! and `''` escapes, so comment stripping and operand splitting are both
//! quote-aware.

use lazy_static::lazy_static;
use regex::Regex;

use miette::Result;

use crate::error::{self, SrcSpan};
use crate::opcode::{AddrForm, Mnemonic};
use crate::operand;

lazy_static! {
    static ref OPERATION: Regex = Regex::new(r"^[A-Z]+$").unwrap();
}

/// Assembler-only operations: directives and macros.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Directive {
    Start,
    End,
    Ds,
    Dc,
    In,
    Out,
    Rpush,
    Rpop,
}

impl Directive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "START" => Directive::Start,
            "END" => Directive::End,
            "DS" => Directive::Ds,
            "DC" => Directive::Dc,
            "IN" => Directive::In,
            "OUT" => Directive::Out,
            "RPUSH" => Directive::Rpush,
            "RPOP" => Directive::Rpop,
            _ => return None,
        })
    }
}

/// What a line asks the assembler to do.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op {
    Machine(Mnemonic),
    Dir(Directive),
}

/// One operand with its position in the file, for diagnostics.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Operand {
    pub text: String,
    pub span: SrcSpan,
}

impl Operand {
    pub fn is_register(&self) -> bool {
        operand::parse_register(&self.text).is_some()
    }
}

/// A tokenized source line.
#[derive(Debug)]
pub struct Stmt {
    pub label: Option<String>,
    pub op: Op,
    pub operands: Vec<Operand>,
    /// Span of the whole statement (comment excluded).
    pub span: SrcSpan,
}

/// A physical line plus its position within the source file.
#[derive(Clone, Copy, Debug)]
pub struct RawLine<'a> {
    pub num: usize,
    pub offset: usize,
    pub text: &'a str,
}

/// Byte index where the comment starts, scanning past single-quoted
/// strings (`''` is an escaped quote, not a close-open pair).
fn comment_start(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut in_quote = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if in_quote => {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 1;
                } else {
                    in_quote = false;
                }
            }
            b'\'' => in_quote = true,
            b';' if !in_quote => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Split an operand field on commas that fall outside quoted strings.
/// Returns `(start, text)` pairs relative to the field.
fn split_operands(field: &str) -> Vec<(usize, &str)> {
    let bytes = field.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut in_quote = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if in_quote => {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 1;
                } else {
                    in_quote = false;
                }
            }
            b'\'' => in_quote = true,
            b',' if !in_quote => {
                parts.push((start, &field[start..i]));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push((start, &field[start..]));
    parts
}

/// Tokenize one line. `Ok(None)` for lines that are blank after comment
/// stripping.
pub fn parse_line(file: &str, src: &str, raw: RawLine) -> Result<Option<Stmt>> {
    let body = &raw.text[..comment_start(raw.text)];
    if body.trim().is_empty() {
        return Ok(None);
    }

    let span = SrcSpan {
        offset: raw.offset,
        len: body.trim_end().len(),
    };

    let mut rest = body;
    let mut cursor = 0;

    // Label column: anything that starts in column 0
    let mut label = None;
    if !rest.starts_with(char::is_whitespace) {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let name = &rest[..end];
        if !operand::is_label(name) {
            return Err(error::bad_label(
                file,
                src,
                SrcSpan {
                    offset: raw.offset,
                    len: end,
                },
                name,
            ));
        }
        label = Some(name.to_string());
        cursor = end;
        rest = &rest[end..];
    }

    // Operation column
    let trimmed = rest.trim_start();
    cursor += rest.len() - trimmed.len();
    rest = trimmed;
    if rest.is_empty() {
        return Err(error::syntax(file, src, span, "label without an operation"));
    }
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = &rest[..end];
    let op_span = SrcSpan {
        offset: raw.offset + cursor,
        len: end,
    };
    if !OPERATION.is_match(name) {
        return Err(error::syntax(file, src, op_span, "operation must be uppercase letters"));
    }
    let op = if let Some(dir) = Directive::from_name(name) {
        Op::Dir(dir)
    } else if let Some(mnemonic) = Mnemonic::from_name(name) {
        Op::Machine(mnemonic)
    } else {
        return Err(error::unknown_operation(file, src, op_span, name));
    };
    cursor += end;
    rest = &rest[end..];

    // Operand field
    let trimmed = rest.trim_start();
    cursor += rest.len() - trimmed.len();
    let field = trimmed.trim_end();
    let mut operands = Vec::new();
    if !field.is_empty() {
        for (start, part) in split_operands(field) {
            let text = part.trim();
            let lead = part.len() - part.trim_start().len();
            let part_span = SrcSpan {
                offset: raw.offset + cursor + start + lead,
                len: text.len(),
            };
            if text.is_empty() {
                return Err(error::syntax(file, src, part_span, "empty operand"));
            }
            operands.push(Operand {
                text: text.to_string(),
                span: part_span,
            });
        }
    }

    Ok(Some(Stmt {
        label,
        op,
        operands,
        span,
    }))
}

/// Pick the unique addressing form for a machine instruction from its
/// operand count/shape intersected with the forms the mnemonic encodes to.
pub fn infer_form(
    file: &str,
    src: &str,
    stmt: &Stmt,
    mnemonic: Mnemonic,
) -> Result<AddrForm> {
    let candidates: &[AddrForm] = match stmt.operands.len() {
        0 => &[AddrForm::Nopr],
        1 => &[AddrForm::R, AddrForm::AdrX],
        2 => {
            if stmt.operands[1].is_register() {
                &[AddrForm::R1R2, AddrForm::AdrX]
            } else {
                &[AddrForm::RAdrX]
            }
        }
        3 => &[AddrForm::RAdrX],
        _ => &[],
    };
    let matches: Vec<AddrForm> = mnemonic
        .forms()
        .iter()
        .copied()
        .filter(|form| candidates.contains(form))
        .collect();
    match matches.as_slice() {
        [form] => Ok(*form),
        _ => Err(error::form_mismatch(file, src, stmt.span, mnemonic)),
    }
}
