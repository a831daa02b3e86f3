//! Diagnostic constructors for the assembler and loader.
//!
//! Each function builds a finished [`Report`] carrying a code, help text,
//! and a label into the offending source line.

use miette::{miette, LabeledSpan, NamedSource, Report, Severity};

use crate::opcode::Mnemonic;
use crate::symbol::SourceLoc;

/// A labeled region of one source file, in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SrcSpan {
    pub offset: usize,
    pub len: usize,
}

impl From<SrcSpan> for miette::SourceSpan {
    fn from(span: SrcSpan) -> Self {
        miette::SourceSpan::new(span.offset.into(), span.len)
    }
}

fn named(file: &str, src: &str) -> NamedSource<String> {
    NamedSource::new(file, src.to_string())
}

// Lex/syntax errors

pub fn syntax(file: &str, src: &str, span: SrcSpan, detail: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::syntax",
        help = "a line is `[label] OP [operand, ...]`; labels start in column 0",
        labels = vec![LabeledSpan::at(span, "unreadable line")],
        "Syntax error: {detail}",
    )
    .with_source_code(named(file, src))
}

pub fn unknown_operation(file: &str, src: &str, span: SrcSpan, op: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::op",
        help = "check the list of machine instructions and assembler directives",
        labels = vec![LabeledSpan::at(span, "unknown operation")],
        "Unknown operation `{op}`",
    )
    .with_source_code(named(file, src))
}

pub fn bad_label(file: &str, src: &str, span: SrcSpan, label: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::label",
        help = "labels are an uppercase letter followed by up to 7 alphanumerics",
        labels = vec![LabeledSpan::at(span, "invalid label")],
        "Invalid label name `{label}`",
    )
    .with_source_code(named(file, src))
}

pub fn form_mismatch(file: &str, src: &str, span: SrcSpan, mnemonic: Mnemonic) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::form",
        help = "the operand count or shape does not fit any encoding of this instruction",
        labels = vec![LabeledSpan::at(span, "bad operands")],
        "Operands do not match any addressing form of {mnemonic}",
    )
    .with_source_code(named(file, src))
}

// Semantic assembly errors

pub fn operand_count(file: &str, src: &str, span: SrcSpan, op: &str, expected: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::operands",
        help = "see `help` output or the instruction reference for operand shapes",
        labels = vec![LabeledSpan::at(span, "wrong operand count")],
        "{op} expects {expected}",
    )
    .with_source_code(named(file, src))
}

pub fn bad_operand(file: &str, src: &str, span: SrcSpan, detail: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::operand",
        help = "operands are registers, decimal or #hex numbers, labels, or =literals",
        labels = vec![LabeledSpan::at(span, "bad operand")],
        "{detail}",
    )
    .with_source_code(named(file, src))
}

pub fn duplicate_label(
    file: &str,
    src: &str,
    span: SrcSpan,
    name: &str,
    original: &SourceLoc,
) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::duplicate_label",
        help = format!("`{name}` was first defined at {original}"),
        labels = vec![LabeledSpan::at(span, "duplicate label")],
        "Label `{name}` defined more than once",
    )
    .with_source_code(named(file, src))
}

pub fn gr0_index(file: &str, src: &str, span: SrcSpan) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::gr0_index",
        help = "GR0 is wired to zero as an index; use GR1..GR7 or drop the index",
        labels = vec![LabeledSpan::at(span, "GR0 used as index")],
        "GR0 cannot be used as an index register",
    )
    .with_source_code(named(file, src))
}

pub fn ld_immediate(file: &str, src: &str, span: SrcSpan) -> Report {
    miette!(
        severity = Severity::Warning,
        code = "asm::ld_immediate",
        help = "LD loads from that address; to load the value itself use LAD",
        labels = vec![LabeledSpan::at(span, "numeric address")],
        "LD with a bare numeric address",
    )
    .with_source_code(named(file, src))
}

pub fn before_start(file: &str, src: &str, span: SrcSpan) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::before_start",
        help = "the first non-empty line of a program must be `LABEL START`",
        labels = vec![LabeledSpan::at(span, "outside a program block")],
        "Instruction before START",
    )
    .with_source_code(named(file, src))
}

pub fn nested_start(file: &str, src: &str, span: SrcSpan) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::nested_start",
        help = "close the current block with END before starting another",
        labels = vec![LabeledSpan::at(span, "START inside a block")],
        "START inside an open program block",
    )
    .with_source_code(named(file, src))
}

pub fn start_label_missing(file: &str, src: &str, span: SrcSpan) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::start_label",
        help = "name the program: `MAIN START`",
        labels = vec![LabeledSpan::at(span, "unlabeled START")],
        "START requires a label",
    )
    .with_source_code(named(file, src))
}

pub fn start_missing(file: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::start_missing",
        help = "a program is a `LABEL START` ... `END` block",
        "{file}: no START block found",
    )
}

pub fn end_missing(file: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::end_missing",
        help = "every START block must be closed with END",
        "{file}: END missing at end of file",
    )
}

pub fn unresolved_label(name: &str, loc: &SourceLoc) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unresolved_label",
        help = "every referenced label must be defined somewhere in the file",
        "{loc}: undefined label `{name}`",
    )
}

pub fn addr_overflow(loc: &SourceLoc) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::addr_overflow",
        help = "the program image ran past address #FFFF",
        "{loc}: address out of range",
    )
}

// Object-file errors

pub fn bad_object_header(path: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::header",
        help = "object files start with `COMET <start-address-hex>`",
        "{path}: missing COMET header",
    )
}
