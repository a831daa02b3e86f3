//! Code emission: per-form instruction encoders, the `DS`/`DC` directives,
//! the `RPUSH`/`RPOP`/`IN`/`OUT` macros, and the literal pool.
//!
//! Emission writes into the assembler [`Image`] at a monotonic cursor. The
//! first word of an instruction packs `(opcode << 8) | (gr << 4) | xr`; the
//! second word of a 2-word form is a [`Payload`] that may stay symbolic
//! until pass 2.

use log::debug;
use miette::{Report, Result};

use crate::error;
use crate::memory::{Image, Origin, Payload, MEMORY_MAX};
use crate::opcode::{encode_opcode, AddrForm, Mnemonic};
use crate::operand::{self, Reg};
use crate::parser::{Operand, RawLine, Stmt};
use crate::symbol::{LabelTable, SourceLoc};

/// A distinct `=`-operand waiting for its pool slot.
struct Literal {
    spelling: String,
    value: u16,
    loc: SourceLoc,
}

/// Owns everything the assembler produces during pass 1: the image, the
/// label table, the literal pool, and any non-fatal warnings.
pub struct Emitter<'a> {
    file: &'a str,
    src: &'a str,
    pub image: Image,
    pub labels: LabelTable,
    literals: Vec<Literal>,
    pub warnings: Vec<Report>,
    current_line: Option<usize>,
}

impl<'a> Emitter<'a> {
    pub fn new(file: &'a str, src: &'a str) -> Self {
        Emitter {
            file,
            src,
            image: Image::new(),
            labels: LabelTable::new(),
            literals: Vec::new(),
            warnings: Vec::new(),
            current_line: None,
        }
    }

    pub fn cursor(&self) -> u16 {
        self.image.cursor()
    }

    fn loc(&self, raw: RawLine) -> SourceLoc {
        SourceLoc {
            file: self.file.to_string(),
            line: raw.num,
        }
    }

    /// Append one word originating from `raw`. The first word of a line is
    /// its listing leader.
    fn word(&mut self, raw: RawLine, payload: Payload) -> Result<()> {
        if self.image.len() >= MEMORY_MAX {
            return Err(error::addr_overflow(&self.loc(raw)));
        }
        let leader = self.current_line != Some(raw.num);
        self.current_line = Some(raw.num);
        self.image.push(
            payload,
            Origin {
                loc: self.loc(raw),
                text: raw.text.to_string(),
                leader,
            },
        );
        Ok(())
    }

    /// Append an encoded instruction: the packed first word, then the
    /// address word for 2-word forms.
    fn instr(
        &mut self,
        raw: RawLine,
        mnemonic: Mnemonic,
        form: AddrForm,
        gr: u16,
        xr: u16,
        adr: Option<Payload>,
    ) -> Result<()> {
        let opcode = encode_opcode(mnemonic, form)
            .expect("mnemonic/form pair is in the opcode table") as u16;
        debug!(
            "emit {:04x}: {} {:?} gr={} xr={}",
            self.cursor(),
            mnemonic,
            form,
            gr,
            xr
        );
        self.word(raw, Payload::Resolved((opcode << 8) | (gr << 4) | xr))?;
        if let Some(adr) = adr {
            self.word(raw, adr)?;
        }
        Ok(())
    }

    fn expect_register(&self, op: &Operand) -> Result<Reg> {
        operand::parse_register(&op.text).ok_or_else(|| {
            error::bad_operand(
                self.file,
                self.src,
                op.span,
                &format!("`{}` is not a register", op.text),
            )
        })
    }

    /// Index register operand; GR0 is wired to zero and rejected.
    fn expect_index(&self, op: &Operand) -> Result<Reg> {
        let reg = self.expect_register(op)?;
        if reg == Reg::Gr0 {
            return Err(error::gr0_index(self.file, self.src, op.span));
        }
        Ok(reg)
    }

    /// Address operand -> payload: a number resolves now, a label or
    /// literal stays pending until pass 2.
    fn address_payload(&mut self, op: &Operand, raw: RawLine) -> Result<Payload> {
        if let Some(value) = operand::parse_number(&op.text) {
            return Ok(Payload::Resolved(value));
        }
        if operand::is_literal(&op.text) {
            self.record_literal(op, raw)?;
            return Ok(Payload::Pending(op.text.clone()));
        }
        if operand::is_label(&op.text) {
            return Ok(Payload::Pending(op.text.clone()));
        }
        Err(error::bad_operand(
            self.file,
            self.src,
            op.span,
            &format!("`{}` is not an address, label, or literal", op.text),
        ))
    }

    fn record_literal(&mut self, op: &Operand, raw: RawLine) -> Result<()> {
        if self.literals.iter().any(|lit| lit.spelling == op.text) {
            return Ok(());
        }
        let value = operand::parse_number(&op.text[1..]).ok_or_else(|| {
            error::bad_operand(
                self.file,
                self.src,
                op.span,
                &format!("`{}` is not a numeric literal", op.text),
            )
        })?;
        self.literals.push(Literal {
            spelling: op.text.clone(),
            value,
            loc: self.loc(raw),
        });
        Ok(())
    }

    /// Emit one machine instruction whose form was already inferred.
    pub fn machine(
        &mut self,
        raw: RawLine,
        stmt: &Stmt,
        mnemonic: Mnemonic,
        form: AddrForm,
    ) -> Result<()> {
        match form {
            AddrForm::Nopr => self.instr(raw, mnemonic, form, 0, 0, None),
            AddrForm::R => {
                let reg = self.expect_register(&stmt.operands[0])?;
                self.instr(raw, mnemonic, form, reg.nibble(), 0, None)
            }
            AddrForm::R1R2 => {
                let r1 = self.expect_register(&stmt.operands[0])?;
                let r2 = self.expect_register(&stmt.operands[1])?;
                self.instr(raw, mnemonic, form, r1.nibble(), r2.nibble(), None)
            }
            AddrForm::AdrX => {
                let xr = match stmt.operands.get(1) {
                    Some(op) => self.expect_index(op)?.nibble(),
                    None => 0,
                };
                let adr = self.address_payload(&stmt.operands[0].clone(), raw)?;
                self.instr(raw, mnemonic, form, 0, xr, Some(adr))
            }
            AddrForm::RAdrX => {
                let reg = self.expect_register(&stmt.operands[0])?;
                let xr = match stmt.operands.get(2) {
                    Some(op) => self.expect_index(op)?.nibble(),
                    None => 0,
                };
                let adr_op = stmt.operands[1].clone();
                // A bare number here usually means LAD was intended
                if mnemonic == Mnemonic::Ld
                    && stmt.operands.len() == 2
                    && !adr_op.text.chars().any(|c| c.is_ascii_alphabetic())
                    && !adr_op.text.starts_with('=')
                {
                    self.warnings
                        .push(error::ld_immediate(self.file, self.src, adr_op.span));
                }
                let adr = self.address_payload(&adr_op, raw)?;
                self.instr(raw, mnemonic, form, reg.nibble(), xr, Some(adr))
            }
        }
    }

    /// `DS n`: reserve `n` zero words.
    pub fn ds(&mut self, raw: RawLine, stmt: &Stmt) -> Result<()> {
        let [op] = stmt.operands.as_slice() else {
            return Err(error::operand_count(
                self.file, self.src, stmt.span, "DS", "one numeric operand",
            ));
        };
        let count = if op.text.starts_with('-') {
            None
        } else {
            operand::parse_number(&op.text)
        }
        .ok_or_else(|| {
            error::bad_operand(
                self.file,
                self.src,
                op.span,
                &format!("`{}` is not a word count", op.text),
            )
        })?;
        for _ in 0..count {
            self.word(raw, Payload::Resolved(0))?;
        }
        Ok(())
    }

    /// `DC v, ...`: quoted strings (one char per word, high byte zero,
    /// `''` escapes to `'`), numbers, or deferred label references.
    pub fn dc(&mut self, raw: RawLine, stmt: &Stmt) -> Result<()> {
        if stmt.operands.is_empty() {
            return Err(error::operand_count(
                self.file, self.src, stmt.span, "DC", "at least one operand",
            ));
        }
        for op in stmt.operands.clone() {
            if op.text.starts_with('\'') {
                for ch in unquote(&op.text).ok_or_else(|| {
                    error::bad_operand(
                        self.file,
                        self.src,
                        op.span,
                        "unterminated string constant",
                    )
                })? {
                    self.word(raw, Payload::Resolved((ch as u32 & 0xFF) as u16))?;
                }
            } else if let Some(value) = operand::parse_number(&op.text) {
                self.word(raw, Payload::Resolved(value))?;
            } else if operand::is_label(&op.text) {
                self.word(raw, Payload::Pending(op.text.clone()))?;
            } else {
                return Err(error::bad_operand(
                    self.file,
                    self.src,
                    op.span,
                    &format!("`{}` is not a constant", op.text),
                ));
            }
        }
        Ok(())
    }

    /// `RPUSH`: push GR1 through GR7.
    pub fn rpush(&mut self, raw: RawLine, stmt: &Stmt) -> Result<()> {
        self.no_operands(stmt, "RPUSH")?;
        for reg in 1..=7u16 {
            self.instr(
                raw,
                Mnemonic::Push,
                AddrForm::AdrX,
                0,
                reg,
                Some(Payload::Resolved(0)),
            )?;
        }
        Ok(())
    }

    /// `RPOP`: pop GR7 through GR1.
    pub fn rpop(&mut self, raw: RawLine, stmt: &Stmt) -> Result<()> {
        self.no_operands(stmt, "RPOP")?;
        for reg in (1..=7u16).rev() {
            self.instr(raw, Mnemonic::Pop, AddrForm::R, reg, 0, None)?;
        }
        Ok(())
    }

    fn no_operands(&self, stmt: &Stmt, name: &str) -> Result<()> {
        if stmt.operands.is_empty() {
            Ok(())
        } else {
            Err(error::operand_count(
                self.file, self.src, stmt.span, name, "no operands",
            ))
        }
    }

    /// `IN buf,len` / `OUT buf,len`: save GR1/GR2 around a supervisor call
    /// with the buffer and length addresses loaded.
    pub fn io_macro(&mut self, raw: RawLine, stmt: &Stmt, svc: u16) -> Result<()> {
        if stmt.operands.len() != 2 {
            return Err(error::operand_count(
                self.file,
                self.src,
                stmt.span,
                if svc == 1 { "IN" } else { "OUT" },
                "a buffer label and a length label",
            ));
        }
        let buf = self.address_payload(&stmt.operands[0].clone(), raw)?;
        let len = self.address_payload(&stmt.operands[1].clone(), raw)?;
        for reg in [1, 2] {
            self.instr(
                raw,
                Mnemonic::Push,
                AddrForm::AdrX,
                0,
                reg,
                Some(Payload::Resolved(0)),
            )?;
        }
        self.instr(raw, Mnemonic::Lad, AddrForm::RAdrX, 1, 0, Some(buf))?;
        self.instr(raw, Mnemonic::Lad, AddrForm::RAdrX, 2, 0, Some(len))?;
        self.instr(
            raw,
            Mnemonic::Svc,
            AddrForm::AdrX,
            0,
            0,
            Some(Payload::Resolved(svc)),
        )?;
        for reg in [2, 1] {
            self.instr(raw, Mnemonic::Pop, AddrForm::R, reg, 0, None)?;
        }
        Ok(())
    }

    /// Allocate the literal pool at the current cursor: one word per
    /// distinct literal, labeled with its spelling.
    pub fn allocate_literals(&mut self) -> Result<()> {
        for lit in std::mem::take(&mut self.literals) {
            if self.image.len() >= MEMORY_MAX {
                return Err(error::addr_overflow(&lit.loc));
            }
            let addr = self.image.cursor();
            debug!("literal {} -> {:04x}", lit.spelling, addr);
            self.labels
                .define(&lit.spelling, addr, lit.loc.clone())
                .expect("literal pool entries are distinct");
            self.image.push(
                Payload::Resolved(lit.value),
                Origin {
                    loc: lit.loc,
                    text: lit.spelling,
                    leader: true,
                },
            );
        }
        Ok(())
    }
}

/// Strip the surrounding quotes of a string constant and resolve `''`
/// escapes. `None` if the constant is not properly terminated.
fn unquote(text: &str) -> Option<Vec<char>> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = Vec::new();
    let mut pending_quote = false;
    for ch in inner.chars() {
        if pending_quote {
            if ch != '\'' {
                return None; // lone quote inside the constant
            }
            chars.push('\'');
            pending_quote = false;
        } else if ch == '\'' {
            pending_quote = true;
        } else {
            chars.push(ch);
        }
    }
    if pending_quote {
        // `''` ran into the closing quote
        return None;
    }
    Some(chars)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::{parse_line, Op};

    fn emit_one(text: &'static str) -> Emitter<'static> {
        let mut emitter = Emitter::new("test.cas", text);
        let raw = RawLine {
            num: 1,
            offset: 0,
            text,
        };
        let stmt = parse_line("test.cas", text, raw).unwrap().unwrap();
        match stmt.op {
            Op::Machine(mnemonic) => {
                let form =
                    crate::parser::infer_form("test.cas", text, &stmt, mnemonic).unwrap();
                emitter.machine(raw, &stmt, mnemonic, form).unwrap();
            }
            Op::Dir(crate::parser::Directive::Ds) => emitter.ds(raw, &stmt).unwrap(),
            Op::Dir(crate::parser::Directive::Dc) => emitter.dc(raw, &stmt).unwrap(),
            Op::Dir(crate::parser::Directive::Rpush) => emitter.rpush(raw, &stmt).unwrap(),
            Op::Dir(crate::parser::Directive::Rpop) => emitter.rpop(raw, &stmt).unwrap(),
            Op::Dir(crate::parser::Directive::In) => emitter.io_macro(raw, &stmt, 1).unwrap(),
            Op::Dir(crate::parser::Directive::Out) => emitter.io_macro(raw, &stmt, 2).unwrap(),
            other => panic!("unexpected op {:?}", other),
        }
        emitter
    }

    fn words(emitter: &Emitter) -> Vec<Payload> {
        emitter.image.iter().map(|w| w.payload.clone()).collect()
    }

    #[test]
    fn encode_nopr() {
        assert_eq!(words(&emit_one("    RET")), vec![Payload::Resolved(0x8100)]);
    }

    #[test]
    fn encode_r() {
        assert_eq!(
            words(&emit_one("    POP GR3")),
            vec![Payload::Resolved(0x7130)]
        );
    }

    #[test]
    fn encode_r1_r2() {
        assert_eq!(
            words(&emit_one("    ADDA GR1, GR2")),
            vec![Payload::Resolved(0x2412)]
        );
    }

    #[test]
    fn encode_adr_x() {
        assert_eq!(
            words(&emit_one("    JUMP #000A, GR2")),
            vec![Payload::Resolved(0x6402), Payload::Resolved(0x000A)]
        );
    }

    #[test]
    fn encode_r_adr_x_with_label() {
        assert_eq!(
            words(&emit_one("    LD GR1, DATA, GR2")),
            vec![
                Payload::Resolved(0x1012),
                Payload::Pending("DATA".to_string())
            ]
        );
    }

    #[test]
    fn gr0_index_rejected() {
        let text = "    LD GR1, DATA, GR0";
        let raw = RawLine {
            num: 1,
            offset: 0,
            text,
        };
        let stmt = parse_line("test.cas", text, raw).unwrap().unwrap();
        let mut emitter = Emitter::new("test.cas", text);
        assert!(emitter
            .machine(raw, &stmt, Mnemonic::Ld, AddrForm::RAdrX)
            .is_err());
    }

    #[test]
    fn ld_immediate_warns() {
        let emitter = emit_one("    LD GR1, 123");
        assert_eq!(emitter.warnings.len(), 1);
        // Still emits
        assert_eq!(emitter.image.len(), 2);
    }

    #[test]
    fn lad_immediate_does_not_warn() {
        let emitter = emit_one("    LAD GR1, 123");
        assert!(emitter.warnings.is_empty());
    }

    #[test]
    fn ds_reserves_zeros() {
        assert_eq!(
            words(&emit_one("BUF DS 3")),
            vec![
                Payload::Resolved(0),
                Payload::Resolved(0),
                Payload::Resolved(0)
            ]
        );
    }

    #[test]
    fn dc_string_chars() {
        assert_eq!(
            words(&emit_one("MSG DC 'ab'")),
            vec![Payload::Resolved(0x61), Payload::Resolved(0x62)]
        );
    }

    #[test]
    fn dc_escaped_quote() {
        assert_eq!(
            words(&emit_one("MSG DC 'a''b'")),
            vec![
                Payload::Resolved(0x61),
                Payload::Resolved(0x27),
                Payload::Resolved(0x62)
            ]
        );
    }

    #[test]
    fn dc_mixed_operands() {
        assert_eq!(
            words(&emit_one("K DC 12, #FFFF, THERE")),
            vec![
                Payload::Resolved(12),
                Payload::Resolved(0xFFFF),
                Payload::Pending("THERE".to_string())
            ]
        );
    }

    #[test]
    fn rpush_expands_to_seven_pushes() {
        let emitter = emit_one("    RPUSH");
        let words = words(&emitter);
        assert_eq!(words.len(), 14);
        // PUSH 0,GR1 first
        assert_eq!(words[0], Payload::Resolved(0x7001));
        assert_eq!(words[1], Payload::Resolved(0x0000));
        // PUSH 0,GR7 last
        assert_eq!(words[12], Payload::Resolved(0x7007));
    }

    #[test]
    fn rpop_expands_in_reverse() {
        let words = words(&emit_one("    RPOP"));
        assert_eq!(words.len(), 7);
        assert_eq!(words[0], Payload::Resolved(0x7170));
        assert_eq!(words[6], Payload::Resolved(0x7110));
    }

    #[test]
    fn in_macro_sequence() {
        let words = words(&emit_one("    IN IBUF, LEN"));
        assert_eq!(
            words,
            vec![
                Payload::Resolved(0x7001), // PUSH 0,GR1
                Payload::Resolved(0x0000),
                Payload::Resolved(0x7002), // PUSH 0,GR2
                Payload::Resolved(0x0000),
                Payload::Resolved(0x1210), // LAD GR1,IBUF
                Payload::Pending("IBUF".to_string()),
                Payload::Resolved(0x1220), // LAD GR2,LEN
                Payload::Pending("LEN".to_string()),
                Payload::Resolved(0xF000), // SVC 1
                Payload::Resolved(0x0001),
                Payload::Resolved(0x7120), // POP GR2
                Payload::Resolved(0x7110), // POP GR1
            ]
        );
    }

    #[test]
    fn literal_pool_allocation() {
        let text = "    LD GR1, =#000A";
        let raw = RawLine {
            num: 1,
            offset: 0,
            text,
        };
        let stmt = parse_line("test.cas", text, raw).unwrap().unwrap();
        let mut emitter = Emitter::new("test.cas", text);
        emitter
            .machine(raw, &stmt, Mnemonic::Ld, AddrForm::RAdrX)
            .unwrap();
        emitter.allocate_literals().unwrap();
        assert_eq!(emitter.image.len(), 3);
        assert_eq!(emitter.labels.lookup("=#000A"), Some(2));
        assert_eq!(
            emitter.image.get(2).unwrap().payload,
            Payload::Resolved(0x000A)
        );
    }

    #[test]
    fn duplicate_literal_allocated_once() {
        let text = "    LD GR1, =5, GR2";
        let raw = RawLine {
            num: 1,
            offset: 0,
            text,
        };
        let mut emitter = Emitter::new("test.cas", text);
        let stmt = parse_line("test.cas", text, raw).unwrap().unwrap();
        emitter
            .machine(raw, &stmt, Mnemonic::Ld, AddrForm::RAdrX)
            .unwrap();
        let raw2 = RawLine {
            num: 2,
            offset: 0,
            text,
        };
        emitter
            .machine(raw2, &stmt, Mnemonic::Ld, AddrForm::RAdrX)
            .unwrap();
        emitter.allocate_literals().unwrap();
        // 2 instructions of 2 words each, 1 pool word
        assert_eq!(emitter.image.len(), 5);
        assert_eq!(emitter.labels.lookup("=5"), Some(4));
    }

    #[test]
    fn unquote_rules() {
        assert_eq!(unquote("'abc'"), Some(vec!['a', 'b', 'c']));
        assert_eq!(unquote("'a''b'"), Some(vec!['a', '\'', 'b']));
        assert_eq!(unquote("''"), Some(vec![]));
        assert_eq!(unquote("'oops"), None);
        assert_eq!(unquote("oops'"), None);
    }
}
