//! The COMET instruction set: mnemonics, addressing forms, and the opcode
//! byte mapping in both directions.
//!
//! The opcode byte alone determines the (mnemonic, addressing form) pair, so
//! both lookups are total `match` tables and the compiler proves every
//! opcode is handled.

use std::fmt;

/// The five addressing encodings of the architecture.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AddrForm {
    /// One word, both operand nibbles zero.
    Nopr,
    /// One word, register nibble + zero nibble.
    R,
    /// One word, two register nibbles.
    R1R2,
    /// Two words, zero nibble + index nibble; second word is the address.
    AdrX,
    /// Two words, register nibble + index nibble; second word is the address.
    RAdrX,
}

impl AddrForm {
    /// Instruction size in words.
    pub fn size(self) -> u16 {
        match self {
            AddrForm::Nopr | AddrForm::R | AddrForm::R1R2 => 1,
            AddrForm::AdrX | AddrForm::RAdrX => 2,
        }
    }
}

/// Machine mnemonics. Assembler-only directives and macros live in
/// [`Directive`](crate::parser::Directive).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mnemonic {
    Nop,
    Ld,
    St,
    Lad,
    Adda,
    Suba,
    Addl,
    Subl,
    And,
    Or,
    Xor,
    Cpa,
    Cpl,
    Sla,
    Sra,
    Sll,
    Srl,
    Jmi,
    Jnz,
    Jze,
    Jump,
    Jpl,
    Jov,
    Push,
    Pop,
    Call,
    Ret,
    Svc,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mnemonic::Nop => "NOP",
            Mnemonic::Ld => "LD",
            Mnemonic::St => "ST",
            Mnemonic::Lad => "LAD",
            Mnemonic::Adda => "ADDA",
            Mnemonic::Suba => "SUBA",
            Mnemonic::Addl => "ADDL",
            Mnemonic::Subl => "SUBL",
            Mnemonic::And => "AND",
            Mnemonic::Or => "OR",
            Mnemonic::Xor => "XOR",
            Mnemonic::Cpa => "CPA",
            Mnemonic::Cpl => "CPL",
            Mnemonic::Sla => "SLA",
            Mnemonic::Sra => "SRA",
            Mnemonic::Sll => "SLL",
            Mnemonic::Srl => "SRL",
            Mnemonic::Jmi => "JMI",
            Mnemonic::Jnz => "JNZ",
            Mnemonic::Jze => "JZE",
            Mnemonic::Jump => "JUMP",
            Mnemonic::Jpl => "JPL",
            Mnemonic::Jov => "JOV",
            Mnemonic::Push => "PUSH",
            Mnemonic::Pop => "POP",
            Mnemonic::Call => "CALL",
            Mnemonic::Ret => "RET",
            Mnemonic::Svc => "SVC",
        };
        f.write_str(name)
    }
}

impl Mnemonic {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "NOP" => Mnemonic::Nop,
            "LD" => Mnemonic::Ld,
            "ST" => Mnemonic::St,
            "LAD" => Mnemonic::Lad,
            "ADDA" => Mnemonic::Adda,
            "SUBA" => Mnemonic::Suba,
            "ADDL" => Mnemonic::Addl,
            "SUBL" => Mnemonic::Subl,
            "AND" => Mnemonic::And,
            "OR" => Mnemonic::Or,
            "XOR" => Mnemonic::Xor,
            "CPA" => Mnemonic::Cpa,
            "CPL" => Mnemonic::Cpl,
            "SLA" => Mnemonic::Sla,
            "SRA" => Mnemonic::Sra,
            "SLL" => Mnemonic::Sll,
            "SRL" => Mnemonic::Srl,
            "JMI" => Mnemonic::Jmi,
            "JNZ" => Mnemonic::Jnz,
            "JZE" => Mnemonic::Jze,
            "JUMP" => Mnemonic::Jump,
            "JPL" => Mnemonic::Jpl,
            "JOV" => Mnemonic::Jov,
            "PUSH" => Mnemonic::Push,
            "POP" => Mnemonic::Pop,
            "CALL" => Mnemonic::Call,
            "RET" => Mnemonic::Ret,
            "SVC" => Mnemonic::Svc,
            _ => return None,
        })
    }

    /// Addressing forms this mnemonic can encode to, used by the parser to
    /// intersect against the forms inferred from operand shape.
    pub fn forms(self) -> &'static [AddrForm] {
        match self {
            Mnemonic::Nop | Mnemonic::Ret => &[AddrForm::Nopr],
            Mnemonic::Pop => &[AddrForm::R],
            Mnemonic::St
            | Mnemonic::Lad
            | Mnemonic::Sla
            | Mnemonic::Sra
            | Mnemonic::Sll
            | Mnemonic::Srl => &[AddrForm::RAdrX],
            Mnemonic::Ld
            | Mnemonic::Adda
            | Mnemonic::Suba
            | Mnemonic::Addl
            | Mnemonic::Subl
            | Mnemonic::And
            | Mnemonic::Or
            | Mnemonic::Xor
            | Mnemonic::Cpa
            | Mnemonic::Cpl => &[AddrForm::RAdrX, AddrForm::R1R2],
            Mnemonic::Jmi
            | Mnemonic::Jnz
            | Mnemonic::Jze
            | Mnemonic::Jump
            | Mnemonic::Jpl
            | Mnemonic::Jov
            | Mnemonic::Push
            | Mnemonic::Call
            | Mnemonic::Svc => &[AddrForm::AdrX],
        }
    }
}

/// Decode an opcode byte. `None` means the word is data as far as the
/// instruction set is concerned.
pub fn decode_opcode(opcode: u8) -> Option<(Mnemonic, AddrForm)> {
    Some(match opcode {
        0x00 => (Mnemonic::Nop, AddrForm::Nopr),
        0x10 => (Mnemonic::Ld, AddrForm::RAdrX),
        0x11 => (Mnemonic::St, AddrForm::RAdrX),
        0x12 => (Mnemonic::Lad, AddrForm::RAdrX),
        0x14 => (Mnemonic::Ld, AddrForm::R1R2),
        0x20 => (Mnemonic::Adda, AddrForm::RAdrX),
        0x21 => (Mnemonic::Suba, AddrForm::RAdrX),
        0x22 => (Mnemonic::Addl, AddrForm::RAdrX),
        0x23 => (Mnemonic::Subl, AddrForm::RAdrX),
        0x24 => (Mnemonic::Adda, AddrForm::R1R2),
        0x25 => (Mnemonic::Suba, AddrForm::R1R2),
        0x26 => (Mnemonic::Addl, AddrForm::R1R2),
        0x27 => (Mnemonic::Subl, AddrForm::R1R2),
        0x30 => (Mnemonic::And, AddrForm::RAdrX),
        0x31 => (Mnemonic::Or, AddrForm::RAdrX),
        0x32 => (Mnemonic::Xor, AddrForm::RAdrX),
        0x34 => (Mnemonic::And, AddrForm::R1R2),
        0x35 => (Mnemonic::Or, AddrForm::R1R2),
        0x36 => (Mnemonic::Xor, AddrForm::R1R2),
        0x40 => (Mnemonic::Cpa, AddrForm::RAdrX),
        0x41 => (Mnemonic::Cpl, AddrForm::RAdrX),
        0x44 => (Mnemonic::Cpa, AddrForm::R1R2),
        0x45 => (Mnemonic::Cpl, AddrForm::R1R2),
        0x50 => (Mnemonic::Sla, AddrForm::RAdrX),
        0x51 => (Mnemonic::Sra, AddrForm::RAdrX),
        0x52 => (Mnemonic::Sll, AddrForm::RAdrX),
        0x53 => (Mnemonic::Srl, AddrForm::RAdrX),
        0x61 => (Mnemonic::Jmi, AddrForm::AdrX),
        0x62 => (Mnemonic::Jnz, AddrForm::AdrX),
        0x63 => (Mnemonic::Jze, AddrForm::AdrX),
        0x64 => (Mnemonic::Jump, AddrForm::AdrX),
        0x65 => (Mnemonic::Jpl, AddrForm::AdrX),
        0x66 => (Mnemonic::Jov, AddrForm::AdrX),
        0x70 => (Mnemonic::Push, AddrForm::AdrX),
        0x71 => (Mnemonic::Pop, AddrForm::R),
        0x80 => (Mnemonic::Call, AddrForm::AdrX),
        0x81 => (Mnemonic::Ret, AddrForm::Nopr),
        0xF0 => (Mnemonic::Svc, AddrForm::AdrX),
        _ => return None,
    })
}

/// Opcode byte for a (mnemonic, form) pair the emitter settled on.
///
/// `None` only for pairs the parser can never produce.
pub fn encode_opcode(mnemonic: Mnemonic, form: AddrForm) -> Option<u8> {
    Some(match (mnemonic, form) {
        (Mnemonic::Nop, AddrForm::Nopr) => 0x00,
        (Mnemonic::Ld, AddrForm::RAdrX) => 0x10,
        (Mnemonic::St, AddrForm::RAdrX) => 0x11,
        (Mnemonic::Lad, AddrForm::RAdrX) => 0x12,
        (Mnemonic::Ld, AddrForm::R1R2) => 0x14,
        (Mnemonic::Adda, AddrForm::RAdrX) => 0x20,
        (Mnemonic::Suba, AddrForm::RAdrX) => 0x21,
        (Mnemonic::Addl, AddrForm::RAdrX) => 0x22,
        (Mnemonic::Subl, AddrForm::RAdrX) => 0x23,
        (Mnemonic::Adda, AddrForm::R1R2) => 0x24,
        (Mnemonic::Suba, AddrForm::R1R2) => 0x25,
        (Mnemonic::Addl, AddrForm::R1R2) => 0x26,
        (Mnemonic::Subl, AddrForm::R1R2) => 0x27,
        (Mnemonic::And, AddrForm::RAdrX) => 0x30,
        (Mnemonic::Or, AddrForm::RAdrX) => 0x31,
        (Mnemonic::Xor, AddrForm::RAdrX) => 0x32,
        (Mnemonic::And, AddrForm::R1R2) => 0x34,
        (Mnemonic::Or, AddrForm::R1R2) => 0x35,
        (Mnemonic::Xor, AddrForm::R1R2) => 0x36,
        (Mnemonic::Cpa, AddrForm::RAdrX) => 0x40,
        (Mnemonic::Cpl, AddrForm::RAdrX) => 0x41,
        (Mnemonic::Cpa, AddrForm::R1R2) => 0x44,
        (Mnemonic::Cpl, AddrForm::R1R2) => 0x45,
        (Mnemonic::Sla, AddrForm::RAdrX) => 0x50,
        (Mnemonic::Sra, AddrForm::RAdrX) => 0x51,
        (Mnemonic::Sll, AddrForm::RAdrX) => 0x52,
        (Mnemonic::Srl, AddrForm::RAdrX) => 0x53,
        (Mnemonic::Jmi, AddrForm::AdrX) => 0x61,
        (Mnemonic::Jnz, AddrForm::AdrX) => 0x62,
        (Mnemonic::Jze, AddrForm::AdrX) => 0x63,
        (Mnemonic::Jump, AddrForm::AdrX) => 0x64,
        (Mnemonic::Jpl, AddrForm::AdrX) => 0x65,
        (Mnemonic::Jov, AddrForm::AdrX) => 0x66,
        (Mnemonic::Push, AddrForm::AdrX) => 0x70,
        (Mnemonic::Pop, AddrForm::R) => 0x71,
        (Mnemonic::Call, AddrForm::AdrX) => 0x80,
        (Mnemonic::Ret, AddrForm::Nopr) => 0x81,
        (Mnemonic::Svc, AddrForm::AdrX) => 0xF0,
        _ => return None,
    })
}
