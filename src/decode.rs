//! Single-instruction decoder, shared by the execution engine and the
//! `disasm` debugger command.

use crate::memory::Memory;
use crate::opcode::{decode_opcode, AddrForm, Mnemonic};
use crate::symbol::ReverseTable;

/// What the opcode byte turned out to be.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DecodedOp {
    Instr(Mnemonic, AddrForm),
    /// Unknown opcode: rendered as a constant, refused by the engine.
    Data,
}

/// One decoded word (plus its operand word, which is always read).
#[derive(Clone, Copy, Debug)]
pub struct Decoded {
    pub addr: u16,
    pub word: u16,
    pub adr: u16,
    pub gr: u16,
    pub xr: u16,
    pub op: DecodedOp,
}

impl Decoded {
    pub fn size(&self) -> u16 {
        match self.op {
            DecodedOp::Instr(_, form) => form.size(),
            DecodedOp::Data => 1,
        }
    }

    /// Operand column of the disassembly. The index nibble is omitted when
    /// zero; a known reverse label annotates the address.
    fn operands(&self, labels: Option<&ReverseTable>) -> String {
        let adr = match labels.and_then(|table| table.lookup(self.adr)) {
            Some(label) => format!("#{:04x} {}", self.adr, label),
            None => format!("#{:04x}", self.adr),
        };
        match self.op {
            DecodedOp::Data => format!("#{:04x}", self.word),
            DecodedOp::Instr(_, AddrForm::Nopr) => String::new(),
            DecodedOp::Instr(_, AddrForm::R) => format!("GR{}", self.gr),
            DecodedOp::Instr(_, AddrForm::R1R2) => format!("GR{}, GR{}", self.gr, self.xr),
            DecodedOp::Instr(_, AddrForm::AdrX) => {
                if self.xr == 0 {
                    adr
                } else {
                    format!("{}, GR{}", adr, self.xr)
                }
            }
            DecodedOp::Instr(_, AddrForm::RAdrX) => {
                if self.xr == 0 {
                    format!("GR{}, {}", self.gr, adr)
                } else {
                    format!("GR{}, {}, GR{}", self.gr, adr, self.xr)
                }
            }
        }
    }

    /// Full disassembly text, e.g. `LD GR1, #0005 DATA, GR2`.
    pub fn text(&self, labels: Option<&ReverseTable>) -> String {
        let mnemonic = match self.op {
            DecodedOp::Instr(mnemonic, _) => mnemonic.to_string(),
            DecodedOp::Data => "DC".to_string(),
        };
        let operands = self.operands(labels);
        if operands.is_empty() {
            mnemonic
        } else {
            format!("{} {}", mnemonic, operands)
        }
    }
}

/// Decode the word at `addr`.
pub fn decode(mem: &Memory, addr: u16) -> Decoded {
    let word = mem.read(addr);
    let adr = mem.read(addr.wrapping_add(1));
    Decoded {
        addr,
        word,
        adr,
        gr: (word >> 4) & 0xF,
        xr: word & 0xF,
        op: match decode_opcode((word >> 8) as u8) {
            Some((mnemonic, form)) => DecodedOp::Instr(mnemonic, form),
            None => DecodedOp::Data,
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mem_with(words: &[u16]) -> Memory {
        let mut mem = Memory::new();
        for (i, word) in words.iter().enumerate() {
            mem.write(i as u16, *word);
        }
        mem
    }

    #[test]
    fn decode_fields() {
        let mem = mem_with(&[0x1012, 0x0005]);
        let d = decode(&mem, 0);
        assert_eq!(d.op, DecodedOp::Instr(Mnemonic::Ld, AddrForm::RAdrX));
        assert_eq!(d.gr, 1);
        assert_eq!(d.xr, 2);
        assert_eq!(d.adr, 0x0005);
        assert_eq!(d.size(), 2);
    }

    #[test]
    fn render_forms() {
        let mem = mem_with(&[0x8100, 0x7130, 0x2412, 0x6400, 0x000A, 0x1010, 0x0003]);
        assert_eq!(decode(&mem, 0).text(None), "RET");
        assert_eq!(decode(&mem, 1).text(None), "POP GR3");
        assert_eq!(decode(&mem, 2).text(None), "ADDA GR1, GR2");
        assert_eq!(decode(&mem, 3).text(None), "JUMP #000a");
        assert_eq!(decode(&mem, 5).text(None), "LD GR1, #0003");
    }

    #[test]
    fn index_register_rendered_when_nonzero() {
        let mem = mem_with(&[0x6402, 0x000A]);
        assert_eq!(decode(&mem, 0).text(None), "JUMP #000a, GR2");
    }

    #[test]
    fn unknown_opcode_is_data() {
        let mem = mem_with(&[0xABCD]);
        let d = decode(&mem, 0);
        assert_eq!(d.op, DecodedOp::Data);
        assert_eq!(d.size(), 1);
        assert_eq!(d.text(None), "DC #abcd");
    }

    #[test]
    fn reverse_label_annotates_address() {
        let mut labels = ReverseTable::new();
        labels.insert(0x0003, "DATA");
        let mem = mem_with(&[0x1010, 0x0003]);
        assert_eq!(decode(&mem, 0).text(Some(&labels)), "LD GR1, #0003 DATA");
    }

    #[test]
    fn operand_word_read_at_memory_top() {
        let mut mem = Memory::new();
        mem.write(0xFFFF, 0x6400);
        mem.write(0x0000, 0x1234);
        let d = decode(&mem, 0xFFFF);
        assert_eq!(d.adr, 0x1234);
    }
}
