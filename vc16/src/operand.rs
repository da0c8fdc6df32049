//! Operand codes and the instruction-stream cursor that feeds them.

use core::fmt;

use crate::error::DecodeError;
use crate::memory::{AddressSpace, MEMORY_SIZE};
use crate::registers::Register;

/// Reads successive bytes of the instruction stream.
pub(crate) struct Cursor<'a> {
    memory: &'a [u8; MEMORY_SIZE],
    position: u16,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(memory: &'a [u8; MEMORY_SIZE], position: u16) -> Self {
        Cursor { memory, position }
    }

    pub(crate) fn position(&self) -> u16 {
        self.position
    }

    pub(crate) fn byte(&mut self) -> u8 {
        let byte = self.memory.load(self.position);
        self.position = self.position.wrapping_add(1);
        byte
    }

    pub(crate) fn word(&mut self) -> u16 {
        let low = self.byte();
        let high = self.byte();
        u16::from_le_bytes([low, high])
    }
}

/// A decoded source value: a register or a literal.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Operand {
    Register(Register),
    Word(u16),
}

impl Operand {
    /// Decodes a 4-bit operand code, consuming any immediate bytes it needs.
    pub(crate) fn decode(code: u8, cursor: &mut Cursor<'_>) -> Operand {
        match code & 0b1111 {
            code @ 0..=7 => Operand::Register(Register::ALL[usize::from(code)]),
            code @ 8..=12 => Operand::Word(u16::from(code - 8)),
            13 => Operand::Word(u16::from(cursor.byte())),
            14 => Operand::Word(cursor.word()),
            _ => Operand::Word(0xffff),
        }
    }
}

/// Decodes a field that must name a register.
pub(crate) fn register_field(opcode: u8, code: u8) -> Result<Register, DecodeError> {
    Register::from_code(code & 0b1111)
        .ok_or(DecodeError::InvalidRegister { opcode, code: code & 0b1111 })
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Operand::Register(r) => write!(f, "{}", r),
            Operand::Word(w) if w > 9 => write!(f, "{:#x}", w),
            Operand::Word(w) => write!(f, "{}", w),
        }
    }
}

/// Memory address: an operand plus a constant offset, added with wraparound.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Address {
    pub operand: Operand,
    pub offset: u16,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset == 0 {
            write!(f, "{}", self.operand)
        } else {
            write!(f, "{} + {:#x}", self.operand, self.offset)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::HeapBuffer;
    use crate::Storage;

    fn decode_at(bytes: &[u8], code: u8) -> (Operand, u16) {
        let mut memory = HeapBuffer::<MEMORY_SIZE>::default();
        memory.bytes_mut()[..bytes.len()].copy_from_slice(bytes);
        let mut cursor = Cursor::new(memory.bytes(), 0);
        let operand = Operand::decode(code, &mut cursor);
        (operand, cursor.position())
    }

    #[test]
    fn register_codes() {
        assert_eq!(decode_at(&[], 0), (Operand::Register(Register::A), 0));
        assert_eq!(decode_at(&[], 4), (Operand::Register(Register::I), 0));
        assert_eq!(decode_at(&[], 7), (Operand::Register(Register::S), 0));
    }

    #[test]
    fn small_literals() {
        for code in 8..=12 {
            assert_eq!(decode_at(&[], code), (Operand::Word(u16::from(code) - 8), 0));
        }
        assert_eq!(decode_at(&[], 15), (Operand::Word(0xffff), 0));
    }

    #[test]
    fn immediates_consume_bytes() {
        assert_eq!(decode_at(&[0xfe, 0x12], 13), (Operand::Word(0x00fe), 1));
        assert_eq!(decode_at(&[0xfe, 0x12], 14), (Operand::Word(0x12fe), 2));
    }

    #[test]
    fn register_fields_reject_literals() {
        assert_eq!(register_field(0x80, 3), Ok(Register::D));
        for code in 8..=15 {
            assert_eq!(
                register_field(0x80, code),
                Err(DecodeError::InvalidRegister { opcode: 0x80, code }),
            );
        }
    }
}
