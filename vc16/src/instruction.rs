//! Instruction set: decoding from memory and disassembly.

use core::fmt;

use crate::disk::DriveId;
use crate::error::DecodeError;
use crate::memory::MEMORY_SIZE;
use crate::operand::{register_field, Address, Cursor, Operand};
use crate::registers::Register;

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Instruction {
    Nop,
    Ret,
    Wait,
    Poll,
    Halt,
    Not(Register),
    Neg(Register),
    Pop(Register),
    Push(Operand),
    Jmp(Operand),
    Call(Operand),
    Mov(Register, Operand),
    Add(Register, Operand),
    Sub(Register, Operand),
    Xor(Register, Operand),
    And(Register, Operand),
    Or(Register, Operand),
    Shl(Register, Operand),
    Shr(Register, Operand),
    Cmp(Register, Operand),
    Load(Register, Address),
    Loadw(Register, Address),
    Store(Operand, Address),
    Storew(Operand, Address),
    Jez(Register, Operand),
    Jnz(Register, Operand),
    Jl(Register, Operand),
    Jg(Register, Operand),
    Jle(Register, Operand),
    Jge(Register, Operand),
    Read(DriveId, Operand, Operand),
    Write(DriveId, Operand, Operand),
}

/// A successfully decoded instruction and the address right after it.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Decoded {
    pub instruction: Instruction,
    pub next: u16,
}

type RegisterOp = fn(Register, Operand) -> Instruction;

// indexed by opcode - 0x80
const ARITHMETIC: [RegisterOp; 9] = [
    Instruction::Mov,
    Instruction::Add,
    Instruction::Sub,
    Instruction::Xor,
    Instruction::And,
    Instruction::Or,
    Instruction::Shl,
    Instruction::Shr,
    Instruction::Cmp,
];

// indexed by opcode - 0xa0
const JUMPS: [RegisterOp; 6] = [
    Instruction::Jez,
    Instruction::Jnz,
    Instruction::Jl,
    Instruction::Jg,
    Instruction::Jle,
    Instruction::Jge,
];

/// Decodes the instruction starting at `address`.
///
/// Nothing is executed; a failed decode leaves no trace besides the error.
pub fn decode(memory: &[u8; MEMORY_SIZE], address: u16) -> Result<Decoded, DecodeError> {
    let mut cursor = Cursor::new(memory, address);
    let opcode = cursor.byte();
    let instruction = match opcode {
        0x00 => Instruction::Nop,
        0x01 => Instruction::Ret,
        0x02 => Instruction::Wait,
        0x03 => Instruction::Poll,
        0x04 => Instruction::Halt,
        0x10..=0x1f => Instruction::Not(register_field(opcode, opcode)?),
        0x20..=0x2f => Instruction::Neg(register_field(opcode, opcode)?),
        0x30..=0x3f => Instruction::Pop(register_field(opcode, opcode)?),
        0x40..=0x4f => Instruction::Push(Operand::decode(opcode, &mut cursor)),
        0x50..=0x5f => Instruction::Jmp(Operand::decode(opcode, &mut cursor)),
        0x60..=0x6f => Instruction::Call(Operand::decode(opcode, &mut cursor)),
        0x80..=0x88 => {
            let (reg, operand) = register_and_operand(opcode, &mut cursor)?;
            ARITHMETIC[usize::from(opcode - 0x80)](reg, operand)
        }
        0x90..=0x9f if opcode & 0b11 != 0b11 => decode_memory_access(opcode, &mut cursor)?,
        0xa0..=0xa5 => {
            let (reg, operand) = register_and_operand(opcode, &mut cursor)?;
            JUMPS[usize::from(opcode - 0xa0)](reg, operand)
        }
        0xf0 | 0xf1 | 0xf8 | 0xf9 => {
            let drive = if opcode & 1 == 0 { DriveId::D0 } else { DriveId::D1 };
            let fields = cursor.byte();
            let memory_address = Operand::decode(fields >> 4, &mut cursor);
            let sector = Operand::decode(fields, &mut cursor);
            if opcode & 0b1000 == 0 {
                Instruction::Read(drive, memory_address, sector)
            } else {
                Instruction::Write(drive, memory_address, sector)
            }
        }
        _ => return Err(DecodeError::InvalidOpcode(opcode)),
    };
    Ok(Decoded {
        instruction,
        next: cursor.position(),
    })
}

fn register_and_operand(opcode: u8, cursor: &mut Cursor<'_>) -> Result<(Register, Operand), DecodeError> {
    let fields = cursor.byte();
    let reg = register_field(opcode, fields >> 4)?;
    let operand = Operand::decode(fields, cursor);
    Ok((reg, operand))
}

/// `load`, `loadw`, `store` and `storew` in their three offset widths.
///
/// Byte order: opcode, fields, offset (none, byte or word), then the
/// immediates of the high and low field.
fn decode_memory_access(opcode: u8, cursor: &mut Cursor<'_>) -> Result<Instruction, DecodeError> {
    let fields = cursor.byte();
    let offset = match opcode & 0b11 {
        1 => u16::from(cursor.byte()),
        2 => cursor.word(),
        _ => 0,
    };
    let instruction = match (opcode >> 2) & 0b11 {
        0b00 | 0b01 => {
            let reg = register_field(opcode, fields >> 4)?;
            let operand = Operand::decode(fields, cursor);
            let address = Address { operand, offset };
            if opcode & 0b100 == 0 {
                Instruction::Load(reg, address)
            } else {
                Instruction::Loadw(reg, address)
            }
        }
        _ => {
            let value = Operand::decode(fields >> 4, cursor);
            let operand = Operand::decode(fields, cursor);
            let address = Address { operand, offset };
            if opcode & 0b100 == 0 {
                Instruction::Store(value, address)
            } else {
                Instruction::Storew(value, address)
            }
        }
    };
    Ok(instruction)
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Nop => write!(f, "nop"),
            Instruction::Ret => write!(f, "ret"),
            Instruction::Wait => write!(f, "wait"),
            Instruction::Poll => write!(f, "poll"),
            Instruction::Halt => write!(f, "halt"),
            Instruction::Not(a) => write!(f, "not {}", a),
            Instruction::Neg(a) => write!(f, "neg {}", a),
            Instruction::Pop(a) => write!(f, "pop {}", a),
            Instruction::Push(a) => write!(f, "push {}", a),
            Instruction::Jmp(a) => write!(f, "jmp {}", a),
            Instruction::Call(a) => write!(f, "call {}", a),
            Instruction::Mov(a, b) => write!(f, "mov {}, {}", a, b),
            Instruction::Add(a, b) => write!(f, "add {}, {}", a, b),
            Instruction::Sub(a, b) => write!(f, "sub {}, {}", a, b),
            Instruction::Xor(a, b) => write!(f, "xor {}, {}", a, b),
            Instruction::And(a, b) => write!(f, "and {}, {}", a, b),
            Instruction::Or(a, b) => write!(f, "or {}, {}", a, b),
            Instruction::Shl(a, b) => write!(f, "shl {}, {}", a, b),
            Instruction::Shr(a, b) => write!(f, "shr {}, {}", a, b),
            Instruction::Cmp(a, b) => write!(f, "cmp {}, {}", a, b),
            Instruction::Load(a, b) => write!(f, "load {}, [{}]", a, b),
            Instruction::Loadw(a, b) => write!(f, "loadw {}, [{}]", a, b),
            Instruction::Store(a, b) => write!(f, "store {}, [{}]", a, b),
            Instruction::Storew(a, b) => write!(f, "storew {}, [{}]", a, b),
            Instruction::Jez(x, d) => write!(f, "jez {}, {}", x, d),
            Instruction::Jnz(x, d) => write!(f, "jnz {}, {}", x, d),
            Instruction::Jl(x, d) => write!(f, "jl {}, {}", x, d),
            Instruction::Jg(x, d) => write!(f, "jg {}, {}", x, d),
            Instruction::Jle(x, d) => write!(f, "jle {}, {}", x, d),
            Instruction::Jge(x, d) => write!(f, "jge {}, {}", x, d),
            Instruction::Read(drive, a, b) => write!(f, "read{} {}, {}", drive.index(), a, b),
            Instruction::Write(drive, a, b) => write!(f, "write{} {}, {}", drive.index(), a, b),
        }
    }
}
