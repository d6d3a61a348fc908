// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bytecode format for the SVM.
//!
//! A program is a flat sequence of variable-length instruction records. Each
//! record starts with one header byte:
//!
//! ```text
//! ┌──────┬──────────────┐
//! │ mode │    opcode    │
//! │ 7..6 │     5..0     │
//! └──────┴──────────────┘
//! ```
//!
//! followed by operand bytes whose count is fully determined by the opcode
//! and the mode bits. There is no length prefix and no file header.
//!
//! Operand encodings:
//! - Register: 1 byte, see [`Register`](crate::register::Register)
//! - Integer literal: 8, 4 or 1 bytes (`i64`, `i32`, `i8`), little-endian,
//!   sign-extended
//! - Float literal: 8 bytes IEEE binary64; 4 bytes *truncated binary64*
//!   (the high half of the bit pattern, low half zero); 1 byte `i8` whole
//!   number. The narrow float forms are not binary32/binary16.
//! - Stack address: one addressing-info byte holding four 2-bit modes
//!   (base `1..0`, index `3..2`, scale `5..4`, displacement `7..6`), then the
//!   four terms in that order, each a register byte or integer literal.

pub mod builder;


/// Mask for the opcode bits of a header byte.
pub const OPCODE_MASK: u8 = 0x3F;

/// Shift of the mode bits in a header byte.
pub const MODE_SHIFT: u32 = 6;

/// Mask for a 2-bit mode field.
const MODE_MASK: u8 = 0x3;

/// Encode a header byte from an opcode and an operand-size mode.
#[inline]
#[must_use]
pub const fn encode_header(opcode: Opcode, mode: OperandMode) -> u8 {
    ((mode as u8) << MODE_SHIFT) | (opcode as u8 & OPCODE_MASK)
}

/// Split a header byte into raw opcode and mode bits.
#[inline]
#[must_use]
pub const fn decode_header(header: u8) -> (u8, OperandMode) {
    (
        header & OPCODE_MASK,
        OperandMode::from_bits(header >> MODE_SHIFT),
    )
}

/// Operand-size mode: register operand, or inline literal of a given width.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandMode {
    /// Operand is a register id byte.
    UseReg = 0,
    /// Full-width literal (8 bytes).
    Full = 1,
    /// Half-width literal (4 bytes).
    Half = 2,
    /// Eighth-width literal (1 byte).
    Eighth = 3,
}

impl OperandMode {
    /// Decode the low two bits of `bits`.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & MODE_MASK {
            0 => Self::UseReg,
            1 => Self::Full,
            2 => Self::Half,
            _ => Self::Eighth,
        }
    }

    /// Number of operand bytes this mode consumes.
    ///
    /// Integer and float literal tables have the same widths; a register
    /// operand is one id byte.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::UseReg | Self::Eighth => 1,
            Self::Full => 8,
            Self::Half => 4,
        }
    }

    /// True for the three literal modes.
    #[must_use]
    pub const fn is_literal(self) -> bool {
        !matches!(self, Self::UseReg)
    }
}

/// Split an addressing-info byte into (base, index, scale, displacement) modes.
#[must_use]
pub const fn decode_address_info(info: u8) -> [OperandMode; 4] {
    [
        OperandMode::from_bits(info),
        OperandMode::from_bits(info >> 2),
        OperandMode::from_bits(info >> 4),
        OperandMode::from_bits(info >> 6),
    ]
}

/// Pack (base, index, scale, displacement) modes into an addressing-info byte.
#[must_use]
pub const fn encode_address_info(modes: [OperandMode; 4]) -> u8 {
    (modes[0] as u8) | ((modes[1] as u8) << 2) | ((modes[2] as u8) << 4) | ((modes[3] as u8) << 6)
}

/// The instruction set. Values are the 6-bit opcode field.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// No operation.
    Nop = 0x00,
    /// `MOV dst, src` - copy into a register.
    Mov = 0x01,
    /// `LDR dst, [addr]` - load 8 stack bytes into a register.
    Ldr = 0x02,
    /// `STR [addr], src` - store 8 bytes; literal is an integer.
    Str = 0x03,
    /// `STRF [addr], src` - store src as a double; literal is a float.
    Strf = 0x04,
    /// `LEA dst, [addr]` - load the resolved address itself.
    Lea = 0x05,
    /// `PUSH src` - push 8 bytes; literal is an integer.
    Push = 0x06,
    /// `PUSHF src` - push src as a double; literal is a float.
    Pushf = 0x07,
    /// `POP dst` - pop 8 bytes into a register.
    Pop = 0x08,
    /// `ADD dst, src`
    Add = 0x10,
    /// `SUB dst, src`
    Sub = 0x11,
    /// `MUL dst, src`
    Mul = 0x12,
    /// `DIV dst, src`
    Div = 0x13,
    /// `MOD dst, src` - truncated remainder.
    Mod = 0x14,
    /// `INC dst`
    Inc = 0x15,
    /// `DEC dst`
    Dec = 0x16,
    /// `NEG dst`
    Neg = 0x17,
    /// `AND dst, src`
    And = 0x18,
    /// `OR dst, src`
    Or = 0x19,
    /// `XOR dst, src`
    Xor = 0x1A,
    /// `SHL dst, src`
    Shl = 0x1B,
    /// `SHR dst, src` - arithmetic shift.
    Shr = 0x1C,
    /// `NOT dst` - bitwise complement.
    Not = 0x1D,
    /// `CMP lhs, src` - set the comparison flags.
    Cmp = 0x20,
    /// `JMPF off` - jump forward.
    Jmpf = 0x21,
    /// `JMPB off` - jump backward.
    Jmpb = 0x22,
    /// `JCF cond, off` - conditional forward jump.
    Jcf = 0x23,
    /// `JCB cond, off` - conditional backward jump.
    Jcb = 0x24,
    /// `PRINTREG reg` - emit a register to the diagnostic sink.
    PrintReg = 0x3F,
}

impl Opcode {
    /// Decode a 6-bit opcode field.
    ///
    /// Returns `None` for values outside the instruction set.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x00 => Self::Nop,
            0x01 => Self::Mov,
            0x02 => Self::Ldr,
            0x03 => Self::Str,
            0x04 => Self::Strf,
            0x05 => Self::Lea,
            0x06 => Self::Push,
            0x07 => Self::Pushf,
            0x08 => Self::Pop,
            0x10 => Self::Add,
            0x11 => Self::Sub,
            0x12 => Self::Mul,
            0x13 => Self::Div,
            0x14 => Self::Mod,
            0x15 => Self::Inc,
            0x16 => Self::Dec,
            0x17 => Self::Neg,
            0x18 => Self::And,
            0x19 => Self::Or,
            0x1A => Self::Xor,
            0x1B => Self::Shl,
            0x1C => Self::Shr,
            0x1D => Self::Not,
            0x20 => Self::Cmp,
            0x21 => Self::Jmpf,
            0x22 => Self::Jmpb,
            0x23 => Self::Jcf,
            0x24 => Self::Jcb,
            0x3F => Self::PrintReg,
            _ => return None,
        })
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Mov => "MOV",
            Self::Ldr => "LDR",
            Self::Str => "STR",
            Self::Strf => "STRF",
            Self::Lea => "LEA",
            Self::Push => "PUSH",
            Self::Pushf => "PUSHF",
            Self::Pop => "POP",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Inc => "INC",
            Self::Dec => "DEC",
            Self::Neg => "NEG",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::Not => "NOT",
            Self::Cmp => "CMP",
            Self::Jmpf => "JMPF",
            Self::Jmpb => "JMPB",
            Self::Jcf => "JCF",
            Self::Jcb => "JCB",
            Self::PrintReg => "PRINTREG",
        }
    }

    /// True if the mode bits select the shape of a `src` operand.
    ///
    /// All other opcodes must be encoded with [`OperandMode::UseReg`].
    #[must_use]
    pub const fn takes_source(self) -> bool {
        !matches!(
            self,
            Self::Nop
                | Self::Ldr
                | Self::Lea
                | Self::Pop
                | Self::Inc
                | Self::Dec
                | Self::Neg
                | Self::Not
                | Self::PrintReg
        )
    }
}

/// Condition code of a conditional jump.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Equal.
    Eq = 0,
    /// Not equal (also true for unordered float comparisons).
    Ne = 1,
    /// Less than.
    Lt = 2,
    /// Less than or equal.
    Le = 3,
    /// Greater than.
    Gt = 4,
    /// Greater than or equal.
    Ge = 5,
}

impl Condition {
    /// Decode a condition byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Eq,
            1 => Self::Ne,
            2 => Self::Lt,
            3 => Self::Le,
            4 => Self::Gt,
            5 => Self::Ge,
            _ => return None,
        })
    }
}

/// Immutable bytecode buffer.
///
/// The VM only ever reads through this view; the bytes are never copied or
/// mutated during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bytecode<'code> {
    bytes: &'code [u8],
}

impl<'code> Bytecode<'code> {
    /// Wrap a finished byte stream.
    #[must_use]
    pub const fn new(bytes: &'code [u8]) -> Self {
        Self { bytes }
    }

    /// Buffer length (`file_size`).
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for an empty buffer, which halts immediately.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &'code [u8] {
        self.bytes
    }

    /// Byte at `offset`, if inside the buffer.
    #[inline]
    #[must_use]
    pub fn get(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }
}

impl<'code> From<&'code [u8]> for Bytecode<'code> {
    fn from(bytes: &'code [u8]) -> Self {
        Self::new(bytes)
    }
}
