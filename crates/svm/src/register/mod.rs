// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Typed register file.
//!
//! Two disjoint banks: six 64-bit signed integer registers and two
//! double-precision registers. Reading across banks converts:
//! integer to float is a widening `as` conversion, float to integer is
//! range-checked and truncates toward zero.
//!
//! `RSP` holds the index of the most recently pushed stack byte, or `-1`
//! for an empty stack. Writes to it are validated against the stack
//! capacity so it never points outside the stack.


use core::fmt;

use crate::error::VmError;
use crate::stack::STACK_SIZE;

/// Number of integer registers.
pub const INT_REG_COUNT: usize = 6;

/// Number of float registers.
pub const FLOAT_REG_COUNT: usize = 2;

/// Distance kept from each end of the `i64` range when converting floats.
///
/// Doubles near `i64::MIN`/`i64::MAX` are spaced 1024-2048 apart and round
/// across the boundary; staying this far inside avoids those artifacts.
pub const CONVERSION_MARGIN: i64 = 100_000;

/// Smallest integer a float may convert to.
pub const MIN_CONVERTIBLE: i64 = i64::MIN + CONVERSION_MARGIN;

/// Largest integer a float may convert to.
pub const MAX_CONVERTIBLE: i64 = i64::MAX - CONVERSION_MARGIN;

/// Value of `RSP` for an empty stack.
pub const EMPTY_STACK: i64 = -1;

/// Register bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    /// 64-bit signed integers.
    Int,
    /// IEEE-754 doubles.
    Float,
}

/// Register identifiers. Values are the operand encoding.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// General purpose integer register.
    R1 = 0,
    /// General purpose integer register.
    R2 = 1,
    /// Accumulator.
    Rax = 2,
    /// Frame base.
    Rbp = 3,
    /// Previous frame base.
    Prbp = 4,
    /// Stack top index.
    Rsp = 5,
    /// Float register.
    Fr1 = 6,
    /// Float register.
    Fr2 = 7,
}

impl Register {
    /// Every register, in encoding order.
    pub const ALL: [Self; INT_REG_COUNT + FLOAT_REG_COUNT] = [
        Self::R1,
        Self::R2,
        Self::Rax,
        Self::Rbp,
        Self::Prbp,
        Self::Rsp,
        Self::Fr1,
        Self::Fr2,
    ];

    /// Decode a register id byte.
    pub const fn from_u8(id: u8) -> Result<Self, VmError> {
        Ok(match id {
            0 => Self::R1,
            1 => Self::R2,
            2 => Self::Rax,
            3 => Self::Rbp,
            4 => Self::Prbp,
            5 => Self::Rsp,
            6 => Self::Fr1,
            7 => Self::Fr2,
            _ => return Err(VmError::InvalidRegister(id)),
        })
    }

    /// Bank this register belongs to.
    #[must_use]
    pub const fn bank(self) -> Bank {
        match self {
            Self::Fr1 | Self::Fr2 => Bank::Float,
            _ => Bank::Int,
        }
    }

    /// Register name as written in assembly.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::Rax => "RAX",
            Self::Rbp => "RBP",
            Self::Prbp => "PRBP",
            Self::Rsp => "RSP",
            Self::Fr1 => "FR1",
            Self::Fr2 => "FR2",
        }
    }

    /// Slot inside the register's bank.
    const fn slot(self) -> usize {
        match self {
            Self::R1 | Self::Fr1 => 0,
            Self::R2 | Self::Fr2 => 1,
            Self::Rax => 2,
            Self::Rbp => 3,
            Self::Prbp => 4,
            Self::Rsp => 5,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A register value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
}

impl Value {
    /// Bank the value naturally lives in.
    #[must_use]
    pub const fn bank(self) -> Bank {
        match self {
            Self::Int(_) => Bank::Int,
            Self::Float(_) => Bank::Float,
        }
    }

    /// Read as an integer, converting floats with [`float_to_int`].
    pub fn as_int(self) -> Result<i64, VmError> {
        match self {
            Self::Int(v) => Ok(v),
            Self::Float(v) => float_to_int(v),
        }
    }

    /// Read as a double, widening integers.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "integer to double widening rounds by definition"
    )]
    pub const fn as_float(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// Convert into `bank`.
    pub fn convert(self, bank: Bank) -> Result<Self, VmError> {
        Ok(match bank {
            Bank::Int => Self::Int(self.as_int()?),
            Bank::Float => Self::Float(self.as_float()),
        })
    }

    /// Little-endian 8-byte stack image of the value in its own bank.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 8] {
        match self {
            Self::Int(v) => v.to_le_bytes(),
            Self::Float(v) => v.to_le_bytes(),
        }
    }

    /// Interpret an 8-byte little-endian stack image as a value of `bank`.
    #[must_use]
    pub const fn from_le_bytes(bank: Bank, bytes: [u8; 8]) -> Self {
        match bank {
            Bank::Int => Self::Int(i64::from_le_bytes(bytes)),
            Bank::Float => Self::Float(f64::from_le_bytes(bytes)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
        }
    }
}

/// Convert a double to an integer.
///
/// Truncates toward zero. NaN, infinities and values outside
/// [`MIN_CONVERTIBLE`]`..=`[`MAX_CONVERTIBLE`] fail with
/// [`VmError::ConversionOverflow`].
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "range is checked before the cast"
)]
pub fn float_to_int(value: f64) -> Result<i64, VmError> {
    // NaN fails `contains`, infinities fall outside the range.
    if !(MIN_CONVERTIBLE as f64..=MAX_CONVERTIBLE as f64).contains(&value) {
        return Err(VmError::ConversionOverflow(value));
    }
    Ok(value as i64)
}

/// The register file.
///
/// Small and `Copy`, so an instruction can stage its writes on a copy and
/// commit them in one assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Registers {
    ints: [i64; INT_REG_COUNT],
    floats: [f64; FLOAT_REG_COUNT],
}

impl Registers {
    /// Fresh register file: everything zero, `RSP` empty.
    #[must_use]
    pub const fn new() -> Self {
        let mut ints = [0; INT_REG_COUNT];
        ints[Register::Rsp.slot()] = EMPTY_STACK;
        Self {
            ints,
            floats: [0.0; FLOAT_REG_COUNT],
        }
    }

    /// Read a register in its own bank.
    #[must_use]
    pub const fn read(&self, reg: Register) -> Value {
        match reg.bank() {
            Bank::Int => Value::Int(self.ints[reg.slot()]),
            Bank::Float => Value::Float(self.floats[reg.slot()]),
        }
    }

    /// Read a register in integer context.
    pub fn read_int(&self, reg: Register) -> Result<i64, VmError> {
        self.read(reg).as_int()
    }

    /// Read a register in float context.
    #[must_use]
    pub const fn read_float(&self, reg: Register) -> f64 {
        self.read(reg).as_float()
    }

    /// Current `RSP`.
    #[must_use]
    pub const fn rsp(&self) -> i64 {
        self.ints[Register::Rsp.slot()]
    }

    /// Write a value, converting it into the register's bank.
    ///
    /// Nothing is written if the conversion fails or the value is not a
    /// valid stack pointer for `RSP`.
    pub fn write(&mut self, reg: Register, value: Value) -> Result<(), VmError> {
        match value.convert(reg.bank())? {
            Value::Int(v) => {
                if reg == Register::Rsp {
                    check_stack_pointer(v)?;
                }
                self.ints[reg.slot()] = v;
            }
            Value::Float(v) => self.floats[reg.slot()] = v,
        }
        Ok(())
    }

    /// Set `RSP`.
    pub fn set_rsp(&mut self, top: i64) -> Result<(), VmError> {
        self.write(Register::Rsp, Value::Int(top))
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept only `-1` or an index inside the stack.
pub(crate) fn check_stack_pointer(top: i64) -> Result<(), VmError> {
    if (EMPTY_STACK..STACK_SIZE as i64).contains(&top) {
        Ok(())
    } else {
        Err(VmError::InvalidStackPointer(top))
    }
}
