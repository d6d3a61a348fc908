// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Operand resolver.
//!
//! Decodes the operands that follow an instruction header: register ids,
//! literals whose width comes from the operand-size mode, and stack-address
//! expressions. Decoding only reads bytecode; values are resolved against
//! the register file in a separate step so an instruction can decode all of
//! its operands before touching any state.


use crate::bytecode::{Bytecode, OperandMode, decode_address_info};
use crate::error::VmError;
use crate::register::{Bank, Register, Registers, Value};
use crate::stack::STACK_SIZE;

/// A decoded `src` operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    /// Read from a register.
    Reg(Register),
    /// Inline literal.
    Literal(Value),
}

impl Source {
    /// Current value. Registers are read in their own bank.
    #[must_use]
    pub const fn value(self, regs: &Registers) -> Value {
        match self {
            Self::Reg(reg) => regs.read(reg),
            Self::Literal(value) => value,
        }
    }
}

/// One term of a stack-address expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    /// Integer context read of a register.
    Reg(Register),
    /// Inline integer literal.
    Lit(i64),
}

impl Term {
    fn resolve(self, regs: &Registers) -> Result<i64, VmError> {
        match self {
            Self::Reg(reg) => regs.read_int(reg),
            Self::Lit(value) => Ok(value),
        }
    }
}

impl From<Register> for Term {
    fn from(reg: Register) -> Self {
        Self::Reg(reg)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Self::Lit(value)
    }
}

/// Stack-address expression: `base + index * scale + displacement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    /// Base term.
    pub base: Term,
    /// Index term.
    pub index: Term,
    /// Scale term.
    pub scale: Term,
    /// Displacement term.
    pub displacement: Term,
}

impl Address {
    /// Build an expression from its four terms.
    #[must_use]
    pub fn new(
        base: impl Into<Term>,
        index: impl Into<Term>,
        scale: impl Into<Term>,
        displacement: impl Into<Term>,
    ) -> Self {
        Self {
            base: base.into(),
            index: index.into(),
            scale: scale.into(),
            displacement: displacement.into(),
        }
    }

    /// Fixed stack address.
    #[must_use]
    pub const fn absolute(address: i64) -> Self {
        Self {
            base: Term::Lit(address),
            index: Term::Lit(0),
            scale: Term::Lit(0),
            displacement: Term::Lit(0),
        }
    }

    /// `reg + displacement`.
    #[must_use]
    pub const fn offset(reg: Register, displacement: i64) -> Self {
        Self {
            base: Term::Reg(reg),
            index: Term::Lit(0),
            scale: Term::Lit(0),
            displacement: Term::Lit(displacement),
        }
    }

    /// Terms in encoding order.
    #[must_use]
    pub const fn terms(&self) -> [Term; 4] {
        [self.base, self.index, self.scale, self.displacement]
    }

    /// Compute the address and check it lies inside the stack.
    ///
    /// Arithmetic is checked; an overflow reports the wrapped result as
    /// [`VmError::InvalidAddress`].
    pub fn resolve(&self, regs: &Registers) -> Result<i64, VmError> {
        let base = self.base.resolve(regs)?;
        let index = self.index.resolve(regs)?;
        let scale = self.scale.resolve(regs)?;
        let displacement = self.displacement.resolve(regs)?;

        let address = index
            .checked_mul(scale)
            .and_then(|scaled| base.checked_add(scaled))
            .and_then(|sum| sum.checked_add(displacement))
            .ok_or_else(|| {
                VmError::InvalidAddress(
                    base.wrapping_add(index.wrapping_mul(scale))
                        .wrapping_add(displacement),
                )
            })?;

        if (0..STACK_SIZE as i64).contains(&address) {
            Ok(address)
        } else {
            Err(VmError::InvalidAddress(address))
        }
    }
}

/// Cursor over the operand bytes of one instruction.
///
/// Starts just past the header byte at `ip` and never reads beyond the end
/// of the buffer.
#[derive(Debug, Clone)]
pub struct Operands<'code> {
    code: &'code [u8],
    start: usize,
    cursor: usize,
}

impl<'code> Operands<'code> {
    /// Cursor for the instruction whose header is at `ip`.
    #[must_use]
    pub const fn new(code: Bytecode<'code>, ip: usize) -> Self {
        Self {
            code: code.as_bytes(),
            start: ip,
            cursor: ip.saturating_add(1),
        }
    }

    /// Bytes consumed so far, header included.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.cursor - self.start
    }

    fn take(&mut self, count: usize) -> Result<&'code [u8], VmError> {
        let available = self.code.len().saturating_sub(self.cursor);
        if count > available {
            return Err(VmError::TruncatedOperand {
                expected: count,
                available,
            });
        }
        let bytes = &self.code[self.cursor..self.cursor + count];
        self.cursor += count;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], VmError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// One raw byte.
    pub fn byte(&mut self) -> Result<u8, VmError> {
        let [b] = self.take_array()?;
        Ok(b)
    }

    /// A register id byte.
    pub fn register(&mut self) -> Result<Register, VmError> {
        Register::from_u8(self.byte()?)
    }

    /// A `src` operand: register for [`OperandMode::UseReg`], otherwise a
    /// literal from the integer or float table of `bank`.
    pub fn source(&mut self, mode: OperandMode, bank: Bank) -> Result<Source, VmError> {
        Ok(match (mode, bank) {
            (OperandMode::UseReg, _) => Source::Reg(self.register()?),
            (_, Bank::Int) => Source::Literal(Value::Int(self.int_literal(mode)?)),
            (_, Bank::Float) => Source::Literal(Value::Float(self.float_literal(mode)?)),
        })
    }

    /// Addressing-info byte followed by base, index, scale, displacement.
    pub fn address(&mut self) -> Result<Address, VmError> {
        let [base, index, scale, displacement] = decode_address_info(self.byte()?);
        Ok(Address {
            base: self.term(base)?,
            index: self.term(index)?,
            scale: self.term(scale)?,
            displacement: self.term(displacement)?,
        })
    }

    fn term(&mut self, mode: OperandMode) -> Result<Term, VmError> {
        Ok(match mode {
            OperandMode::UseReg => Term::Reg(self.register()?),
            _ => Term::Lit(self.int_literal(mode)?),
        })
    }

    /// Sign-extended `i64`/`i32`/`i8` literal. Called with literal modes only.
    fn int_literal(&mut self, mode: OperandMode) -> Result<i64, VmError> {
        Ok(match mode {
            OperandMode::Full => i64::from_le_bytes(self.take_array()?),
            OperandMode::Half => i64::from(i32::from_le_bytes(self.take_array()?)),
            OperandMode::Eighth | OperandMode::UseReg => {
                i64::from(i8::from_le_bytes(self.take_array()?))
            }
        })
    }

    /// Float literal. Called with literal modes only.
    ///
    /// - `Full`: IEEE binary64
    /// - `Half`: high 32 bits of a binary64, low 32 bits zero
    /// - `Eighth`: `i8` whole number
    fn float_literal(&mut self, mode: OperandMode) -> Result<f64, VmError> {
        Ok(match mode {
            OperandMode::Full => f64::from_le_bytes(self.take_array()?),
            OperandMode::Half => {
                f64::from_bits(u64::from(u32::from_le_bytes(self.take_array()?)) << 32)
            }
            OperandMode::Eighth | OperandMode::UseReg => {
                f64::from(i8::from_le_bytes(self.take_array()?))
            }
        })
    }
}
