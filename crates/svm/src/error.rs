// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Execution errors and fault reports.
//!
//! Every [`VmError`] is fatal: the dispatch loop stops, records a [`Fault`]
//! and never resumes. A fault carries the instruction pointer and header byte
//! of the failing instruction, which is enough to reproduce it from the same
//! bytecode buffer.

use core::fmt;

use crate::bytecode::{OPCODE_MASK, MODE_SHIFT};
use crate::register::Register;

/// Why a jump target was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTargetError {
    /// Offset of zero.
    ZeroOffset,
    /// Negative offset; direction is fixed by the opcode.
    NegativeOffset,
    /// Forward target lands inside the jump instruction's own operand bytes.
    IntoOwnOperands,
    /// Target is not strictly inside the bytecode buffer.
    OutOfBounds,
    /// Instruction pointer arithmetic overflowed or underflowed.
    Overflow,
}

impl fmt::Display for JumpTargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroOffset => write!(f, "zero offset"),
            Self::NegativeOffset => write!(f, "negative offset"),
            Self::IntoOwnOperands => write!(f, "target inside the jump's own operands"),
            Self::OutOfBounds => write!(f, "target outside the bytecode"),
            Self::Overflow => write!(f, "instruction pointer overflow"),
        }
    }
}

/// Error raised while decoding or executing an instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VmError {
    /// The buffer ended before an operand's required bytes.
    TruncatedOperand {
        /// Bytes the operand needs.
        expected: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
    /// Register byte outside the register enumeration.
    InvalidRegister(u8),
    /// Stack address outside `[0, STACK_SIZE)`, or address arithmetic overflow.
    InvalidAddress(i64),
    /// Push would exceed the stack capacity.
    StackOverflow {
        /// Bytes requested.
        requested: usize,
        /// Bytes still free.
        free: usize,
    },
    /// Pop or peek on a stack holding too few bytes.
    StackUnderflow {
        /// Bytes requested.
        requested: usize,
        /// Bytes currently on the stack.
        used: usize,
    },
    /// Float to integer conversion of NaN, infinity or an out-of-range value.
    ConversionOverflow(f64),
    /// Division or remainder by zero.
    DivideByZero,
    /// Signed integer overflow in an arithmetic instruction.
    ArithmeticOverflow,
    /// Shift amount outside `0..=63`.
    InvalidShift(i64),
    /// Bitwise instruction applied to a float register.
    IntegerRequired(Register),
    /// Jump offset rejected before touching the instruction pointer.
    InvalidJumpTarget {
        /// Offset operand as decoded.
        offset: i64,
        /// What was wrong with it.
        reason: JumpTargetError,
    },
    /// Condition byte outside the condition enumeration.
    InvalidCondition(u8),
    /// Conditional jump executed before any `CMP`.
    MissingComparison,
    /// Literal operand mode on an instruction that takes no literal.
    InvalidOperandMode(u8),
    /// Write of `RSP` outside `[-1, STACK_SIZE - 1]`.
    InvalidStackPointer(i64),
    /// Opcode not in the instruction set.
    UnknownOpcode(u8),
    /// `ip` points past the end of the bytecode.
    IpOutOfBounds(usize),
    /// The diagnostic sink failed to accept `PRINTREG` output.
    DiagnosticFailed,
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedOperand {
                expected,
                available,
            } => write!(
                f,
                "truncated operand: expected {expected} bytes, {available} available"
            ),
            Self::InvalidRegister(id) => write!(f, "invalid register id {id:#04x}"),
            Self::InvalidAddress(addr) => write!(f, "invalid stack address {addr}"),
            Self::StackOverflow { requested, free } => {
                write!(f, "stack overflow: push of {requested} bytes, {free} free")
            }
            Self::StackUnderflow { requested, used } => {
                write!(f, "stack underflow: need {requested} bytes, {used} on stack")
            }
            Self::ConversionOverflow(value) => {
                write!(f, "cannot convert {value} to a 64-bit integer")
            }
            Self::DivideByZero => write!(f, "division by zero"),
            Self::ArithmeticOverflow => write!(f, "integer overflow"),
            Self::InvalidShift(amount) => write!(f, "invalid shift amount {amount}"),
            Self::IntegerRequired(reg) => write!(f, "{reg} is not an integer register"),
            Self::InvalidJumpTarget { offset, reason } => {
                write!(f, "invalid jump offset {offset}: {reason}")
            }
            Self::InvalidCondition(cond) => write!(f, "invalid condition code {cond}"),
            Self::MissingComparison => write!(f, "conditional jump without a prior CMP"),
            Self::InvalidOperandMode(mode) => {
                write!(f, "operand mode {mode} not allowed for this instruction")
            }
            Self::InvalidStackPointer(value) => write!(f, "invalid stack pointer {value}"),
            Self::UnknownOpcode(op) => write!(f, "unknown opcode {op:#04x}"),
            Self::IpOutOfBounds(ip) => write!(f, "instruction pointer {ip} out of bounds"),
            Self::DiagnosticFailed => write!(f, "diagnostic sink failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VmError {}

/// Terminal fault: an error plus the location that raised it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fault {
    /// Offset of the failing instruction's header byte.
    pub ip: usize,
    /// Raw header byte (mode and opcode).
    pub header: u8,
    /// The specific condition.
    pub error: VmError,
}

impl Fault {
    /// Opcode bits of the failing instruction.
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.header & OPCODE_MASK
    }

    /// Operand-size mode bits of the failing instruction.
    #[must_use]
    pub const fn mode(&self) -> u8 {
        self.header >> MODE_SHIFT
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fault at ip {} (opcode {:#04x}, mode {}): {}",
            self.ip,
            self.opcode(),
            self.mode(),
            self.error
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Fault {}
