// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # SVM
//!
//! Register/stack hybrid bytecode virtual machine.
//!
//! This crate provides:
//! - The bytecode format (6-bit opcode, 2-bit operand-size mode) and a builder
//!   that emits it
//! - A typed register file (integer and double-precision banks)
//! - A bounded, byte-addressable execution stack
//! - The operand resolver, including `base + index*scale + displacement`
//!   stack addressing
//! - The dispatch loop with a step budget and terminal fault reporting
//!
//! All execution state lives in [`VmState`]; the bytecode buffer is borrowed
//! read-only, so independent states can run the same buffer.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

pub mod bytecode;
pub mod error;
pub mod operand;
pub mod register;
pub mod sink;
pub mod stack;
pub mod vm;

// Re-export commonly used types at crate root
pub use bytecode::builder::{BuildError, BytecodeBuilder, Label, Operand};
pub use bytecode::{Bytecode, Condition, Opcode, OperandMode};
pub use error::{Fault, JumpTargetError, VmError};
pub use operand::{Address, Term};
pub use register::{Bank, Register, Registers, Value};
pub use sink::{DiagnosticSink, NullSink, RecordingSink, SinkError};
#[cfg(feature = "std")]
pub use sink::WriterSink;
pub use stack::{STACK_SIZE, Stack};
pub use vm::{Comparison, DEFAULT_BUDGET, RunResult, Vm, VmState, VmStatus, execute};

/// Crate version.
pub const VERSION: &str = match option_env!("SVM_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
