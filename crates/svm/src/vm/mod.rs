// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Dispatch loop for the SVM.
//!
//! The VM is stateless: registers, stack, instruction pointer, comparison
//! flags and status all live in [`VmState`], owned by the caller. The
//! bytecode is borrowed read-only, so any number of states can execute the
//! same buffer independently.
//!
//! Each step reads one header byte at `ip`, dispatches on its opcode, and
//! applies the handler's result: advance by the bytes consumed, or jump to a
//! validated absolute target. Reaching `ip == len` halts; any error faults.
//! Both are terminal.

#[cfg(test)]
mod vm_test;

mod instructions;

use core::cmp::Ordering;

use tracing::{debug, trace};

use crate::bytecode::{Bytecode, Condition};
use crate::error::{Fault, VmError};
use crate::register::Registers;
use crate::sink::DiagnosticSink;
use crate::stack::Stack;

use instructions::{Step, execute_instruction};

/// Instructions executed per [`Vm::run`] call by [`execute`].
pub const DEFAULT_BUDGET: u32 = 10_000;

/// Execution status of a [`VmState`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmStatus {
    /// More instructions to execute.
    Running = 0,
    /// `ip` reached the end of the bytecode.
    Halted = 1,
    /// An instruction failed; see [`VmState::fault`].
    Faulted = 2,
}

/// Outcome of the last `CMP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Left operand was smaller.
    Less,
    /// Operands were equal.
    Equal,
    /// Left operand was larger.
    Greater,
    /// A float operand was NaN.
    Unordered,
}

impl Comparison {
    /// Comparison result of an [`Ordering`], `None` meaning unordered.
    #[must_use]
    pub const fn from_ordering(ordering: Option<Ordering>) -> Self {
        match ordering {
            Some(Ordering::Less) => Self::Less,
            Some(Ordering::Equal) => Self::Equal,
            Some(Ordering::Greater) => Self::Greater,
            None => Self::Unordered,
        }
    }

    /// Whether `condition` holds for this outcome.
    ///
    /// An unordered comparison only satisfies [`Condition::Ne`].
    #[must_use]
    pub const fn satisfies(self, condition: Condition) -> bool {
        match condition {
            Condition::Eq => matches!(self, Self::Equal),
            Condition::Ne => !matches!(self, Self::Equal),
            Condition::Lt => matches!(self, Self::Less),
            Condition::Le => matches!(self, Self::Less | Self::Equal),
            Condition::Gt => matches!(self, Self::Greater),
            Condition::Ge => matches!(self, Self::Greater | Self::Equal),
        }
    }
}

/// Complete execution state of one VM instance.
#[derive(Debug, Clone, PartialEq)]
pub struct VmState {
    /// Register file.
    pub registers: Registers,
    /// Execution stack. Its top is `registers.rsp()`.
    pub stack: Stack,
    /// Result of the last `CMP`, if any.
    pub flags: Option<Comparison>,
    ip: usize,
    status: VmStatus,
    fault: Option<Fault>,
    steps: u64,
}

impl VmState {
    /// Fresh state: `ip = 0`, registers zeroed, empty stack, running.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registers: Registers::new(),
            stack: Stack::new(),
            flags: None,
            ip: 0,
            status: VmStatus::Running,
            fault: None,
            steps: 0,
        }
    }

    /// Offset of the next instruction, or of the faulting one.
    #[must_use]
    pub const fn ip(&self) -> usize {
        self.ip
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> VmStatus {
        self.status
    }

    /// The fault that stopped execution, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Instructions executed so far.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// True once halted or faulted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self.status, VmStatus::Running)
    }

    /// Return to the initial state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn halt(&mut self) -> RunResult {
        self.status = VmStatus::Halted;
        debug!(ip = self.ip, steps = self.steps, "halted");
        RunResult::Halted
    }

    fn record_fault(&mut self, fault: Fault) -> RunResult {
        self.status = VmStatus::Faulted;
        self.fault = Some(fault);
        debug!(
            ip = fault.ip,
            opcode = fault.opcode(),
            error = %fault.error,
            "faulted"
        );
        RunResult::Faulted(fault)
    }
}

impl Default for VmState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of running a state for one budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunResult {
    /// `ip` reached the end of the bytecode.
    Halted,
    /// The step budget ran out; call [`Vm::run`] again to continue.
    Yielded,
    /// An instruction failed. Execution cannot continue.
    Faulted(Fault),
}

impl RunResult {
    /// Returns true for halted and faulted results.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Halted | Self::Faulted(_))
    }

    /// Returns true if execution can be resumed.
    #[must_use]
    pub const fn is_yielded(&self) -> bool {
        matches!(self, Self::Yielded)
    }
}

/// Stateless bytecode virtual machine.
pub struct Vm;

impl Vm {
    /// Execute at most `budget` instructions.
    ///
    /// Returns:
    /// - `RunResult::Halted` when `ip` equals the bytecode length
    /// - `RunResult::Yielded` when the budget is exhausted first
    /// - `RunResult::Faulted(f)` when an instruction fails; `ip` stays at
    ///   the failing instruction
    ///
    /// A state that already halted or faulted is returned as-is without
    /// executing anything.
    pub fn run<S: DiagnosticSink>(
        code: Bytecode<'_>,
        state: &mut VmState,
        sink: &mut S,
        budget: u32,
    ) -> RunResult {
        match (state.status, state.fault) {
            (VmStatus::Halted, _) => return RunResult::Halted,
            (VmStatus::Faulted, Some(fault)) => return RunResult::Faulted(fault),
            _ => {}
        }

        let mut remaining = budget;
        loop {
            let ip = state.ip;
            if ip == code.len() {
                return state.halt();
            }
            if remaining == 0 {
                return RunResult::Yielded;
            }

            let Some(header) = code.get(ip) else {
                return state.record_fault(Fault {
                    ip,
                    header: 0,
                    error: VmError::IpOutOfBounds(ip),
                });
            };
            trace!(ip, header, "dispatch");

            match execute_instruction(code, state, sink, ip, header) {
                Ok(Step::Advance(consumed)) => state.ip = ip + consumed,
                Ok(Step::Jump(target)) => state.ip = target,
                Err(error) => return state.record_fault(Fault { ip, header, error }),
            }
            state.steps += 1;
            remaining -= 1;
        }
    }
}

/// Run `code` on `state` until it halts or faults.
///
/// Resumes after every yield. A program that jumps backward forever never
/// returns; use [`Vm::run`] with a budget to bound execution.
///
/// # Errors
///
/// Returns the [`Fault`] that stopped execution.
pub fn execute<S: DiagnosticSink>(
    code: Bytecode<'_>,
    state: &mut VmState,
    sink: &mut S,
) -> Result<(), Fault> {
    loop {
        match Vm::run(code, state, sink, DEFAULT_BUDGET) {
            RunResult::Halted => return Ok(()),
            RunResult::Yielded => {}
            RunResult::Faulted(fault) => return Err(fault),
        }
    }
}
