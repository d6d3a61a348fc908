// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Stateful VM wrapper for integration tests.

use core::fmt;

use svm::{
    BuildError, Bytecode, BytecodeBuilder, Fault, RecordingSink, Register, Value, VmState,
    VmStatus, execute,
};

/// Why a test program did not halt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestVmError {
    /// The builder rejected the program.
    Build(BuildError),
    /// Execution faulted.
    Fault(Fault),
}

impl fmt::Display for TestVmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build(e) => write!(f, "build error: {e}"),
            Self::Fault(e) => write!(f, "{e}"),
        }
    }
}

impl From<BuildError> for TestVmError {
    fn from(e: BuildError) -> Self {
        Self::Build(e)
    }
}

impl From<Fault> for TestVmError {
    fn from(e: Fault) -> Self {
        Self::Fault(e)
    }
}

/// A VM state plus a recording sink.
///
/// Every call to [`TestVm::run`] starts from a fresh state, so one `TestVm`
/// can be reused across programs.
#[derive(Debug, Default)]
pub struct TestVm {
    state: VmState,
    sink: RecordingSink,
}

impl TestVm {
    /// Create a fresh VM.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run raw bytecode to completion.
    pub fn run(&mut self, code: &[u8]) -> Result<(), TestVmError> {
        self.state.reset();
        self.sink.clear();
        execute(Bytecode::new(code), &mut self.state, &mut self.sink)?;
        Ok(())
    }

    /// Assemble a program with the builder and run it.
    pub fn run_program(
        &mut self,
        program: impl FnOnce(&mut BytecodeBuilder) -> Result<(), BuildError>,
    ) -> Result<(), TestVmError> {
        let mut builder = BytecodeBuilder::new();
        program(&mut builder)?;
        let code = builder.finish()?;
        self.run(&code)
    }

    /// Integer register contents, `None` for float registers.
    #[must_use]
    pub fn int(&self, reg: Register) -> Option<i64> {
        match self.state.registers.read(reg) {
            Value::Int(v) => Some(v),
            Value::Float(_) => None,
        }
    }

    /// Float register contents, `None` for integer registers.
    #[must_use]
    pub fn float(&self, reg: Register) -> Option<f64> {
        match self.state.registers.read(reg) {
            Value::Float(v) => Some(v),
            Value::Int(_) => None,
        }
    }

    /// Current `RSP`.
    #[must_use]
    pub const fn rsp(&self) -> i64 {
        self.state.registers.rsp()
    }

    /// Status after the last run.
    #[must_use]
    pub const fn status(&self) -> VmStatus {
        self.state.status()
    }

    /// The underlying state.
    #[must_use]
    pub const fn state(&self) -> &VmState {
        &self.state
    }

    /// `PRINTREG` output of the last run.
    #[must_use]
    pub fn printed(&self) -> &[(Register, Value)] {
        self.sink.records()
    }
}
