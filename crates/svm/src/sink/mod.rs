// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Diagnostic output for `PRINTREG`.
//!
//! The engine performs no I/O of its own. `PRINTREG` hands the register and
//! its value to a [`DiagnosticSink`] supplied by the host; the call blocks
//! until the sink returns.

#[cfg(test)]
mod mod_test;

mod mock;
#[cfg(feature = "std")]
mod writer;

use core::fmt;

use crate::register::{Register, Value};

pub use mock::RecordingSink;
#[cfg(feature = "std")]
pub use writer::WriterSink;

/// The sink could not accept output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkError;

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "diagnostic sink rejected output")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SinkError {}

/// Receiver of `PRINTREG` output.
pub trait DiagnosticSink {
    /// Accept one register value.
    fn emit(&mut self, register: Register, value: Value) -> Result<(), SinkError>;
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &mut T {
    fn emit(&mut self, register: Register, value: Value) -> Result<(), SinkError> {
        (**self).emit(register, value)
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _register: Register, _value: Value) -> Result<(), SinkError> {
        Ok(())
    }
}
