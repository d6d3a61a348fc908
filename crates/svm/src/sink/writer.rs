// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Line-oriented sink over any `std::io::Write`.

use std::io::Write;

use super::{DiagnosticSink, SinkError};
use crate::register::{Register, Value};

/// Writes `NAME = value` lines, flushing after each one.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wrap a writer.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticSink for WriterSink<W> {
    fn emit(&mut self, register: Register, value: Value) -> Result<(), SinkError> {
        writeln!(self.writer, "{register} = {value}").map_err(|_| SinkError)?;
        self.writer.flush().map_err(|_| SinkError)
    }
}
