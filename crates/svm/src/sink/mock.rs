// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Recording sink for tests and embedding hosts.
//!
//! Keeps every `PRINTREG` in order so callers can assert on the output
//! without any I/O.

use alloc::vec::Vec;

use super::{DiagnosticSink, SinkError};
use crate::register::{Register, Value};

/// Sink backed by an in-memory list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSink {
    records: Vec<(Register, Value)>,
    /// Reject output once this many records are held.
    limit: Option<usize>,
}

impl RecordingSink {
    /// Create an empty, unbounded sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            limit: None,
        }
    }

    /// Create a sink that fails after `limit` records.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Everything emitted so far.
    #[must_use]
    pub fn records(&self) -> &[(Register, Value)] {
        &self.records
    }

    /// Values only, in emission order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.records.iter().map(|&(_, value)| value).collect()
    }

    /// Forget recorded output.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&mut self, register: Register, value: Value) -> Result<(), SinkError> {
        if self.limit.is_some_and(|limit| self.records.len() >= limit) {
            return Err(SinkError);
        }
        self.records.push((register, value));
        Ok(())
    }
}
