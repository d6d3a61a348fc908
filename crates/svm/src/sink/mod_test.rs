// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for diagnostic sinks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

#[test]
fn null_sink_accepts_everything() {
    let mut sink = NullSink;
    assert_eq!(sink.emit(Register::R1, Value::Int(1)), Ok(()));
}

#[test]
fn recording_sink_keeps_order() {
    let mut sink = RecordingSink::new();
    sink.emit(Register::R2, Value::Int(151)).unwrap();
    sink.emit(Register::Fr1, Value::Float(0.5)).unwrap();

    assert_eq!(
        sink.records(),
        &[
            (Register::R2, Value::Int(151)),
            (Register::Fr1, Value::Float(0.5))
        ]
    );
    assert_eq!(sink.values(), vec![Value::Int(151), Value::Float(0.5)]);

    sink.clear();
    assert!(sink.records().is_empty());
}

#[test]
fn recording_sink_limit() {
    let mut sink = RecordingSink::with_limit(1);
    assert_eq!(sink.emit(Register::R1, Value::Int(1)), Ok(()));
    assert_eq!(sink.emit(Register::R1, Value::Int(2)), Err(SinkError));
    assert_eq!(sink.records().len(), 1);
}

fn emit_owned<S: DiagnosticSink>(mut sink: S) -> Result<(), SinkError> {
    sink.emit(Register::Rax, Value::Int(3))
}

#[test]
fn mutable_reference_is_a_sink() {
    let mut sink = RecordingSink::new();
    emit_owned(&mut sink).unwrap();
    assert_eq!(sink.values(), vec![Value::Int(3)]);
}

#[cfg(feature = "std")]
#[test]
fn writer_sink_formats_lines() {
    let mut sink = WriterSink::new(Vec::new());
    sink.emit(Register::R2, Value::Int(-7)).unwrap();
    sink.emit(Register::Fr2, Value::Float(1.0)).unwrap();
    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(out, "R2 = -7\nFR2 = 1.0\n");
}
