// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the dispatch loop and instruction handlers.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod arithmetic_test;

use super::*;
use crate::bytecode::builder::{BuildError, BytecodeBuilder};
use crate::register::{Register, Value};
use crate::sink::NullSink;

/// Assemble a program with the builder.
pub fn assemble(f: impl FnOnce(&mut BytecodeBuilder) -> Result<(), BuildError>) -> Vec<u8> {
    let mut b = BytecodeBuilder::new();
    f(&mut b).expect("assemble");
    b.finish().expect("finish")
}

/// Execute `code` to completion on a fresh state.
pub fn run(code: &[u8]) -> (VmState, Result<(), Fault>) {
    let mut state = VmState::new();
    let result = execute(Bytecode::new(code), &mut state, &mut NullSink);
    (state, result)
}

/// Execute `code` and require it to halt.
pub fn run_ok(code: &[u8]) -> VmState {
    let (state, result) = run(code);
    if let Err(fault) = result {
        panic!("unexpected fault: {fault}");
    }
    assert_eq!(state.status(), VmStatus::Halted);
    state
}

/// Execute `code` and require it to fault.
pub fn run_fault(code: &[u8]) -> (VmState, Fault) {
    let (state, result) = run(code);
    let fault = result.expect_err("expected a fault");
    assert_eq!(state.status(), VmStatus::Faulted);
    let recorded = state.fault().expect("recorded fault");
    assert_eq!((recorded.ip, recorded.header), (fault.ip, fault.header));
    assert_eq!(state.ip(), fault.ip);
    (state, fault)
}

#[test]
fn empty_bytecode_halts_immediately() {
    let state = run_ok(&[]);
    assert_eq!(state.ip(), 0);
    assert_eq!(state.steps(), 0);
}

#[test]
fn comparison_conditions() {
    use crate::bytecode::Condition::{Eq, Ge, Gt, Le, Lt, Ne};

    let table = [
        (Comparison::Less, [false, true, true, true, false, false]),
        (Comparison::Equal, [true, false, false, true, false, true]),
        (Comparison::Greater, [false, true, false, false, true, true]),
        (Comparison::Unordered, [false, true, false, false, false, false]),
    ];
    for (cmp, expected) in table {
        for (cond, want) in [Eq, Ne, Lt, Le, Gt, Ge].into_iter().zip(expected) {
            assert_eq!(cmp.satisfies(cond), want, "{cmp:?} {cond:?}");
        }
    }
}

#[test]
fn states_are_independent() {
    let code = assemble(|b| {
        b.inc(Register::R1);
        Ok(())
    });
    let code = Bytecode::new(&code);

    let mut first = VmState::new();
    let mut second = VmState::new();
    second.registers.write(Register::R1, Value::Int(10)).unwrap();

    execute(code, &mut first, &mut NullSink).unwrap();
    execute(code, &mut second, &mut NullSink).unwrap();

    assert_eq!(first.registers.read(Register::R1), Value::Int(1));
    assert_eq!(second.registers.read(Register::R1), Value::Int(11));
}

#[test]
fn reset_returns_to_initial_state() {
    let code = assemble(|b| {
        b.push(1_i64)?;
        Ok(())
    });
    let mut state = run_ok(&code);
    assert_ne!(state, VmState::new());
    state.reset();
    assert_eq!(state, VmState::new());
}
