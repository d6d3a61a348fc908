// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for arithmetic instructions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{assemble, run_fault, run_ok};
use crate::error::VmError;
use crate::register::Register::{Fr1, Fr2, R1, R2};
use crate::register::Value;

#[test]
fn scenario_push_pop_add() {
    let code = [0xC6, 23, 0xC6, 126, 0x08, 0x01, 0xD0, 0x01, 25];
    let state = run_ok(&code);
    assert_eq!(state.registers.read(R2), Value::Int(151));
    // The first push is still on the stack.
    assert_eq!(state.registers.rsp(), 7);
    assert_eq!(state.steps(), 4);
}

#[test]
fn integer_operations() {
    let code = assemble(|b| {
        b.mov(R1, 17_i64)?
            .add(R1, 3_i64)?
            .sub(R1, 5_i64)?
            .mul(R1, -4_i64)?
            .div(R1, 7_i64)?
            .mov(R2, -17_i64)?
            .rem(R2, 5_i64)?;
        Ok(())
    });
    let state = run_ok(&code);
    // ((17 + 3 - 5) * -4) / 7 truncates toward zero
    assert_eq!(state.registers.read(R1), Value::Int(-8));
    assert_eq!(state.registers.read(R2), Value::Int(-2));
}

#[test]
fn unary_operations() {
    let code = assemble(|b| {
        b.mov(R1, 10_i64)?.inc(R1).inc(R1).dec(R1).neg(R1);
        b.mov(Fr1, 1.5)?.inc(Fr1).neg(Fr1);
        Ok(())
    });
    let state = run_ok(&code);
    assert_eq!(state.registers.read(R1), Value::Int(-11));
    assert_eq!(state.registers.read(Fr1), Value::Float(-2.5));
}

#[test]
fn float_destination() {
    let code = assemble(|b| {
        b.mov(Fr1, 1.5)?
            .add(Fr1, 2_i64)?
            .mov(R1, 4_i64)?
            .mul(Fr1, R1)?
            .mov(Fr2, 7.5)?
            .rem(Fr2, 2.0)?;
        Ok(())
    });
    let state = run_ok(&code);
    assert_eq!(state.registers.read(Fr1), Value::Float(14.0));
    assert_eq!(state.registers.read(Fr2), Value::Float(1.5));
}

#[test]
fn integer_destination_converts_float_source() {
    let code = assemble(|b| {
        b.mov(Fr1, 2.9)?.mov(R1, 10_i64)?.add(R1, Fr1)?;
        Ok(())
    });
    let state = run_ok(&code);
    assert_eq!(state.registers.read(R1), Value::Int(12));
}

#[test]
fn division_by_zero() {
    let code = assemble(|b| {
        b.mov(R1, 5_i64)?.div(R1, 0_i64)?;
        Ok(())
    });
    let (state, fault) = run_fault(&code);
    assert_eq!(fault.error, VmError::DivideByZero);
    assert_eq!(fault.ip, 3);
    assert_eq!(state.registers.read(R1), Value::Int(5));

    let code = assemble(|b| {
        b.rem(R1, R2)?;
        Ok(())
    });
    assert_eq!(run_fault(&code).1.error, VmError::DivideByZero);

    let code = assemble(|b| {
        b.mov(Fr1, 1.0)?.div(Fr1, 0.0)?;
        Ok(())
    });
    assert_eq!(run_fault(&code).1.error, VmError::DivideByZero);
}

#[test]
fn integer_overflow_faults() {
    let cases: [(i64, fn(&mut crate::BytecodeBuilder) -> Result<(), crate::BuildError>); 5] = [
        (i64::MAX, |b| b.add(R1, 1_i64).map(|_| ())),
        (i64::MIN, |b| b.sub(R1, 1_i64).map(|_| ())),
        (i64::MIN, |b| b.div(R1, -1_i64).map(|_| ())),
        (i64::MIN, |b| b.rem(R1, -1_i64).map(|_| ())),
        (i64::MAX, |b| b.mul(R1, 2_i64).map(|_| ())),
    ];
    for (start, op) in cases {
        let code = assemble(|b| {
            b.mov(R1, start)?;
            op(b)
        });
        let (state, fault) = run_fault(&code);
        assert_eq!(fault.error, VmError::ArithmeticOverflow);
        assert_eq!(state.registers.read(R1), Value::Int(start));
    }
}

#[test]
fn unary_overflow_faults() {
    let code = assemble(|b| {
        b.mov(R1, i64::MAX)?.inc(R1);
        Ok(())
    });
    assert_eq!(run_fault(&code).1.error, VmError::ArithmeticOverflow);

    let code = assemble(|b| {
        b.mov(R1, i64::MIN)?.dec(R1);
        Ok(())
    });
    assert_eq!(run_fault(&code).1.error, VmError::ArithmeticOverflow);

    let code = assemble(|b| {
        b.mov(R1, i64::MIN)?.neg(R1);
        Ok(())
    });
    let (state, fault) = run_fault(&code);
    assert_eq!(fault.error, VmError::ArithmeticOverflow);
    assert_eq!(state.registers.read(R1), Value::Int(i64::MIN));
}

#[test]
fn float_result_too_large_for_integer_destination() {
    let code = assemble(|b| {
        b.mov(Fr1, 1e300)?.add(R1, Fr1)?;
        Ok(())
    });
    let (_, fault) = run_fault(&code);
    assert_eq!(fault.error, VmError::ConversionOverflow(1e300));
}
