// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Instruction handlers.
//!
//! Every handler decodes all of its operands and computes its results before
//! writing to the state. Register writes go through [`Registers::write`],
//! which leaves the register untouched on failure; handlers that change more
//! than one register stage the writes on a copy of the register file.

use crate::bytecode::{Bytecode, Condition, Opcode, OperandMode, decode_header};
use crate::error::{JumpTargetError, VmError};
use crate::operand::{Operands, Source};
use crate::register::{Bank, Register, Registers, Value};
use crate::sink::DiagnosticSink;

use super::{Comparison, VmState};

/// What the dispatch loop does after a successful instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Step {
    /// Move `ip` past the instruction's bytes.
    Advance(usize),
    /// Set `ip` to an already validated absolute offset.
    Jump(usize),
}

/// Decode and execute the instruction whose header byte is at `ip`.
pub(super) fn execute_instruction<S: DiagnosticSink>(
    code: Bytecode<'_>,
    state: &mut VmState,
    sink: &mut S,
    ip: usize,
    header: u8,
) -> Result<Step, VmError> {
    let (raw, mode) = decode_header(header);
    let opcode = Opcode::from_u8(raw).ok_or(VmError::UnknownOpcode(raw))?;
    if mode.is_literal() && !opcode.takes_source() {
        return Err(VmError::InvalidOperandMode(mode as u8));
    }

    let mut ops = Operands::new(code, ip);
    match opcode {
        Opcode::Nop => {}
        Opcode::Mov => op_mov(&mut ops, state, mode)?,
        Opcode::Ldr => op_ldr(&mut ops, state)?,
        Opcode::Str => op_store(&mut ops, state, mode, Bank::Int)?,
        Opcode::Strf => op_store(&mut ops, state, mode, Bank::Float)?,
        Opcode::Lea => op_lea(&mut ops, state)?,
        Opcode::Push => op_push(&mut ops, state, mode, Bank::Int)?,
        Opcode::Pushf => op_push(&mut ops, state, mode, Bank::Float)?,
        Opcode::Pop => op_pop(&mut ops, state)?,
        Opcode::Add => op_arith(&mut ops, state, mode, Arith::Add)?,
        Opcode::Sub => op_arith(&mut ops, state, mode, Arith::Sub)?,
        Opcode::Mul => op_arith(&mut ops, state, mode, Arith::Mul)?,
        Opcode::Div => op_arith(&mut ops, state, mode, Arith::Div)?,
        Opcode::Mod => op_arith(&mut ops, state, mode, Arith::Rem)?,
        Opcode::Inc => op_unary(&mut ops, state, Unary::Inc)?,
        Opcode::Dec => op_unary(&mut ops, state, Unary::Dec)?,
        Opcode::Neg => op_unary(&mut ops, state, Unary::Neg)?,
        Opcode::And => op_bitwise(&mut ops, state, mode, Bitwise::And)?,
        Opcode::Or => op_bitwise(&mut ops, state, mode, Bitwise::Or)?,
        Opcode::Xor => op_bitwise(&mut ops, state, mode, Bitwise::Xor)?,
        Opcode::Shl => op_bitwise(&mut ops, state, mode, Bitwise::Shl)?,
        Opcode::Shr => op_bitwise(&mut ops, state, mode, Bitwise::Shr)?,
        Opcode::Not => op_not(&mut ops, state)?,
        Opcode::Cmp => op_cmp(&mut ops, state, mode)?,
        Opcode::Jmpf => return op_jump(&mut ops, state, code, mode, Jump::forward(ip)),
        Opcode::Jmpb => return op_jump(&mut ops, state, code, mode, Jump::backward(ip)),
        Opcode::Jcf => return op_jump(&mut ops, state, code, mode, Jump::forward(ip).when()),
        Opcode::Jcb => return op_jump(&mut ops, state, code, mode, Jump::backward(ip).when()),
        Opcode::PrintReg => op_print_reg(&mut ops, state, sink)?,
    }
    Ok(Step::Advance(ops.consumed()))
}

// --- Data movement ---

fn op_mov(ops: &mut Operands<'_>, state: &mut VmState, mode: OperandMode) -> Result<(), VmError> {
    let dst = ops.register()?;
    let src = ops.source(mode, dst.bank())?;
    let value = src.value(&state.registers);
    state.registers.write(dst, value)
}

fn op_ldr(ops: &mut Operands<'_>, state: &mut VmState) -> Result<(), VmError> {
    let dst = ops.register()?;
    let addr = ops.address()?;
    let address = addr.resolve(&state.registers)?;
    let word = state.stack.peek_word(state.registers.rsp(), address)?;
    state
        .registers
        .write(dst, Value::from_le_bytes(dst.bank(), word))
}

/// `STR` keeps a register source's own bank; `STRF` always stores a double.
fn op_store(
    ops: &mut Operands<'_>,
    state: &mut VmState,
    mode: OperandMode,
    table: Bank,
) -> Result<(), VmError> {
    let addr = ops.address()?;
    let src = ops.source(mode, table)?;
    let address = addr.resolve(&state.registers)?;
    let bytes = stack_image(src, &state.registers, table);
    state.stack.write_at(address, &bytes)
}

fn op_lea(ops: &mut Operands<'_>, state: &mut VmState) -> Result<(), VmError> {
    let dst = ops.register()?;
    let addr = ops.address()?;
    let address = addr.resolve(&state.registers)?;
    state.registers.write(dst, Value::Int(address))
}

fn op_push(
    ops: &mut Operands<'_>,
    state: &mut VmState,
    mode: OperandMode,
    table: Bank,
) -> Result<(), VmError> {
    let src = ops.source(mode, table)?;
    let bytes = stack_image(src, &state.registers, table);
    let mut regs = state.registers;
    let top = state.stack.push(regs.rsp(), &bytes)?;
    regs.set_rsp(top)?;
    state.registers = regs;
    Ok(())
}

fn op_pop(ops: &mut Operands<'_>, state: &mut VmState) -> Result<(), VmError> {
    let dst = ops.register()?;
    let (top, word) = state.stack.pop_word(state.registers.rsp())?;
    let mut regs = state.registers;
    regs.set_rsp(top)?;
    regs.write(dst, Value::from_le_bytes(dst.bank(), word))?;
    state.registers = regs;
    Ok(())
}

/// Eight-byte image of a store or push source.
fn stack_image(src: Source, regs: &Registers, table: Bank) -> [u8; 8] {
    let value = src.value(regs);
    match table {
        Bank::Int => value.to_le_bytes(),
        Bank::Float => value.as_float().to_le_bytes(),
    }
}

// --- Arithmetic ---

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Arith {
    fn int(self, a: i64, b: i64) -> Result<i64, VmError> {
        if matches!(self, Self::Div | Self::Rem) && b == 0 {
            return Err(VmError::DivideByZero);
        }
        let result = match self {
            Self::Add => a.checked_add(b),
            Self::Sub => a.checked_sub(b),
            Self::Mul => a.checked_mul(b),
            Self::Div => a.checked_div(b),
            Self::Rem => a.checked_rem(b),
        };
        result.ok_or(VmError::ArithmeticOverflow)
    }

    fn float(self, a: f64, b: f64) -> Result<f64, VmError> {
        if matches!(self, Self::Div | Self::Rem) && b == 0.0 {
            return Err(VmError::DivideByZero);
        }
        Ok(match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Rem => a % b,
        })
    }
}

fn op_arith(
    ops: &mut Operands<'_>,
    state: &mut VmState,
    mode: OperandMode,
    op: Arith,
) -> Result<(), VmError> {
    let dst = ops.register()?;
    let src = ops.source(mode, dst.bank())?;
    let rhs = src.value(&state.registers);
    let result = match state.registers.read(dst) {
        Value::Int(a) => Value::Int(op.int(a, rhs.as_int()?)?),
        Value::Float(a) => Value::Float(op.float(a, rhs.as_float())?),
    };
    state.registers.write(dst, result)
}

#[derive(Debug, Clone, Copy)]
enum Unary {
    Inc,
    Dec,
    Neg,
}

fn op_unary(ops: &mut Operands<'_>, state: &mut VmState, op: Unary) -> Result<(), VmError> {
    let dst = ops.register()?;
    let result = match state.registers.read(dst) {
        Value::Int(a) => Value::Int(
            match op {
                Unary::Inc => a.checked_add(1),
                Unary::Dec => a.checked_sub(1),
                Unary::Neg => a.checked_neg(),
            }
            .ok_or(VmError::ArithmeticOverflow)?,
        ),
        Value::Float(a) => Value::Float(match op {
            Unary::Inc => a + 1.0,
            Unary::Dec => a - 1.0,
            Unary::Neg => -a,
        }),
    };
    state.registers.write(dst, result)
}

// --- Bitwise ---

#[derive(Debug, Clone, Copy)]
enum Bitwise {
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

fn op_bitwise(
    ops: &mut Operands<'_>,
    state: &mut VmState,
    mode: OperandMode,
    op: Bitwise,
) -> Result<(), VmError> {
    let dst = ops.register()?;
    let src = ops.source(mode, Bank::Int)?;
    let a = int_operand(&state.registers, dst)?;
    let b = match src {
        Source::Reg(reg) => int_operand(&state.registers, reg)?,
        Source::Literal(value) => value.as_int()?,
    };
    let result = match op {
        Bitwise::And => a & b,
        Bitwise::Or => a | b,
        Bitwise::Xor => a ^ b,
        Bitwise::Shl => a << shift_amount(b)?,
        Bitwise::Shr => a >> shift_amount(b)?,
    };
    state.registers.write(dst, Value::Int(result))
}

fn op_not(ops: &mut Operands<'_>, state: &mut VmState) -> Result<(), VmError> {
    let dst = ops.register()?;
    let a = int_operand(&state.registers, dst)?;
    state.registers.write(dst, Value::Int(!a))
}

/// Integer register contents; float registers are rejected, not converted.
fn int_operand(regs: &Registers, reg: Register) -> Result<i64, VmError> {
    match regs.read(reg) {
        Value::Int(v) => Ok(v),
        Value::Float(_) => Err(VmError::IntegerRequired(reg)),
    }
}

fn shift_amount(amount: i64) -> Result<u32, VmError> {
    match u32::try_from(amount) {
        Ok(bits) if bits < i64::BITS => Ok(bits),
        _ => Err(VmError::InvalidShift(amount)),
    }
}

// --- Comparison and control flow ---

fn op_cmp(ops: &mut Operands<'_>, state: &mut VmState, mode: OperandMode) -> Result<(), VmError> {
    let lhs = ops.register()?;
    let src = ops.source(mode, lhs.bank())?;
    let a = state.registers.read(lhs);
    let b = src.value(&state.registers);
    state.flags = Some(compare(a, b));
    Ok(())
}

/// Integer comparison when both sides are integers, float otherwise.
fn compare(a: Value, b: Value) -> Comparison {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Comparison::from_ordering(Some(x.cmp(&y))),
        _ => Comparison::from_ordering(a.as_float().partial_cmp(&b.as_float())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Shape of a jump instruction at `site`.
#[derive(Debug, Clone, Copy)]
struct Jump {
    site: usize,
    direction: Direction,
    conditional: bool,
}

impl Jump {
    const fn forward(site: usize) -> Self {
        Self {
            site,
            direction: Direction::Forward,
            conditional: false,
        }
    }

    const fn backward(site: usize) -> Self {
        Self {
            site,
            direction: Direction::Backward,
            conditional: false,
        }
    }

    /// Conditional variant, with a condition byte before the offset.
    const fn when(self) -> Self {
        Self {
            conditional: true,
            ..self
        }
    }

    /// Absolute target for `offset`.
    ///
    /// Forward targets must clear the jump's own `length` bytes; every
    /// target must lie strictly inside the bytecode.
    fn target(self, offset: i64, length: usize, code_len: usize) -> Result<usize, VmError> {
        let invalid = |reason| VmError::InvalidJumpTarget { offset, reason };

        if offset == 0 {
            return Err(invalid(JumpTargetError::ZeroOffset));
        }
        if offset < 0 {
            return Err(invalid(JumpTargetError::NegativeOffset));
        }
        let distance = usize::try_from(offset).map_err(|_| invalid(JumpTargetError::Overflow))?;

        let target = match self.direction {
            Direction::Forward => {
                if distance < length {
                    return Err(invalid(JumpTargetError::IntoOwnOperands));
                }
                self.site.checked_add(distance)
            }
            Direction::Backward => self.site.checked_sub(distance),
        }
        .ok_or_else(|| invalid(JumpTargetError::Overflow))?;

        if target >= code_len {
            return Err(invalid(JumpTargetError::OutOfBounds));
        }
        Ok(target)
    }
}

fn op_jump(
    ops: &mut Operands<'_>,
    state: &VmState,
    code: Bytecode<'_>,
    mode: OperandMode,
    jump: Jump,
) -> Result<Step, VmError> {
    let condition = if jump.conditional {
        Some(ops.byte()?)
    } else {
        None
    };
    let offset = ops.source(mode, Bank::Int)?.value(&state.registers).as_int()?;
    let length = ops.consumed();

    let condition = condition
        .map(|byte| Condition::from_u8(byte).ok_or(VmError::InvalidCondition(byte)))
        .transpose()?;
    let target = jump.target(offset, length, code.len())?;

    let taken = match condition {
        None => true,
        Some(condition) => state
            .flags
            .ok_or(VmError::MissingComparison)?
            .satisfies(condition),
    };
    Ok(if taken {
        Step::Jump(target)
    } else {
        Step::Advance(length)
    })
}

// --- Diagnostics ---

fn op_print_reg<S: DiagnosticSink>(
    ops: &mut Operands<'_>,
    state: &VmState,
    sink: &mut S,
) -> Result<(), VmError> {
    let reg = ops.register()?;
    sink.emit(reg, state.registers.read(reg))
        .map_err(|_| VmError::DiagnosticFailed)
}
