// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bytecode builder.
//!
//! Emits instruction records with the narrowest literal encoding that
//! represents each operand exactly, and resolves jump labels.
//!
//! Jumps to a label that is already bound are backward jumps and are encoded
//! immediately. Jumps to a label bound later are forward jumps: they are
//! emitted with a 4-byte offset placeholder and patched by
//! [`BytecodeBuilder::finish`].

use alloc::vec::Vec;
use core::fmt;

use super::{Condition, Opcode, OperandMode, encode_address_info, encode_header};
use crate::operand::{Address, Term};
use crate::register::{Bank, Register};

/// A `src` operand as seen by the builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// Register operand.
    Reg(Register),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
}

impl From<Register> for Operand {
    fn from(reg: Register) -> Self {
        Self::Reg(reg)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Jump label handle, created by [`BytecodeBuilder::label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

/// Error raised while assembling bytecode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildError {
    /// Float literal where the instruction only has an integer table.
    FloatLiteral(f64),
    /// A jump refers to a label that was never bound.
    UnboundLabel(Label),
    /// `bind` called twice for the same label.
    LabelRebound(Label),
    /// Backward jump to its own header.
    ZeroOffset {
        /// Offset of the jump instruction.
        site: usize,
    },
    /// Label bound at or past the end of the finished bytecode.
    JumpPastEnd {
        /// Offset of the jump instruction.
        site: usize,
        /// Offset the label was bound to.
        target: usize,
    },
    /// Forward distance does not fit the 4-byte offset.
    JumpTooFar {
        /// Offset of the jump instruction.
        site: usize,
        /// Offset the label was bound to.
        target: usize,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FloatLiteral(value) => {
                write!(f, "float literal {value:?} in an integer-only operand")
            }
            Self::UnboundLabel(label) => write!(f, "label {} never bound", label.0),
            Self::LabelRebound(label) => write!(f, "label {} bound twice", label.0),
            Self::ZeroOffset { site } => write!(f, "jump at {site} targets itself"),
            Self::JumpPastEnd { site, target } => {
                write!(f, "jump at {site} targets {target}, past the end of the code")
            }
            Self::JumpTooFar { site, target } => {
                write!(f, "jump at {site} to {target} exceeds the offset range")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BuildError {}

/// An encoded operand: mode bits plus up to eight payload bytes.
#[derive(Debug, Clone, Copy)]
struct Encoded {
    mode: OperandMode,
    bytes: [u8; 8],
}

impl Encoded {
    const fn register(reg: Register) -> Self {
        let mut bytes = [0; 8];
        bytes[0] = reg as u8;
        Self {
            mode: OperandMode::UseReg,
            bytes,
        }
    }

    /// Narrowest sign-extending width holding `value`.
    fn int(value: i64) -> Self {
        let bytes = value.to_le_bytes();
        let mode = if i8::try_from(value).is_ok() {
            OperandMode::Eighth
        } else if i32::try_from(value).is_ok() {
            OperandMode::Half
        } else {
            OperandMode::Full
        };
        Self { mode, bytes }
    }

    /// Narrowest float form that decodes back to the same bit pattern.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the truncated value is compared bitwise against the original"
    )]
    fn float(value: f64) -> Self {
        let bits = value.to_bits();
        let whole = value as i8;
        if f64::from(whole).to_bits() == bits {
            let mut bytes = [0; 8];
            bytes[0] = whole.to_le_bytes()[0];
            return Self {
                mode: OperandMode::Eighth,
                bytes,
            };
        }
        if bits & 0xFFFF_FFFF == 0 {
            let mut bytes = [0; 8];
            bytes[..4].copy_from_slice(&((bits >> 32) as u32).to_le_bytes());
            return Self {
                mode: OperandMode::Half,
                bytes,
            };
        }
        Self {
            mode: OperandMode::Full,
            bytes: value.to_le_bytes(),
        }
    }

    fn term(term: Term) -> Self {
        match term {
            Term::Reg(reg) => Self::register(reg),
            Term::Lit(value) => Self::int(value),
        }
    }

    fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.mode.width()]
    }
}

#[derive(Debug, Clone, Copy)]
struct Fixup {
    site: usize,
    patch: usize,
    label: Label,
}

/// Incremental bytecode assembler.
///
/// ```
/// use svm::{BytecodeBuilder, Register};
///
/// let mut b = BytecodeBuilder::new();
/// b.push(23_i64)?.pop(Register::R2).add(Register::R2, 25_i64)?;
/// let code = b.finish()?;
/// assert_eq!(code[0], 0xC6);
/// # Ok::<(), svm::BuildError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct BytecodeBuilder {
    code: Vec<u8>,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
}

impl BytecodeBuilder {
    /// Empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            code: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
        }
    }

    /// Bytes emitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// True if nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Append raw bytes without validation.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    fn emit(&mut self, opcode: Opcode, mode: OperandMode) {
        self.code.push(encode_header(opcode, mode));
    }

    fn emit_address(&mut self, addr: &Address) {
        let terms = addr.terms().map(Encoded::term);
        self.code
            .push(encode_address_info(terms.map(|term| term.mode)));
        for term in &terms {
            self.code.extend_from_slice(term.as_slice());
        }
    }

    /// Encode `src` using the integer or float literal table.
    fn encode(src: Operand, table: Bank) -> Result<Encoded, BuildError> {
        Ok(match (src, table) {
            (Operand::Reg(reg), _) => Encoded::register(reg),
            (Operand::Int(value), Bank::Int) => Encoded::int(value),
            (Operand::Float(value), Bank::Int) => return Err(BuildError::FloatLiteral(value)),
            (Operand::Int(value), Bank::Float) => Encoded::float(int_to_float(value)),
            (Operand::Float(value), Bank::Float) => Encoded::float(value),
        })
    }

    fn dst_src(
        &mut self,
        opcode: Opcode,
        dst: Register,
        src: Operand,
        table: Bank,
    ) -> Result<&mut Self, BuildError> {
        let src = Self::encode(src, table)?;
        self.emit(opcode, src.mode);
        self.code.push(dst as u8);
        self.code.extend_from_slice(src.as_slice());
        Ok(self)
    }

    fn dst_only(&mut self, opcode: Opcode, dst: Register) -> &mut Self {
        self.emit(opcode, OperandMode::UseReg);
        self.code.push(dst as u8);
        self
    }

    // --- Data movement ---

    /// `NOP`
    pub fn nop(&mut self) -> &mut Self {
        self.emit(Opcode::Nop, OperandMode::UseReg);
        self
    }

    /// `MOV dst, src`. The literal table follows the bank of `dst`.
    pub fn mov(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Mov, dst, src.into(), dst.bank())
    }

    /// `LDR dst, [addr]`
    pub fn load(&mut self, dst: Register, addr: Address) -> &mut Self {
        self.emit(Opcode::Ldr, OperandMode::UseReg);
        self.code.push(dst as u8);
        self.emit_address(&addr);
        self
    }

    /// `STR [addr], src` with an integer literal table.
    pub fn store(&mut self, addr: Address, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.addr_src(Opcode::Str, &addr, src.into(), Bank::Int)
    }

    /// `STRF [addr], src` with a float literal table.
    pub fn store_float(
        &mut self,
        addr: Address,
        src: impl Into<Operand>,
    ) -> Result<&mut Self, BuildError> {
        self.addr_src(Opcode::Strf, &addr, src.into(), Bank::Float)
    }

    fn addr_src(
        &mut self,
        opcode: Opcode,
        addr: &Address,
        src: Operand,
        table: Bank,
    ) -> Result<&mut Self, BuildError> {
        let src = Self::encode(src, table)?;
        self.emit(opcode, src.mode);
        self.emit_address(addr);
        self.code.extend_from_slice(src.as_slice());
        Ok(self)
    }

    /// `LEA dst, [addr]`
    pub fn lea(&mut self, dst: Register, addr: Address) -> &mut Self {
        self.emit(Opcode::Lea, OperandMode::UseReg);
        self.code.push(dst as u8);
        self.emit_address(&addr);
        self
    }

    /// `PUSH src` with an integer literal table.
    pub fn push(&mut self, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.src_only(Opcode::Push, src.into(), Bank::Int)
    }

    /// `PUSHF src` with a float literal table.
    pub fn push_float(&mut self, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.src_only(Opcode::Pushf, src.into(), Bank::Float)
    }

    fn src_only(&mut self, opcode: Opcode, src: Operand, table: Bank) -> Result<&mut Self, BuildError> {
        let src = Self::encode(src, table)?;
        self.emit(opcode, src.mode);
        self.code.extend_from_slice(src.as_slice());
        Ok(self)
    }

    /// `POP dst`
    pub fn pop(&mut self, dst: Register) -> &mut Self {
        self.dst_only(Opcode::Pop, dst)
    }

    // --- Arithmetic ---

    /// `ADD dst, src`
    pub fn add(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Add, dst, src.into(), dst.bank())
    }

    /// `SUB dst, src`
    pub fn sub(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Sub, dst, src.into(), dst.bank())
    }

    /// `MUL dst, src`
    pub fn mul(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Mul, dst, src.into(), dst.bank())
    }

    /// `DIV dst, src`
    pub fn div(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Div, dst, src.into(), dst.bank())
    }

    /// `MOD dst, src`
    pub fn rem(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Mod, dst, src.into(), dst.bank())
    }

    /// `INC dst`
    pub fn inc(&mut self, dst: Register) -> &mut Self {
        self.dst_only(Opcode::Inc, dst)
    }

    /// `DEC dst`
    pub fn dec(&mut self, dst: Register) -> &mut Self {
        self.dst_only(Opcode::Dec, dst)
    }

    /// `NEG dst`
    pub fn neg(&mut self, dst: Register) -> &mut Self {
        self.dst_only(Opcode::Neg, dst)
    }

    // --- Bitwise ---

    /// `AND dst, src`
    pub fn and(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::And, dst, src.into(), Bank::Int)
    }

    /// `OR dst, src`
    pub fn or(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Or, dst, src.into(), Bank::Int)
    }

    /// `XOR dst, src`
    pub fn xor(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Xor, dst, src.into(), Bank::Int)
    }

    /// `SHL dst, src`
    pub fn shl(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Shl, dst, src.into(), Bank::Int)
    }

    /// `SHR dst, src`
    pub fn shr(&mut self, dst: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Shr, dst, src.into(), Bank::Int)
    }

    /// `NOT dst`
    pub fn not(&mut self, dst: Register) -> &mut Self {
        self.dst_only(Opcode::Not, dst)
    }

    // --- Comparison and control flow ---

    /// `CMP lhs, src`. The literal table follows the bank of `lhs`.
    pub fn cmp(&mut self, lhs: Register, src: impl Into<Operand>) -> Result<&mut Self, BuildError> {
        self.dst_src(Opcode::Cmp, lhs, src.into(), lhs.bank())
    }

    /// New unbound label.
    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the current offset.
    pub fn bind(&mut self, label: Label) -> Result<&mut Self, BuildError> {
        let slot = self
            .labels
            .get_mut(label.0)
            .ok_or(BuildError::UnboundLabel(label))?;
        if slot.is_some() {
            return Err(BuildError::LabelRebound(label));
        }
        *slot = Some(self.code.len());
        Ok(self)
    }

    /// Unconditional jump to `label`.
    pub fn jump(&mut self, label: Label) -> Result<&mut Self, BuildError> {
        self.jump_to(label, None)
    }

    /// Jump to `label` when the last comparison satisfies `condition`.
    pub fn jump_if(&mut self, condition: Condition, label: Label) -> Result<&mut Self, BuildError> {
        self.jump_to(label, Some(condition))
    }

    fn jump_to(&mut self, label: Label, condition: Option<Condition>) -> Result<&mut Self, BuildError> {
        let site = self.code.len();
        let bound = *self
            .labels
            .get(label.0)
            .ok_or(BuildError::UnboundLabel(label))?;

        let (opcode, offset) = match bound {
            Some(target) => {
                let distance = site - target;
                if distance == 0 {
                    return Err(BuildError::ZeroOffset { site });
                }
                let offset = i64::try_from(distance)
                    .map_err(|_| BuildError::JumpTooFar { site, target })?;
                let opcode = if condition.is_some() {
                    Opcode::Jcb
                } else {
                    Opcode::Jmpb
                };
                (opcode, Encoded::int(offset))
            }
            None => {
                let opcode = if condition.is_some() {
                    Opcode::Jcf
                } else {
                    Opcode::Jmpf
                };
                (opcode, Encoded {
                    mode: OperandMode::Half,
                    bytes: [0; 8],
                })
            }
        };

        self.emit(opcode, offset.mode);
        if let Some(condition) = condition {
            self.code.push(condition as u8);
        }
        if bound.is_none() {
            self.fixups.push(Fixup {
                site,
                patch: self.code.len(),
                label,
            });
        }
        self.code.extend_from_slice(offset.as_slice());
        Ok(self)
    }

    // --- Diagnostics ---

    /// `PRINTREG reg`
    pub fn print_reg(&mut self, reg: Register) -> &mut Self {
        self.dst_only(Opcode::PrintReg, reg)
    }

    /// Patch forward jumps and return the bytecode.
    ///
    /// # Errors
    ///
    /// Fails if a forward jump's label is unbound, bound at the end of the
    /// code, or too far away for a 4-byte offset.
    pub fn finish(mut self) -> Result<Vec<u8>, BuildError> {
        for fixup in &self.fixups {
            let Fixup { site, patch, label } = *fixup;
            let target = self
                .labels
                .get(label.0)
                .copied()
                .flatten()
                .ok_or(BuildError::UnboundLabel(label))?;
            if target >= self.code.len() {
                return Err(BuildError::JumpPastEnd { site, target });
            }
            let offset =
                i32::try_from(target - site).map_err(|_| BuildError::JumpTooFar { site, target })?;
            self.code[patch..patch + 4].copy_from_slice(&offset.to_le_bytes());
        }
        Ok(self.code)
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "integer literals in float position widen like register reads"
)]
const fn int_to_float(value: i64) -> f64 {
    value as f64
}
