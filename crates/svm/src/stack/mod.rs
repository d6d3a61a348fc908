// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bounded execution stack.
//!
//! ```text
//! index:  0    1    2         top                  STACK_SIZE-1
//!        ┌────┬────┬────┬ ─ ┬────┬──────────────────┬────┐
//!        │    │    │    │   │    │       FREE       │    │
//!        └────┴────┴────┴ ─ ┴────┴──────────────────┴────┘
//!        ──── grows up ────►  ▲
//!                             RSP (-1 when empty)
//! ```
//!
//! The stack does not own its top pointer; it lives in register `RSP`.
//! Operations take the current top and return the new one, leaving the caller
//! to commit it together with any register writes. Multi-byte values are
//! little-endian.

#[cfg(test)]
mod stack_test;

use crate::error::VmError;
use crate::register::{EMPTY_STACK, check_stack_pointer};

/// Stack capacity in bytes.
pub const STACK_SIZE: usize = 512;

/// Fixed-capacity byte stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    bytes: [u8; STACK_SIZE],
}

impl Stack {
    /// Zero-filled stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; STACK_SIZE],
        }
    }

    /// Bytes in use for a given top.
    #[must_use]
    pub const fn used(top: i64) -> usize {
        if top < 0 { 0 } else { top as usize + 1 }
    }

    /// Push `bytes` above `top`.
    ///
    /// Returns the new top, `top + bytes.len()`.
    pub fn push(&mut self, top: i64, bytes: &[u8]) -> Result<i64, VmError> {
        let used = checked_used(top)?;
        let free = STACK_SIZE - used;
        if bytes.len() > free {
            return Err(VmError::StackOverflow {
                requested: bytes.len(),
                free,
            });
        }
        self.bytes[used..used + bytes.len()].copy_from_slice(bytes);
        Ok(top + bytes.len() as i64)
    }

    /// Pop `count` bytes from `top`.
    ///
    /// Returns the new top and the popped bytes, lowest address first. The
    /// stack memory itself is not modified.
    pub fn pop(&self, top: i64, count: usize) -> Result<(i64, &[u8]), VmError> {
        let used = checked_used(top)?;
        if top == EMPTY_STACK || count > used {
            return Err(VmError::StackUnderflow {
                requested: count,
                used,
            });
        }
        let start = used - count;
        Ok((top - count as i64, &self.bytes[start..used]))
    }

    /// Read `count` bytes at `address`.
    ///
    /// Fails with [`VmError::StackUnderflow`] while the stack is empty.
    pub fn peek(&self, top: i64, address: i64, count: usize) -> Result<&[u8], VmError> {
        if top == EMPTY_STACK {
            return Err(VmError::StackUnderflow {
                requested: count,
                used: 0,
            });
        }
        let start = check_range(address, count)?;
        Ok(&self.bytes[start..start + count])
    }

    /// Overwrite bytes at `address`. The top is unaffected.
    pub fn write_at(&mut self, address: i64, bytes: &[u8]) -> Result<(), VmError> {
        let start = check_range(address, bytes.len())?;
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Read the 8-byte image at `address`.
    pub fn peek_word(&self, top: i64, address: i64) -> Result<[u8; 8], VmError> {
        let mut word = [0; 8];
        word.copy_from_slice(self.peek(top, address, 8)?);
        Ok(word)
    }

    /// Pop an 8-byte image.
    pub fn pop_word(&self, top: i64) -> Result<(i64, [u8; 8]), VmError> {
        let (new_top, bytes) = self.pop(top, 8)?;
        let mut word = [0; 8];
        word.copy_from_slice(bytes);
        Ok((new_top, word))
    }

    /// Raw stack memory.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; STACK_SIZE] {
        &self.bytes
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes in use, rejecting tops outside `[-1, STACK_SIZE - 1]`.
fn checked_used(top: i64) -> Result<usize, VmError> {
    check_stack_pointer(top)?;
    Ok(Stack::used(top))
}

/// Validate `[address, address + count)` against the capacity.
fn check_range(address: i64, count: usize) -> Result<usize, VmError> {
    let Ok(start) = usize::try_from(address) else {
        return Err(VmError::InvalidAddress(address));
    };
    match start.checked_add(count) {
        Some(end) if start < STACK_SIZE && end <= STACK_SIZE => Ok(start),
        _ => Err(VmError::InvalidAddress(address)),
    }
}
