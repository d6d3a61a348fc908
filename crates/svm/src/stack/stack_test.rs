// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the execution stack.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

#[test]
fn push_returns_new_top() {
    let mut stack = Stack::new();
    let top = stack.push(EMPTY_STACK, &[1, 2, 3]).unwrap();
    assert_eq!(top, 2);
    assert_eq!(&stack.as_bytes()[..3], &[1, 2, 3]);

    let top = stack.push(top, &[4]).unwrap();
    assert_eq!(top, 3);
    assert_eq!(Stack::used(top), 4);
}

#[test]
fn push_fills_to_capacity() {
    let mut stack = Stack::new();
    let top = stack.push(EMPTY_STACK, &[0xAA; STACK_SIZE]).unwrap();
    assert_eq!(top, STACK_SIZE as i64 - 1);

    assert_eq!(
        stack.push(top, &[1]),
        Err(VmError::StackOverflow {
            requested: 1,
            free: 0
        })
    );
}

#[test]
fn push_overflow_leaves_memory_untouched() {
    let mut stack = Stack::new();
    let top = stack.push(EMPTY_STACK, &[7; 508]).unwrap();
    assert_eq!(
        stack.push(top, &[9; 8]),
        Err(VmError::StackOverflow {
            requested: 8,
            free: 4
        })
    );
    assert_eq!(&stack.as_bytes()[508..], &[0; 4]);
}

#[test]
fn pop_returns_bytes_lowest_first() {
    let mut stack = Stack::new();
    let top = stack.push(EMPTY_STACK, &[1, 2, 3, 4]).unwrap();
    let (top, bytes) = stack.pop(top, 3).unwrap();
    assert_eq!(top, 0);
    assert_eq!(bytes, &[2, 3, 4]);

    let (top, bytes) = stack.pop(top, 1).unwrap();
    assert_eq!(top, EMPTY_STACK);
    assert_eq!(bytes, &[1]);
}

#[test]
fn pop_underflow() {
    let mut stack = Stack::new();
    assert_eq!(
        stack.pop(EMPTY_STACK, 8).map(|(top, _)| top),
        Err(VmError::StackUnderflow {
            requested: 8,
            used: 0
        })
    );

    let top = stack.push(EMPTY_STACK, &[1, 2]).unwrap();
    assert_eq!(
        stack.pop(top, 8).map(|(top, _)| top),
        Err(VmError::StackUnderflow {
            requested: 8,
            used: 2
        })
    );
}

#[test]
fn invalid_top_is_rejected() {
    let mut stack = Stack::new();
    assert_eq!(
        stack.push(-5, &[1]),
        Err(VmError::InvalidStackPointer(-5))
    );
    assert_eq!(
        stack.pop(STACK_SIZE as i64, 1).map(|(top, _)| top),
        Err(VmError::InvalidStackPointer(STACK_SIZE as i64))
    );
}

#[test]
fn word_roundtrip_is_little_endian() {
    let mut stack = Stack::new();
    let top = stack
        .push(EMPTY_STACK, &0x0102_0304_0506_0708_i64.to_le_bytes())
        .unwrap();
    assert_eq!(stack.as_bytes()[0], 0x08);
    assert_eq!(stack.as_bytes()[7], 0x01);

    let (top, word) = stack.pop_word(top).unwrap();
    assert_eq!(top, EMPTY_STACK);
    assert_eq!(i64::from_le_bytes(word), 0x0102_0304_0506_0708);
}

#[test]
fn peek_on_empty_stack_underflows() {
    let stack = Stack::new();
    assert_eq!(
        stack.peek(EMPTY_STACK, 0, 8),
        Err(VmError::StackUnderflow {
            requested: 8,
            used: 0
        })
    );
}

#[test]
fn peek_range_checks() {
    let mut stack = Stack::new();
    let top = stack.push(EMPTY_STACK, &[5; 16]).unwrap();
    assert_eq!(stack.peek(top, 8, 8).unwrap(), &[5; 8]);
    assert_eq!(stack.peek(top, 504, 8).unwrap(), &[0; 8]);
    assert_eq!(stack.peek(top, 505, 8), Err(VmError::InvalidAddress(505)));
    assert_eq!(stack.peek(top, -1, 1), Err(VmError::InvalidAddress(-1)));
    assert_eq!(stack.peek(top, 512, 0), Err(VmError::InvalidAddress(512)));
}

#[test]
fn write_at_does_not_move_top() {
    let mut stack = Stack::new();
    let top = stack.push(EMPTY_STACK, &[0; 8]).unwrap();
    stack.write_at(2, &[9, 9]).unwrap();
    assert_eq!(stack.peek(top, 0, 8).unwrap(), &[0, 0, 9, 9, 0, 0, 0, 0]);
    assert_eq!(stack.write_at(511, &[1, 2]), Err(VmError::InvalidAddress(511)));
    assert_eq!(stack.peek_word(top, 0).unwrap(), [0, 0, 9, 9, 0, 0, 0, 0]);
}
