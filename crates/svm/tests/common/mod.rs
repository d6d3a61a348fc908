// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared test infrastructure for integration tests.
//!
//! This module is **not** a test file, so it must comply with full clippy
//! rules. Test-specific allowances (like `unwrap_used`) are only permitted in
//! `*_test.rs` files.

#![allow(dead_code, reason = "each test binary uses a different subset")]

pub mod test_vm;

pub use test_vm::{TestVm, TestVmError};
