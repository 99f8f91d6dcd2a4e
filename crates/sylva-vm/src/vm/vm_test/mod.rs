// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the bytecode VM.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

mod closure_test;

use super::*;

/// Compile and run a source buffer on a fresh VM.
pub fn eval(source: &str) -> Result<Value, ScriptError> {
    let mut vm = Vm::new();
    vm.run_source(source)
}

/// Evaluate a source buffer expected to produce a number.
pub fn eval_number(source: &str) -> f64 {
    let value = eval(source).expect("script failed");
    assert!(value.is_number(), "expected a number, got {value:?}");
    value.as_number()
}
