// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! REPL (Read-Eval-Print Loop) for Sylva.
//!
//! Each line compiles and runs in one persistent [`Vm`], so globals
//! defined on earlier lines stay visible. Results print through the VM's
//! normal `RETURN` path; compile and runtime errors are reported and the
//! loop continues.

#[cfg(test)]
mod mod_test;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::vm::{InterpretResult, Vm};

/// Run the REPL until end-of-input or Ctrl-C.
///
/// # Errors
///
/// Returns an error if the line editor fails.
pub fn run(vm: &mut Vm) -> Result<(), ReadlineError> {
    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline("sylva> ") {
            Ok(line) => {
                if eval_line(vm, &line).is_some() {
                    let _ = editor.add_history_entry(&line);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

/// Evaluate one REPL line on the shared VM.
///
/// Blank lines are skipped and return `None`. Everything else runs
/// through [`Vm::interpret`]; errors have already been reported by the
/// VM, so the caller just keeps looping.
fn eval_line(vm: &mut Vm, line: &str) -> Option<InterpretResult> {
    if line.trim().is_empty() {
        return None;
    }
    Some(vm.interpret(line))
}
