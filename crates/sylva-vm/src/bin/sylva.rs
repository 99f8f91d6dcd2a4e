// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Sylva command-line driver: run a script file, or start the REPL.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sylva_vm::repl;
use sylva_vm::vm::{InterpretResult, Vm};

/// Exit code for a compile error.
const EX_DATAERR: u8 = 65;
/// Exit code for a runtime error.
const EX_SOFTWARE: u8 = 70;
/// Exit code for an unreadable input file.
const EX_IOERR: u8 = 74;

#[derive(Parser)]
#[command(name = "sylva", version, about = "The Sylva interpreter")]
struct Cli {
    /// Script to run; omit to start the REPL.
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut vm = Vm::new();

    match cli.script {
        Some(path) => {
            let source = match std::fs::read_to_string(&path) {
                Ok(source) => source,
                Err(e) => {
                    eprintln!("Could not read {}: {e}", path.display());
                    return ExitCode::from(EX_IOERR);
                }
            };
            match vm.interpret(&source) {
                InterpretResult::Ok => ExitCode::SUCCESS,
                InterpretResult::CompileError => ExitCode::from(EX_DATAERR),
                InterpretResult::RuntimeError => ExitCode::from(EX_SOFTWARE),
            }
        }
        None => {
            println!("Sylva {}", sylva_vm::VERSION);
            match repl::run(&mut vm) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("REPL error: {e}");
                    ExitCode::from(EX_IOERR)
                }
            }
        }
    }
}
