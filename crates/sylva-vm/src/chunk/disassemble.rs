// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Human-readable disassembly of bytecode chunks.
//!
//! Used by the `print-code` and `trace-execution` features and by tests
//! that assert on emitted code and line attribution.

use core::fmt::Write;

use super::{Chunk, op};
use crate::heap::Heap;
use crate::value::value_to_string;

/// Disassemble a whole chunk under a heading.
#[must_use]
pub fn disassemble_chunk(chunk: &Chunk, name: &str, heap: &Heap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");

    let mut offset = 0;
    while offset < chunk.code.len() {
        let (line, next) = disassemble_instruction(chunk, offset, heap);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }

    out
}

/// Disassemble the instruction at `offset`.
///
/// Returns the rendered line and the offset of the next instruction.
#[must_use]
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, heap: &Heap) -> (String, usize) {
    let mut out = String::new();
    let _ = write!(out, "{offset:04} ");

    if offset > 0 && chunk.lines[offset] == chunk.lines[offset - 1] {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.lines[offset]);
    }

    let instruction = chunk.code[offset];
    let next = match instruction {
        op::CONSTANT => constant_instruction(&mut out, "OP_CONSTANT", chunk, offset, heap),
        op::NULL => simple_instruction(&mut out, "OP_NULL", offset),
        op::TRUE => simple_instruction(&mut out, "OP_TRUE", offset),
        op::FALSE => simple_instruction(&mut out, "OP_FALSE", offset),
        op::POP => simple_instruction(&mut out, "OP_POP", offset),
        op::DEFINE_GLOBAL => {
            constant_instruction(&mut out, "OP_DEFINE_GLOBAL", chunk, offset, heap)
        }
        op::GET_GLOBAL => constant_instruction(&mut out, "OP_GET_GLOBAL", chunk, offset, heap),
        op::DEFINE_LOCAL => byte_instruction(&mut out, "OP_DEFINE_LOCAL", chunk, offset),
        op::GET_LOCAL => byte_instruction(&mut out, "OP_GET_LOCAL", chunk, offset),
        op::GET_UPVALUE => byte_instruction(&mut out, "OP_GET_UPVALUE", chunk, offset),
        op::CLOSE_UPVALUE => simple_instruction(&mut out, "OP_CLOSE_UPVALUE", offset),
        op::JUMP_FALSE => jump_instruction(&mut out, "OP_JUMP_FALSE", 1, chunk, offset),
        op::JUMP => jump_instruction(&mut out, "OP_JUMP", 1, chunk, offset),
        op::LOOP => jump_instruction(&mut out, "OP_LOOP", -1, chunk, offset),
        op::CALL => byte_instruction(&mut out, "OP_CALL", chunk, offset),
        op::CLOSURE => closure_instruction(&mut out, chunk, offset, heap),
        op::RETURN => simple_instruction(&mut out, "OP_RETURN", offset),
        unknown => {
            let _ = write!(out, "Unknown opcode {unknown}");
            offset + 1
        }
    };

    (out, next)
}

fn simple_instruction(out: &mut String, name: &str, offset: usize) -> usize {
    out.push_str(name);
    offset + 1
}

fn constant_instruction(
    out: &mut String,
    name: &str,
    chunk: &Chunk,
    offset: usize,
    heap: &Heap,
) -> usize {
    let constant = chunk.code[offset + 1];
    let rendered = value_to_string(chunk.constants[constant as usize], heap);
    let _ = write!(out, "{name:<16} {constant:4} '{rendered}'");
    offset + 2
}

fn byte_instruction(out: &mut String, name: &str, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.code[offset + 1];
    let _ = write!(out, "{name:<16} {slot:4}");
    offset + 2
}

fn jump_instruction(out: &mut String, name: &str, sign: i64, chunk: &Chunk, offset: usize) -> usize {
    let jump = u16::from_be_bytes([chunk.code[offset + 1], chunk.code[offset + 2]]);
    let target = offset as i64 + 3 + sign * i64::from(jump);
    let _ = write!(out, "{name:<16} {offset:4} -> {target}");
    offset + 3
}

fn closure_instruction(out: &mut String, chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    let constant = chunk.code[offset + 1];
    let function_value = chunk.constants[constant as usize];
    let rendered = value_to_string(function_value, heap);
    let _ = write!(out, "{:<16} {constant:4} {rendered}", "OP_CLOSURE");

    let mut next = offset + 2;
    let upvalue_count = heap.function(function_value.as_object()).upvalue_count;
    for _ in 0..upvalue_count {
        let is_local = chunk.code[next];
        let index = chunk.code[next + 1];
        let kind = if is_local == 1 { "local" } else { "upvalue" };
        let _ = write!(out, "\n{next:04}    |                     {kind} {index}");
        next += 2;
    }

    next
}
