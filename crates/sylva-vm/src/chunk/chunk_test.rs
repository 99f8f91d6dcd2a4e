// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for chunks and the disassembler.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::heap::{Heap, NoRoots};

#[test]
fn write_keeps_code_and_lines_in_lockstep() {
    let mut chunk = Chunk::new();
    chunk.write(op::TRUE, 1);
    chunk.write(op::POP, 1);
    chunk.write(op::NULL, 2);

    assert_eq!(chunk.code, vec![op::TRUE, op::POP, op::NULL]);
    assert_eq!(chunk.lines, vec![1, 1, 2]);
}

#[test]
fn overwrite_last_replaces_the_final_byte() {
    let mut chunk = Chunk::new();
    chunk.write(op::TRUE, 1);
    chunk.write(op::POP, 1);

    chunk.overwrite_last(op::RETURN);
    assert_eq!(chunk.code, vec![op::TRUE, op::RETURN]);
    assert_eq!(chunk.lines.len(), 2);
}

#[test]
fn rewind_last_drops_the_final_byte_and_line() {
    let mut chunk = Chunk::new();
    chunk.write(op::TRUE, 1);
    chunk.write(op::POP, 2);

    chunk.rewind_last();
    assert_eq!(chunk.code, vec![op::TRUE]);
    assert_eq!(chunk.lines, vec![1]);
}

#[test]
fn add_constant_returns_sequential_indices() {
    let mut chunk = Chunk::new();
    assert_eq!(chunk.add_constant(Value::number(1.0)), 0);
    assert_eq!(chunk.add_constant(Value::number(2.0)), 1);
    assert_eq!(chunk.add_constant(Value::number(1.0)), 2);
}

#[test]
fn disassembles_simple_and_constant_instructions() {
    let mut heap = Heap::new();
    let s = heap.intern("greeting", &NoRoots);

    let mut chunk = Chunk::new();
    let constant = chunk.add_constant(Value::object(s)) as u8;
    chunk.write(op::CONSTANT, 3);
    chunk.write(constant, 3);
    chunk.write(op::RETURN, 3);

    let out = disassemble_chunk(&chunk, "test", &heap);
    assert!(out.starts_with("== test ==\n"), "{out}");
    assert!(out.contains("OP_CONSTANT"), "{out}");
    assert!(out.contains("'greeting'"), "{out}");
    assert!(out.contains("OP_RETURN"), "{out}");
}

#[test]
fn disassembly_marks_continued_lines() {
    let heap = Heap::new();

    let mut chunk = Chunk::new();
    chunk.write(op::TRUE, 1);
    chunk.write(op::POP, 1);
    chunk.write(op::NULL, 2);

    let (first, next) = disassemble_instruction(&chunk, 0, &heap);
    assert!(first.contains("   1 "), "{first}");
    let (second, next) = disassemble_instruction(&chunk, next, &heap);
    assert!(second.contains("   | "), "{second}");
    let (third, _) = disassemble_instruction(&chunk, next, &heap);
    assert!(third.contains("   2 "), "{third}");
}

#[test]
fn disassembles_jump_targets() {
    let heap = Heap::new();

    let mut chunk = Chunk::new();
    chunk.write(op::JUMP_FALSE, 1);
    chunk.write(0, 1);
    chunk.write(4, 1);
    chunk.write(op::LOOP, 1);
    chunk.write(0, 1);
    chunk.write(6, 1);

    let (jump, next) = disassemble_instruction(&chunk, 0, &heap);
    assert!(jump.contains("OP_JUMP_FALSE"), "{jump}");
    assert!(jump.contains("-> 7"), "{jump}");

    let (lp, _) = disassemble_instruction(&chunk, next, &heap);
    assert!(lp.contains("OP_LOOP"), "{lp}");
    assert!(lp.contains("-> 0"), "{lp}");
}
