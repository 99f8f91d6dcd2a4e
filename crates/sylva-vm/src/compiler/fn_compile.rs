// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Compilation of `lambda` and `def`, including upvalue capture.

use crate::chunk::op;
use crate::scanner::TokenKind;

use super::{Compiler, FunctionKind, MAX_UPVALUES, UpvalueDesc};

impl Compiler<'_, '_> {
    /// `(lambda (params*) body*)`
    ///
    /// Compiles the body in a fresh compiler frame, then emits `CLOSURE`
    /// with one `(is_local, index)` operand pair per captured upvalue.
    pub(super) fn lambda(&mut self) {
        self.push_compiler(FunctionKind::Lambda);
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after lambda keyword.");

        while !self.match_token(TokenKind::RightParen) {
            if self.check(TokenKind::Eof) {
                self.error("Unexpected end of file.");
                break;
            }

            let last = self.frames.len() - 1;
            self.frames[last].arity += 1;
            if self.frames[last].arity > 255 {
                self.error_at_current("Can't have more than 255 parameters.");
            }

            self.parse_variable("Expect parameter name.");
            if self.parser.panic_mode {
                break;
            }
        }

        while !self.match_token(TokenKind::RightParen) {
            if self.check(TokenKind::Eof) {
                self.error("Unexpected end of file.");
                break;
            }

            self.expression();
            self.emit_byte(op::POP);
            self.note_statement();
        }

        let (function, upvalues) = self.end_compiler();

        let constant = self.make_constant(crate::value::Value::object(function));
        self.emit_bytes(op::CLOSURE, constant);
        for upvalue in upvalues {
            self.emit_byte(u8::from(upvalue.is_local));
            self.emit_byte(upvalue.index);
        }
    }

    /// `(def name expr)`
    ///
    /// Declares the variable (a local slot in a scope, a named global at
    /// the top level) and, when the expression just compiled a function
    /// constant, attaches the variable's name to it before the binding
    /// becomes visible.
    pub(super) fn def(&mut self) {
        let (index, name) = self.parse_variable("Expect variable name.");

        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' at end of def expression.");

        let last = self.frames.len() - 1;
        if let Some(&constant) = self.frames[last].chunk.constants.last() {
            if self.heap.is_function(constant) {
                let name_ref = self.intern(name);
                self.heap.function_mut(constant.as_object()).name = Some(name_ref);
            }
        }

        self.define_variable(index);
    }

    /// Resolve `name` as an upvalue of `frame`, capturing through every
    /// intermediate frame. Returns the upvalue index in `frame`.
    pub(super) fn resolve_upvalue(&mut self, frame: usize, name: &str) -> Option<u8> {
        if frame == 0 {
            return None;
        }
        let enclosing = frame - 1;

        if let Some(local) = self.resolve_local(enclosing, name) {
            self.frames[enclosing].locals[local as usize].is_captured = true;
            return Some(self.add_upvalue(frame, local, true));
        }

        if let Some(upvalue) = self.resolve_upvalue(enclosing, name) {
            return Some(self.add_upvalue(frame, upvalue, false));
        }

        None
    }

    /// Add an upvalue descriptor to `frame`, deduplicating by
    /// `(index, is_local)`.
    fn add_upvalue(&mut self, frame: usize, index: u8, is_local: bool) -> u8 {
        let desc = UpvalueDesc { index, is_local };

        let existing = self.frames[frame].upvalues.iter().position(|&u| u == desc);
        if let Some(existing) = existing {
            return existing as u8;
        }

        if self.frames[frame].upvalues.len() == MAX_UPVALUES {
            self.error("Too many closure variables in function.");
            return 0;
        }

        self.frames[frame].upvalues.push(desc);
        (self.frames[frame].upvalues.len() - 1) as u8
    }
}
