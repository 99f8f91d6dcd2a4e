// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Control-flow and literal special forms: `if`, `and`, `or`, `while`,
//! quoted lists, and brace dict literals.

use crate::chunk::op;
use crate::scanner::TokenKind;

use super::{Compiler, MAX_ARGS};

impl Compiler<'_, '_> {
    /// `(if cond then else?)` - the else branch defaults to `null`.
    pub(super) fn if_expr(&mut self) {
        self.expression();

        let then_jump = self.emit_jump(op::JUMP_FALSE);
        self.emit_byte(op::POP);
        self.expression();

        let else_jump = self.emit_jump(op::JUMP);
        self.patch_jump(then_jump);

        self.emit_byte(op::POP);
        if self.match_token(TokenKind::RightParen) {
            self.emit_byte(op::NULL);
        } else {
            self.expression();
            self.consume(TokenKind::RightParen, "Expect ')' at end of if expression.");
        }

        self.patch_jump(else_jump);
    }

    /// `(and e*)` - short-circuits on the first falsey operand, which
    /// becomes the result. `(and)` is `true`.
    pub(super) fn and_expr(&mut self) {
        let mut jumps = Vec::new();

        while !self.check(TokenKind::RightParen) {
            if self.check(TokenKind::Eof) {
                self.error("Unexpected end of file");
                return;
            }
            if jumps.len() > MAX_ARGS {
                self.error("Too many arguments in s-expression.");
                return;
            }

            self.expression();
            jumps.push(self.emit_jump(op::JUMP_FALSE));
            self.emit_byte(op::POP);
        }

        // The last operand's value is the result: drop its trailing POP.
        if jumps.is_empty() {
            self.emit_byte(op::TRUE);
        } else {
            self.current_chunk().rewind_last();
        }

        for jump in jumps {
            self.patch_jump(jump);
        }

        self.advance();
    }

    /// `(or e*)` - short-circuits on the first truthy operand, which
    /// becomes the result. `(or)` is `false`.
    pub(super) fn or_expr(&mut self) {
        let mut jumps = Vec::new();

        while !self.check(TokenKind::RightParen) {
            if self.check(TokenKind::Eof) {
                self.error("Unexpected end of file");
                return;
            }
            if jumps.len() > MAX_ARGS {
                self.error("Too many arguments in s-expression.");
                return;
            }

            self.expression();

            let skip = self.emit_jump(op::JUMP_FALSE);
            jumps.push(self.emit_jump(op::JUMP));
            self.patch_jump(skip);
            self.emit_byte(op::POP);
        }

        // A falsey final operand is still the result: drop its POP.
        if jumps.is_empty() {
            self.emit_byte(op::FALSE);
        } else {
            self.current_chunk().rewind_last();
        }

        for jump in jumps {
            self.patch_jump(jump);
        }

        self.advance();
    }

    /// `(while cond body*)` - evaluates to `null` once the condition goes
    /// falsey.
    pub(super) fn while_expr(&mut self) {
        let loop_start = self.current_chunk().code.len();
        self.expression();

        let exit_jump = self.emit_jump(op::JUMP_FALSE);
        self.emit_byte(op::POP);

        while !self.check(TokenKind::RightParen) {
            if self.check(TokenKind::Eof) {
                self.error("Unexpected end of file");
                return;
            }
            self.expression();
            self.emit_byte(op::POP);
        }

        self.emit_loop(loop_start);
        self.patch_jump(exit_jump);
        self.emit_byte(op::POP);
        self.emit_byte(op::NULL);
        self.advance();
    }

    /// `'(e*)` - lexically rewritten to `(list e*)`.
    pub(super) fn quote_list(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after quote.");
        self.named_variable("list");

        let mut arg_count: usize = 0;
        while !self.match_token(TokenKind::RightParen) {
            if self.check(TokenKind::Eof) {
                self.error("Unexpected end of file.");
                return;
            }

            self.expression();

            if arg_count == MAX_ARGS {
                self.error("Can't have more than 255 arguments.");
            }
            arg_count += 1;
        }

        self.emit_bytes(op::CALL, arg_count.min(MAX_ARGS) as u8);
    }

    /// `{e*}` - rewritten to `(dict e*)`; `dict` resolves through the
    /// normal variable lookup.
    pub(super) fn dict_literal(&mut self) {
        self.named_variable("dict");

        let mut arg_count: usize = 0;
        while !self.match_token(TokenKind::RightBrace) {
            if self.check(TokenKind::Eof) {
                self.error("Unexpected end of file.");
                return;
            }

            self.expression();

            if arg_count == MAX_ARGS {
                self.error("Can't have more than 255 arguments.");
            }
            arg_count += 1;
        }

        self.emit_bytes(op::CALL, arg_count.min(MAX_ARGS) as u8);
    }
}
