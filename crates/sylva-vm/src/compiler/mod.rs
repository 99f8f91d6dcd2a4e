// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Single-pass compiler from Sylva s-expressions to bytecode.
//!
//! The compiler drives the scanner directly: there is no AST. Each
//! expression compiles to code with a net stack effect of exactly +1, and
//! the top level emits a `POP` after every expression so expressions act
//! as statements. When the input ends, the final `POP` is rewritten to
//! `RETURN` so the script's last value becomes its result.
//!
//! One compiler frame is live per `lambda` being compiled, stacked on the
//! frame for the surrounding script. A frame owns the locals of its
//! function; identifier resolution walks locals innermost-first, then
//! captures upvalues through the enclosing frames, and finally falls back
//! to a global lookup by name.
//!
//! The first error switches the parser into panic mode, which suppresses
//! cascaded reports until `synchronize` escapes to the outermost paren
//! depth. A failed compile returns the collected reports instead of a
//! function.


mod fn_compile;
mod forms;

use crate::chunk::{Chunk, op};
use crate::heap::{FunctionObj, Heap, Marker, Object, TraceRoots};
use crate::scanner::{Scanner, Token, TokenKind};
use crate::table::Table;
use crate::value::{ObjRef, Value};

/// Maximum locals per function (one-byte slot operands).
const MAX_LOCALS: usize = 256;

/// Maximum captured upvalues per function.
const MAX_UPVALUES: usize = 256;

/// Highest constant-pool index that fits in a one-byte operand.
const MAX_CONSTANTS: usize = 255;

/// Maximum arguments at a call site.
const MAX_ARGS: usize = 255;

/// Compile a source buffer into the top-level script function.
///
/// # Errors
///
/// Returns the error reports (already printed to stderr) if the source
/// failed to compile.
pub fn compile(source: &str, heap: &mut Heap, globals: &Table) -> Result<ObjRef, Vec<String>> {
    let mut compiler = Compiler::new(source, heap, globals);
    compiler.push_compiler(FunctionKind::Script);

    compiler.advance();
    while !compiler.match_token(TokenKind::Eof) {
        compiler.expression();
        compiler.emit_byte(op::POP);
        compiler.note_statement();
    }

    let (function, _) = compiler.end_compiler();
    if compiler.parser.had_error {
        Err(compiler.parser.errors)
    } else {
        Ok(function)
    }
}

/// Whether a frame compiles the whole script or one `lambda`.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Script,
    Lambda,
}

/// A local variable: its storage is a stack slot in the call frame.
struct Local<'src> {
    name: &'src str,
    depth: i32,
    /// Set when an inner lambda closes over this local.
    is_captured: bool,
}

/// A captured variable descriptor, emitted as a `CLOSURE` operand pair.
#[derive(Clone, Copy, PartialEq, Eq)]
struct UpvalueDesc {
    index: u8,
    is_local: bool,
}

/// Per-function compiler state.
struct FunctionCompiler<'src> {
    /// Interned function name; `lambda` until `def` retro-names it.
    name: Option<ObjRef>,
    arity: usize,
    chunk: Chunk,
    locals: Vec<Local<'src>>,
    upvalues: Vec<UpvalueDesc>,
    scope_depth: i32,
    /// Statement `POP`s emitted; a positive count means the last byte of
    /// the chunk is a `POP` that can be rewritten into `RETURN`.
    statements: usize,
}

/// Parser state, shared by every compiler frame.
struct Parser<'src> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    had_error: bool,
    /// Suppresses cascaded error reports after the first one.
    panic_mode: bool,
    paren_depth: i32,
    errors: Vec<String>,
}

/// Root view of an in-flight compile: everything the collector must keep
/// alive while the compiler allocates strings and functions.
struct CompileRoots<'a, 'src> {
    frames: &'a [FunctionCompiler<'src>],
    globals: &'a Table,
}

impl TraceRoots for CompileRoots<'_, '_> {
    fn trace_roots(&self, marker: &mut Marker<'_>) {
        for frame in self.frames {
            if let Some(name) = frame.name {
                marker.mark_object(name);
            }
            for &constant in &frame.chunk.constants {
                marker.mark_value(constant);
            }
        }
        marker.mark_table(self.globals);
    }
}

/// The compiler: parser plus the stack of function frames.
struct Compiler<'src, 'h> {
    parser: Parser<'src>,
    frames: Vec<FunctionCompiler<'src>>,
    heap: &'h mut Heap,
    globals: &'h Table,
}

impl<'src, 'h> Compiler<'src, 'h> {
    fn new(source: &'src str, heap: &'h mut Heap, globals: &'h Table) -> Self {
        let placeholder = Token {
            kind: TokenKind::Eof,
            lexeme: "",
            line: 0,
        };
        Self {
            parser: Parser {
                scanner: Scanner::new(source),
                current: placeholder,
                previous: placeholder,
                had_error: false,
                panic_mode: false,
                paren_depth: 0,
                errors: Vec::new(),
            },
            frames: Vec::new(),
            heap,
            globals,
        }
    }

    // --- Token plumbing ---

    fn advance(&mut self) {
        self.parser.previous = self.parser.current;

        loop {
            self.parser.current = self.parser.scanner.scan_token();
            if self.parser.current.kind != TokenKind::Error {
                break;
            }
            let message = self.parser.current.lexeme;
            self.error_at_current(message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.parser.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.parser.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    // --- Error reporting ---

    fn error(&mut self, message: &str) {
        let token = self.parser.previous;
        self.error_at(&token, message);
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.parser.current;
        self.error_at(&token, message);
    }

    fn error_at(&mut self, token: &Token<'_>, message: &str) {
        if self.parser.panic_mode {
            return;
        }
        self.parser.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => " at end".to_string(),
            TokenKind::Error => String::new(),
            _ => format!(" at '{}'", token.lexeme),
        };
        let report = format!("[line {}] Error{location}: {message}", token.line);
        eprintln!("{report}");

        self.parser.errors.push(report);
        self.parser.had_error = true;
    }

    /// Skip tokens until the paren depth returns to the top level, so one
    /// mistake does not drown the user in follow-on reports.
    fn synchronize(&mut self) {
        self.parser.panic_mode = false;

        while self.parser.current.kind != TokenKind::Eof {
            if self.parser.paren_depth == 0 {
                return;
            }
            match self.parser.current.kind {
                TokenKind::LeftParen => self.parser.paren_depth += 1,
                TokenKind::RightParen => self.parser.paren_depth -= 1,
                _ => {}
            }
            self.advance();
        }
    }

    // --- Emission ---

    fn current_chunk(&mut self) -> &mut Chunk {
        let last = self.frames.len() - 1;
        &mut self.frames[last].chunk
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.parser.previous.line;
        self.current_chunk().write(byte, line);
    }

    fn emit_bytes(&mut self, byte1: u8, byte2: u8) {
        self.emit_byte(byte1);
        self.emit_byte(byte2);
    }

    /// Emit a jump with a placeholder offset; returns the patch site.
    fn emit_jump(&mut self, instruction: u8) -> usize {
        self.emit_byte(instruction);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().code.len() - 2
    }

    /// Backfill a forward jump to land just past the current end of code.
    fn patch_jump(&mut self, offset: usize) {
        // -2 to step back over the jump's own operand
        let jump = self.current_chunk().code.len() - offset - 2;

        if jump > usize::from(u16::MAX) {
            self.error("Too much code to jump over.");
        }

        let bytes = (jump as u16).to_be_bytes();
        let chunk = self.current_chunk();
        chunk.code[offset] = bytes[0];
        chunk.code[offset + 1] = bytes[1];
    }

    /// Emit a backward jump to `loop_start`.
    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_byte(op::LOOP);

        let offset = self.current_chunk().code.len() - loop_start + 2;
        if offset > usize::from(u16::MAX) {
            self.error("Loop body too large.");
        }

        let bytes = (offset as u16).to_be_bytes();
        self.emit_byte(bytes[0]);
        self.emit_byte(bytes[1]);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let constant = self.current_chunk().add_constant(value);
        if constant > MAX_CONSTANTS {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        constant as u8
    }

    fn emit_constant(&mut self, value: Value) {
        let constant = self.make_constant(value);
        self.emit_bytes(op::CONSTANT, constant);
    }

    /// Intern a string while keeping the compile's roots visible to a
    /// collection the allocation might trigger.
    fn intern(&mut self, chars: &str) -> ObjRef {
        let roots = CompileRoots {
            frames: &self.frames,
            globals: self.globals,
        };
        self.heap.intern(chars, &roots)
    }

    fn note_statement(&mut self) {
        let last = self.frames.len() - 1;
        self.frames[last].statements += 1;
    }

    // --- Compiler frames ---

    fn push_compiler(&mut self, kind: FunctionKind) {
        let name = match kind {
            FunctionKind::Script => None,
            FunctionKind::Lambda => Some(self.intern("lambda")),
        };

        // Slot 0 holds the callee itself; reserve it with an empty name.
        let locals = vec![Local {
            name: "",
            depth: 0,
            is_captured: false,
        }];

        self.frames.push(FunctionCompiler {
            name,
            arity: 0,
            chunk: Chunk::new(),
            locals,
            upvalues: Vec::new(),
            scope_depth: 0,
            statements: 0,
        });
    }

    /// Finish the innermost function: append its `RETURN`, pop the frame,
    /// and allocate the function object.
    ///
    /// Returns the function and its upvalue descriptors (the caller emits
    /// them as `CLOSURE` operands).
    fn end_compiler(&mut self) -> (ObjRef, Vec<UpvalueDesc>) {
        self.emit_return();

        let Some(frame) = self.frames.pop() else {
            unreachable!("compiler frame stack underflow");
        };
        for local in &frame.locals {
            if local.is_captured {
                tracing::trace!(name = local.name, "local captured by closure");
            }
        }
        let upvalues = frame.upvalues;

        let function = Object::Function(FunctionObj {
            arity: frame.arity,
            upvalue_count: upvalues.len(),
            chunk: frame.chunk,
            name: frame.name,
        });
        let roots = CompileRoots {
            frames: &self.frames,
            globals: self.globals,
        };
        let function = self.heap.allocate(function, &roots);

        #[cfg(feature = "print-code")]
        if !self.parser.had_error {
            let f = self.heap.function(function);
            let name = f.name.map_or("<script>", |n| self.heap.string_chars(n));
            eprintln!(
                "{}",
                crate::chunk::disassemble_chunk(&f.chunk, name, self.heap)
            );
        }

        (function, upvalues)
    }

    /// Turn the trailing statement `POP` into the function's `RETURN`. A
    /// body with no statements returns `null` instead.
    fn emit_return(&mut self) {
        let last = self.frames.len() - 1;
        if self.frames[last].statements > 0 {
            self.current_chunk().overwrite_last(op::RETURN);
        } else {
            self.emit_byte(op::NULL);
            self.emit_byte(op::RETURN);
        }
    }

    fn begin_scope(&mut self) {
        let last = self.frames.len() - 1;
        self.frames[last].scope_depth += 1;
    }

    // --- Expressions ---

    fn expression(&mut self) {
        self.advance();
        self.compile_operator();

        if self.parser.panic_mode {
            self.synchronize();
        }
    }

    /// Compile the expression introduced by `parser.previous`.
    fn compile_operator(&mut self) {
        match self.parser.previous.kind {
            TokenKind::LeftParen => self.sexpression(),
            TokenKind::Identifier | TokenKind::Not => self.variable(),
            TokenKind::Number => self.number(),
            TokenKind::String => self.string(),
            TokenKind::True | TokenKind::False | TokenKind::Null => self.literal(),
            TokenKind::Quote => self.quote_list(),
            TokenKind::LeftBrace => self.dict_literal(),
            _ => self.error("Expect expression."),
        }
    }

    /// Compile the form after a `(`: a special form or a call.
    fn sexpression(&mut self) {
        self.parser.paren_depth += 1;
        self.advance();

        match self.parser.previous.kind {
            TokenKind::Def => self.def(),
            TokenKind::Lambda => self.lambda(),
            TokenKind::If => self.if_expr(),
            TokenKind::And => self.and_expr(),
            TokenKind::Or => self.or_expr(),
            TokenKind::While => self.while_expr(),
            _ => self.call(),
        }

        self.parser.paren_depth -= 1;
    }

    /// Compile a call: the operator token is the callee, then the
    /// arguments up to the closing paren.
    fn call(&mut self) {
        self.compile_operator();

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

    fn number(&mut self) {
        let value: f64 = self.parser.previous.lexeme.parse().unwrap_or(0.0);
        self.emit_constant(Value::number(value));
    }

    fn string(&mut self) {
        let lexeme = self.parser.previous.lexeme;
        let contents = &lexeme[1..lexeme.len() - 1];
        let interned = self.intern(contents);
        self.emit_constant(Value::object(interned));
    }

    fn literal(&mut self) {
        match self.parser.previous.kind {
            TokenKind::False => self.emit_byte(op::FALSE),
            TokenKind::Null => self.emit_byte(op::NULL),
            TokenKind::True => self.emit_byte(op::TRUE),
            _ => {}
        }
    }

    // --- Variables ---

    fn variable(&mut self) {
        let name = self.parser.previous.lexeme;
        self.named_variable(name);
    }

    /// Emit the load for a name: local slot, captured upvalue, or global.
    fn named_variable(&mut self, name: &str) {
        let last = self.frames.len() - 1;
        if let Some(slot) = self.resolve_local(last, name) {
            self.emit_bytes(op::GET_LOCAL, slot);
        } else if let Some(upvalue) = self.resolve_upvalue(last, name) {
            self.emit_bytes(op::GET_UPVALUE, upvalue);
        } else {
            let constant = self.identifier_constant(name);
            self.emit_bytes(op::GET_GLOBAL, constant);
        }
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let interned = self.intern(name);
        self.make_constant(Value::object(interned))
    }

    fn resolve_local(&self, frame: usize, name: &str) -> Option<u8> {
        let locals = &self.frames[frame].locals;
        for (index, local) in locals.iter().enumerate().rev() {
            if local.name == name {
                return Some(index as u8);
            }
        }
        None
    }

    /// Parse an identifier and declare it: a fresh (or reused) local slot
    /// in a scope, or a constant-pool name at the top level.
    fn parse_variable(&mut self, message: &str) -> (u8, &'src str) {
        self.consume(TokenKind::Identifier, message);
        let name = self.parser.previous.lexeme;

        match self.declare_variable(name) {
            Some(slot) => (slot, name),
            None => (self.identifier_constant(name), name),
        }
    }

    /// Declare a local for `name`, reusing the slot when the name is
    /// already bound in the current scope. Returns `None` at global scope.
    fn declare_variable(&mut self, name: &'src str) -> Option<u8> {
        let last = self.frames.len() - 1;
        if self.frames[last].scope_depth == 0 {
            return None;
        }

        let scope_depth = self.frames[last].scope_depth;
        let locals = &self.frames[last].locals;
        for (index, local) in locals.iter().enumerate().rev() {
            if local.depth < scope_depth {
                break;
            }
            if local.name == name {
                return Some(index as u8);
            }
        }

        self.add_local(name)
    }

    fn add_local(&mut self, name: &'src str) -> Option<u8> {
        let last = self.frames.len() - 1;
        if self.frames[last].locals.len() == MAX_LOCALS {
            self.error("Too many local variables in function.");
            return Some(0);
        }

        let depth = self.frames[last].scope_depth;
        self.frames[last].locals.push(Local {
            name,
            depth,
            is_captured: false,
        });
        Some((self.frames[last].locals.len() - 1) as u8)
    }

    fn define_variable(&mut self, index: u8) {
        let last = self.frames.len() - 1;
        let set_op = if self.frames[last].scope_depth == 0 {
            op::DEFINE_GLOBAL
        } else {
            op::DEFINE_LOCAL
        };
        self.emit_bytes(set_op, index);
    }
}
