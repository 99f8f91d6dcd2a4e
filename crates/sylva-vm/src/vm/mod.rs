// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The Sylva virtual machine.
//!
//! Executes compiled bytecode over a single value stack and a stack of
//! call frames. Each frame windows the value stack: `slots` points at the
//! callee itself, parameters and locals follow. `CALL` dispatches on the
//! callee - closures push a frame, natives run inline against the
//! argument window.
//!
//! Upvalues captured by `CLOSURE` start open, impersonating a stack slot;
//! `RETURN` (and `CLOSE_UPVALUE`) close every upvalue at or above the
//! vanishing slots, moving the values into the upvalue cells. The open
//! list stays sorted by strictly descending slot with no duplicates.
//!
//! Runtime errors print the message and a stack trace, unwind every
//! frame, and end the current `interpret` call.

#[cfg(test)]
mod vm_test;

use std::time::Instant;

use crate::chunk::op;
use crate::compiler;
use crate::heap::{ClosureObj, Heap, Marker, NativeObj, Object, TraceRoots, Upvalue};
use crate::natives::{self, NativeCtx, NativeError, NativeFn};
use crate::table::Table;
use crate::value::{ObjRef, Value, value_to_string};

/// Maximum call depth.
pub const FRAME_MAX: usize = 64;

/// Value stack capacity.
pub const STACK_MAX: usize = FRAME_MAX * 256;

/// Result of interpreting a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    /// The script ran to completion.
    Ok,
    /// The source failed to compile.
    CompileError,
    /// Execution failed; the stack has been reset.
    RuntimeError,
}

/// Runtime error during VM execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A global lookup found nothing.
    UndefinedVariable(String),
    /// Wrong number of arguments in a closure call.
    ArityMismatch {
        /// Number of parameters the function expects.
        expected: usize,
        /// Number of arguments actually provided.
        got: usize,
    },
    /// The callee was not a closure or native function.
    NotCallable,
    /// Too many nested call frames.
    StackOverflow,
    /// A native function failed.
    Native(NativeError),
}

impl core::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UndefinedVariable(name) => write!(f, "Undefined variable '{name}'."),
            Self::ArityMismatch { expected, got } => {
                write!(f, "Expected {expected} arguments but got {got}.")
            }
            Self::NotCallable => write!(f, "Can only call functions."),
            Self::StackOverflow => write!(f, "Stack overflow."),
            Self::Native(e) => write!(f, "{e}"),
        }
    }
}

impl From<NativeError> for RuntimeError {
    fn from(e: NativeError) -> Self {
        Self::Native(e)
    }
}

/// Why a source buffer failed to execute.
#[derive(Debug)]
pub enum ScriptError {
    /// Compile errors, already reported to stderr.
    Compile(Vec<String>),
    /// A runtime error, already reported with its stack trace.
    Runtime(RuntimeError),
}

/// A call frame: the active closure, its instruction pointer, and the
/// base of its stack window.
pub(crate) struct CallFrame {
    closure: ObjRef,
    ip: usize,
    slots: usize,
}

/// The VM's root view, handed to the collector on every allocation: the
/// value stack, every frame's closure, the open upvalues, and the globals.
pub struct VmRoots<'a> {
    pub(crate) stack: &'a [Value],
    pub(crate) frames: &'a [CallFrame],
    pub(crate) open_upvalues: &'a [ObjRef],
    pub(crate) globals: &'a Table,
}

impl TraceRoots for VmRoots<'_> {
    fn trace_roots(&self, marker: &mut Marker<'_>) {
        for &value in self.stack {
            marker.mark_value(value);
        }
        for frame in self.frames {
            marker.mark_object(frame.closure);
        }
        for &upvalue in self.open_upvalues {
            marker.mark_object(upvalue);
        }
        marker.mark_table(self.globals);
    }
}

/// The virtual machine. One instance owns all mutable interpreter state,
/// so embedders can run several machines side by side.
pub struct Vm {
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    /// Open upvalues, sorted by strictly descending stack slot.
    open_upvalues: Vec<ObjRef>,
    started: Instant,
}

impl Vm {
    /// Create a VM with the native catalog registered in its globals.
    #[must_use]
    pub fn new() -> Self {
        let mut vm = Self {
            heap: Heap::new(),
            stack: Vec::with_capacity(STACK_MAX),
            frames: Vec::with_capacity(FRAME_MAX),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            started: Instant::now(),
        };

        for &(name, function) in natives::NATIVES {
            vm.define_native(name, function);
        }

        vm
    }

    /// The VM's heap (used by embedders to render returned values).
    #[must_use]
    pub const fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Compile and execute a source buffer, printing the script's value
    /// on success.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        match self.run_source(source) {
            Ok(value) => {
                println!("{}", value_to_string(value, &self.heap));
                InterpretResult::Ok
            }
            Err(ScriptError::Compile(_)) => InterpretResult::CompileError,
            Err(ScriptError::Runtime(_)) => InterpretResult::RuntimeError,
        }
    }

    /// Compile and execute a source buffer, returning the script's value.
    ///
    /// # Errors
    ///
    /// Returns the compile reports or the runtime error; both have
    /// already been printed to stderr.
    pub fn run_source(&mut self, source: &str) -> Result<Value, ScriptError> {
        let function = compiler::compile(source, &mut self.heap, &self.globals)
            .map_err(ScriptError::Compile)?;

        // Pin the function while the wrapping closure is allocated.
        self.stack.push(Value::object(function));
        let closure = self.alloc(Object::Closure(ClosureObj {
            function,
            upvalues: Vec::new(),
        }));
        self.stack.pop();
        self.stack.push(Value::object(closure));

        let result = self
            .call_closure(closure, 0)
            .and_then(|()| self.run())
            .map_err(|error| {
                self.report_runtime_error(&error);
                ScriptError::Runtime(error)
            })?;
        Ok(result)
    }

    // --- Stack primitives ---

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        match self.stack.pop() {
            Some(value) => value,
            None => unreachable!("value stack underflow"),
        }
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    // --- Allocation with the VM's roots ---

    fn alloc(&mut self, object: Object) -> ObjRef {
        let roots = VmRoots {
            stack: &self.stack,
            frames: &self.frames,
            open_upvalues: &self.open_upvalues,
            globals: &self.globals,
        };
        self.heap.allocate(object, &roots)
    }

    fn alloc_intern(&mut self, chars: &str) -> ObjRef {
        let roots = VmRoots {
            stack: &self.stack,
            frames: &self.frames,
            open_upvalues: &self.open_upvalues,
            globals: &self.globals,
        };
        self.heap.intern(chars, &roots)
    }

    /// Register a native under its name. Both objects are pinned on the
    /// stack until the global binding holds them.
    fn define_native(&mut self, name: &str, function: NativeFn) {
        let name_ref = self.alloc_intern(name);
        self.push(Value::object(name_ref));
        let native = self.alloc(Object::Native(NativeObj { function }));
        self.push(Value::object(native));

        let hash = self.heap.string_hash(name_ref);
        self.globals
            .set(Value::object(name_ref), hash, Value::object(native));

        self.pop();
        self.pop();
    }

    // --- Instruction stream ---

    fn current_frame(&self) -> &CallFrame {
        &self.frames[self.frames.len() - 1]
    }

    fn current_frame_mut(&mut self) -> &mut CallFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn read_byte(&mut self) -> u8 {
        let last = self.frames.len() - 1;
        let closure = self.frames[last].closure;
        let function = self.heap.closure(closure).function;
        let ip = self.frames[last].ip;
        let byte = self.heap.function(function).chunk.code[ip];
        self.frames[last].ip = ip + 1;
        byte
    }

    fn read_short(&mut self) -> u16 {
        let hi = self.read_byte();
        let lo = self.read_byte();
        u16::from_be_bytes([hi, lo])
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        let closure = self.current_frame().closure;
        let function = self.heap.closure(closure).function;
        self.heap.function(function).chunk.constants[index]
    }

    // --- Execution ---

    /// The dispatch loop: fetch, decode, execute until the script's
    /// `RETURN` pops the last frame.
    fn run(&mut self) -> Result<Value, RuntimeError> {
        loop {
            #[cfg(feature = "trace-execution")]
            self.trace_instruction();

            let instruction = self.read_byte();
            match instruction {
                op::CONSTANT => {
                    let constant = self.read_constant();
                    self.push(constant);
                }
                op::NULL => self.push(Value::NULL),
                op::TRUE => self.push(Value::TRUE),
                op::FALSE => self.push(Value::FALSE),
                op::POP => {
                    self.pop();
                }
                op::DEFINE_GLOBAL => {
                    let name = self.read_constant();
                    let hash = self.heap.string_hash(name.as_object());
                    let value = self.peek(0);
                    self.globals.set(name, hash, value);
                }
                op::GET_GLOBAL => {
                    let name = self.read_constant();
                    let hash = self.heap.string_hash(name.as_object());
                    match self.globals.get(name, hash) {
                        Some(value) => self.push(value),
                        None => {
                            let chars = self.heap.string_chars(name.as_object()).to_string();
                            return Err(RuntimeError::UndefinedVariable(chars));
                        }
                    }
                }
                op::DEFINE_LOCAL => {
                    let slot = self.read_byte() as usize;
                    let base = self.current_frame().slots;
                    let value = self.peek(0);
                    self.stack[base + slot] = value;
                    self.push(value);
                }
                op::GET_LOCAL => {
                    let slot = self.read_byte() as usize;
                    let base = self.current_frame().slots;
                    self.push(self.stack[base + slot]);
                }
                op::GET_UPVALUE => {
                    let slot = self.read_byte() as usize;
                    let closure = self.current_frame().closure;
                    let upvalue = self.heap.closure(closure).upvalues[slot];
                    let value = match *self.heap.upvalue(upvalue) {
                        Upvalue::Open(index) => self.stack[index],
                        Upvalue::Closed(value) => value,
                    };
                    self.push(value);
                }
                op::CLOSE_UPVALUE => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(top);
                    self.pop();
                }
                op::JUMP_FALSE => {
                    let offset = self.read_short() as usize;
                    if self.peek(0).is_falsey() {
                        self.current_frame_mut().ip += offset;
                    }
                }
                op::JUMP => {
                    let offset = self.read_short() as usize;
                    self.current_frame_mut().ip += offset;
                }
                op::LOOP => {
                    let offset = self.read_short() as usize;
                    self.current_frame_mut().ip -= offset;
                }
                op::CALL => {
                    let arg_count = self.read_byte() as usize;
                    let callee = self.peek(arg_count);
                    self.call_value(callee, arg_count)?;
                }
                op::CLOSURE => {
                    let function = self.read_constant().as_object();
                    let upvalue_count = self.heap.function(function).upvalue_count;

                    // Pin the closure on the stack while upvalues are
                    // captured; each capture may allocate.
                    let closure = self.alloc(Object::Closure(ClosureObj {
                        function,
                        upvalues: Vec::with_capacity(upvalue_count),
                    }));
                    self.push(Value::object(closure));

                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte() == 1;
                        let index = self.read_byte() as usize;
                        let captured = if is_local {
                            let base = self.current_frame().slots;
                            self.capture_upvalue(base + index)
                        } else {
                            let enclosing = self.current_frame().closure;
                            self.heap.closure(enclosing).upvalues[index]
                        };
                        self.heap.closure_mut(closure).upvalues.push(captured);
                    }
                }
                op::RETURN => {
                    let result = self.pop();
                    let Some(frame) = self.frames.pop() else {
                        unreachable!("call frame stack underflow");
                    };
                    self.close_upvalues(frame.slots);

                    if self.frames.is_empty() {
                        // The script closure itself.
                        self.pop();
                        return Ok(result);
                    }

                    self.stack.truncate(frame.slots);
                    self.push(result);
                }
                _ => unreachable!("unknown opcode"),
            }
        }
    }

    // --- Calls ---

    fn call_value(&mut self, callee: Value, arg_count: usize) -> Result<(), RuntimeError> {
        if !callee.is_object() {
            return Err(RuntimeError::NotCallable);
        }
        let object = callee.as_object();

        if let Object::Native(native) = self.heap.object(object) {
            let function = native.function;
            return self.call_native(function, arg_count);
        }
        if matches!(self.heap.object(object), Object::Closure(_)) {
            return self.call_closure(object, arg_count);
        }
        Err(RuntimeError::NotCallable)
    }

    fn call_closure(&mut self, closure: ObjRef, arg_count: usize) -> Result<(), RuntimeError> {
        let function = self.heap.closure(closure).function;
        let arity = self.heap.function(function).arity;

        if arg_count != arity {
            return Err(RuntimeError::ArityMismatch {
                expected: arity,
                got: arg_count,
            });
        }
        if self.frames.len() == FRAME_MAX {
            return Err(RuntimeError::StackOverflow);
        }

        self.frames.push(CallFrame {
            closure,
            ip: 0,
            // -1 to account for the callee sitting below its arguments
            slots: self.stack.len() - arg_count - 1,
        });
        Ok(())
    }

    fn call_native(&mut self, function: NativeFn, arg_count: usize) -> Result<(), RuntimeError> {
        let from = self.stack.len() - arg_count;

        let result = {
            let heap = &mut self.heap;
            let roots = VmRoots {
                stack: &self.stack,
                frames: &self.frames,
                open_upvalues: &self.open_upvalues,
                globals: &self.globals,
            };
            let mut ctx = NativeCtx {
                heap,
                roots,
                started: self.started,
            };
            function(&mut ctx, &self.stack[from..])
        };

        let value = result?;
        // Drop the arguments and the callee, push the result.
        self.stack.truncate(from - 1);
        self.push(value);
        Ok(())
    }

    // --- Upvalues ---

    /// Find or create the open upvalue for a stack slot, keeping the open
    /// list sorted by descending slot.
    fn capture_upvalue(&mut self, slot: usize) -> ObjRef {
        let mut insert_at = self.open_upvalues.len();
        for (index, &upvalue) in self.open_upvalues.iter().enumerate() {
            match *self.heap.upvalue(upvalue) {
                Upvalue::Open(existing) => {
                    if existing == slot {
                        return upvalue;
                    }
                    if existing < slot {
                        insert_at = index;
                        break;
                    }
                }
                Upvalue::Closed(_) => unreachable!("closed upvalue in open list"),
            }
        }

        let created = self.alloc(Object::Upvalue(Upvalue::Open(slot)));
        self.open_upvalues.insert(insert_at, created);
        created
    }

    /// Close every open upvalue at or above `last`: copy the stack value
    /// into the upvalue and drop it from the open list.
    fn close_upvalues(&mut self, last: usize) {
        while let Some(&upvalue) = self.open_upvalues.first() {
            let slot = match *self.heap.upvalue(upvalue) {
                Upvalue::Open(slot) => slot,
                Upvalue::Closed(_) => unreachable!("closed upvalue in open list"),
            };
            if slot < last {
                break;
            }

            let value = self.stack[slot];
            *self.heap.upvalue_mut(upvalue) = Upvalue::Closed(value);
            self.open_upvalues.remove(0);
        }
    }

    // --- Error reporting ---

    /// Print the message and a stack trace from the top frame down, then
    /// unwind everything.
    fn report_runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("{error}");

        for frame in self.frames.iter().rev() {
            let function = self.heap.closure(frame.closure).function;
            let function = self.heap.function(function);
            let instruction = frame.ip.saturating_sub(1);
            let line = function.chunk.lines.get(instruction).copied().unwrap_or(0);
            match function.name {
                Some(name) => {
                    eprintln!("[line {line}] in {}()", self.heap.string_chars(name));
                }
                None => eprintln!("[line {line}] in script"),
            }
        }

        self.reset_stack();
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    // --- Tracing ---

    #[cfg(feature = "trace-execution")]
    fn trace_instruction(&self) {
        let mut rendered = String::from("        ");
        for &value in &self.stack {
            rendered.push_str("[ ");
            rendered.push_str(&value_to_string(value, &self.heap));
            rendered.push_str(" ]");
        }
        eprintln!("{rendered}");

        let frame = self.current_frame();
        let function = self.heap.closure(frame.closure).function;
        let chunk = &self.heap.function(function).chunk;
        let (line, _) = crate::chunk::disassemble_instruction(chunk, frame.ip, &self.heap);
        eprintln!("{line}");
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
