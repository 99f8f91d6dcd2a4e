// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Built-in native functions.
//!
//! Natives are host operations invoked through the ordinary `CALL`
//! instruction: the callee is a `Native` heap object registered under its
//! name in the VM's globals at startup. A native receives the argument
//! window of the value stack and either returns a result value or an
//! error, which the VM surfaces as a runtime error.
//!
//! The arguments stay on the stack (and therefore reachable) for the
//! duration of the call; anything a native allocates is kept alive by the
//! root view in [`NativeCtx`].


mod arithmetic;
mod collection;
mod io;

use core::fmt;
use std::time::Instant;

use crate::heap::Heap;
use crate::value::Value;
use crate::vm::VmRoots;

/// A host callback. Must not retain the argument slice past the call.
pub type NativeFn = fn(&mut NativeCtx<'_>, &[Value]) -> Result<Value, NativeError>;

/// What a native may touch: the heap (for allocation) and the VM's root
/// view (so a triggered collection sees every live reference).
pub struct NativeCtx<'a> {
    /// The object heap.
    pub heap: &'a mut Heap,
    /// Roots of the calling VM, passed through to allocations.
    pub roots: VmRoots<'a>,
    /// When the VM was created; `clock` measures from here.
    pub started: Instant,
}

/// Native name/function registry, installed into the globals at VM
/// startup.
pub const NATIVES: &[(&str, NativeFn)] = &[
    ("+", arithmetic::add),
    ("*", arithmetic::multiply),
    ("-", arithmetic::subtract),
    ("/", arithmetic::divide),
    ("rem", arithmetic::remainder),
    ("<", arithmetic::less),
    (">", arithmetic::greater),
    ("=", arithmetic::equal),
    ("not", arithmetic::not),
    ("print", io::print),
    ("clock", io::clock),
    ("str", io::str_cat),
    ("list", collection::list),
    ("push", collection::push),
    ("push!", collection::push_in_place),
    ("first", collection::first),
    ("rest", collection::rest),
    ("len", collection::len),
    ("dict", collection::dict),
    ("set", collection::set),
    ("get", collection::get),
];

/// Failure of a native function. The VM reports the message as a runtime
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeError {
    /// An arithmetic operand was not a number.
    NotANumber,
    /// A native that requires arguments got none.
    NoArguments {
        /// The native's registered name.
        name: &'static str,
    },
    /// A single-argument native got more than one argument.
    ExtraArguments {
        /// The native's registered name.
        name: &'static str,
    },
    /// A comparison operand was not a number.
    NonNumberCompare {
        /// The comparison's registered name.
        name: &'static str,
    },
    /// Division or remainder by zero.
    DivideByZero,
    /// A native got the wrong number of arguments.
    WrongArity {
        /// The native's registered name.
        name: &'static str,
        /// Human-readable expected count.
        expected: &'static str,
    },
    /// `dict` got an odd number of arguments.
    OddDictArguments,
    /// A dict key was `null`.
    UnhashableKey,
    /// A list operation got a non-list.
    NotAList {
        /// The native's registered name.
        name: &'static str,
    },
    /// A dict operation got a non-dict.
    NotADict {
        /// The native's registered name.
        name: &'static str,
    },
    /// `len` of a value with no length.
    NoLength,
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => write!(f, "Operand must be a number."),
            Self::NoArguments { name } => {
                write!(f, "Attempted to call '{name}' with no arguments.")
            }
            Self::ExtraArguments { name } => {
                write!(f, "Attempted to call '{name}' with more than one argument.")
            }
            Self::NonNumberCompare { name } => write!(f, "Attempted '{name}' with non-number"),
            Self::DivideByZero => write!(f, "Attemped divide by zero"),
            Self::WrongArity { name, expected } => write!(
                f,
                "Attempted to call '{name}' with the wrong number of arguments (expected {expected})."
            ),
            Self::OddDictArguments => {
                write!(f, "Attempted to call 'dict' with an odd number of arguments.")
            }
            Self::UnhashableKey => write!(f, "Dict key must be hashable."),
            Self::NotAList { name } => {
                write!(f, "Attempted to call '{name}' with a non-list value.")
            }
            Self::NotADict { name } => {
                write!(f, "Attempted to call '{name}' with a non-dict value.")
            }
            Self::NoLength => {
                write!(f, "Attempted to call 'len' with a value that has no length.")
            }
        }
    }
}
