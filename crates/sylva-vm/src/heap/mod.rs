// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Object heap and garbage collector.
//!
//! All heap objects live in a slot table indexed by [`ObjRef`]; every live
//! object occupies exactly one slot from allocation until the sweep that
//! frees it. Collection is precise, non-moving, non-generational
//! mark-and-sweep with an explicit grey worklist:
//!
//! 1. Mark roots (provided through [`TraceRoots`]) plus the children of a
//!    pending allocation.
//! 2. Trace: pop grey objects and mark their owned references.
//! 3. Purge unmarked keys from the interned string pool (it holds weak
//!    references).
//! 4. Sweep unmarked slots onto the free list and clear surviving marks.
//!
//! Allocation funnels through [`Heap::allocate`], which updates
//! `bytes_allocated` and triggers a collection when the total passes
//! `next_gc` (or on every allocation with the `stress-gc` feature).


use crate::chunk::Chunk;
use crate::natives::NativeFn;
use crate::table::Table;
use crate::value::{ObjRef, Value};

/// Heap growth factor applied to `next_gc` after each collection.
const GC_GROW_FACTOR: usize = 2;

/// Initial collection threshold in bytes.
const FIRST_GC: usize = 1024 * 1024;

/// An interned, immutable string.
pub struct StringObj {
    /// The string's characters.
    pub chars: Box<str>,
    /// Precomputed FNV-1a hash of the characters.
    pub hash: u32,
}

/// A compiled function: bytecode plus metadata. Compile-time artifact.
pub struct FunctionObj {
    /// Expected number of arguments.
    pub arity: usize,
    /// Number of values captured from enclosing scopes.
    pub upvalue_count: usize,
    /// The function's bytecode.
    pub chunk: Chunk,
    /// The name the function was bound to, if any. `None` for the script.
    pub name: Option<ObjRef>,
}

/// A built-in function implemented by the host.
pub struct NativeObj {
    /// The host callback invoked through `CALL`.
    pub function: NativeFn,
}

/// A function paired with its captured upvalues; the callable value at
/// runtime.
pub struct ClosureObj {
    /// The compiled function this closure executes.
    pub function: ObjRef,
    /// Captured upvalues, filled in by the `CLOSURE` instruction.
    pub upvalues: Vec<ObjRef>,
}

/// A captured variable.
///
/// While open it impersonates a stack slot; when that slot is about to
/// leave the stack the value moves into the upvalue itself.
pub enum Upvalue {
    /// Still on the stack, at this slot index.
    Open(usize),
    /// Closed over; the upvalue owns the value.
    Closed(Value),
}

/// A heap object. Adding a kind is a compile error in every match.
pub enum Object {
    String(StringObj),
    Function(FunctionObj),
    Native(NativeObj),
    Closure(ClosureObj),
    Upvalue(Upvalue),
    List(Vec<Value>),
    Dict(Table),
}

/// Marks objects grey during the root phase of a collection.
pub struct Marker<'h> {
    marks: &'h mut [bool],
    grey: &'h mut Vec<ObjRef>,
}

impl Marker<'_> {
    /// Mark a value's object, if it references one.
    pub fn mark_value(&mut self, value: Value) {
        if value.is_object() {
            self.mark_object(value.as_object());
        }
    }

    /// Mark an object grey if it has not been marked yet.
    pub fn mark_object(&mut self, r: ObjRef) {
        if !self.marks[r.index()] {
            self.marks[r.index()] = true;
            self.grey.push(r);
        }
    }

    /// Mark every key and value of a table.
    pub fn mark_table(&mut self, table: &Table) {
        for (key, value) in table.iter() {
            self.mark_value(key);
            self.mark_value(value);
        }
    }
}

/// Root enumeration for the collector.
///
/// The VM and the compiler each provide a view of their live references;
/// the heap never has to know what the mutator looks like.
pub trait TraceRoots {
    /// Mark every root reachable from this view.
    fn trace_roots(&self, marker: &mut Marker<'_>);
}

/// A root view with no roots at all. Only safe while no other object
/// reference is held across the allocation.
pub struct NoRoots;

impl TraceRoots for NoRoots {
    fn trace_roots(&self, _marker: &mut Marker<'_>) {}
}

/// The object heap.
pub struct Heap {
    slots: Vec<Option<Object>>,
    sizes: Vec<usize>,
    marks: Vec<bool>,
    free: Vec<u32>,
    /// Interned string pool: keys are `String` values, stored weakly.
    strings: Table,
    bytes_allocated: usize,
    next_gc: usize,
    grey: Vec<ObjRef>,
}

impl Heap {
    /// Create a new empty heap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            sizes: Vec::new(),
            marks: Vec::new(),
            free: Vec::new(),
            strings: Table::new(),
            bytes_allocated: 0,
            next_gc: FIRST_GC,
            grey: Vec::new(),
        }
    }

    /// Total bytes currently attributed to live objects.
    #[must_use]
    pub const fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    /// Number of live objects in the slot table.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Allocate an object, collecting garbage first if the heap has grown
    /// past its threshold.
    ///
    /// The pending object's children are traced as roots during a
    /// triggered collection, so references held only by `object` survive.
    pub fn allocate(&mut self, object: Object, roots: &dyn TraceRoots) -> ObjRef {
        let size = object_size(&object);

        if cfg!(feature = "stress-gc") || self.bytes_allocated + size > self.next_gc {
            self.collect(roots, Some(&object));
        }

        self.bytes_allocated += size;

        if let Some(index) = self.free.pop() {
            let index = index as usize;
            self.slots[index] = Some(object);
            self.sizes[index] = size;
            self.marks[index] = false;
            ObjRef::new(index as u32)
        } else {
            self.slots.push(Some(object));
            self.sizes.push(size);
            self.marks.push(false);
            ObjRef::new((self.slots.len() - 1) as u32)
        }
    }

    /// Run a full mark-and-sweep collection.
    pub fn collect(&mut self, roots: &dyn TraceRoots, pending: Option<&Object>) {
        let before = self.bytes_allocated;
        tracing::debug!(bytes = before, "gc begin");

        // Mark roots.
        {
            let mut marker = Marker {
                marks: &mut self.marks,
                grey: &mut self.grey,
            };
            roots.trace_roots(&mut marker);
            if let Some(object) = pending {
                trace_object(object, &mut marker);
            }
        }

        // Trace until the grey worklist drains.
        while let Some(r) = self.grey.pop() {
            if let Some(object) = self.slots[r.index()].as_ref() {
                let mut marker = Marker {
                    marks: &mut self.marks,
                    grey: &mut self.grey,
                };
                trace_object(object, &mut marker);
            }
        }

        // The intern pool holds non-owning references; drop doomed keys
        // before the sweep frees their objects.
        let mut doomed = Vec::new();
        for (key, _) in self.strings.iter() {
            if key.is_object() && !self.marks[key.as_object().index()] {
                if let Some(Object::String(s)) = self.slots[key.as_object().index()].as_ref() {
                    doomed.push((key, s.hash));
                }
            }
        }
        for (key, hash) in doomed {
            self.strings.delete(key, hash);
        }

        // Sweep: free unmarked slots, clear marks on survivors.
        for index in 0..self.slots.len() {
            if self.marks[index] {
                self.marks[index] = false;
            } else if self.slots[index].is_some() {
                self.slots[index] = None;
                self.bytes_allocated -= self.sizes[index];
                self.sizes[index] = 0;
                self.free.push(index as u32);
            }
        }

        self.next_gc = (self.bytes_allocated * GC_GROW_FACTOR).max(FIRST_GC);
        tracing::debug!(
            before,
            after = self.bytes_allocated,
            next_gc = self.next_gc,
            "gc end"
        );
    }

    /// Intern a string: return the existing object for this content, or
    /// allocate one and register it in the pool.
    pub fn intern(&mut self, chars: &str, roots: &dyn TraceRoots) -> ObjRef {
        let hash = fnv1a(chars.as_bytes());

        let slots = &self.slots;
        let found = self.strings.find_key(hash, |key| {
            match slots[key.as_object().index()].as_ref() {
                Some(Object::String(s)) => &*s.chars == chars,
                _ => false,
            }
        });
        if let Some(existing) = found {
            return existing.as_object();
        }

        let r = self.allocate(
            Object::String(StringObj {
                chars: chars.into(),
                hash,
            }),
            roots,
        );
        self.strings.set(Value::object(r), hash, Value::NULL);
        r
    }

    /// Hash a value for table storage.
    ///
    /// Returns `None` iff the value is unhashable; only `null` is.
    /// Booleans hash as 0/1, numbers as their truncation to 32 bits,
    /// strings by their precomputed hash, and other objects by identity.
    #[must_use]
    pub fn hash_value(&self, value: Value) -> Option<u32> {
        if value.is_null() {
            None
        } else if value.is_bool() {
            Some(u32::from(value.as_bool()))
        } else if value.is_number() {
            Some(value.as_number() as i64 as u32)
        } else {
            match self.object(value.as_object()) {
                Object::String(s) => Some(s.hash),
                _ => Some(value.as_object().index() as u32),
            }
        }
    }

    /// Access an object. The reference must be live; callers predicate on
    /// value kind before reaching into the heap.
    #[must_use]
    pub fn object(&self, r: ObjRef) -> &Object {
        match self.slots[r.index()] {
            Some(ref object) => object,
            None => unreachable!("dead object reference"),
        }
    }

    fn object_mut(&mut self, r: ObjRef) -> &mut Object {
        match self.slots[r.index()] {
            Some(ref mut object) => object,
            None => unreachable!("dead object reference"),
        }
    }

    /// The characters of a string object.
    #[must_use]
    pub fn string_chars(&self, r: ObjRef) -> &str {
        match self.object(r) {
            Object::String(s) => &s.chars,
            _ => unreachable!("expected string object"),
        }
    }

    /// The precomputed hash of a string object.
    #[must_use]
    pub fn string_hash(&self, r: ObjRef) -> u32 {
        match self.object(r) {
            Object::String(s) => s.hash,
            _ => unreachable!("expected string object"),
        }
    }

    /// Access a function object.
    #[must_use]
    pub fn function(&self, r: ObjRef) -> &FunctionObj {
        match self.object(r) {
            Object::Function(f) => f,
            _ => unreachable!("expected function object"),
        }
    }

    /// Mutate a function object (used by `def` to retro-name lambdas).
    pub fn function_mut(&mut self, r: ObjRef) -> &mut FunctionObj {
        match self.object_mut(r) {
            Object::Function(f) => f,
            _ => unreachable!("expected function object"),
        }
    }

    /// Access a closure object.
    #[must_use]
    pub fn closure(&self, r: ObjRef) -> &ClosureObj {
        match self.object(r) {
            Object::Closure(c) => c,
            _ => unreachable!("expected closure object"),
        }
    }

    /// Mutate a closure object (used while capturing upvalues).
    pub fn closure_mut(&mut self, r: ObjRef) -> &mut ClosureObj {
        match self.object_mut(r) {
            Object::Closure(c) => c,
            _ => unreachable!("expected closure object"),
        }
    }

    /// Access an upvalue object.
    #[must_use]
    pub fn upvalue(&self, r: ObjRef) -> &Upvalue {
        match self.object(r) {
            Object::Upvalue(u) => u,
            _ => unreachable!("expected upvalue object"),
        }
    }

    /// Mutate an upvalue object (used when closing).
    pub fn upvalue_mut(&mut self, r: ObjRef) -> &mut Upvalue {
        match self.object_mut(r) {
            Object::Upvalue(u) => u,
            _ => unreachable!("expected upvalue object"),
        }
    }

    /// Access a list object's elements.
    #[must_use]
    pub fn list(&self, r: ObjRef) -> &[Value] {
        match self.object(r) {
            Object::List(elements) => elements,
            _ => unreachable!("expected list object"),
        }
    }

    /// Append to a list in place, keeping allocation accounting current.
    pub fn list_push(&mut self, r: ObjRef, value: Value) {
        match self.object_mut(r) {
            Object::List(elements) => elements.push(value),
            _ => unreachable!("expected list object"),
        }
        self.sizes[r.index()] += core::mem::size_of::<Value>();
        self.bytes_allocated += core::mem::size_of::<Value>();
    }

    /// Access a dict object's table.
    #[must_use]
    pub fn dict(&self, r: ObjRef) -> &Table {
        match self.object(r) {
            Object::Dict(table) => table,
            _ => unreachable!("expected dict object"),
        }
    }

    /// Store into a dict in place, keeping allocation accounting current.
    pub fn dict_set(&mut self, r: ObjRef, key: Value, hash: u32, value: Value) -> bool {
        let is_new = match self.object_mut(r) {
            Object::Dict(table) => table.set(key, hash, value),
            _ => unreachable!("expected dict object"),
        };
        if is_new {
            let entry_size = core::mem::size_of::<Value>() * 3;
            self.sizes[r.index()] += entry_size;
            self.bytes_allocated += entry_size;
        }
        is_new
    }

    /// The host callback of a native object.
    #[must_use]
    pub fn native(&self, r: ObjRef) -> NativeFn {
        match self.object(r) {
            Object::Native(n) => n.function,
            _ => unreachable!("expected native object"),
        }
    }

    /// Check whether a value references a function object.
    #[must_use]
    pub fn is_function(&self, value: Value) -> bool {
        value.is_object() && matches!(self.object(value.as_object()), Object::Function(_))
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// Mark every reference owned by an object.
fn trace_object(object: &Object, marker: &mut Marker<'_>) {
    match object {
        Object::String(_) | Object::Native(_) => {}
        Object::Function(f) => {
            if let Some(name) = f.name {
                marker.mark_object(name);
            }
            for &constant in &f.chunk.constants {
                marker.mark_value(constant);
            }
        }
        Object::Closure(c) => {
            marker.mark_object(c.function);
            for &upvalue in &c.upvalues {
                marker.mark_object(upvalue);
            }
        }
        Object::Upvalue(Upvalue::Closed(value)) => marker.mark_value(*value),
        Object::Upvalue(Upvalue::Open(_)) => {}
        Object::List(elements) => {
            for &element in elements {
                marker.mark_value(element);
            }
        }
        Object::Dict(table) => marker.mark_table(table),
    }
}

/// Approximate heap footprint of an object, in bytes.
fn object_size(object: &Object) -> usize {
    let value_size = core::mem::size_of::<Value>();
    let base = core::mem::size_of::<Object>();
    base + match object {
        Object::String(s) => s.chars.len(),
        Object::Function(f) => {
            f.chunk.code.len()
                + f.chunk.lines.len() * core::mem::size_of::<u32>()
                + f.chunk.constants.len() * value_size
        }
        Object::Closure(c) => c.upvalues.len() * core::mem::size_of::<ObjRef>(),
        Object::List(elements) => elements.len() * value_size,
        Object::Dict(table) => table.len() * value_size * 3,
        Object::Native(_) | Object::Upvalue(_) => 0,
    }
}

/// FNV-1a hash, the hash of interned strings.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
