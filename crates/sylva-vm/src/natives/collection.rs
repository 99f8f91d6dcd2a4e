// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! List and dict natives.

use crate::heap::{Heap, Object};
use crate::table::Table;
use crate::value::{ObjRef, Value};

use super::{NativeCtx, NativeError};

/// `(list v*)` - a new list of the arguments.
pub(super) fn list(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let elements = args.to_vec();
    let r = ctx.heap.allocate(Object::List(elements), &ctx.roots);
    Ok(Value::object(r))
}

/// `(push list v)` - a new list with `v` appended; the argument is left
/// untouched.
pub(super) fn push(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let [list_value, value] = args else {
        return Err(NativeError::WrongArity {
            name: "push",
            expected: "2",
        });
    };
    let r = as_list(ctx.heap, *list_value, "push")?;

    let mut elements = ctx.heap.list(r).to_vec();
    elements.push(*value);
    let appended = ctx.heap.allocate(Object::List(elements), &ctx.roots);
    Ok(Value::object(appended))
}

/// `(push! list v)` - appends `v` in place and returns the list.
pub(super) fn push_in_place(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let [list_value, value] = args else {
        return Err(NativeError::WrongArity {
            name: "push!",
            expected: "2",
        });
    };
    let r = as_list(ctx.heap, *list_value, "push!")?;

    ctx.heap.list_push(r, *value);
    Ok(*list_value)
}

/// `(first list)` - the first element, or `null` for an empty list.
pub(super) fn first(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let [list_value] = args else {
        return Err(NativeError::WrongArity {
            name: "first",
            expected: "1",
        });
    };
    let r = as_list(ctx.heap, *list_value, "first")?;

    Ok(ctx.heap.list(r).first().copied().unwrap_or(Value::NULL))
}

/// `(rest list)` - a new list of everything after the first element; the
/// rest of an empty list is an empty list.
pub(super) fn rest(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let [list_value] = args else {
        return Err(NativeError::WrongArity {
            name: "rest",
            expected: "1",
        });
    };
    let r = as_list(ctx.heap, *list_value, "rest")?;

    let elements = ctx.heap.list(r).get(1..).unwrap_or(&[]).to_vec();
    let remainder = ctx.heap.allocate(Object::List(elements), &ctx.roots);
    Ok(Value::object(remainder))
}

/// `(len v)` - the length of a list, dict, or string.
pub(super) fn len(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let [value] = args else {
        return Err(NativeError::WrongArity {
            name: "len",
            expected: "1",
        });
    };
    if !value.is_object() {
        return Err(NativeError::NoLength);
    }

    let length = match ctx.heap.object(value.as_object()) {
        Object::List(elements) => elements.len(),
        Object::Dict(table) => table.len(),
        Object::String(s) => s.chars.len(),
        _ => return Err(NativeError::NoLength),
    };
    Ok(Value::number(length as f64))
}

/// `(dict k v k v ...)` - a new dict of the given entries.
pub(super) fn dict(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    if args.len() % 2 != 0 {
        return Err(NativeError::OddDictArguments);
    }

    let r = ctx.heap.allocate(Object::Dict(Table::new()), &ctx.roots);
    for pair in args.chunks_exact(2) {
        let hash = ctx
            .heap
            .hash_value(pair[0])
            .ok_or(NativeError::UnhashableKey)?;
        ctx.heap.dict_set(r, pair[0], hash, pair[1]);
    }
    Ok(Value::object(r))
}

/// `(set dict k v)` - stores the entry and returns the dict.
pub(super) fn set(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let [dict_value, key, value] = args else {
        return Err(NativeError::WrongArity {
            name: "set",
            expected: "3",
        });
    };
    let r = as_dict(ctx.heap, *dict_value, "set")?;

    let hash = ctx.heap.hash_value(*key).ok_or(NativeError::UnhashableKey)?;
    ctx.heap.dict_set(r, *key, hash, *value);
    Ok(*dict_value)
}

/// `(get dict k)` - the value stored under `k`, or `null`.
pub(super) fn get(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let [dict_value, key] = args else {
        return Err(NativeError::WrongArity {
            name: "get",
            expected: "2",
        });
    };
    let r = as_dict(ctx.heap, *dict_value, "get")?;

    let hash = ctx.heap.hash_value(*key).ok_or(NativeError::UnhashableKey)?;
    Ok(ctx.heap.dict(r).get(*key, hash).unwrap_or(Value::NULL))
}

fn as_list(heap: &Heap, value: Value, name: &'static str) -> Result<ObjRef, NativeError> {
    if value.is_object() && matches!(heap.object(value.as_object()), Object::List(_)) {
        Ok(value.as_object())
    } else {
        Err(NativeError::NotAList { name })
    }
}

fn as_dict(heap: &Heap, value: Value, name: &'static str) -> Result<ObjRef, NativeError> {
    if value.is_object() && matches!(heap.object(value.as_object()), Object::Dict(_)) {
        Ok(value.as_object())
    } else {
        Err(NativeError::NotADict { name })
    }
}
