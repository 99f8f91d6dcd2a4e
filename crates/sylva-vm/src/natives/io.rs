// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Output, timing, and string-building natives.

use crate::heap::Heap;
use crate::value::{Value, write_value};

use super::{NativeCtx, NativeError};

/// `(print v*)` - writes the arguments separated by single spaces, then a
/// newline. Returns `null`.
pub(super) fn print(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    println!("{}", render_args(ctx.heap, args));
    Ok(Value::NULL)
}

/// `(clock)` - seconds since the VM was created.
pub(super) fn clock(ctx: &mut NativeCtx<'_>, _args: &[Value]) -> Result<Value, NativeError> {
    Ok(Value::number(ctx.started.elapsed().as_secs_f64()))
}

/// `(str v*)` - the arguments rendered exactly as `print` would write
/// them, as an interned string.
pub(super) fn str_cat(ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let rendered = render_args(ctx.heap, args);
    let interned = ctx.heap.intern(&rendered, &ctx.roots);
    Ok(Value::object(interned))
}

/// Shared rendering for `print` and `str`: values separated by one space.
fn render_args(heap: &Heap, args: &[Value]) -> String {
    let mut out = String::new();
    for (i, &arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_value(&mut out, arg, heap);
    }
    out
}
