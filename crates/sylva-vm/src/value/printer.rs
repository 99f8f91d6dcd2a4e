// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Printer for Sylva values.
//!
//! Renders values the way the VM prints them: strings print their raw
//! characters, lists print as `[ a b c ]`, dicts as `{ k => v }`, and
//! callables as `<fn name>` / `<native fn>`.

use core::fmt::Write;

use super::Value;
use crate::heap::{Heap, Object};

/// Render a value to a string.
#[must_use]
pub fn value_to_string(value: Value, heap: &Heap) -> String {
    let mut out = String::new();
    write_value(&mut out, value, heap);
    out
}

/// Append a value's rendering to an existing string.
pub fn write_value(out: &mut String, value: Value, heap: &Heap) {
    if value.is_number() {
        out.push_str(&format_number(value.as_number()));
    } else if value.is_null() {
        out.push_str("null");
    } else if value.is_bool() {
        out.push_str(if value.as_bool() { "true" } else { "false" });
    } else {
        write_object(out, value, heap);
    }
}

fn write_object(out: &mut String, value: Value, heap: &Heap) {
    match heap.object(value.as_object()) {
        Object::String(s) => out.push_str(&s.chars),
        Object::Function(f) => write_function_name(out, f.name.map(|n| heap.string_chars(n))),
        Object::Closure(c) => {
            let function = heap.function(c.function);
            write_function_name(out, function.name.map(|n| heap.string_chars(n)));
        }
        Object::Native(_) => out.push_str("<native fn>"),
        Object::Upvalue(_) => out.push_str("upvalue"),
        Object::List(elements) => {
            out.push_str("[ ");
            for &element in elements {
                write_value(out, element, heap);
                out.push(' ');
            }
            out.push(']');
        }
        Object::Dict(entries) => {
            out.push_str("{ ");
            for (key, value) in entries.iter() {
                write_value(out, key, heap);
                out.push_str(" => ");
                write_value(out, value, heap);
                out.push(' ');
            }
            out.push('}');
        }
    }
}

fn write_function_name(out: &mut String, name: Option<&str>) {
    match name {
        Some(name) => {
            let _ = write!(out, "<fn {name}>");
        }
        None => out.push_str("<script>"),
    }
}

/// Render a number.
///
/// Integral values print without a decimal point; everything else uses the
/// shortest round-trip rendering.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
