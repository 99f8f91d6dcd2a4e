// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Arithmetic, comparison, and logic natives.

use crate::value::{Value, values_equal};

use super::{NativeCtx, NativeError};

/// `(+ n*)` - sum of the arguments; `(+)` is `0`.
pub(super) fn add(_ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let mut total = 0.0;
    for &arg in args {
        if !arg.is_number() {
            return Err(NativeError::NotANumber);
        }
        total += arg.as_number();
    }
    Ok(Value::number(total))
}

/// `(* n*)` - product of the arguments; `(*)` is `1`.
pub(super) fn multiply(_ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let mut total = 1.0;
    for &arg in args {
        if !arg.is_number() {
            return Err(NativeError::NotANumber);
        }
        total *= arg.as_number();
    }
    Ok(Value::number(total))
}

/// `(- n n*)` - with one argument, negation; otherwise the first argument
/// minus the sum of the rest.
pub(super) fn subtract(_ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    match args {
        [] => Err(NativeError::NoArguments { name: "-" }),
        [single] => {
            if !single.is_number() {
                return Err(NativeError::NotANumber);
            }
            Ok(Value::number(-single.as_number()))
        }
        [first, rest @ ..] => {
            if !first.is_number() {
                return Err(NativeError::NotANumber);
            }
            let mut subtrahend = 0.0;
            for &arg in rest {
                if !arg.is_number() {
                    return Err(NativeError::NotANumber);
                }
                subtrahend += arg.as_number();
            }
            Ok(Value::number(first.as_number() - subtrahend))
        }
    }
}

/// `(/ n n*)` - divides left to right; a zero divisor is an error. With
/// one argument, negation.
pub(super) fn divide(_ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    match args {
        [] => Err(NativeError::NoArguments { name: "/" }),
        [single] => {
            if !single.is_number() {
                return Err(NativeError::NotANumber);
            }
            Ok(Value::number(-single.as_number()))
        }
        [first, rest @ ..] => {
            if !first.is_number() {
                return Err(NativeError::NotANumber);
            }
            let mut quotient = first.as_number();
            for &arg in rest {
                if !arg.is_number() {
                    return Err(NativeError::NotANumber);
                }
                let divisor = arg.as_number();
                if divisor == 0.0 {
                    return Err(NativeError::DivideByZero);
                }
                quotient /= divisor;
            }
            Ok(Value::number(quotient))
        }
    }
}

/// `(rem a b)` - remainder of `a / b`; a zero divisor is an error.
pub(super) fn remainder(_ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let [a, b] = args else {
        return Err(NativeError::WrongArity {
            name: "rem",
            expected: "2",
        });
    };
    if !a.is_number() || !b.is_number() {
        return Err(NativeError::NotANumber);
    }
    if b.as_number() == 0.0 {
        return Err(NativeError::DivideByZero);
    }
    Ok(Value::number(a.as_number() % b.as_number()))
}

/// `(< n n*)` - true iff the arguments are strictly increasing pairwise.
pub(super) fn less(_ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    compare(args, "<", |a, b| a < b)
}

/// `(> n n*)` - true iff the arguments are strictly decreasing pairwise.
pub(super) fn greater(_ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    compare(args, ">", |a, b| a > b)
}

fn compare(
    args: &[Value],
    name: &'static str,
    ordered: impl Fn(f64, f64) -> bool,
) -> Result<Value, NativeError> {
    if args.is_empty() {
        return Err(NativeError::NoArguments { name });
    }
    if !args[0].is_number() {
        return Err(NativeError::NonNumberCompare { name });
    }

    let mut holds = true;
    for pair in args.windows(2) {
        if !pair[1].is_number() {
            return Err(NativeError::NonNumberCompare { name });
        }
        if !ordered(pair[0].as_number(), pair[1].as_number()) {
            holds = false;
            break;
        }
    }

    Ok(Value::bool(holds))
}

/// `(= v*)` - true iff all arguments are equal pairwise.
pub(super) fn equal(_ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    let mut are_equal = true;
    for pair in args.windows(2) {
        if !values_equal(pair[0], pair[1]) {
            are_equal = false;
            break;
        }
    }
    Ok(Value::bool(are_equal))
}

/// `(not v)` - logical negation of truthiness.
pub(super) fn not(_ctx: &mut NativeCtx<'_>, args: &[Value]) -> Result<Value, NativeError> {
    match args {
        [] => Err(NativeError::NoArguments { name: "not" }),
        [single] => Ok(Value::bool(single.is_falsey())),
        _ => Err(NativeError::ExtraArguments { name: "not" }),
    }
}
