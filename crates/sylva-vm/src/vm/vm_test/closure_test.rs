// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for closures, upvalue capture, and upvalue closing.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use super::{eval, eval_number};
use crate::chunk::{Chunk, op};
use crate::heap::{ClosureObj, FunctionObj, Object, Upvalue};
use crate::value::Value;
use crate::vm::Vm;

#[test]
fn lambdas_are_callable_values() {
    assert_eq!(eval_number("((lambda (x) (+ x 1)) 41)"), 42.0);
    assert_eq!(eval_number("((lambda () 7))"), 7.0);
}

#[test]
fn arguments_bind_left_to_right() {
    assert_eq!(eval_number("((lambda (a b) (- a b)) 10 4)"), 6.0);
}

#[test]
fn capture_survives_the_creating_frame() {
    // The upvalue closes when `mk` returns; the inner closure still
    // reads 7 afterwards.
    assert_eq!(
        eval_number("(def mk (lambda (x) (lambda () x))) (def f (mk 7)) (f)"),
        7.0
    );
}

#[test]
fn two_closures_share_one_upvalue() {
    assert_eq!(
        eval_number(
            "(def mk (lambda (x) (list (lambda () x) (lambda () x))))
             (def fns (mk 9))
             (+ ((first fns)) ((first (rest fns))))"
        ),
        18.0
    );
}

#[test]
fn transitive_capture_through_an_intermediate_lambda() {
    assert_eq!(
        eval_number("(def outer (lambda (x) (lambda () (lambda () x)))) (((outer 4)))"),
        4.0
    );
}

#[test]
fn closures_capture_distinct_cells_per_call() {
    assert_eq!(
        eval_number(
            "(def mk (lambda (x) (lambda () x)))
             (def a (mk 1))
             (def b (mk 2))
             (+ (a) (b))"
        ),
        3.0
    );
}

#[test]
fn recursion_through_a_global() {
    assert_eq!(
        eval_number("(def fact (lambda (n) (if (< n 2) 1 (* n (fact (- n 1)))))) (fact 5)"),
        120.0
    );
}

#[test]
fn lambda_body_may_have_many_statements() {
    assert_eq!(eval_number("((lambda () 1 2 3))"), 3.0);
}

#[test]
fn empty_lambda_body_returns_null() {
    assert!(eval("((lambda ()))").unwrap().is_null());
}

// --- Open-upvalue list invariants ---

#[test]
fn open_upvalues_stay_sorted_by_descending_slot() {
    let mut vm = Vm::new();
    vm.stack.push(Value::number(1.0));
    vm.stack.push(Value::number(2.0));
    vm.stack.push(Value::number(3.0));

    let low = vm.capture_upvalue(0);
    let high = vm.capture_upvalue(2);
    let mid = vm.capture_upvalue(1);

    assert_eq!(vm.open_upvalues, vec![high, mid, low]);
}

#[test]
fn capturing_the_same_slot_twice_returns_the_same_upvalue() {
    let mut vm = Vm::new();
    vm.stack.push(Value::number(1.0));

    let first = vm.capture_upvalue(0);
    let second = vm.capture_upvalue(0);
    assert_eq!(first, second);
    assert_eq!(vm.open_upvalues.len(), 1);
}

#[test]
fn close_upvalues_closes_everything_at_or_above_the_slot() {
    let mut vm = Vm::new();
    vm.stack.push(Value::number(10.0));
    vm.stack.push(Value::number(20.0));
    vm.stack.push(Value::number(30.0));

    let a = vm.capture_upvalue(0);
    let b = vm.capture_upvalue(1);
    let c = vm.capture_upvalue(2);

    vm.close_upvalues(1);
    assert_eq!(vm.open_upvalues, vec![a]);
    assert!(matches!(vm.heap.upvalue(b), Upvalue::Closed(v) if v.as_number() == 20.0));
    assert!(matches!(vm.heap.upvalue(c), Upvalue::Closed(v) if v.as_number() == 30.0));
    assert!(matches!(vm.heap.upvalue(a), Upvalue::Open(0)));

    vm.close_upvalues(0);
    assert!(vm.open_upvalues.is_empty());
    assert!(matches!(vm.heap.upvalue(a), Upvalue::Closed(v) if v.as_number() == 10.0));
}

#[test]
fn close_upvalue_opcode_closes_the_top_slot() {
    let mut vm = Vm::new();

    // Hand-assembled: push 42, close the slot, return null.
    let mut chunk = Chunk::new();
    let constant = chunk.add_constant(Value::number(42.0)) as u8;
    chunk.write(op::CONSTANT, 1);
    chunk.write(constant, 1);
    chunk.write(op::CLOSE_UPVALUE, 1);
    chunk.write(op::NULL, 1);
    chunk.write(op::RETURN, 1);

    let function = vm.alloc(Object::Function(FunctionObj {
        arity: 0,
        upvalue_count: 0,
        chunk,
        name: None,
    }));
    vm.stack.push(Value::object(function));
    let closure = vm.alloc(Object::Closure(ClosureObj {
        function,
        upvalues: Vec::new(),
    }));
    vm.stack.pop();
    vm.stack.push(Value::object(closure));
    vm.call_closure(closure, 0).unwrap();

    // Open an upvalue over the slot the constant will land in.
    let upvalue = vm.capture_upvalue(1);

    let result = vm.run().unwrap();
    assert!(result.is_null());
    assert!(matches!(vm.heap.upvalue(upvalue), Upvalue::Closed(v) if v.as_number() == 42.0));
    assert!(vm.open_upvalues.is_empty());
}
