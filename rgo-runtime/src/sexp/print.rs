//! Diagnostic rendering of objects

use super::value::{Object, Value};
use std::fmt::Write;

/// One-line rendering: the info word, then the payload of atomic vectors.
///
/// ```text
/// INTSXP [1, 2, 3]
/// STRSXP ["a", "b"]
/// CLOSXP
/// ```
pub fn render(v: Value) -> String {
    let mut out = v.info().to_string();
    match v.interface() {
        Object::Integer(x) => append(&mut out, x.vector()),
        Object::Logical(x) => append(&mut out, x.vector()),
        Object::Real(x) => append(&mut out, x.vector()),
        Object::Complex(x) => append(&mut out, x.vector()),
        Object::Raw(x) => append(&mut out, x.bytes()),
        Object::String(x) => append(&mut out, &x.to_strings()),
        Object::Character(x) => {
            let _ = write!(out, " {}", x);
        }
        _ => {}
    }
    out
}

fn append<T: std::fmt::Debug>(out: &mut String, items: &[T]) {
    let _ = write!(out, " {:?}", items);
}

/// Prints the rendering of `v` to stdout and hands `v` back unchanged.
pub fn print_sexp(v: Value) -> Value {
    println!("{}", render(v));
    v
}
