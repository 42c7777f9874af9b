//! Pack primitives - building blocks for generated constructors
//!
//! Each function builds one R object from host data and returns it
//! unprotected. Internally every function is stack-balanced: whatever it
//! protects it releases before returning, on every path.
//!
//! The `try_` variants take fallible callbacks and release their
//! protections before propagating the callback's error.

use crate::complex::Complex128;
use crate::logging::log_pack;
use crate::runtime::Context;
use crate::sexp::{
    Character, Complex, Integer, List, Logical, Raw, Real, Sexp, SexpType, StringVector, Value,
    Vector,
};
use std::convert::Infallible;
use std::fmt::Display;


#[inline]
fn infallible<T>(r: Result<T, Infallible>) -> T {
    match r {
        Ok(v) => v,
        Err(never) => match never {},
    }
}

/// `R_NilValue`.
#[inline]
pub fn nil(cx: &Context<'_>) -> Value {
    cx.nil()
}

/// Length-one logical vector.
pub fn logical(cx: &Context<'_>, x: bool) -> Value {
    let mut v = Logical::new(cx, 1);
    v.vector_mut()[0] = x as i32;
    v.into()
}

/// Length-one integer vector. Wider host integers are narrowed by the caller.
pub fn integer(cx: &Context<'_>, x: i32) -> Value {
    let mut v = Integer::new(cx, 1);
    v.vector_mut()[0] = x;
    v.into()
}

pub fn raw(cx: &Context<'_>, x: u8) -> Value {
    let mut v = Raw::new(cx, 1);
    v.bytes_mut()[0] = x;
    v.into()
}

pub fn real(cx: &Context<'_>, x: f64) -> Value {
    let mut v = Real::new(cx, 1);
    v.vector_mut()[0] = x;
    v.into()
}

pub fn complex(cx: &Context<'_>, x: Complex128) -> Value {
    let mut v = Complex::new(cx, 1);
    v.vector_mut()[0] = x;
    v.into()
}

/// Length-one character vector holding `s`.
pub fn string(cx: &Context<'_>, s: &str) -> Value {
    let scope = cx.scope();
    let v = scope.protect(StringVector::new(cx, 1));
    v.set(cx, 0, Character::new(cx, s));
    v.into()
}

/// Integer vector copied from `xs`.
pub fn integer_slice(cx: &Context<'_>, xs: &[i32]) -> Value {
    let mut v = Integer::new(cx, xs.len());
    // copy_from_slice checks the allocation's own length against the input.
    v.vector_mut().copy_from_slice(xs);
    log_pack("integer", xs.len());
    v.into()
}

pub fn raw_slice(cx: &Context<'_>, xs: &[u8]) -> Value {
    let mut v = Raw::new(cx, xs.len());
    v.bytes_mut().copy_from_slice(xs);
    log_pack("raw", xs.len());
    v.into()
}

pub fn real_slice(cx: &Context<'_>, xs: &[f64]) -> Value {
    let mut v = Real::new(cx, xs.len());
    v.vector_mut().copy_from_slice(xs);
    log_pack("real", xs.len());
    v.into()
}

pub fn complex_slice(cx: &Context<'_>, xs: &[Complex128]) -> Value {
    let mut v = Complex::new(cx, xs.len());
    v.vector_mut().copy_from_slice(xs);
    log_pack("complex", xs.len());
    v.into()
}

/// Logical vector; each `bool` becomes 0 or 1.
pub fn logical_slice(cx: &Context<'_>, xs: &[bool]) -> Value {
    let mut v = Logical::new(cx, xs.len());
    for (dst, &x) in v.vector_mut().iter_mut().zip(xs) {
        *dst = x as i32;
    }
    log_pack("logical", xs.len());
    v.into()
}

/// Character vector, one element per item.
pub fn string_slice<S: AsRef<str>>(cx: &Context<'_>, xs: &[S]) -> Value {
    let scope = cx.scope();
    let v = scope.protect(StringVector::new(cx, xs.len()));
    for (i, x) in xs.iter().enumerate() {
        v.set(cx, i, Character::new(cx, x.as_ref()));
    }
    log_pack("string", xs.len());
    v.into()
}

/// Character vector of error messages. `None` becomes `NA_character_`.
pub fn error_slice<E: Display>(cx: &Context<'_>, xs: &[Option<E>]) -> Value {
    let scope = cx.scope();
    let v = scope.protect(StringVector::new(cx, xs.len()));
    for (i, x) in xs.iter().enumerate() {
        v.set(cx, i, error_message(cx, x.as_ref()));
    }
    log_pack("error", xs.len());
    v.into()
}

fn error_message<E: Display>(cx: &Context<'_>, e: Option<&E>) -> Character {
    match e {
        Some(e) => Character::new(cx, &e.to_string()),
        None => unsafe { Character::from_value_unchecked(cx.runtime().na_string()) },
    }
}

/// Generic list, building each element with `f`.
pub fn list<T>(cx: &Context<'_>, xs: &[T], mut f: impl FnMut(&Context<'_>, &T) -> Value) -> Value {
    infallible(try_list(cx, xs, |cx, x| Ok(f(cx, x))))
}

/// [`list`] with a fallible element constructor.
pub fn try_list<T, E>(
    cx: &Context<'_>,
    xs: &[T],
    mut f: impl FnMut(&Context<'_>, &T) -> Result<Value, E>,
) -> Result<Value, E> {
    let scope = cx.scope();
    let v = scope.protect(Vector::new(cx, xs.len()));
    for (i, x) in xs.iter().enumerate() {
        let elem = f(cx, x)?;
        v.set(cx, i, elem);
    }
    log_pack("list", xs.len());
    Ok(v.into())
}

/// Attaches `names` as the `names` attribute of `v`.
///
/// Both must be protected: installing the symbol may allocate.
pub fn set_names(cx: &Context<'_>, v: Value, names: StringVector) {
    let rt = cx.runtime();
    let sym = rt.install("names");
    rt.set_attrib(v, sym, names.value());
}

/// Allocates a vector of `kind` plus a parallel key vector, fills both
/// from `entries` and attaches the keys as names.
fn try_named_sequence<'k, T, E, I>(
    cx: &Context<'_>,
    kind: SexpType,
    entries: I,
    mut write: impl FnMut(&Context<'_>, Value, usize, T) -> Result<(), E>,
) -> Result<Value, E>
where
    I: IntoIterator<Item = (&'k str, T)>,
    I::IntoIter: ExactSizeIterator,
{
    let entries = entries.into_iter();
    let n = entries.len();
    let scope = cx.scope();
    let values = scope.protect(cx.runtime().alloc_vector(kind, n));
    let names = scope.protect(StringVector::new(cx, n));
    for (i, (key, x)) in entries.take(n).enumerate() {
        names.set(cx, i, Character::new(cx, key));
        write(cx, values, i, x)?;
    }
    set_names(cx, values, names);
    log_pack(kind.type_name(), n);
    Ok(values)
}

fn named_sequence<'k, T, I>(
    cx: &Context<'_>,
    kind: SexpType,
    entries: I,
    mut write: impl FnMut(&Context<'_>, Value, usize, T),
) -> Value
where
    I: IntoIterator<Item = (&'k str, T)>,
    I::IntoIter: ExactSizeIterator,
{
    infallible(try_named_sequence(cx, kind, entries, |cx, v, i, x| {
        write(cx, v, i, x);
        Ok(())
    }))
}

macro_rules! atomic_map {
    ($(#[$meta:meta])* $name:ident, $elem:ty, $handle:ident, $kind:ident, $view:ident, $conv:expr) => {
        $(#[$meta])*
        pub fn $name<'k, I>(cx: &Context<'_>, entries: I) -> Value
        where
            I: IntoIterator<Item = (&'k str, $elem)>,
            I::IntoIter: ExactSizeIterator,
        {
            named_sequence(cx, SexpType::$kind, entries, |_, v, i, x| {
                let mut h = unsafe { $handle::from_value_unchecked(v) };
                h.$view()[i] = $conv(x);
            })
        }
    };
}

atomic_map!(
    /// Named integer vector from `(key, value)` pairs.
    integer_map, i32, Integer, Integer, vector_mut, |x| x
);
atomic_map!(raw_map, u8, Raw, Raw, bytes_mut, |x| x);
atomic_map!(real_map, f64, Real, Real, vector_mut, |x| x);
atomic_map!(complex_map, Complex128, Complex, Complex, vector_mut, |x| x);
atomic_map!(
    /// Named logical vector.
    logical_map, bool, Logical, Logical, vector_mut, |x: bool| x as i32
);

/// Named character vector.
pub fn string_map<'k, S, I>(cx: &Context<'_>, entries: I) -> Value
where
    S: AsRef<str>,
    I: IntoIterator<Item = (&'k str, S)>,
    I::IntoIter: ExactSizeIterator,
{
    named_sequence(cx, SexpType::String, entries, |cx, v, i, s: S| {
        let v = unsafe { StringVector::from_value_unchecked(v) };
        v.set(cx, i, Character::new(cx, s.as_ref()));
    })
}

/// Named character vector of error messages; `None` becomes `NA_character_`.
pub fn error_map<'k, E, I>(cx: &Context<'_>, entries: I) -> Value
where
    E: Display,
    I: IntoIterator<Item = (&'k str, Option<E>)>,
    I::IntoIter: ExactSizeIterator,
{
    named_sequence(cx, SexpType::String, entries, |cx, v, i, e: Option<E>| {
        let v = unsafe { StringVector::from_value_unchecked(v) };
        v.set(cx, i, error_message(cx, e.as_ref()));
    })
}

/// Named generic list, building each value with `f`.
pub fn list_map<'k, T, I>(
    cx: &Context<'_>,
    entries: I,
    mut f: impl FnMut(&Context<'_>, T) -> Value,
) -> Value
where
    I: IntoIterator<Item = (&'k str, T)>,
    I::IntoIter: ExactSizeIterator,
{
    infallible(try_list_map(cx, entries, |cx, x| Ok(f(cx, x))))
}

pub fn try_list_map<'k, T, E, I>(
    cx: &Context<'_>,
    entries: I,
    mut f: impl FnMut(&Context<'_>, T) -> Result<Value, E>,
) -> Result<Value, E>
where
    I: IntoIterator<Item = (&'k str, T)>,
    I::IntoIter: ExactSizeIterator,
{
    try_named_sequence(cx, SexpType::Vector, entries, |cx, v, i, x| {
        let elem = f(cx, x)?;
        cx.runtime().set_vector_elt(v, i, elem);
        Ok(())
    })
}

/// Struct as a tagged pairlist: cell `i` holds `f(i)` and is named
/// `names[i]`. A struct with no fields is `NULL`.
pub fn pairlist_struct(
    cx: &Context<'_>,
    names: &[&str],
    mut f: impl FnMut(&Context<'_>, usize) -> Value,
) -> Value {
    infallible(try_pairlist_struct(cx, names, |cx, i| Ok(f(cx, i))))
}

pub fn try_pairlist_struct<E>(
    cx: &Context<'_>,
    names: &[&str],
    mut f: impl FnMut(&Context<'_>, usize) -> Result<Value, E>,
) -> Result<Value, E> {
    let n = names.len();
    if n == 0 {
        return Ok(cx.nil());
    }
    let scope = cx.scope();
    let head = scope.protect(cx.runtime().alloc_list(n));
    let tags = scope.protect(StringVector::new(cx, n));
    for (i, name) in names.iter().enumerate() {
        tags.set(cx, i, Character::new(cx, name));
    }
    let mut cell = List::from_value(head);
    for i in 0..n {
        let c = match cell {
            Some(c) => c,
            None => break,
        };
        let field = f(cx, i)?;
        c.set_head(cx, field);
        cell = List::from_value(c.tail());
    }
    set_names(cx, head, tags);
    log_pack("struct", n);
    Ok(head)
}
