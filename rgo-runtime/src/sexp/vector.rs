//! Vector family - length-prefixed payloads
//!
//! Views are built from the length field at call time and never copy.
//! Stores into STRSXP and VECSXP go through the runtime so the foreign
//! collector's write barrier sees them.

use super::layout::{VectorRec, VECTOR_DATA_OFFSET};
use super::value::{Sexp, Value};
use super::SexpType;
use crate::complex::Complex128;
use crate::runtime::Context;
use core::fmt;
use core::slice;

/// `NA_INTEGER`.
pub const NA_INTEGER: i32 = i32::MIN;

/// `NA_LOGICAL`; logical payloads are tri-state 32-bit integers.
pub const NA_LOGICAL: i32 = i32::MIN;

#[inline]
fn length(v: Value) -> usize {
    if v.is_null() {
        return 0;
    }
    unsafe { (*(v.header() as *mut VectorRec)).length as usize }
}

#[inline]
unsafe fn data<T>(v: Value) -> *mut T {
    (v.header() as *mut u8).add(VECTOR_DATA_OFFSET) as *mut T
}

#[inline]
fn view<'a, T>(v: Value) -> &'a [T] {
    let n = length(v);
    if n == 0 {
        return &[];
    }
    unsafe { slice::from_raw_parts(data::<T>(v), n) }
}

#[inline]
fn view_mut<'a, T>(v: Value) -> &'a mut [T] {
    let n = length(v);
    if n == 0 {
        return &mut [];
    }
    unsafe { slice::from_raw_parts_mut(data::<T>(v), n) }
}

#[inline]
fn check_index(kind: &str, i: usize, len: usize) {
    if i >= len {
        panic!("{} index out of bounds: the len is {} but the index is {}", kind, len, i);
    }
}

macro_rules! vector_len {
    ($name:ident) => {
        impl $name {
            /// Number of elements, read from the object's length field.
            #[inline]
            pub fn len(&self) -> usize {
                length(self.0)
            }

            #[inline]
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }
        }
    };
}

sexp_handle! {
    /// Integer vector (INTSXP).
    Integer: Integer
}
vector_len!(Integer);

impl Integer {
    /// Allocates an integer vector of length `n`.
    ///
    /// The allocation is made by the foreign runtime. The result is not
    /// protected; protect it before allocating anything else.
    pub fn new(cx: &Context<'_>, n: usize) -> Self {
        Self(cx.runtime().alloc_vector(SexpType::Integer, n))
    }

    #[inline]
    pub fn vector(&self) -> &[i32] {
        view(self.0)
    }

    #[inline]
    pub fn vector_mut(&mut self) -> &mut [i32] {
        view_mut(self.0)
    }
}

sexp_handle! {
    /// Logical vector (LGLSXP). Elements are 0, 1 or [`NA_LOGICAL`].
    Logical: Logical
}
vector_len!(Logical);

impl Logical {
    pub fn new(cx: &Context<'_>, n: usize) -> Self {
        Self(cx.runtime().alloc_vector(SexpType::Logical, n))
    }

    #[inline]
    pub fn vector(&self) -> &[i32] {
        view(self.0)
    }

    #[inline]
    pub fn vector_mut(&mut self) -> &mut [i32] {
        view_mut(self.0)
    }
}

sexp_handle! {
    /// Double vector (REALSXP).
    Real: Real
}
vector_len!(Real);

impl Real {
    pub fn new(cx: &Context<'_>, n: usize) -> Self {
        Self(cx.runtime().alloc_vector(SexpType::Real, n))
    }

    #[inline]
    pub fn vector(&self) -> &[f64] {
        view(self.0)
    }

    #[inline]
    pub fn vector_mut(&mut self) -> &mut [f64] {
        view_mut(self.0)
    }
}

sexp_handle! {
    /// Complex vector (CPLXSXP).
    Complex: Complex
}
vector_len!(Complex);

impl Complex {
    pub fn new(cx: &Context<'_>, n: usize) -> Self {
        Self(cx.runtime().alloc_vector(SexpType::Complex, n))
    }

    #[inline]
    pub fn vector(&self) -> &[Complex128] {
        view(self.0)
    }

    #[inline]
    pub fn vector_mut(&mut self) -> &mut [Complex128] {
        view_mut(self.0)
    }
}

sexp_handle! {
    /// Raw byte vector (RAWSXP).
    Raw: Raw
}
vector_len!(Raw);

impl Raw {
    pub fn new(cx: &Context<'_>, n: usize) -> Self {
        Self(cx.runtime().alloc_vector(SexpType::Raw, n))
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        view(self.0)
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        view_mut(self.0)
    }
}

sexp_handle! {
    /// A single string (CHARSXP), R's internal text representation.
    Character: Char
}
vector_len!(Character);

impl Character {
    /// Creates a UTF-8 CHARSXP holding `s`.
    pub fn new(cx: &Context<'_>, s: &str) -> Self {
        Self(cx.runtime().mk_char(s.as_bytes()))
    }

    /// The bytes of the string, without the trailing NUL.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        view(self.0)
    }

    /// The string as UTF-8, `None` if the bytes are not valid UTF-8.
    pub fn to_str(&self) -> Option<&str> {
        core::str::from_utf8(self.bytes()).ok()
    }

    /// Whether this is R's `NA_character_`.
    pub fn is_na(self, cx: &Context<'_>) -> bool {
        self.0 == cx.runtime().na_string()
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.bytes()))
    }
}

sexp_handle! {
    /// Character vector (STRSXP): a vector of CHARSXP handles.
    StringVector: String
}
vector_len!(StringVector);

impl StringVector {
    /// Allocates a character vector of `n` empty strings.
    pub fn new(cx: &Context<'_>, n: usize) -> Self {
        Self(cx.runtime().alloc_vector(SexpType::String, n))
    }

    #[inline]
    pub fn vector(&self) -> &[Character] {
        view(self.0)
    }

    pub fn get(&self, i: usize) -> Option<Character> {
        self.vector().get(i).copied()
    }

    /// `SET_STRING_ELT`.
    pub fn set(self, cx: &Context<'_>, i: usize, s: Character) {
        check_index("character vector", i, self.len());
        cx.runtime().set_string_elt(self.0, i, s.value());
    }

    /// Renders every element as owned text.
    pub fn to_strings(&self) -> Vec<String> {
        self.vector().iter().map(|c| c.to_string()).collect()
    }
}

sexp_handle! {
    /// Generic vector (VECSXP), R's `list()`.
    Vector: Vector
}
vector_len!(Vector);

impl Vector {
    /// Allocates a list of `n` `NULL` elements.
    pub fn new(cx: &Context<'_>, n: usize) -> Self {
        Self(cx.runtime().alloc_vector(SexpType::Vector, n))
    }

    #[inline]
    pub fn vector(&self) -> &[Value] {
        view(self.0)
    }

    pub fn get(&self, i: usize) -> Option<Value> {
        self.vector().get(i).copied()
    }

    /// `SET_VECTOR_ELT`.
    pub fn set(self, cx: &Context<'_>, i: usize, v: Value) {
        check_index("list", i, self.len());
        cx.runtime().set_vector_elt(self.0, i, v);
    }
}

sexp_handle! {
    /// Expression vector (EXPRSXP).
    Expression: Expression
}
vector_len!(Expression);

impl Expression {
    #[inline]
    pub fn vector(&self) -> &[Value] {
        view(self.0)
    }
}

sexp_handle! {
    /// Weak reference (WEAKREFSXP): key, value, finalizer and next link.
    WeakReference: WeakReference
}
vector_len!(WeakReference);

impl WeakReference {
    #[inline]
    pub fn vector(&self) -> &[Value] {
        view(self.0)
    }

    pub fn key(&self) -> Option<Value> {
        self.vector().first().copied()
    }

    pub fn referent(&self) -> Option<Value> {
        self.vector().get(1).copied()
    }
}
