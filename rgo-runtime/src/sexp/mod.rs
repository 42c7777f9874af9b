//! Binary object model - typed handles over R's in-memory object format
//!
//! Every R object is reached through a raw pointer to its header. [`Value`]
//! is the untyped handle; the typed handles below wrap a `Value` whose kind
//! tag has been checked. Accessors read the object's own fields at call
//! time, so views are zero-copy and always sized by the live length field.
//!
//! Handles do not own anything. Objects belong to the foreign collector and
//! stay alive only while reachable from something it knows about, such as
//! the protection stack (see [`crate::protect`]).
//!
//! Architecture:
//! - `info.rs` - kind tags and the `sxpinfo` word
//! - `layout.rs` - `#[repr(C)]` record layouts
//! - `value.rs` - the generic handle and kind dispatch
//! - `vector.rs` - vector family (atomic vectors, strings, lists)
//! - `list.rs` - pairlists and symbols
//! - `funcs.rs` - closures, promises, environments, primitives
//! - `print.rs` - diagnostic rendering

/// Declares a typed handle accepting the listed kinds.
macro_rules! sexp_handle {
    ($(#[$meta:meta])* $name:ident: $($kind:ident)|+) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(crate::sexp::Value);

        impl $name {
            /// Checked conversion from a generic handle.
            pub fn from_value(v: crate::sexp::Value) -> Option<Self> {
                match v.kind() {
                    $(Some(crate::sexp::SexpType::$kind))|+ => Some(Self(v)),
                    _ => None,
                }
            }

            /// # Safety
            /// `v` must point to a live object of one of this handle's kinds.
            #[inline]
            pub unsafe fn from_value_unchecked(v: crate::sexp::Value) -> Self {
                Self(v)
            }

            /// Pushes the object onto the protection stack and returns it.
            #[inline]
            pub fn protect(self, cx: &crate::runtime::Context<'_>) -> Self {
                cx.protect(self.0);
                self
            }

            /// Pops one entry off the protection stack. Equivalent to
            /// `UNPROTECT(1)`.
            #[inline]
            pub fn unprotect(self, cx: &crate::runtime::Context<'_>) {
                cx.unprotect_handle(self.0);
            }
        }

        impl crate::sexp::Sexp for $name {
            #[inline]
            fn value(self) -> crate::sexp::Value {
                self.0
            }
        }

        impl From<$name> for crate::sexp::Value {
            #[inline]
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!(stringify!($name), "({:p})"), self.0.as_ptr())
            }
        }
    };
}

mod info;
pub mod layout;
mod value;
mod vector;
mod list;
mod funcs;
pub mod print;


pub use info::{Info, SexpType};
pub use value::{Object, Sexp, Value};
pub use vector::{
    Character, Complex, Expression, Integer, Logical, Raw, Real, StringVector, Vector,
    WeakReference, NA_INTEGER, NA_LOGICAL,
};
pub use list::{Dot, Lang, List, Cells, Symbol};
pub use funcs::{Builtin, Closure, Environment, Promise, Special};
