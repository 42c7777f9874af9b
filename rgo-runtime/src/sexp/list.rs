//! Pairlists and symbols

use super::layout::{ConsRec, SymRec};
use super::value::{Sexp, Value};
use super::vector::Character;
use super::SexpType;
use crate::runtime::Context;
use core::fmt;

#[inline]
fn cons(v: Value) -> *mut ConsRec {
    v.header() as *mut ConsRec
}

#[inline]
fn car(v: Value) -> Value {
    Value::from_header(unsafe { (*cons(v)).carval })
}

#[inline]
fn cdr(v: Value) -> Value {
    Value::from_header(unsafe { (*cons(v)).cdrval })
}

#[inline]
fn tag(v: Value) -> Option<Symbol> {
    Symbol::from_value(Value::from_header(unsafe { (*cons(v)).tagval }))
}

macro_rules! cons_accessors {
    ($name:ident) => {
        impl $name {
            /// `CAR`.
            #[inline]
            pub fn head(&self) -> Value {
                car(self.0)
            }

            /// `CDR`.
            #[inline]
            pub fn tail(&self) -> Value {
                cdr(self.0)
            }

            /// `TAG`, `None` for an untagged cell.
            #[inline]
            pub fn tag(&self) -> Option<Symbol> {
                tag(self.0)
            }

            /// Walks the cells from this one to the terminating `NULL`.
            pub fn iter(&self) -> Cells {
                Cells::new(self.0)
            }
        }
    };
}

sexp_handle! {
    /// Pairlist cell (LISTSXP).
    List: List
}
cons_accessors!(List);

impl List {
    /// `SETCAR`.
    pub fn set_head(self, cx: &Context<'_>, v: Value) {
        cx.runtime().set_car(self.0, v);
    }

    /// `SET_TAG`.
    pub fn set_tag(self, cx: &Context<'_>, name: Symbol) {
        cx.runtime().set_tag(self.0, name.value());
    }

    /// The value of the first cell tagged `name`.
    pub fn get(&self, name: &[u8]) -> Option<Value> {
        self.iter()
            .find(|(tag, _)| tag.map_or(false, |t| t.name().bytes() == name))
            .map(|(_, v)| v)
    }

    /// Tag names in cell order. Untagged cells yield an empty string.
    pub fn tags(&self) -> Vec<String> {
        self.iter()
            .map(|(tag, _)| tag.map(|t| t.to_string()).unwrap_or_default())
            .collect()
    }
}

sexp_handle! {
    /// Call (LANGSXP). The head is the function, the tail the arguments.
    Lang: Lang
}
cons_accessors!(Lang);

impl Lang {
    pub fn function(&self) -> Value {
        self.head()
    }

    pub fn arguments(&self) -> Option<List> {
        List::from_value(self.tail())
    }
}

sexp_handle! {
    /// `...` argument list (DOTSXP).
    Dot: Dot
}
cons_accessors!(Dot);

/// Iterator over `(tag, value)` pairs of a cons chain.
///
/// Stops at the first cell that is not a cons kind, so an improper tail
/// is not reported.
#[derive(Clone)]
pub struct Cells {
    cur: Value,
}

impl Cells {
    pub(crate) fn new(head: Value) -> Self {
        Self { cur: head }
    }
}

impl Iterator for Cells {
    type Item = (Option<Symbol>, Value);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur.is_null() || !self.cur.kind().map_or(false, SexpType::is_pairlist) {
            return None;
        }
        let item = (tag(self.cur), car(self.cur));
        self.cur = cdr(self.cur);
        Some(item)
    }
}

sexp_handle! {
    /// Symbol (SYMSXP).
    Symbol: Symbol
}

impl Symbol {
    /// Interns `name`, `install` in R.
    pub fn new(cx: &Context<'_>, name: &str) -> Self {
        Self(cx.runtime().install(name))
    }

    #[inline]
    fn rec(&self) -> *mut SymRec {
        self.0.header() as *mut SymRec
    }

    /// `PRINTNAME`.
    pub fn name(&self) -> Character {
        let pname = Value::from_header(unsafe { (*self.rec()).pname });
        unsafe { Character::from_value_unchecked(pname) }
    }

    /// `SYMVALUE`; the unbound marker for most symbols.
    pub fn binding(&self) -> Value {
        Value::from_header(unsafe { (*self.rec()).value })
    }

    /// `INTERNAL`, the `.Internal` primitive bound to this name if any.
    pub fn internal(&self) -> Value {
        Value::from_header(unsafe { (*self.rec()).internal })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.name(), f)
    }
}
