//! Closures, environments, promises and primitives
//!
//! Slot accessors return `None` for slots that hold a null pointer or R's
//! `NULL`, which is how an unforced promise or the empty frame looks.

use super::layout::{CloRec, EnvRec, PrimRec, PromRec};
use super::value::Value;
use super::list::List;

#[inline]
fn slot(p: *mut super::layout::Header) -> Option<Value> {
    let v = Value::from_header(p);
    if v.is_null() {
        None
    } else {
        Some(v)
    }
}

sexp_handle! {
    /// Closure (CLOSXP).
    Closure: Closure
}

impl Closure {
    #[inline]
    fn rec(&self) -> *mut CloRec {
        self.0.header() as *mut CloRec
    }

    /// Formal argument list.
    pub fn formals(&self) -> Option<List> {
        slot(unsafe { (*self.rec()).formals }).and_then(List::from_value)
    }

    pub fn body(&self) -> Option<Value> {
        slot(unsafe { (*self.rec()).body })
    }

    /// Defining environment.
    pub fn environment(&self) -> Option<Environment> {
        slot(unsafe { (*self.rec()).env }).and_then(Environment::from_value)
    }
}

sexp_handle! {
    /// Environment (ENVSXP).
    Environment: Environment
}

impl Environment {
    #[inline]
    fn rec(&self) -> *mut EnvRec {
        self.0.header() as *mut EnvRec
    }

    /// Frame pairlist of an unhashed environment.
    pub fn frame(&self) -> Option<List> {
        slot(unsafe { (*self.rec()).frame }).and_then(List::from_value)
    }

    /// Enclosing environment.
    pub fn enclosure(&self) -> Option<Environment> {
        slot(unsafe { (*self.rec()).enclos }).and_then(Environment::from_value)
    }

    pub fn hash_table(&self) -> Option<Value> {
        slot(unsafe { (*self.rec()).hashtab })
    }
}

sexp_handle! {
    /// Promise (PROMSXP).
    Promise: Promise
}

impl Promise {
    #[inline]
    fn rec(&self) -> *mut PromRec {
        self.0.header() as *mut PromRec
    }

    /// The forced value, `None` while the promise is unevaluated.
    pub fn forced(&self) -> Option<Value> {
        slot(unsafe { (*self.rec()).value })
    }

    pub fn expression(&self) -> Option<Value> {
        slot(unsafe { (*self.rec()).expr })
    }

    /// Evaluation environment; cleared once the promise is forced.
    pub fn environment(&self) -> Option<Environment> {
        slot(unsafe { (*self.rec()).env }).and_then(Environment::from_value)
    }
}

sexp_handle! {
    /// Builtin primitive (BUILTINSXP).
    Builtin: Builtin
}

impl Builtin {
    /// Index into R's function table.
    pub fn offset(&self) -> i32 {
        unsafe { (*(self.0.header() as *mut PrimRec)).offset }
    }
}

sexp_handle! {
    /// Special primitive (SPECIALSXP).
    Special: Special
}

impl Special {
    pub fn offset(&self) -> i32 {
        unsafe { (*(self.0.header() as *mut PrimRec)).offset }
    }
}
