//! libR binding - the `Runtime` seam over a live R session
//!
//! Only compiled with the `libr` feature. Symbols are resolved when the
//! extension is loaded into R, so nothing here links against libR at
//! build time.

use crate::logging::log_ffi_call;
use crate::runtime::{Context, Runtime};
use crate::sexp::layout::{Header, XLen};
use crate::sexp::print::print_sexp;
use crate::sexp::{SexpType, Value};
use libc::{c_char, c_int, c_uint};

type Sexp = *mut Header;

/// `CE_UTF8` in `cetype_t`.
const CE_UTF8: c_int = 1;

extern "C" {
    static R_NilValue: Sexp;
    static R_BlankString: Sexp;
    static R_NaString: Sexp;

    fn Rf_allocVector(kind: c_uint, n: XLen) -> Sexp;
    fn Rf_allocList(n: c_int) -> Sexp;
    fn Rf_cons(car: Sexp, cdr: Sexp) -> Sexp;
    fn Rf_mkCharLenCE(s: *const c_char, len: c_int, enc: c_int) -> Sexp;
    fn Rf_installChar(name: Sexp) -> Sexp;
    fn SET_STRING_ELT(x: Sexp, i: XLen, v: Sexp);
    fn SET_VECTOR_ELT(x: Sexp, i: XLen, v: Sexp) -> Sexp;
    fn SETCAR(x: Sexp, y: Sexp) -> Sexp;
    fn SET_TAG(x: Sexp, y: Sexp);
    fn Rf_setAttrib(x: Sexp, name: Sexp, v: Sexp) -> Sexp;
    fn Rf_protect(x: Sexp) -> Sexp;
    fn Rf_unprotect(n: c_int);
}

#[inline]
fn raw(v: Value) -> Sexp {
    v.as_ptr() as Sexp
}

#[inline]
fn wrap(p: Sexp) -> Value {
    Value::from_header(p)
}

/// The running R session.
///
/// R is single-threaded: only use this from the thread R called into.
pub struct RSession {
    _private: (),
}

impl RSession {
    /// # Safety
    /// Must be called from R's main thread while R is running, typically
    /// inside a `.Call` entry point.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Runtime for RSession {
    fn name(&self) -> &'static str {
        "libR"
    }

    fn nil(&self) -> Value {
        wrap(unsafe { R_NilValue })
    }

    fn blank_string(&self) -> Value {
        wrap(unsafe { R_BlankString })
    }

    fn na_string(&self) -> Value {
        wrap(unsafe { R_NaString })
    }

    fn alloc_vector(&self, kind: SexpType, n: usize) -> Value {
        log_ffi_call("Rf_allocVector");
        wrap(unsafe { Rf_allocVector(kind.code() as c_uint, n as XLen) })
    }

    fn alloc_list(&self, n: usize) -> Value {
        log_ffi_call("Rf_allocList");
        wrap(unsafe { Rf_allocList(n as c_int) })
    }

    fn cons(&self, car: Value, cdr: Value) -> Value {
        wrap(unsafe { Rf_cons(raw(car), raw(cdr)) })
    }

    fn mk_char(&self, bytes: &[u8]) -> Value {
        log_ffi_call("Rf_mkCharLenCE");
        wrap(unsafe {
            Rf_mkCharLenCE(bytes.as_ptr() as *const c_char, bytes.len() as c_int, CE_UTF8)
        })
    }

    fn install(&self, name: &str) -> Value {
        unsafe {
            let pname = Rf_protect(Rf_mkCharLenCE(
                name.as_ptr() as *const c_char,
                name.len() as c_int,
                CE_UTF8,
            ));
            let sym = Rf_installChar(pname);
            Rf_unprotect(1);
            wrap(sym)
        }
    }

    fn set_string_elt(&self, v: Value, i: usize, s: Value) {
        unsafe { SET_STRING_ELT(raw(v), i as XLen, raw(s)) }
    }

    fn set_vector_elt(&self, v: Value, i: usize, x: Value) {
        unsafe { SET_VECTOR_ELT(raw(v), i as XLen, raw(x)) };
    }

    fn set_car(&self, cell: Value, x: Value) {
        unsafe { SETCAR(raw(cell), raw(x)) };
    }

    fn set_tag(&self, cell: Value, tag: Value) {
        unsafe { SET_TAG(raw(cell), raw(tag)) }
    }

    fn set_attrib(&self, v: Value, name: Value, x: Value) {
        unsafe { Rf_setAttrib(raw(v), raw(name), raw(x)) };
    }

    fn protect(&self, v: Value) {
        unsafe { Rf_protect(raw(v)) };
    }

    fn unprotect(&self, n: usize) {
        unsafe { Rf_unprotect(n as c_int) }
    }
}

/// Runs `f` with a context bound to the live session.
///
/// # Safety
/// See [`RSession::new`].
pub unsafe fn with_session<T>(f: impl FnOnce(&Context<'_>) -> T) -> T {
    let session = RSession::new();
    let cx = Context::new(&session);
    f(&cx)
}

/// `.Call` entry: prints a rendering of `x` and returns it unchanged.
#[no_mangle]
pub unsafe extern "C" fn rgo_print_sexp(x: Sexp) -> Sexp {
    raw(print_sexp(wrap(x)))
}
