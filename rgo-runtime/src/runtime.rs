//! Foreign runtime seam
//!
//! Everything that allocates, interns, or stores into an R object goes
//! through [`Runtime`]. Two backends implement it: the in-process
//! [`crate::heap::Heap`], and the libR binding behind the `libr` feature.
//!
//! [`Context`] bundles a runtime with its protection registry and is what
//! generated constructors receive.

use crate::protect::{ProtectScope, ProtectionRegistry, ViolationPolicy};
use crate::sexp::{SexpType, Value};

/// Operations the marshalling layer needs from the foreign runtime.
///
/// Every allocating method may trigger a collection. Arguments passed to an
/// allocating method are kept alive across that collection by the
/// implementation, as R's own allocators do; anything else the caller holds
/// must be protected first.
pub trait Runtime {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// `R_NilValue`.
    fn nil(&self) -> Value;

    /// `R_BlankString`.
    fn blank_string(&self) -> Value;

    /// `NA_STRING`.
    fn na_string(&self) -> Value;

    /// `Rf_allocVector`. Atomic payloads are zeroed, STRSXP elements start
    /// as the blank string and VECSXP/EXPRSXP elements as `NULL`.
    fn alloc_vector(&self, kind: SexpType, n: usize) -> Value;

    /// `Rf_allocList`: `n` untagged cells holding `NULL`.
    fn alloc_list(&self, n: usize) -> Value;

    /// `Rf_cons`.
    fn cons(&self, car: Value, cdr: Value) -> Value;

    /// `Rf_mkCharLenCE` with UTF-8 encoding.
    fn mk_char(&self, bytes: &[u8]) -> Value;

    /// `Rf_install`.
    fn install(&self, name: &str) -> Value;

    fn set_string_elt(&self, v: Value, i: usize, s: Value);

    fn set_vector_elt(&self, v: Value, i: usize, x: Value);

    fn set_car(&self, cell: Value, x: Value);

    fn set_tag(&self, cell: Value, tag: Value);

    /// `Rf_setAttrib`; `name` is a symbol.
    fn set_attrib(&self, v: Value, name: Value, x: Value);

    /// `Rf_protect`.
    fn protect(&self, v: Value);

    /// `Rf_unprotect`.
    fn unprotect(&self, n: usize);

    /// Top of the runtime's protect stack, when the backend can see it.
    fn protect_top(&self) -> Option<Value> {
        None
    }
}

/// Execution context handed to every constructor.
///
/// Single-threaded: a `Context` is `!Sync` and one entry point runs to
/// completion before another may begin.
pub struct Context<'rt> {
    registry: ProtectionRegistry<'rt>,
}

impl<'rt> Context<'rt> {
    /// A context that aborts the process on protocol violations.
    pub fn new(rt: &'rt dyn Runtime) -> Self {
        Self::with_policy(rt, ViolationPolicy::default())
    }

    pub fn with_policy(rt: &'rt dyn Runtime, policy: ViolationPolicy) -> Self {
        Self {
            registry: ProtectionRegistry::new(rt, policy),
        }
    }

    #[inline]
    pub fn runtime(&self) -> &'rt dyn Runtime {
        self.registry.runtime()
    }

    #[inline]
    pub fn registry(&self) -> &ProtectionRegistry<'rt> {
        &self.registry
    }

    /// `R_NilValue`.
    #[inline]
    pub fn nil(&self) -> Value {
        self.runtime().nil()
    }

    /// Pushes `v` onto the protection stack and returns it.
    #[inline]
    pub fn protect(&self, v: Value) -> Value {
        self.registry.push(v)
    }

    /// Pops `n` entries.
    #[inline]
    pub fn unprotect(&self, n: usize) {
        self.registry.pop(n)
    }

    /// Pops the single entry `v` was protected with.
    pub(crate) fn unprotect_handle(&self, v: Value) {
        self.registry.pop_handle(v)
    }

    /// Opens a scope whose protections are released when it drops.
    #[inline]
    pub fn scope(&self) -> ProtectScope<'_> {
        self.registry.scope()
    }
}
