//! Protection registry - LIFO rooting shared with the foreign collector
//!
//! R only keeps an object alive while something it can see refers to it.
//! Between allocating an object and linking it into a reachable graph, the
//! object must sit on the protect stack, or the next allocation may free it.
//!
//! Design:
//! - Every push and pop goes through [`ProtectionRegistry`], which keeps a
//!   depth mirror and push/pop counters for balance checks
//! - [`ProtectScope`] releases its protections in one pop when it drops,
//!   including on `?` and unwinding
//! - Misuse is never ignored: it is logged and then aborts the process, or
//!   panics under [`ViolationPolicy::Panic`]

use crate::logging::{log_protect, log_unprotect, log_violation};
use crate::runtime::Runtime;
use crate::sexp::{Sexp, Value};
use std::cell::Cell;
use std::fmt;


/// What to do after logging a protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViolationPolicy {
    /// Abort the process, as R itself does on stack imbalance.
    #[default]
    Abort,
    /// Panic instead. Meant for test harnesses.
    Panic,
}

impl ViolationPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Some(Self::Abort),
            "panic" => Some(Self::Panic),
            _ => None,
        }
    }
}

/// Misuse of the protection protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// More entries popped than were pushed.
    PopPastEmpty { requested: usize, depth: usize },
    /// `unprotect` called on a handle that points nowhere.
    UnprotectNull,
    /// `unprotect` called on a handle that is not on top of the stack.
    UnprotectNotTop,
    /// A scope closed with a different depth than it accounts for.
    UnbalancedScope { expected: usize, actual: usize },
    /// A scope closed while a scope opened after it was still live.
    ScopeOrder { level: usize, open: usize },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PopPastEmpty { requested, depth } => write!(
                f,
                "unprotect({}) with only {} protected objects",
                requested, depth
            ),
            Self::UnprotectNull => write!(f, "unprotect of a null handle"),
            Self::UnprotectNotTop => {
                write!(f, "unprotect of a handle that is not on top of the stack")
            }
            Self::UnbalancedScope { expected, actual } => write!(
                f,
                "scope closed at depth {} but expected depth {}",
                actual, expected
            ),
            Self::ScopeOrder { level, open } => write!(
                f,
                "scope {} closed while {} scopes are open",
                level, open
            ),
        }
    }
}

impl std::error::Error for ProtocolViolation {}

/// Counters exposed for balance checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub depth: usize,
    pub peak_depth: usize,
    pub pushes: u64,
    pub pops: u64,
}

/// The protect stack as seen from the host side.
pub struct ProtectionRegistry<'rt> {
    rt: &'rt dyn Runtime,
    policy: ViolationPolicy,
    depth: Cell<usize>,
    peak_depth: Cell<usize>,
    pushes: Cell<u64>,
    pops: Cell<u64>,
    open_scopes: Cell<usize>,
}

impl<'rt> ProtectionRegistry<'rt> {
    pub fn new(rt: &'rt dyn Runtime, policy: ViolationPolicy) -> Self {
        Self {
            rt,
            policy,
            depth: Cell::new(0),
            peak_depth: Cell::new(0),
            pushes: Cell::new(0),
            pops: Cell::new(0),
            open_scopes: Cell::new(0),
        }
    }

    #[inline]
    pub fn runtime(&self) -> &'rt dyn Runtime {
        self.rt
    }

    #[inline]
    pub fn policy(&self) -> ViolationPolicy {
        self.policy
    }

    /// Number of entries pushed through this registry and not yet popped.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            depth: self.depth.get(),
            peak_depth: self.peak_depth.get(),
            pushes: self.pushes.get(),
            pops: self.pops.get(),
        }
    }

    /// Push: registers `v` as reachable and returns it.
    pub fn push(&self, v: Value) -> Value {
        self.rt.protect(v);
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        self.pushes.set(self.pushes.get() + 1);
        if depth > self.peak_depth.get() {
            self.peak_depth.set(depth);
        }
        log_protect(depth);
        v
    }

    /// Pop(n): releases the `n` most recent entries.
    pub fn pop(&self, n: usize) {
        let depth = self.depth.get();
        if n > depth {
            self.violation(ProtocolViolation::PopPastEmpty { requested: n, depth });
        }
        if n == 0 {
            return;
        }
        self.rt.unprotect(n);
        self.depth.set(depth - n);
        self.pops.set(self.pops.get() + n as u64);
        log_unprotect(n, depth - n);
    }

    /// Pops one entry, checking that it belongs to `v`.
    pub fn pop_handle(&self, v: Value) {
        if v.is_null_ptr() {
            self.violation(ProtocolViolation::UnprotectNull);
        }
        if let Some(top) = self.rt.protect_top() {
            if top != v {
                self.violation(ProtocolViolation::UnprotectNotTop);
            }
        }
        self.pop(1);
    }

    /// Opens a nested scope at the current depth.
    pub fn scope(&self) -> ProtectScope<'_> {
        let level = self.open_scopes.get() + 1;
        self.open_scopes.set(level);
        ProtectScope {
            registry: self,
            base: self.depth.get(),
            count: Cell::new(0),
            level,
        }
    }

    /// Logs `v`, then aborts or panics per policy. Never returns.
    #[cold]
    #[inline(never)]
    pub fn violation(&self, v: ProtocolViolation) -> ! {
        log_violation(&v.to_string(), self.depth.get());
        fatal(self.policy, v)
    }
}

/// The single exit for protocol violations.
///
/// A panic while already unwinding would abort anyway, so abort directly.
#[cold]
fn fatal(policy: ViolationPolicy, v: ProtocolViolation) -> ! {
    match policy {
        ViolationPolicy::Panic if !std::thread::panicking() => {
            panic!("protection protocol violated: {}", v)
        }
        _ => {
            eprintln!("rgo: fatal: protection protocol violated: {}", v);
            std::process::abort()
        }
    }
}

/// RAII protection scope.
///
/// ```ignore
/// let scope = cx.scope();
/// let names = scope.protect(StringVector::new(cx, n));
/// let values = scope.protect(Integer::new(cx, n));
/// // ... fill both ...
/// pack::set_names(cx, values.into(), names);
/// values.into()
/// // scope drops here: UNPROTECT(2)
/// ```
pub struct ProtectScope<'a> {
    registry: &'a ProtectionRegistry<'a>,
    base: usize,
    count: Cell<usize>,
    level: usize,
}

impl<'a> ProtectScope<'a> {
    /// Protects `v` until the scope drops and returns it.
    pub fn protect<T: Sexp>(&self, v: T) -> T {
        self.registry.push(v.value());
        self.count.set(self.count.get() + 1);
        v
    }

    /// Entries this scope will release.
    #[inline]
    pub fn len(&self) -> usize {
        self.count.get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ProtectScope<'_> {
    fn drop(&mut self) {
        let reg = self.registry;
        let open = reg.open_scopes.get();
        if open != self.level {
            reg.violation(ProtocolViolation::ScopeOrder { level: self.level, open });
        }
        let expected = self.base + self.count.get();
        let actual = reg.depth();
        if actual != expected {
            reg.violation(ProtocolViolation::UnbalancedScope { expected, actual });
        }
        reg.open_scopes.set(open - 1);
        reg.pop(self.count.get());
    }
}

impl fmt::Debug for ProtectScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectScope")
            .field("base", &self.base)
            .field("count", &self.count.get())
            .field("level", &self.level)
            .finish()
    }
}
