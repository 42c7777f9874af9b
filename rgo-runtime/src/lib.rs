//! rgo runtime - R's object model for Rust extensions
//!
//! This crate is linked into every extension built from `rgo` generated
//! code. It provides:
//! - [`sexp`]: typed, zero-copy handles over R's in-memory objects
//! - [`protect`]: the protect stack discipline, with RAII scopes
//! - [`runtime`]: the seam to the foreign runtime, and [`Context`]
//! - [`pack`]: the primitives generated constructors are made of
//! - [`heap`]: an in-process, R-layout heap for tools and tests
//!
//! With the `libr` feature, `ffi::RSession` binds the seam to R itself.

pub mod complex;
pub mod heap;
pub mod logging;
pub mod pack;
pub mod protect;
pub mod runtime;
pub mod sexp;

#[cfg(all(feature = "libr", unix))]
pub mod ffi;

pub use complex::{Complex128, Complex64};
pub use heap::{Heap, HeapStats};
pub use protect::{ProtectScope, ProtectionRegistry, ProtocolViolation, ViolationPolicy};
pub use runtime::{Context, Runtime};
pub use sexp::{Object, Sexp, SexpType, Value};

/// Runtime initialization. Installs the default log subscriber unless the
/// host already has one.
#[no_mangle]
pub extern "C" fn rgo_runtime_init() {
    logging::init_runtime_logging();
    let backend = if cfg!(feature = "libr") { "libR" } else { "heap" };
    logging::log_runtime_init(backend);
}
