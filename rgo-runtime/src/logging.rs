//! Logging utilities for the marshalling runtime
//!
//! Structured `tracing` events for allocation, collection and protection
//! traffic. Nothing here installs a subscriber unless asked to, so
//! embedding hosts keep control of their own logging.

pub use tracing::{debug, error, info, trace, warn, Level};

/// Initialize runtime logging with sensible defaults
///
/// `RUST_LOG` wins when set. Otherwise debug builds log this crate at DEBUG
/// and release builds at INFO.
pub fn init_runtime_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            EnvFilter::new("rgo_runtime=debug")
        }
        #[cfg(not(debug_assertions))]
        {
            EnvFilter::new("rgo_runtime=info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .ok(); // already initialized by the host
}

/// Log an object allocation
#[inline]
pub fn log_allocation(kind: &str, len: usize, bytes: usize) {
    trace!(target: "heap", kind, len, bytes, "allocated object");
}

#[inline]
pub fn log_collect_start(live: usize) {
    debug!(target: "heap", live, "starting collection");
}

/// Log a finished collection
#[inline]
pub fn log_collect_complete(marked: usize, freed: usize, duration_us: u64) {
    debug!(target: "heap", marked, freed, duration_us, "collection complete");
}

#[inline]
pub fn log_protect(depth: usize) {
    trace!(target: "protect", depth, "protect");
}

#[inline]
pub fn log_unprotect(count: usize, depth: usize) {
    trace!(target: "protect", count, depth, "unprotect");
}

/// Log a protection protocol violation. Always fatal.
#[inline]
pub fn log_violation(violation: &str, depth: usize) {
    error!(target: "protect", violation, depth, "protection protocol violated");
}

/// Log a pack primitive building an object for the foreign runtime
#[inline]
pub fn log_pack(what: &str, len: usize) {
    trace!(target: "pack", what, len, "packed value");
}

/// Log an FFI call into libR
#[inline]
pub fn log_ffi_call(function_name: &str) {
    trace!(target: "ffi", function = function_name, "FFI call");
}

#[inline]
pub fn log_runtime_init(backend: &str) {
    info!(target: "runtime", backend, "rgo runtime initialized");
}

/// Time a block and log its duration at DEBUG.
///
/// ```ignore
/// let v = time_block!("pack_struct", { pack::pairlist_struct(cx, &names, f) });
/// ```
#[macro_export]
macro_rules! time_block {
    ($name:expr, $block:block) => {{
        let _span = tracing::debug_span!($name).entered();
        let start = std::time::Instant::now();
        let result = $block;
        tracing::debug!(
            operation = $name,
            duration_us = start.elapsed().as_micros() as u64,
            "operation complete"
        );
        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_functions() {
        log_allocation("INTSXP", 3, 64);
        log_collect_start(10);
        log_collect_complete(8, 2, 12);
        log_protect(1);
        log_unprotect(1, 0);
        log_pack("integer", 1);
        log_ffi_call("Rf_allocVector");
        log_runtime_init("heap");
    }

    #[test]
    fn test_time_block_returns_value() {
        let v = time_block!("sum", { 2 + 3 });
        assert_eq!(v, 5);
    }
}
