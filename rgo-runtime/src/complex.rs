//! Complex scalars with C layout
//!
//! R stores complex numbers as `Rcomplex`, two doubles. Single precision
//! values widen on the way in.

use core::fmt;

/// Single precision complex number.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex64 {
    pub re: f32,
    pub im: f32,
}

/// Double precision complex number, layout-compatible with `Rcomplex`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex128 {
    pub re: f64,
    pub im: f64,
}

impl Complex64 {
    pub const fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }
}

impl Complex128 {
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl From<Complex64> for Complex128 {
    fn from(c: Complex64) -> Self {
        Self::new(c.re as f64, c.im as f64)
    }
}

impl fmt::Display for Complex128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im.is_sign_negative() {
            write!(f, "{}-{}i", self.re, -self.im)
        } else {
            write!(f, "{}+{}i", self.re, self.im)
        }
    }
}

#[cfg(target_pointer_width = "64")]
const _: () = assert!(core::mem::size_of::<Complex128>() == 16);
