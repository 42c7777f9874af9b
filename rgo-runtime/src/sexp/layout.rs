//! Object layout - `#[repr(C)]` mirrors of R's `SEXPREC` family
//!
//! Design: every record starts with the same 32-byte header. Non-vector
//! nodes carry three pointer slots after it; vectors carry a length pair
//! followed by the payload. Sizes and offsets are checked at compile time
//! against R's 64-bit layout so a change in R shows up as a build failure
//! here and nowhere else.

use super::info::Info;
use core::mem::{offset_of, size_of};

/// R's `R_xlen_t` (`ptrdiff_t`).
pub type XLen = isize;

/// `SEXPREC_HEADER`: info word, attributes, and the collector's links.
#[repr(C, align(8))]
pub struct Header {
    pub sxpinfo: Info,
    pub attrib: *mut Header,
    pub gengc_next_node: *mut Header,
    pub gengc_prev_node: *mut Header,
}

/// `VECTOR_SEXPREC`: header plus `vecsxp_struct`. Payload follows.
#[repr(C)]
pub struct VectorRec {
    pub header: Header,
    pub length: XLen,
    pub truelength: XLen,
}

/// `listsxp_struct` node: LISTSXP, LANGSXP and DOTSXP.
#[repr(C)]
pub struct ConsRec {
    pub header: Header,
    pub carval: *mut Header,
    pub cdrval: *mut Header,
    pub tagval: *mut Header,
}

/// `symsxp_struct` node.
#[repr(C)]
pub struct SymRec {
    pub header: Header,
    pub pname: *mut Header,
    pub value: *mut Header,
    pub internal: *mut Header,
}

/// `envsxp_struct` node.
#[repr(C)]
pub struct EnvRec {
    pub header: Header,
    pub frame: *mut Header,
    pub enclos: *mut Header,
    pub hashtab: *mut Header,
}

/// `closxp_struct` node.
#[repr(C)]
pub struct CloRec {
    pub header: Header,
    pub formals: *mut Header,
    pub body: *mut Header,
    pub env: *mut Header,
}

/// `promsxp_struct` node.
#[repr(C)]
pub struct PromRec {
    pub header: Header,
    pub value: *mut Header,
    pub expr: *mut Header,
    pub env: *mut Header,
}

/// `primsxp_struct` node: BUILTINSXP and SPECIALSXP.
#[repr(C)]
pub struct PrimRec {
    pub header: Header,
    pub offset: i32,
}

/// Bytes R allocates for any non-vector node (`sizeof(SEXPREC)`).
pub const NODE_SIZE: usize = size_of::<ConsRec>();

/// Offset of the first payload element of a vector (`DATAPTR`).
pub const VECTOR_DATA_OFFSET: usize = size_of::<VectorRec>();

/// Allocation alignment of every record.
pub const RECORD_ALIGN: usize = 8;

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(size_of::<Header>() == 32);
    assert!(offset_of!(Header, attrib) == 8);
    assert!(offset_of!(Header, gengc_prev_node) == 24);
    assert!(size_of::<VectorRec>() == 48);
    assert!(offset_of!(VectorRec, length) == 32);
    assert!(offset_of!(VectorRec, truelength) == 40);
    assert!(NODE_SIZE == 56);
    assert!(offset_of!(ConsRec, carval) == 32);
    assert!(offset_of!(ConsRec, cdrval) == 40);
    assert!(offset_of!(ConsRec, tagval) == 48);
    assert!(size_of::<SymRec>() == NODE_SIZE);
    assert!(size_of::<EnvRec>() == NODE_SIZE);
    assert!(size_of::<CloRec>() == NODE_SIZE);
    assert!(size_of::<PromRec>() == NODE_SIZE);
    assert!(size_of::<PrimRec>() <= NODE_SIZE);
    assert!(offset_of!(PrimRec, offset) == 32);
};

/// Bytes needed for a vector record of `len` elements of `elem_size` bytes.
/// CHARSXP payloads carry one extra byte for the NUL terminator.
pub const fn vector_bytes(elem_size: usize, len: usize, nul_terminated: bool) -> usize {
    let payload = elem_size * len + nul_terminated as usize;
    let raw = VECTOR_DATA_OFFSET + payload;
    (raw + RECORD_ALIGN - 1) & !(RECORD_ALIGN - 1)
}
