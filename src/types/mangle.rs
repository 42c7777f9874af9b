//! Canonical type identity
//!
//! Mangled names are identifier-safe and prefix-free: basics are spelled
//! by name in lower case, every composite starts with an upper-case tag
//! and carries explicit lengths where a boundary would be ambiguous.
//!
//! ```text
//! i32                      i32
//! Vec<String>              Sstr
//! [f64; 3]                 A3_f64
//! Option<Box<Person>>      PN6PersonE
//! HashMap<String, u8>      Mstru8
//! geo::Point               N3geo5PointE
//! ```

use super::TypeDesc;
use std::fmt::Write;

pub fn mangle(desc: &TypeDesc) -> String {
    let mut out = String::new();
    mangle_into(desc, &mut out);
    out
}

fn mangle_into(desc: &TypeDesc, out: &mut String) {
    match desc {
        TypeDesc::Basic(b) => out.push_str(b.name()),
        TypeDesc::Named(name) => {
            out.push('N');
            for seg in name.split("::") {
                let _ = write!(out, "{}{}", seg.len(), seg);
            }
            out.push('E');
        }
        TypeDesc::Slice(elem) => {
            out.push('S');
            mangle_into(elem, out);
        }
        TypeDesc::Array(n, elem) => {
            let _ = write!(out, "A{}_", n);
            mangle_into(elem, out);
        }
        TypeDesc::Pointer(elem) => {
            out.push('P');
            mangle_into(elem, out);
        }
        TypeDesc::Map(key, value) => {
            out.push('M');
            mangle_into(key, out);
            mangle_into(value, out);
        }
        TypeDesc::Tuple(elems) => {
            let _ = write!(out, "T{}_", elems.len());
            for e in elems {
                mangle_into(e, out);
            }
        }
        TypeDesc::Boxed(elem) => {
            out.push('B');
            mangle_into(elem, out);
        }
        TypeDesc::RawPointer { mutable, pointee } => {
            out.push_str(if *mutable { "Rm" } else { "Rc" });
            mangle_into(pointee, out);
        }
        // Never emitted; hashed so the identity stays total and prefix-free.
        TypeDesc::Function { .. } | TypeDesc::Interface(_) | TypeDesc::Channel { .. } | TypeDesc::Opaque(_) => {
            let text = desc.to_string();
            let hash = blake3::hash(text.as_bytes());
            out.push('X');
            out.push_str(&hash.to_hex().as_str()[..16]);
        }
    }
}
