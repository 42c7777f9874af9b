//! Rendering descriptions as Rust type syntax

use super::{Basic, DefKind, TypeDesc, TypeTable};
use std::fmt;

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(Basic::Str) => write!(f, "String"),
            Self::Basic(Basic::C64) => write!(f, "Complex64"),
            Self::Basic(Basic::C128) => write!(f, "Complex128"),
            Self::Basic(b) => write!(f, "{}", b.name()),
            Self::Named(name) => write!(f, "{}", name),
            Self::Slice(elem) => write!(f, "Vec<{}>", elem),
            Self::Array(n, elem) => write!(f, "[{}; {}]", elem, n),
            Self::Pointer(elem) => write!(f, "Option<Box<{}>>", elem),
            Self::Map(key, value) => write!(f, "HashMap<{}, {}>", key, value),
            Self::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems)?;
                if elems.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Boxed(elem) => write!(f, "Box<{}>", elem),
            Self::RawPointer { mutable, pointee } => {
                write!(f, "*{} {}", if *mutable { "mut" } else { "const" }, pointee)
            }
            Self::Function { params, ret } => {
                write!(f, "fn(")?;
                write_list(f, params)?;
                write!(f, ")")?;
                match ret {
                    Some(ret) => write!(f, " -> {}", ret),
                    None => Ok(()),
                }
            }
            Self::Interface(path) => write!(f, "dyn {}", path),
            Self::Channel { kind, elem } => write!(f, "{}<{}>", kind, elem),
            Self::Opaque(text) => write!(f, "{}", text),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeDesc]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl TypeTable {
    /// The owned Rust type generated code sees for `desc`. `rt` is the path
    /// of the runtime crate.
    pub fn host_type(&self, desc: &TypeDesc, rt: &str) -> String {
        match desc {
            TypeDesc::Basic(Basic::Str) => "String".to_string(),
            TypeDesc::Basic(Basic::C64) => format!("{}::Complex64", rt),
            TypeDesc::Basic(Basic::C128) => format!("{}::Complex128", rt),
            TypeDesc::Basic(b) => b.name().to_string(),
            TypeDesc::Named(name) => match self.get(name) {
                Some(def) if def.kind == DefKind::Error => format!("Option<{}>", def.rust_path()),
                Some(def) => def.rust_path().to_string(),
                None => name.clone(),
            },
            TypeDesc::Slice(elem) => format!("Vec<{}>", self.host_type(elem, rt)),
            TypeDesc::Array(n, elem) => format!("[{}; {}]", self.host_type(elem, rt), n),
            TypeDesc::Pointer(elem) => format!("Option<Box<{}>>", self.host_type(elem, rt)),
            TypeDesc::Map(key, value) => format!(
                "::std::collections::HashMap<{}, {}>",
                self.host_type(key, rt),
                self.host_type(value, rt)
            ),
            other => other.to_string(),
        }
    }

    /// Parameter type of the constructor for `desc`: `&str` for text,
    /// `&[T]` for slices and `&T` otherwise.
    pub fn param_type(&self, desc: &TypeDesc, rt: &str) -> String {
        match desc {
            TypeDesc::Basic(Basic::Str) => "&str".to_string(),
            TypeDesc::Slice(elem) => format!("&[{}]", self.host_type(elem, rt)),
            other => format!("&{}", self.host_type(other, rt)),
        }
    }
}
