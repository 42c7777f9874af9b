//! Host type descriptions
//!
//! A [`TypeDesc`] is the structural description of a Rust type as it
//! appears in a manifest. Defined (named) types live in a [`TypeTable`]
//! keyed by name; descriptions refer to them by name, so recursive
//! definitions need no special handling here.

mod describe;
mod mangle;
mod parse;

#[cfg(test)]
mod tests;

pub use mangle::mangle;
pub use parse::parse_type;

use rgo_runtime::SexpType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Primitive host types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Basic {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    C64,
    C128,
    Str,
    // Parsed so they can be rejected with a precise message.
    Char,
    I128,
    U128,
}

impl Basic {
    /// Short name, also the mangled form.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::C64 => "c64",
            Self::C128 => "c128",
            Self::Str => "str",
            Self::Char => "char",
            Self::I128 => "i128",
            Self::U128 => "u128",
        }
    }

    /// Recognizes Rust spellings: primitive names, `String`, `str`,
    /// `Complex64` and `Complex128`.
    pub fn from_rust_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "isize" => Self::Isize,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "usize" => Self::Usize,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "Complex64" => Self::C64,
            "Complex128" => Self::C128,
            "String" | "str" => Self::Str,
            "char" => Self::Char,
            "i128" => Self::I128,
            "u128" => Self::U128,
            _ => return None,
        })
    }

    /// The R vector kind a scalar of this type packs into, if any.
    pub const fn foreign_kind(self) -> Option<SexpType> {
        match self {
            Self::Bool => Some(SexpType::Logical),
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::Isize => Some(SexpType::Integer),
            Self::U16 | Self::U32 | Self::U64 | Self::Usize => Some(SexpType::Integer),
            Self::U8 => Some(SexpType::Raw),
            Self::F32 | Self::F64 => Some(SexpType::Real),
            Self::C64 | Self::C128 => Some(SexpType::Complex),
            Self::Str => Some(SexpType::String),
            Self::Char | Self::I128 | Self::U128 => None,
        }
    }

    /// Integer widths other than `u8`, all narrowed to R's 32-bit integer.
    pub const fn is_integer(self) -> bool {
        matches!(self.foreign_kind(), Some(SexpType::Integer))
    }

    /// Inclusive value range for integer types.
    pub const fn range(self) -> Option<(i128, i128)> {
        Some(match self {
            Self::I8 => (i8::MIN as i128, i8::MAX as i128),
            Self::I16 => (i16::MIN as i128, i16::MAX as i128),
            Self::I32 => (i32::MIN as i128, i32::MAX as i128),
            Self::I64 | Self::Isize => (i64::MIN as i128, i64::MAX as i128),
            Self::U8 => (0, u8::MAX as i128),
            Self::U16 => (0, u16::MAX as i128),
            Self::U32 => (0, u32::MAX as i128),
            Self::U64 | Self::Usize => (0, u64::MAX as i128),
            _ => return None,
        })
    }
}

/// Structural description of a host type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Basic(Basic),
    /// Reference to a defined type in the [`TypeTable`].
    Named(String),
    /// `Vec<T>` or `&[T]`.
    Slice(Box<TypeDesc>),
    /// `[T; N]`.
    Array(usize, Box<TypeDesc>),
    /// `Option<Box<T>>`: nullable, one level of indirection.
    Pointer(Box<TypeDesc>),
    /// `HashMap<K, V>`.
    Map(Box<TypeDesc>, Box<TypeDesc>),
    /// Anonymous product type.
    Tuple(Vec<TypeDesc>),
    /// `Box<T>` outside `Option`.
    Boxed(Box<TypeDesc>),
    RawPointer { mutable: bool, pointee: Box<TypeDesc> },
    Function { params: Vec<TypeDesc>, ret: Option<Box<TypeDesc>> },
    /// `dyn Trait`.
    Interface(String),
    /// `Sender<T>`, `SyncSender<T>` or `Receiver<T>`.
    Channel { kind: String, elem: Box<TypeDesc> },
    /// Any other generic type, kept as written.
    Opaque(String),
}

impl TypeDesc {
    pub fn slice(elem: TypeDesc) -> Self {
        Self::Slice(Box::new(elem))
    }

    pub fn pointer(pointee: TypeDesc) -> Self {
        Self::Pointer(Box::new(pointee))
    }

    pub fn map(key: TypeDesc, value: TypeDesc) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Rust field name.
    pub name: String,
    pub ty: TypeDesc,
    /// Explicit foreign-visible name.
    pub rename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefKind {
    /// Tuple newtype `Name(Repr)`.
    Newtype(TypeDesc),
    Struct(Vec<Field>),
    /// Error capability: the host value is `Option<T>` with `T: Display`.
    Error,
}

/// A defined type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    /// Rust path used in generated code; defaults to the name.
    pub path: Option<String>,
    pub kind: DefKind,
}

impl TypeDef {
    pub fn rust_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// Name of the built-in error descriptor.
pub const ERROR: &str = "error";

/// Defined types by name. Always contains the built-in `error`.
#[derive(Debug, Clone)]
pub struct TypeTable {
    defs: BTreeMap<String, TypeDef>,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut defs = BTreeMap::new();
        defs.insert(
            ERROR.to_string(),
            TypeDef {
                name: ERROR.to_string(),
                path: Some("Box<dyn ::std::error::Error>".to_string()),
                kind: DefKind::Error,
            },
        );
        Self { defs }
    }

    /// Adds a definition. A name that is already defined hands the new
    /// definition back.
    pub fn define(&mut self, def: TypeDef) -> Result<(), TypeDef> {
        if self.defs.contains_key(&def.name) {
            return Err(def);
        }
        self.defs.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.defs.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.defs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Whether `desc` names a type with the error capability.
    pub fn is_error(&self, desc: &TypeDesc) -> bool {
        match desc {
            TypeDesc::Named(name) => {
                matches!(self.get(name).map(|d| &d.kind), Some(DefKind::Error))
            }
            _ => false,
        }
    }

    /// Follows newtypes down to a basic type, counting the `.0`
    /// projections needed to reach it.
    pub fn underlying_basic(&self, desc: &TypeDesc) -> Option<(Basic, usize)> {
        let mut cur = desc;
        // A newtype chain longer than the table is a cycle.
        for depth in 0..=self.defs.len() {
            match cur {
                TypeDesc::Basic(b) => return Some((*b, depth)),
                TypeDesc::Named(name) => match self.get(name).map(|d| &d.kind) {
                    Some(DefKind::Newtype(repr)) => cur = repr,
                    _ => return None,
                },
                _ => return None,
            }
        }
        None
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a struct field to its foreign-visible name.
pub trait NamingPolicy {
    fn field_name(&self, owner: &TypeDef, field: &Field) -> String;
}

/// Uses the explicit rename when present, the Rust field name otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNaming;

impl NamingPolicy for DefaultNaming {
    fn field_name(&self, _owner: &TypeDef, field: &Field) -> String {
        field.rename.clone().unwrap_or_else(|| field.name.clone())
    }
}

/// Strict and reserved keywords of the 2021 edition.
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
    "true", "try", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do",
    "final", "macro", "override", "priv", "typeof", "unsized", "virtual", "yield",
];

/// Keywords that cannot be written as raw identifiers either.
const NOT_RAW: &[&str] = &["crate", "self", "Self", "super"];

pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// Whether `s` can name a struct field, possibly as a raw identifier.
pub fn is_field_name(s: &str) -> bool {
    is_ident(s) && !NOT_RAW.contains(&s)
}

/// `s` as written in Rust source: `r#type` for keywords.
pub fn raw_ident(s: &str) -> String {
    if is_keyword(s) {
        format!("r#{}", s)
    } else {
        s.to_string()
    }
}

/// Whether `s` is a plain Rust identifier.
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    s != "_" && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
