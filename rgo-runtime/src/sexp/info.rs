//! Object metadata - the `sxpinfo` word at the head of every R object
//!
//! Design: a single 64-bit word mirroring R's `sxpinfo_struct` bitfield.
//! Bit positions follow the C compiler's LSB-first allocation on the
//! platforms R supports.

use core::fmt;

/// R object kind (`SEXPTYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SexpType {
    Nil = 0,
    Symbol = 1,
    List = 2,
    Closure = 3,
    Environment = 4,
    Promise = 5,
    Lang = 6,
    Special = 7,
    Builtin = 8,
    Char = 9,
    Logical = 10,
    Integer = 13,
    Real = 14,
    Complex = 15,
    String = 16,
    Dot = 17,
    Any = 18,
    Vector = 19,
    Expression = 20,
    Bytecode = 21,
    ExternalPointer = 22,
    WeakReference = 23,
    Raw = 24,
    S4 = 25,
    New = 30,
    Free = 31,
}

impl SexpType {
    /// Decode a 5-bit type code. Codes R does not define yield `None`.
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Nil,
            1 => Self::Symbol,
            2 => Self::List,
            3 => Self::Closure,
            4 => Self::Environment,
            5 => Self::Promise,
            6 => Self::Lang,
            7 => Self::Special,
            8 => Self::Builtin,
            9 => Self::Char,
            10 => Self::Logical,
            13 => Self::Integer,
            14 => Self::Real,
            15 => Self::Complex,
            16 => Self::String,
            17 => Self::Dot,
            18 => Self::Any,
            19 => Self::Vector,
            20 => Self::Expression,
            21 => Self::Bytecode,
            22 => Self::ExternalPointer,
            23 => Self::WeakReference,
            24 => Self::Raw,
            25 => Self::S4,
            30 => Self::New,
            31 => Self::Free,
            _ => return None,
        })
    }

    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The C macro name, e.g. `INTSXP`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Nil => "NILSXP",
            Self::Symbol => "SYMSXP",
            Self::List => "LISTSXP",
            Self::Closure => "CLOSXP",
            Self::Environment => "ENVSXP",
            Self::Promise => "PROMSXP",
            Self::Lang => "LANGSXP",
            Self::Special => "SPECIALSXP",
            Self::Builtin => "BUILTINSXP",
            Self::Char => "CHARSXP",
            Self::Logical => "LGLSXP",
            Self::Integer => "INTSXP",
            Self::Real => "REALSXP",
            Self::Complex => "CPLXSXP",
            Self::String => "STRSXP",
            Self::Dot => "DOTSXP",
            Self::Any => "ANYSXP",
            Self::Vector => "VECSXP",
            Self::Expression => "EXPRSXP",
            Self::Bytecode => "BCODESXP",
            Self::ExternalPointer => "EXTPTRSXP",
            Self::WeakReference => "WEAKREFSXP",
            Self::Raw => "RAWSXP",
            Self::S4 => "OBJSXP",
            Self::New => "NEWSXP",
            Self::Free => "FREESXP",
        }
    }

    /// The name `typeof()` reports at the R level.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Nil => "NULL",
            Self::Symbol => "symbol",
            Self::List => "pairlist",
            Self::Closure => "closure",
            Self::Environment => "environment",
            Self::Promise => "promise",
            Self::Lang => "language",
            Self::Special => "special",
            Self::Builtin => "builtin",
            Self::Char => "char",
            Self::Logical => "logical",
            Self::Integer => "integer",
            Self::Real => "double",
            Self::Complex => "complex",
            Self::String => "character",
            Self::Dot => "...",
            Self::Any => "any",
            Self::Vector => "list",
            Self::Expression => "expression",
            Self::Bytecode => "bytecode",
            Self::ExternalPointer => "externalptr",
            Self::WeakReference => "weakref",
            Self::Raw => "raw",
            Self::S4 => "S4",
            Self::New => "new",
            Self::Free => "free",
        }
    }

    /// Kinds whose payload is a length-prefixed array after the header.
    pub const fn is_vector(self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::Logical
                | Self::Integer
                | Self::Real
                | Self::Complex
                | Self::String
                | Self::Vector
                | Self::Expression
                | Self::WeakReference
                | Self::Raw
        )
    }

    /// Kinds laid out as cons cells.
    pub const fn is_pairlist(self) -> bool {
        matches!(self, Self::List | Self::Lang | Self::Dot)
    }

    /// Size in bytes of one payload element, for vector kinds.
    pub const fn element_size(self) -> Option<usize> {
        match self {
            Self::Char | Self::Raw => Some(1),
            Self::Logical | Self::Integer => Some(4),
            Self::Real => Some(8),
            Self::Complex => Some(16),
            Self::String | Self::Vector | Self::Expression | Self::WeakReference => {
                Some(core::mem::size_of::<*mut u8>())
            }
            _ => None,
        }
    }
}

impl fmt::Display for SexpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const TYPE_MASK: u64 = 0x1f;
const SCALAR_BIT: u64 = 1 << 5;
const OBJ_BIT: u64 = 1 << 6;
const ALT_BIT: u64 = 1 << 7;
const GP_SHIFT: u32 = 8;
const MARK_BIT: u64 = 1 << 24;
const DEBUG_BIT: u64 = 1 << 25;
const TRACE_BIT: u64 = 1 << 26;
const GCGEN_BIT: u64 = 1 << 28;
const GCCLS_SHIFT: u32 = 29;
const NAMED_SHIFT: u32 = 32;
const EXTRA_SHIFT: u32 = 48;

/// The information word of an R object (`sxpinfo_struct`).
///
/// Layout (LSB first): type:5 scalar:1 obj:1 alt:1 gp:16 mark:1 debug:1
/// trace:1 spare:1 gcgen:1 gccls:3 named:16 extra:16.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Info(u64);

impl Info {
    /// Info word of the canonical null object.
    pub const NIL: Info = Info::new(SexpType::Nil);

    /// Fresh info word for an object of the given kind, all flags clear.
    #[inline]
    pub const fn new(kind: SexpType) -> Self {
        Self(kind as u64)
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Raw 5-bit type code.
    #[inline]
    pub const fn type_code(self) -> u8 {
        (self.0 & TYPE_MASK) as u8
    }

    /// Decoded kind, `None` for codes this crate does not know.
    #[inline]
    pub const fn kind(self) -> Option<SexpType> {
        SexpType::from_code(self.type_code())
    }

    #[inline]
    pub(crate) fn with_kind(self, kind: SexpType) -> Self {
        Self((self.0 & !TYPE_MASK) | kind as u64)
    }

    #[inline]
    pub const fn is_scalar(self) -> bool {
        self.0 & SCALAR_BIT != 0
    }

    #[inline]
    pub(crate) fn with_scalar(self, scalar: bool) -> Self {
        self.set(SCALAR_BIT, scalar)
    }

    /// Whether the object has a class attribute.
    #[inline]
    pub const fn is_object(self) -> bool {
        self.0 & OBJ_BIT != 0
    }

    /// Whether the object is an ALTREP instance.
    #[inline]
    pub const fn is_altrep(self) -> bool {
        self.0 & ALT_BIT != 0
    }

    /// General purpose bits.
    #[inline]
    pub const fn gp(self) -> u16 {
        (self.0 >> GP_SHIFT) as u16
    }

    #[inline]
    pub const fn is_marked(self) -> bool {
        self.0 & MARK_BIT != 0
    }

    #[inline]
    pub(crate) fn with_mark(self, mark: bool) -> Self {
        self.set(MARK_BIT, mark)
    }

    #[inline]
    pub const fn is_debug(self) -> bool {
        self.0 & DEBUG_BIT != 0
    }

    #[inline]
    pub const fn is_trace(self) -> bool {
        self.0 & TRACE_BIT != 0
    }

    #[inline]
    pub const fn gc_generation(self) -> u8 {
        (self.0 & GCGEN_BIT != 0) as u8
    }

    #[inline]
    pub const fn gc_class(self) -> u8 {
        ((self.0 >> GCCLS_SHIFT) & 0b111) as u8
    }

    /// Reference count (`NAMED`) field.
    #[inline]
    pub const fn named(self) -> u16 {
        (self.0 >> NAMED_SHIFT) as u16
    }

    #[inline]
    pub const fn extra(self) -> u16 {
        (self.0 >> EXTRA_SHIFT) as u16
    }

    #[inline]
    fn set(self, bit: u64, on: bool) -> Self {
        if on {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{}", kind)?,
            None => write!(f, "<type {}>", self.type_code())?,
        }
        if self.is_scalar() {
            f.write_str(" scalar")?;
        }
        if self.is_object() {
            f.write_str(" obj")?;
        }
        if self.is_altrep() {
            f.write_str(" alt")?;
        }
        if self.gp() != 0 {
            write!(f, " gp={:#06x}", self.gp())?;
        }
        if self.named() != 0 {
            write!(f, " named={}", self.named())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Info({:#018x}: {})", self.0, self)
    }
}
