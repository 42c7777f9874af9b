//! Generic handle and kind dispatch

use super::info::{Info, SexpType};
use super::layout::{ConsRec, Header, VectorRec};
use super::list::{Cells, Dot, Lang, List, Symbol};
use super::funcs::{Builtin, Closure, Environment, Promise, Special};
use super::vector::{
    Character, Complex, Expression, Integer, Logical, Raw, Real, StringVector, Vector,
    WeakReference,
};
use core::ffi::c_void;
use core::fmt;

/// Untyped handle to an R object (`SEXP`).
///
/// A `Value` is either a null pointer or points at a live object. The only
/// ways to obtain one are [`Value::from_raw`], whose contract requires
/// liveness, and the [`crate::runtime::Runtime`] allocators.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(*mut Header);

impl Value {
    /// A handle that points nowhere. Distinct from R's `NULL` object, but
    /// treated the same by every accessor.
    #[inline]
    pub const fn null() -> Self {
        Self(core::ptr::null_mut())
    }

    /// # Safety
    /// `ptr` must be null or point at a live R object.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr as *mut Header)
    }

    #[inline]
    pub(crate) fn from_header(ptr: *mut Header) -> Self {
        Self(ptr)
    }

    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    #[inline]
    pub(crate) fn header(self) -> *mut Header {
        self.0
    }

    /// Info word. A null pointer reports the canonical null kind.
    #[inline]
    pub fn info(self) -> Info {
        if self.0.is_null() {
            return Info::NIL;
        }
        unsafe { (*self.0).sxpinfo }
    }

    #[inline]
    pub fn kind(self) -> Option<SexpType> {
        self.info().kind()
    }

    /// True for a null pointer and for R's `NULL` object.
    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null() || self.info().type_code() == SexpType::Nil.code()
    }

    /// True only for a pointer that points nowhere.
    #[inline]
    pub fn is_null_ptr(self) -> bool {
        self.0.is_null()
    }

    /// Attribute pairlist, `None` when the object has no attributes.
    pub fn attributes(self) -> Option<List> {
        if self.is_null() {
            return None;
        }
        let attrib = Value(unsafe { (*self.0).attrib });
        if attrib.is_null() {
            return None;
        }
        List::from_value(attrib)
    }

    /// Looks an attribute up by name, e.g. `"names"`.
    pub fn attribute(self, name: &str) -> Option<Value> {
        self.attributes()?.get(name.as_bytes())
    }

    /// The `names` of an object as R's `names()` reports them: cell tags
    /// for pairlists, the `names` attribute otherwise.
    pub fn names(self) -> Option<Vec<String>> {
        if self.kind().map_or(false, SexpType::is_pairlist) {
            let tags: Vec<_> = Cells::new(self).map(|(tag, _)| tag).collect();
            if tags.iter().all(Option::is_none) {
                return None;
            }
            return Some(
                tags.into_iter()
                    .map(|t| t.map(|s| s.to_string()).unwrap_or_default())
                    .collect(),
            );
        }
        self.attribute("names")
            .and_then(StringVector::from_value)
            .map(|names| names.to_strings())
    }

    /// Length as R's `xlength` reports it: the element count of vectors,
    /// the cell count of pairlists, 0 for `NULL` and 1 otherwise.
    pub fn len(self) -> usize {
        match self.kind() {
            _ if self.is_null() => 0,
            Some(kind) if kind.is_vector() => unsafe {
                (*(self.0 as *mut VectorRec)).length as usize
            },
            Some(kind) if kind.is_pairlist() => {
                let mut n = 0;
                let mut cur = self;
                while !cur.is_null() && cur.kind().map_or(false, SexpType::is_pairlist) {
                    n += 1;
                    cur = Value(unsafe { (*(cur.0 as *mut ConsRec)).cdrval });
                }
                n
            }
            _ => 1,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Dispatches to the concrete variant named by the kind tag.
    ///
    /// Kinds without a dedicated handle, and codes this crate does not
    /// know, come back as [`Object::Other`].
    pub fn interface(self) -> Object {
        if self.is_null() {
            return Object::Null;
        }
        let kind = match self.kind() {
            Some(kind) => kind,
            None => return Object::Other(self),
        };
        unsafe {
            match kind {
                SexpType::Nil => Object::Null,
                SexpType::Symbol => Object::Symbol(Symbol::from_value_unchecked(self)),
                SexpType::List => Object::List(List::from_value_unchecked(self)),
                SexpType::Closure => Object::Closure(Closure::from_value_unchecked(self)),
                SexpType::Environment => {
                    Object::Environment(Environment::from_value_unchecked(self))
                }
                SexpType::Promise => Object::Promise(Promise::from_value_unchecked(self)),
                SexpType::Lang => Object::Lang(Lang::from_value_unchecked(self)),
                SexpType::Special => Object::Special(Special::from_value_unchecked(self)),
                SexpType::Builtin => Object::Builtin(Builtin::from_value_unchecked(self)),
                SexpType::Char => Object::Character(Character::from_value_unchecked(self)),
                SexpType::Logical => Object::Logical(Logical::from_value_unchecked(self)),
                SexpType::Integer => Object::Integer(Integer::from_value_unchecked(self)),
                SexpType::Real => Object::Real(Real::from_value_unchecked(self)),
                SexpType::Complex => Object::Complex(Complex::from_value_unchecked(self)),
                SexpType::String => Object::String(StringVector::from_value_unchecked(self)),
                SexpType::Dot => Object::Dot(Dot::from_value_unchecked(self)),
                SexpType::Vector => Object::Vector(Vector::from_value_unchecked(self)),
                SexpType::Expression => {
                    Object::Expression(Expression::from_value_unchecked(self))
                }
                SexpType::WeakReference => {
                    Object::WeakReference(WeakReference::from_value_unchecked(self))
                }
                SexpType::Raw => Object::Raw(Raw::from_value_unchecked(self)),
                SexpType::Any
                | SexpType::Bytecode
                | SexpType::ExternalPointer
                | SexpType::S4
                | SexpType::New
                | SexpType::Free => Object::Other(self),
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:p}: {})", self.0, self.info())
    }
}

/// Common surface of every handle.
pub trait Sexp: Copy {
    fn value(self) -> Value;

    #[inline]
    fn info(self) -> Info {
        self.value().info()
    }

    #[inline]
    fn attributes(self) -> Option<List> {
        self.value().attributes()
    }

    #[inline]
    fn pointer(self) -> *mut c_void {
        self.value().as_ptr()
    }
}

impl Sexp for Value {
    #[inline]
    fn value(self) -> Value {
        self
    }
}

/// A handle resolved to its concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Object {
    Null,
    Symbol(Symbol),
    List(List),
    Closure(Closure),
    Environment(Environment),
    Promise(Promise),
    Lang(Lang),
    Special(Special),
    Builtin(Builtin),
    Character(Character),
    Logical(Logical),
    Integer(Integer),
    Real(Real),
    Complex(Complex),
    String(StringVector),
    Dot(Dot),
    Vector(Vector),
    Expression(Expression),
    WeakReference(WeakReference),
    Raw(Raw),
    /// Any kind without a dedicated handle.
    Other(Value),
}
