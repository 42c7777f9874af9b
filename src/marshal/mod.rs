//! Plan interpreter
//!
//! Runs the constructor plans of a [`Plan`] against dynamic host values,
//! building the same objects the generated functions build and through
//! the same pack primitives. Used by `rgo pack` and by the tests, so every
//! code path can be exercised against the in-process heap without
//! compiling generated source.
//!
//! Values are checked against their plan before anything is allocated
//! where possible; errors raised half way through a composite release the
//! partial object's protections before propagating.


use crate::errors::MarshalError;
use crate::types::{mangle, Basic, TypeDesc};
use crate::walker::{MapValue, Plan, Shape, SliceElem};
use rgo_runtime::sexp::{Object, Value};
use rgo_runtime::{pack, Complex128, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// A dynamically typed host value, as read from JSON.
///
/// Complex numbers are written `[re, im]`. Struct values are maps keyed by
/// Rust field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostValue {
    Nil,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Text(String),
    Seq(Vec<HostValue>),
    Map(BTreeMap<String, HostValue>),
}

impl HostValue {
    /// Short description used in mismatch errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Nil => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("{:?}", s),
            Self::Seq(xs) => format!("sequence of {}", xs.len()),
            Self::Map(m) => format!("map of {}", m.len()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Int(i) => Some(i128::from(*i)),
            Self::UInt(u) => Some(i128::from(*u)),
            _ => None,
        }
    }
}

fn mismatch(expected: impl Into<String>, found: &HostValue) -> MarshalError {
    MarshalError::mismatch(expected, found.describe())
}

/// Builds objects by following a [`Plan`].
pub struct Interpreter<'p> {
    plan: &'p Plan,
}

impl<'p> Interpreter<'p> {
    pub fn new(plan: &'p Plan) -> Self {
        Self { plan }
    }

    /// Builds `v` as a value of `desc`, which must be in the plan.
    pub fn pack(&self, cx: &Context<'_>, desc: &TypeDesc, v: &HostValue) -> Result<Value, MarshalError> {
        self.build(cx, &mangle(desc), v)
    }

    /// Runs the constructor planned for `mangled`.
    pub fn build(&self, cx: &Context<'_>, mangled: &str, v: &HostValue) -> Result<Value, MarshalError> {
        let tp = self.plan.get(mangled).ok_or_else(|| MarshalError::UnknownType {
            mangled: mangled.to_string(),
        })?;

        match &tp.shape {
            Shape::Error { message } => match v {
                HostValue::Nil => Ok(pack::nil(cx)),
                HostValue::Text(_) => self.build(cx, message, v),
                other => Err(mismatch("null or error message", other)),
            },
            Shape::Newtype { repr } => self.build(cx, repr, v),
            Shape::Array { len, slice } => match v {
                HostValue::Seq(xs) if xs.len() == *len => self.build(cx, slice, v),
                other => Err(mismatch(format!("sequence of {}", len), other)),
            },
            Shape::Scalar { basic } => scalar(cx, *basic, v),
            Shape::Pointer { pointee } => match v {
                HostValue::Nil => Ok(pack::nil(cx)),
                _ => self.build(cx, pointee, v),
            },
            Shape::Slice { elem } => {
                let xs = match v {
                    HostValue::Seq(xs) => xs,
                    other => return Err(mismatch("sequence", other)),
                };
                self.slice(cx, elem, xs)
            }
            Shape::Map { value } => {
                let m = match v {
                    HostValue::Map(m) => m,
                    other => return Err(mismatch("map", other)),
                };
                self.map(cx, value, m)
            }
            Shape::Struct { fields } => {
                let m = match v {
                    HostValue::Map(m) => m,
                    HostValue::Nil if fields.is_empty() => return Ok(pack::nil(cx)),
                    other => return Err(mismatch(format!("{} value", tp.ty), other)),
                };
                if let Some(unknown) = m.keys().find(|k| !fields.iter().any(|f| &f.field == *k)) {
                    return Err(MarshalError::UnknownField {
                        ty: tp.ty.clone(),
                        field: unknown.clone(),
                    });
                }
                let values = fields
                    .iter()
                    .map(|f| {
                        m.get(&f.field).ok_or_else(|| MarshalError::MissingField {
                            ty: tp.ty.clone(),
                            field: f.field.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let names: Vec<&str> = fields.iter().map(|f| f.display.as_str()).collect();
                pack::try_pairlist_struct(cx, &names, |cx, i| self.build(cx, &fields[i].ty, values[i]))
            }
        }
    }

    fn slice(&self, cx: &Context<'_>, elem: &SliceElem, xs: &[HostValue]) -> Result<Value, MarshalError> {
        match elem {
            SliceElem::Bulk { basic } => match basic {
                Basic::Bool => Ok(pack::logical_slice(cx, &collect(xs, to_bool)?)),
                Basic::U8 => Ok(pack::raw_slice(cx, &collect(xs, |x| to_raw(*basic, x))?)),
                Basic::F64 => Ok(pack::real_slice(cx, &collect(xs, |x| to_real(*basic, x))?)),
                Basic::C128 => Ok(pack::complex_slice(cx, &collect(xs, |x| to_complex(*basic, x))?)),
                b => Ok(pack::integer_slice(cx, &collect(xs, |x| to_integer(*b, x))?)),
            },
            SliceElem::Text => Ok(pack::string_slice(cx, &collect(xs, to_text)?)),
            SliceElem::Error => Ok(pack::error_slice(cx, &collect(xs, to_message)?)),
            SliceElem::Generic { elem } => pack::try_list(cx, xs, |cx, x| self.build(cx, elem, x)),
        }
    }

    fn map(
        &self,
        cx: &Context<'_>,
        value: &MapValue,
        m: &BTreeMap<String, HostValue>,
    ) -> Result<Value, MarshalError> {
        match value {
            MapValue::Bulk { basic, .. } => match basic {
                Basic::Bool => Ok(pack::logical_map(cx, collect_map(m, to_bool)?)),
                Basic::U8 => Ok(pack::raw_map(cx, collect_map(m, |x| to_raw(*basic, x))?)),
                Basic::F32 | Basic::F64 => {
                    Ok(pack::real_map(cx, collect_map(m, |x| to_real(*basic, x))?))
                }
                Basic::C64 | Basic::C128 => {
                    Ok(pack::complex_map(cx, collect_map(m, |x| to_complex(*basic, x))?))
                }
                b => Ok(pack::integer_map(cx, collect_map(m, |x| to_integer(*b, x))?)),
            },
            MapValue::Text { .. } => Ok(pack::string_map(cx, collect_map(m, to_text)?)),
            MapValue::Error => Ok(pack::error_map(cx, collect_map(m, to_message)?)),
            MapValue::Generic { value } => pack::try_list_map(
                cx,
                m.iter().map(|(k, v)| (k.as_str(), v)),
                |cx, v| self.build(cx, value, v),
            ),
        }
    }
}

fn collect<'a, T>(
    xs: &'a [HostValue],
    f: impl Fn(&'a HostValue) -> Result<T, MarshalError>,
) -> Result<Vec<T>, MarshalError> {
    xs.iter().map(f).collect()
}

fn collect_map<'a, T>(
    m: &'a BTreeMap<String, HostValue>,
    f: impl Fn(&'a HostValue) -> Result<T, MarshalError>,
) -> Result<Vec<(&'a str, T)>, MarshalError> {
    m.iter().map(|(k, v)| Ok((k.as_str(), f(v)?))).collect()
}

fn scalar(cx: &Context<'_>, basic: Basic, v: &HostValue) -> Result<Value, MarshalError> {
    Ok(match basic {
        Basic::Bool => pack::logical(cx, to_bool(v)?),
        Basic::U8 => pack::raw(cx, to_raw(basic, v)?),
        Basic::F32 | Basic::F64 => pack::real(cx, to_real(basic, v)?),
        Basic::C64 | Basic::C128 => pack::complex(cx, to_complex(basic, v)?),
        Basic::Str => pack::string(cx, to_text(v)?),
        b if b.is_integer() => pack::integer(cx, to_integer(b, v)?),
        b => return Err(MarshalError::UnknownType { mangled: b.name().to_string() }),
    })
}

fn to_bool(v: &HostValue) -> Result<bool, MarshalError> {
    match v {
        HostValue::Bool(b) => Ok(*b),
        other => Err(mismatch("bool", other)),
    }
}

/// Range-checked against the host type, then narrowed like `as i32`.
fn to_integer(basic: Basic, v: &HostValue) -> Result<i32, MarshalError> {
    match (v.as_i128(), basic.range()) {
        (Some(i), Some((lo, hi))) if (lo..=hi).contains(&i) => Ok(i as i32),
        _ => Err(mismatch(basic.name(), v)),
    }
}

fn to_raw(basic: Basic, v: &HostValue) -> Result<u8, MarshalError> {
    v.as_i128()
        .and_then(|i| u8::try_from(i).ok())
        .ok_or_else(|| mismatch(basic.name(), v))
}

fn to_real(basic: Basic, v: &HostValue) -> Result<f64, MarshalError> {
    let x = v.as_f64().ok_or_else(|| mismatch(basic.name(), v))?;
    Ok(match basic {
        Basic::F32 => f64::from(x as f32),
        _ => x,
    })
}

fn to_complex(basic: Basic, v: &HostValue) -> Result<Complex128, MarshalError> {
    let (re, im) = match v {
        HostValue::Seq(parts) if parts.len() == 2 => match (parts[0].as_f64(), parts[1].as_f64()) {
            (Some(re), Some(im)) => (re, im),
            _ => return Err(mismatch("[re, im]", v)),
        },
        other => return Err(mismatch("[re, im]", other)),
    };
    Ok(match basic {
        Basic::C64 => Complex128::from(rgo_runtime::Complex64::new(re as f32, im as f32)),
        _ => Complex128::new(re, im),
    })
}

fn to_text(v: &HostValue) -> Result<&str, MarshalError> {
    match v {
        HostValue::Text(s) => Ok(s),
        other => Err(mismatch("string", other)),
    }
}

fn to_message(v: &HostValue) -> Result<Option<&str>, MarshalError> {
    match v {
        HostValue::Nil => Ok(None),
        HostValue::Text(s) => Ok(Some(s)),
        other => Err(mismatch("null or error message", other)),
    }
}

/// Multi-line rendering that descends into lists and pairlists, labelling
/// elements with their names or tags.
///
/// ```text
/// LISTSXP
///   $Name: STRSXP scalar ["Ada"]
///   $Age: INTSXP scalar [37]
/// ```
pub fn render_tree(v: Value) -> String {
    let mut out = String::new();
    render_into(&mut out, v, 0, None);
    out
}

fn render_into(out: &mut String, v: Value, depth: usize, label: Option<&str>) {
    let indent = "  ".repeat(depth);
    let rendered = rgo_runtime::sexp::print::render(v);
    match label {
        Some(l) => {
            let _ = writeln!(out, "{}{}: {}", indent, l, rendered);
        }
        None => {
            let _ = writeln!(out, "{}{}", indent, rendered);
        }
    }

    let children: Vec<Value> = match v.interface() {
        Object::Vector(list) => list.vector().to_vec(),
        Object::List(cells) => cells.iter().map(|(_, x)| x).collect(),
        _ => return,
    };
    let names = v.names().unwrap_or_default();
    for (i, child) in children.into_iter().enumerate() {
        let label = match names.get(i).filter(|n| !n.is_empty()) {
            Some(name) => format!("${}", name),
            None => format!("[[{}]]", i + 1),
        };
        render_into(out, child, depth + 1, Some(&label));
    }
}
