//! Rust source emission for one constructor

use super::GenerateOptions;
use crate::types::{raw_ident, Basic, TypeTable};
use crate::walker::{MapValue, Shape, SliceElem, TypePlan};
use std::fmt::Write;

pub(super) struct Emitter<'a> {
    pub table: &'a TypeTable,
    pub options: &'a GenerateOptions,
}

impl Emitter<'_> {
    fn rt(&self) -> &str {
        &self.options.runtime_path
    }

    /// Name of the constructor for a mangled type.
    pub fn fn_name(&self, mangled: &str) -> String {
        format!("{}{}", self.options.prefix, mangled)
    }

    /// Owned Rust type of the planned type.
    pub fn host_type(&self, tp: &TypePlan) -> String {
        self.table.host_type(&tp.desc, self.rt())
    }

    /// The complete function, ending in a newline.
    pub fn function(&self, tp: &TypePlan) -> String {
        let rt = self.rt();
        let mut out = String::new();
        let _ = writeln!(out, "#[allow(non_snake_case)]");
        let _ = writeln!(
            out,
            "pub fn {}(cx: &{rt}::Context<'_>, p: {}) -> {rt}::Value {{",
            self.fn_name(&tp.mangled),
            self.table.param_type(&tp.desc, rt),
            rt = rt,
        );
        self.body(&mut out, &tp.shape);
        out.push_str("}\n");
        out
    }

    fn body(&self, out: &mut String, shape: &Shape) {
        let rt = self.rt();
        match shape {
            Shape::Error { message } => {
                let _ = write!(
                    out,
                    "    match p {{\n        None => {rt}::pack::nil(cx),\n        Some(e) => {}(cx, &e.to_string()),\n    }}\n",
                    self.fn_name(message),
                    rt = rt,
                );
            }
            Shape::Newtype { repr } => {
                let _ = writeln!(out, "    {}(cx, &p.0)", self.fn_name(repr));
            }
            Shape::Array { slice, .. } => {
                let _ = writeln!(out, "    {}(cx, &p[..])", self.fn_name(slice));
            }
            Shape::Scalar { basic } => {
                let _ = writeln!(out, "    {}", scalar(rt, *basic));
            }
            Shape::Pointer { pointee } => {
                let _ = write!(
                    out,
                    "    match p {{\n        None => {rt}::pack::nil(cx),\n        Some(x) => {}(cx, x),\n    }}\n",
                    self.fn_name(pointee),
                    rt = rt,
                );
            }
            Shape::Slice { elem } => {
                let call = match elem {
                    SliceElem::Bulk { basic } => {
                        format!("{}::pack::{}_slice(cx, p)", rt, bulk_kind(*basic))
                    }
                    SliceElem::Text => format!("{}::pack::string_slice(cx, p)", rt),
                    SliceElem::Error => format!("{}::pack::error_slice(cx, p)", rt),
                    SliceElem::Generic { elem } => format!(
                        "{}::pack::list(cx, p, |cx, x| {}(cx, x))",
                        rt,
                        self.fn_name(elem)
                    ),
                };
                let _ = writeln!(out, "    {}", call);
            }
            Shape::Map { value } => {
                let call = match value {
                    MapValue::Bulk { basic, unwrap } => format!(
                        "{}::pack::{}_map(cx, p.iter().map(|(k, v)| (k.as_str(), {})))",
                        rt,
                        bulk_kind(*basic),
                        convert(rt, *basic, &project(*unwrap))
                    ),
                    MapValue::Text { unwrap } => {
                        let v = if *unwrap == 0 { "v".to_string() } else { project(*unwrap) };
                        format!(
                            "{}::pack::string_map(cx, p.iter().map(|(k, v)| (k.as_str(), {}.as_str())))",
                            rt, v
                        )
                    }
                    MapValue::Error => format!(
                        "{}::pack::error_map(cx, p.iter().map(|(k, v)| (k.as_str(), v.as_ref())))",
                        rt
                    ),
                    MapValue::Generic { value } => format!(
                        "{}::pack::list_map(cx, p.iter().map(|(k, v)| (k.as_str(), v)), |cx, v| {}(cx, v))",
                        rt,
                        self.fn_name(value)
                    ),
                };
                let _ = writeln!(out, "    {}", call);
            }
            Shape::Struct { fields } if fields.is_empty() => {
                out.push_str("    let _ = p;\n");
                let _ = writeln!(out, "    {rt}::pack::pairlist_struct(cx, &[], |cx, _| {rt}::pack::nil(cx))", rt = rt);
            }
            Shape::Struct { fields } => {
                let names: Vec<String> = fields.iter().map(|f| format!("{:?}", f.display)).collect();
                let _ = writeln!(
                    out,
                    "    {}::pack::pairlist_struct(cx, &[{}], |cx, i| match i {{",
                    rt,
                    names.join(", ")
                );
                for (i, f) in fields.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "        {} => {}(cx, &p.{}),",
                        i,
                        self.fn_name(&f.ty),
                        raw_ident(&f.field)
                    );
                }
                let _ = writeln!(out, "        _ => {}::pack::nil(cx),", rt);
                out.push_str("    })\n");
            }
        }
    }
}

/// Scalar constructor call for `*p`.
fn scalar(rt: &str, basic: Basic) -> String {
    match basic {
        Basic::Str => format!("{}::pack::string(cx, p)", rt),
        b => format!("{}::pack::{}(cx, {})", rt, bulk_kind(b), convert(rt, b, "*p")),
    }
}

/// Pack primitive family for a basic.
fn bulk_kind(basic: Basic) -> &'static str {
    match basic {
        Basic::Bool => "logical",
        Basic::U8 => "raw",
        Basic::F32 | Basic::F64 => "real",
        Basic::C64 | Basic::C128 => "complex",
        Basic::Str => "string",
        _ => "integer",
    }
}

/// Converts a value of `basic` to the pack primitive's element type.
fn convert(rt: &str, basic: Basic, v: &str) -> String {
    match basic {
        Basic::Bool | Basic::I32 | Basic::U8 | Basic::F64 | Basic::C128 => v.to_string(),
        Basic::F32 => format!("f64::from({})", v),
        Basic::C64 => format!("{}::Complex128::from({})", rt, v),
        _ => format!("{} as i32", v),
    }
}

/// `*v` for a direct basic, `v.0.0` through newtypes.
fn project(unwrap: usize) -> String {
    if unwrap == 0 {
        "*v".to_string()
    } else {
        format!("v{}", ".0".repeat(unwrap))
    }
}
