//! Marshalling code generator
//!
//! Turns a [`Plan`] into Rust source: one `pack_sexp_<mangled>` function
//! per planned type, sorted by mangled name. Composite constructors call
//! the constructors of their nested types by name.
//!
//! The file opens with a digest line per function so `rgo generate
//! --check` can tell which functions drifted from the type descriptions
//! without regenerating byte for byte:
//!
//! ```text
//! // Code generated by rgo; DO NOT EDIT.
//! // rgo:digest pack_sexp_i32 <blake3 of the function text> i32
//! ```

mod emit;

#[cfg(test)]
mod tests;

use crate::types::TypeTable;
use crate::walker::Plan;
use emit::Emitter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

pub const HEADER: &str = "// Code generated by rgo; DO NOT EDIT.";
const DIGEST_TAG: &str = "// rgo:digest ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Constructor name prefix.
    pub prefix: String,
    /// Absolute path of the runtime crate in generated code.
    pub runtime_path: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            prefix: "pack_sexp_".to_string(),
            runtime_path: "::rgo_runtime".to_string(),
        }
    }
}

/// Digest entry for one generated function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDigest {
    pub name: String,
    pub digest: String,
    pub host: String,
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub source: String,
    pub functions: Vec<FunctionDigest>,
}

pub struct Generator<'t> {
    table: &'t TypeTable,
    options: GenerateOptions,
}

impl<'t> Generator<'t> {
    pub fn new(table: &'t TypeTable) -> Self {
        Self::with_options(table, GenerateOptions::default())
    }

    pub fn with_options(table: &'t TypeTable, options: GenerateOptions) -> Self {
        Self { table, options }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn generate(&self, plan: &Plan) -> Generated {
        let emitter = Emitter {
            table: self.table,
            options: &self.options,
        };

        let mut functions = Vec::with_capacity(plan.len());
        let mut bodies = Vec::with_capacity(plan.len());
        for tp in plan.iter() {
            let text = emitter.function(tp);
            functions.push(FunctionDigest {
                name: emitter.fn_name(&tp.mangled),
                digest: blake3::hash(text.as_bytes()).to_hex().to_string(),
                host: emitter.host_type(tp),
            });
            debug!(target: "codegen", function = %emitter.fn_name(&tp.mangled), ty = %tp.ty, "emitted constructor");
            bodies.push(text);
        }

        let mut source = String::new();
        source.push_str(HEADER);
        source.push('\n');
        for f in &functions {
            source.push_str(&format!("{}{} {} {}\n", DIGEST_TAG, f.name, f.digest, f.host));
        }
        for body in &bodies {
            source.push('\n');
            source.push_str(body);
        }

        Generated { source, functions }
    }
}

/// Reads the digest lines of a previously generated file.
pub fn read_digests(source: &str) -> Vec<FunctionDigest> {
    source
        .lines()
        .filter_map(|line| line.strip_prefix(DIGEST_TAG))
        .filter_map(|rest| {
            let mut parts = rest.splitn(3, ' ');
            let name = parts.next()?;
            let digest = parts.next()?;
            let host = parts.next().unwrap_or_default();
            Some(FunctionDigest {
                name: name.to_string(),
                digest: digest.to_string(),
                host: host.to_string(),
            })
        })
        .collect()
}

/// Difference between a checked-in file and fresh output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// Generated now but absent from the file.
    Missing { name: String },
    /// In the file but no longer generated.
    Stale { name: String },
    Changed { name: String },
    /// The file has no rgo header.
    NotGenerated,
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { name } => write!(f, "missing: {}", name),
            Self::Stale { name } => write!(f, "stale: {}", name),
            Self::Changed { name } => write!(f, "changed: {}", name),
            Self::NotGenerated => write!(f, "file was not generated by rgo"),
        }
    }
}

/// Compares `existing` file contents against `generated`, by digest.
pub fn check(existing: &str, generated: &Generated) -> Vec<Drift> {
    if existing.lines().next() != Some(HEADER) {
        return vec![Drift::NotGenerated];
    }

    let old: BTreeMap<String, String> = read_digests(existing)
        .into_iter()
        .map(|d| (d.name, d.digest))
        .collect();
    let new: BTreeMap<&str, &str> = generated
        .functions
        .iter()
        .map(|d| (d.name.as_str(), d.digest.as_str()))
        .collect();

    let mut drift = Vec::new();
    for (name, digest) in &new {
        match old.get(*name) {
            None => drift.push(Drift::Missing { name: name.to_string() }),
            Some(d) if d != digest => drift.push(Drift::Changed { name: name.to_string() }),
            Some(_) => {}
        }
    }
    for name in old.keys() {
        if !new.contains_key(name.as_str()) {
            drift.push(Drift::Stale { name: name.clone() });
        }
    }
    drift
}
