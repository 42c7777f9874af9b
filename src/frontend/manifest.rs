//! Type manifests
//!
//! A manifest declares the host types to marshal and the entry points
//! whose results need constructors:
//!
//! ```toml
//! [[types]]
//! name = "Person"
//! path = "crate::model::Person"
//! fields = [
//!     { name = "name", type = "String", rename = "Name" },
//!     { name = "age", type = "i32", rename = "Age" },
//! ]
//!
//! [[types]]
//! name = "Celsius"
//! repr = "f64"
//!
//! [[entry]]
//! name = "people"
//! returns = ["Vec<Person>", "error"]
//! ```

use crate::errors::ManifestError;
use crate::types::{is_field_name, is_ident, is_keyword, parse_type, Basic, DefKind, Field, TypeDef, TypeDesc, TypeTable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub types: Vec<TypeEntry>,

    #[serde(default, rename = "entry")]
    pub entries: Vec<EntryPoint>,
}

/// One defined type. Exactly one of `repr`, `fields` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeEntry {
    pub name: String,

    /// Rust path in generated code, when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Representation of a tuple newtype.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldEntry>>,

    /// Error capability: packed as its message.
    #[serde(default)]
    pub error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldEntry {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryPoint {
    pub name: String,

    #[serde(default)]
    pub returns: Vec<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::parse_at(&content, path)?;
        debug!(
            target: "manifest",
            path = %path.display(),
            types = manifest.types.len(),
            entries = manifest.entries.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Self::parse_at(content, Path::new("<inline>"))
    }

    fn parse_at(content: &str, path: &Path) -> Result<Self, ManifestError> {
        toml::from_str(content).map_err(|source| ManifestError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads and merges every manifest named by `patterns`, in order.
    ///
    /// Patterns containing glob metacharacters are expanded, sorted, and
    /// must match at least one file.
    pub fn load_all<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ManifestError> {
        let mut merged = Self::default();
        for pattern in patterns {
            for path in expand(pattern.as_ref())? {
                merged.merge(Self::load(&path)?);
            }
        }
        Ok(merged)
    }

    pub fn merge(&mut self, other: Manifest) {
        self.types.extend(other.types);
        self.entries.extend(other.entries);
    }

    /// Builds the table of defined types.
    pub fn type_table(&self) -> Result<TypeTable, ManifestError> {
        let mut table = TypeTable::new();
        for entry in &self.types {
            let def = entry.definition()?;
            table.define(def).map_err(|def| definition(&def.name, "defined more than once"))?;
        }
        Ok(table)
    }

    /// Result types of every entry point, in declaration order.
    pub fn roots(&self) -> Result<Vec<TypeDesc>, ManifestError> {
        let mut seen = HashSet::new();
        let mut roots = Vec::new();
        for entry in &self.entries {
            if !is_ident(&entry.name) {
                return Err(definition(&entry.name, "entry point names must be identifiers"));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(definition(&entry.name, "entry point declared more than once"));
            }
            for expr in &entry.returns {
                roots.push(parse_expr(expr)?);
            }
        }
        Ok(roots)
    }

    /// The type table and the root types.
    pub fn compile(&self) -> Result<(TypeTable, Vec<TypeDesc>), ManifestError> {
        Ok((self.type_table()?, self.roots()?))
    }
}

impl TypeEntry {
    fn definition(&self) -> Result<TypeDef, ManifestError> {
        if !self.name.split("::").all(is_ident) {
            return Err(definition(&self.name, "type names must be identifiers or paths"));
        }
        if let Some(kw) = self.name.split("::").find(|seg| is_keyword(seg)) {
            return Err(definition(&self.name, &format!("'{}' is a Rust keyword", kw)));
        }
        if Basic::from_rust_name(&self.name).is_some() {
            return Err(definition(&self.name, "shadows a built-in type"));
        }

        let kind = match (&self.repr, &self.fields, self.error) {
            (Some(repr), None, false) => DefKind::Newtype(parse_expr(repr)?),
            (None, Some(fields), false) => DefKind::Struct(self.fields(fields)?),
            (None, None, true) => DefKind::Error,
            _ => {
                return Err(definition(
                    &self.name,
                    "set exactly one of 'repr', 'fields' and 'error'",
                ))
            }
        };

        Ok(TypeDef {
            name: self.name.clone(),
            path: self.path.clone(),
            kind,
        })
    }

    fn fields(&self, entries: &[FieldEntry]) -> Result<Vec<Field>, ManifestError> {
        let mut seen = HashSet::new();
        entries
            .iter()
            .map(|f| {
                if !is_field_name(&f.name) {
                    return Err(definition(&self.name, &format!("invalid field name '{}'", f.name)));
                }
                if !seen.insert(f.name.as_str()) {
                    return Err(definition(&self.name, &format!("duplicate field '{}'", f.name)));
                }
                Ok(Field {
                    name: f.name.clone(),
                    ty: parse_expr(&f.ty)?,
                    rename: f.rename.clone(),
                })
            })
            .collect()
    }
}

fn parse_expr(expr: &str) -> Result<TypeDesc, ManifestError> {
    parse_type(expr).map_err(|error| ManifestError::Syntax {
        expr: expr.to_string(),
        error,
    })
}

fn definition(name: &str, message: &str) -> ManifestError {
    ManifestError::Definition {
        name: name.to_string(),
        message: message.to_string(),
    }
}

fn expand(pattern: &str) -> Result<Vec<PathBuf>, ManifestError> {
    if !pattern.contains(['*', '?', '[']) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let paths = glob::glob(pattern).map_err(|e| ManifestError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    let mut matched = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => matched.push(path),
            Ok(_) => {}
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(ManifestError::Io {
                    path,
                    source: e.into(),
                });
            }
        }
    }
    if matched.is_empty() {
        return Err(ManifestError::NoMatch {
            pattern: pattern.to_string(),
        });
    }
    matched.sort();
    Ok(matched)
}
