//! Type descriptor walker
//!
//! Classifies every type reachable from a set of roots into the [`Shape`]
//! that decides its constructor's code path, and records which
//! constructors refer to which in a dependency graph. Nested types are
//! referred to by mangled name, so recursive types through pointers,
//! slices and maps need no special treatment.
//!
//! Classification is checked in priority order: error capability,
//! defined type, fixed array, scalar, map, pointer, slice. Structs are
//! only reachable through defined types.

#[cfg(test)]
mod tests;

use crate::errors::{ErrorKind, GenerateError};
use crate::types::{mangle, Basic, DefKind, DefaultNaming, NamingPolicy, TypeDesc, TypeTable};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

/// Code path of one constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    /// `None` packs to `NULL`, `Some(e)` to the text of `e`.
    Error { message: String },
    /// Delegates to the representation's constructor through `.0`.
    Newtype { repr: String },
    /// Delegates to the slice constructor of the element type.
    Array { len: usize, slice: String },
    Scalar { basic: Basic },
    Map { value: MapValue },
    Pointer { pointee: String },
    Slice { elem: SliceElem },
    Struct { fields: Vec<FieldPlan> },
}

/// How slice elements are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum SliceElem {
    /// Bulk copy into an atomic vector.
    Bulk { basic: Basic },
    Text,
    /// Messages, with `None` as `NA_character_`.
    Error,
    /// Generic list, one constructor call per element.
    Generic { elem: String },
}

/// How map values are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum MapValue {
    /// Direct write into an atomic vector. `unwrap` counts the newtype
    /// projections between the value type and its basic.
    Bulk { basic: Basic, unwrap: usize },
    Text { unwrap: usize },
    Error,
    Generic { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPlan {
    /// Rust field name.
    pub field: String,
    /// Foreign-visible name.
    pub display: String,
    /// Mangled name of the field type.
    pub ty: String,
}

/// One constructor to generate.
#[derive(Debug, Clone, Serialize)]
pub struct TypePlan {
    pub mangled: String,
    /// The type as written.
    pub ty: String,
    pub shape: Shape,
    #[serde(skip)]
    pub desc: TypeDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    /// The referring type contains the referent inline.
    Direct,
    /// Through a pointer, slice or map.
    Indirect,
}

/// Every type reachable from the roots, classified.
#[derive(Debug, Clone)]
pub struct Plan {
    types: BTreeMap<String, TypePlan>,
    roots: Vec<String>,
    graph: DiGraph<String, Edge>,
    nodes: HashMap<String, NodeIndex>,
    recursive: HashSet<String>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, mangled: &str) -> Option<&TypePlan> {
        self.types.get(mangled)
    }

    /// Plans sorted by mangled name.
    pub fn iter(&self) -> impl Iterator<Item = &TypePlan> {
        self.types.values()
    }

    /// Mangled names of the root types, in declaration order, deduplicated.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Constructors `mangled` calls, sorted.
    pub fn uses(&self, mangled: &str) -> Vec<&str> {
        let mut out: Vec<&str> = match self.nodes.get(mangled) {
            Some(&n) => self.graph.neighbors(n).map(|m| self.graph[m].as_str()).collect(),
            None => Vec::new(),
        };
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Whether `mangled` can reach itself.
    pub fn is_recursive(&self, mangled: &str) -> bool {
        self.recursive.contains(mangled)
    }
}

/// Classifies types against a [`TypeTable`].
pub struct Walker<'t> {
    table: &'t TypeTable,
    naming: Box<dyn NamingPolicy + 't>,
}

impl<'t> Walker<'t> {
    pub fn new(table: &'t TypeTable) -> Self {
        Self {
            table,
            naming: Box::new(DefaultNaming),
        }
    }

    pub fn with_naming(mut self, naming: impl NamingPolicy + 't) -> Self {
        self.naming = Box::new(naming);
        self
    }

    pub fn table(&self) -> &'t TypeTable {
        self.table
    }

    /// Walks everything reachable from `roots`.
    ///
    /// The first unsupported type found, depth first in root order, is
    /// reported with the chain of types that led to it.
    pub fn plan(&self, roots: &[TypeDesc]) -> Result<Plan, GenerateError> {
        let mut types = BTreeMap::new();
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut root_names = Vec::new();

        let mut node = |graph: &mut DiGraph<String, Edge>, m: &str| -> NodeIndex {
            *nodes
                .entry(m.to_string())
                .or_insert_with(|| graph.add_node(m.to_string()))
        };

        let mut stack: Vec<(TypeDesc, Vec<String>)> = Vec::new();
        for root in roots.iter().rev() {
            stack.push((root.clone(), vec![root.to_string()]));
        }
        for root in roots {
            let m = mangle(root);
            if !root_names.contains(&m) {
                root_names.push(m);
            }
        }

        while let Some((desc, chain)) = stack.pop() {
            let m = mangle(&desc);
            if types.contains_key(&m) {
                continue;
            }

            let (shape, children) = self
                .classify_one(&desc)
                .map_err(|e| e.with_chain(chain.clone()))?;
            trace!(target: "walker", ty = %desc, mangled = %m, "classified");

            let from = node(&mut graph, &m);
            for (child, edge) in children.into_iter().rev() {
                let to = node(&mut graph, &mangle(&child));
                graph.update_edge(from, to, edge);
                let mut next = chain.clone();
                next.push(child.to_string());
                stack.push((child, next));
            }

            types.insert(
                m.clone(),
                TypePlan {
                    mangled: m,
                    ty: desc.to_string(),
                    shape,
                    desc,
                },
            );
        }

        let recursive = self.check_recursion(&graph, &types)?;
        debug!(target: "walker", types = types.len(), recursive = recursive.len(), "plan complete");

        Ok(Plan {
            types,
            roots: root_names,
            graph,
            nodes,
            recursive,
        })
    }

    /// Collects recursive types, rejecting recursion with no indirection.
    fn check_recursion(
        &self,
        graph: &DiGraph<String, Edge>,
        types: &BTreeMap<String, TypePlan>,
    ) -> Result<HashSet<String>, GenerateError> {
        let cyclic = |g: &DiGraph<String, Edge>| -> Vec<Vec<NodeIndex>> {
            tarjan_scc(g)
                .into_iter()
                .filter(|scc| scc.len() > 1 || g.contains_edge(scc[0], scc[0]))
                .collect()
        };

        let mut direct = graph.clone();
        direct.retain_edges(|g, e| g[e] == Edge::Direct);
        if let Some(scc) = cyclic(&direct).into_iter().next() {
            let mut names: Vec<&str> = scc.iter().map(|&n| direct[n].as_str()).collect();
            names.sort_unstable();
            let ty = types.get(names[0]).map_or(names[0], |t| t.ty.as_str());
            return Err(GenerateError::unsupported(
                ty,
                "recursive without indirection; wrap the recursive field in Option<Box<T>>, Vec<T> or HashMap",
            )
            .with_chain(names.iter().map(|n| types.get(*n).map_or(*n, |t| t.ty.as_str()).to_string()).collect()));
        }

        Ok(cyclic(graph)
            .into_iter()
            .flatten()
            .map(|n| graph[n].clone())
            .collect())
    }

    /// Classifies one type without walking into it.
    pub fn classify(&self, desc: &TypeDesc) -> Result<Shape, GenerateError> {
        self.classify_one(desc).map(|(shape, _)| shape)
    }

    /// Classifies one type and lists the types its constructor refers to.
    fn classify_one(&self, desc: &TypeDesc) -> Result<(Shape, Vec<(TypeDesc, Edge)>), GenerateError> {
        use Edge::{Direct, Indirect};

        let unsupported = |reason: &str| -> Result<(Shape, Vec<(TypeDesc, Edge)>), GenerateError> {
            Err(GenerateError::unsupported(desc.to_string(), reason))
        };

        match desc {
            TypeDesc::Named(name) => {
                let def = self
                    .table
                    .get(name)
                    .ok_or_else(|| GenerateError::undefined_type(name.clone(), &self.table.names()))?;
                match &def.kind {
                    DefKind::Error => {
                        let text = TypeDesc::Basic(Basic::Str);
                        let shape = Shape::Error { message: mangle(&text) };
                        Ok((shape, vec![(text, Indirect)]))
                    }
                    DefKind::Newtype(repr) => {
                        let shape = Shape::Newtype { repr: mangle(repr) };
                        Ok((shape, vec![(repr.clone(), Direct)]))
                    }
                    DefKind::Struct(fields) => {
                        let plans = fields
                            .iter()
                            .map(|f| FieldPlan {
                                field: f.name.clone(),
                                display: self.naming.field_name(def, f),
                                ty: mangle(&f.ty),
                            })
                            .collect();
                        let children = fields.iter().map(|f| (f.ty.clone(), Direct)).collect();
                        Ok((Shape::Struct { fields: plans }, children))
                    }
                }
            }
            TypeDesc::Array(len, elem) => {
                let slice = TypeDesc::Slice(elem.clone());
                let shape = Shape::Array {
                    len: *len,
                    slice: mangle(&slice),
                };
                let mut children = vec![(slice, Indirect)];
                if *len > 0 {
                    children.push(((**elem).clone(), Direct));
                }
                Ok((shape, children))
            }
            TypeDesc::Basic(basic) => match basic.foreign_kind() {
                Some(_) => Ok((Shape::Scalar { basic: *basic }, Vec::new())),
                None => unsupported("no R scalar kind for this type"),
            },
            TypeDesc::Map(key, value) => {
                if **key != TypeDesc::Basic(Basic::Str) {
                    return Err(GenerateError::new(ErrorKind::InvalidMapKey {
                        map: desc.to_string(),
                        key: key.to_string(),
                    }));
                }
                let plan = if self.table.is_error(value) {
                    MapValue::Error
                } else {
                    match self.table.underlying_basic(value) {
                        Some((Basic::Str, unwrap)) => MapValue::Text { unwrap },
                        Some((basic, unwrap)) if basic.foreign_kind().is_some() => {
                            MapValue::Bulk { basic, unwrap }
                        }
                        _ => MapValue::Generic { value: mangle(value) },
                    }
                };
                Ok((Shape::Map { value: plan }, vec![((**value).clone(), Indirect)]))
            }
            TypeDesc::Pointer(pointee) => {
                let shape = Shape::Pointer { pointee: mangle(pointee) };
                Ok((shape, vec![((**pointee).clone(), Indirect)]))
            }
            TypeDesc::Slice(elem) => {
                let plan = match &**elem {
                    TypeDesc::Basic(
                        b @ (Basic::I32 | Basic::U8 | Basic::F64 | Basic::C128 | Basic::Bool),
                    ) => SliceElem::Bulk { basic: *b },
                    TypeDesc::Basic(Basic::Str) => SliceElem::Text,
                    e if self.table.is_error(e) => SliceElem::Error,
                    e => SliceElem::Generic { elem: mangle(e) },
                };
                Ok((Shape::Slice { elem: plan }, vec![((**elem).clone(), Indirect)]))
            }
            TypeDesc::Tuple(_) => unsupported("anonymous structs have no field names; define a struct"),
            TypeDesc::Boxed(_) => unsupported("owned boxes are only supported as Option<Box<T>>"),
            TypeDesc::RawPointer { .. } => unsupported("unsafe pointers cannot be marshalled"),
            TypeDesc::Function { .. } => unsupported("functions cannot be marshalled"),
            TypeDesc::Interface(_) => unsupported("trait objects other than errors cannot be marshalled"),
            TypeDesc::Channel { .. } => unsupported("channels cannot be marshalled"),
            TypeDesc::Opaque(_) => unsupported("unrecognized type"),
        }
    }
}
