//! Error types for generation, manifests, configuration and marshalling

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A type shape no constructor can be generated for.
    Unsupported { ty: String, reason: String },
    /// A defined name with no entry in the type table.
    UndefinedType { name: String },
    /// A map whose key is not text.
    InvalidMapKey { map: String, key: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { ty, reason } => {
                write!(f, "unsupported type {}: {}", ty, reason)
            }
            Self::UndefinedType { name } => {
                write!(f, "undefined type: {}", name)
            }
            Self::InvalidMapKey { map, key } => {
                write!(f, "map {} has non-text key type {}", map, key)
            }
        }
    }
}

/// A generation-time failure, with the chain of types through which the
/// offending type was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateError {
    pub kind: ErrorKind,
    pub chain: Vec<String>,
    pub suggestions: Vec<String>,
}

impl GenerateError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            chain: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn unsupported(ty: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported {
            ty: ty.into(),
            reason: reason.into(),
        })
    }

    pub fn undefined_type(name: impl Into<String>, known: &[String]) -> Self {
        let name = name.into();
        let suggestions = find_similar_names(&name, known, 2)
            .into_iter()
            .take(3)
            .map(|s| format!("did you mean '{}'?", s))
            .collect();
        Self::new(ErrorKind::UndefinedType { name }).with_suggestions(suggestions)
    }

    pub fn with_chain(mut self, chain: Vec<String>) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// The type description named by the error.
    pub fn offending_type(&self) -> &str {
        match &self.kind {
            ErrorKind::Unsupported { ty, .. } => ty,
            ErrorKind::UndefinedType { name } => name,
            ErrorKind::InvalidMapKey { map, .. } => map,
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.chain.len() > 1 {
            write!(f, "\n  reached through: {}", self.chain.join(" -> "))?;
        }
        for suggestion in &self.suggestions {
            write!(f, "\n  hint: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for GenerateError {}

/// Syntax error in a type expression, with a 1-based column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(column: usize, message: impl Into<String>) -> Self {
        Self {
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column {}: {}", self.column, self.message)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug)]
pub enum ManifestError {
    Io { path: PathBuf, source: io::Error },
    Toml { path: PathBuf, source: toml::de::Error },
    Pattern { pattern: String, message: String },
    NoMatch { pattern: String },
    Syntax { expr: String, error: SyntaxError },
    Definition { name: String, message: String },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read manifest {}: {}", path.display(), source)
            }
            Self::Toml { path, source } => {
                write!(f, "failed to parse manifest {}: {}", path.display(), source)
            }
            Self::Pattern { pattern, message } => {
                write!(f, "invalid manifest pattern '{}': {}", pattern, message)
            }
            Self::NoMatch { pattern } => {
                write!(f, "no manifest matches '{}'", pattern)
            }
            Self::Syntax { expr, error } => {
                write!(f, "invalid type expression '{}' at {}", expr, error)
            }
            Self::Definition { name, message } => {
                write!(f, "invalid definition of {}: {}", name, message)
            }
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Toml { source, .. } => Some(source),
            Self::Syntax { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Serialize(toml::ser::Error),
    Invalid { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to access config {}: {}", path.display(), source)
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
            Self::Serialize(e) => write!(f, "failed to serialize config: {}", e),
            Self::Invalid { key, value } => {
                write!(f, "invalid value '{}' for {}", value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A host value that does not fit its type description.
#[derive(Debug, Clone, PartialEq)]
pub enum MarshalError {
    Mismatch { expected: String, found: String },
    MissingField { ty: String, field: String },
    UnknownField { ty: String, field: String },
    UnknownType { mangled: String },
}

impl MarshalError {
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Mismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch { expected, found } => {
                write!(f, "value mismatch: expected {}, found {}", expected, found)
            }
            Self::MissingField { ty, field } => {
                write!(f, "value for {} is missing field '{}'", ty, field)
            }
            Self::UnknownField { ty, field } => {
                write!(f, "{} has no field '{}'", ty, field)
            }
            Self::UnknownType { mangled } => {
                write!(f, "no constructor planned for {}", mangled)
            }
        }
    }
}

impl std::error::Error for MarshalError {}

/// Top-level error for the `rgo` binary.
#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Io { path: PathBuf, source: io::Error },
    Manifest(ManifestError),
    Generate(GenerateError),
    Config(ConfigError),
    Marshal(MarshalError),
    Json(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(msg) => write!(f, "{}", msg),
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::Manifest(e) => write!(f, "{}", e),
            Self::Generate(e) => write!(f, "{}", e),
            Self::Config(e) => write!(f, "{}", e),
            Self::Marshal(e) => write!(f, "{}", e),
            Self::Json(e) => write!(f, "invalid JSON value: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        Self::Manifest(e)
    }
}

impl From<GenerateError> for CliError {
    fn from(e: GenerateError) -> Self {
        Self::Generate(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<MarshalError> for CliError {
    fn from(e: MarshalError) -> Self {
        Self::Marshal(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Compute Levenshtein distance for "did you mean" suggestions
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() { return b.len(); }
    if b.is_empty() { return a.len(); }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        row[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }

    prev[b.len()]
}

/// Find similar names for "did you mean" suggestions
pub fn find_similar_names(target: &str, candidates: &[String], max_distance: usize) -> Vec<String> {
    let mut results: Vec<(String, usize)> = candidates
        .iter()
        .map(|c| (c.clone(), levenshtein_distance(target, c)))
        .filter(|(_, dist)| *dist <= max_distance && *dist > 0)
        .collect();

    results.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    results.into_iter().map(|(name, _)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("Person", "Person"), 0);
        assert_eq!(levenshtein_distance("Persn", "Person"), 1);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_undefined_type_suggests_close_names() {
        let known = vec!["Person".to_string(), "Point".to_string(), "error".to_string()];
        let err = GenerateError::undefined_type("Persn", &known);
        assert_eq!(err.suggestions, vec!["did you mean 'Person'?".to_string()]);
        assert_eq!(err.offending_type(), "Persn");
    }

    #[test]
    fn test_display_includes_chain() {
        let err = GenerateError::unsupported("*const u8", "unsafe pointer")
            .with_chain(vec!["Wrapper".into(), "*const u8".into()]);
        let text = err.to_string();
        assert!(text.starts_with("unsupported type *const u8: unsafe pointer"));
        assert!(text.contains("Wrapper -> *const u8"));
    }
}
