//! rgo - type-directed marshalling from Rust into R
//!
//! Given descriptions of host types, rgo generates one constructor per
//! reachable type that builds the value as an R object through
//! `rgo-runtime`, correctly rooted at every allocation.
//!
//! Pipeline: [`frontend::Manifest`] → [`types::TypeTable`] →
//! [`walker::Walker`] (classification) → [`codegen::Generator`] (Rust
//! source). [`marshal::Interpreter`] runs the same plans directly against
//! dynamic values.

// Core modules
pub mod codegen;
pub mod errors;
pub mod frontend;
pub mod logging;
pub mod marshal;
pub mod perf;
pub mod types;
pub mod walker;

// Re-export commonly used items
pub use codegen::{Drift, GenerateOptions, Generated, Generator};
pub use errors::{CliError, ErrorKind, GenerateError, ManifestError, MarshalError};
pub use frontend::{cli_main, Config, Manifest};
pub use marshal::{HostValue, Interpreter};
pub use types::{mangle, parse_type, Basic, TypeDesc, TypeTable};
pub use walker::{Plan, Shape, Walker};
