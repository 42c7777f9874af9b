use crate::codegen::{self, Generator};
use crate::errors::{CliError, ConfigError, ManifestError};
use crate::frontend::{Config, Manifest};
use crate::logging;
use crate::marshal::{render_tree, HostValue, Interpreter};
use crate::perf;
use crate::types::{parse_type, TypeDesc, TypeTable};
use crate::walker::{Plan, TypePlan, Walker};
use rgo_runtime::{Context, Heap};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const USAGE: &str = "\
Usage: rgo <command> [OPTIONS]

Commands:
  generate <manifest>...   Emit constructors for every type reachable from the entry points
      -o, --output FILE    Write to FILE instead of stdout
      --check              Compare FILE with fresh output; exit 1 on drift
  classify <manifest>...   Print the classification of every reachable type as JSON
  pack <manifest>...       Build a value in the in-process heap and print it
      --type EXPR          Type of the value
      --value JSON         The value
      --torture            Collect before every allocation
  config                   Print the effective configuration
  help                     Show this message

Options:
  --config FILE            Use FILE instead of the nearest rgo.toml

Manifest arguments may be glob patterns.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Generate {
        manifests: Vec<String>,
        output: Option<PathBuf>,
        check: bool,
    },
    Classify {
        manifests: Vec<String>,
    },
    Pack {
        manifests: Vec<String>,
        ty: String,
        value: String,
        torture: bool,
    },
    Config,
    Help,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    /// Explicit `--config` file.
    pub config: Option<PathBuf>,
}

/// Parses the arguments after the program name.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Invocation, CliError> {
    let usage = |msg: &str| CliError::Usage(format!("{}\n\n{}", msg, USAGE));

    let name = match args.first() {
        Some(name) => name.as_ref(),
        None => return Err(usage("No command specified")),
    };

    let mut positional = Vec::new();
    let mut output = None;
    let mut check = false;
    let mut ty = None;
    let mut value = None;
    let mut torture = false;
    let mut config = None;

    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_ref();
        let mut operand = |flag: &str| -> Result<String, CliError> {
            i += 1;
            args.get(i)
                .map(|a| a.as_ref().to_string())
                .ok_or_else(|| usage(&format!("{} requires an argument", flag)))
        };
        match arg {
            "-o" | "--output" => output = Some(PathBuf::from(operand(arg)?)),
            "--check" => check = true,
            "--type" => ty = Some(operand(arg)?),
            "--value" => value = Some(operand(arg)?),
            "--torture" => torture = true,
            "--config" => config = Some(PathBuf::from(operand(arg)?)),
            "-h" | "--help" => {
                return Ok(Invocation {
                    command: Command::Help,
                    config,
                })
            }
            flag if flag.starts_with('-') => return Err(usage(&format!("Unknown option: {}", flag))),
            path => positional.push(path.to_string()),
        }
        i += 1;
    }

    let needs_manifests = |manifests: &[String]| {
        if manifests.is_empty() {
            Err(usage(&format!("{} requires at least one manifest", name)))
        } else {
            Ok(())
        }
    };

    let command = match name {
        "generate" => {
            needs_manifests(&positional)?;
            Command::Generate {
                manifests: positional,
                output,
                check,
            }
        }
        "classify" => {
            needs_manifests(&positional)?;
            Command::Classify { manifests: positional }
        }
        "pack" => {
            needs_manifests(&positional)?;
            Command::Pack {
                manifests: positional,
                ty: ty.ok_or_else(|| usage("pack requires --type"))?,
                value: value.ok_or_else(|| usage("pack requires --value"))?,
                torture,
            }
        }
        "config" => Command::Config,
        "help" | "-h" | "--help" => Command::Help,
        other => return Err(usage(&format!("Unknown command: {}", other))),
    };

    Ok(Invocation { command, config })
}

/// JSON record printed by `rgo classify`.
#[derive(Serialize)]
struct Classified<'a> {
    #[serde(flatten)]
    plan: &'a TypePlan,
    root: bool,
    recursive: bool,
    uses: Vec<&'a str>,
}

pub struct Cli {
    command: Command,
    config: Config,
}

impl Cli {
    pub fn new(command: Command, config: Config) -> Self {
        Self { command, config }
    }

    /// Runs the command, writing results to `out`. Returns the exit code.
    pub fn run(&self, out: &mut dyn Write) -> Result<i32, CliError> {
        match &self.command {
            Command::Generate {
                manifests,
                output,
                check,
            } => self.generate(out, manifests, output.as_deref(), *check),
            Command::Classify { manifests } => self.classify(out, manifests),
            Command::Pack {
                manifests,
                ty,
                value,
                torture,
            } => self.pack(out, manifests, ty, value, *torture),
            Command::Config => {
                let text = toml::to_string_pretty(&self.config).map_err(ConfigError::Serialize)?;
                write_out(out, text.as_bytes())?;
                Ok(0)
            }
            Command::Help => {
                write_out(out, format!("{}\n", USAGE).as_bytes())?;
                Ok(0)
            }
        }
    }

    fn plan(&self, manifests: &[String]) -> Result<(TypeTable, Vec<TypeDesc>), CliError> {
        let _t = perf::track("load");
        let manifest = Manifest::load_all(manifests)?;
        Ok(manifest.compile()?)
    }

    fn generate(
        &self,
        out: &mut dyn Write,
        manifests: &[String],
        output: Option<&Path>,
        check: bool,
    ) -> Result<i32, CliError> {
        let (table, roots) = self.plan(manifests)?;
        let plan = {
            let _t = perf::track("walk");
            Walker::new(&table).plan(&roots)?
        };
        let generated = {
            let _t = perf::track("emit");
            Generator::with_options(&table, self.config.generate_options()).generate(&plan)
        };

        let output = output.or(self.config.generate.output.as_deref());

        if check {
            let path = output.ok_or_else(|| {
                CliError::Usage("--check needs an output file (-o or generate.output)".to_string())
            })?;
            let existing = fs::read_to_string(path).map_err(|source| CliError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let drift = codegen::check(&existing, &generated);
            for d in &drift {
                write_out(out, format!("{}: {}\n", path.display(), d).as_bytes())?;
            }
            if drift.is_empty() {
                info!(target: "cli", path = %path.display(), functions = generated.functions.len(), "generated file is current");
                return Ok(0);
            }
            warn!(target: "cli", path = %path.display(), drift = drift.len(), "generated file is out of date");
            return Ok(1);
        }

        match output {
            Some(path) => {
                fs::write(path, &generated.source).map_err(|source| CliError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!(
                    target: "cli",
                    path = %path.display(),
                    functions = generated.functions.len(),
                    "wrote constructors"
                );
            }
            None => write_out(out, generated.source.as_bytes())?,
        }
        Ok(0)
    }

    fn classify(&self, out: &mut dyn Write, manifests: &[String]) -> Result<i32, CliError> {
        let (table, roots) = self.plan(manifests)?;
        let plan = Walker::new(&table).plan(&roots)?;
        let records = records(&plan);
        let text = serde_json::to_string_pretty(&records)?;
        write_out(out, format!("{}\n", text).as_bytes())?;
        Ok(0)
    }

    fn pack(
        &self,
        out: &mut dyn Write,
        manifests: &[String],
        ty: &str,
        value: &str,
        torture: bool,
    ) -> Result<i32, CliError> {
        let (table, _) = self.plan(manifests)?;
        let desc = parse_type(ty).map_err(|error| ManifestError::Syntax {
            expr: ty.to_string(),
            error,
        })?;
        let value: HostValue = serde_json::from_str(value)?;
        let plan = Walker::new(&table).plan(std::slice::from_ref(&desc))?;

        let heap = if torture || self.config.runtime.torture {
            Heap::torture()
        } else {
            Heap::new()
        };
        let cx = Context::with_policy(&heap, self.config.policy()?);
        let v = {
            let _t = perf::track("pack");
            Interpreter::new(&plan).pack(&cx, &desc, &value)?
        };

        write_out(out, render_tree(v).as_bytes())?;
        let stats = heap.stats();
        info!(
            target: "cli",
            allocated = stats.allocated,
            collections = stats.collections,
            peak_protect_depth = stats.peak_protect_depth,
            "packed value"
        );
        Ok(0)
    }
}

fn records(plan: &Plan) -> Vec<Classified<'_>> {
    plan.iter()
        .map(|tp| Classified {
            plan: tp,
            root: plan.roots().contains(&tp.mangled),
            recursive: plan.is_recursive(&tp.mangled),
            uses: plan.uses(&tp.mangled),
        })
        .collect()
}

fn write_out(out: &mut dyn Write, bytes: &[u8]) -> Result<(), CliError> {
    out.write_all(bytes).map_err(|source| CliError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    })
}

/// Entry point for the `rgo` binary
pub fn main() -> Result<(), CliError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = parse_args(&args)?;

    let mut config = match &invocation.config {
        Some(path) => Config::load(path)?,
        None => Config::discover()?,
    };
    config.apply_env_overrides()?;
    let guard = logging::init_logging(config.log_config()?);

    let cli = Cli::new(invocation.command, config);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = cli.run(&mut out);
    let _ = out.flush();

    for (phase, stats) in perf::global().snapshot() {
        tracing::debug!(target: "perf", phase, count = stats.count, total_us = stats.total.as_micros() as u64, "phase total");
    }
    // process::exit skips destructors; flush the log writer first.
    drop(guard);
    let code = result?;
    std::process::exit(code);
}
