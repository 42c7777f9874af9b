//! End-to-end runs of the `rgo` commands against manifests on disk.

use rgo::frontend::cli::{parse_args, Cli, Command};
use rgo::{CliError, Config};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PEOPLE: &str = r#"
[[types]]
name = "Person"
fields = [
    { name = "name", type = "String", rename = "Name" },
    { name = "age", type = "i32", rename = "Age" },
]

[[entry]]
name = "people"
returns = ["Vec<Person>"]
"#;

fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

fn run(command: Command) -> (Result<i32, CliError>, String) {
    let mut out = Vec::new();
    let result = Cli::new(command, Config::default()).run(&mut out);
    (result, String::from_utf8(out).unwrap())
}

fn generate(manifests: Vec<String>, output: Option<PathBuf>, check: bool) -> (Result<i32, CliError>, String) {
    run(Command::Generate {
        manifests,
        output,
        check,
    })
}

#[test]
fn test_generate_to_stdout() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "people.toml", PEOPLE);

    let (code, out) = generate(vec![manifest], None, false);

    assert_eq!(code.unwrap(), 0);
    assert!(out.starts_with("// Code generated by rgo; DO NOT EDIT.\n"));
    assert!(out.contains("pub fn pack_sexp_SN6PersonE("));
    assert!(out.contains("pub fn pack_sexp_N6PersonE("));
}

#[test]
fn test_generate_then_check() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "people.toml", PEOPLE);
    let output = dir.path().join("generated.rs");

    let (code, out) = generate(vec![manifest.clone()], Some(output.clone()), false);
    assert_eq!(code.unwrap(), 0);
    assert!(out.is_empty());
    assert!(fs::read_to_string(&output).unwrap().contains("pack_sexp_N6PersonE"));

    let (code, out) = generate(vec![manifest.clone()], Some(output.clone()), true);
    assert_eq!(code.unwrap(), 0);
    assert!(out.is_empty());

    // A new field changes the struct constructor and pulls in a new one.
    fs::write(
        &manifest,
        PEOPLE.replace(
            r#"{ name = "age", type = "i32", rename = "Age" },"#,
            r#"{ name = "age", type = "i32", rename = "Age" },
    { name = "height", type = "f64" },"#,
        ),
    )
    .unwrap();
    let (code, out) = generate(vec![manifest], Some(output.clone()), true);
    assert_eq!(code.unwrap(), 1);
    let lines: Vec<&str> = out.lines().collect();
    let prefix = output.display().to_string();
    assert_eq!(
        lines,
        vec![
            format!("{}: changed: pack_sexp_N6PersonE", prefix),
            format!("{}: missing: pack_sexp_f64", prefix),
        ]
    );
}

#[test]
fn test_check_rejects_hand_written_file() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "people.toml", PEOPLE);
    let output = PathBuf::from(write(dir.path(), "generated.rs", "fn main() {}\n"));

    let (code, out) = generate(vec![manifest], Some(output), true);
    assert_eq!(code.unwrap(), 1);
    assert!(out.ends_with("file was not generated by rgo\n"));
}

#[test]
fn test_check_needs_an_output() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "people.toml", PEOPLE);
    let (code, _) = generate(vec![manifest], None, true);
    assert!(matches!(code, Err(CliError::Usage(_))));
}

#[test]
fn test_failed_generation_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let manifest = write(
        dir.path(),
        "bad.toml",
        "[[types]]\nname = \"Pair\"\nfields = [{ name = \"xy\", type = \"(i32, i32)\" }]\n\n[[entry]]\nname = \"pair\"\nreturns = [\"Pair\"]\n",
    );
    let output = dir.path().join("generated.rs");

    let (code, out) = generate(vec![manifest], Some(output.clone()), false);

    match code {
        Err(CliError::Generate(e)) => {
            assert_eq!(e.offending_type(), "(i32, i32)");
            assert_eq!(e.chain, vec!["Pair", "(i32, i32)"]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(out.is_empty());
    assert!(!output.exists());
}

#[test]
fn test_manifest_globs_are_merged() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.toml", PEOPLE);
    write(dir.path(), "b.toml", "[[entry]]\nname = \"flags\"\nreturns = [\"Vec<bool>\"]\n");
    let pattern = dir.path().join("*.toml").to_string_lossy().into_owned();

    let (code, out) = generate(vec![pattern], None, false);

    assert_eq!(code.unwrap(), 0);
    assert!(out.contains("pub fn pack_sexp_SN6PersonE("));
    assert!(out.contains("pub fn pack_sexp_Sbool("));
}

#[test]
fn test_classify_prints_json() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "people.toml", PEOPLE);

    let (code, out) = run(Command::Classify {
        manifests: vec![manifest],
    });
    assert_eq!(code.unwrap(), 0);

    let records: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
    let names: Vec<&str> = records.iter().map(|r| r["mangled"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["N6PersonE", "SN6PersonE", "i32", "str"]);

    let person = &records[0];
    assert_eq!(person["shape"]["shape"], "struct");
    assert_eq!(person["root"], false);
    assert_eq!(person["uses"], serde_json::json!(["i32", "str"]));
    assert_eq!(records[1]["root"], true);
    assert_eq!(records[1]["shape"]["elem"]["path"], "generic");
}

#[test]
fn test_pack_prints_tree() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "people.toml", PEOPLE);

    for torture in [false, true] {
        let (code, out) = run(Command::Pack {
            manifests: vec![manifest.clone()],
            ty: "Vec<Person>".into(),
            value: r#"[{"name": "Ada", "age": 37}]"#.into(),
            torture,
        });
        assert_eq!(code.unwrap(), 0);
        assert!(out.starts_with("VECSXP"), "{}", out);
        assert!(out.contains(r#"    $Name: STRSXP scalar ["Ada"]"#));
        assert!(out.contains("    $Age: INTSXP scalar [37]"));
    }
}

#[test]
fn test_pack_reports_bad_values() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "people.toml", PEOPLE);

    let (code, _) = run(Command::Pack {
        manifests: vec![manifest.clone()],
        ty: "Person".into(),
        value: r#"{"name": "Ada"}"#.into(),
        torture: false,
    });
    assert!(matches!(code, Err(CliError::Marshal(_))));

    let (code, _) = run(Command::Pack {
        manifests: vec![manifest],
        ty: "Person".into(),
        value: "{".into(),
        torture: false,
    });
    assert!(matches!(code, Err(CliError::Json(_))));
}

#[test]
fn test_config_command_prints_toml() {
    let (code, out) = run(Command::Config);
    assert_eq!(code.unwrap(), 0);
    assert_eq!(Config::parse(&out).unwrap(), Config::default());
}

#[test]
fn test_parse_args() {
    let inv = parse_args(&["generate", "a.toml", "b/*.toml", "-o", "out.rs", "--check"]).unwrap();
    assert_eq!(
        inv.command,
        Command::Generate {
            manifests: vec!["a.toml".into(), "b/*.toml".into()],
            output: Some(PathBuf::from("out.rs")),
            check: true,
        }
    );
    assert_eq!(inv.config, None);

    let inv = parse_args(&["pack", "m.toml", "--type", "i32", "--value", "1", "--config", "x.toml"]).unwrap();
    assert_eq!(inv.config, Some(PathBuf::from("x.toml")));
    assert!(matches!(inv.command, Command::Pack { torture: false, .. }));

    assert_eq!(parse_args(&["help"]).unwrap().command, Command::Help);
    assert_eq!(parse_args(&["generate", "--help"]).unwrap().command, Command::Help);
}

#[test]
fn test_parse_args_errors() {
    let usage = |args: &[&str]| match parse_args(args) {
        Err(CliError::Usage(msg)) => msg,
        other => panic!("{:?} gave {:?}", args, other),
    };
    assert!(usage(&[]).starts_with("No command specified"));
    assert!(usage(&["frobnicate"]).starts_with("Unknown command: frobnicate"));
    assert!(usage(&["generate"]).contains("requires at least one manifest"));
    assert!(usage(&["generate", "m.toml", "-o"]).starts_with("-o requires an argument"));
    assert!(usage(&["generate", "m.toml", "--fast"]).starts_with("Unknown option: --fast"));
    assert!(usage(&["pack", "m.toml", "--value", "1"]).starts_with("pack requires --type"));
    assert!(usage(&["classify"]).contains("Usage: rgo"));
}
