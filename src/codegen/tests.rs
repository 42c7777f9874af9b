use super::*;
use crate::types::{parse_type, DefKind, Field, TypeDef, TypeDesc};
use crate::walker::Walker;

fn ty(src: &str) -> TypeDesc {
    parse_type(src).unwrap_or_else(|e| panic!("{}: {}", src, e))
}

fn table() -> TypeTable {
    let mut table = TypeTable::new();
    table
        .define(TypeDef {
            name: "Person".into(),
            path: Some("crate::model::Person".into()),
            kind: DefKind::Struct(vec![
                Field { name: "name".into(), ty: ty("String"), rename: Some("Name".into()) },
                Field { name: "age".into(), ty: ty("i32"), rename: Some("Age".into()) },
            ]),
        })
        .unwrap();
    table
        .define(TypeDef {
            name: "Celsius".into(),
            path: None,
            kind: DefKind::Newtype(ty("f64")),
        })
        .unwrap();
    table
}

fn generate(roots: &[&str]) -> Generated {
    let table = table();
    let roots: Vec<TypeDesc> = roots.iter().map(|r| ty(r)).collect();
    let plan = Walker::new(&table).plan(&roots).unwrap();
    Generator::new(&table).generate(&plan)
}

fn function<'a>(source: &'a str, name: &str) -> &'a str {
    let start = source
        .find(&format!("pub fn {}(", name))
        .unwrap_or_else(|| panic!("{} not generated", name));
    let start = source[..start].rfind("#[allow").unwrap();
    let end = source[start..].find("\n}\n").unwrap() + start + 3;
    &source[start..end]
}

#[test]
fn test_struct_constructor_text() {
    let out = generate(&["Person"]);
    assert_eq!(
        function(&out.source, "pack_sexp_N6PersonE"),
        "#[allow(non_snake_case)]
pub fn pack_sexp_N6PersonE(cx: &::rgo_runtime::Context<'_>, p: &crate::model::Person) -> ::rgo_runtime::Value {
    ::rgo_runtime::pack::pairlist_struct(cx, &[\"Name\", \"Age\"], |cx, i| match i {
        0 => pack_sexp_str(cx, &p.name),
        1 => pack_sexp_i32(cx, &p.age),
        _ => ::rgo_runtime::pack::nil(cx),
    })
}
"
    );
    assert_eq!(
        function(&out.source, "pack_sexp_str"),
        "#[allow(non_snake_case)]
pub fn pack_sexp_str(cx: &::rgo_runtime::Context<'_>, p: &str) -> ::rgo_runtime::Value {
    ::rgo_runtime::pack::string(cx, p)
}
"
    );
}

#[test]
fn test_scalar_conversions() {
    let out = generate(&["u64", "f32", "Complex64", "bool"]);
    assert!(out.source.contains("::rgo_runtime::pack::integer(cx, *p as i32)"));
    assert!(out.source.contains("::rgo_runtime::pack::real(cx, f64::from(*p))"));
    assert!(out
        .source
        .contains("::rgo_runtime::pack::complex(cx, ::rgo_runtime::Complex128::from(*p))"));
    assert!(out.source.contains("::rgo_runtime::pack::logical(cx, *p)"));
}

#[test]
fn test_composite_paths() {
    let out = generate(&[
        "Vec<bool>",
        "Vec<Person>",
        "Option<Box<Person>>",
        "[u8; 4]",
        "HashMap<String, Celsius>",
        "HashMap<String, Person>",
        "Vec<error>",
    ]);
    let src = &out.source;
    assert!(src.contains("    ::rgo_runtime::pack::logical_slice(cx, p)\n"));
    assert!(src.contains("::rgo_runtime::pack::list(cx, p, |cx, x| pack_sexp_N6PersonE(cx, x))"));
    assert!(src.contains("Some(x) => pack_sexp_N6PersonE(cx, x),"));
    assert!(src.contains("    pack_sexp_Su8(cx, &p[..])\n"));
    assert!(src.contains("::rgo_runtime::pack::real_map(cx, p.iter().map(|(k, v)| (k.as_str(), v.0)))"));
    assert!(src.contains(
        "::rgo_runtime::pack::list_map(cx, p.iter().map(|(k, v)| (k.as_str(), v)), |cx, v| pack_sexp_N6PersonE(cx, v))"
    ));
    assert!(src.contains("::rgo_runtime::pack::error_slice(cx, p)"));
    assert!(src.contains(
        "p: &[Option<Box<dyn ::std::error::Error>>]"
    ));
}

#[test]
fn test_header_and_digests() {
    let out = generate(&["Person"]);
    let mut lines = out.source.lines();
    assert_eq!(lines.next(), Some(HEADER));
    let names: Vec<&str> = out.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["pack_sexp_N6PersonE", "pack_sexp_i32", "pack_sexp_str"]);
    assert_eq!(out.functions[0].host, "crate::model::Person");
    assert!(out.functions.iter().all(|f| f.digest.len() == 64));
    assert_eq!(read_digests(&out.source), out.functions);
    // No inner attributes: the output is include!d.
    assert!(!out.source.contains("#!["));
}

#[test]
fn test_deterministic_and_deduplicated() {
    let a = generate(&["Vec<Person>", "Person", "Vec<Person>"]);
    let b = generate(&["Vec<Person>", "Person", "Vec<Person>"]);
    assert_eq!(a.source, b.source);
    assert_eq!(a.source.matches("pub fn pack_sexp_N6PersonE(").count(), 1);
    assert_eq!(a.functions.len(), 4);
}

#[test]
fn test_keyword_fields_use_raw_identifiers() {
    let mut table = TypeTable::new();
    table
        .define(TypeDef {
            name: "Token".into(),
            path: None,
            kind: DefKind::Struct(vec![
                Field { name: "type".into(), ty: ty("String"), rename: None },
                Field { name: "value".into(), ty: ty("i32"), rename: None },
            ]),
        })
        .unwrap();
    let plan = Walker::new(&table).plan(&[ty("Token")]).unwrap();
    let out = Generator::new(&table).generate(&plan);
    assert!(out.source.contains("0 => pack_sexp_str(cx, &p.r#type),"));
    assert!(out.source.contains("1 => pack_sexp_i32(cx, &p.value),"));
    assert!(out.source.contains(r#"pairlist_struct(cx, &["type", "value"]"#));
}

#[test]
fn test_custom_options() {
    let table = table();
    let plan = Walker::new(&table).plan(&[ty("i32")]).unwrap();
    let options = GenerateOptions {
        prefix: "to_r_".into(),
        runtime_path: "crate::rt".into(),
    };
    let out = Generator::with_options(&table, options).generate(&plan);
    assert!(out
        .source
        .contains("pub fn to_r_i32(cx: &crate::rt::Context<'_>, p: &i32) -> crate::rt::Value {"));
}

#[test]
fn test_check_reports_drift() {
    let current = generate(&["Person"]);
    assert!(check(&current.source, &current).is_empty());

    let older = generate(&["Vec<i32>", "i32"]);
    let mut drift = check(&older.source, &current);
    drift.sort_by_key(|d| d.to_string());
    assert_eq!(
        drift,
        vec![
            Drift::Missing { name: "pack_sexp_N6PersonE".into() },
            Drift::Missing { name: "pack_sexp_str".into() },
            Drift::Stale { name: "pack_sexp_Si32".into() },
        ]
    );

    let tampered = current.source.replacen(
        &current.functions[1].digest,
        &"0".repeat(64),
        1,
    );
    assert_eq!(
        check(&tampered, &current),
        vec![Drift::Changed { name: "pack_sexp_i32".into() }]
    );

    assert_eq!(check("fn main() {}\n", &current), vec![Drift::NotGenerated]);
}
