use super::*;

fn parse(src: &str) -> TypeDesc {
    parse_type(src).unwrap_or_else(|e| panic!("{}: {}", src, e))
}

#[test]
fn test_parse_basics() {
    assert_eq!(parse("i32"), TypeDesc::Basic(Basic::I32));
    assert_eq!(parse("String"), TypeDesc::Basic(Basic::Str));
    assert_eq!(parse("&str"), TypeDesc::Basic(Basic::Str));
    assert_eq!(parse("std::string::String"), TypeDesc::Basic(Basic::Str));
    assert_eq!(parse("rgo_runtime::Complex128"), TypeDesc::Basic(Basic::C128));
    assert_eq!(parse("Complex64"), TypeDesc::Basic(Basic::C64));
    assert_eq!(parse("char"), TypeDesc::Basic(Basic::Char));
}

#[test]
fn test_parse_composites() {
    let person = TypeDesc::named("Person");
    assert_eq!(parse("Vec<Person>"), TypeDesc::slice(person.clone()));
    assert_eq!(parse("&[u8]"), TypeDesc::slice(TypeDesc::Basic(Basic::U8)));
    assert_eq!(
        parse("[f64; 3]"),
        TypeDesc::Array(3, Box::new(TypeDesc::Basic(Basic::F64)))
    );
    assert_eq!(parse("Option<Box<Person>>"), TypeDesc::pointer(person.clone()));
    assert_eq!(
        parse("HashMap<String, Vec<Vec<i32>>>"),
        TypeDesc::map(
            TypeDesc::Basic(Basic::Str),
            TypeDesc::slice(TypeDesc::slice(TypeDesc::Basic(Basic::I32)))
        )
    );
    assert_eq!(parse("geo::Point"), TypeDesc::named("geo::Point"));
}

#[test]
fn test_parse_error_spellings() {
    assert_eq!(parse("error"), TypeDesc::named(ERROR));
    assert_eq!(parse("Option<Box<dyn std::error::Error>>"), TypeDesc::named(ERROR));
}

#[test]
fn test_parse_unsupported_shapes() {
    assert!(matches!(parse("(i32, String)"), TypeDesc::Tuple(v) if v.len() == 2));
    assert!(matches!(parse("*const u8"), TypeDesc::RawPointer { mutable: false, .. }));
    assert!(matches!(parse("fn(i32) -> i32"), TypeDesc::Function { ret: Some(_), .. }));
    assert_eq!(parse("dyn Display"), TypeDesc::Interface("Display".into()));
    assert!(matches!(parse("Receiver<i32>"), TypeDesc::Channel { .. }));
    assert_eq!(parse("Option<i32>"), TypeDesc::Opaque("Option<i32>".into()));
    assert_eq!(parse("Rc<Person>"), TypeDesc::Opaque("Rc<Person>".into()));
    assert!(matches!(parse("Box<i32>"), TypeDesc::Boxed(_)));
}

#[test]
fn test_parse_errors_carry_columns() {
    let err = parse_type("Vec<i32").unwrap_err();
    assert_eq!(err.column, 8);
    assert!(err.message.contains("end of input"));

    let err = parse_type("[i32; x]").unwrap_err();
    assert_eq!(err.column, 7);

    let err = parse_type("Vec<i32, u8>").unwrap_err();
    assert!(err.message.contains("Vec takes 1 type argument"));

    let err = parse_type("i32 u8").unwrap_err();
    assert_eq!(err.column, 5);

    assert!(parse_type("i32 $").is_err());
}

#[test]
fn test_display_round_trips_through_parser() {
    for src in [
        "Vec<String>",
        "[i32; 4]",
        "Option<Box<Person>>",
        "HashMap<String, Complex128>",
        "Vec<Vec<bool>>",
    ] {
        assert_eq!(parse(src).to_string(), src);
    }
}

#[test]
fn test_mangle_examples() {
    assert_eq!(mangle(&parse("i32")), "i32");
    assert_eq!(mangle(&parse("Vec<String>")), "Sstr");
    assert_eq!(mangle(&parse("[f64; 3]")), "A3_f64");
    assert_eq!(mangle(&parse("Option<Box<Person>>")), "PN6PersonE");
    assert_eq!(mangle(&parse("HashMap<String, u8>")), "Mstru8");
    assert_eq!(mangle(&parse("geo::Point")), "N3geo5PointE");
    assert_eq!(mangle(&parse("error")), "N5errorE");
}

#[test]
fn test_mangle_distinguishes_structure() {
    let names = [
        "Vec<Vec<i32>>",
        "Vec<[i32; 1]>",
        "[Vec<i32>; 1]",
        "HashMap<String, Vec<i32>>",
        "Vec<HashMap<String, i32>>",
        "Option<Box<Vec<i32>>>",
        "Vec<Option<Box<i32>>>",
        "a::b",
        "ab",
        "[i32; 12]",
        "[i32; 1]",
    ];
    let mut mangled: Vec<String> = names.iter().map(|n| mangle(&parse(n))).collect();
    mangled.sort();
    mangled.dedup();
    assert_eq!(mangled.len(), names.len());
    for m in &mangled {
        assert!(is_ident(m), "{} is not an identifier", m);
    }
}

#[test]
fn test_host_and_param_types() {
    let mut table = TypeTable::new();
    table
        .define(TypeDef {
            name: "Person".into(),
            path: Some("crate::model::Person".into()),
            kind: DefKind::Struct(Vec::new()),
        })
        .unwrap();
    let rt = "::rgo_runtime";

    assert_eq!(table.param_type(&parse("String"), rt), "&str");
    assert_eq!(table.param_type(&parse("Vec<Person>"), rt), "&[crate::model::Person]");
    assert_eq!(table.param_type(&parse("Complex64"), rt), "&::rgo_runtime::Complex64");
    assert_eq!(
        table.host_type(&parse("HashMap<String, error>"), rt),
        "::std::collections::HashMap<String, Option<Box<dyn ::std::error::Error>>>"
    );
    assert_eq!(
        table.param_type(&parse("Option<Box<Person>>"), rt),
        "&Option<Box<crate::model::Person>>"
    );
}

#[test]
fn test_table_lookups() {
    let mut table = TypeTable::new();
    let celsius = TypeDef {
        name: "Celsius".into(),
        path: None,
        kind: DefKind::Newtype(TypeDesc::Basic(Basic::F64)),
    };
    table.define(celsius.clone()).unwrap();
    table
        .define(TypeDef {
            name: "Reading".into(),
            path: None,
            kind: DefKind::Newtype(TypeDesc::named("Celsius")),
        })
        .unwrap();

    assert_eq!(table.define(celsius), Err(table.get("Celsius").cloned().unwrap()));
    assert_eq!(table.underlying_basic(&TypeDesc::named("Reading")), Some((Basic::F64, 2)));
    assert_eq!(table.underlying_basic(&TypeDesc::named(ERROR)), None);
    assert!(table.is_error(&TypeDesc::named(ERROR)));
    assert!(!table.is_error(&TypeDesc::named("Celsius")));
}

#[test]
fn test_newtype_cycle_has_no_basic() {
    let mut table = TypeTable::new();
    for (name, repr) in [("A", "B"), ("B", "A")] {
        table
            .define(TypeDef {
                name: name.into(),
                path: None,
                kind: DefKind::Newtype(TypeDesc::named(repr)),
            })
            .unwrap();
    }
    assert_eq!(table.underlying_basic(&TypeDesc::named("A")), None);
}

#[test]
fn test_default_naming() {
    let owner = TypeDef {
        name: "Person".into(),
        path: None,
        kind: DefKind::Struct(Vec::new()),
    };
    let plain = Field { name: "age".into(), ty: parse("i32"), rename: None };
    let renamed = Field { name: "name".into(), ty: parse("String"), rename: Some("Name".into()) };
    assert_eq!(DefaultNaming.field_name(&owner, &plain), "age");
    assert_eq!(DefaultNaming.field_name(&owner, &renamed), "Name");
}

#[test]
fn test_scalar_kind_table() {
    use rgo_runtime::SexpType;
    assert_eq!(Basic::Bool.foreign_kind(), Some(SexpType::Logical));
    assert_eq!(Basic::U64.foreign_kind(), Some(SexpType::Integer));
    assert_eq!(Basic::U8.foreign_kind(), Some(SexpType::Raw));
    assert_eq!(Basic::F32.foreign_kind(), Some(SexpType::Real));
    assert_eq!(Basic::C64.foreign_kind(), Some(SexpType::Complex));
    assert_eq!(Basic::Str.foreign_kind(), Some(SexpType::String));
    assert_eq!(Basic::I128.foreign_kind(), None);
    assert!(Basic::I16.is_integer());
    assert!(!Basic::U8.is_integer());
}

#[test]
fn test_keyword_fields() {
    assert!(is_keyword("type"));
    assert!(!is_keyword("kind"));
    assert_eq!(raw_ident("type"), "r#type");
    assert_eq!(raw_ident("name"), "name");
    assert!(is_field_name("type"));
    assert!(!is_field_name("self"));
    assert!(!is_field_name("Self"));
}

#[test]
fn test_is_ident() {
    assert!(is_ident("Person"));
    assert!(is_ident("_x1"));
    assert!(!is_ident("_"));
    assert!(!is_ident("1x"));
    assert!(!is_ident("a-b"));
    assert!(!is_ident(""));
}
