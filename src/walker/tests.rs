use super::*;
use crate::types::{parse_type, Field, TypeDef};

fn ty(src: &str) -> TypeDesc {
    parse_type(src).unwrap_or_else(|e| panic!("{}: {}", src, e))
}

fn field(name: &str, t: &str, rename: Option<&str>) -> Field {
    Field {
        name: name.into(),
        ty: ty(t),
        rename: rename.map(Into::into),
    }
}

fn table() -> TypeTable {
    let mut table = TypeTable::new();
    let defs = [
        TypeDef {
            name: "Person".into(),
            path: None,
            kind: DefKind::Struct(vec![
                field("name", "String", Some("Name")),
                field("age", "i32", Some("Age")),
            ]),
        },
        TypeDef {
            name: "Celsius".into(),
            path: None,
            kind: DefKind::Newtype(ty("f64")),
        },
        TypeDef {
            name: "Label".into(),
            path: None,
            kind: DefKind::Newtype(ty("String")),
        },
        TypeDef {
            name: "Node".into(),
            path: None,
            kind: DefKind::Struct(vec![
                field("value", "i64", None),
                field("next", "Option<Box<Node>>", None),
                field("children", "Vec<Node>", None),
            ]),
        },
        TypeDef {
            name: "Failure".into(),
            path: Some("crate::Failure".into()),
            kind: DefKind::Error,
        },
        TypeDef {
            name: "Loop".into(),
            path: None,
            kind: DefKind::Struct(vec![field("inner", "Loop", None)]),
        },
        TypeDef {
            name: "Pair".into(),
            path: None,
            kind: DefKind::Struct(vec![field("both", "(i32, i32)", None)]),
        },
        TypeDef {
            name: "Empty".into(),
            path: None,
            kind: DefKind::Struct(Vec::new()),
        },
    ];
    for def in defs {
        table.define(def).unwrap();
    }
    table
}

fn shape(src: &str) -> Shape {
    let table = table();
    let classified = Walker::new(&table).classify(&ty(src)).unwrap();
    classified
}

#[test]
fn test_scalars() {
    assert_eq!(shape("bool"), Shape::Scalar { basic: Basic::Bool });
    assert_eq!(shape("u64"), Shape::Scalar { basic: Basic::U64 });
    assert_eq!(shape("Complex64"), Shape::Scalar { basic: Basic::C64 });
    assert_eq!(shape("String"), Shape::Scalar { basic: Basic::Str });
}

#[test]
fn test_error_capability_comes_first() {
    assert_eq!(shape("error"), Shape::Error { message: "str".into() });
    assert_eq!(shape("Failure"), Shape::Error { message: "str".into() });
}

#[test]
fn test_defined_types() {
    assert_eq!(shape("Celsius"), Shape::Newtype { repr: "f64".into() });
    match shape("Person") {
        Shape::Struct { fields } => {
            let display: Vec<&str> = fields.iter().map(|f| f.display.as_str()).collect();
            assert_eq!(display, vec!["Name", "Age"]);
            assert_eq!(fields[0].field, "name");
            assert_eq!(fields[0].ty, "str");
            assert_eq!(fields[1].ty, "i32");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(shape("Empty"), Shape::Struct { fields: Vec::new() });
}

#[test]
fn test_array_delegates_to_slice() {
    assert_eq!(
        shape("[u8; 16]"),
        Shape::Array {
            len: 16,
            slice: "Su8".into()
        }
    );
}

#[test]
fn test_slice_paths() {
    for (src, basic) in [
        ("Vec<i32>", Basic::I32),
        ("Vec<u8>", Basic::U8),
        ("Vec<f64>", Basic::F64),
        ("Vec<Complex128>", Basic::C128),
        ("Vec<bool>", Basic::Bool),
    ] {
        assert_eq!(shape(src), Shape::Slice { elem: SliceElem::Bulk { basic } }, "{}", src);
    }
    assert_eq!(shape("Vec<String>"), Shape::Slice { elem: SliceElem::Text });
    assert_eq!(shape("Vec<error>"), Shape::Slice { elem: SliceElem::Error });
    assert_eq!(shape("Vec<Failure>"), Shape::Slice { elem: SliceElem::Error });
    // Only direct basics of the bulk kinds take the fast path.
    assert_eq!(
        shape("Vec<i64>"),
        Shape::Slice { elem: SliceElem::Generic { elem: "i64".into() } }
    );
    assert_eq!(
        shape("Vec<Label>"),
        Shape::Slice { elem: SliceElem::Generic { elem: "N5LabelE".into() } }
    );
}

#[test]
fn test_map_paths_use_underlying_basic() {
    let value = |src: &str| match shape(src) {
        Shape::Map { value } => value,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(
        value("HashMap<String, i64>"),
        MapValue::Bulk { basic: Basic::I64, unwrap: 0 }
    );
    assert_eq!(
        value("HashMap<String, Celsius>"),
        MapValue::Bulk { basic: Basic::F64, unwrap: 1 }
    );
    assert_eq!(value("HashMap<String, Label>"), MapValue::Text { unwrap: 1 });
    assert_eq!(value("HashMap<String, String>"), MapValue::Text { unwrap: 0 });
    assert_eq!(value("HashMap<String, error>"), MapValue::Error);
    assert_eq!(
        value("HashMap<String, Person>"),
        MapValue::Generic { value: "N6PersonE".into() }
    );
}

#[test]
fn test_pointer() {
    assert_eq!(shape("Option<Box<Person>>"), Shape::Pointer { pointee: "N6PersonE".into() });
}

#[test]
fn test_unsupported_shapes_name_the_type() {
    let table = table();
    let walker = Walker::new(&table);
    for (src, reason) in [
        ("(i32, u8)", "anonymous"),
        ("*const u8", "unsafe pointer"),
        ("fn(i32)", "functions"),
        ("dyn Display", "trait objects"),
        ("Receiver<i32>", "channels"),
        ("Box<i32>", "Option<Box<T>>"),
        ("char", "no R scalar kind"),
        ("Rc<Person>", "unrecognized"),
    ] {
        let err = walker.classify(&ty(src)).unwrap_err();
        match &err.kind {
            ErrorKind::Unsupported { ty: name, reason: why } => {
                assert_eq!(name, &ty(src).to_string());
                assert!(why.contains(reason), "{}: {}", src, why);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_non_text_map_key() {
    let table = table();
    let err = Walker::new(&table).classify(&ty("HashMap<i32, String>")).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::InvalidMapKey {
            map: "HashMap<i32, String>".into(),
            key: "i32".into()
        }
    );
}

#[test]
fn test_undefined_type_suggests() {
    let table = table();
    let err = Walker::new(&table).plan(&[ty("Vec<Persn>")]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndefinedType { name: "Persn".into() });
    assert_eq!(err.chain, vec!["Vec<Persn>".to_string(), "Persn".to_string()]);
    assert!(err.suggestions.iter().any(|s| s.contains("Person")));
}

#[test]
fn test_error_chain_through_fields() {
    let table = table();
    let err = Walker::new(&table).plan(&[ty("Vec<Pair>")]).unwrap_err();
    assert_eq!(err.offending_type(), "(i32, i32)");
    assert_eq!(err.chain, vec!["Vec<Pair>", "Pair", "(i32, i32)"]);
}

#[test]
fn test_plan_collects_reachable_types_once() {
    let table = table();
    let plan = Walker::new(&table)
        .plan(&[ty("Person"), ty("Vec<Person>"), ty("Person")])
        .unwrap();
    let names: Vec<&str> = plan.iter().map(|t| t.mangled.as_str()).collect();
    assert_eq!(names, vec!["N6PersonE", "SN6PersonE", "i32", "str"]);
    assert_eq!(plan.roots(), &["N6PersonE".to_string(), "SN6PersonE".to_string()]);
    assert_eq!(plan.uses("N6PersonE"), vec!["i32", "str"]);
    assert_eq!(plan.uses("SN6PersonE"), vec!["N6PersonE"]);
}

#[test]
fn test_error_types_reach_text() {
    let table = table();
    let plan = Walker::new(&table).plan(&[ty("error")]).unwrap();
    assert!(plan.get("str").is_some());
    assert_eq!(plan.uses("N5errorE"), vec!["str"]);
}

#[test]
fn test_recursion_through_indirection() {
    let table = table();
    let plan = Walker::new(&table).plan(&[ty("Node")]).unwrap();
    assert!(plan.is_recursive("N4NodeE"));
    assert!(plan.is_recursive("PN4NodeE"));
    assert!(plan.is_recursive("SN4NodeE"));
    assert!(!plan.is_recursive("i64"));
    assert_eq!(plan.len(), 4);
}

#[test]
fn test_recursion_without_indirection_is_rejected() {
    let table = table();
    let err = Walker::new(&table).plan(&[ty("Loop")]).unwrap_err();
    assert_eq!(err.offending_type(), "Loop");
    assert!(err.to_string().contains("recursive without indirection"));
}

#[test]
fn test_custom_naming_policy() {
    struct Upper;
    impl NamingPolicy for Upper {
        fn field_name(&self, _owner: &crate::types::TypeDef, field: &Field) -> String {
            field.name.to_uppercase()
        }
    }

    let table = table();
    let walker = Walker::new(&table).with_naming(Upper);
    match walker.classify(&ty("Person")).unwrap() {
        Shape::Struct { fields } => assert_eq!(fields[0].display, "NAME"),
        other => panic!("unexpected {:?}", other),
    }
}
