//! Heap and collector tests

use super::*;
use crate::protect::ViolationPolicy;
use crate::runtime::Context;
use crate::sexp::{Character, Integer, List, Sexp, StringVector, Vector};

fn context(heap: &Heap) -> Context<'_> {
    Context::with_policy(heap, ViolationPolicy::Panic)
}

#[test]
fn test_singletons_survive_collection() {
    let heap = Heap::new();
    heap.collect();
    assert!(heap.is_live(heap.nil()));
    assert!(heap.is_live(heap.blank_string()));
    assert!(heap.is_live(heap.na_string()));
    assert_eq!(heap.stats().allocated, 3);
}

#[test]
fn test_nil_refers_to_itself() {
    let heap = Heap::new();
    let nil = heap.nil();
    let rec = nil.header() as *mut ConsRec;
    unsafe {
        assert_eq!((*rec).carval, nil.header());
        assert_eq!((*rec).cdrval, nil.header());
        assert_eq!((*nil.header()).attrib, nil.header());
    }
}

#[test]
fn test_unprotected_objects_are_poisoned() {
    let heap = Heap::new();
    let cx = context(&heap);
    let v = Integer::new(&cx, 3);
    assert_eq!(heap.collect(), 1);
    assert!(!heap.is_live(v.value()));
    assert_eq!(v.value().kind(), Some(SexpType::Free));
    assert!(Integer::from_value(v.value()).is_none());
    assert_eq!(heap.stats().collected, 1);
}

#[test]
fn test_protected_objects_survive() {
    let heap = Heap::new();
    let cx = context(&heap);
    let scope = cx.scope();
    let v = scope.protect(Integer::new(&cx, 3));
    assert_eq!(heap.collect(), 0);
    assert!(heap.is_live(v.value()));
    assert_eq!(v.vector(), &[0, 0, 0]);
}

#[test]
fn test_reachable_children_survive() {
    let heap = Heap::new();
    let cx = context(&heap);
    let scope = cx.scope();
    let list = scope.protect(Vector::new(&cx, 2));
    let s = crate::pack::string(&cx, "kept");
    list.set(&cx, 0, s);
    heap.collect();
    assert!(heap.is_live(s));
    let elem = StringVector::from_value(s).expect("STRSXP");
    assert!(heap.is_live(elem.vector()[0].value()));
    assert_eq!(heap.verify(list.into()), Ok(4));
}

#[test]
fn test_preserved_objects_survive_until_released() {
    let heap = Heap::new();
    let cx = context(&heap);
    let v = Integer::new(&cx, 1);
    heap.preserve(v.into());
    heap.collect();
    assert!(heap.is_live(v.value()));
    heap.release(v.into());
    heap.collect();
    assert!(!heap.is_live(v.value()));
}

#[test]
fn test_symbols_are_roots() {
    let heap = Heap::new();
    let sym = heap.install("kept");
    heap.collect();
    assert!(heap.is_live(sym));
    assert_eq!(heap.install("kept"), sym);
}

#[test]
fn test_empty_mk_char_is_the_blank_string() {
    let heap = Heap::new();
    assert_eq!(heap.mk_char(b""), heap.blank_string());
    let c = Character::from_value(heap.mk_char(b"x")).expect("CHARSXP");
    assert_eq!(c.bytes(), b"x");
    // NUL terminator follows the payload.
    unsafe {
        let data = (c.value().header() as *mut u8).add(VECTOR_DATA_OFFSET);
        assert_eq!(*data.add(1), 0);
    }
}

#[test]
fn test_torture_collects_before_every_allocation() {
    let heap = Heap::torture();
    let cx = context(&heap);
    let before = heap.stats().collections;
    let _ = Integer::new(&cx, 1);
    let _ = Integer::new(&cx, 1);
    assert_eq!(heap.stats().collections, before + 2);
}

#[test]
fn test_torture_frees_unprotected_intermediate() {
    let heap = Heap::torture();
    let cx = context(&heap);
    let lost = Integer::new(&cx, 1);
    let _ = Integer::new(&cx, 1);
    assert!(!heap.is_live(lost.value()));
}

#[test]
fn test_cons_arguments_survive_their_own_allocation() {
    let heap = Heap::torture();
    let cx = context(&heap);
    let car = Integer::new(&cx, 1);
    let cell = heap.cons(car.into(), heap.nil());
    assert!(heap.is_live(car.value()));
    let cell = List::from_value(cell).expect("LISTSXP");
    assert_eq!(cell.head(), car.value());
}

#[test]
fn test_dangling_reference_is_counted() {
    let heap = Heap::new();
    let cx = context(&heap);
    let scope = cx.scope();
    let list = scope.protect(Vector::new(&cx, 1));
    let x = Integer::new(&cx, 1);
    heap.collect();
    // Stored after x was already poisoned.
    list.set(&cx, 0, x.into());
    heap.collect();
    assert_eq!(heap.stats().dangling, 1);
    assert_eq!(heap.verify(list.into()), Err(x.value()));
}

#[test]
fn test_attribute_replaced_in_place() {
    let heap = Heap::new();
    let cx = context(&heap);
    let scope = cx.scope();
    let v = scope.protect(Integer::new(&cx, 1));
    let sym = heap.install("class");
    let a = scope.protect(crate::pack::string(&cx, "a"));
    let b = scope.protect(crate::pack::string(&cx, "b"));
    heap.set_attrib(v.into(), sym, a);
    heap.set_attrib(v.into(), sym, b);
    let attrs = v.attributes().expect("attributes");
    assert_eq!(attrs.value().len(), 1);
    assert_eq!(v.value().attribute("class"), Some(b));
    assert_eq!(heap.protect_depth(), 3);
}

#[test]
fn test_peak_protect_depth_is_recorded() {
    let heap = Heap::new();
    let cx = context(&heap);
    {
        let scope = cx.scope();
        for _ in 0..5 {
            scope.protect(Integer::new(&cx, 1));
        }
    }
    assert_eq!(heap.stats().peak_protect_depth, 5);
    assert_eq!(heap.protect_depth(), 0);
}
