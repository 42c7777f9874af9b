//! In-process heap - an R-layout object store with a root-tracing collector
//!
//! Stands in for a live R session. Objects are laid out byte for byte as R
//! lays them out, so the typed handles in [`crate::sexp`] read them exactly
//! as they would read R's own heap.
//!
//! Design:
//! - Roots are the protect stack, preserved objects, the symbol table and
//!   the three singletons (`NULL`, blank string, `NA_character_`)
//! - [`Heap::collect`] marks from the roots and poisons whatever it did not
//!   reach: the kind becomes FREE and the memory is quarantined until the
//!   heap drops, so a stale handle is detectable instead of dangling
//! - Torture mode collects before every allocation, like `gctorture(TRUE)`
//! - Arguments of an allocating call survive that call's collection

mod collect;

#[cfg(test)]
mod tests;

use crate::logging::{log_allocation, warn};
use crate::runtime::Runtime;
use crate::sexp::layout::{
    vector_bytes, CloRec, ConsRec, EnvRec, Header, PrimRec, PromRec, SymRec, VectorRec,
    NODE_SIZE, RECORD_ALIGN, VECTOR_DATA_OFFSET,
};
use crate::sexp::{Info, SexpType, StringVector, Value};
use std::alloc::{self, Layout};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ptr::{self, NonNull};

/// Allocation and collection counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    /// Objects ever allocated, singletons included.
    pub allocated: usize,
    /// Objects currently live.
    pub live: usize,
    /// Objects poisoned by collections.
    pub collected: usize,
    pub collections: usize,
    pub peak_protect_depth: usize,
    /// References to poisoned objects found while marking. Non-zero means
    /// something was used after it became unreachable.
    pub dangling: usize,
}

struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

struct HeapState {
    objects: Vec<Block>,
    quarantine: Vec<Block>,
    protect: Vec<Value>,
    preserved: Vec<Value>,
    symbols: HashMap<String, Value>,
    torture: bool,
    stats: HeapStats,
}

/// R-compatible object heap. Single-threaded.
pub struct Heap {
    state: RefCell<HeapState>,
    nil: Value,
    blank: Value,
    na: Value,
}

impl Heap {
    pub fn new() -> Self {
        let mut state = HeapState {
            objects: Vec::with_capacity(256),
            quarantine: Vec::new(),
            protect: Vec::with_capacity(64),
            preserved: Vec::new(),
            symbols: HashMap::new(),
            torture: false,
            stats: HeapStats::default(),
        };

        // R_NilValue refers to itself from every slot.
        let nil = state.raw_alloc(SexpType::Nil, NODE_SIZE, Value::null());
        unsafe {
            let rec = nil.header() as *mut ConsRec;
            (*rec).header.attrib = nil.header();
            (*rec).carval = nil.header();
            (*rec).cdrval = nil.header();
            (*rec).tagval = nil.header();
        }
        let blank = state.raw_char(b"", nil);
        let na = state.raw_char(b"NA", nil);

        Self {
            state: RefCell::new(state),
            nil,
            blank,
            na,
        }
    }

    /// A heap in torture mode: every allocation is preceded by a collection.
    pub fn torture() -> Self {
        let heap = Self::new();
        heap.set_torture(true);
        heap
    }

    pub fn set_torture(&self, on: bool) {
        self.state.borrow_mut().torture = on;
    }

    pub fn is_torture(&self) -> bool {
        self.state.borrow().torture
    }

    pub fn stats(&self) -> HeapStats {
        self.state.borrow().stats
    }

    /// Current protect stack depth.
    pub fn protect_depth(&self) -> usize {
        self.state.borrow().protect.len()
    }

    /// Whether `v` is an object this heap allocated and has not poisoned.
    pub fn is_live(&self, v: Value) -> bool {
        let state = self.state.borrow();
        let p = v.header() as *mut u8;
        state.objects.iter().any(|b| b.ptr.as_ptr() == p)
    }

    /// `R_PreserveObject`: keeps `v` alive until released.
    pub fn preserve(&self, v: Value) {
        self.state.borrow_mut().preserved.push(v);
    }

    /// `R_ReleaseObject`.
    pub fn release(&self, v: Value) {
        let mut state = self.state.borrow_mut();
        if let Some(i) = state.preserved.iter().rposition(|&p| p == v) {
            state.preserved.remove(i);
        }
    }

    /// `Rf_lcons`: a call cell.
    pub fn lcons(&self, car: Value, cdr: Value) -> Value {
        let cell = self.node(SexpType::Lang, &[car, cdr]);
        unsafe {
            let rec = cell.header() as *mut ConsRec;
            (*rec).carval = car.header();
            (*rec).cdrval = cdr.header();
        }
        cell
    }

    /// A closure over `formals`, `body` and `env`.
    pub fn closure(&self, formals: Value, body: Value, env: Value) -> Value {
        let clo = self.node(SexpType::Closure, &[formals, body, env]);
        unsafe {
            let rec = clo.header() as *mut CloRec;
            (*rec).formals = formals.header();
            (*rec).body = body.header();
            (*rec).env = env.header();
        }
        clo
    }

    /// An unhashed environment with the given frame and enclosure.
    pub fn environment(&self, frame: Value, enclos: Value) -> Value {
        let env = self.node(SexpType::Environment, &[frame, enclos]);
        unsafe {
            let rec = env.header() as *mut EnvRec;
            (*rec).frame = frame.header();
            (*rec).enclos = enclos.header();
        }
        env
    }

    /// An unforced promise.
    pub fn promise(&self, expr: Value, env: Value) -> Value {
        let prom = self.node(SexpType::Promise, &[expr, env]);
        unsafe {
            let rec = prom.header() as *mut PromRec;
            (*rec).expr = expr.header();
            (*rec).env = env.header();
        }
        prom
    }

    /// Forces a promise to `value`, clearing its environment as R does.
    pub fn force(&self, prom: Value, value: Value) {
        unsafe {
            let rec = prom.header() as *mut PromRec;
            (*rec).value = value.header();
            (*rec).env = self.nil.header();
        }
    }

    /// A BUILTINSXP or SPECIALSXP for function table entry `offset`.
    pub fn primitive(&self, kind: SexpType, offset: i32) -> Value {
        debug_assert!(matches!(kind, SexpType::Builtin | SexpType::Special));
        let prim = self.node(kind, &[]);
        unsafe { (*(prim.header() as *mut PrimRec)).offset = offset };
        prim
    }

    /// `setAttrib` with `v` and `x` already rooted.
    fn store_attrib(&self, v: Value, name: Value, x: Value) {
        if v.is_null() {
            warn!(target: "heap", "attribute set on NULL ignored");
            return;
        }
        if v.kind().map_or(false, SexpType::is_pairlist) && name == self.install("names") {
            self.tag_cells(v, x);
            return;
        }
        let mut cur = Value::from_header(unsafe { (*v.header()).attrib });
        let mut last = None;
        while !cur.is_null() {
            let rec = cur.header() as *mut ConsRec;
            unsafe {
                if (*rec).tagval == name.header() {
                    (*rec).carval = x.header();
                    return;
                }
                last = Some(rec);
                cur = Value::from_header((*rec).cdrval);
            }
        }
        let cell = self.node(SexpType::List, &[v, name, x]);
        unsafe {
            let rec = cell.header() as *mut ConsRec;
            (*rec).carval = x.header();
            (*rec).tagval = name.header();
            match last {
                Some(rec) => (*rec).cdrval = cell.header(),
                None => (*v.header()).attrib = cell.header(),
            }
        }
    }

    /// `names<-` on a pairlist: R stores the names as cell tags.
    fn tag_cells(&self, list: Value, names: Value) {
        let names = match StringVector::from_value(names) {
            Some(names) => names.to_strings(),
            None => return,
        };
        let mut cell = list;
        for name in &names {
            if cell.is_null() {
                break;
            }
            let sym = if name.is_empty() { self.nil } else { self.install(name) };
            self.set_tag(cell, sym);
            cell = Value::from_header(unsafe { (*(cell.header() as *mut ConsRec)).cdrval });
        }
    }

    /// Runs a collection now.
    pub fn collect(&self) -> usize {
        let mut state = self.state.borrow_mut();
        state.collect(&[self.nil, self.blank, self.na])
    }

    /// Walks everything reachable from `root` and reports the number of
    /// distinct objects, or the first poisoned object found.
    pub fn verify(&self, root: Value) -> Result<usize, Value> {
        collect::verify(root)
    }

    /// Allocates a non-vector node whose slots all start as `NULL`.
    fn node(&self, kind: SexpType, keep: &[Value]) -> Value {
        let mut state = self.state.borrow_mut();
        state.before_alloc(&[self.nil, self.blank, self.na], keep);
        let v = state.raw_alloc(kind, NODE_SIZE, self.nil);
        unsafe {
            let slots = (v.header() as *mut u8).add(core::mem::size_of::<Header>())
                as *mut *mut Header;
            if kind != SexpType::Builtin && kind != SexpType::Special {
                for i in 0..3 {
                    *slots.add(i) = self.nil.header();
                }
            }
        }
        log_allocation(kind.label(), 0, NODE_SIZE);
        v
    }

    fn vector(&self, kind: SexpType, n: usize, keep: &[Value]) -> Value {
        let elem = kind.element_size().unwrap_or(0);
        let bytes = vector_bytes(elem, n, kind == SexpType::Char);
        let mut state = self.state.borrow_mut();
        state.before_alloc(&[self.nil, self.blank, self.na], keep);
        let v = state.raw_vector(kind, n, bytes, self.nil);
        match kind {
            SexpType::String => fill(v, n, self.blank),
            SexpType::Vector | SexpType::Expression => fill(v, n, self.nil),
            _ => {}
        }
        log_allocation(kind.label(), n, bytes);
        v
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for block in state.objects.drain(..).chain(state.quarantine.drain(..)) {
            unsafe { alloc::dealloc(block.ptr.as_ptr(), block.layout) };
        }
    }
}

fn fill(v: Value, n: usize, with: Value) {
    unsafe {
        let data = (v.header() as *mut u8).add(VECTOR_DATA_OFFSET) as *mut *mut Header;
        for i in 0..n {
            *data.add(i) = with.header();
        }
    }
}

impl HeapState {
    fn before_alloc(&mut self, singletons: &[Value], keep: &[Value]) {
        if self.torture {
            let depth = self.protect.len();
            self.protect.extend_from_slice(keep);
            self.collect(singletons);
            self.protect.truncate(depth);
        }
    }

    fn raw_alloc(&mut self, kind: SexpType, size: usize, nil: Value) -> Value {
        let layout = match Layout::from_size_align(size, RECORD_ALIGN) {
            Ok(layout) => layout,
            Err(_) => alloc::handle_alloc_error(Layout::new::<Header>()),
        };
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        };
        let header = ptr.as_ptr() as *mut Header;
        unsafe {
            ptr::write(
                header,
                Header {
                    sxpinfo: Info::new(kind),
                    attrib: nil.header(),
                    gengc_next_node: ptr::null_mut(),
                    gengc_prev_node: ptr::null_mut(),
                },
            );
        }
        self.objects.push(Block { ptr, layout });
        self.stats.allocated += 1;
        self.stats.live += 1;
        Value::from_header(header)
    }

    fn raw_vector(&mut self, kind: SexpType, n: usize, bytes: usize, nil: Value) -> Value {
        let v = self.raw_alloc(kind, bytes, nil);
        unsafe {
            let rec = v.header() as *mut VectorRec;
            (*rec).length = n as isize;
            (*rec).truelength = 0;
            (*rec).header.sxpinfo = (*rec).header.sxpinfo.with_scalar(n == 1);
        }
        v
    }

    fn raw_char(&mut self, bytes: &[u8], nil: Value) -> Value {
        let size = vector_bytes(1, bytes.len(), true);
        let v = self.raw_vector(SexpType::Char, bytes.len(), size, nil);
        unsafe {
            let data = (v.header() as *mut u8).add(VECTOR_DATA_OFFSET);
            ptr::copy_nonoverlapping(bytes.as_ptr(), data, bytes.len());
        }
        v
    }
}

impl Runtime for Heap {
    fn name(&self) -> &'static str {
        "heap"
    }

    fn nil(&self) -> Value {
        self.nil
    }

    fn blank_string(&self) -> Value {
        self.blank
    }

    fn na_string(&self) -> Value {
        self.na
    }

    fn alloc_vector(&self, kind: SexpType, n: usize) -> Value {
        if !kind.is_vector() || kind == SexpType::Char {
            warn!(target: "heap", kind = kind.label(), "alloc_vector of a non-vector kind");
            return self.nil;
        }
        self.vector(kind, n, &[])
    }

    fn alloc_list(&self, n: usize) -> Value {
        let mut state = self.state.borrow_mut();
        state.before_alloc(&[self.nil, self.blank, self.na], &[]);
        let mut head = self.nil;
        for _ in 0..n {
            let cell = state.raw_alloc(SexpType::List, NODE_SIZE, self.nil);
            unsafe {
                let rec = cell.header() as *mut ConsRec;
                (*rec).carval = self.nil.header();
                (*rec).cdrval = head.header();
                (*rec).tagval = self.nil.header();
            }
            head = cell;
        }
        log_allocation("LISTSXP", n, n * NODE_SIZE);
        head
    }

    fn cons(&self, car: Value, cdr: Value) -> Value {
        let cell = self.node(SexpType::List, &[car, cdr]);
        unsafe {
            let rec = cell.header() as *mut ConsRec;
            (*rec).carval = car.header();
            (*rec).cdrval = cdr.header();
        }
        cell
    }

    fn mk_char(&self, bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            return self.blank;
        }
        let mut state = self.state.borrow_mut();
        state.before_alloc(&[self.nil, self.blank, self.na], &[]);
        let v = state.raw_char(bytes, self.nil);
        log_allocation("CHARSXP", bytes.len(), vector_bytes(1, bytes.len(), true));
        v
    }

    fn install(&self, name: &str) -> Value {
        if let Some(&sym) = self.state.borrow().symbols.get(name) {
            return sym;
        }
        let mut state = self.state.borrow_mut();
        state.before_alloc(&[self.nil, self.blank, self.na], &[]);
        let pname = state.raw_char(name.as_bytes(), self.nil);
        let sym = state.raw_alloc(SexpType::Symbol, NODE_SIZE, self.nil);
        unsafe {
            let rec = sym.header() as *mut SymRec;
            (*rec).pname = pname.header();
            (*rec).value = self.nil.header();
            (*rec).internal = self.nil.header();
        }
        state.symbols.insert(name.to_string(), sym);
        log_allocation("SYMSXP", 0, NODE_SIZE);
        sym
    }

    fn set_string_elt(&self, v: Value, i: usize, s: Value) {
        store(v, i, s);
    }

    fn set_vector_elt(&self, v: Value, i: usize, x: Value) {
        store(v, i, x);
    }

    fn set_car(&self, cell: Value, x: Value) {
        unsafe { (*(cell.header() as *mut ConsRec)).carval = x.header() };
    }

    fn set_tag(&self, cell: Value, tag: Value) {
        unsafe { (*(cell.header() as *mut ConsRec)).tagval = tag.header() };
    }

    fn set_attrib(&self, v: Value, name: Value, x: Value) {
        self.protect(v);
        self.protect(x);
        self.store_attrib(v, name, x);
        self.unprotect(2);
    }

    fn protect(&self, v: Value) {
        let mut state = self.state.borrow_mut();
        state.protect.push(v);
        let depth = state.protect.len();
        if depth > state.stats.peak_protect_depth {
            state.stats.peak_protect_depth = depth;
        }
    }

    fn unprotect(&self, n: usize) {
        let mut state = self.state.borrow_mut();
        let depth = state.protect.len();
        if n > depth {
            warn!(target: "heap", n, depth, "unprotect past the bottom of the stack");
        }
        state.protect.truncate(depth.saturating_sub(n));
    }

    fn protect_top(&self) -> Option<Value> {
        self.state.borrow().protect.last().copied()
    }
}

fn store(v: Value, i: usize, x: Value) {
    unsafe {
        let data = (v.header() as *mut u8).add(VECTOR_DATA_OFFSET) as *mut *mut Header;
        *data.add(i) = x.header();
    }
}
