//! Mark and poison
//!
//! Mark: breadth-first from the roots using the header mark bit.
//! Sweep: unmarked objects are poisoned and moved to quarantine, marked
//! ones get their bit cleared for the next cycle.

use super::HeapState;
use crate::logging::{debug, log_collect_complete, log_collect_start};
use crate::sexp::layout::{ConsRec, Header, VectorRec, VECTOR_DATA_OFFSET};
use crate::sexp::{SexpType, Value};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

/// Outgoing references of one object, attributes included.
fn children(h: *mut Header, out: &mut Vec<*mut Header>) {
    unsafe {
        out.push((*h).attrib);
        let kind = match (*h).sxpinfo.kind() {
            Some(kind) => kind,
            None => return,
        };
        match kind {
            SexpType::Nil
            | SexpType::Free
            | SexpType::Builtin
            | SexpType::Special
            | SexpType::Char
            | SexpType::Logical
            | SexpType::Integer
            | SexpType::Real
            | SexpType::Complex
            | SexpType::Raw => {}
            SexpType::String
            | SexpType::Vector
            | SexpType::Expression
            | SexpType::WeakReference => {
                let n = (*(h as *mut VectorRec)).length as usize;
                let data = (h as *mut u8).add(VECTOR_DATA_OFFSET) as *mut *mut Header;
                for i in 0..n {
                    out.push(*data.add(i));
                }
            }
            // Every other node kind has three pointer slots after the header,
            // in the same positions as a cons cell.
            _ => {
                let rec = h as *mut ConsRec;
                out.push((*rec).carval);
                out.push((*rec).cdrval);
                out.push((*rec).tagval);
            }
        }
    }
}

#[inline]
fn is_poisoned(h: *mut Header) -> bool {
    unsafe { (*h).sxpinfo.kind() == Some(SexpType::Free) }
}

impl HeapState {
    /// Runs one full collection. Returns the number of objects poisoned.
    pub(super) fn collect(&mut self, singletons: &[Value]) -> usize {
        let start = Instant::now();
        log_collect_start(self.objects.len());

        let mut gray: VecDeque<*mut Header> = VecDeque::with_capacity(64);
        let roots = singletons
            .iter()
            .chain(self.protect.iter())
            .chain(self.preserved.iter())
            .chain(self.symbols.values());
        for v in roots {
            gray.push_back(v.header());
        }

        let mut marked = 0;
        let mut scratch = Vec::with_capacity(8);
        while let Some(h) = gray.pop_front() {
            if h.is_null() {
                continue;
            }
            unsafe {
                if (*h).sxpinfo.is_marked() {
                    continue;
                }
                if is_poisoned(h) {
                    self.stats.dangling += 1;
                    continue;
                }
                (*h).sxpinfo = (*h).sxpinfo.with_mark(true);
            }
            marked += 1;
            scratch.clear();
            children(h, &mut scratch);
            gray.extend(scratch.iter().copied().filter(|c| !c.is_null()));
        }

        let mut freed = 0;
        let mut survivors = Vec::with_capacity(self.objects.len());
        for block in self.objects.drain(..) {
            let h = block.ptr.as_ptr() as *mut Header;
            unsafe {
                if (*h).sxpinfo.is_marked() {
                    (*h).sxpinfo = (*h).sxpinfo.with_mark(false);
                    survivors.push(block);
                } else {
                    (*h).sxpinfo = (*h).sxpinfo.with_kind(SexpType::Free);
                    self.quarantine.push(block);
                    freed += 1;
                }
            }
        }
        self.objects = survivors;

        self.stats.collections += 1;
        self.stats.collected += freed;
        self.stats.live = self.objects.len();
        log_collect_complete(marked, freed, start.elapsed().as_micros() as u64);
        freed
    }
}

/// Walks the graph under `root`. `Err` carries the first poisoned object.
pub(super) fn verify(root: Value) -> Result<usize, Value> {
    let mut seen: HashSet<*mut Header> = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(root.header());
    let mut scratch = Vec::with_capacity(8);
    while let Some(h) = queue.pop_front() {
        if h.is_null() || !seen.insert(h) {
            continue;
        }
        if is_poisoned(h) {
            debug!(target: "heap", ptr = ?h, "poisoned object reachable");
            return Err(Value::from_header(h));
        }
        scratch.clear();
        children(h, &mut scratch);
        queue.extend(scratch.iter().copied());
    }
    Ok(seen.len())
}
