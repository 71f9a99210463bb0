use crate::runtime::*;
use tracing::trace;

// !A<x y> = &A<a b>
// ----------------- DUP-PAR (annihilate: matching colors)
// x <- a
// y <- b
pub fn apply(heap: &mut Heap, host: u64, term: Ptr, arg0: Ptr) -> Ptr {
  trace!(host, "dup-par-annihilate");
  heap.inc_gas();
  let xbind = heap.take_arg(term, 0);
  let val0 = heap.take_arg(arg0, 0);
  heap.subst(xbind, val0);
  let ybind = heap.take_arg(term, 1);
  let val1 = heap.take_arg(arg0, 1);
  heap.subst(ybind, val1);
  heap.free(get_loc(term, 0), 3);
  heap.free(get_loc(arg0, 0), 2);
  heap.load_ptr(host)
}
